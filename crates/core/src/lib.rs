//! Skein Core - Shared contracts for the skein incremental pipeline engine.
//!
//! This crate provides the small set of types every pipeline stage agrees on:
//!
//! - `Error`: Error taxonomy for driving a pipeline (cancellation, contract violations)
//! - `Fault`: The opaque cause carried by a faulted node table
//! - `CancellationToken`: Cooperative cancellation threaded through every node invocation
//! - `Comparer`: Pluggable equality deciding whether an output changed between runs
//!
//! # Example
//!
//! ```rust
//! use skein_core::{comparer_fn, default_comparer, CancellationToken, Error, Fault};
//!
//! let structural = default_comparer::<i32>();
//! assert!(structural.equals(&1, &1));
//!
//! let by_parity = comparer_fn(|a: &i32, b: &i32| a % 2 == b % 2);
//! assert!(by_parity.equals(&1, &3));
//!
//! let token = CancellationToken::new();
//! assert!(token.check().is_ok());
//! token.cancel();
//! assert!(matches!(token.check(), Err(Error::Cancelled)));
//!
//! let fault = Fault::msg("generator failed");
//! assert_eq!(fault.to_string(), "generator failed");
//! ```

#![no_std]

extern crate alloc;

mod cancel;
mod comparer;
mod error;
mod fault;

pub use cancel::CancellationToken;
pub use comparer::{comparer_fn, default_comparer, Comparer, DefaultComparer, FnComparer, SharedComparer};
pub use error::{Error, Result};
pub use fault::Fault;
