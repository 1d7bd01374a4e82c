//! Skein Incremental - Incremental pipeline engine.
//!
//! A pipeline is a DAG of nodes declared once. A [`Driver`] runs it as often
//! as its inputs change; every run recomputes only what the change reaches and
//! tags each output with how it relates to the previous run.
//!
//! # Core Concepts
//!
//! - `NodeStateTable<T>`: The output of one node for one run, a sequence of
//!   entry groups whose items carry an `EntryState`
//! - `EntryState`: Added, Modified, Cached or Removed relative to the previous run
//! - `NodeStateTableBuilder<T>`: Two-phase construction of a table against its
//!   previous version, with positional diffing
//! - `IncrementalNode<T>`: The contract every node kind implements
//! - `DriverStateTable`: The compacted baselines a driver keeps between runs
//!
//! # Node Kinds
//!
//! - `InputNode`: Values set on the driver before each run
//! - `TransformNode`: Per-item `select`, `select_many` and `filter`
//! - `BatchNode`: The whole upstream sequence collapsed into one entry
//! - `CombineNode`: Every left item paired with a single right item
//!
//! # Example
//!
//! ```
//! use skein_core::CancellationToken;
//! use skein_incremental::{Driver, EntryState, Pipeline};
//!
//! let mut pipeline = Pipeline::new();
//! let numbers = pipeline.input::<i32>();
//! let squares = pipeline.select(&numbers, |n| n * n);
//! let total = pipeline.batch(&squares, |values| values.iter().sum::<i32>());
//!
//! let mut driver = Driver::new(pipeline);
//! driver.set_input(&numbers, vec![1, 2, 3]).unwrap();
//! let first = driver.run(&CancellationToken::new()).unwrap();
//! assert_eq!(first.table(&total).unwrap().batch(), vec![14]);
//!
//! driver.set_input(&numbers, vec![1, 2, 4]).unwrap();
//! let second = driver.run(&CancellationToken::new()).unwrap();
//! let squares = second.table(&squares).unwrap();
//! let states: Vec<EntryState> = squares.iter().map(|e| e.state).collect();
//! assert_eq!(
//!     states,
//!     vec![EntryState::Cached, EntryState::Cached, EntryState::Modified]
//! );
//! assert_eq!(second.table(&total).unwrap().batch(), vec![21]);
//! ```

#![no_std]

extern crate alloc;

pub mod driver;
pub mod entry;
pub mod node;
pub mod pipeline;
pub mod table;

#[cfg(test)]
mod testing;

pub use driver::{
    Driver, DriverOptions, DriverStateTable, DriverStateTableBuilder, RunResult, RunStats,
    RunStep, StepOutcome,
};
pub use entry::{Entry, EntryState};
pub use node::{
    BatchFn, BatchNode, CombineNode, IncrementalNode, InputNode, NodeHandle, NodeId, NodeValue,
    TransformFn, TransformNode,
};
pub use pipeline::Pipeline;
pub use table::{NodeStateTable, NodeStateTableBuilder, StateCounts, TableCondition, TableEntry};
