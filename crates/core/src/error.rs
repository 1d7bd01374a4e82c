//! Error types for skein pipelines.

use alloc::string::String;
use thiserror::Error;

/// Result type alias for skein operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors surfaced while driving a pipeline.
///
/// A failing user transform is *not* an error at this level: it becomes a
/// faulted node table carrying a [`Fault`](crate::Fault). `Error` is reserved
/// for cooperative cancellation and for misuse of the engine's contracts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The run was superseded and abandoned cooperatively.
    #[error("run was cancelled")]
    Cancelled,
    /// A node handle does not belong to the pipeline being driven.
    #[error("node {node} is not part of this pipeline")]
    UnknownNode {
        node: u32,
    },
    /// A stored table does not have the element type its handle declares.
    #[error("table for node {node} does not hold values of type {expected}")]
    TableTypeMismatch {
        node: u32,
        expected: &'static str,
    },
    /// A previous-table invariant was violated.
    #[error("invalid state: {message}")]
    InvalidState {
        message: String,
    },
}

impl Error {
    /// Creates an unknown node error.
    pub fn unknown_node(node: u32) -> Self {
        Error::UnknownNode { node }
    }

    /// Creates a table type mismatch error.
    pub fn table_type_mismatch(node: u32, expected: &'static str) -> Self {
        Error::TableTypeMismatch { node, expected }
    }

    /// Creates an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Error::InvalidState {
            message: message.into(),
        }
    }

    /// Returns true if this error is a cooperative cancellation.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
