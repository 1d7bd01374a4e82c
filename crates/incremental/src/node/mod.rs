//! Pipeline nodes.
//!
//! Every node kind implements one contract, [`IncrementalNode`]: given the
//! run's [`DriverStateTableBuilder`] (through which it pulls its upstream
//! tables) and the table it produced in the previous run, produce this run's
//! table. Nodes are referenced through typed [`NodeHandle`]s.
//!
//! Rules shared by every node kind:
//!
//! - Unchanged (compacted) upstream and a non-empty previous table: the
//!   previous table is returned as is and no user code runs.
//! - A faulted upstream table faults the node without running user code.
//! - A user function returning `Err(fault)` faults the node with that fault.
//! - Cancellation is reported as `Err(Error::Cancelled)`, never as a table.

mod batch;
mod combine;
mod input;
mod transform;

pub use batch::BatchNode;
pub use combine::CombineNode;
pub use input::InputNode;
pub use transform::TransformNode;

use crate::driver::DriverStateTableBuilder;
use crate::table::NodeStateTable;
use alloc::format;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use skein_core::{CancellationToken, Error, Fault, Result};

/// Values that can flow between nodes.
pub trait NodeValue: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> NodeValue for T {}

/// Unique identifier for a node within its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Creates a NodeId from a raw value.
    pub fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw value of this NodeId.
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// User function of a transform node: one upstream value to any number of outputs.
pub type TransformFn<I, O> =
    Arc<dyn Fn(&I, &CancellationToken) -> core::result::Result<Vec<O>, Fault> + Send + Sync>;

/// User function of a batch node: the whole upstream sequence to any number of outputs.
pub type BatchFn<I, O> =
    Arc<dyn Fn(&[I], &CancellationToken) -> core::result::Result<Vec<O>, Fault> + Send + Sync>;

pub(crate) fn transform_fn<I, O, F>(func: F) -> TransformFn<I, O>
where
    F: Fn(&I, &CancellationToken) -> core::result::Result<Vec<O>, Fault> + Send + Sync + 'static,
{
    Arc::new(func)
}

pub(crate) fn batch_fn<I, O, F>(func: F) -> BatchFn<I, O>
where
    F: Fn(&[I], &CancellationToken) -> core::result::Result<Vec<O>, Fault> + Send + Sync + 'static,
{
    Arc::new(func)
}

/// The contract every pipeline stage implements.
pub trait IncrementalNode<T>: Send + Sync {
    /// Short name of the node kind, used in logs and run steps.
    fn kind(&self) -> &'static str;

    /// Produces this run's table.
    ///
    /// `previous` is the table this node produced in the previous run, in its
    /// compacted baseline form, or an empty table if there is none. The result
    /// must hold the same values a from-scratch computation would, in the same
    /// order; only the entry states may differ.
    ///
    /// Returns `Err` only for cancellation. Failures are faulted tables.
    fn update_state_table(
        &self,
        builder: &mut DriverStateTableBuilder<'_>,
        previous: Arc<NodeStateTable<T>>,
        cancel: &CancellationToken,
    ) -> Result<Arc<NodeStateTable<T>>>;
}

/// A typed reference to a node declared in a [`Pipeline`](crate::Pipeline).
///
/// A handle remembers the pipeline that created it; every other pipeline
/// and driver rejects it, even when its id is in range.
pub struct NodeHandle<T> {
    id: NodeId,
    pipeline: u32,
    node: Arc<dyn IncrementalNode<T>>,
}

impl<T: NodeValue> NodeHandle<T> {
    pub(crate) fn new(id: NodeId, pipeline: u32, node: Arc<dyn IncrementalNode<T>>) -> Self {
        Self { id, pipeline, node }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Identifier of the pipeline that created this handle.
    #[inline]
    pub(crate) fn pipeline(&self) -> u32 {
        self.pipeline
    }

    #[inline]
    pub fn kind(&self) -> &'static str {
        self.node.kind()
    }

    #[inline]
    pub(crate) fn node(&self) -> &dyn IncrementalNode<T> {
        &*self.node
    }
}

impl<T> Clone for NodeHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            pipeline: self.pipeline,
            node: Arc::clone(&self.node),
        }
    }
}

impl<T: NodeValue> fmt::Debug for NodeHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHandle")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .finish()
    }
}

/// Faults the node after a broken previous-table invariant.
///
/// This is a bug in the engine or in a custom node, not a runtime condition:
/// debug builds stop here, release builds surface it as a faulted table.
pub(crate) fn contract_violation<T>(node: NodeId, message: &str) -> Arc<NodeStateTable<T>> {
    log::error!("{}: {}", node, message);
    debug_assert!(false, "{}: {}", node, message);
    Arc::new(NodeStateTable::from_fault(Fault::from(Error::invalid_state(
        format!("{}: {}", node, message),
    ))))
}

/// Faults the node with the error of a user function, unless the run was
/// cancelled meanwhile.
pub(crate) fn transform_fault<T>(
    node: NodeId,
    fault: Fault,
    cancel: &CancellationToken,
) -> Result<Arc<NodeStateTable<T>>> {
    cancel.check()?;
    log::debug!("{} faulted: {}", node, fault);
    Ok(Arc::new(NodeStateTable::from_fault(fault)))
}
