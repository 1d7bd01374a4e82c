//! Per-node table storage, across runs and within one run.

use super::run::{RunStats, RunStep, StepOutcome};
use crate::node::{NodeHandle, NodeId, NodeValue};
use crate::pipeline::Pipeline;
use crate::table::{NodeStateTable, StateCounts, TableCondition};
use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{type_name, Any};
use hashbrown::HashMap;
use skein_core::{CancellationToken, Error, Fault, Result, SharedComparer};

/// Type-erased per-node values: input sequences and comparer overrides.
pub(crate) type AnyMap = HashMap<NodeId, Box<dyn Any + Send + Sync>>;

/// Type-erased per-node tables.
pub(crate) type TableMap = HashMap<NodeId, Box<dyn AnyTable>>;

/// A node table whose element type has been erased.
pub(crate) trait AnyTable: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    /// The compacted form stored as the next run's previous table.
    fn to_baseline(&self) -> Box<dyn AnyTable>;
    fn condition(&self) -> TableCondition;
    fn fault(&self) -> Option<&Fault>;
    fn state_counts(&self) -> StateCounts;
}

impl<T: NodeValue> AnyTable for Arc<NodeStateTable<T>> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_baseline(&self) -> Box<dyn AnyTable> {
        if self.is_compacted() {
            Box::new(Arc::clone(self))
        } else {
            Box::new(Arc::new(self.as_cached()))
        }
    }

    fn condition(&self) -> TableCondition {
        NodeStateTable::condition(self)
    }

    fn fault(&self) -> Option<&Fault> {
        NodeStateTable::fault(self)
    }

    fn state_counts(&self) -> StateCounts {
        NodeStateTable::state_counts(self)
    }
}

pub(crate) fn downcast_table<T: NodeValue>(
    node: NodeId,
    table: &dyn AnyTable,
) -> Result<Arc<NodeStateTable<T>>> {
    table
        .as_any()
        .downcast_ref::<Arc<NodeStateTable<T>>>()
        .cloned()
        .ok_or_else(|| Error::table_type_mismatch(node.raw(), type_name::<T>()))
}

// ---------------------------------------------------------------------------
// DriverStateTable
// ---------------------------------------------------------------------------

/// The baselines a driver keeps between runs: one compacted table per node.
///
/// Read-only while a run is in progress. A node that faulted in the last run
/// has an empty baseline, so it is computed afresh next time.
pub struct DriverStateTable {
    pipeline: u32,
    tables: TableMap,
}

impl DriverStateTable {
    /// Creates a state with no baselines for the given pipeline.
    pub(crate) fn new(pipeline: u32) -> Self {
        Self {
            pipeline,
            tables: TableMap::new(),
        }
    }

    pub(crate) fn from_run(pipeline: u32, tables: &TableMap) -> Self {
        Self {
            pipeline,
            tables: tables
                .iter()
                .map(|(id, table)| (*id, table.to_baseline()))
                .collect(),
        }
    }

    /// Returns the number of nodes with a baseline.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Returns true if a baseline is stored for `id`.
    pub fn contains(&self, id: NodeId) -> bool {
        self.tables.contains_key(&id)
    }

    /// Returns the baseline of a node.
    ///
    /// Returns `None` if no baseline is stored, if it holds another type or
    /// if `node` belongs to another pipeline.
    pub fn get<T: NodeValue>(&self, node: &NodeHandle<T>) -> Option<Arc<NodeStateTable<T>>> {
        if node.pipeline() != self.pipeline {
            return None;
        }
        let table = self.tables.get(&node.id())?;
        downcast_table(node.id(), table.as_ref()).ok()
    }

    /// Returns the condition of a node's baseline.
    pub fn condition(&self, id: NodeId) -> Option<TableCondition> {
        self.tables.get(&id).map(|table| table.condition())
    }

    fn table(&self, id: NodeId) -> Option<&dyn AnyTable> {
        self.tables.get(&id).map(|table| table.as_ref())
    }
}

// ---------------------------------------------------------------------------
// DriverStateTableBuilder
// ---------------------------------------------------------------------------

/// The scratch space of one run.
///
/// Nodes pull their upstream tables through
/// [`get_latest_state_table_for_node`](Self::get_latest_state_table_for_node),
/// which computes each node at most once per run. The builder also hands
/// nodes their input values and comparer overrides. It is discarded when
/// the run ends, successfully or not.
pub struct DriverStateTableBuilder<'a> {
    pipeline: &'a Pipeline,
    previous: &'a DriverStateTable,
    inputs: &'a AnyMap,
    comparers: &'a AnyMap,
    cancel: &'a CancellationToken,
    latest: TableMap,
    steps: Option<Vec<RunStep>>,
    stats: RunStats,
}

impl<'a> DriverStateTableBuilder<'a> {
    pub(crate) fn new(
        pipeline: &'a Pipeline,
        previous: &'a DriverStateTable,
        inputs: &'a AnyMap,
        comparers: &'a AnyMap,
        cancel: &'a CancellationToken,
        track_steps: bool,
    ) -> Self {
        Self {
            pipeline,
            previous,
            inputs,
            comparers,
            cancel,
            latest: HashMap::with_capacity(pipeline.len()),
            steps: track_steps.then(Vec::new),
            stats: RunStats::default(),
        }
    }

    /// Returns this run's table for `node`, computing it on first request.
    ///
    /// Repeated requests within a run return the same table. A handle of
    /// another pipeline is rejected with [`Error::UnknownNode`].
    pub fn get_latest_state_table_for_node<T: NodeValue>(
        &mut self,
        node: &NodeHandle<T>,
    ) -> Result<Arc<NodeStateTable<T>>> {
        let id = node.id();
        if !self.pipeline.owns(node) {
            return Err(Error::unknown_node(id.raw()));
        }
        if let Some(table) = self.latest.get(&id) {
            return downcast_table(id, table.as_ref());
        }

        let cancel = self.cancel;
        cancel.check()?;

        let previous = match self.previous.table(id) {
            Some(table) => downcast_table::<T>(id, table)?,
            None => Arc::new(NodeStateTable::empty()),
        };
        let table = node
            .node()
            .update_state_table(self, Arc::clone(&previous), cancel)?;

        let outcome = if Arc::ptr_eq(&table, &previous) {
            StepOutcome::Reused
        } else if table.is_faulted() {
            StepOutcome::Faulted
        } else {
            StepOutcome::Executed
        };
        log::trace!("{} ({}) {}", id, node.kind(), outcome);
        self.stats.record(outcome);
        if let Some(steps) = self.steps.as_mut() {
            steps.push(RunStep::new(
                id,
                self.pipeline.tracking_name(id).map(String::from),
                node.kind(),
                outcome,
                table.condition(),
                table.state_counts(),
            ));
        }

        self.latest.insert(id, Box::new(Arc::clone(&table)));
        Ok(table)
    }

    /// Returns the values set for an input node this run.
    ///
    /// An input that was never set yields an empty sequence.
    pub fn input_values<T: NodeValue>(&self, id: NodeId) -> Result<&'a [T]> {
        let inputs: &'a AnyMap = self.inputs;
        match inputs.get(&id) {
            None => Ok(&[]),
            Some(values) => values
                .downcast_ref::<Vec<T>>()
                .map(Vec::as_slice)
                .ok_or_else(|| Error::table_type_mismatch(id.raw(), type_name::<T>())),
        }
    }

    /// Returns the comparer override registered for a node, if any.
    pub fn comparer_for<T: NodeValue>(&self, id: NodeId) -> Option<SharedComparer<T>> {
        self.comparers
            .get(&id)?
            .downcast_ref::<SharedComparer<T>>()
            .cloned()
    }

    pub(crate) fn finish(self) -> (TableMap, Option<Vec<RunStep>>, RunStats) {
        (self.latest, self.steps, self.stats)
    }
}
