//! What a single run produced.

use super::state::{downcast_table, TableMap};
use crate::node::{NodeHandle, NodeId, NodeValue};
use crate::table::{NodeStateTable, StateCounts, TableCondition};
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use skein_core::{Error, Fault, Result};

/// How a node's table was obtained in a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// The previous table was returned unchanged.
    Reused,
    /// A new table was built.
    Executed,
    /// The node faulted, on its own or because an upstream node did.
    Faulted,
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Reused => write!(f, "reused"),
            StepOutcome::Executed => write!(f, "executed"),
            StepOutcome::Faulted => write!(f, "faulted"),
        }
    }
}

/// One node invocation, recorded when step tracking is enabled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunStep {
    pub node: NodeId,
    /// Tracking name set on the pipeline, if any.
    pub name: Option<String>,
    pub kind: &'static str,
    pub outcome: StepOutcome,
    pub condition: TableCondition,
    pub added: usize,
    pub modified: usize,
    pub cached: usize,
    pub removed: usize,
}

impl RunStep {
    pub(crate) fn new(
        node: NodeId,
        name: Option<String>,
        kind: &'static str,
        outcome: StepOutcome,
        condition: TableCondition,
        counts: StateCounts,
    ) -> Self {
        Self {
            node,
            name,
            kind,
            outcome,
            condition,
            added: counts.added,
            modified: counts.modified,
            cached: counts.cached,
            removed: counts.removed,
        }
    }
}

/// Per-outcome node counts of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub executed: usize,
    pub reused: usize,
    pub faulted: usize,
}

impl RunStats {
    pub(crate) fn record(&mut self, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Reused => self.reused += 1,
            StepOutcome::Executed => self.executed += 1,
            StepOutcome::Faulted => self.faulted += 1,
        }
    }

    /// Returns the number of nodes computed in the run.
    #[inline]
    pub fn total(&self) -> usize {
        self.executed + self.reused + self.faulted
    }
}

/// The tables of one successful run.
///
/// Unlike the driver's baselines, these tables keep their change states, so
/// a host can see which outputs were added, modified, cached or removed.
pub struct RunResult {
    pipeline: u32,
    run: u64,
    tables: TableMap,
    steps: Vec<RunStep>,
    stats: RunStats,
}

impl RunResult {
    pub(crate) fn new(
        pipeline: u32,
        run: u64,
        tables: TableMap,
        steps: Vec<RunStep>,
        stats: RunStats,
    ) -> Self {
        Self {
            pipeline,
            run,
            tables,
            steps,
            stats,
        }
    }

    /// Returns the 1-based number of this run on its driver.
    #[inline]
    pub fn run_number(&self) -> u64 {
        self.run
    }

    /// Returns the table a node produced in this run.
    ///
    /// A handle of another pipeline is rejected with [`Error::UnknownNode`].
    pub fn table<T: NodeValue>(&self, node: &NodeHandle<T>) -> Result<Arc<NodeStateTable<T>>> {
        if node.pipeline() != self.pipeline {
            return Err(Error::unknown_node(node.id().raw()));
        }
        let table = self
            .tables
            .get(&node.id())
            .ok_or_else(|| Error::unknown_node(node.id().raw()))?;
        downcast_table(node.id(), table.as_ref())
    }

    /// Returns the condition of a node's table in this run.
    pub fn condition(&self, id: NodeId) -> Option<TableCondition> {
        self.tables.get(&id).map(|table| table.condition())
    }

    /// Returns the fault of every faulted node, ordered by node id.
    pub fn faults(&self) -> Vec<(NodeId, Fault)> {
        let mut faults: Vec<(NodeId, Fault)> = self
            .tables
            .iter()
            .filter_map(|(id, table)| table.fault().map(|fault| (*id, fault.clone())))
            .collect();
        faults.sort_by_key(|(id, _)| *id);
        faults
    }

    /// Returns true if any node faulted.
    pub fn is_faulted(&self) -> bool {
        self.tables.values().any(|table| table.fault().is_some())
    }

    /// Returns the recorded steps in invocation order.
    ///
    /// Empty unless step tracking is enabled in the driver options.
    pub fn steps(&self) -> &[RunStep] {
        &self.steps
    }

    #[inline]
    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Returns the number of nodes computed in this run.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl fmt::Debug for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunResult")
            .field("run", &self.run)
            .field("nodes", &self.tables.len())
            .field("stats", &self.stats)
            .finish()
    }
}
