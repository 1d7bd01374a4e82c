//! Running a pipeline, once per change of its inputs.

mod run;
mod state;

pub use run::{RunResult, RunStats, RunStep, StepOutcome};
pub use state::{DriverStateTable, DriverStateTableBuilder};

use crate::node::{NodeHandle, NodeValue};
use crate::pipeline::Pipeline;
use alloc::boxed::Box;
use alloc::format;
use alloc::vec::Vec;
use skein_core::{CancellationToken, Error, Result, SharedComparer};
pub(crate) use state::AnyMap;

/// Options fixed at driver construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DriverOptions {
    /// Record a [`RunStep`] for every node invocation.
    pub track_incremental_steps: bool,
}

impl DriverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables step tracking.
    pub fn track_incremental_steps(mut self, enabled: bool) -> Self {
        self.track_incremental_steps = enabled;
        self
    }
}

/// Owns a pipeline and the state carried between its runs.
///
/// Each [`run`](Self::run) computes every node once against the previous
/// run's baselines. A cancelled run leaves the driver exactly as it was, so
/// the next run diffs against the last completed one.
pub struct Driver {
    pipeline: Pipeline,
    options: DriverOptions,
    state: DriverStateTable,
    inputs: AnyMap,
    comparers: AnyMap,
    runs: u64,
}

impl Driver {
    /// Creates a driver with default options.
    pub fn new(pipeline: Pipeline) -> Self {
        Self::with_options(pipeline, DriverOptions::default())
    }

    /// Creates a driver with the given options.
    pub fn with_options(pipeline: Pipeline, options: DriverOptions) -> Self {
        Self {
            state: DriverStateTable::new(pipeline.id()),
            pipeline,
            options,
            inputs: AnyMap::new(),
            comparers: AnyMap::new(),
            runs: 0,
        }
    }

    #[inline]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    #[inline]
    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Returns the baselines of the last completed run.
    #[inline]
    pub fn state(&self) -> &DriverStateTable {
        &self.state
    }

    /// Returns the number of completed runs.
    #[inline]
    pub fn run_count(&self) -> u64 {
        self.runs
    }

    // -----------------------------------------------------------------------
    // Inputs and comparers
    // -----------------------------------------------------------------------

    /// Sets the values an input node produces from the next run on.
    pub fn set_input<T: NodeValue>(&mut self, input: &NodeHandle<T>, values: Vec<T>) -> Result<()> {
        let id = input.id();
        if !self.pipeline.owns(input) {
            return Err(Error::unknown_node(id.raw()));
        }
        match self.pipeline.kind_of(id) {
            None => Err(Error::unknown_node(id.raw())),
            Some("input") => {
                self.inputs.insert(id, Box::new(values));
                Ok(())
            }
            Some(kind) => Err(Error::invalid_state(format!(
                "{} is a {} node, not an input",
                id,
                kind
            ))),
        }
    }

    /// Removes the values of an input node; it produces nothing from the
    /// next run on.
    pub fn clear_input<T: NodeValue>(&mut self, input: &NodeHandle<T>) {
        if self.pipeline.owns(input) {
            self.inputs.remove(&input.id());
        }
    }

    /// Replaces the comparer a node diffs its outputs with.
    ///
    /// Takes effect on the next run. The topology is unchanged and no cached
    /// output is recomputed because of it; only outputs that are recomputed
    /// anyway are compared with the new comparer.
    pub fn set_comparer<T: NodeValue>(
        &mut self,
        node: &NodeHandle<T>,
        comparer: SharedComparer<T>,
    ) -> Result<()> {
        let id = node.id();
        if !self.pipeline.owns(node) {
            return Err(Error::unknown_node(id.raw()));
        }
        self.comparers.insert(id, Box::new(comparer));
        Ok(())
    }

    /// Restores the comparer the node was declared with.
    pub fn clear_comparer<T: NodeValue>(&mut self, node: &NodeHandle<T>) {
        if self.pipeline.owns(node) {
            self.comparers.remove(&node.id());
        }
    }

    // -----------------------------------------------------------------------
    // Running
    // -----------------------------------------------------------------------

    /// Computes every node of the pipeline.
    ///
    /// On success the run's tables become the baselines of the next run. On
    /// error, including cancellation, the driver state is left untouched.
    pub fn run(&mut self, cancel: &CancellationToken) -> Result<RunResult> {
        let run = self.runs + 1;
        log::debug!("run {} started over {} nodes", run, self.pipeline.len());

        let mut builder = DriverStateTableBuilder::new(
            &self.pipeline,
            &self.state,
            &self.inputs,
            &self.comparers,
            cancel,
            self.options.track_incremental_steps,
        );
        for node in self.pipeline.nodes() {
            if let Err(err) = node.pull(&mut builder) {
                log::debug!("run {} abandoned at {} ({}): {}", run, node.id(), node.kind(), err);
                return Err(err);
            }
        }
        let (tables, steps, stats) = builder.finish();

        self.state = DriverStateTable::from_run(self.pipeline.id(), &tables);
        self.runs = run;
        log::debug!(
            "run {} finished: {} executed, {} reused, {} faulted",
            run,
            stats.executed,
            stats.reused,
            stats.faulted
        );

        Ok(RunResult::new(
            self.pipeline.id(),
            run,
            tables,
            steps.unwrap_or_default(),
            stats,
        ))
    }

    /// Drops every baseline; the next run computes all nodes from scratch.
    pub fn reset(&mut self) {
        log::debug!("driver state reset after {} runs", self.runs);
        self.state = DriverStateTable::new(self.pipeline.id());
    }
}
