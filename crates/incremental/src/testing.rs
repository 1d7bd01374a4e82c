//! Fixtures for exercising a single node outside a driver run.

use crate::driver::{AnyMap, DriverStateTable, DriverStateTableBuilder};
use crate::entry::{Entry, EntryState};
use crate::node::{IncrementalNode, NodeHandle, NodeId, NodeValue};
use crate::pipeline::Pipeline;
use crate::table::{NodeStateTable, TableEntry};
use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use skein_core::{CancellationToken, Result, SharedComparer};

/// Id given to the node under test; never registered in the pipeline.
pub(crate) const NODE: NodeId = NodeId(99);

/// An upstream node that hands out the same table every time.
struct Fixed<T>(Arc<NodeStateTable<T>>);

impl<T: NodeValue> IncrementalNode<T> for Fixed<T> {
    fn kind(&self) -> &'static str {
        "fixed"
    }

    fn update_state_table(
        &self,
        _builder: &mut DriverStateTableBuilder<'_>,
        _previous: Arc<NodeStateTable<T>>,
        _cancel: &CancellationToken,
    ) -> Result<Arc<NodeStateTable<T>>> {
        Ok(Arc::clone(&self.0))
    }
}

/// A freshly built table with one group per item.
pub(crate) fn populated<T>(items: Vec<(T, EntryState)>) -> NodeStateTable<T> {
    let entries = items
        .into_iter()
        .map(|(value, state)| {
            let item = Entry::new(value, state);
            if state.is_removed() {
                TableEntry::removed(alloc::vec![item])
            } else {
                TableEntry::new(alloc::vec![item])
            }
        })
        .collect();
    NodeStateTable::from_entries(entries, false)
}

/// A baseline with one cached group per value.
pub(crate) fn baseline<T>(values: Vec<T>) -> NodeStateTable<T> {
    let entries = values
        .into_iter()
        .map(|value| TableEntry::new(alloc::vec![Entry::cached(value)]))
        .collect();
    NodeStateTable::from_entries(entries, true)
}

/// Every item of a table with its state, in order.
pub(crate) fn tagged<T: Clone>(table: &NodeStateTable<T>) -> Vec<(T, EntryState)> {
    table.iter().map(|e| (e.value.clone(), e.state)).collect()
}

/// A pipeline of fixed upstream tables plus the per-run maps a driver owns.
pub(crate) struct Harness {
    pipeline: Pipeline,
    state: DriverStateTable,
    inputs: AnyMap,
    comparers: AnyMap,
    pub(crate) cancel: CancellationToken,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let pipeline = Pipeline::new();
        Self {
            state: DriverStateTable::new(pipeline.id()),
            pipeline,
            inputs: AnyMap::new(),
            comparers: AnyMap::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Declares an upstream node producing `table` in every run.
    pub(crate) fn upstream<T: NodeValue>(&mut self, table: NodeStateTable<T>) -> NodeHandle<T> {
        let table = Arc::new(table);
        self.pipeline.add_node::<T, _, _>(move |_| Fixed(table))
    }

    pub(crate) fn set_input<T: NodeValue>(&mut self, values: Vec<T>) {
        self.inputs.insert(NODE, Box::new(values));
    }

    pub(crate) fn set_comparer<T: NodeValue>(&mut self, comparer: SharedComparer<T>) {
        self.comparers.insert(NODE, Box::new(comparer));
    }

    /// Runs `node` once against `previous`.
    pub(crate) fn update<T: NodeValue, N: IncrementalNode<T>>(
        &self,
        node: &N,
        previous: &Arc<NodeStateTable<T>>,
    ) -> Result<Arc<NodeStateTable<T>>> {
        let mut builder = DriverStateTableBuilder::new(
            &self.pipeline,
            &self.state,
            &self.inputs,
            &self.comparers,
            &self.cancel,
            false,
        );
        node.update_state_table(&mut builder, Arc::clone(previous), &self.cancel)
    }
}
