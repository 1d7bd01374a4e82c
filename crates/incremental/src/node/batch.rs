//! Batch node: collapses a whole upstream sequence into one table entry.

use super::{contract_violation, transform_fault, BatchFn, IncrementalNode, NodeHandle, NodeId, NodeValue};
use crate::driver::DriverStateTableBuilder;
use crate::entry::EntryState;
use crate::table::{NodeStateTable, NodeStateTableBuilder};
use alloc::sync::Arc;
use skein_core::{CancellationToken, Result, SharedComparer};

/// Reduces all values of its upstream table into a single table entry.
///
/// Semantics of a batch:
/// - a batch always exists; the batch of an empty upstream is still one entry
///   holding whatever the function returns for zero items;
/// - the function sees current values only, never their states;
/// - the output is added when there was no previous table and diffed against
///   the previous single entry otherwise, so an upstream change that does not
///   change the reduction is reported as cached.
pub struct BatchNode<I, O> {
    id: NodeId,
    source: NodeHandle<I>,
    func: BatchFn<I, O>,
    comparer: SharedComparer<O>,
}

impl<I: NodeValue, O: NodeValue> BatchNode<I, O> {
    pub(crate) fn new(
        id: NodeId,
        source: NodeHandle<I>,
        func: BatchFn<I, O>,
        comparer: SharedComparer<O>,
    ) -> Self {
        Self {
            id,
            source,
            func,
            comparer,
        }
    }
}

impl<I: NodeValue, O: NodeValue> IncrementalNode<O> for BatchNode<I, O> {
    fn kind(&self) -> &'static str {
        "batch"
    }

    fn update_state_table(
        &self,
        builder: &mut DriverStateTableBuilder<'_>,
        previous: Arc<NodeStateTable<O>>,
        cancel: &CancellationToken,
    ) -> Result<Arc<NodeStateTable<O>>> {
        cancel.check()?;

        let source_table = builder.get_latest_state_table_for_node(&self.source)?;
        if source_table.is_compacted() && !previous.is_empty() {
            return Ok(previous);
        }
        if source_table.is_faulted() {
            return Ok(Arc::new(NodeStateTable::from_faulted(&source_table)));
        }

        let source = source_table.batch();
        let transformed = match (self.func)(&source, cancel) {
            Ok(values) => values,
            Err(fault) => return transform_fault(self.id, fault, cancel),
        };
        cancel.check()?;

        let comparer = builder
            .comparer_for::<O>(self.id)
            .unwrap_or_else(|| Arc::clone(&self.comparer));

        let mut table = NodeStateTableBuilder::with_capacity(&previous, 1);
        if previous.is_empty() {
            table.add_entries(transformed, EntryState::Added);
        } else if previous.entry_count() == 1 {
            table.modify_entries_from_previous_table(transformed, &*comparer);
        } else {
            return Ok(contract_violation(
                self.id,
                "batch baseline must hold exactly one entry",
            ));
        }
        Ok(Arc::new(table.build()))
    }
}
