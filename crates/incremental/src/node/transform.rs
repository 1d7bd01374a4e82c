//! Transform node: maps every upstream value to zero or more outputs.

use super::{transform_fault, IncrementalNode, NodeHandle, NodeId, NodeValue, TransformFn};
use crate::driver::DriverStateTableBuilder;
use crate::entry::EntryState;
use crate::table::{NodeStateTable, NodeStateTableBuilder};
use alloc::sync::Arc;
use skein_core::{CancellationToken, Result, SharedComparer};

/// Applies a function to each upstream value independently.
///
/// Each upstream item yields one table entry. Cached upstream items reuse
/// their previous entry without calling the function; removed items remove
/// theirs; added and modified items are recomputed, modified ones diffed
/// against their previous entry.
pub struct TransformNode<I, O> {
    id: NodeId,
    kind: &'static str,
    source: NodeHandle<I>,
    func: TransformFn<I, O>,
    comparer: SharedComparer<O>,
}

impl<I: NodeValue, O: NodeValue> TransformNode<I, O> {
    pub(crate) fn new(
        id: NodeId,
        kind: &'static str,
        source: NodeHandle<I>,
        func: TransformFn<I, O>,
        comparer: SharedComparer<O>,
    ) -> Self {
        Self {
            id,
            kind,
            source,
            func,
            comparer,
        }
    }
}

impl<I: NodeValue, O: NodeValue> IncrementalNode<O> for TransformNode<I, O> {
    fn kind(&self) -> &'static str {
        self.kind
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

        let comparer = builder
            .comparer_for::<O>(self.id)
            .unwrap_or_else(|| Arc::clone(&self.comparer));

        let mut table = NodeStateTableBuilder::with_capacity(&previous, source_table.len());
        for entry in source_table.iter() {
            cancel.check()?;
            match entry.state {
                // Nothing to remove when there is no previous table.
                EntryState::Removed => {
                    table.try_remove_entries();
                }
                EntryState::Cached if table.try_use_cached_entries() => {}
                state => {
                    let outputs = match (self.func)(&entry.value, cancel) {
                        Ok(outputs) => outputs,
                        Err(fault) => return transform_fault(self.id, fault, cancel),
                    };
                    let outputs = if state.is_modified() {
                        match table.try_modify_entries(outputs, &*comparer) {
                            Ok(()) => continue,
                            Err(outputs) => outputs,
                        }
                    } else {
                        outputs
                    };
                    table.add_entries(outputs, EntryState::Added);
                }
            }
        }
        cancel.check()?;

        Ok(Arc::new(table.build()))
    }
}
