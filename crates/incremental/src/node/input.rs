//! Input node: the values the host supplies for a run.

use super::{IncrementalNode, NodeId, NodeValue};
use crate::driver::DriverStateTableBuilder;
use crate::entry::EntryState;
use crate::table::{NodeStateTable, NodeStateTableBuilder};
use alloc::sync::Arc;
use core::cmp;
use skein_core::{CancellationToken, Result, SharedComparer};

/// A pipeline source whose values are set on the driver before each run.
///
/// Values are diffed positionally against the previous run, one entry per
/// value. When nothing changed the previous table is returned, which lets
/// every downstream node short-circuit.
pub struct InputNode<T> {
    id: NodeId,
    comparer: SharedComparer<T>,
}

impl<T: NodeValue> InputNode<T> {
    pub(crate) fn new(id: NodeId, comparer: SharedComparer<T>) -> Self {
        Self { id, comparer }
    }
}

impl<T: NodeValue> IncrementalNode<T> for InputNode<T> {
    fn kind(&self) -> &'static str {
        "input"
    }

    fn update_state_table(
        &self,
        builder: &mut DriverStateTableBuilder<'_>,
        previous: Arc<NodeStateTable<T>>,
        cancel: &CancellationToken,
    ) -> Result<Arc<NodeStateTable<T>>> {
        cancel.check()?;

        let values = builder.input_values::<T>(self.id)?;
        let comparer = builder
            .comparer_for::<T>(self.id)
            .unwrap_or_else(|| Arc::clone(&self.comparer));

        let shared = cmp::min(previous.entry_count(), values.len());
        let mut table = NodeStateTableBuilder::with_capacity(
            &previous,
            cmp::max(previous.entry_count(), values.len()),
        );
        for value in &values[..shared] {
            if let Err(value) = table.try_modify_entry(value.clone(), &*comparer) {
                table.add_entry(value, EntryState::Added);
            }
        }
        while table.try_remove_entries() {}
        for value in &values[shared..] {
            table.add_entry(value.clone(), EntryState::Added);
        }
        let table = table.build();

        if !previous.is_empty() && table.is_cached() {
            return Ok(previous);
        }
        Ok(Arc::new(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{baseline, tagged, Harness, NODE};
    use alloc::vec;
    use skein_core::{comparer_fn, default_comparer};

    fn input() -> InputNode<i32> {
        InputNode::new(NODE, default_comparer())
    }

    #[test]
    fn test_first_values_are_added() {
        let mut harness = Harness::new();
        harness.set_input(vec![1, 2]);

        let table = harness
            .update(&input(), &Arc::new(NodeStateTable::empty()))
            .unwrap();
        assert_eq!(
            tagged(&table),
            vec![(1, EntryState::Added), (2, EntryState::Added)]
        );
        assert!(!table.is_compacted());
    }

    #[test]
    fn test_unset_input_with_no_previous_is_populated() {
        let harness = Harness::new();

        let table = harness
            .update(&input(), &Arc::new(NodeStateTable::empty()))
            .unwrap();
        assert!(!table.is_empty());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_unchanged_values_return_previous() {
        let mut harness = Harness::new();
        harness.set_input(vec![1, 2]);
        let previous = Arc::new(baseline(vec![1, 2]));

        let table = harness.update(&input(), &previous).unwrap();
        assert!(Arc::ptr_eq(&table, &previous));
        assert!(table.is_compacted());
    }

    #[test]
    fn test_unset_input_removes_previous_values() {
        let harness = Harness::new();

        let table = harness.update(&input(), &Arc::new(baseline(vec![1, 2]))).unwrap();
        assert_eq!(
            tagged(&table),
            vec![(1, EntryState::Removed), (2, EntryState::Removed)]
        );
    }

    #[test]
    fn test_shrinking_diffs_then_removes() {
        let mut harness = Harness::new();
        harness.set_input(vec![1, 5]);

        let table = harness
            .update(&input(), &Arc::new(baseline(vec![1, 2, 3])))
            .unwrap();
        assert_eq!(
            tagged(&table),
            vec![
                (1, EntryState::Cached),
                (5, EntryState::Modified),
                (3, EntryState::Removed),
            ]
        );
    }

    #[test]
    fn test_growing_appends_added() {
        let mut harness = Harness::new();
        harness.set_input(vec![1, 2, 3]);

        let table = harness.update(&input(), &Arc::new(baseline(vec![1]))).unwrap();
        assert_eq!(
            tagged(&table),
            vec![
                (1, EntryState::Cached),
                (2, EntryState::Added),
                (3, EntryState::Added),
            ]
        );
    }

    #[test]
    fn test_comparer_override_keeps_previous() {
        let mut harness = Harness::new();
        harness.set_input(vec![11]);
        harness.set_comparer(comparer_fn(|a: &i32, b: &i32| a % 10 == b % 10));
        let previous = Arc::new(baseline(vec![1]));

        let table = harness.update(&input(), &previous).unwrap();
        assert!(Arc::ptr_eq(&table, &previous));
        assert_eq!(table.batch(), vec![1]);
    }

    #[test]
    fn test_mistyped_input_is_reported() {
        let mut harness = Harness::new();
        harness.set_input(vec![1u8]);

        let result = harness.update(&input(), &Arc::new(NodeStateTable::empty()));
        assert_eq!(
            result.unwrap_err(),
            skein_core::Error::table_type_mismatch(NODE.raw(), core::any::type_name::<i32>())
        );
    }
}
