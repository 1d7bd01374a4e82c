//! Combine node: pairs every left value with the single right value.

use super::{IncrementalNode, NodeHandle, NodeId, NodeValue};
use crate::driver::DriverStateTableBuilder;
use crate::entry::EntryState;
use crate::table::{NodeStateTable, NodeStateTableBuilder};
use alloc::format;
use alloc::sync::Arc;
use skein_core::{CancellationToken, Error, Fault, Result, SharedComparer};

/// Pairs each item of the left table with the one item of the right table.
///
/// The right input is expected to be a singleton, typically a batch. A left
/// item keeps its state when the right item is cached; otherwise the pair is
/// diffed against its previous value.
pub struct CombineNode<L, R> {
    id: NodeId,
    left: NodeHandle<L>,
    right: NodeHandle<R>,
    comparer: SharedComparer<(L, R)>,
}

impl<L: NodeValue, R: NodeValue> CombineNode<L, R> {
    pub(crate) fn new(
        id: NodeId,
        left: NodeHandle<L>,
        right: NodeHandle<R>,
        comparer: SharedComparer<(L, R)>,
    ) -> Self {
        Self {
            id,
            left,
            right,
            comparer,
        }
    }
}

impl<L: NodeValue, R: NodeValue> IncrementalNode<(L, R)> for CombineNode<L, R> {
    fn kind(&self) -> &'static str {
        "combine"
    }

    fn update_state_table(
        &self,
        builder: &mut DriverStateTableBuilder<'_>,
        previous: Arc<NodeStateTable<(L, R)>>,
        cancel: &CancellationToken,
    ) -> Result<Arc<NodeStateTable<(L, R)>>> {
        cancel.check()?;

        let left_table = builder.get_latest_state_table_for_node(&self.left)?;
        let right_table = builder.get_latest_state_table_for_node(&self.right)?;
        if left_table.is_compacted() && right_table.is_compacted() && !previous.is_empty() {
            return Ok(previous);
        }
        if left_table.is_faulted() {
            return Ok(Arc::new(NodeStateTable::from_faulted(&left_table)));
        }
        if right_table.is_faulted() {
            return Ok(Arc::new(NodeStateTable::from_faulted(&right_table)));
        }

        let Some(right) = right_table.single() else {
            let found = right_table.values().count();
            log::debug!("{} right input holds {} items", self.id, found);
            return Ok(Arc::new(NodeStateTable::from_fault(Fault::from(
                Error::invalid_state(format!(
                    "{}: combine expects exactly one right item, found {}",
                    self.id, found
                )),
            ))));
        };

        let comparer = builder
            .comparer_for::<(L, R)>(self.id)
            .unwrap_or_else(|| Arc::clone(&self.comparer));

        let mut table = NodeStateTableBuilder::with_capacity(&previous, left_table.len());
        for entry in left_table.iter() {
            cancel.check()?;
            let pair = || (entry.value.clone(), right.value.clone());
            match (entry.state, right.state) {
                (EntryState::Removed, _) => {
                    table.try_remove_entries();
                }
                (EntryState::Added, _) => table.add_entry(pair(), EntryState::Added),
                (EntryState::Cached, EntryState::Cached) if table.try_use_cached_entries() => {}
                _ => {
                    if let Err(pair) = table.try_modify_entry(pair(), &*comparer) {
                        table.add_entry(pair, EntryState::Added);
                    }
                }
            }
        }
        cancel.check()?;

        Ok(Arc::new(table.build()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{baseline, populated, tagged, Harness, NODE};
    use alloc::vec;
    use skein_core::default_comparer;

    type Pair = (i32, i32);

    fn combine(
        harness: &mut Harness,
        left: NodeStateTable<i32>,
        right: NodeStateTable<i32>,
    ) -> CombineNode<i32, i32> {
        let left = harness.upstream(left);
        let right = harness.upstream(right);
        CombineNode::new(NODE, left, right, default_comparer())
    }

    #[test]
    fn test_left_states_with_cached_right() {
        let mut harness = Harness::new();
        let node = combine(
            &mut harness,
            populated(vec![
                (1, EntryState::Cached),
                (5, EntryState::Modified),
                (3, EntryState::Removed),
                (4, EntryState::Added),
            ]),
            populated(vec![(10, EntryState::Cached)]),
        );
        let previous = Arc::new(baseline(vec![(1, 10), (2, 10), (3, 10)]));

        let table = harness.update(&node, &previous).unwrap();
        assert_eq!(
            tagged(&table),
            vec![
                ((1, 10), EntryState::Cached),
                ((5, 10), EntryState::Modified),
                ((3, 10), EntryState::Removed),
                ((4, 10), EntryState::Added),
            ]
        );
    }

    #[test]
    fn test_modified_right_rediffs_cached_left() {
        let mut harness = Harness::new();
        let node = combine(
            &mut harness,
            populated(vec![(1, EntryState::Cached), (2, EntryState::Cached)]),
            populated(vec![(20, EntryState::Modified)]),
        );
        let previous = Arc::new(baseline(vec![(1, 10), (2, 10)]));

        let table = harness.update(&node, &previous).unwrap();
        assert_eq!(
            tagged(&table),
            vec![((1, 20), EntryState::Modified), ((2, 20), EntryState::Modified)]
        );
    }

    #[test]
    fn test_modified_right_with_equal_pairs_is_cached() {
        let mut harness = Harness::new();
        let node = combine(
            &mut harness,
            populated(vec![(1, EntryState::Cached)]),
            populated(vec![(10, EntryState::Modified)]),
        );
        let previous = Arc::new(baseline(vec![(1, 10)]));

        let table = harness.update(&node, &previous).unwrap();
        assert_eq!(tagged(&table), vec![((1, 10), EntryState::Cached)]);
    }

    #[test]
    fn test_added_right_over_empty_previous_adds() {
        let mut harness = Harness::new();
        let node = combine(
            &mut harness,
            populated(vec![(1, EntryState::Cached), (2, EntryState::Modified)]),
            populated(vec![(10, EntryState::Added)]),
        );

        let table = harness
            .update(&node, &Arc::new(NodeStateTable::<Pair>::empty()))
            .unwrap();
        assert_eq!(
            tagged(&table),
            vec![((1, 10), EntryState::Added), ((2, 10), EntryState::Added)]
        );
    }

    #[test]
    fn test_both_compacted_reuses_previous() {
        let mut harness = Harness::new();
        let node = combine(&mut harness, baseline(vec![1]), baseline(vec![10]));
        let previous = Arc::new(baseline(vec![(1, 10)]));

        let table = harness.update(&node, &previous).unwrap();
        assert!(Arc::ptr_eq(&table, &previous));
    }

    #[test]
    fn test_one_side_compacted_recomputes() {
        let mut harness = Harness::new();
        let node = combine(
            &mut harness,
            baseline(vec![1]),
            populated(vec![(20, EntryState::Modified)]),
        );
        let previous = Arc::new(baseline(vec![(1, 10)]));

        let table = harness.update(&node, &previous).unwrap();
        assert!(!Arc::ptr_eq(&table, &previous));
        assert_eq!(tagged(&table), vec![((1, 20), EntryState::Modified)]);
    }

    #[test]
    fn test_right_must_be_single() {
        let mut harness = Harness::new();
        let node = combine(
            &mut harness,
            populated(vec![(1, EntryState::Added)]),
            populated(vec![(10, EntryState::Added), (20, EntryState::Added)]),
        );

        let table = harness
            .update(&node, &Arc::new(NodeStateTable::<Pair>::empty()))
            .unwrap();
        assert!(matches!(
            table.fault().unwrap().downcast_ref::<Error>(),
            Some(Error::InvalidState { .. })
        ));
    }

    #[test]
    fn test_faulted_side_faults() {
        let mut harness = Harness::new();
        let fault = Fault::msg("right failed");
        let node = combine(
            &mut harness,
            populated(vec![(1, EntryState::Added)]),
            NodeStateTable::from_fault(fault.clone()),
        );

        let table = harness
            .update(&node, &Arc::new(NodeStateTable::<Pair>::empty()))
            .unwrap();
        assert!(table.fault().unwrap().same_cause(&fault));
    }
}
