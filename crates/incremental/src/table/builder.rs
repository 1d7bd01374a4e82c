//! Two-phase construction of node state tables.

use super::{NodeStateTable, TableEntry};
use crate::entry::{Entry, EntryState};
use alloc::vec::Vec;
use core::cmp;
use core::iter;
use skein_core::Comparer;

/// Builds the next version of a node's table against its previous version.
///
/// The builder walks the previous table's groups in order. Every operation
/// that relates a new group to a previous one (cached, modified, removed)
/// consumes the next previous group; added groups consume nothing. This keeps
/// the non-added groups of the new table aligned one-to-one with the groups of
/// the previous table.
///
/// The builder is consumed by [`build`](Self::build); only the frozen table
/// leaves the node that built it.
pub struct NodeStateTableBuilder<'a, T> {
    previous: &'a NodeStateTable<T>,
    /// Index of the next previous group to consume
    cursor: usize,
    entries: Vec<TableEntry<T>>,
}

impl<'a, T: Clone> NodeStateTableBuilder<'a, T> {
    /// Creates a builder diffing against `previous`.
    pub fn new(previous: &'a NodeStateTable<T>) -> Self {
        Self::with_capacity(previous, previous.entry_count())
    }

    /// Creates a builder with room for `capacity` groups.
    pub fn with_capacity(previous: &'a NodeStateTable<T>, capacity: usize) -> Self {
        Self {
            previous,
            cursor: 0,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of groups added so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of previous groups not yet consumed.
    #[inline]
    pub fn remaining_previous(&self) -> usize {
        self.previous.entry_count().saturating_sub(self.cursor)
    }

    fn next_previous(&mut self) -> Option<&'a TableEntry<T>> {
        let previous: &'a NodeStateTable<T> = self.previous;
        let group = previous.entries().get(self.cursor)?;
        self.cursor += 1;
        Some(group)
    }

    /// Appends a group of values all tagged with `state`.
    pub fn add_entries<I>(&mut self, values: I, state: EntryState)
    where
        I: IntoIterator<Item = T>,
    {
        if state.has_previous() && self.next_previous().is_none() {
            log::trace!("{:?} group added past the end of the previous table", state);
        }
        let items = values.into_iter().map(|v| Entry::new(v, state)).collect();
        if state.is_removed() {
            self.entries.push(TableEntry::removed(items));
        } else {
            self.entries.push(TableEntry::new(items));
        }
    }

    /// Appends a single-value group tagged with `state`.
    #[inline]
    pub fn add_entry(&mut self, value: T, state: EntryState) {
        self.add_entries(iter::once(value), state);
    }

    /// Reuses the next previous group unchanged.
    ///
    /// Returns false if the previous table has no group left to reuse.
    pub fn try_use_cached_entries(&mut self) -> bool {
        let Some(group) = self.next_previous() else {
            return false;
        };
        let items = group.values().map(|v| Entry::cached(v.clone())).collect();
        self.entries.push(TableEntry::new(items));
        true
    }

    /// Marks the next previous group as removed.
    ///
    /// Returns false if the previous table has no group left to remove.
    pub fn try_remove_entries(&mut self) -> bool {
        let Some(group) = self.next_previous() else {
            return false;
        };
        let items = group.values().map(|v| Entry::removed(v.clone())).collect();
        self.entries.push(TableEntry::removed(items));
        true
    }

    /// Diffs `values` positionally against the next previous group.
    ///
    /// Hands `values` back if the previous table has no group left to diff
    /// against.
    pub fn try_modify_entries(
        &mut self,
        values: Vec<T>,
        comparer: &dyn Comparer<T>,
    ) -> Result<(), Vec<T>> {
        let Some(group) = self.next_previous() else {
            return Err(values);
        };
        self.entries.push(diff_group(group, values, comparer));
        Ok(())
    }

    /// Single-value form of [`try_modify_entries`](Self::try_modify_entries).
    pub fn try_modify_entry(&mut self, value: T, comparer: &dyn Comparer<T>) -> Result<(), T> {
        let Some(group) = self.next_previous() else {
            return Err(value);
        };
        self.entries.push(diff_group(group, alloc::vec![value], comparer));
        Ok(())
    }

    /// Diffs `values` against the next previous group, or adds them if the
    /// previous table has none left.
    pub fn modify_entries_from_previous_table(&mut self, values: Vec<T>, comparer: &dyn Comparer<T>) {
        match self.next_previous() {
            Some(group) => self.entries.push(diff_group(group, values, comparer)),
            None => self
                .entries
                .push(TableEntry::new(values.into_iter().map(Entry::added).collect())),
        }
    }

    /// Freezes the builder into a populated table.
    pub fn build(self) -> NodeStateTable<T> {
        if self.remaining_previous() > 0 {
            log::trace!(
                "{} previous groups left unconsumed by the new table",
                self.remaining_previous()
            );
        }
        NodeStateTable::from_entries(self.entries, false)
    }
}

/// Positional diff of one group.
///
/// Shared positions become cached (keeping the previous value) or modified;
/// leftover previous values become removed; leftover new values become added.
fn diff_group<T: Clone>(
    previous: &TableEntry<T>,
    values: Vec<T>,
    comparer: &dyn Comparer<T>,
) -> TableEntry<T> {
    let old: Vec<&T> = previous.values().collect();
    let shared = cmp::min(old.len(), values.len());
    let mut items = Vec::with_capacity(cmp::max(old.len(), values.len()));

    let mut values = values.into_iter();
    for (prev, value) in old.iter().zip(values.by_ref().take(shared)) {
        if comparer.equals(prev, &value) {
            items.push(Entry::cached((*prev).clone()));
        } else {
            items.push(Entry::modified(value));
        }
    }
    items.extend(old[shared..].iter().map(|prev| Entry::removed((*prev).clone())));
    items.extend(values.map(Entry::added));

    TableEntry::new(items)
}
