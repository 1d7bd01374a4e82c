//! Node state tables.
//!
//! A [`NodeStateTable`] is the materialized output of one node for one run.
//! It is built once through a [`NodeStateTableBuilder`], frozen, handed to the
//! node's consumers for the rest of the run, and finally converted with
//! [`NodeStateTable::as_cached`] into the baseline the node diffs against in
//! the next run.
//!
//! Tables are sequences of [`TableEntry`] groups. Each group holds the items
//! derived from one upstream item (a batch table holds exactly one group
//! derived from the whole upstream). Iterating a table flattens the groups.

mod builder;

pub use builder::NodeStateTableBuilder;

use crate::entry::{Entry, EntryState};
use alloc::vec::Vec;
use core::fmt;
use skein_core::{Error, Fault};

/// The items derived from one upstream item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableEntry<T> {
    items: Vec<Entry<T>>,
    /// The upstream item this group was derived from disappeared
    removed: bool,
}

impl<T> TableEntry<T> {
    pub(crate) fn new(items: Vec<Entry<T>>) -> Self {
        Self {
            items,
            removed: false,
        }
    }

    pub(crate) fn removed(items: Vec<Entry<T>>) -> Self {
        Self {
            items,
            removed: true,
        }
    }

    /// Returns the items of this group, including removed ones.
    #[inline]
    pub fn items(&self) -> &[Entry<T>] {
        &self.items
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true if the whole group was removed in this run.
    #[inline]
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Returns true if nothing in this group changed since the previous run.
    pub fn is_cached(&self) -> bool {
        !self.removed && self.items.iter().all(|e| e.state.is_cached())
    }

    /// Returns an iterator over the values that are still present.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.items
            .iter()
            .filter(|e| !e.state.is_removed())
            .map(|e| &e.value)
    }
}

impl<T: Clone> TableEntry<T> {
    /// Returns the baseline form of this group, or `None` if it was removed.
    fn as_cached(&self) -> Option<Self> {
        if self.removed {
            return None;
        }
        let items = self
            .items
            .iter()
            .filter(|e| !e.state.is_removed())
            .map(|e| Entry::cached(e.value.clone()))
            .collect();
        Some(Self::new(items))
    }
}

/// Which of the four disjoint conditions a table is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TableCondition {
    /// Never populated.
    Empty,
    /// The computation failed; the table carries a fault instead of entries.
    Faulted,
    /// Identical to the previous run; nothing to propagate.
    Compacted,
    /// A freshly built sequence of entries with change states.
    Populated,
}

/// Number of items per [`EntryState`] in a table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StateCounts {
    pub added: usize,
    pub modified: usize,
    pub cached: usize,
    pub removed: usize,
}

impl StateCounts {
    /// Returns the total number of items counted.
    #[inline]
    pub fn total(&self) -> usize {
        self.added + self.modified + self.cached + self.removed
    }
}

#[derive(Clone)]
enum TableState<T> {
    Empty,
    Faulted(Fault),
    Entries {
        entries: Vec<TableEntry<T>>,
        compacted: bool,
    },
}

/// The versioned output of one node for one run.
#[derive(Clone)]
pub struct NodeStateTable<T> {
    state: TableState<T>,
}

impl<T> Default for NodeStateTable<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> NodeStateTable<T> {
    /// Creates a table that was never populated.
    pub fn empty() -> Self {
        Self {
            state: TableState::Empty,
        }
    }

    /// Creates a faulted table carrying `fault`.
    pub fn from_fault(fault: Fault) -> Self {
        Self {
            state: TableState::Faulted(fault),
        }
    }

    /// Creates a faulted table carrying the fault of a faulted upstream table.
    ///
    /// An upstream table that is not faulted is a caller bug; release builds
    /// still produce a faulted table so the mistake cannot go unnoticed.
    pub fn from_faulted<U>(upstream: &NodeStateTable<U>) -> Self {
        match upstream.fault() {
            Some(fault) => Self::from_fault(fault.clone()),
            None => {
                debug_assert!(false, "from_faulted called with a non-faulted table");
                Self::from_fault(Fault::from(Error::invalid_state(
                    "fault propagated from a table that is not faulted",
                )))
            }
        }
    }

    pub(crate) fn from_entries(entries: Vec<TableEntry<T>>, compacted: bool) -> Self {
        Self {
            state: TableState::Entries { entries, compacted },
        }
    }

    /// Returns the condition this table is in.
    pub fn condition(&self) -> TableCondition {
        match &self.state {
            TableState::Empty => TableCondition::Empty,
            TableState::Faulted(_) => TableCondition::Faulted,
            TableState::Entries { compacted: true, .. } => TableCondition::Compacted,
            TableState::Entries { compacted: false, .. } => TableCondition::Populated,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self.state, TableState::Empty)
    }

    #[inline]
    pub fn is_faulted(&self) -> bool {
        matches!(self.state, TableState::Faulted(_))
    }

    #[inline]
    pub fn is_compacted(&self) -> bool {
        matches!(self.state, TableState::Entries { compacted: true, .. })
    }

    /// Returns true if every group is unchanged since the previous run.
    ///
    /// Compacted tables are always cached. A freshly built table can be
    /// cached without being compacted, in which case consumers still have to
    /// look at it.
    pub fn is_cached(&self) -> bool {
        match &self.state {
            TableState::Entries { entries, .. } => entries.iter().all(TableEntry::is_cached),
            _ => false,
        }
    }

    /// Returns the fault of a faulted table.
    pub fn fault(&self) -> Option<&Fault> {
        match &self.state {
            TableState::Faulted(fault) => Some(fault),
            _ => None,
        }
    }

    /// Returns the entry groups of this table.
    pub fn entries(&self) -> &[TableEntry<T>] {
        match &self.state {
            TableState::Entries { entries, .. } => entries,
            _ => &[],
        }
    }

    /// Returns the number of entry groups.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries().len()
    }

    /// Returns the number of items, including removed ones.
    pub fn len(&self) -> usize {
        self.entries().iter().map(TableEntry::len).sum()
    }

    /// Returns an iterator over all items in order, including removed ones.
    pub fn iter(&self) -> impl Iterator<Item = &Entry<T>> + '_ {
        self.entries().iter().flat_map(|group| group.items.iter())
    }

    /// Returns an iterator over the values that are still present.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries().iter().flat_map(|group| group.values())
    }

    /// Returns the only present item, if there is exactly one.
    pub fn single(&self) -> Option<&Entry<T>> {
        let mut live = self.iter().filter(|e| !e.state.is_removed());
        let first = live.next()?;
        match live.next() {
            Some(_) => None,
            None => Some(first),
        }
    }

    /// Counts the items per state.
    pub fn state_counts(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for entry in self.iter() {
            match entry.state {
                EntryState::Added => counts.added += 1,
                EntryState::Modified => counts.modified += 1,
                EntryState::Cached => counts.cached += 1,
                EntryState::Removed => counts.removed += 1,
            }
        }
        counts
    }
}

impl<T: Clone> NodeStateTable<T> {
    /// Materializes the present values in order, ignoring change states.
    pub fn batch(&self) -> Vec<T> {
        self.values().cloned().collect()
    }

    /// Converts this table into the baseline for the next run.
    ///
    /// Removed items and groups are dropped and every remaining item becomes
    /// cached. Faults are not remembered: a faulted table becomes empty so the
    /// node is computed afresh next time.
    pub fn as_cached(&self) -> Self {
        match &self.state {
            TableState::Empty | TableState::Faulted(_) => Self::empty(),
            TableState::Entries {
                compacted: true, ..
            } => self.clone(),
            TableState::Entries { entries, .. } => Self::from_entries(
                entries.iter().filter_map(TableEntry::as_cached).collect(),
                true,
            ),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeStateTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            TableState::Empty => f.write_str("NodeStateTable::Empty"),
            TableState::Faulted(fault) => f.debug_tuple("NodeStateTable::Faulted").field(fault).finish(),
            TableState::Entries { entries, compacted } => f
                .debug_struct("NodeStateTable")
                .field("compacted", compacted)
                .field("entries", entries)
                .finish(),
        }
    }
}
