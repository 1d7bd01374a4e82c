//! Entry type for node state tables.
//!
//! An entry pairs an output value with an [`EntryState`] describing why the
//! value looks the way it does relative to the previous run.

/// Change state of a table entry, relative to the previous run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryState {
    /// No counterpart existed in the previous run.
    Added,
    /// The counterpart in the previous run compared unequal.
    Modified,
    /// The counterpart in the previous run compared equal; the previous value is kept.
    Cached,
    /// The previous value no longer has a counterpart in this run.
    Removed,
}

impl EntryState {
    #[inline]
    pub fn is_added(self) -> bool {
        self == EntryState::Added
    }

    #[inline]
    pub fn is_modified(self) -> bool {
        self == EntryState::Modified
    }

    #[inline]
    pub fn is_cached(self) -> bool {
        self == EntryState::Cached
    }

    #[inline]
    pub fn is_removed(self) -> bool {
        self == EntryState::Removed
    }

    /// Returns true if the entry corresponds to an entry of the previous run.
    #[inline]
    pub fn has_previous(self) -> bool {
        self != EntryState::Added
    }
}

/// One output value together with its change state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry<T> {
    /// The output value
    pub value: T,
    /// Why the value is what it is
    pub state: EntryState,
}

impl<T> Entry<T> {
    /// Creates a new entry.
    #[inline]
    pub fn new(value: T, state: EntryState) -> Self {
        Self { value, state }
    }

    #[inline]
    pub fn added(value: T) -> Self {
        Self::new(value, EntryState::Added)
    }

    #[inline]
    pub fn cached(value: T) -> Self {
        Self::new(value, EntryState::Cached)
    }

    #[inline]
    pub fn modified(value: T) -> Self {
        Self::new(value, EntryState::Modified)
    }

    #[inline]
    pub fn removed(value: T) -> Self {
        Self::new(value, EntryState::Removed)
    }

    /// Returns a reference to the value.
    #[inline]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Returns the state.
    #[inline]
    pub fn state(&self) -> EntryState {
        self.state
    }

    /// Returns the same value with a different state.
    #[inline]
    pub fn with_state(self, state: EntryState) -> Self {
        Self {
            value: self.value,
            state,
        }
    }

    /// Maps the value, preserving the state.
    #[inline]
    pub fn map<U, F>(self, f: F) -> Entry<U>
    where
        F: FnOnce(T) -> U,
    {
        Entry {
            value: f(self.value),
            state: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_state_predicates() {
        assert!(EntryState::Added.is_added());
        assert!(!EntryState::Added.has_previous());
        assert!(EntryState::Modified.has_previous());
        assert!(EntryState::Cached.is_cached());
        assert!(EntryState::Removed.is_removed());
        assert!(EntryState::Removed.has_previous());
    }

    #[test]
    fn test_entry_with_state() {
        let entry = Entry::added(42).with_state(EntryState::Cached);
        assert_eq!(entry, Entry::cached(42));
    }

    #[test]
    fn test_entry_map() {
        let entry = Entry::modified(21).map(|x| x * 2);
        assert_eq!(entry.value, 42);
        assert_eq!(entry.state, EntryState::Modified);
    }
}
