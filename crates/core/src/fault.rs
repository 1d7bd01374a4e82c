//! Opaque failure causes carried by faulted tables.

use alloc::string::String;
use alloc::sync::Arc;
use core::error::Error as StdError;
use core::fmt;

/// The cause of a node failure.
///
/// A fault is produced when a user transform fails and is then carried,
/// unchanged, through every downstream table of the same run. Cloning is cheap
/// and every clone refers to the same underlying cause.
#[derive(Clone)]
pub struct Fault {
    cause: Arc<dyn StdError + Send + Sync + 'static>,
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for Message {}

impl Fault {
    /// Wraps an error value as a fault.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            cause: Arc::new(error),
        }
    }

    /// Creates a fault from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    /// Returns the underlying cause.
    #[inline]
    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.cause
    }

    /// Attempts to view the cause as a concrete error type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.cause.downcast_ref::<E>()
    }

    /// Returns true if both faults share the same originating cause.
    #[inline]
    pub fn same_cause(&self, other: &Fault) -> bool {
        Arc::ptr_eq(&self.cause, &other.cause)
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Fault").field(&self.cause).finish()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.cause, f)
    }
}

impl From<crate::Error> for Fault {
    fn from(error: crate::Error) -> Self {
        Fault::new(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use alloc::string::ToString;

    #[test]
    fn test_fault_msg() {
        let fault = Fault::msg("boom");
        assert_eq!(fault.to_string(), "boom");
    }

    #[test]
    fn test_fault_downcast() {
        let fault = Fault::from(Error::invalid_state("bad baseline"));
        let cause = fault.downcast_ref::<Error>().unwrap();
        assert!(matches!(cause, Error::InvalidState { .. }));
        assert!(fault.downcast_ref::<Message>().is_none());
    }

    #[test]
    fn test_fault_clone_shares_cause() {
        let fault = Fault::msg("boom");
        let carried = fault.clone();
        assert!(fault.same_cause(&carried));
        assert!(!fault.same_cause(&Fault::msg("boom")));
    }
}
