//! Equality contracts for node outputs.
//!
//! A comparer decides whether a value produced in this run is the same as the
//! value the node produced in the previous run. Equal values keep their
//! previous identity and are tagged cached; everything downstream of them can
//! then skip work.

use alloc::sync::Arc;
use core::fmt;
use core::marker::PhantomData;

/// An equality relation over node output values.
pub trait Comparer<T: ?Sized>: Send + Sync {
    /// Returns true if `previous` and `current` should be treated as unchanged.
    fn equals(&self, previous: &T, current: &T) -> bool;
}

/// A comparer shared between a node declaration and the tables it diffs.
pub type SharedComparer<T> = Arc<dyn Comparer<T>>;

/// Structural equality via `PartialEq`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DefaultComparer;

impl<T: PartialEq + ?Sized> Comparer<T> for DefaultComparer {
    #[inline]
    fn equals(&self, previous: &T, current: &T) -> bool {
        previous == current
    }
}

/// A comparer backed by a closure.
pub struct FnComparer<T: ?Sized, F> {
    func: F,
    _marker: PhantomData<fn(&T)>,
}

impl<T: ?Sized, F> FnComparer<T, F>
where
    F: Fn(&T, &T) -> bool + Send + Sync,
{
    /// Creates a comparer from an equality function.
    pub fn new(func: F) -> Self {
        Self {
            func,
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized, F> Comparer<T> for FnComparer<T, F>
where
    F: Fn(&T, &T) -> bool + Send + Sync,
{
    #[inline]
    fn equals(&self, previous: &T, current: &T) -> bool {
        (self.func)(previous, current)
    }
}

impl<T: ?Sized, F> fmt::Debug for FnComparer<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnComparer").finish_non_exhaustive()
    }
}

/// Returns the structural comparer for `T`.
pub fn default_comparer<T: PartialEq + 'static>() -> SharedComparer<T> {
    Arc::new(DefaultComparer)
}

/// Wraps a closure as a shared comparer.
pub fn comparer_fn<T, F>(func: F) -> SharedComparer<T>
where
    T: ?Sized + 'static,
    F: Fn(&T, &T) -> bool + Send + Sync + 'static,
{
    Arc::new(FnComparer::new(func))
}
