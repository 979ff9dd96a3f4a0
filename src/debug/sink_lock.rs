#[cfg(feature = "std")]
use std::sync as impl_;

#[cfg(not(feature = "std"))]
use spin as impl_;

/// Process-wide slot for a replaceable collaborator.
///
/// Backed by `std::sync::RwLock` when `std` is enabled and by `spin::RwLock`
/// otherwise. A poisoned std lock is recovered rather than propagated: the
/// slot only ever holds a fully-written `Option<T>`.
#[repr(transparent)]
pub(crate) struct SinkLock<T: 'static + Send + Sync>(impl_::RwLock<Option<T>>);

impl<T: 'static + Send + Sync + Clone> SinkLock<T> {
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self(impl_::RwLock::new(None))
    }

    /// Returns a clone of the installed value.
    #[inline]
    pub(crate) fn get(&'static self) -> Option<T> {
        #[cfg(not(feature = "std"))]
        let guard = self.0.read();

        #[cfg(feature = "std")]
        let guard = self
            .0
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        guard.clone()
    }

    /// Installs `value`, returning the previous one.
    #[inline]
    pub(crate) fn replace(&'static self, value: Option<T>) -> Option<T> {
        #[cfg(not(feature = "std"))]
        let mut guard = self.0.write();

        #[cfg(feature = "std")]
        let mut guard = self
            .0
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        core::mem::replace(&mut *guard, value)
    }
}
