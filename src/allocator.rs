//! Storage accounting for message text.
//!
//! Every context charges the text it stores in messages (ids, summaries,
//! details, tags) to an [`Allocator`] taken from its [`Config`]. The memory
//! itself always comes from the global allocator; the collaborator decides
//! whether the engine may keep that much text around. This is what lets an
//! embedder cap diagnostic memory, and what drives the best-effort
//! truncation of over-long details.
//!
//! ```
//! use hexer::{Config, allocator::Budget};
//!
//! let config = Config::builder().allocator(Budget::new(4096)).build();
//! ```
//!
//! [`Config`]: crate::Config

use core::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

/// Error returned when an [`Allocator`] refuses a reservation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AllocError {
    /// Number of bytes that were requested.
    pub requested: usize,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "allocation of {} bytes refused", self.requested)
    }
}

impl core::error::Error for AllocError {}

/// Collaborator that grants and takes back storage for message text.
///
/// Implementations must be thread-safe because one [`Config`] (and thus one
/// allocator) is shared by the contexts of every thread.
///
/// [`Config`]: crate::Config
pub trait Allocator: 'static + Send + Sync {
    /// Requests permission to hold `bytes` more bytes.
    fn reserve(&self, bytes: usize) -> Result<(), AllocError>;

    /// Returns `bytes` previously granted by [`reserve`](Self::reserve).
    fn release(&self, bytes: usize);

    /// Bytes that can still be reserved, if the allocator knows.
    fn available(&self) -> Option<usize> {
        None
    }
}

/// Allocator that grants every request.
#[derive(Copy, Clone, Debug, Default)]
pub struct Unbounded;

impl Allocator for Unbounded {
    #[inline]
    fn reserve(&self, _bytes: usize) -> Result<(), AllocError> {
        Ok(())
    }

    #[inline]
    fn release(&self, _bytes: usize) {}
}

/// Allocator with a fixed byte quota.
///
/// Reservations beyond the quota fail; released bytes become available
/// again.
#[derive(Debug)]
pub struct Budget {
    limit: usize,
    used: AtomicUsize,
}

impl Budget {
    /// Creates a budget of `limit` bytes.
    pub const fn new(limit: usize) -> Self {
        Self {
            limit,
            used: AtomicUsize::new(0),
        }
    }

    /// The configured quota.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes currently reserved.
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }
}

impl Allocator for Budget {
    fn reserve(&self, bytes: usize) -> Result<(), AllocError> {
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(bytes).filter(|total| *total <= self.limit)
            })
            .map(|_| ())
            .map_err(|_| AllocError { requested: bytes })
    }

    fn release(&self, bytes: usize) {
        let _ = self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                Some(used.saturating_sub(bytes))
            });
    }

    fn available(&self) -> Option<usize> {
        Some(self.limit.saturating_sub(self.used()))
    }
}

impl<A: Allocator> Allocator for triomphe::Arc<A> {
    fn reserve(&self, bytes: usize) -> Result<(), AllocError> {
        (**self).reserve(bytes)
    }

    fn release(&self, bytes: usize) {
        (**self).release(bytes)
    }

    fn available(&self) -> Option<usize> {
        (**self).available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_refuses_over_quota() {
        let budget = Budget::new(10);
        assert!(budget.reserve(6).is_ok());
        assert_eq!(budget.reserve(5), Err(AllocError { requested: 5 }));
        assert_eq!(budget.available(), Some(4));
        budget.release(6);
        assert!(budget.reserve(10).is_ok());
        assert_eq!(budget.used(), 10);
    }

    #[test]
    fn test_release_never_underflows() {
        let budget = Budget::new(10);
        budget.release(3);
        assert_eq!(budget.used(), 0);
    }

    #[test]
    fn test_unbounded() {
        assert!(Unbounded.reserve(usize::MAX).is_ok());
        assert_eq!(Unbounded.available(), None);
    }
}
