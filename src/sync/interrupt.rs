//! Cooperative interruption for threads parked on a semaphore.
//!
//! An [`Interrupt`] is a sticky flag owned by one gazer thread and shared with
//! whoever may need to cancel it. While the owner is parked in a semaphore, the
//! parked waiter is registered here so `interrupt()` can wake it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::waiter::Waiter;

/// Cloneable cancellation handle for one thread.
///
/// # Examples
///
/// ```
/// use palantir_pool::sync::Interrupt;
///
/// let interrupt = Interrupt::new();
/// let remote = interrupt.clone();
/// remote.interrupt();
/// assert!(interrupt.is_interrupted());
/// assert!(interrupt.clear());
/// assert!(!interrupt.is_interrupted());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    inner: Arc<InterruptInner>,
}

#[derive(Debug, Default)]
struct InterruptInner {
    flag: AtomicBool,
    parked: Mutex<Option<Arc<Waiter>>>,
}

impl Interrupt {
    /// Creates a handle with the flag cleared.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag and wakes the owner if it is parked.
    pub fn interrupt(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        let parked = self.inner.parked.lock();
        if let Some(waiter) = parked.as_ref() {
            waiter.wake();
        }
    }

    /// Returns whether the flag is set, leaving it untouched.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Clears the flag, returning whether it was set.
    pub fn clear(&self) -> bool {
        self.inner.flag.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn register(&self, waiter: &Arc<Waiter>) {
        *self.inner.parked.lock() = Some(Arc::clone(waiter));
    }

    pub(crate) fn deregister(&self) {
        *self.inner.parked.lock() = None;
    }
}
