//! Per-thread parking record for the fair semaphore.
//!
//! A waiter pairs a small state mutex with its own condition variable, so a
//! releaser can wake exactly the thread at the head of the queue.

use parking_lot::{Condvar, Mutex, MutexGuard};

/// Outcome of a queued wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaiterState {
    /// Still queued.
    Waiting,
    /// A permit was handed over directly by a releaser.
    Granted,
    /// Evicted by a reset; no permit was handed over.
    Cancelled,
}

#[derive(Debug)]
pub(crate) struct Waiter {
    state: Mutex<WaiterState>,
    condvar: Condvar,
}

impl Waiter {
    pub(crate) const fn new() -> Self {
        Self {
            state: Mutex::new(WaiterState::Waiting),
            condvar: Condvar::new(),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, WaiterState> {
        self.state.lock()
    }

    /// Blocks until notified. The guard is released while parked.
    pub(crate) fn wait(&self, guard: &mut MutexGuard<'_, WaiterState>) {
        self.condvar.wait(guard);
    }

    /// Moves a waiting record to `outcome` and wakes its owner.
    ///
    /// Returns false if the record had already settled.
    pub(crate) fn settle(&self, outcome: WaiterState) -> bool {
        let mut state = self.state.lock();
        if *state != WaiterState::Waiting {
            return false;
        }
        *state = outcome;
        self.condvar.notify_one();
        true
    }

    /// Wakes the owner without changing state so it re-checks its interrupt.
    pub(crate) fn wake(&self) {
        let _state = self.state.lock();
        self.condvar.notify_one();
    }
}
