//! Strictly fair counting semaphore.
//!
//! Permits are granted in arrival order. A thread may take a permit directly
//! only when nobody is queued; otherwise it joins the tail of the FIFO queue.
//! `release` hands a permit straight to the head waiter instead of bumping the
//! count, so a thread arriving between the release and the wakeup cannot take
//! the permit meant for the head.
//!
//! # Examples
//!
//! ```
//! use palantir_pool::sync::{FairSemaphore, Interrupt, PermitSemaphore};
//!
//! let semaphore = FairSemaphore::new(2);
//! let interrupt = Interrupt::new();
//!
//! semaphore.acquire(&interrupt).unwrap();
//! assert_eq!(semaphore.available_permits(), 1);
//!
//! semaphore.release().unwrap();
//! assert_eq!(semaphore.available_permits(), 2);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error};

use super::interrupt::Interrupt;
use super::waiter::{Waiter, WaiterState};
use crate::core::SemaphoreError;

/// Admission gate used by the stone pools.
///
/// Pools take this as a trait object so tests can substitute their own gate.
pub trait PermitSemaphore: Send + Sync + fmt::Debug {
    /// Blocks until a permit is granted or `interrupt` fires.
    ///
    /// A pending interrupt at entry is consumed and reported without queueing.
    ///
    /// # Errors
    ///
    /// - `SemaphoreError::Interrupted` if the interrupt fired; the flag is cleared
    /// - `SemaphoreError::Cancelled` if a reset evicted the waiter
    fn acquire(&self, interrupt: &Interrupt) -> Result<(), SemaphoreError>;

    /// Blocks until a permit is granted, ignoring interrupts.
    ///
    /// Interrupts raised meanwhile stay set on their handle.
    ///
    /// # Errors
    ///
    /// Returns `SemaphoreError::Cancelled` if a reset evicted the waiter.
    fn acquire_uninterruptibly(&self) -> Result<(), SemaphoreError>;

    /// Takes a permit only if one is free and nobody is queued.
    fn try_acquire(&self) -> bool;

    /// Returns one permit, handing it to the head waiter if there is one.
    ///
    /// # Errors
    ///
    /// Returns `SemaphoreError::PermitOverflow` if the count is already at its maximum.
    fn release(&self) -> Result<(), SemaphoreError>;

    /// Permits currently free.
    fn available_permits(&self) -> usize;

    /// Threads currently queued.
    fn queue_length(&self) -> usize;

    /// Maximum permits.
    fn max_permits(&self) -> usize;

    /// Sets the permit count and maximum to `permits`, evicting every waiter.
    fn reset(&self, permits: usize);
}

/// FIFO-fair semaphore built on an outer queue lock and per-waiter condvars.
#[derive(Debug)]
pub struct FairSemaphore {
    state: Mutex<SemaphoreState>,
}

#[derive(Debug)]
struct SemaphoreState {
    permits: usize,
    max_permits: usize,
    waiters: VecDeque<Arc<Waiter>>,
}

impl SemaphoreState {
    /// Hands one permit to the head waiter, or returns it to the count.
    fn release_one(&mut self) -> Result<(), SemaphoreError> {
        while let Some(waiter) = self.waiters.pop_front() {
            if waiter.settle(WaiterState::Granted) {
                return Ok(());
            }
        }
        if self.permits >= self.max_permits {
            return Err(SemaphoreError::PermitOverflow {
                max: self.max_permits,
            });
        }
        self.permits += 1;
        Ok(())
    }
}

impl FairSemaphore {
    /// Creates a semaphore with `permits` free permits.
    #[must_use]
    pub fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(SemaphoreState {
                permits,
                max_permits: permits,
                waiters: VecDeque::new(),
            }),
        }
    }

    fn acquire_inner(&self, interrupt: Option<&Interrupt>) -> Result<(), SemaphoreError> {
        let waiter = {
            let mut state = self.state.lock();
            if state.waiters.is_empty() && state.permits > 0 {
                state.permits -= 1;
                return Ok(());
            }
            let waiter = Arc::new(Waiter::new());
            state.waiters.push_back(Arc::clone(&waiter));
            waiter
        };

        if let Some(interrupt) = interrupt {
            interrupt.register(&waiter);
        }
        let outcome = {
            let mut state = waiter.lock();
            while *state == WaiterState::Waiting
                && !interrupt.is_some_and(Interrupt::is_interrupted)
            {
                waiter.wait(&mut state);
            }
            *state
        };
        if let Some(interrupt) = interrupt {
            interrupt.deregister();
        }

        match (outcome, interrupt) {
            (WaiterState::Granted, _) => Ok(()),
            (WaiterState::Cancelled, _) => Err(SemaphoreError::Cancelled),
            (WaiterState::Waiting, Some(interrupt)) => self.abandon(&waiter, interrupt),
            (WaiterState::Waiting, None) => unreachable!("uninterruptible wait woke while queued"),
        }
    }

    /// Leaves the queue after an interrupt, settling the grant-vs-cancel race.
    fn abandon(&self, waiter: &Arc<Waiter>, interrupt: &Interrupt) -> Result<(), SemaphoreError> {
        interrupt.clear();
        let mut state = self.state.lock();
        let mut waiter_state = waiter.lock();
        match *waiter_state {
            WaiterState::Waiting => {
                *waiter_state = WaiterState::Cancelled;
                drop(waiter_state);
                state.waiters.retain(|queued| !Arc::ptr_eq(queued, waiter));
                debug!(queued = state.waiters.len(), "waiter left queue after interrupt");
            }
            WaiterState::Granted => {
                // The grant raced with the interrupt; pass the permit on.
                drop(waiter_state);
                if let Err(e) = state.release_one() {
                    error!(error = %e, "failed to pass on permit granted to interrupted waiter");
                }
                debug!("interrupted waiter returned a concurrently granted permit");
            }
            WaiterState::Cancelled => return Err(SemaphoreError::Cancelled),
        }
        Err(SemaphoreError::Interrupted)
    }
}

impl PermitSemaphore for FairSemaphore {
    fn acquire(&self, interrupt: &Interrupt) -> Result<(), SemaphoreError> {
        if interrupt.clear() {
            return Err(SemaphoreError::Interrupted);
        }
        self.acquire_inner(Some(interrupt))
    }

    fn acquire_uninterruptibly(&self) -> Result<(), SemaphoreError> {
        self.acquire_inner(None)
    }

    fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        if state.waiters.is_empty() && state.permits > 0 {
            state.permits -= 1;
            true
        } else {
            false
        }
    }

    fn release(&self) -> Result<(), SemaphoreError> {
        self.state.lock().release_one()
    }

    fn available_permits(&self) -> usize {
        self.state.lock().permits
    }

    fn queue_length(&self) -> usize {
        self.state.lock().waiters.len()
    }

    fn max_permits(&self) -> usize {
        self.state.lock().max_permits
    }

    fn reset(&self, permits: usize) {
        let mut state = self.state.lock();
        let evicted = state.waiters.len();
        for waiter in state.waiters.drain(..) {
            waiter.settle(WaiterState::Cancelled);
        }
        state.permits = permits;
        state.max_permits = permits;
        debug!(permits, evicted, "semaphore reset");
    }
}
