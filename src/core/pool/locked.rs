//! Mutex + hash map strategy.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{return_permit, StonePool};
use crate::core::{PoolError, Stone};
use crate::sync::{FairSemaphore, Interrupt, PermitSemaphore};
use crate::util::serde::{GazerId, PoolStrategy, StoneId};

#[derive(Debug, Default)]
struct LockedInner {
    stones: Vec<Arc<Stone>>,
    /// `true` when the stone is free.
    available: HashMap<StoneId, bool>,
}

/// Pool whose availability map sits behind one mutex.
pub struct LockedPool {
    semaphore: Arc<dyn PermitSemaphore>,
    inner: Mutex<LockedInner>,
    shutdown: AtomicBool,
}

impl LockedPool {
    /// Creates an empty pool gated by `semaphore`. Call `build_model` before use.
    #[must_use]
    pub fn new(semaphore: Arc<dyn PermitSemaphore>) -> Self {
        Self {
            semaphore,
            inner: Mutex::new(LockedInner::default()),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Creates a pool of `capacity` fresh stones behind a [`FairSemaphore`].
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Empty` if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Result<Self, PoolError> {
        let pool = Self::new(Arc::new(FairSemaphore::new(0)));
        pool.build_model(Stone::forge(capacity))?;
        Ok(pool)
    }
}

impl StonePool for LockedPool {
    fn strategy(&self) -> PoolStrategy {
        PoolStrategy::Locked
    }

    fn build_model(&self, stones: Vec<Arc<Stone>>) -> Result<(), PoolError> {
        if stones.is_empty() {
            return Err(PoolError::Empty);
        }
        let held = self.held_count();
        let queued = self.semaphore.queue_length();
        if held > 0 || queued > 0 {
            return Err(PoolError::InUse { held, queued });
        }

        let mut inner = self.inner.lock();
        inner.available = stones.iter().map(|s| (s.id(), true)).collect();
        inner.stones = stones;
        self.semaphore.reset(inner.stones.len());
        self.shutdown.store(false, Ordering::Release);
        info!(capacity = inner.stones.len(), "locked pool built");
        Ok(())
    }

    fn acquire(&self, gazer: GazerId, interrupt: &Interrupt) -> Result<Arc<Stone>, PoolError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(PoolError::Cancelled);
        }
        self.semaphore.acquire(interrupt)?;
        if self.shutdown.load(Ordering::Acquire) {
            return_permit(self.semaphore.as_ref(), gazer);
            return Err(PoolError::Cancelled);
        }

        let mut inner = self.inner.lock();
        let found = inner
            .stones
            .iter()
            .find(|stone| inner.available.get(&stone.id()).copied() == Some(true))
            .cloned();
        if let Some(stone) = found {
            inner.available.insert(stone.id(), false);
            drop(inner);
            debug!(gazer_id = %gazer, stone_id = %stone.id(), "stone acquired");
            return Ok(stone);
        }
        drop(inner);

        return_permit(self.semaphore.as_ref(), gazer);
        Err(PoolError::PermitAccounting(format!(
            "{gazer} was granted a permit but no stone is free"
        )))
    }

    fn release(&self, gazer: GazerId, stone: Option<&Arc<Stone>>) -> Result<(), PoolError> {
        let Some(stone) = stone else {
            warn!(gazer_id = %gazer, "release without a stone ignored");
            return Ok(());
        };

        {
            let mut inner = self.inner.lock();
            match inner.available.get_mut(&stone.id()) {
                None => return Err(PoolError::UnknownStone(stone.id())),
                Some(free) if *free => {
                    warn!(gazer_id = %gazer, stone_id = %stone.id(), "release of a free stone ignored");
                    return Ok(());
                }
                Some(free) => *free = true,
            }
        }

        self.semaphore.release()?;
        debug!(gazer_id = %gazer, stone_id = %stone.id(), "stone released");
        Ok(())
    }

    fn stones(&self) -> Vec<Arc<Stone>> {
        self.inner.lock().stones.clone()
    }

    fn capacity(&self) -> usize {
        self.inner.lock().stones.len()
    }

    fn held_count(&self) -> usize {
        self.inner.lock().available.values().filter(|free| !**free).count()
    }

    fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    fn queue_length(&self) -> usize {
        self.semaphore.queue_length()
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn shutdown(&self) {
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            info!("locked pool shut down");
        }
    }

    fn reset(&self) {
        let mut inner = self.inner.lock();
        for stone in &inner.stones {
            stone.reset();
        }
        for free in inner.available.values_mut() {
            *free = true;
        }
        self.semaphore.reset(inner.stones.len());
        self.shutdown.store(false, Ordering::Release);
        debug!(capacity = inner.stones.len(), "locked pool reset");
    }
}
