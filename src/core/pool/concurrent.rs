//! Concurrent map strategy.
//!
//! Availability lives in a `DashMap`; `get_mut` holds the shard's write lock
//! for the duration of the check-and-flip, so two acquirers can never both see
//! the same stone as free. The stone list itself only changes in `build_model`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::{return_permit, StonePool};
use crate::core::{PoolError, Stone};
use crate::sync::{FairSemaphore, Interrupt, PermitSemaphore};
use crate::util::serde::{GazerId, PoolStrategy, StoneId};

/// Pool backed by a sharded concurrent map.
pub struct ConcurrentPool {
    semaphore: Arc<dyn PermitSemaphore>,
    stones: RwLock<Vec<Arc<Stone>>>,
    /// `true` when the stone is free.
    available: DashMap<StoneId, bool>,
    shutdown: AtomicBool,
}

impl ConcurrentPool {
    /// Creates an empty pool gated by `semaphore`. Call `build_model` before use.
    #[must_use]
    pub fn new(semaphore: Arc<dyn PermitSemaphore>) -> Self {
        Self {
            semaphore,
            stones: RwLock::new(Vec::new()),
            available: DashMap::new(),
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

    /// Flips the first free stone to held.
    fn claim(&self) -> Option<Arc<Stone>> {
        let stones = self.stones.read();
        for stone in stones.iter() {
            if let Some(mut free) = self.available.get_mut(&stone.id()) {
                if *free {
                    *free = false;
                    return Some(Arc::clone(stone));
                }
            }
        }
        None
    }
}

impl StonePool for ConcurrentPool {
    fn strategy(&self) -> PoolStrategy {
        PoolStrategy::Concurrent
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

        let mut current = self.stones.write();
        self.available.clear();
        for stone in &stones {
            self.available.insert(stone.id(), true);
        }
        *current = stones;
        self.semaphore.reset(current.len());
        self.shutdown.store(false, Ordering::Release);
        info!(capacity = current.len(), "concurrent pool built");
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

        if let Some(stone) = self.claim() {
            debug!(gazer_id = %gazer, stone_id = %stone.id(), "stone acquired");
            return Ok(stone);
        }

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
            let Some(mut free) = self.available.get_mut(&stone.id()) else {
                return Err(PoolError::UnknownStone(stone.id()));
            };
            if *free {
                warn!(gazer_id = %gazer, stone_id = %stone.id(), "release of a free stone ignored");
                return Ok(());
            }
            *free = true;
        }

        self.semaphore.release()?;
        debug!(gazer_id = %gazer, stone_id = %stone.id(), "stone released");
        Ok(())
    }

    fn stones(&self) -> Vec<Arc<Stone>> {
        self.stones.read().clone()
    }

    fn capacity(&self) -> usize {
        self.stones.read().len()
    }

    fn held_count(&self) -> usize {
        self.available.iter().filter(|entry| !*entry.value()).count()
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
            info!("concurrent pool shut down");
        }
    }

    fn reset(&self) {
        let stones = self.stones.read();
        for stone in stones.iter() {
            stone.reset();
            self.available.insert(stone.id(), true);
        }
        self.semaphore.reset(stones.len());
        self.shutdown.store(false, Ordering::Release);
        debug!(capacity = stones.len(), "concurrent pool reset");
    }
}
