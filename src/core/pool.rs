//! Stone pool: admission through a fair semaphore, then an atomic scan-and-flip
//! over the availability map.
//!
//! Two strategies share one contract:
//!
//! - [`LockedPool`]: a `parking_lot::Mutex` around a `HashMap` of availability
//!   flags, taken only for the scan and never while blocked on the semaphore.
//! - [`ConcurrentPool`]: a `DashMap` whose per-entry write guard makes the flip
//!   atomic without a pool-wide lock.
//!
//! In both, the semaphore bounds concurrency to the pool size and supplies the
//! FIFO order, so a thread that gets past it always finds a free stone.
//!
//! # Example
//!
//! ```
//! use palantir_pool::core::{LockedPool, StonePool};
//! use palantir_pool::sync::Interrupt;
//! use palantir_pool::util::GazerId;
//!
//! let pool = LockedPool::with_capacity(2).unwrap();
//! let stone = pool.acquire(GazerId(0), &Interrupt::new()).unwrap();
//! assert_eq!(pool.available_permits(), 1);
//!
//! pool.release(GazerId(0), Some(&stone)).unwrap();
//! assert_eq!(pool.available_permits(), 2);
//! ```

mod concurrent;
mod locked;

use std::sync::Arc;

use crate::core::{PoolError, Stone};
use crate::sync::{Interrupt, PermitSemaphore};
use crate::util::serde::{GazerId, PoolStrategy};

pub use concurrent::ConcurrentPool;
pub use locked::LockedPool;

/// Contract shared by the pool strategies.
pub trait StonePool: Send + Sync {
    /// Which strategy this pool implements.
    fn strategy(&self) -> PoolStrategy;

    /// Installs `stones`, all free, with one permit per stone.
    ///
    /// # Errors
    ///
    /// - `PoolError::Empty` for an empty stone set
    /// - `PoolError::InUse` while stones are held or threads are queued
    fn build_model(&self, stones: Vec<Arc<Stone>>) -> Result<(), PoolError>;

    /// Blocks for a permit, then takes the first free stone in id order.
    ///
    /// # Errors
    ///
    /// - `PoolError::Cancelled` if the pool is shut down or `interrupt` fires
    /// - `PoolError::PermitAccounting` if a permit was granted with no free stone
    fn acquire(&self, gazer: GazerId, interrupt: &Interrupt) -> Result<Arc<Stone>, PoolError>;

    /// Marks `stone` free and returns its permit.
    ///
    /// `None` and already-free stones are logged and ignored.
    ///
    /// # Errors
    ///
    /// - `PoolError::UnknownStone` if the stone is not part of this pool
    /// - `PoolError::PermitAccounting` if the semaphore rejects the permit
    fn release(&self, gazer: GazerId, stone: Option<&Arc<Stone>>) -> Result<(), PoolError>;

    /// Every stone in id order.
    fn stones(&self) -> Vec<Arc<Stone>>;

    /// Pool size.
    fn capacity(&self) -> usize;

    /// Stones currently flagged as held.
    fn held_count(&self) -> usize;

    /// Free permits on the admission semaphore.
    fn available_permits(&self) -> usize;

    /// Threads queued on the admission semaphore.
    fn queue_length(&self) -> usize;

    /// Whether new acquires are being refused.
    fn is_shutdown(&self) -> bool;

    /// Refuses new acquires. Releases keep working.
    fn shutdown(&self);

    /// Frees every stone, restores all permits and clears shutdown.
    fn reset(&self);
}

/// Hands a permit back after an acquire that will not complete.
fn return_permit(semaphore: &dyn PermitSemaphore, gazer: GazerId) {
    if let Err(e) = semaphore.release() {
        tracing::error!(gazer_id = %gazer, error = %e, "failed to return permit");
    }
}
