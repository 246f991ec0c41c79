//! Stones: the interchangeable, mutually exclusive units of the pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::util::serde::{GazerId, StoneId};

/// One unit of the shared pool.
///
/// The owner is written only by the controller while it holds its binding
/// lock, together with the owning gazer's held-stone slot.
#[derive(Debug)]
pub struct Stone {
    id: StoneId,
    owner: Mutex<Option<GazerId>>,
    gazes: AtomicU64,
}

impl Stone {
    /// Creates a free stone.
    #[must_use]
    pub const fn new(id: StoneId) -> Self {
        Self {
            id,
            owner: Mutex::new(None),
            gazes: AtomicU64::new(0),
        }
    }

    /// Creates `count` free stones with ids `0..count`.
    #[must_use]
    pub fn forge(count: usize) -> Vec<Arc<Self>> {
        (0..count).map(|id| Arc::new(Self::new(StoneId(id)))).collect()
    }

    /// Stone identity.
    #[must_use]
    pub const fn id(&self) -> StoneId {
        self.id
    }

    /// Gazer currently bound to this stone.
    #[must_use]
    pub fn owner(&self) -> Option<GazerId> {
        *self.owner.lock()
    }

    pub(crate) fn set_owner(&self, owner: Option<GazerId>) {
        *self.owner.lock() = owner;
    }

    /// Times this stone has been gazed into since the last reset.
    #[must_use]
    pub fn gazes(&self) -> u64 {
        self.gazes.load(Ordering::Relaxed)
    }

    pub(crate) fn record_gaze(&self) -> u64 {
        self.gazes.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Clears owner and usage.
    pub(crate) fn reset(&self) {
        self.set_owner(None);
        self.gazes.store(0, Ordering::Relaxed);
    }
}
