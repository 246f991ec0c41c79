//! Gazers: worker identities competing for stones.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::sync::Interrupt;
use crate::util::serde::{GazerId, StoneId};

/// Gazer lifecycle as seen by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GazerState {
    /// Not holding and not waiting.
    #[default]
    Idle,
    /// Blocked on the pool.
    Waiting,
    /// Holding a stone.
    Busy,
    /// Terminated by a fatal error.
    Error,
}

#[derive(Debug, Default)]
struct GazerSlot {
    state: GazerState,
    held: Option<StoneId>,
}

/// A worker identity plus the interrupt that can cancel its blocking calls.
#[derive(Debug)]
pub struct Gazer {
    id: GazerId,
    slot: Mutex<GazerSlot>,
    interrupt: Interrupt,
    iterations: AtomicU64,
}

impl Gazer {
    /// Creates an idle gazer holding nothing.
    #[must_use]
    pub fn new(id: GazerId) -> Self {
        Self {
            id,
            slot: Mutex::new(GazerSlot::default()),
            interrupt: Interrupt::new(),
            iterations: AtomicU64::new(0),
        }
    }

    /// Gazer identity.
    #[must_use]
    pub const fn id(&self) -> GazerId {
        self.id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> GazerState {
        self.slot.lock().state
    }

    /// Stone currently bound to this gazer.
    #[must_use]
    pub fn held(&self) -> Option<StoneId> {
        self.slot.lock().held
    }

    /// Interrupt handle for this gazer's blocking calls.
    #[must_use]
    pub const fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Completed acquire/gaze/release cycles since the last reset.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    pub(crate) fn set_state(&self, state: GazerState) {
        self.slot.lock().state = state;
    }

    /// Binds or unbinds a stone together with the matching state change.
    pub(crate) fn set_held(&self, held: Option<StoneId>, state: GazerState) {
        let mut slot = self.slot.lock();
        slot.held = held;
        slot.state = state;
    }

    pub(crate) fn record_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns to idle with nothing held, no pending interrupt and no iterations.
    pub(crate) fn reset(&self) {
        self.set_held(None, GazerState::Idle);
        self.interrupt.clear();
        self.iterations.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_gazer_is_idle() {
        let gazer = Gazer::new(GazerId(7));
        assert_eq!(gazer.id(), GazerId(7));
        assert_eq!(gazer.state(), GazerState::Idle);
        assert_eq!(gazer.held(), None);
        assert_eq!(gazer.iterations(), 0);
    }

    #[test]
    fn test_reset_restores_idle() {
        let gazer = Gazer::new(GazerId(0));
        gazer.set_held(Some(StoneId(2)), GazerState::Busy);
        gazer.record_iteration();
        gazer.interrupt().interrupt();

        gazer.reset();
        assert_eq!(gazer.state(), GazerState::Idle);
        assert_eq!(gazer.held(), None);
        assert_eq!(gazer.iterations(), 0);
        assert!(!gazer.interrupt().is_interrupted());
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_string(&GazerState::Waiting).unwrap();
        assert_eq!(json, "\"waiting\"");
    }
}
