//! Serializable view of pool and controller state for presentation layers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{GazerState, SimulationState};
use crate::util::serde::{GazerId, PoolStrategy, StoneId};

/// One stone as seen in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoneView {
    /// Stone identity.
    pub id: StoneId,
    /// Bound gazer, if any.
    pub owner: Option<GazerId>,
    /// Times gazed into since the last reset.
    pub gazes: u64,
}

/// One gazer as seen in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazerView {
    /// Gazer identity.
    pub id: GazerId,
    /// Current state.
    pub state: GazerState,
    /// Bound stone, if any.
    pub held: Option<StoneId>,
    /// Completed iterations since the last reset.
    pub iterations: u64,
}

/// Consistent picture of the bindings and the gazing counter.
///
/// Taken under the controller's binding lock, so `gazing` always equals the
/// number of stones with an owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    /// Lifecycle state.
    pub state: SimulationState,
    /// Pool strategy in use.
    pub strategy: PoolStrategy,
    /// Pool size.
    pub capacity: usize,
    /// Gazing counter.
    pub gazing: usize,
    /// Free semaphore permits.
    pub available_permits: usize,
    /// Threads queued on the semaphore.
    pub queued: usize,
    /// Per-stone view in id order.
    pub stones: Vec<StoneView>,
    /// Per-gazer view in id order.
    pub gazers: Vec<GazerView>,
}

impl SimulationSnapshot {
    /// Stones that currently have an owner.
    #[must_use]
    pub fn bound_stones(&self) -> usize {
        self.stones.iter().filter(|s| s.owner.is_some()).count()
    }

    /// Gazers that currently hold a stone.
    #[must_use]
    pub fn holding_gazers(&self) -> usize {
        self.gazers.iter().filter(|g| g.held.is_some()).count()
    }
}

/// Outcome of one `start` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Identifier carried on the run's tracing span.
    pub run_id: Uuid,
    /// State the run ended in.
    pub state: SimulationState,
    /// Iterations completed across all gazers.
    pub completed_iterations: u64,
    /// Gazers that stopped because of cancellation.
    pub cancelled_gazers: usize,
    /// Gazers that stopped because of a fatal error.
    pub failed_gazers: usize,
    /// Fatal error message, if the run ended in error.
    pub error: Option<String>,
}
