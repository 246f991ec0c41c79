//! Error types for the semaphore, the stone pool and the simulation controller.

use thiserror::Error;

use crate::util::serde::StoneId;

/// Errors produced by a permit semaphore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SemaphoreError {
    /// The caller's interrupt fired before or while it was waiting.
    #[error("interrupted while waiting for a permit")]
    Interrupted,
    /// The waiter was evicted from the queue by a reset.
    #[error("wait cancelled by semaphore reset")]
    Cancelled,
    /// A release would push the permit count past its maximum.
    #[error("permit overflow: release beyond {max} permits")]
    PermitOverflow {
        /// Maximum permits the semaphore was built with.
        max: usize,
    },
}

/// Errors produced by stone pool strategies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The pool is shut down or the caller was interrupted while blocked.
    #[error("acquire cancelled")]
    Cancelled,
    /// The model cannot be rebuilt while stones are held or waiters are queued.
    #[error("pool in use: {held} stones held, {queued} waiters queued")]
    InUse {
        /// Stones currently held.
        held: usize,
        /// Threads currently queued on the semaphore.
        queued: usize,
    },
    /// A pool needs at least one stone.
    #[error("pool must contain at least one stone")]
    Empty,
    /// The stone does not belong to this pool.
    #[error("unknown stone {0}")]
    UnknownStone(StoneId),
    /// Permits and availability flags disagree.
    #[error("permit accounting error: {0}")]
    PermitAccounting(String),
}

/// Errors surfaced by the simulation controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// Invalid configuration or a lifecycle call made in the wrong state.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Ownership or counter state contradicts itself.
    #[error("concurrency invariant violated: {0}")]
    InvariantViolation(String),
    /// The blocking call was interrupted; expected during shutdown.
    #[error("cancelled")]
    Cancelled,
    /// A permit leak or a double release was detected.
    #[error("permit accounting error: {0}")]
    PermitAccounting(String),
}

impl SimulationError {
    /// Returns true for errors that move the simulation into its error state.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvariantViolation(_) | Self::PermitAccounting(_)
        )
    }

    /// Returns true for the expected cancellation signal.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<SemaphoreError> for PoolError {
    fn from(err: SemaphoreError) -> Self {
        match err {
            SemaphoreError::Interrupted | SemaphoreError::Cancelled => Self::Cancelled,
            SemaphoreError::PermitOverflow { .. } => Self::PermitAccounting(err.to_string()),
        }
    }
}

impl From<PoolError> for SimulationError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Cancelled => Self::Cancelled,
            PoolError::InUse { .. } | PoolError::Empty => Self::Configuration(err.to_string()),
            PoolError::UnknownStone(_) => Self::InvariantViolation(err.to_string()),
            PoolError::PermitAccounting(msg) => Self::PermitAccounting(msg),
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
