//! Core simulation abstractions: stones, gazers, pools and the controller.

pub mod audit;
pub mod controller;
pub mod error;
pub mod gazer;
pub mod pool;
pub mod snapshot;
pub mod stone;
pub mod worker_manager;

pub use audit::{build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink};
pub use controller::{SimulationController, SimulationState};
pub use error::{AppResult, PoolError, SemaphoreError, SimulationError};
pub use gazer::{Gazer, GazerState};
pub use pool::{ConcurrentPool, LockedPool, StonePool};
pub use snapshot::{GazerView, RunReport, SimulationSnapshot, StoneView};
pub use stone::Stone;
pub use worker_manager::{
    GazeMediator, GazerOutcome, RunSummary, ThreadWorkerManager, WorkerManager, WorkerSettings,
};
