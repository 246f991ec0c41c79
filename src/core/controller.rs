//! Simulation controller: the mediator every gazer goes through.
//!
//! The controller owns one [`StonePool`] and one [`WorkerManager`]. Gazers never
//! touch the pool directly; they call [`SimulationController::acquire_palantir`]
//! and [`SimulationController::release_palantir`], which bind and unbind stones
//! under a single lock and keep an independent gazing counter that is checked
//! against the pool capacity on every call.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --start--> Running --all iterations done--> Completed
//!                 Running --stop/shutdown--> Cancelling --> Cancelled
//!                 Running --invariant violation--> Error
//! Completed | Cancelled | Error --reset--> Idle
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use palantir_pool::core::{LockedPool, SimulationController, ThreadWorkerManager, WorkerSettings};
//! use palantir_pool::sync::FairSemaphore;
//!
//! let pool = Arc::new(LockedPool::new(Arc::new(FairSemaphore::new(0))));
//! let workers = Arc::new(ThreadWorkerManager::new(WorkerSettings::default()));
//! let controller = Arc::new(SimulationController::new(pool, workers));
//!
//! controller.build_model(5, 5)?;
//! let state = controller.start()?;
//! println!("run ended in {state:?}");
//! controller.reset()?;
//! # Ok::<(), palantir_pool::core::SimulationError>(())
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::core::audit::{build_audit_event, AuditAction, AuditSink};
use crate::core::snapshot::{GazerView, RunReport, SimulationSnapshot, StoneView};
use crate::core::worker_manager::{GazeMediator, WorkerManager};
use crate::core::{Gazer, GazerState, PoolError, SimulationError, Stone, StonePool};
use crate::util::serde::{GazerId, StoneId};

/// Default interval between termination re-checks during shutdown.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Aggregate lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationState {
    /// Built and ready to start.
    #[default]
    Idle,
    /// Gazer threads are running.
    Running,
    /// Shutdown requested; waiting for gazers to terminate.
    Cancelling,
    /// Stopped by shutdown.
    Cancelled,
    /// Every gazer finished its iterations.
    Completed,
    /// A fatal error stopped the run.
    Error,
}

/// Clears a flag when dropped.
struct FlagGuard<'a>(&'a AtomicBool);

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Mediator and orchestrator for one pool and one set of gazers.
pub struct SimulationController {
    pool: Arc<dyn StonePool>,
    workers: Arc<dyn WorkerManager>,
    state: Mutex<SimulationState>,
    /// Signalled when `running` drops back to false.
    state_changed: Condvar,
    /// Serializes build/start/shutdown/reset transitions.
    lifecycle: Mutex<()>,
    /// Held while a stone/gazer binding and the gazing counter change together.
    binding: Mutex<()>,
    running: AtomicBool,
    /// Set by `shutdown` and by the fatal-error path; cleared by `reset`.
    shutdown: AtomicBool,
    /// A caller is blocked in `shutdown` waiting for gazers to exit.
    draining: AtomicBool,
    resetting: AtomicBool,
    gazing: AtomicUsize,
    capacity: AtomicUsize,
    sequence: AtomicU64,
    last_error: Mutex<Option<String>>,
    last_report: Mutex<Option<RunReport>>,
    audit: Option<Mutex<Box<dyn AuditSink>>>,
    poll_interval: Duration,
}

impl fmt::Debug for SimulationController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationController")
            .field("state", &self.state())
            .field("strategy", &self.pool.strategy())
            .field("capacity", &self.capacity())
            .field("gazing", &self.gazing_count())
            .field("running", &self.is_running())
            .field("shutdown", &self.is_shutdown())
            .finish_non_exhaustive()
    }
}

impl SimulationController {
    /// Creates an idle controller over an injected pool and worker manager.
    #[must_use]
    pub fn new(pool: Arc<dyn StonePool>, workers: Arc<dyn WorkerManager>) -> Self {
        let capacity = pool.capacity();
        Self {
            pool,
            workers,
            state: Mutex::new(SimulationState::Idle),
            state_changed: Condvar::new(),
            lifecycle: Mutex::new(()),
            binding: Mutex::new(()),
            running: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            draining: AtomicBool::new(false),
            resetting: AtomicBool::new(false),
            gazing: AtomicUsize::new(0),
            capacity: AtomicUsize::new(capacity),
            sequence: AtomicU64::new(0),
            last_error: Mutex::new(None),
            last_report: Mutex::new(None),
            audit: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = Some(Mutex::new(audit));
        self
    }

    /// Interval between termination re-checks while shutting down.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Creates `stone_count` stones and `gazer_count` gazers.
    ///
    /// Existing stones and gazers are reset in place when the counts are unchanged.
    ///
    /// # Errors
    ///
    /// `SimulationError::Configuration` unless the controller is idle and both
    /// counts are positive.
    pub fn build_model(&self, stone_count: usize, gazer_count: usize) -> Result<(), SimulationError> {
        let _lifecycle = self.lifecycle.lock();
        let state = self.state();
        if self.running.load(Ordering::Acquire) || state != SimulationState::Idle {
            return Err(SimulationError::Configuration(format!(
                "build_model requires an idle simulation, state is {state:?}"
            )));
        }
        if stone_count == 0 || gazer_count == 0 {
            return Err(SimulationError::Configuration(format!(
                "need at least one stone and one gazer, got {stone_count} and {gazer_count}"
            )));
        }

        let _binding = self.binding.lock();
        if self.pool.capacity() == stone_count {
            self.pool.reset();
        } else {
            self.pool.build_model(Stone::forge(stone_count))?;
        }
        self.workers.build(gazer_count);
        self.capacity.store(stone_count, Ordering::Release);
        self.gazing.store(0, Ordering::Release);
        info!(stone_count, gazer_count, strategy = ?self.pool.strategy(), "model built");
        Ok(())
    }

    /// Runs the simulation on the calling thread until it completes, is
    /// cancelled, or fails.
    ///
    /// Returns the state the run ended in. A start while running, while a
    /// shutdown is in progress, or from a non-idle state is ignored with a
    /// warning and returns the current state.
    ///
    /// # Errors
    ///
    /// `SimulationError::Configuration` if the model was never built or the
    /// worker manager rejects the start state.
    pub fn start(self: &Arc<Self>) -> Result<SimulationState, SimulationError> {
        {
            let _lifecycle = self.lifecycle.lock();
            let state = self.state();
            if self.running.load(Ordering::Acquire) {
                warn!("start ignored: simulation already running");
                return Ok(state);
            }
            if self.shutdown.load(Ordering::Acquire) {
                warn!("start ignored: shutdown in progress");
                return Ok(state);
            }
            if state != SimulationState::Idle {
                warn!(?state, "start ignored: reset required");
                return Ok(state);
            }
            if self.capacity() == 0 {
                return Err(SimulationError::Configuration(
                    "build_model must be called before start".into(),
                ));
            }
            self.workers.validate_start_state()?;
            self.running.store(true, Ordering::Release);
            self.set_state(SimulationState::Running);
        }

        let run_id = Uuid::new_v4();
        let span = info_span!("simulation_run", %run_id);
        let _entered = span.enter();
        info!(
            capacity = self.capacity(),
            gazers = self.workers.gazer_count(),
            "simulation started"
        );

        let mediator: Arc<dyn GazeMediator> = Arc::clone(self) as Arc<dyn GazeMediator>;
        let summary = match self.workers.run(mediator) {
            Ok(summary) => summary,
            Err(e) => {
                let mut state = self.state.lock();
                *state = SimulationState::Idle;
                self.running.store(false, Ordering::Release);
                self.state_changed.notify_all();
                return Err(e);
            }
        };

        if self.state() != SimulationState::Error {
            self.verify_quiescent();
        }

        let final_state = {
            let _lifecycle = self.lifecycle.lock();
            let mut state = self.state.lock();
            *state = match *state {
                SimulationState::Running => SimulationState::Completed,
                SimulationState::Cancelling => SimulationState::Cancelled,
                other => other,
            };
            self.running.store(false, Ordering::Release);
            self.state_changed.notify_all();
            *state
        };

        let report = RunReport {
            run_id,
            state: final_state,
            completed_iterations: summary.completed_iterations,
            cancelled_gazers: summary.cancelled_gazers,
            failed_gazers: summary.failed_gazers,
            error: self.last_error(),
        };
        info!(
            state = ?final_state,
            iterations = report.completed_iterations,
            cancelled = report.cancelled_gazers,
            failed = report.failed_gazers,
            "simulation finished"
        );
        *self.last_report.lock() = Some(report);
        Ok(final_state)
    }

    /// Cancels a running simulation and waits for it to wind down.
    ///
    /// # Errors
    ///
    /// Never fails today; kept fallible to match `shutdown`.
    pub fn stop(&self) -> Result<(), SimulationError> {
        if !self.running.load(Ordering::Acquire) {
            warn!("stop ignored: simulation not running");
            return Ok(());
        }
        self.shutdown()
    }

    /// Interrupts every gazer, shuts the pool down and blocks until every
    /// gazer thread has terminated.
    ///
    /// A call made while another caller is already blocked here returns
    /// immediately with a warning. A shutdown already requested by a fatal
    /// error is still waited out.
    ///
    /// # Errors
    ///
    /// Never fails today; the signature leaves room for a bounded variant.
    pub fn shutdown(&self) -> Result<(), SimulationError> {
        if self.draining.swap(true, Ordering::AcqRel) {
            warn!("shutdown already in progress");
            return Ok(());
        }
        let _draining = FlagGuard(&self.draining);

        if self.shutdown.swap(true, Ordering::AcqRel) {
            debug!("shutdown already requested, waiting for gazers");
        } else {
            let _lifecycle = self.lifecycle.lock();
            let mut state = self.state.lock();
            if *state == SimulationState::Running {
                *state = SimulationState::Cancelling;
            }
            info!("shutdown requested");
        }

        let started = Instant::now();
        self.signal_shutdown();

        loop {
            let terminated = self.workers.await_termination(self.poll_interval);
            if terminated && !self.running.load(Ordering::Acquire) {
                break;
            }
            if terminated {
                // Threads are gone; start() is still finishing its bookkeeping.
                let mut state = self.state.lock();
                if self.running.load(Ordering::Acquire) {
                    let _ = self.state_changed.wait_for(&mut state, self.poll_interval);
                }
            } else {
                debug!(
                    running = self.workers.running_count(),
                    "gazers still running, interrupting again"
                );
                self.workers.interrupt_all();
            }
        }

        {
            let mut state = self.state.lock();
            if *state == SimulationState::Cancelling {
                *state = SimulationState::Cancelled;
            }
        }
        info!(
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "shutdown complete"
        );
        Ok(())
    }

    /// Returns a terminal simulation to the post-`build_model` state.
    ///
    /// A reset already in progress makes this call a warning no-op.
    ///
    /// # Errors
    ///
    /// `SimulationError::Configuration` while the simulation is running.
    pub fn reset(&self) -> Result<(), SimulationError> {
        if self.resetting.swap(true, Ordering::AcqRel) {
            warn!("reset already in progress");
            return Ok(());
        }
        let _resetting = FlagGuard(&self.resetting);
        let _lifecycle = self.lifecycle.lock();
        if self.running.load(Ordering::Acquire) {
            return Err(SimulationError::Configuration(
                "cannot reset a running simulation; stop it first".into(),
            ));
        }

        {
            let _binding = self.binding.lock();
            self.pool.reset();
            self.workers.reset();
            self.gazing.store(0, Ordering::Release);
        }
        self.shutdown.store(false, Ordering::Release);
        *self.last_error.lock() = None;
        self.set_state(SimulationState::Idle);
        info!("simulation reset");
        Ok(())
    }

    /// Binds a stone to `gazer`, blocking until one is available.
    ///
    /// # Errors
    ///
    /// - `SimulationError::Cancelled` during shutdown or when interrupted
    /// - a fatal error if the binding or counter invariants break
    pub fn acquire_palantir(&self, gazer: &Gazer) -> Result<Arc<Stone>, SimulationError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(SimulationError::Cancelled);
        }
        gazer.set_state(GazerState::Waiting);
        let stone = match self.pool.acquire(gazer.id(), gazer.interrupt()) {
            Ok(stone) => stone,
            Err(PoolError::Cancelled) => {
                gazer.set_state(GazerState::Idle);
                debug!(gazer_id = %gazer.id(), "acquire cancelled");
                return Err(SimulationError::Cancelled);
            }
            Err(e) => return Err(self.fail(e.into())),
        };

        let violation = {
            let _binding = self.binding.lock();
            if let Some(held) = gazer.held() {
                Some(format!(
                    "{} already holds {held} while acquiring {}",
                    gazer.id(),
                    stone.id()
                ))
            } else if let Some(owner) = stone.owner() {
                Some(format!(
                    "{} handed to {} while owned by {owner}",
                    stone.id(),
                    gazer.id()
                ))
            } else {
                stone.set_owner(Some(gazer.id()));
                gazer.set_held(Some(stone.id()), GazerState::Busy);
                let gazing = self.gazing.fetch_add(1, Ordering::AcqRel) + 1;
                let capacity = self.capacity();
                self.record(Some(gazer.id()), Some(stone.id()), AuditAction::Acquire, None);
                (gazing > capacity)
                    .then(|| format!("{gazing} stones in use exceeds capacity {capacity}"))
            }
        };
        if let Some(message) = violation {
            return Err(self.error(message));
        }

        debug!(gazer_id = %gazer.id(), stone_id = %stone.id(), "palantir acquired");
        Ok(stone)
    }

    /// Gazes into a stone the gazer owns.
    ///
    /// # Errors
    ///
    /// A fatal error if `gazer` does not own `stone`.
    pub fn gaze(&self, gazer: &Gazer, stone: &Arc<Stone>) -> Result<(), SimulationError> {
        let owner = stone.owner();
        if owner != Some(gazer.id()) {
            return Err(self.error(format!(
                "{} gazed into {} owned by {owner:?}",
                gazer.id(),
                stone.id()
            )));
        }
        stone.record_gaze();
        Ok(())
    }

    /// Unbinds `stone` from `gazer`, then returns it to the pool.
    ///
    /// # Errors
    ///
    /// A fatal error if the binding is inconsistent, the counter underflows, or
    /// the pool rejects the release.
    pub fn release_palantir(&self, gazer: &Gazer, stone: &Arc<Stone>) -> Result<(), SimulationError> {
        let violation = {
            let _binding = self.binding.lock();
            let owner = stone.owner();
            let held = gazer.held();
            if owner != Some(gazer.id()) || held != Some(stone.id()) {
                Some(SimulationError::InvariantViolation(format!(
                    "{} released {} but owner is {owner:?} and gazer holds {held:?}",
                    gazer.id(),
                    stone.id()
                )))
            } else {
                gazer.set_held(None, GazerState::Idle);
                stone.set_owner(None);
                self.record(Some(gazer.id()), Some(stone.id()), AuditAction::Release, None);
                self.gazing
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                    .err()
                    .map(|_| {
                        SimulationError::PermitAccounting(format!(
                            "{} released {} with the gazing counter at zero",
                            gazer.id(),
                            stone.id()
                        ))
                    })
            }
        };
        if let Some(err) = violation {
            return Err(self.fail(err));
        }

        self.pool
            .release(gazer.id(), Some(stone))
            .map_err(|e| self.fail(e.into()))?;
        debug!(gazer_id = %gazer.id(), stone_id = %stone.id(), "palantir released");
        Ok(())
    }

    /// Funnels a fatal invariant violation: records it, moves to `Error`,
    /// starts shutting down, and returns the error for the caller to raise.
    pub fn error(&self, message: impl Into<String>) -> SimulationError {
        self.fail(SimulationError::InvariantViolation(message.into()))
    }

    fn fail(&self, err: SimulationError) -> SimulationError {
        if err.is_cancellation() {
            return err;
        }
        error!(error = %err, "fatal simulation error");
        {
            let mut last = self.last_error.lock();
            if last.is_none() {
                *last = Some(err.to_string());
            }
        }
        self.set_state(SimulationState::Error);
        self.record(None, None, AuditAction::Violation, Some(err.to_string()));
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            self.signal_shutdown();
        }
        err
    }

    /// Non-blocking half of shutdown.
    fn signal_shutdown(&self) {
        self.workers.interrupt_all();
        self.pool.shutdown();
    }

    /// After every gazer has exited, nothing may be held and every permit must be back.
    fn verify_quiescent(&self) {
        let gazing = self.gazing.load(Ordering::Acquire);
        let held = self.pool.held_count();
        let permits = self.pool.available_permits();
        let capacity = self.capacity();
        if gazing != 0 || held != 0 || permits != capacity {
            self.fail(SimulationError::PermitAccounting(format!(
                "after run: gazing={gazing} held={held} permits={permits} capacity={capacity}"
            )));
        }
    }

    fn record(
        &self,
        gazer: Option<GazerId>,
        stone: Option<StoneId>,
        action: AuditAction,
        detail: Option<String>,
    ) {
        if let Some(audit) = &self.audit {
            let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
            audit
                .lock()
                .record(build_audit_event(sequence, gazer, stone, action, detail));
        }
    }

    fn set_state(&self, next: SimulationState) {
        let mut state = self.state.lock();
        if *state != next {
            debug!(from = ?*state, to = ?next, "state transition");
            *state = next;
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SimulationState {
        *self.state.lock()
    }

    /// Whether a run is in progress.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Whether a shutdown has been requested since the last reset.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Free permits on the pool's semaphore.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.pool.available_permits()
    }

    /// Stones currently bound to gazers.
    #[must_use]
    pub fn gazing_count(&self) -> usize {
        self.gazing.load(Ordering::Acquire)
    }

    /// Pool size.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Acquire)
    }

    /// First fatal error since the last reset.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Report of the most recent run.
    #[must_use]
    pub fn last_report(&self) -> Option<RunReport> {
        self.last_report.lock().clone()
    }

    /// The managed pool.
    #[must_use]
    pub const fn pool(&self) -> &Arc<dyn StonePool> {
        &self.pool
    }

    /// The managed worker manager.
    #[must_use]
    pub const fn workers(&self) -> &Arc<dyn WorkerManager> {
        &self.workers
    }

    /// Consistent view of bindings and the gazing counter.
    #[must_use]
    pub fn snapshot(&self) -> SimulationSnapshot {
        let _binding = self.binding.lock();
        SimulationSnapshot {
            state: self.state(),
            strategy: self.pool.strategy(),
            capacity: self.capacity(),
            gazing: self.gazing.load(Ordering::Acquire),
            available_permits: self.pool.available_permits(),
            queued: self.pool.queue_length(),
            stones: self
                .pool
                .stones()
                .iter()
                .map(|stone| StoneView {
                    id: stone.id(),
                    owner: stone.owner(),
                    gazes: stone.gazes(),
                })
                .collect(),
            gazers: self
                .workers
                .gazers()
                .iter()
                .map(|gazer| GazerView {
                    id: gazer.id(),
                    state: gazer.state(),
                    held: gazer.held(),
                    iterations: gazer.iterations(),
                })
                .collect(),
        }
    }
}

impl GazeMediator for SimulationController {
    fn acquire_palantir(&self, gazer: &Gazer) -> Result<Arc<Stone>, SimulationError> {
        Self::acquire_palantir(self, gazer)
    }

    fn gaze(&self, gazer: &Gazer, stone: &Arc<Stone>) -> Result<(), SimulationError> {
        Self::gaze(self, gazer, stone)
    }

    fn release_palantir(&self, gazer: &Gazer, stone: &Arc<Stone>) -> Result<(), SimulationError> {
        Self::release_palantir(self, gazer, stone)
    }

    fn is_shutdown(&self) -> bool {
        Self::is_shutdown(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InMemoryAuditSink, LockedPool, ThreadWorkerManager, WorkerSettings};
    use crate::sync::FairSemaphore;

    fn controller(stones: usize, gazers: usize, iterations: u64) -> Arc<SimulationController> {
        let pool = Arc::new(LockedPool::new(Arc::new(FairSemaphore::new(0))));
        let workers = Arc::new(ThreadWorkerManager::new(WorkerSettings {
            iterations,
            min_gaze: Duration::ZERO,
            max_gaze: Duration::from_micros(100),
        }));
        let controller = Arc::new(
            SimulationController::new(pool, workers).with_poll_interval(Duration::from_millis(5)),
        );
        controller.build_model(stones, gazers).unwrap();
        controller
    }

    #[test]
    fn test_acquire_and_release_keep_counter_in_step() {
        let controller = controller(2, 2, 1);
        let gazers = controller.workers().gazers();

        let stone = controller.acquire_palantir(&gazers[0]).unwrap();
        assert_eq!(controller.gazing_count(), 1);
        assert_eq!(stone.owner(), Some(gazers[0].id()));
        assert_eq!(gazers[0].held(), Some(stone.id()));
        assert_eq!(gazers[0].state(), GazerState::Busy);

        controller.gaze(&gazers[0], &stone).unwrap();
        assert_eq!(stone.gazes(), 1);

        controller.release_palantir(&gazers[0], &stone).unwrap();
        assert_eq!(controller.gazing_count(), 0);
        assert_eq!(stone.owner(), None);
        assert_eq!(gazers[0].state(), GazerState::Idle);
        assert_eq!(controller.available_permits(), 2);
    }

    #[test]
    fn test_second_acquire_by_same_gazer_is_fatal() {
        let controller = controller(2, 1, 1);
        let gazers = controller.workers().gazers();
        let gazer = &gazers[0];

        controller.acquire_palantir(gazer).unwrap();
        let err = controller.acquire_palantir(gazer).unwrap_err();
        assert!(matches!(err, SimulationError::InvariantViolation(_)));
        assert_eq!(controller.state(), SimulationState::Error);
        assert!(controller.is_shutdown());
        assert!(controller.last_error().is_some());
    }

    #[test]
    fn test_release_by_non_owner_is_fatal() {
        let controller = controller(2, 2, 1);
        let gazers = controller.workers().gazers();

        let stone = controller.acquire_palantir(&gazers[0]).unwrap();
        let err = controller.release_palantir(&gazers[1], &stone).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(controller.state(), SimulationState::Error);
        // The binding was left untouched.
        assert_eq!(stone.owner(), Some(gazers[0].id()));
    }

    #[test]
    fn test_gaze_without_ownership_is_fatal() {
        let controller = controller(1, 2, 1);
        let gazers = controller.workers().gazers();

        let stone = controller.acquire_palantir(&gazers[0]).unwrap();
        assert!(controller.gaze(&gazers[1], &stone).unwrap_err().is_fatal());
    }

    #[test]
    fn test_acquire_after_shutdown_is_cancelled() {
        let controller = controller(1, 1, 1);
        controller.shutdown().unwrap();
        let gazers = controller.workers().gazers();
        let gazer = &gazers[0];
        assert_eq!(
            controller.acquire_palantir(gazer).unwrap_err(),
            SimulationError::Cancelled
        );
        assert_eq!(controller.state(), SimulationState::Idle);
    }

    #[test]
    fn test_run_completes_and_reset_returns_to_idle() {
        let controller = controller(3, 6, 40);
        assert_eq!(controller.start().unwrap(), SimulationState::Completed);
        assert_eq!(controller.available_permits(), 3);
        assert_eq!(controller.gazing_count(), 0);

        let report = controller.last_report().unwrap();
        assert_eq!(report.completed_iterations, 240);
        assert_eq!(report.error, None);

        // Needs a reset before another run.
        assert_eq!(controller.start().unwrap(), SimulationState::Completed);
        controller.reset().unwrap();
        assert_eq!(controller.state(), SimulationState::Idle);
        assert_eq!(controller.start().unwrap(), SimulationState::Completed);
    }

    #[test]
    fn test_build_model_only_from_idle() {
        let controller = controller(2, 2, 1);
        controller.start().unwrap();
        assert!(matches!(
            controller.build_model(3, 3),
            Err(SimulationError::Configuration(_))
        ));
        controller.reset().unwrap();
        controller.build_model(3, 4).unwrap();
        assert_eq!(controller.capacity(), 3);
        assert_eq!(controller.workers().gazer_count(), 4);
        assert_eq!(controller.available_permits(), 3);
    }

    #[test]
    fn test_build_model_rejects_zero_counts() {
        let controller = controller(1, 1, 1);
        assert!(controller.build_model(0, 1).is_err());
        assert!(controller.build_model(1, 0).is_err());
    }

    #[test]
    fn test_stop_when_idle_is_ignored() {
        let controller = controller(1, 1, 1);
        controller.stop().unwrap();
        assert!(!controller.is_shutdown());
    }

    #[test]
    fn test_audit_records_bind_and_unbind() {
        let sink = Box::new(InMemoryAuditSink::new(16));
        let pool = Arc::new(LockedPool::with_capacity(1).unwrap());
        let workers = Arc::new(ThreadWorkerManager::new(WorkerSettings::default()));
        workers.build(1);
        let controller = SimulationController::new(pool, workers).with_audit(sink);
        let gazers = controller.workers().gazers();
        let gazer = &gazers[0];

        let stone = controller.acquire_palantir(gazer).unwrap();
        controller.release_palantir(gazer, &stone).unwrap();
        assert_eq!(controller.sequence.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_snapshot_counter_matches_bindings() {
        let controller = controller(3, 3, 1);
        let gazers = controller.workers().gazers();
        let _a = controller.acquire_palantir(&gazers[0]).unwrap();
        let _b = controller.acquire_palantir(&gazers[2]).unwrap();

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.gazing, 2);
        assert_eq!(snapshot.bound_stones(), 2);
        assert_eq!(snapshot.holding_gazers(), 2);
        assert_eq!(snapshot.available_permits, 1);
    }
}
