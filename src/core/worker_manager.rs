//! Worker manager: runs one dedicated OS thread per gazer.
//!
//! Each gazer repeats `acquire → hold for a random duration → gaze → release`
//! for the configured number of iterations, always going through a
//! [`GazeMediator`] (the simulation controller in production). Threads report
//! how they ended over a crossbeam channel; a separate running counter guarded
//! by a condvar lets shutdown wait for termination without polling the threads.
//!
//! # Design Principles
//!
//! - **No shared mutation**: gazers never touch each other or the pool directly
//! - **Cancellation as a value**: a cancelled acquire ends the loop quietly
//! - **Panic-safe accounting**: the running counter is released by a drop guard

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Sender};
use parking_lot::{Condvar, Mutex, RwLock};
use rand::Rng;
use tracing::{debug, error, info, warn, Span};

use crate::core::{Gazer, GazerState, SimulationError, Stone};
use crate::util::serde::GazerId;

/// Calls a gazer makes while it runs. Implemented by the controller.
pub trait GazeMediator: Send + Sync {
    /// Blocks until a stone is bound to `gazer`.
    ///
    /// # Errors
    ///
    /// `SimulationError::Cancelled` during shutdown, or a fatal error.
    fn acquire_palantir(&self, gazer: &Gazer) -> Result<Arc<Stone>, SimulationError>;

    /// Uses the stone currently bound to `gazer`.
    ///
    /// # Errors
    ///
    /// A fatal error if `gazer` does not own `stone`.
    fn gaze(&self, gazer: &Gazer, stone: &Arc<Stone>) -> Result<(), SimulationError>;

    /// Unbinds and returns `stone`.
    ///
    /// # Errors
    ///
    /// A fatal error if the binding is inconsistent.
    fn release_palantir(&self, gazer: &Gazer, stone: &Arc<Stone>) -> Result<(), SimulationError>;

    /// Whether the gazer should stop before its next iteration.
    fn is_shutdown(&self) -> bool;
}

/// Produces and runs gazer threads on behalf of the controller.
pub trait WorkerManager: Send + Sync {
    /// Creates `gazer_count` gazers, or resets the existing ones if the count is unchanged.
    fn build(&self, gazer_count: usize);

    /// Every gazer in id order.
    fn gazers(&self) -> Vec<Arc<Gazer>>;

    /// Number of gazers built.
    fn gazer_count(&self) -> usize;

    /// Gazer threads that have not yet terminated.
    fn running_count(&self) -> usize;

    /// Checks that a run can begin.
    ///
    /// # Errors
    ///
    /// `SimulationError::Configuration` if there are no gazers, threads are still
    /// running, or a gazer is not idle.
    fn validate_start_state(&self) -> Result<(), SimulationError>;

    /// Runs every gazer to completion and blocks until all have terminated.
    ///
    /// # Errors
    ///
    /// `SimulationError::Configuration` if the start state is invalid.
    fn run(&self, mediator: Arc<dyn GazeMediator>) -> Result<RunSummary, SimulationError>;

    /// Fires every gazer's interrupt.
    fn interrupt_all(&self);

    /// Waits up to `timeout` for every gazer thread to terminate.
    fn await_termination(&self, timeout: Duration) -> bool;

    /// Returns every gazer to idle.
    fn reset(&self);
}

/// How a gazer thread ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GazerOutcome {
    /// All iterations done.
    Completed,
    /// Stopped by shutdown.
    Cancelled,
    /// Stopped by a fatal error.
    Failed,
}

/// Totals for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Iterations completed across all gazers.
    pub completed_iterations: u64,
    /// Gazers that finished every iteration.
    pub completed_gazers: usize,
    /// Gazers stopped by cancellation.
    pub cancelled_gazers: usize,
    /// Gazers stopped by a fatal error, a panic, or a failed spawn.
    pub failed_gazers: usize,
}

impl RunSummary {
    fn tally(&mut self, outcome: GazerOutcome) {
        match outcome {
            GazerOutcome::Completed => self.completed_gazers += 1,
            GazerOutcome::Cancelled => self.cancelled_gazers += 1,
            GazerOutcome::Failed => self.failed_gazers += 1,
        }
    }
}

/// Per-gazer loop settings.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Acquire/gaze/release cycles per gazer.
    pub iterations: u64,
    /// Shortest hold.
    pub min_gaze: Duration,
    /// Longest hold.
    pub max_gaze: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            iterations: 100,
            min_gaze: Duration::ZERO,
            max_gaze: Duration::from_millis(2),
        }
    }
}

impl WorkerSettings {
    fn hold_duration(&self, rng: &mut impl Rng) -> Duration {
        if self.max_gaze <= self.min_gaze {
            return self.min_gaze;
        }
        let min = u64::try_from(self.min_gaze.as_micros()).unwrap_or(u64::MAX);
        let max = u64::try_from(self.max_gaze.as_micros()).unwrap_or(u64::MAX);
        Duration::from_micros(rng.random_range(min..=max))
    }
}

struct GazerReport {
    gazer: GazerId,
    iterations: u64,
    outcome: GazerOutcome,
}

/// Running-thread counter with a condvar signalled as threads exit.
#[derive(Debug, Default)]
struct Termination {
    running: Mutex<usize>,
    condvar: Condvar,
}

impl Termination {
    fn arm(&self, count: usize) {
        *self.running.lock() = count;
    }

    fn finish_one(&self) {
        let mut running = self.running.lock();
        *running = running.saturating_sub(1);
        if *running == 0 {
            self.condvar.notify_all();
        }
    }

    fn count(&self) -> usize {
        *self.running.lock()
    }

    fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut running = self.running.lock();
        while *running > 0 {
            if self.condvar.wait_until(&mut running, deadline).timed_out() {
                return *running == 0;
            }
        }
        true
    }
}

/// Decrements the running counter when the gazer thread exits, even on panic.
struct RunningGuard(Arc<Termination>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.finish_one();
    }
}

/// Worker manager with one dedicated OS thread per gazer.
pub struct ThreadWorkerManager {
    settings: WorkerSettings,
    gazers: RwLock<Vec<Arc<Gazer>>>,
    termination: Arc<Termination>,
}

impl ThreadWorkerManager {
    /// Creates a manager with no gazers. Call `build` before running.
    #[must_use]
    pub fn new(settings: WorkerSettings) -> Self {
        Self {
            settings,
            gazers: RwLock::new(Vec::new()),
            termination: Arc::new(Termination::default()),
        }
    }

    /// Loop settings.
    #[must_use]
    pub const fn settings(&self) -> &WorkerSettings {
        &self.settings
    }
}

impl WorkerManager for ThreadWorkerManager {
    fn build(&self, gazer_count: usize) {
        let mut gazers = self.gazers.write();
        if gazers.len() == gazer_count {
            for gazer in gazers.iter() {
                gazer.reset();
            }
            debug!(gazer_count, "gazers reset in place");
            return;
        }
        *gazers = (0..gazer_count)
            .map(|id| Arc::new(Gazer::new(GazerId(id))))
            .collect();
        debug!(gazer_count, "gazers created");
    }

    fn gazers(&self) -> Vec<Arc<Gazer>> {
        self.gazers.read().clone()
    }

    fn gazer_count(&self) -> usize {
        self.gazers.read().len()
    }

    fn running_count(&self) -> usize {
        self.termination.count()
    }

    fn validate_start_state(&self) -> Result<(), SimulationError> {
        let gazers = self.gazers.read();
        if gazers.is_empty() {
            return Err(SimulationError::Configuration("no gazers built".into()));
        }
        let running = self.running_count();
        if running > 0 {
            return Err(SimulationError::Configuration(format!(
                "{running} gazer threads still running"
            )));
        }
        if let Some(gazer) = gazers
            .iter()
            .find(|g| g.state() != GazerState::Idle || g.held().is_some())
        {
            return Err(SimulationError::Configuration(format!(
                "{} is {:?}; reset before starting",
                gazer.id(),
                gazer.state()
            )));
        }
        Ok(())
    }

    fn run(&self, mediator: Arc<dyn GazeMediator>) -> Result<RunSummary, SimulationError> {
        self.validate_start_state()?;
        let gazers = self.gazers();
        let total = gazers.len();
        let (report_tx, report_rx) = unbounded::<GazerReport>();
        let mut summary = RunSummary::default();
        let mut spawn_failures = 0;

        self.termination.arm(total);
        let mut handles = Vec::with_capacity(total);
        for gazer in gazers {
            let id = gazer.id();
            match spawn_gazer(
                gazer,
                Arc::clone(&mediator),
                self.settings.clone(),
                report_tx.clone(),
                Arc::clone(&self.termination),
            ) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    error!(gazer_id = %id, error = %e, "failed to spawn gazer thread");
                    self.termination.finish_one();
                    spawn_failures += 1;
                }
            }
        }
        drop(report_tx);
        info!(threads = handles.len(), "gazer threads started");

        // Ends once every thread has dropped its sender, panicked ones included.
        let mut reported = 0;
        for report in &report_rx {
            debug!(
                gazer_id = %report.gazer,
                iterations = report.iterations,
                outcome = ?report.outcome,
                "gazer finished"
            );
            summary.completed_iterations += report.iterations;
            summary.tally(report.outcome);
            reported += 1;
        }

        for handle in handles {
            if handle.join().is_err() {
                warn!("gazer thread panicked");
            }
        }
        // Threads that never reported either failed to spawn or panicked.
        summary.failed_gazers += total.saturating_sub(reported);
        if spawn_failures > 0 {
            warn!(spawn_failures, "some gazers never started");
        }

        info!(
            completed = summary.completed_gazers,
            cancelled = summary.cancelled_gazers,
            failed = summary.failed_gazers,
            iterations = summary.completed_iterations,
            "gazer threads joined"
        );
        Ok(summary)
    }

    fn interrupt_all(&self) {
        for gazer in self.gazers.read().iter() {
            gazer.interrupt().interrupt();
        }
    }

    fn await_termination(&self, timeout: Duration) -> bool {
        self.termination.wait(timeout)
    }

    fn reset(&self) {
        for gazer in self.gazers.read().iter() {
            gazer.reset();
        }
    }
}

/// Spawn a gazer thread.
fn spawn_gazer(
    gazer: Arc<Gazer>,
    mediator: Arc<dyn GazeMediator>,
    settings: WorkerSettings,
    report_tx: Sender<GazerReport>,
    termination: Arc<Termination>,
) -> std::io::Result<JoinHandle<()>> {
    let span = Span::current();
    thread::Builder::new()
        .name(format!("gazer-{}", gazer.id().0))
        .spawn(move || {
            let _running = RunningGuard(termination);
            let _entered = span.enter();
            debug!(gazer_id = %gazer.id(), "gazer thread started");

            let outcome = gaze_loop(&gazer, mediator.as_ref(), &settings);
            let _ = report_tx.send(GazerReport {
                gazer: gazer.id(),
                iterations: gazer.iterations(),
                outcome,
            });

            debug!(gazer_id = %gazer.id(), "gazer thread exiting");
        })
}

fn gaze_loop(gazer: &Gazer, mediator: &dyn GazeMediator, settings: &WorkerSettings) -> GazerOutcome {
    let mut rng = rand::rng();
    for _ in 0..settings.iterations {
        if mediator.is_shutdown() {
            return GazerOutcome::Cancelled;
        }
        let stone = match mediator.acquire_palantir(gazer) {
            Ok(stone) => stone,
            Err(e) => return stopped_by(gazer, &e),
        };

        let hold = settings.hold_duration(&mut rng);
        if !hold.is_zero() {
            thread::sleep(hold);
        }

        // Release even when the gaze failed so the stone is not stranded.
        let gazed = mediator.gaze(gazer, &stone);
        if let Err(e) = mediator.release_palantir(gazer, &stone) {
            return stopped_by(gazer, &e);
        }
        if let Err(e) = gazed {
            return stopped_by(gazer, &e);
        }
        gazer.record_iteration();
    }
    GazerOutcome::Completed
}

fn stopped_by(gazer: &Gazer, err: &SimulationError) -> GazerOutcome {
    if err.is_cancellation() {
        debug!(gazer_id = %gazer.id(), "gazer cancelled");
        GazerOutcome::Cancelled
    } else {
        gazer.set_state(GazerState::Error);
        warn!(gazer_id = %gazer.id(), error = %err, "gazer stopped by fatal error");
        GazerOutcome::Failed
    }
}
