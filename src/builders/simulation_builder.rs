//! Builders to wire a simulation controller from configuration.

use std::sync::Arc;

use anyhow::Context;

use crate::config::SimulationConfig;
use crate::core::{
    AppResult, ConcurrentPool, LockedPool, SimulationController, SimulationError, StonePool,
    ThreadWorkerManager,
};
use crate::sync::{FairSemaphore, PermitSemaphore};
use crate::util::serde::PoolStrategy;

/// Build an empty pool of the given strategy over `semaphore`.
#[must_use]
pub fn build_pool(
    strategy: PoolStrategy,
    semaphore: Arc<dyn PermitSemaphore>,
) -> Arc<dyn StonePool> {
    match strategy {
        PoolStrategy::Locked => Arc::new(LockedPool::new(semaphore)),
        PoolStrategy::Concurrent => Arc::new(ConcurrentPool::new(semaphore)),
    }
}

/// Build a controller from configuration and create its model.
///
/// # Errors
///
/// `SimulationError::Configuration` if the configuration does not validate.
pub fn build_simulation(
    cfg: &SimulationConfig,
) -> Result<Arc<SimulationController>, SimulationError> {
    cfg.validate()
        .map_err(|e| SimulationError::Configuration(format!("config invalid: {e}")))?;

    let semaphore: Arc<dyn PermitSemaphore> = Arc::new(FairSemaphore::new(0));
    let pool = build_pool(cfg.strategy, semaphore);
    let workers = Arc::new(ThreadWorkerManager::new(cfg.worker_settings()));
    let controller =
        SimulationController::new(pool, workers).with_poll_interval(cfg.shutdown_poll());
    controller.build_model(cfg.stone_count, cfg.gazer_count)?;
    Ok(Arc::new(controller))
}

/// Parse a JSON configuration and build a controller from it.
///
/// # Errors
///
/// Fails with context if the JSON does not parse or validate, or the model
/// cannot be built.
pub fn build_simulation_from_json(input: &str) -> AppResult<Arc<SimulationController>> {
    let cfg = SimulationConfig::from_json_str(input)
        .map_err(anyhow::Error::msg)
        .context("loading simulation config")?;
    build_simulation(&cfg).context("building simulation")
}
