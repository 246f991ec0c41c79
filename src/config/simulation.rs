//! Simulation configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::WorkerSettings;
use crate::util::serde::PoolStrategy;

/// Settings for one simulation: model size, gazer loop and pool strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Stones in the pool.
    pub stone_count: usize,
    /// Competing gazer threads.
    pub gazer_count: usize,
    /// Acquire/gaze/release cycles per gazer.
    pub iterations: u64,
    /// Shortest hold in milliseconds.
    pub min_gaze_ms: u64,
    /// Longest hold in milliseconds.
    pub max_gaze_ms: u64,
    /// Pool strategy.
    pub strategy: PoolStrategy,
    /// Interval between termination checks while shutting down, in milliseconds.
    pub shutdown_poll_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            stone_count: 5,
            gazer_count: 5,
            iterations: 100,
            min_gaze_ms: 0,
            max_gaze_ms: 2,
            strategy: PoolStrategy::Locked,
            shutdown_poll_ms: 50,
        }
    }
}

impl SimulationConfig {
    /// Set the number of stones.
    #[must_use]
    pub const fn with_stone_count(mut self, stone_count: usize) -> Self {
        self.stone_count = stone_count;
        self
    }

    /// Set the number of gazers.
    #[must_use]
    pub const fn with_gazer_count(mut self, gazer_count: usize) -> Self {
        self.gazer_count = gazer_count;
        self
    }

    /// Set iterations per gazer.
    #[must_use]
    pub const fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the hold range in milliseconds.
    #[must_use]
    pub const fn with_gaze_ms(mut self, min_gaze_ms: u64, max_gaze_ms: u64) -> Self {
        self.min_gaze_ms = min_gaze_ms;
        self.max_gaze_ms = max_gaze_ms;
        self
    }

    /// Set the pool strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: PoolStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the shutdown poll interval in milliseconds.
    #[must_use]
    pub const fn with_shutdown_poll_ms(mut self, shutdown_poll_ms: u64) -> Self {
        self.shutdown_poll_ms = shutdown_poll_ms;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.stone_count == 0 {
            return Err("stone_count must be greater than 0".into());
        }
        if self.gazer_count == 0 {
            return Err("gazer_count must be greater than 0".into());
        }
        if self.min_gaze_ms > self.max_gaze_ms {
            return Err(format!(
                "min_gaze_ms ({}) must not exceed max_gaze_ms ({})",
                self.min_gaze_ms, self.max_gaze_ms
            ));
        }
        if self.shutdown_poll_ms == 0 {
            return Err("shutdown_poll_ms must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns a parse error or the first validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Gazer loop settings derived from this configuration.
    #[must_use]
    pub const fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            iterations: self.iterations,
            min_gaze: Duration::from_millis(self.min_gaze_ms),
            max_gaze: Duration::from_millis(self.max_gaze_ms),
        }
    }

    /// Shutdown poll interval.
    #[must_use]
    pub const fn shutdown_poll(&self) -> Duration {
        Duration::from_millis(self.shutdown_poll_ms)
    }
}
