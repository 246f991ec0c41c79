//! Tests for builder modules

use std::sync::Arc;

use palantir_pool::builders::{build_pool, build_simulation, build_simulation_from_json};
use palantir_pool::config::SimulationConfig;
use palantir_pool::core::{SimulationError, SimulationState};
use palantir_pool::sync::FairSemaphore;
use palantir_pool::util::PoolStrategy;

#[test]
fn test_build_pool_strategy() {
    let locked = build_pool(PoolStrategy::Locked, Arc::new(FairSemaphore::new(0)));
    assert_eq!(locked.strategy(), PoolStrategy::Locked);
    assert_eq!(locked.capacity(), 0);

    let concurrent = build_pool(PoolStrategy::Concurrent, Arc::new(FairSemaphore::new(0)));
    assert_eq!(concurrent.strategy(), PoolStrategy::Concurrent);
}

#[test]
fn test_build_simulation_builds_model() {
    let cfg = SimulationConfig::default()
        .with_stone_count(3)
        .with_gazer_count(7);
    let controller = build_simulation(&cfg).unwrap();

    assert_eq!(controller.state(), SimulationState::Idle);
    assert_eq!(controller.capacity(), 3);
    assert_eq!(controller.available_permits(), 3);
    assert_eq!(controller.workers().gazer_count(), 7);
}

#[test]
fn test_build_simulation_rejects_invalid_config() {
    let cfg = SimulationConfig::default().with_stone_count(0);
    assert!(matches!(
        build_simulation(&cfg),
        Err(SimulationError::Configuration(_))
    ));
}

#[test]
fn test_build_simulation_from_json() {
    let controller =
        build_simulation_from_json(r#"{"stone_count": 2, "gazer_count": 3, "strategy": "concurrent"}"#)
            .unwrap();
    assert_eq!(controller.pool().strategy(), PoolStrategy::Concurrent);
    assert_eq!(controller.capacity(), 2);
}

#[test]
fn test_build_simulation_from_json_reports_context() {
    let Err(err) = build_simulation_from_json(r#"{"gazer_count": 0}"#) else {
        panic!("invalid gazer_count accepted");
    };
    assert!(format!("{err:#}").contains("loading simulation config"));
}
