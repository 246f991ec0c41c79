//! Tests for configuration validation

use std::time::Duration;

use palantir_pool::config::SimulationConfig;
use palantir_pool::util::PoolStrategy;

#[test]
fn test_simulation_config_validation() {
    let valid = SimulationConfig::default()
        .with_stone_count(3)
        .with_gazer_count(10)
        .with_iterations(50);
    assert!(valid.validate().is_ok());
}

#[test]
fn test_simulation_config_invalid_stone_count() {
    let invalid = SimulationConfig::default().with_stone_count(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_simulation_config_invalid_gazer_count() {
    let invalid = SimulationConfig::default().with_gazer_count(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_simulation_config_invalid_poll() {
    let invalid = SimulationConfig::default().with_shutdown_poll_ms(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_simulation_config_from_json() {
    let json = r#"{
        "stone_count": 2,
        "gazer_count": 4,
        "iterations": 10,
        "strategy": "concurrent"
    }"#;

    let cfg = SimulationConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.stone_count, 2);
    assert_eq!(cfg.gazer_count, 4);
    assert_eq!(cfg.iterations, 10);
    assert_eq!(cfg.strategy, PoolStrategy::Concurrent);
    // Unset fields keep their defaults.
    assert_eq!(cfg.shutdown_poll(), Duration::from_millis(50));
}

#[test]
fn test_simulation_config_from_json_invalid() {
    assert!(SimulationConfig::from_json_str(r#"{"stone_count": 0}"#).is_err());
    assert!(SimulationConfig::from_json_str(r#"{"strategy": "lockless"}"#).is_err());
    assert!(SimulationConfig::from_json_str("not json").is_err());
}

#[test]
fn test_simulation_config_round_trips_through_json() {
    let cfg = SimulationConfig::default().with_strategy(PoolStrategy::Concurrent);
    let json = serde_json::to_string(&cfg).unwrap();
    assert!(json.contains("\"strategy\":\"concurrent\""));
    assert_eq!(SimulationConfig::from_json_str(&json).unwrap(), cfg);
}
