//! Tests for utility functions

use palantir_pool::util::{now_ms, GazerId, PoolStrategy, StoneId};

#[test]
fn test_identifier_display() {
    assert_eq!(StoneId(3).to_string(), "stone-3");
    assert_eq!(GazerId(12).to_string(), "gazer-12");
}

#[test]
fn test_identifier_ordering() {
    assert!(StoneId(1) < StoneId(2));
    assert!(GazerId(0) < GazerId(10));
}

#[test]
fn test_identifiers_serialize_transparently() {
    assert_eq!(serde_json::to_string(&StoneId(5)).unwrap(), "5");
    let id: GazerId = serde_json::from_str("8").unwrap();
    assert_eq!(id, GazerId(8));
}

#[test]
fn test_pool_strategy_default() {
    assert_eq!(PoolStrategy::default(), PoolStrategy::Locked);
}

#[test]
fn test_now_ms_advances() {
    let first = now_ms();
    std::thread::sleep(std::time::Duration::from_millis(2));
    assert!(now_ms() > first);
}

#[test]
fn test_init_tracing_is_idempotent() {
    palantir_pool::util::init_tracing();
    palantir_pool::util::init_tracing();
    assert!(tracing::dispatcher::has_been_set());
}
