//! Tests for error types

use palantir_pool::core::{PoolError, SemaphoreError, SimulationError};
use palantir_pool::util::StoneId;

#[test]
fn test_semaphore_error_display() {
    assert_eq!(
        format!("{}", SemaphoreError::Interrupted),
        "interrupted while waiting for a permit"
    );
    assert_eq!(
        format!("{}", SemaphoreError::PermitOverflow { max: 3 }),
        "permit overflow: release beyond 3 permits"
    );
}

#[test]
fn test_pool_error_display() {
    let err = PoolError::InUse { held: 2, queued: 1 };
    assert_eq!(format!("{}", err), "pool in use: 2 stones held, 1 waiters queued");
    assert_eq!(format!("{}", PoolError::UnknownStone(StoneId(4))), "unknown stone stone-4");
}

#[test]
fn test_interrupt_becomes_cancellation() {
    let pool: PoolError = SemaphoreError::Interrupted.into();
    assert_eq!(pool, PoolError::Cancelled);

    let sim: SimulationError = pool.into();
    assert!(sim.is_cancellation());
    assert!(!sim.is_fatal());
}

#[test]
fn test_overflow_is_fatal_accounting_error() {
    let pool: PoolError = SemaphoreError::PermitOverflow { max: 1 }.into();
    assert!(matches!(pool, PoolError::PermitAccounting(_)));

    let sim: SimulationError = pool.into();
    assert!(matches!(sim, SimulationError::PermitAccounting(_)));
    assert!(sim.is_fatal());
}

#[test]
fn test_pool_in_use_is_configuration_error() {
    let sim: SimulationError = PoolError::InUse { held: 1, queued: 0 }.into();
    assert!(matches!(sim, SimulationError::Configuration(_)));
    assert!(!sim.is_fatal());
}

#[test]
fn test_unknown_stone_is_invariant_violation() {
    let sim: SimulationError = PoolError::UnknownStone(StoneId(9)).into();
    assert!(matches!(sim, SimulationError::InvariantViolation(_)));
    assert!(sim.is_fatal());
}
