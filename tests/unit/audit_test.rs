//! Tests for audit sink

use palantir_pool::core::{build_audit_event, AuditAction, AuditSink, InMemoryAuditSink};
use palantir_pool::util::{GazerId, StoneId};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_audit_event(
        0,
        Some(GazerId(1)),
        Some(StoneId(2)),
        AuditAction::Acquire,
        None,
    );

    sink.record(event);
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].gazer, Some(GazerId(1)));
    assert_eq!(events[0].stone, Some(StoneId(2)));
    assert_eq!(events[0].action, AuditAction::Acquire);
    assert!(events[0].created_at_ms > 0);
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    for seq in 0..5 {
        sink.record(build_audit_event(seq, None, None, AuditAction::Release, None));
    }

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].sequence, 3);
    assert_eq!(events[1].sequence, 4);
}

#[test]
fn test_audit_event_serializes_snake_case_action() {
    let event = build_audit_event(
        7,
        None,
        None,
        AuditAction::Violation,
        Some("counter above capacity".to_string()),
    );
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["action"], "violation");
    assert_eq!(json["sequence"], 7);
    assert_eq!(json["detail"], "counter above capacity");
}
