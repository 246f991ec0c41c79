//! Audit sink implementations.
//!
//! The controller reports every bind, unbind and invariant violation to an
//! optional sink, which is how tests and tooling reconstruct grant order.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::util::clock::now_ms;
use crate::util::serde::{GazerId, StoneId};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A stone was bound to a gazer.
    Acquire,
    /// A stone was unbound from a gazer.
    Release,
    /// A fatal invariant violation was reported.
    Violation,
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Monotonic sequence number assigned by the controller.
    pub sequence: u64,
    /// Gazer involved, if any.
    pub gazer: Option<GazerId>,
    /// Stone involved, if any.
    pub stone: Option<StoneId>,
    /// Action taken.
    pub action: AuditAction,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events.min(4096)),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Helper to build an audit event from context.
#[must_use]
pub fn build_audit_event(
    sequence: u64,
    gazer: Option<GazerId>,
    stone: Option<StoneId>,
    action: AuditAction,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        sequence,
        gazer,
        stone,
        action,
        created_at_ms: now_ms(),
        detail,
    }
}
