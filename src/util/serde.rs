//! Identifier types shared across the pool, controller and snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a stone (one unit of the shared pool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoneId(pub usize);

/// Identity of a gazer (one competing worker thread).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GazerId(pub usize);

impl fmt::Display for StoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stone-{}", self.0)
    }
}

impl fmt::Display for GazerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gazer-{}", self.0)
    }
}

/// Pool strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStrategy {
    /// Explicit mutex around a hash map of availability flags.
    #[default]
    Locked,
    /// Sharded concurrent map; per-entry guards replace the pool mutex.
    Concurrent,
}
