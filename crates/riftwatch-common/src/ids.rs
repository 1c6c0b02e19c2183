//! ID types for replication peers.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for observer IDs.
static OBSERVER_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifies an observer (a connected client) receiving replicated state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Creates a new unique observer ID.
    #[must_use]
    pub fn new() -> Self {
        Self(OBSERVER_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates an observer ID from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}
