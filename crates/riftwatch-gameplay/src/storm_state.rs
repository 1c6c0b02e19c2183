//! Authoritative storm runtime state.

use serde::{Deserialize, Serialize};

use crate::severity::SeverityTier;

/// Day of the first storm on a fresh world before scheduling runs.
pub const DEFAULT_FIRST_STORM_DAY: f64 = 5.0;

/// Which storm notification has already fired this cycle.
///
/// Ordered: a notification fires only if the stage is still below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum NotifyStage {
    /// Nothing sent yet this cycle.
    #[default]
    None,
    /// Approaching notice sent.
    Approaching,
    /// Imminent notice sent.
    Imminent,
    /// Waning notice sent.
    Waning,
}

/// Per-world storm state.
///
/// Owned by the authority's controller; observers hold a read-only copy that
/// is replaced wholesale on every update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuntimeState {
    /// Whether a storm is currently in its active window
    pub active: bool,
    /// Last notification sent this cycle
    pub notify_stage: NotifyStage,
    /// Day the active window ends (valid only while active)
    pub active_until_day: f64,
    /// Day the next storm starts
    pub next_start_day: f64,
    /// Severity of the next (or current) storm
    pub next_severity_tier: SeverityTier,
    /// Escalation term computed at the last scheduling
    pub next_escalation_term: f64,
    /// Stability penalty, zero unless active
    pub glitch_strength: f32,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            active: false,
            notify_stage: NotifyStage::None,
            active_until_day: 0.0,
            next_start_day: DEFAULT_FIRST_STORM_DAY,
            next_severity_tier: SeverityTier::Light,
            next_escalation_term: 0.0,
            glitch_strength: 0.0,
        }
    }
}

impl RuntimeState {
    /// Creates a fresh state for a new world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Days until the scheduled storm starts (negative once it has started).
    #[must_use]
    pub fn days_to_start(&self, current_day: f64) -> f64 {
        self.next_start_day - current_day
    }

    /// Length in days of the active window for the scheduled storm.
    #[must_use]
    pub fn active_duration(&self) -> f64 {
        0.1 + self.next_escalation_term.max(0.0) * 0.1
    }

    /// Checks the state invariants.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let glitch_ok = self.active || self.glitch_strength == 0.0;
        let range_ok = (0.0..=1.0).contains(&self.glitch_strength);
        glitch_ok && range_ok && self.next_start_day.is_finite() && self.active_until_day.is_finite()
    }
}
