//! Simulated calendar.
//!
//! Storm timing is expressed in fractional simulated days. Anything that can
//! report a monotonic day count implements [`Calendar`]; [`GameCalendar`] is
//! the built-in clock that converts real seconds into game minutes.

use serde::{Deserialize, Serialize};

/// Source of simulated time.
pub trait Calendar {
    /// Total elapsed simulated days since world creation.
    ///
    /// Must never decrease while a world is loaded.
    fn total_days(&self) -> f64;
}

/// Default starting hour (6:00 AM).
const DEFAULT_START_HOUR: f64 = 6.0;
/// Default real seconds per game minute.
const DEFAULT_REAL_SECONDS_PER_MINUTE: f32 = 1.0;
/// Minutes in a game day.
const MINUTES_PER_DAY: f64 = 24.0 * 60.0;
/// Minutes in a game hour.
const MINUTES_PER_HOUR: f64 = 60.0;

/// Game clock driven by real elapsed time.
///
/// By default, 1 real second = 1 game minute (configurable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameCalendar {
    /// Total elapsed game time in game minutes.
    total_game_minutes: f64,
    /// Real seconds per game minute.
    real_seconds_per_game_minute: f32,
}

impl Default for GameCalendar {
    fn default() -> Self {
        Self::new()
    }
}

impl GameCalendar {
    /// Create a new calendar starting at 6:00 AM on day 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            total_game_minutes: DEFAULT_START_HOUR * MINUTES_PER_HOUR,
            real_seconds_per_game_minute: DEFAULT_REAL_SECONDS_PER_MINUTE,
        }
    }

    /// Create a calendar at an exact fractional day.
    #[must_use]
    pub fn at_day(total_days: f64) -> Self {
        Self {
            total_game_minutes: total_days.max(0.0) * MINUTES_PER_DAY,
            ..Self::new()
        }
    }

    /// Set the time scale (real seconds per game minute).
    pub fn set_time_scale(&mut self, seconds_per_minute: f32) {
        self.real_seconds_per_game_minute = seconds_per_minute.max(0.0001);
    }

    /// Get the current day count.
    #[must_use]
    pub fn day_count(&self) -> u32 {
        (self.total_game_minutes / MINUTES_PER_DAY) as u32
    }

    /// Get the current hour (0-23).
    #[must_use]
    pub fn hour(&self) -> u32 {
        let minutes_today = self.total_game_minutes % MINUTES_PER_DAY;
        (minutes_today / MINUTES_PER_HOUR) as u32 % 24
    }

    /// Get the current minute (0-59).
    #[must_use]
    pub fn minute(&self) -> u32 {
        (self.total_game_minutes % MINUTES_PER_HOUR) as u32 % 60
    }

    /// Get a formatted date string (Day N, HH:MM).
    #[must_use]
    pub fn format_date(&self) -> String {
        format!("Day {}, {:02}:{:02}", self.day_count(), self.hour(), self.minute())
    }

    /// Advance by real elapsed seconds.
    ///
    /// Returns `Some(day)` when a new day started during this update.
    pub fn update(&mut self, dt_real_seconds: f32) -> Option<u32> {
        if !dt_real_seconds.is_finite() || dt_real_seconds <= 0.0 {
            return None;
        }
        let old_day = self.day_count();
        let game_minutes = f64::from(dt_real_seconds / self.real_seconds_per_game_minute);
        self.total_game_minutes += game_minutes;
        let new_day = self.day_count();
        (new_day != old_day).then_some(new_day)
    }

    /// Jump forward by a number of game days (sleeping, admin commands).
    pub fn advance_days(&mut self, days: f64) {
        if days.is_finite() && days > 0.0 {
            self.total_game_minutes += days * MINUTES_PER_DAY;
        }
    }
}

impl Calendar for GameCalendar {
    fn total_days(&self) -> f64 {
        self.total_game_minutes / MINUTES_PER_DAY
    }
}
