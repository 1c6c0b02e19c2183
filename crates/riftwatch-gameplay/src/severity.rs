//! Storm severity tiers and storminess configuration.
//!
//! Each world picks a storminess setting. The setting selects a
//! [`SeverityConfig`] that controls how often storms arrive and how quickly
//! they escalate. Worlds with storms turned off have no config at all.

use serde::{Deserialize, Serialize};

/// Severity of a storm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum SeverityTier {
    /// Mild storm.
    #[default]
    Light,
    /// Noticeable storm.
    Medium,
    /// Severe storm.
    Heavy,
}

/// Per-tier storm properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierProfile {
    /// Stability penalty while the storm is active.
    pub glitch_strength: f32,
    /// Broadcast when the storm is a few hours out.
    pub approaching_text: &'static str,
    /// Broadcast right before the storm starts.
    pub imminent_text: &'static str,
    /// Broadcast shortly before the storm ends.
    pub waning_text: &'static str,
}

const LIGHT: TierProfile = TierProfile {
    glitch_strength: 0.58,
    approaching_text: "A light temporal storm is approaching",
    imminent_text: "A light temporal storm is imminent",
    waning_text: "The temporal storm seems to be waning",
};

const MEDIUM: TierProfile = TierProfile {
    glitch_strength: 0.7,
    approaching_text: "A medium temporal storm is approaching",
    imminent_text: "A medium temporal storm is imminent",
    waning_text: "The temporal storm seems to be waning",
};

const HEAVY: TierProfile = TierProfile {
    glitch_strength: 1.0,
    approaching_text: "A heavy temporal storm is approaching",
    imminent_text: "A heavy temporal storm is imminent",
    waning_text: "The temporal storm seems to be waning",
};

impl SeverityTier {
    /// Maps a severity index to a tier, saturating at [`SeverityTier::Heavy`].
    #[must_use]
    pub const fn from_index(index: u32) -> Self {
        match index {
            0 => Self::Light,
            1 => Self::Medium,
            _ => Self::Heavy,
        }
    }

    /// Index of this tier (0-2).
    #[must_use]
    pub const fn index(self) -> u32 {
        match self {
            Self::Light => 0,
            Self::Medium => 1,
            Self::Heavy => 2,
        }
    }

    /// Properties of this tier.
    #[must_use]
    pub fn profile(self) -> &'static TierProfile {
        match self {
            Self::Light => &LIGHT,
            Self::Medium => &MEDIUM,
            Self::Heavy => &HEAVY,
        }
    }

    /// Stability penalty while a storm of this tier is active.
    #[must_use]
    pub fn glitch_strength(self) -> f32 {
        self.profile().glitch_strength
    }

    /// Get the display name for this tier.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Light => "Light",
            Self::Medium => "Medium",
            Self::Heavy => "Heavy",
        }
    }

    /// Get all tiers.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Light, Self::Medium, Self::Heavy]
    }
}

/// Uniform distribution of days between storms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyDistribution {
    /// Average days between storms
    pub mean: f64,
    /// Maximum deviation from the mean, in days
    pub variance: f64,
}

impl FrequencyDistribution {
    /// Creates a distribution.
    #[must_use]
    pub const fn new(mean: f64, variance: f64) -> Self {
        Self { mean, variance }
    }

    /// Draws a sample in `[mean - variance, mean + variance)`.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> f64 {
        self.mean + self.variance * (2.0 * rng.f64() - 1.0)
    }
}

/// Storm schedule configuration for one storminess setting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityConfig {
    /// Days until the next storm
    pub frequency: FrequencyDistribution,
    /// Escalation gained per average storm interval
    pub escalation_increment: f64,
    /// Upper bound of the escalation term
    pub escalation_cap: f64,
}

/// World storminess setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Storminess {
    /// Storms disabled.
    Off,
    /// Roughly once a month.
    VeryRare,
    /// Roughly every 25 days.
    Rare,
    /// Roughly every 15 days.
    Sometimes,
    /// Roughly weekly.
    Often,
    /// Every few days.
    VeryOften,
}

impl Storminess {
    /// Parses the world-config value. Unknown values yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "off" => Some(Self::Off),
            "veryrare" => Some(Self::VeryRare),
            "rare" => Some(Self::Rare),
            "sometimes" => Some(Self::Sometimes),
            "often" => Some(Self::Often),
            "veryoften" => Some(Self::VeryOften),
            _ => None,
        }
    }

    /// The world-config value for this setting.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::VeryRare => "veryrare",
            Self::Rare => "rare",
            Self::Sometimes => "sometimes",
            Self::Often => "often",
            Self::VeryOften => "veryoften",
        }
    }

    /// The schedule for this setting, or `None` when storms are off.
    #[must_use]
    pub const fn config(self) -> Option<SeverityConfig> {
        let (mean, variance, increment, cap) = match self {
            Self::Off => return None,
            Self::VeryRare => (30.0, 5.0, 0.025, 0.25),
            Self::Rare => (25.0, 5.0, 0.05, 0.5),
            Self::Sometimes => (15.0, 5.0, 0.10, 1.0),
            Self::Often => (7.5, 2.5, 0.15, 1.5),
            Self::VeryOften => (4.5, 1.5, 0.20, 2.0),
        };
        Some(SeverityConfig {
            frequency: FrequencyDistribution::new(mean, variance),
            escalation_increment: increment,
            escalation_cap: cap,
        })
    }

    /// Every setting that schedules storms.
    #[must_use]
    pub const fn enabled() -> [Self; 5] {
        [
            Self::VeryRare,
            Self::Rare,
            Self::Sometimes,
            Self::Often,
            Self::VeryOften,
        ]
    }
}

/// Resolves a raw `temporalStorms` value to a schedule.
#[must_use]
pub fn severity_config_for(value: Option<&str>) -> Option<SeverityConfig> {
    value.and_then(Storminess::parse).and_then(Storminess::config)
}
