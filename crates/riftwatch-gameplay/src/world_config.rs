//! World configuration attributes that drive the storm systems.
//!
//! The save's world configuration is a free-form JSON object. Only a handful
//! of keys matter here; everything else is left untouched.

use serde_json::Value;
use tracing::warn;

use crate::severity::{SeverityConfig, Storminess};

/// Free-form world attribute map as stored in the save.
pub type WorldConfig = serde_json::Map<String, Value>;

/// Enables the stability field (default true).
pub const TEMPORAL_STABILITY_KEY: &str = "temporalStability";
/// Storminess setting.
pub const TEMPORAL_STORMS_KEY: &str = "temporalStorms";
/// Version of the world-config layout (absent means 0).
pub const SCHEMA_VERSION_KEY: &str = "schemaVersion";

/// Storm-relevant settings read from a world config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldSettings {
    /// Whether the stability field is enabled
    pub temporal_stability: bool,
    /// Storminess, `None` when missing or unrecognised
    pub storminess: Option<Storminess>,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            temporal_stability: true,
            storminess: None,
        }
    }
}

impl WorldSettings {
    /// Reads the settings from a world config.
    #[must_use]
    pub fn from_config(config: &WorldConfig) -> Self {
        let temporal_stability = match config.get(TEMPORAL_STABILITY_KEY) {
            None => true,
            Some(Value::Bool(enabled)) => *enabled,
            Some(Value::String(text)) if text.eq_ignore_ascii_case("false") => false,
            Some(Value::String(text)) if text.eq_ignore_ascii_case("true") => true,
            Some(other) => {
                warn!("Ignoring malformed {TEMPORAL_STABILITY_KEY} value {other}");
                true
            },
        };

        let storminess = match config.get(TEMPORAL_STORMS_KEY) {
            None => None,
            Some(Value::String(text)) => {
                let parsed = Storminess::parse(text);
                if parsed.is_none() {
                    warn!("Unknown {TEMPORAL_STORMS_KEY} setting '{text}', storms disabled");
                }
                parsed
            },
            Some(other) => {
                warn!("Ignoring malformed {TEMPORAL_STORMS_KEY} value {other}");
                None
            },
        };

        Self {
            temporal_stability,
            storminess,
        }
    }

    /// Storm schedule for this world.
    ///
    /// Storms only run when the stability field is enabled and a storminess
    /// other than `off` is configured.
    #[must_use]
    pub fn severity_config(&self) -> Option<SeverityConfig> {
        if !self.temporal_stability {
            return None;
        }
        self.storminess.and_then(Storminess::config)
    }

    /// Writes the settings back into a world config.
    pub fn write_to(&self, config: &mut WorldConfig) {
        config.insert(
            TEMPORAL_STABILITY_KEY.to_string(),
            Value::Bool(self.temporal_stability),
        );
        match self.storminess {
            Some(setting) => {
                config.insert(
                    TEMPORAL_STORMS_KEY.to_string(),
                    Value::String(setting.as_str().to_string()),
                );
            },
            None => {
                config.remove(TEMPORAL_STORMS_KEY);
            },
        }
    }
}

/// Layout version of a world config. Missing or malformed markers read as 0.
#[must_use]
pub fn schema_version(config: &WorldConfig) -> u32 {
    config
        .get(SCHEMA_VERSION_KEY)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

/// Stamps the layout version into a world config.
pub fn set_schema_version(config: &mut WorldConfig, version: u32) {
    config.insert(SCHEMA_VERSION_KEY.to_string(), Value::from(version));
}
