//! Engine settings.
//!
//! Controls the simulated world (seed, layout, storm settings for new
//! worlds) and how the headless simulation is paced. Settings are loaded
//! from and saved to a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Settings file name.
pub const SETTINGS_FILE: &str = "riftwatch.toml";

/// Log filter used until the settings file has been read.
pub const DEFAULT_LOG_FILTER: &str = "riftwatch=info";

/// Errors reading or writing the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error.
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// Serialization error.
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Result type for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    // === World Settings ===
    /// World seed for new worlds (None = random)
    pub world_seed: Option<u64>,
    /// Directory holding the world save
    pub save_dir: PathBuf,
    /// Play style for new worlds
    pub play_style: String,
    /// Stability field toggle for new worlds
    pub temporal_stability: bool,
    /// Storminess for new worlds (None = decided by play style)
    pub temporal_storms: Option<String>,
    /// Sea level in blocks
    pub sea_level: f64,
    /// Map height in blocks
    pub map_height: f64,

    // === Simulation Settings ===
    /// Real seconds per game minute
    pub seconds_per_game_minute: f32,
    /// Real seconds advanced per simulation step
    pub step_seconds: f32,
    /// Game days to simulate in this run
    pub days_to_simulate: f64,
    /// Game days to jump over before the run starts
    pub fast_forward_days: f64,
    /// Save every N game days (0 = only at shutdown)
    pub autosave_interval_days: u32,

    // === Debug Settings ===
    /// Default tracing filter directive
    pub log_filter: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            // World
            world_seed: None,
            save_dir: PathBuf::from("saves/world"),
            play_style: "surviveandbuild".to_string(),
            temporal_stability: true,
            temporal_storms: None,
            sea_level: 110.0,
            map_height: 256.0,

            // Simulation
            seconds_per_game_minute: 0.05,
            step_seconds: 2.0,
            days_to_simulate: 30.0,
            fast_forward_days: 0.0,
            autosave_interval_days: 1,

            // Debug
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl EngineSettings {
    /// Load settings from the working directory.
    /// Returns defaults if the file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(SETTINGS_FILE)
    }

    /// Load settings from a specific path.
    /// Returns defaults if the file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::try_load_from(path) {
            Ok(Some(settings)) => {
                info!("Loaded settings from {}", path.display());
                settings
            },
            Ok(None) => {
                info!("Settings file not found, using defaults");
                Self::default()
            },
            Err(e) => {
                warn!("Invalid settings file {}, using defaults: {e}", path.display());
                Self::default()
            },
        }
    }

    /// Reads and validates a settings file.
    /// Returns `Ok(None)` if the file doesn't exist.
    pub fn try_load_from<P: AsRef<Path>>(path: P) -> SettingsResult<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }

        let mut contents = String::new();
        fs::File::open(path)?.read_to_string(&mut contents)?;
        let mut settings: Self = toml::from_str(&contents)?;
        settings.validate();
        Ok(Some(settings))
    }

    /// Save settings to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> SettingsResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Validate and clamp settings to sensible ranges.
    pub fn validate(&mut self) {
        // World
        self.map_height = self.map_height.clamp(64.0, 4096.0);
        self.sea_level = self.sea_level.clamp(1.0, self.map_height - 1.0);

        // Simulation
        self.seconds_per_game_minute = self.seconds_per_game_minute.clamp(0.001, 60.0);
        self.step_seconds = self.step_seconds.clamp(0.05, 60.0);
        self.days_to_simulate = self.days_to_simulate.clamp(0.0, 100_000.0);
        self.fast_forward_days = self.fast_forward_days.clamp(0.0, 100_000.0);
    }
}
