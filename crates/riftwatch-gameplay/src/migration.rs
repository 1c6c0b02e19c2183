//! World-config migrations.
//!
//! Worlds created before the storm systems existed have no storm settings.
//! Each [`Migration`] upgrades the world config by one layout version; the
//! registry chains them and stamps the final version so later loads skip
//! the work.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::world_config::{
    schema_version, set_schema_version, WorldConfig, TEMPORAL_STABILITY_KEY, TEMPORAL_STORMS_KEY,
};

/// Current world-config layout version.
pub const CURRENT_WORLD_SCHEMA: u32 = 1;

/// Play style of classic survival worlds.
pub const PLAY_STYLE_SURVIVE_AND_BUILD: &str = "surviveandbuild";
/// Play style of harsh survival worlds.
pub const PLAY_STYLE_WILDERNESS: &str = "wildernesssurvival";

/// Errors related to world-config migration.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// World config from a newer build.
    #[error("World config version {found} is newer than supported ({current})")]
    TooNew {
        /// Found version.
        found: u32,
        /// Current supported version.
        current: u32,
    },

    /// Migration failed.
    #[error("Failed to migrate world config from version {from} to {to}: {reason}")]
    Failed {
        /// Source version.
        from: u32,
        /// Target version.
        to: u32,
        /// Reason for failure.
        reason: String,
    },
}

/// Result type for migration operations.
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Inputs a migration may consult besides the config itself.
#[derive(Debug, Clone, Copy)]
pub struct MigrationContext<'a> {
    /// The save's play style
    pub play_style: &'a str,
}

/// One world-config upgrade step.
pub trait Migration {
    /// Source version this migration applies to.
    fn source_version(&self) -> u32;

    /// Target version after migration.
    fn target_version(&self) -> u32;

    /// Migrates the config in place.
    fn migrate(&self, config: &mut WorldConfig, context: &MigrationContext<'_>) -> MigrationResult<()>;

    /// Description of changes made.
    fn description(&self) -> &str;
}

/// Fills in storm settings for worlds saved before they existed.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyStormSettings;

impl Migration for LegacyStormSettings {
    fn source_version(&self) -> u32 {
        0
    }

    fn target_version(&self) -> u32 {
        1
    }

    fn migrate(&self, config: &mut WorldConfig, context: &MigrationContext<'_>) -> MigrationResult<()> {
        let storminess = match context.play_style {
            PLAY_STYLE_SURVIVE_AND_BUILD => "sometimes",
            PLAY_STYLE_WILDERNESS => "often",
            _ => return Ok(()),
        };

        if !config.contains_key(TEMPORAL_STABILITY_KEY) {
            config.insert(TEMPORAL_STABILITY_KEY.to_string(), Value::Bool(true));
        }
        if !config.contains_key(TEMPORAL_STORMS_KEY) {
            config.insert(
                TEMPORAL_STORMS_KEY.to_string(),
                Value::String(storminess.to_string()),
            );
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Default storm settings for survival play styles"
    }
}

/// Registry of available migrations.
pub struct MigrationRegistry {
    /// Migrations keyed by source version.
    migrations: HashMap<u32, Box<dyn Migration + Send + Sync>>,
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::with_builtin_migrations()
    }
}

impl std::fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("migrations", &self.list_migrations())
            .finish()
    }
}

impl MigrationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            migrations: HashMap::new(),
        }
    }

    /// Creates a registry with all built-in migrations.
    #[must_use]
    pub fn with_builtin_migrations() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(LegacyStormSettings));
        registry
    }

    /// Registers a migration.
    pub fn register(&mut self, migration: Box<dyn Migration + Send + Sync>) {
        let source = migration.source_version();
        self.migrations.insert(source, migration);
    }

    /// Gets a migration for a specific source version.
    #[must_use]
    pub fn get(&self, source_version: u32) -> Option<&(dyn Migration + Send + Sync)> {
        self.migrations.get(&source_version).map(|m| m.as_ref())
    }

    /// Brings a world config up to [`CURRENT_WORLD_SCHEMA`].
    ///
    /// Returns the number of steps applied. A config that is already current
    /// is left untouched.
    pub fn migrate(&self, config: &mut WorldConfig, context: &MigrationContext<'_>) -> MigrationResult<u32> {
        let found = schema_version(config);
        if found > CURRENT_WORLD_SCHEMA {
            return Err(MigrationError::TooNew {
                found,
                current: CURRENT_WORLD_SCHEMA,
            });
        }

        let mut current_version = found;
        let mut applied = 0;
        while current_version < CURRENT_WORLD_SCHEMA {
            if let Some(migration) = self.get(current_version) {
                info!(
                    "Applying world config migration: {} ({} -> {})",
                    migration.description(),
                    current_version,
                    migration.target_version()
                );
                migration.migrate(config, context)?;
                if migration.target_version() <= current_version {
                    return Err(MigrationError::Failed {
                        from: current_version,
                        to: migration.target_version(),
                        reason: "migration does not advance the version".to_string(),
                    });
                }
                current_version = migration.target_version();
                applied += 1;
            } else {
                warn!(
                    "No world config migration for version {}, skipping to {}",
                    current_version,
                    current_version + 1
                );
                current_version += 1;
            }
        }

        if current_version != found {
            set_schema_version(config, current_version);
        }
        Ok(applied)
    }

    /// Lists all available migrations.
    #[must_use]
    pub fn list_migrations(&self) -> Vec<(u32, u32, &str)> {
        let mut result: Vec<_> = self
            .migrations
            .values()
            .map(|m| (m.source_version(), m.target_version(), m.description()))
            .collect();
        result.sort_by_key(|(src, _, _)| *src);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world_config::WorldSettings;
    use crate::severity::Storminess;
    use serde_json::json;

    fn migrate(config: &mut WorldConfig, play_style: &str) -> u32 {
        MigrationRegistry::default()
            .migrate(config, &MigrationContext { play_style })
            .expect("migration failed")
    }

    #[test]
    fn test_legacy_survive_and_build() {
        let mut config = WorldConfig::new();
        assert_eq!(migrate(&mut config, PLAY_STYLE_SURVIVE_AND_BUILD), 1);
        let settings = WorldSettings::from_config(&config);
        assert!(settings.temporal_stability);
        assert_eq!(settings.storminess, Some(Storminess::Sometimes));
        assert_eq!(schema_version(&config), CURRENT_WORLD_SCHEMA);
    }

    #[test]
    fn test_legacy_wilderness() {
        let mut config = WorldConfig::new();
        migrate(&mut config, PLAY_STYLE_WILDERNESS);
        assert_eq!(config.get(TEMPORAL_STORMS_KEY), Some(&json!("often")));
    }

    #[test]
    fn test_explicit_settings_kept() {
        let mut config = WorldConfig::new();
        config.insert(TEMPORAL_STORMS_KEY.to_string(), json!("off"));
        config.insert(TEMPORAL_STABILITY_KEY.to_string(), json!(false));
        migrate(&mut config, PLAY_STYLE_WILDERNESS);
        assert_eq!(config.get(TEMPORAL_STORMS_KEY), Some(&json!("off")));
        assert_eq!(config.get(TEMPORAL_STABILITY_KEY), Some(&json!(false)));
    }

    #[test]
    fn test_other_play_styles_untouched() {
        let mut config = WorldConfig::new();
        migrate(&mut config, "creativebuilding");
        assert!(!config.contains_key(TEMPORAL_STORMS_KEY));
        assert!(!config.contains_key(TEMPORAL_STABILITY_KEY));
        assert_eq!(schema_version(&config), CURRENT_WORLD_SCHEMA);
    }

    #[test]
    fn test_runs_once() {
        let mut config = WorldConfig::new();
        migrate(&mut config, PLAY_STYLE_SURVIVE_AND_BUILD);
        // A user switching storms off after the upgrade must not be overridden
        config.remove(TEMPORAL_STORMS_KEY);
        assert_eq!(migrate(&mut config, PLAY_STYLE_SURVIVE_AND_BUILD), 0);
        assert!(!config.contains_key(TEMPORAL_STORMS_KEY));
    }

    #[test]
    fn test_newer_config_rejected() {
        let mut config = WorldConfig::new();
        set_schema_version(&mut config, 7);
        let result = MigrationRegistry::default()
            .migrate(&mut config, &MigrationContext { play_style: "" });
        assert!(matches!(result, Err(MigrationError::TooNew { found: 7, .. })));
    }

    #[test]
    fn test_registry_lists_builtin() {
        let registry = MigrationRegistry::with_builtin_migrations();
        assert_eq!(registry.list_migrations(), vec![(0, 1, "Default storm settings for survival play styles")]);
        assert!(MigrationRegistry::new().list_migrations().is_empty());
    }
}
