//! Storm state persistence.
//!
//! The runtime state is stored as a single blob in the save's key/value
//! store:
//!
//! ```text
//! b"RWST" | bincode(StormSaveRecord { schema_version, state })
//! ```
//!
//! Loading never fails the world: an unreadable blob is logged and replaced
//! by a fresh state that gets scheduled from scratch.

use std::collections::HashMap;

use riftwatch_common::{MagicBytes, RiftError, SchemaVersion};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::storm_state::RuntimeState;
use crate::world_config::WorldConfig;

/// Save-store key of the storm blob.
pub const STORM_DATA_KEY: &str = "temporalStormData";

/// Errors related to storm persistence.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Blob does not start with the storm save magic
    #[error("Storm data: {0}")]
    BadMagic(#[from] RiftError),

    /// Blob from an incompatible build
    #[error("Unsupported storm data version {found} (current {current})")]
    UnsupportedVersion {
        /// Version found in the blob
        found: SchemaVersion,
        /// Version this build writes
        current: SchemaVersion,
    },

    /// Decoded state violates its invariants
    #[error("Storm data is inconsistent")]
    Inconsistent,

    /// Body failed to (de)serialize
    #[error("Storm data codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// IO errors from a backing store
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other backing store failures
    #[error("Save store error: {0}")]
    Store(String),
}

/// Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Key/value save store plus the world metadata the storm systems read.
pub trait SaveStore {
    /// Reads a blob. `Ok(None)` when the key was never written.
    fn get_data(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>>;

    /// Writes a blob, replacing any previous value.
    fn store_data(&mut self, key: &str, data: Vec<u8>) -> PersistenceResult<()>;

    /// World attribute map.
    fn world_config(&self) -> &WorldConfig;

    /// Mutable world attribute map.
    fn world_config_mut(&mut self) -> &mut WorldConfig;

    /// Play style the world was created with.
    fn play_style(&self) -> &str;

    /// Whether the world was created in this session.
    fn is_new(&self) -> bool;
}

/// In-memory save store.
#[derive(Debug, Clone, Default)]
pub struct MemorySaveStore {
    data: HashMap<String, Vec<u8>>,
    world_config: WorldConfig,
    play_style: String,
    is_new: bool,
}

impl MemorySaveStore {
    /// Creates an empty store for a freshly created world.
    #[must_use]
    pub fn new(play_style: impl Into<String>) -> Self {
        Self {
            data: HashMap::new(),
            world_config: WorldConfig::new(),
            play_style: play_style.into(),
            is_new: true,
        }
    }

    /// Replaces the world config.
    #[must_use]
    pub fn with_world_config(mut self, config: WorldConfig) -> Self {
        self.world_config = config;
        self
    }

    /// Marks the world as new or previously saved.
    pub fn set_new(&mut self, is_new: bool) {
        self.is_new = is_new;
    }
}

impl SaveStore for MemorySaveStore {
    fn get_data(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>> {
        Ok(self.data.get(key).cloned())
    }

    fn store_data(&mut self, key: &str, data: Vec<u8>) -> PersistenceResult<()> {
        self.data.insert(key.to_string(), data);
        Ok(())
    }

    fn world_config(&self) -> &WorldConfig {
        &self.world_config
    }

    fn world_config_mut(&mut self) -> &mut WorldConfig {
        &mut self.world_config
    }

    fn play_style(&self) -> &str {
        &self.play_style
    }

    fn is_new(&self) -> bool {
        self.is_new
    }
}

/// Persisted form of the storm state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StormSaveRecord {
    /// Version of the writer
    pub schema_version: SchemaVersion,
    /// State at save time
    pub state: RuntimeState,
}

/// Result of [`load`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadOutcome {
    /// Restored (or fresh) state
    pub state: RuntimeState,
    /// Whether the first storm still has to be scheduled
    pub needs_schedule: bool,
}

/// Serializes a state into a storm blob.
pub fn encode_state(state: &RuntimeState) -> PersistenceResult<Vec<u8>> {
    let record = StormSaveRecord {
        schema_version: SchemaVersion::STORM_SAVE,
        state: *state,
    };
    let body = bincode::serialize(&record)?;
    Ok(MagicBytes::STORM_SAVE.wrap(&body))
}

/// Deserializes a storm blob.
pub fn decode_state(bytes: &[u8]) -> PersistenceResult<RuntimeState> {
    let body = MagicBytes::STORM_SAVE.strip(bytes)?;
    let record: StormSaveRecord = bincode::deserialize(body)?;
    if !SchemaVersion::STORM_SAVE.can_read(&record.schema_version) {
        return Err(PersistenceError::UnsupportedVersion {
            found: record.schema_version,
            current: SchemaVersion::STORM_SAVE,
        });
    }
    if !record.state.is_consistent() {
        return Err(PersistenceError::Inconsistent);
    }
    Ok(record.state)
}

/// Restores the storm state from a save store.
pub fn load(store: &dyn SaveStore) -> LoadOutcome {
    let fresh = LoadOutcome {
        state: RuntimeState::new(),
        needs_schedule: true,
    };

    let bytes = match store.get_data(STORM_DATA_KEY) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            debug!("No storm data in save, initializing a new data set");
            return fresh;
        },
        Err(e) => {
            warn!("Failed reading storm data, will initialize a new data set: {e}");
            return fresh;
        },
    };

    match decode_state(&bytes) {
        Ok(state) => {
            info!("Loaded storm data ({} bytes)", bytes.len());
            LoadOutcome {
                state,
                needs_schedule: store.is_new(),
            }
        },
        Err(e) => {
            warn!("Failed loading storm data, will initialize a new data set: {e}");
            fresh
        },
    }
}

/// Writes the storm state to a save store.
pub fn save(store: &mut dyn SaveStore, state: &RuntimeState) -> PersistenceResult<()> {
    let bytes = encode_state(state)?;
    debug!("Saving storm data ({} bytes)", bytes.len());
    store.store_data(STORM_DATA_KEY, bytes)
}
