//! File-backed world save.
//!
//! Directory layout:
//!
//! ```text
//! <save_dir>/
//!   world.json        world metadata and attribute map
//!   data/<key>.bin    opaque blobs written by game systems
//! ```
//!
//! Every write goes to a temp file first and is then renamed into place.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use riftwatch_gameplay::{PersistenceError, PersistenceResult, SaveStore, WorldConfig};

/// World metadata file name.
const WORLD_FILE: &str = "world.json";
/// Blob subdirectory.
const DATA_DIR: &str = "data";

/// Parameters of a world that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewWorld {
    /// World seed
    pub seed: u64,
    /// Play style
    pub play_style: String,
    /// Initial attribute map
    pub world_config: WorldConfig,
}

/// Contents of `world.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorldMeta {
    seed: u64,
    play_style: String,
    total_days: f64,
    #[serde(default)]
    world_config: WorldConfig,
}

/// A world save on disk.
#[derive(Debug)]
pub struct FileSaveStore {
    root: PathBuf,
    meta: WorldMeta,
    is_new: bool,
}

impl FileSaveStore {
    /// Opens the world at `root`, creating it from `new_world` if missing.
    pub fn open(root: impl AsRef<Path>, new_world: &NewWorld) -> PersistenceResult<Self> {
        let root = root.as_ref().to_path_buf();
        let world_path = root.join(WORLD_FILE);

        if world_path.exists() {
            let file = File::open(&world_path)?;
            let meta: WorldMeta = serde_json::from_reader(BufReader::new(file))
                .map_err(|e| PersistenceError::Store(format!("{}: {e}", world_path.display())))?;
            info!(
                "Opened world at {} (seed {}, day {:.2})",
                root.display(),
                meta.seed,
                meta.total_days
            );
            return Ok(Self {
                root,
                meta,
                is_new: false,
            });
        }

        fs::create_dir_all(root.join(DATA_DIR))?;
        let store = Self {
            root,
            meta: WorldMeta {
                seed: new_world.seed,
                play_style: new_world.play_style.clone(),
                total_days: 0.0,
                world_config: new_world.world_config.clone(),
            },
            is_new: true,
        };
        store.flush()?;
        info!(
            "Created world at {} (seed {})",
            store.root.display(),
            store.meta.seed
        );
        Ok(store)
    }

    /// World seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.meta.seed
    }

    /// Calendar position at the last flush.
    #[must_use]
    pub fn total_days(&self) -> f64 {
        self.meta.total_days
    }

    /// Records the calendar position.
    pub fn set_total_days(&mut self, days: f64) {
        self.meta.total_days = days.max(self.meta.total_days);
    }

    /// Writes `world.json`.
    pub fn flush(&self) -> PersistenceResult<()> {
        let contents = serde_json::to_vec_pretty(&self.meta)
            .map_err(|e| PersistenceError::Store(e.to_string()))?;
        atomic_write(&self.root.join(WORLD_FILE), &contents)?;
        debug!("Flushed world metadata to {}", self.root.display());
        Ok(())
    }

    fn blob_path(&self, key: &str) -> PersistenceResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(PersistenceError::Store(format!("Invalid data key: {key:?}")));
        }
        Ok(self.root.join(DATA_DIR).join(format!("{key}.bin")))
    }
}

impl SaveStore for FileSaveStore {
    fn get_data(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>> {
        let path = self.blob_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(path)?))
    }

    fn store_data(&mut self, key: &str, data: Vec<u8>) -> PersistenceResult<()> {
        let path = self.blob_path(key)?;
        atomic_write(&path, &data)?;
        debug!("Stored {} bytes under {key}", data.len());
        Ok(())
    }

    fn world_config(&self) -> &WorldConfig {
        &self.meta.world_config
    }

    fn world_config_mut(&mut self) -> &mut WorldConfig {
        &mut self.meta.world_config
    }

    fn play_style(&self) -> &str {
        &self.meta.play_style
    }

    fn is_new(&self) -> bool {
        self.is_new
    }
}

/// Writes to a temp file next to `path`, then renames it into place.
fn atomic_write(path: &Path, contents: &[u8]) -> PersistenceResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");
    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(contents)?;
        writer.flush()?;
    }
    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        PersistenceError::Io(e)
    })
}
