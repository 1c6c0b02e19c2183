//! Temporal stability field.
//!
//! Stability is a bounded scalar over world coordinates. Near the surface it
//! sits between 0.8 and 1.5; underground it varies with noise and decays with
//! depth. An active storm subtracts its glitch strength from every point.
//!
//! The field is recomputed on every query and holds no mutable state, so it
//! can be shared across threads freely.

use std::sync::Arc;

use glam::DVec3;
use riftwatch_common::clamp_to_world;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::noise_field::{NoiseSource, SimplexNoiseField};

/// Value returned everywhere when the stability feature is disabled.
pub const STABILITY_DISABLED: f32 = 2.0;

/// Upper bound of the stability field.
pub const STABILITY_MAX: f32 = 1.5;

/// Horizontal and vertical scale of noise features, in blocks.
const NOISE_SCALE: f64 = 80.0;
/// Amplitude applied to raw noise samples.
const NOISE_AMPLITUDE: f64 = 1.2;
/// Offset added to scaled noise samples.
const NOISE_OFFSET: f64 = 0.1;
/// Depth penalty divisor. At the bottom of the world the penalty is 1/3.5.
const DEPTH_PENALTY_DIVISOR: f32 = 3.5;

/// Vertical layout of the world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldDimensions {
    /// Sea level in blocks
    pub sea_level: f64,
    /// Total map height in blocks
    pub map_height: f64,
}

impl Default for WorldDimensions {
    fn default() -> Self {
        Self {
            sea_level: 110.0,
            map_height: 256.0,
        }
    }
}

impl WorldDimensions {
    /// Creates world dimensions, keeping both values at least one block.
    #[must_use]
    pub fn new(sea_level: f64, map_height: f64) -> Self {
        Self {
            sea_level: sea_level.max(1.0),
            map_height: map_height.max(1.0),
        }
    }
}

/// Evaluates temporal stability at world positions.
pub struct StabilityField {
    /// Noise source, immutable after construction
    noise: Box<dyn NoiseSource>,
    /// Vertical world layout
    dims: WorldDimensions,
    /// Whether the stability feature is enabled for this world
    enabled: bool,
}

impl StabilityField {
    /// Creates a stability field over an arbitrary noise source.
    #[must_use]
    pub fn new(noise: Box<dyn NoiseSource>, dims: WorldDimensions, enabled: bool) -> Self {
        Self {
            noise,
            dims,
            enabled,
        }
    }

    /// Creates a stability field with the default simplex noise for a seed.
    #[must_use]
    pub fn from_seed(seed: u64, dims: WorldDimensions, enabled: bool) -> Self {
        debug!(
            "Building stability field (seed {seed}, sea level {}, height {}, enabled {enabled})",
            dims.sea_level, dims.map_height
        );
        Self::new(Box::new(SimplexNoiseField::new(seed)), dims, enabled)
    }

    /// Whether the stability feature is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the world dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> &WorldDimensions {
        &self.dims
    }

    /// Stability at a position with a storm glitch strength applied.
    ///
    /// Always in `[0, 1.5]` when enabled, and exactly
    /// [`STABILITY_DISABLED`] when disabled.
    #[must_use]
    pub fn stability(&self, pos: DVec3, glitch_strength: f32) -> f32 {
        if !self.enabled {
            return STABILITY_DISABLED;
        }
        let glitch = if glitch_strength.is_finite() {
            glitch_strength
        } else {
            0.0
        };
        (self.base_stability(pos) - glitch).clamp(0.0, STABILITY_MAX)
    }

    /// Stability at a position before any storm penalty.
    #[must_use]
    pub fn base_stability(&self, pos: DVec3) -> f32 {
        if !self.enabled {
            return STABILITY_DISABLED;
        }

        let pos = clamp_to_world(pos, self.dims.map_height);
        let raw = self
            .noise
            .sample(pos.x / NOISE_SCALE, pos.y / NOISE_SCALE, pos.z / NOISE_SCALE);
        let raw = if raw.is_finite() { raw } else { 0.0 };
        let mut value = (raw * NOISE_AMPLITUDE + NOISE_OFFSET).clamp(-1.0, 2.0) as f32;

        // Surface stability stays between 80% and 150%
        let surface = (1.6 + value).clamp(0.8, 1.5);
        let blend = ((pos.y.max(0.0) / self.dims.sea_level).powi(2)).clamp(0.0, 1.0) as f32;
        value = mix(value, surface, blend);

        let depth = ((self.dims.sea_level - pos.y) / self.dims.map_height) as f32;
        value -= depth.max(0.0) / DEPTH_PENALTY_DIVISOR;

        value.clamp(0.0, STABILITY_MAX)
    }
}

impl std::fmt::Debug for StabilityField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StabilityField")
            .field("dims", &self.dims)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// An immutable view of the field paired with a frozen glitch strength.
///
/// Cheap to clone and safe to hand to background threads.
#[derive(Debug, Clone)]
pub struct StabilitySnapshot {
    /// Shared field
    field: Arc<StabilityField>,
    /// Storm glitch strength at the time the snapshot was taken
    glitch_strength: f32,
}

impl StabilitySnapshot {
    /// Creates a snapshot.
    #[must_use]
    pub fn new(field: Arc<StabilityField>, glitch_strength: f32) -> Self {
        Self {
            field,
            glitch_strength,
        }
    }

    /// Stability at a position.
    #[must_use]
    pub fn stability(&self, pos: DVec3) -> f32 {
        self.field.stability(pos, self.glitch_strength)
    }

    /// Glitch strength captured in this snapshot.
    #[must_use]
    pub const fn glitch_strength(&self) -> f32 {
        self.glitch_strength
    }

    /// Whether the stability feature is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.field.is_enabled()
    }
}

/// Linear interpolation helper.
fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
