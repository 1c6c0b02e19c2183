//! Coordinate types for block and world positions.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Horizontal world border, in blocks from the origin.
pub const WORLD_BORDER: f64 = 30_000_000.0;

/// Integer block position in the 3D world grid.
///
/// `y` is the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockPos {
    /// X coordinate
    pub x: i32,
    /// Y coordinate (height)
    pub y: i32,
    /// Z coordinate
    pub z: i32,
}

impl BlockPos {
    /// Creates a new block position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Converts to a world-space position at the block's minimum corner.
    #[must_use]
    pub fn to_world(self) -> DVec3 {
        DVec3::new(f64::from(self.x), f64::from(self.y), f64::from(self.z))
    }

    /// Returns the block containing a world-space position.
    #[must_use]
    pub fn from_world(pos: DVec3) -> Self {
        let floored = pos.floor();
        Self {
            x: floored.x as i32,
            y: floored.y as i32,
            z: floored.z as i32,
        }
    }
}

/// Clamps a world position into the playable volume.
///
/// Horizontal axes are limited to the world border and the vertical axis to
/// `[-max_height, 2 * max_height]`, which keeps downstream math finite.
#[must_use]
pub fn clamp_to_world(pos: DVec3, max_height: f64) -> DVec3 {
    let height = max_height.max(1.0);
    DVec3::new(
        pos.x.clamp(-WORLD_BORDER, WORLD_BORDER),
        pos.y.clamp(-height, 2.0 * height),
        pos.z.clamp(-WORLD_BORDER, WORLD_BORDER),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_world_floors_negative() {
        let pos = BlockPos::from_world(DVec3::new(-0.5, 10.9, 3.0));
        assert_eq!(pos, BlockPos::new(-1, 10, 3));
    }

    #[test]
    fn test_clamp_to_world_bounds() {
        let clamped = clamp_to_world(DVec3::new(1e12, -1e9, -1e12), 256.0);
        assert!((clamped.x - WORLD_BORDER).abs() < f64::EPSILON);
        assert!((clamped.y + 256.0).abs() < f64::EPSILON);
        assert!((clamped.z + WORLD_BORDER).abs() < f64::EPSILON);
    }
}
