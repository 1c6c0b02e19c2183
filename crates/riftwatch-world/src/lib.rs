//! # Riftwatch World
//!
//! Spatial fields over the world volume.
//!
//! This crate handles:
//! - Seeded procedural noise sources
//! - World dimensions (sea level, map height)
//! - The temporal stability field queried by spawning and other systems

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod noise_field;
pub mod stability;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::noise_field::*;
    pub use crate::stability::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use std::sync::Arc;

    #[test]
    fn test_field_from_seed_is_bounded() {
        let field = StabilityField::from_seed(42, WorldDimensions::default(), true);
        let value = field.stability(DVec3::new(10.0, 90.0, -40.0), 0.0);
        assert!((0.0..=1.5).contains(&value));
    }

    #[test]
    fn test_snapshot_shares_field() {
        let field = Arc::new(StabilityField::from_seed(7, WorldDimensions::default(), true));
        let snapshot = StabilitySnapshot::new(Arc::clone(&field), 0.7);
        let pos = DVec3::new(1.0, 50.0, 1.0);
        assert!((snapshot.stability(pos) - field.stability(pos, 0.7)).abs() < f32::EPSILON);
    }
}
