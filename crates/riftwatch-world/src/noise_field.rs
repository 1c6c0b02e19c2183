//! Seeded procedural noise sources.

use noise::{Fbm, MultiFractal, NoiseFn, OpenSimplex};

/// Octave count of the default stability noise.
pub const STABILITY_OCTAVES: usize = 4;
/// Base frequency of the default stability noise.
pub const STABILITY_FREQUENCY: f64 = 0.1;
/// Amplitude falloff per octave of the default stability noise.
pub const STABILITY_PERSISTENCE: f64 = 0.9;

/// A deterministic 3D noise source.
///
/// Implementations must be pure: the same input always yields the same
/// output, and sampling never mutates state.
pub trait NoiseSource: Send + Sync {
    /// Samples the noise at a point. Output is roughly in `[-1, 1]`.
    fn sample(&self, x: f64, y: f64, z: f64) -> f64;
}

/// Multi-octave simplex noise seeded from the world seed.
pub struct SimplexNoiseField {
    /// World seed this field was built from
    seed: u64,
    /// Fractal noise generator
    fbm: Fbm<OpenSimplex>,
}

impl SimplexNoiseField {
    /// Creates the default stability noise for a world seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_octaves(seed, STABILITY_OCTAVES, STABILITY_FREQUENCY, STABILITY_PERSISTENCE)
    }

    /// Creates a noise field with explicit octave parameters.
    #[must_use]
    pub fn with_octaves(seed: u64, octaves: usize, frequency: f64, persistence: f64) -> Self {
        let fbm = Fbm::<OpenSimplex>::new(fold_seed(seed))
            .set_octaves(octaves.max(1))
            .set_frequency(frequency)
            .set_persistence(persistence);
        Self { seed, fbm }
    }

    /// Returns the world seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }
}

impl NoiseSource for SimplexNoiseField {
    fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        self.fbm.get([x, y, z])
    }
}

impl std::fmt::Debug for SimplexNoiseField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimplexNoiseField")
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

/// A noise source returning the same value everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantNoise(pub f64);

impl NoiseSource for ConstantNoise {
    fn sample(&self, _x: f64, _y: f64, _z: f64) -> f64 {
        self.0
    }
}

/// Folds a 64-bit world seed into the 32-bit seed the noise generators take.
fn fold_seed(seed: u64) -> u32 {
    (seed ^ (seed >> 32)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplex_deterministic() {
        let a = SimplexNoiseField::new(1234);
        let b = SimplexNoiseField::new(1234);
        for i in 0..32 {
            let p = f64::from(i) * 3.7;
            assert_eq!(a.sample(p, -p, p * 0.5).to_bits(), b.sample(p, -p, p * 0.5).to_bits());
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = SimplexNoiseField::new(1);
        let b = SimplexNoiseField::new(2);
        let differs = (0..64).any(|i| {
            let p = f64::from(i) * 1.3 + 0.17;
            (a.sample(p, p, p) - b.sample(p, p, p)).abs() > 1e-9
        });
        assert!(differs);
    }

    #[test]
    fn test_fold_seed_mixes_high_bits() {
        assert_ne!(fold_seed(1), fold_seed(1 | (1 << 40)));
    }
}
