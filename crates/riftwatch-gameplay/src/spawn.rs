//! Spawn modulation driven by observer stability.
//!
//! Creatures flagged with `spawn_closer_during_low_stability` ignore light
//! and crowd the observer as their stability drops or a storm rages. Low
//! stability also escalates such creatures up a ladder of tougher variants.

use glam::DVec3;
use riftwatch_common::BlockPos;
use serde::{Deserialize, Serialize};

/// Light level bounds are mixed towards this range as stability drops.
const UNRESTRICTED_MAX_LIGHT: f32 = 32.0;
/// Maximum spawn distance once the modulation drops below one half.
const CLOSE_SPAWN_RADIUS: f64 = 10.0;
/// Stability below which variants escalate.
const ESCALATION_THRESHOLD: f64 = 0.25;
/// Rungs gained per unit of stability below the threshold.
const ESCALATION_RATE: f64 = 13.0;

/// Which light a spawn rule measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LightLevelType {
    /// Only light emitted by blocks.
    BlockLight,
    /// Only sunlight, ignoring time of day.
    SunLight,
    /// Brightest of block light and sunlight.
    #[default]
    MaxLight,
    /// Brightest of block light and sunlight scaled by time of day.
    MaxTimeOfDayLight,
}

/// Provides light levels at block positions.
pub trait LightLevelSource {
    /// Light level (0-32) at `pos`.
    fn light_level(&self, pos: BlockPos, kind: LightLevelType) -> i32;
}

impl<F> LightLevelSource for F
where
    F: Fn(BlockPos, LightLevelType) -> i32,
{
    fn light_level(&self, pos: BlockPos, kind: LightLevelType) -> i32 {
        self(pos, kind)
    }
}

/// Spawn rule of a creature type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnConditions {
    /// Minimum light level (inclusive)
    pub min_light_level: i32,
    /// Maximum light level (inclusive)
    pub max_light_level: i32,
    /// Minimum distance to the nearest observer
    pub min_distance_to_observer: f64,
    /// Which light to measure
    pub light_level_type: LightLevelType,
}

impl Default for SpawnConditions {
    fn default() -> Self {
        Self {
            min_light_level: 0,
            max_light_level: 7,
            min_distance_to_observer: 18.0,
            light_level_type: LightLevelType::MaxLight,
        }
    }
}

/// Creature type being considered for a spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnCandidate {
    /// Creature type code, e.g. `drifter-normal`
    pub code: String,
    /// Whether low stability lets this creature spawn closer and in light
    pub spawn_closer_during_low_stability: bool,
    /// Stability restored to whoever kills this creature
    pub on_death_stability_recovery: f64,
}

impl SpawnCandidate {
    /// Creates a candidate with no stability behaviour.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            spawn_closer_during_low_stability: false,
            on_death_stability_recovery: 0.0,
        }
    }

    /// Marks the candidate as drawn in by low stability.
    #[must_use]
    pub fn spawning_closer_during_low_stability(mut self) -> Self {
        self.spawn_closer_during_low_stability = true;
        self
    }

    /// Sets the stability recovered by its killer.
    #[must_use]
    pub fn with_death_recovery(mut self, recovery: f64) -> Self {
        self.on_death_stability_recovery = recovery;
        self
    }
}

/// Observer (player) near a spawn attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnObserver {
    /// Current position
    pub position: DVec3,
    /// Personal stability attribute, `None` if the observer does not track it
    pub stability: Option<f64>,
}

impl SpawnObserver {
    /// Creates an observer with full personal stability.
    #[must_use]
    pub fn new(position: DVec3) -> Self {
        Self {
            position,
            stability: Some(1.0),
        }
    }

    /// Personal stability, defaulting to 1 when untracked.
    #[must_use]
    pub fn stability_or_default(&self) -> f64 {
        self.stability.unwrap_or(1.0)
    }
}

/// Ordered ladder of creature variants, weakest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantLadder {
    rungs: Vec<String>,
}

impl Default for VariantLadder {
    fn default() -> Self {
        Self::new([
            "drifter-normal",
            "drifter-deep",
            "drifter-tainted",
            "drifter-corrupt",
            "drifter-nightmare",
        ])
    }
}

impl VariantLadder {
    /// Creates a ladder from the weakest to the strongest variant.
    #[must_use]
    pub fn new<I, S>(rungs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rungs: rungs.into_iter().map(Into::into).collect(),
        }
    }

    /// Index of a variant on the ladder.
    #[must_use]
    pub fn position(&self, code: &str) -> Option<usize> {
        self.rungs.iter().position(|rung| rung == code)
    }

    /// Variant `steps` rungs above `code`, saturating at the top.
    ///
    /// Codes not on the ladder are returned unchanged.
    #[must_use]
    pub fn climb<'a>(&'a self, code: &'a str, steps: usize) -> &'a str {
        match self.position(code) {
            Some(index) => {
                let top = self.rungs.len().saturating_sub(1);
                &self.rungs[index.saturating_add(steps).min(top)]
            },
            None => code,
        }
    }
}

/// Spawn rules for the current storm state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnModulator {
    /// Whether the world has the stability field enabled
    pub stability_enabled: bool,
    /// Glitch strength of the current storm
    pub glitch_strength: f32,
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

impl SpawnModulator {
    /// Creates a modulator.
    #[must_use]
    pub fn new(stability_enabled: bool, glitch_strength: f32) -> Self {
        Self {
            stability_enabled,
            glitch_strength,
        }
    }

    /// How strongly normal spawn rules still apply, in `[0, 1]`.
    ///
    /// Falls off once the observer's stability is below 0.25 and during
    /// storms with glitch above 0.
    #[must_use]
    pub fn modulation(&self, observer_stability: f64) -> f64 {
        let by_observer = (4.0 * observer_stability).min(1.0);
        let by_storm = (1.0 - 2.0 * f64::from(self.glitch_strength)).max(0.0);
        by_observer.min(by_storm).max(0.0)
    }

    /// Whether `candidate` may spawn at `position` near `observer`.
    #[must_use]
    pub fn can_spawn_nearby(
        &self,
        observer: &SpawnObserver,
        candidate: &SpawnCandidate,
        position: DVec3,
        conditions: &SpawnConditions,
        light: &dyn LightLevelSource,
    ) -> bool {
        let level = light.light_level(BlockPos::from_world(position), conditions.light_level_type);
        let dist_sq = observer.position.distance_squared(position);
        let min_dist_sq = conditions.min_distance_to_observer * conditions.min_distance_to_observer;

        if self.stability_enabled && candidate.spawn_closer_during_low_stability {
            let modulation = self.modulation(observer.stability_or_default());
            let t = modulation as f32;
            let min_light = mix(0.0, conditions.min_light_level as f32, t);
            let max_light = mix(UNRESTRICTED_MAX_LIGHT, conditions.max_light_level as f32, t);
            let level = level as f32;
            if min_light > level || max_light < level {
                return false;
            }

            if modulation < 0.5 {
                return dist_sq < CLOSE_SPAWN_RADIUS * CLOSE_SPAWN_RADIUS;
            }
            return dist_sq > min_dist_sq * modulation;
        }

        if conditions.min_light_level > level || conditions.max_light_level < level {
            return false;
        }
        dist_sq > min_dist_sq
    }

    /// Picks the variant to actually spawn for `code`.
    #[must_use]
    pub fn escalate_variant<'a>(
        &self,
        ladder: &'a VariantLadder,
        code: &'a str,
        observer_stability: f64,
    ) -> &'a str {
        let stability = observer_stability.min(1.0 - f64::from(self.glitch_strength));
        if stability >= ESCALATION_THRESHOLD {
            return code;
        }
        let steps = ((ESCALATION_THRESHOLD - stability) * ESCALATION_RATE).round().max(0.0) as usize;
        ladder.climb(code, steps)
    }
}

/// Stability of a killer after slaying a creature with `recovery`.
#[must_use]
pub fn recover_on_kill(stability: f64, recovery: f64) -> f64 {
    (stability + recovery).min(1.0)
}

/// Credits `killer` with the victim's death recovery.
///
/// Observers that do not track stability are left alone.
pub fn apply_kill_recovery(killer: &mut SpawnObserver, victim: &SpawnCandidate) {
    if let Some(stability) = killer.stability.as_mut() {
        *stability = recover_on_kill(*stability, victim.on_death_stability_recovery);
    }
}
