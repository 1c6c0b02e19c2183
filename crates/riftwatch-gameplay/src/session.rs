//! Per-world storm context.
//!
//! A [`StormSession`] is created when a world loads and dropped when it
//! unloads. It owns everything the storm systems need for that world, so
//! nothing lives in globals.

use std::sync::Arc;

use glam::DVec3;
use riftwatch_common::ObserverId;
use riftwatch_world::{StabilityField, StabilitySnapshot, WorldDimensions};
use tracing::{info, warn};

use crate::events::StormListener;
use crate::lifecycle::StormController;
use crate::migration::{MigrationContext, MigrationRegistry};
use crate::persistence::{self, PersistenceResult, SaveStore};
use crate::replication::StormObserver;
use crate::scheduler;
use crate::spawn::{
    apply_kill_recovery, LightLevelSource, SpawnCandidate, SpawnConditions, SpawnModulator,
    SpawnObserver, VariantLadder,
};
use crate::storm_state::RuntimeState;
use crate::world_config::WorldSettings;

/// Real seconds between lifecycle ticks.
pub const TICK_INTERVAL_SECONDS: f32 = 2.0;

/// Fixed-period tick driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickTimer {
    interval: f32,
    accumulated: f32,
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new(TICK_INTERVAL_SECONDS)
    }
}

impl TickTimer {
    /// Creates a timer firing every `interval` real seconds.
    #[must_use]
    pub fn new(interval: f32) -> Self {
        Self {
            interval: interval.max(f32::EPSILON),
            accumulated: 0.0,
        }
    }

    /// Advances by real elapsed seconds. Returns whether a tick is due.
    ///
    /// Several overdue periods collapse into a single tick.
    pub fn update(&mut self, dt_real_seconds: f32) -> bool {
        if dt_real_seconds.is_finite() && dt_real_seconds > 0.0 {
            self.accumulated += dt_real_seconds;
        }
        if self.accumulated < self.interval {
            return false;
        }
        self.accumulated %= self.interval;
        true
    }

    /// Tick period in real seconds.
    #[must_use]
    pub fn interval(&self) -> f32 {
        self.interval
    }
}

/// Storm systems of one loaded world.
pub struct StormSession {
    settings: WorldSettings,
    field: Arc<StabilityField>,
    controller: StormController,
    timer: TickTimer,
    ladder: VariantLadder,
    is_new_world: bool,
}

impl std::fmt::Debug for StormSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StormSession")
            .field("settings", &self.settings)
            .field("controller", &self.controller)
            .field("is_new_world", &self.is_new_world)
            .finish_non_exhaustive()
    }
}

impl StormSession {
    /// Loads the storm systems for a world.
    ///
    /// Migrates legacy world configs, restores the persisted state and
    /// schedules the first storm when needed. Never fails: unreadable data
    /// is logged and replaced by a fresh state.
    pub fn load(store: &mut dyn SaveStore, seed: u64, dims: WorldDimensions, current_day: f64) -> Self {
        let play_style = store.play_style().to_string();
        let context = MigrationContext {
            play_style: &play_style,
        };
        if let Err(e) = MigrationRegistry::default().migrate(store.world_config_mut(), &context) {
            warn!("World config migration failed: {e}");
        }

        let settings = WorldSettings::from_config(store.world_config());
        let field = Arc::new(StabilityField::from_seed(seed, dims, settings.temporal_stability));

        let outcome = persistence::load(store);
        let mut controller = StormController::new(
            settings.severity_config(),
            outcome.state,
            scheduler::rng_seed(seed, current_day),
        );
        if outcome.needs_schedule {
            controller.prepare_initial(current_day);
        }

        info!(
            "Storm session loaded: stability {}, storms {}",
            if settings.temporal_stability { "on" } else { "off" },
            settings.storminess.map_or("unset", |s| s.as_str())
        );

        Self {
            settings,
            field,
            controller,
            timer: TickTimer::default(),
            ladder: VariantLadder::default(),
            is_new_world: store.is_new(),
        }
    }

    /// Replaces the variant ladder used for escalation.
    #[must_use]
    pub fn with_variant_ladder(mut self, ladder: VariantLadder) -> Self {
        self.ladder = ladder;
        self
    }

    /// World settings in effect.
    #[must_use]
    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    /// Current storm state.
    #[must_use]
    pub fn state(&self) -> &RuntimeState {
        self.controller.state()
    }

    /// The lifecycle controller.
    #[must_use]
    pub fn controller(&self) -> &StormController {
        &self.controller
    }

    /// Registers a storm event listener.
    pub fn subscribe(&mut self, listener: impl StormListener + 'static) {
        self.controller.subscribe(listener);
    }

    /// Feeds real elapsed time and ticks the lifecycle on the fixed period.
    ///
    /// Returns whether a tick ran.
    pub fn update(&mut self, dt_real_seconds: f32, current_day: f64) -> bool {
        if !self.timer.update(dt_real_seconds) {
            return false;
        }
        self.controller.tick(current_day);
        true
    }

    /// Ticks the lifecycle immediately.
    pub fn tick(&mut self, current_day: f64) {
        self.controller.tick(current_day);
    }

    /// Persists the storm state.
    pub fn save(&self, store: &mut dyn SaveStore) -> PersistenceResult<()> {
        persistence::save(store, self.controller.state())
    }

    /// Connects an observer and sends it the current state.
    pub fn observer_joined(&mut self, id: ObserverId) -> StormObserver {
        self.controller.join_observer(id)
    }

    /// Disconnects an observer.
    pub fn observer_left(&mut self, id: ObserverId) -> bool {
        self.controller.leave_observer(id)
    }

    /// Greeting for players of a freshly created world with storms enabled.
    #[must_use]
    pub fn first_hazard_notice(&self, current_day: f64) -> Option<String> {
        if !self.is_new_world || !self.controller.is_enabled() {
            return None;
        }
        let days = self.controller.days_until_next_hazard(current_day).max(0.0) as u64;
        Some(format!("{days} days until the first temporal storm."))
    }

    /// Stability at a position under the current storm.
    #[must_use]
    pub fn stability_at(&self, pos: DVec3) -> f32 {
        self.field.stability(pos, self.controller.state().glitch_strength)
    }

    /// Thread-safe view of the field at the current glitch strength.
    #[must_use]
    pub fn snapshot(&self) -> StabilitySnapshot {
        StabilitySnapshot::new(
            Arc::clone(&self.field),
            self.controller.state().glitch_strength,
        )
    }

    /// Spawn rules under the current storm.
    #[must_use]
    pub fn spawn_modulator(&self) -> SpawnModulator {
        SpawnModulator::new(
            self.settings.temporal_stability,
            self.controller.state().glitch_strength,
        )
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
        self.spawn_modulator()
            .can_spawn_nearby(observer, candidate, position, conditions, light)
    }

    /// Variant to spawn in place of `code` near an observer.
    #[must_use]
    pub fn escalate_variant<'a>(&'a self, code: &'a str, observer_stability: f64) -> &'a str {
        if !self.settings.temporal_stability {
            return code;
        }
        self.spawn_modulator()
            .escalate_variant(&self.ladder, code, observer_stability)
    }

    /// Credits a killer with its victim's stability recovery.
    pub fn on_kill(&self, killer: &mut SpawnObserver, victim: &SpawnCandidate) {
        if self.settings.temporal_stability {
            apply_kill_recovery(killer, victim);
        }
    }
}
