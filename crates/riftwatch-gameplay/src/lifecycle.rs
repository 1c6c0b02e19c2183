//! Storm lifecycle state machine.
//!
//! The authority runs [`StormController::tick`] periodically. Every decision
//! is a comparison of day deltas against the calendar, so the outcome does
//! not depend on how often the tick runs, only on where the calendar is.
//!
//! ```text
//! Dormant -> Approaching -> Imminent -> Active -> Waning -> Dormant
//!    |                                                        ^
//!    +------------- fast-forward past the whole storm --------+
//! ```

use riftwatch_common::ObserverId;
use tracing::{debug, info};

use crate::events::{NoticeKind, StormEvent, StormListener, StormNotice};
use crate::replication::{ReplicationHub, StormObserver};
use crate::scheduler;
use crate::severity::SeverityConfig;
use crate::storm_state::{NotifyStage, RuntimeState};

/// Upper bound (exclusive) of days-to-start for the approaching notice.
pub const APPROACHING_WINDOW: f64 = 0.35;
/// Lower bound (exclusive) of days-to-start for the approaching notice.
pub const APPROACHING_CUTOFF: f64 = 0.03;
/// Days-to-start at or below which the imminent notice fires.
pub const IMMINENT_WINDOW: f64 = 0.02;
/// Remaining active days below which the waning notice fires.
pub const WANING_WINDOW: f64 = 0.03;

/// Authority-side owner of the storm state.
pub struct StormController {
    state: RuntimeState,
    config: Option<SeverityConfig>,
    rng: fastrand::Rng,
    listeners: Vec<Box<dyn StormListener>>,
    hub: ReplicationHub,
}

impl std::fmt::Debug for StormController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StormController")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("listeners", &self.listeners.len())
            .field("hub", &self.hub)
            .finish_non_exhaustive()
    }
}

impl StormController {
    /// Creates a controller around an existing state.
    ///
    /// `config` is `None` when storms are disabled for the world. A storm
    /// saved while still active is then ended, and the controller never
    /// changes the state again.
    #[must_use]
    pub fn new(config: Option<SeverityConfig>, state: RuntimeState, seed: u64) -> Self {
        let state = if config.is_none() && state.active {
            info!("Temporal storms are disabled, ending the storm in progress");
            RuntimeState {
                active: false,
                glitch_strength: 0.0,
                notify_stage: NotifyStage::None,
                ..state
            }
        } else {
            state
        };
        Self {
            state,
            config,
            rng: fastrand::Rng::with_seed(seed),
            listeners: Vec::new(),
            hub: ReplicationHub::default(),
        }
    }

    /// Replaces the replication hub, e.g. to change the queue length.
    #[must_use]
    pub fn with_hub(mut self, hub: ReplicationHub) -> Self {
        self.hub = hub;
        self
    }

    /// Current authoritative state.
    #[must_use]
    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    /// Active schedule, if storms are enabled.
    #[must_use]
    pub fn config(&self) -> Option<&SeverityConfig> {
        self.config.as_ref()
    }

    /// Whether storms are enabled for this world.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Registers a listener. Listeners run in registration order.
    pub fn subscribe(&mut self, listener: impl StormListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Connects an observer and sends it the current state.
    pub fn join_observer(&mut self, id: ObserverId) -> StormObserver {
        let observer = self.hub.connect(id);
        self.hub.send_to(id, &self.state);
        observer
    }

    /// Disconnects an observer.
    pub fn leave_observer(&mut self, id: ObserverId) -> bool {
        self.hub.disconnect(id)
    }

    /// Number of connected observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.hub.observer_count()
    }

    /// Days until the scheduled storm starts.
    #[must_use]
    pub fn days_until_next_hazard(&self, current_day: f64) -> f64 {
        self.state.days_to_start(current_day)
    }

    /// Schedules the first storm of a fresh state.
    pub fn prepare_initial(&mut self, current_day: f64) {
        if let Some(config) = self.config {
            self.state = scheduler::prepare_next(&self.state, &config, current_day, &mut self.rng);
            info!(
                "First temporal storm scheduled for day {:.2}",
                self.state.next_start_day
            );
        }
    }

    /// Advances the lifecycle to `current_day`.
    pub fn tick(&mut self, current_day: f64) {
        let Some(config) = self.config else {
            return;
        };

        let days_left = self.state.days_to_start(current_day);

        if !self.state.active
            && days_left > APPROACHING_CUTOFF
            && days_left < APPROACHING_WINDOW
            && self.state.notify_stage < NotifyStage::Approaching
        {
            self.notify(NotifyStage::Approaching, NoticeKind::Approaching);
        }

        if !self.state.active
            && days_left <= IMMINENT_WINDOW
            && self.state.notify_stage < NotifyStage::Imminent
        {
            self.notify(NotifyStage::Imminent, NoticeKind::Imminent);
        }

        if days_left > 0.0 {
            return;
        }

        if !self.state.active {
            // Jumped past the whole active window
            if days_left + self.state.active_duration() < 0.0 {
                self.skip(&config, current_day);
                return;
            }
            self.activate(current_day);
        }

        let active_left = self.state.active_until_day - current_day;
        if active_left < WANING_WINDOW && self.state.notify_stage == NotifyStage::Imminent {
            self.notify(NotifyStage::Waning, NoticeKind::Waning);
        }

        if active_left < 0.0 {
            self.deactivate(&config, current_day);
        }
    }

    fn notify(&mut self, stage: NotifyStage, kind: NoticeKind) {
        self.state.notify_stage = stage;
        let notice = StormNotice::new(kind, self.state.next_severity_tier);
        info!("{}", notice.text);
        self.emit(&StormEvent::Notice(notice));
    }

    fn activate(&mut self, current_day: f64) {
        let tier = self.state.next_severity_tier;
        self.state.active = true;
        self.state.active_until_day = current_day + self.state.active_duration();
        self.state.glitch_strength = tier.glitch_strength();
        info!(
            "{} temporal storm started, lasting until day {:.2}",
            tier.display_name(),
            self.state.active_until_day
        );
        self.replicate();
        self.emit(&StormEvent::Started {
            tier,
            until_day: self.state.active_until_day,
        });
    }

    fn deactivate(&mut self, config: &SeverityConfig, current_day: f64) {
        self.state.active = false;
        self.state.glitch_strength = 0.0;
        self.state.notify_stage = NotifyStage::None;
        self.state = scheduler::prepare_next(&self.state, config, current_day, &mut self.rng);
        info!(
            "Temporal storm ended, next on day {:.2}",
            self.state.next_start_day
        );
        self.replicate();
        self.emit(&StormEvent::Ended {
            next_start_day: self.state.next_start_day,
        });
    }

    fn skip(&mut self, config: &SeverityConfig, current_day: f64) {
        debug!(
            "Calendar jumped past the storm due on day {:.2}, skipping it",
            self.state.next_start_day
        );
        self.state.notify_stage = NotifyStage::None;
        self.state = scheduler::prepare_next(&self.state, config, current_day, &mut self.rng);
        self.replicate();
        self.emit(&StormEvent::Skipped {
            next_start_day: self.state.next_start_day,
        });
    }

    fn replicate(&mut self) {
        let delivered = self.hub.broadcast(&self.state);
        debug!("Storm state replicated to {delivered} observers");
        self.emit(&StormEvent::StateChanged(self.state));
    }

    fn emit(&mut self, event: &StormEvent) {
        for listener in &mut self.listeners {
            listener.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventRecorder;
    use crate::severity::{SeverityTier, Storminess};

    fn controller(setting: Storminess) -> (StormController, EventRecorder) {
        let recorder = EventRecorder::new();
        let mut controller = StormController::new(setting.config(), RuntimeState::new(), 42);
        controller.subscribe(recorder.clone());
        (controller, recorder)
    }

    fn notice_kinds(events: &[StormEvent]) -> Vec<NoticeKind> {
        events
            .iter()
            .filter_map(StormEvent::as_notice)
            .map(|n| n.kind)
            .collect()
    }

    #[test]
    fn test_full_cycle() {
        let (mut controller, recorder) = controller(Storminess::Sometimes);
        let base = 10.0;
        controller.state.next_start_day = base + 0.4;
        let start = controller.state.next_start_day;

        let mut was_active = false;
        for k in 0..100 {
            let now = base + 0.05 * f64::from(k);
            controller.tick(now);
            assert!(controller.state().is_consistent());
            if controller.state().active {
                was_active = true;
                assert!((controller.state().glitch_strength - 0.58).abs() < f32::EPSILON);
            } else if was_active {
                break;
            }
        }

        assert!(was_active);
        let events = recorder.drain();
        assert_eq!(
            notice_kinds(&events),
            vec![NoticeKind::Approaching, NoticeKind::Imminent, NoticeKind::Waning]
        );
        assert_eq!(
            events.iter().filter(|e| matches!(e, StormEvent::Started { .. })).count(),
            1
        );
        assert_eq!(
            events.iter().filter(|e| matches!(e, StormEvent::Ended { .. })).count(),
            1
        );

        let state = controller.state();
        assert!(!state.active);
        assert_eq!(state.notify_stage, NotifyStage::None);
        assert!(state.glitch_strength.abs() < f32::EPSILON);
        assert!(state.next_start_day > start);
    }

    #[test]
    fn test_fast_forward_skips_storm() {
        let (mut controller, recorder) = controller(Storminess::Often);
        controller.state.next_start_day = 5.0;

        controller.tick(4.5);
        controller.tick(9.0);

        let state = controller.state();
        assert!(!state.active);
        assert!(state.next_start_day > 9.0);
        assert_eq!(state.notify_stage, NotifyStage::None);

        let events = recorder.drain();
        assert_eq!(notice_kinds(&events), vec![NoticeKind::Imminent]);
        assert!(events.iter().any(|e| matches!(e, StormEvent::Skipped { .. })));
        assert!(!events.iter().any(|e| matches!(e, StormEvent::Started { .. })));
    }

    #[test]
    fn test_jump_past_active_storm_wanes_then_ends() {
        let (mut controller, recorder) = controller(Storminess::Sometimes);
        controller.state.next_start_day = 5.0;
        controller.tick(5.0);
        assert!(controller.state().active);
        recorder.drain();

        controller.tick(50.0);

        let events = recorder.drain();
        assert_eq!(notice_kinds(&events), vec![NoticeKind::Waning]);
        assert_eq!(
            events.iter().filter(|e| matches!(e, StormEvent::Ended { .. })).count(),
            1
        );
        let state = controller.state();
        assert!(!state.active);
        assert!(state.glitch_strength.abs() < f32::EPSILON);
        assert_eq!(state.notify_stage, NotifyStage::None);
        assert!(state.next_start_day > 50.0);
    }

    fn run_cycle(controller: &mut StormController, base: f64) -> f64 {
        controller.state.next_start_day = base + 0.4;
        let mut was_active = false;
        for k in 0..100 {
            let now = base + 0.05 * f64::from(k);
            controller.tick(now);
            if controller.state().active {
                was_active = true;
            } else if was_active {
                return now;
            }
        }
        panic!("storm starting at day {} never ended", base + 0.4);
    }

    #[test]
    fn test_notices_repeat_each_cycle() {
        let (mut controller, recorder) = controller(Storminess::Often);
        let first_end = run_cycle(&mut controller, 10.0);
        run_cycle(&mut controller, first_end + 1.0);

        let events = recorder.drain();
        let cycle = [NoticeKind::Approaching, NoticeKind::Imminent, NoticeKind::Waning];
        assert_eq!(notice_kinds(&events), [cycle, cycle].concat());
        assert_eq!(
            events.iter().filter(|e| matches!(e, StormEvent::Started { .. })).count(),
            2
        );
        assert_eq!(
            events.iter().filter(|e| matches!(e, StormEvent::Ended { .. })).count(),
            2
        );
    }

    #[test]
    fn test_disabled_controller_is_inert() {
        let (mut controller, recorder) = controller(Storminess::Off);
        let before = *controller.state();
        controller.prepare_initial(0.0);
        for day in 0..50 {
            controller.tick(f64::from(day));
        }
        assert_eq!(*controller.state(), before);
        assert_eq!(recorder.pending_count(), 0);
        assert!(!controller.is_enabled());
    }

    #[test]
    fn test_disabling_storms_ends_active_storm() {
        let state = RuntimeState {
            active: true,
            glitch_strength: 1.0,
            notify_stage: NotifyStage::Imminent,
            active_until_day: 12.3,
            next_start_day: 12.1,
            ..RuntimeState::new()
        };
        let mut controller = StormController::new(None, state, 42);
        for day in 12..112 {
            controller.tick(f64::from(day));
        }
        let state = controller.state();
        assert!(!state.active);
        assert!(state.glitch_strength.abs() < f32::EPSILON);
        assert_eq!(state.notify_stage, NotifyStage::None);
        assert!(state.is_consistent());
    }

    #[test]
    fn test_repeated_tick_is_idempotent() {
        let (mut controller, recorder) = controller(Storminess::Sometimes);
        controller.state.next_start_day = 5.0;
        for _ in 0..10 {
            controller.tick(4.8);
        }
        assert_eq!(notice_kinds(&recorder.drain()), vec![NoticeKind::Approaching]);
        for _ in 0..10 {
            controller.tick(5.0);
        }
        let events = recorder.drain();
        assert_eq!(notice_kinds(&events), vec![NoticeKind::Imminent]);
        assert_eq!(
            events.iter().filter(|e| matches!(e, StormEvent::Started { .. })).count(),
            1
        );
        assert!(controller.state().active);
    }

    #[test]
    fn test_heavy_tier_glitch() {
        let (mut controller, _recorder) = controller(Storminess::VeryOften);
        controller.state.next_start_day = 3.0;
        controller.state.next_severity_tier = SeverityTier::Heavy;
        controller.tick(3.0);
        assert!(controller.state().active);
        assert!((controller.state().glitch_strength - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_observer_receives_transitions() {
        let (mut controller, _recorder) = controller(Storminess::Sometimes);
        controller.state.next_start_day = 2.0;
        let id = ObserverId::new();
        let mut observer = controller.join_observer(id);
        assert!(observer.poll());
        assert!(!observer.state().is_some_and(|s| s.active));

        controller.tick(2.0);
        assert!(observer.poll());
        assert!(observer.state().is_some_and(|s| s.active));

        assert!(controller.leave_observer(id));
        assert_eq!(controller.observer_count(), 0);
    }

    #[test]
    fn test_prepare_initial_schedules_in_future() {
        let (mut controller, _recorder) = controller(Storminess::Rare);
        controller.prepare_initial(0.25);
        let days = controller.days_until_next_hazard(0.25);
        assert!((19.9..30.0).contains(&days));
    }
}
