//! Storm scheduling.
//!
//! The escalation term grows linearly with world age until it reaches the
//! configured cap. A higher term shortens the wait for the next storm and
//! makes heavier storms more likely.

use tracing::debug;

use crate::severity::{SeverityConfig, SeverityTier};
use crate::storm_state::RuntimeState;

/// Escalation term for a world of the given age.
///
/// Negative days count as day zero.
#[must_use]
pub fn escalation_term(config: &SeverityConfig, current_day: f64) -> f64 {
    let day = current_day.max(0.0);
    let mean = config.frequency.mean.max(f64::EPSILON);
    (config.escalation_increment * day / mean).min(config.escalation_cap)
}

/// Seed for the scheduling RNG of a world loaded at `current_day`.
///
/// Worlds reloaded at different days draw different schedules, so restarts
/// between storms do not replay the same wait and severity.
#[must_use]
pub fn rng_seed(world_seed: u64, current_day: f64) -> u64 {
    let day_bits = current_day.max(0.0).to_bits();
    (world_seed ^ day_bits.rotate_left(29)).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Picks a severity tier from the escalation term and two uniform draws.
///
/// The product of two uniforms skews low, so heavy storms stay rare until
/// the escalation term itself approaches 2.
#[must_use]
pub fn severity_from(term: f64, r1: f64, r2: f64) -> SeverityTier {
    let strength = term + (r1 * r2) * term * 5.0;
    SeverityTier::from_index(strength.clamp(0.0, 2.0).floor() as u32)
}

/// Computes the next storm from the state at `current_day`.
///
/// Only the scheduling fields change; the rest of the state is carried over.
#[must_use]
pub fn prepare_next(
    state: &RuntimeState,
    config: &SeverityConfig,
    current_day: f64,
    rng: &mut fastrand::Rng,
) -> RuntimeState {
    let day = current_day.max(0.0);
    let term = escalation_term(config, day);

    let wait = config.frequency.sample(rng).max(f64::EPSILON);
    let next_start_day = day + wait / (1.0 + term / 3.0);

    let tier = severity_from(term, rng.f64(), rng.f64());

    debug!(
        "Next storm scheduled: day {next_start_day:.2} ({}), escalation {term:.3}",
        tier.display_name()
    );

    RuntimeState {
        next_start_day,
        next_severity_tier: tier,
        next_escalation_term: term,
        ..*state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::Storminess;
    use proptest::prelude::*;

    fn config(setting: Storminess) -> SeverityConfig {
        setting.config().expect("setting schedules storms")
    }

    #[test]
    fn test_new_world_starts_light() {
        let mut rng = fastrand::Rng::with_seed(1);
        let state = prepare_next(&RuntimeState::new(), &config(Storminess::Sometimes), 0.0, &mut rng);
        assert_eq!(state.next_severity_tier, SeverityTier::Light);
        assert!(state.next_escalation_term.abs() < f64::EPSILON);
        assert!((10.0..20.0).contains(&state.next_start_day));
    }

    #[test]
    fn test_escalation_capped() {
        let cfg = config(Storminess::Often);
        assert!((escalation_term(&cfg, 1e6) - cfg.escalation_cap).abs() < f64::EPSILON);
        assert!(escalation_term(&cfg, -10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_escalation_compresses_interval() {
        let cfg = config(Storminess::VeryOften);
        let mut early = fastrand::Rng::with_seed(9);
        let mut late = fastrand::Rng::with_seed(9);
        let a = prepare_next(&RuntimeState::new(), &cfg, 0.0, &mut early);
        let b = prepare_next(&RuntimeState::new(), &cfg, 1000.0, &mut late);
        // Same draws, but the capped term (2.0) divides the wait by 5/3
        let wait_early = a.next_start_day;
        let wait_late = b.next_start_day - 1000.0;
        assert!((wait_late - wait_early / (1.0 + 2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_rng_seed_depends_on_load_day() {
        assert_eq!(rng_seed(7, 40.0), rng_seed(7, 40.0));
        assert_ne!(rng_seed(7, 40.0), rng_seed(7, 73.0));
        assert_ne!(rng_seed(7, 40.0), rng_seed(8, 40.0));
        assert_eq!(rng_seed(7, -3.0), rng_seed(7, 0.0));
    }

    #[test]
    fn test_severity_from_bias() {
        assert_eq!(severity_from(0.0, 1.0, 1.0), SeverityTier::Light);
        assert_eq!(severity_from(0.5, 0.0, 0.0), SeverityTier::Light);
        assert_eq!(severity_from(0.5, 0.5, 0.5), SeverityTier::Medium);
        assert_eq!(severity_from(2.0, 0.0, 0.0), SeverityTier::Heavy);
        assert_eq!(severity_from(1.0, 1.0, 1.0), SeverityTier::Heavy);
    }

    #[test]
    fn test_prepare_next_preserves_activity_fields() {
        let mut rng = fastrand::Rng::with_seed(3);
        let state = RuntimeState {
            active: true,
            glitch_strength: 0.7,
            active_until_day: 12.0,
            ..RuntimeState::new()
        };
        let next = prepare_next(&state, &config(Storminess::Rare), 11.9, &mut rng);
        assert!(next.active);
        assert!((next.glitch_strength - 0.7).abs() < f32::EPSILON);
        assert!((next.active_until_day - 12.0).abs() < f64::EPSILON);
    }

    fn any_setting() -> impl Strategy<Value = Storminess> {
        prop::sample::select(Storminess::enabled().to_vec())
    }

    proptest! {
        #[test]
        fn prop_next_start_in_future(setting in any_setting(), day in 0f64..100_000.0, seed in any::<u64>()) {
            let mut rng = fastrand::Rng::with_seed(seed);
            let next = prepare_next(&RuntimeState::new(), &config(setting), day, &mut rng);
            prop_assert!(next.next_start_day > day);
        }

        #[test]
        fn prop_escalation_non_decreasing_and_capped(setting in any_setting(), days in prop::collection::vec(0f64..5_000.0, 1..40), seed in any::<u64>()) {
            let cfg = config(setting);
            let mut days = days;
            days.sort_by(f64::total_cmp);
            let mut rng = fastrand::Rng::with_seed(seed);
            let mut state = RuntimeState::new();
            let mut previous = 0.0;
            for day in days {
                state = prepare_next(&state, &cfg, day, &mut rng);
                prop_assert!(state.next_escalation_term >= previous);
                prop_assert!(state.next_escalation_term <= cfg.escalation_cap);
                previous = state.next_escalation_term;
            }
        }
    }
}
