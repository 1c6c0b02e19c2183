//! Headless simulation loop.
//!
//! Opens (or creates) the world, loads the storm session, and advances the
//! calendar in fixed real-time steps. Storm notices are logged as they
//! would be broadcast to players. The world is saved every few game days
//! and at shutdown.

use anyhow::{Context, Result};
use glam::DVec3;
use riftwatch_common::ObserverId;
use riftwatch_gameplay::{
    Calendar, EventRecorder, GameCalendar, SaveStore, StormEvent, StormSession, Storminess,
    WorldConfig, WorldSettings,
};
use riftwatch_world::WorldDimensions;
use tracing::{debug, info, warn};

use crate::config::EngineSettings;
use crate::save_store::{FileSaveStore, NewWorld};

/// Outcome of a simulation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationReport {
    /// Calendar position at shutdown
    pub final_day: f64,
    /// Storms that reached their active window
    pub storms_started: u32,
    /// Storms skipped by a calendar jump
    pub storms_skipped: u32,
    /// Notices broadcast, in order
    pub notices: Vec<String>,
    /// Whether the world was created by this run
    pub created_world: bool,
}

/// Attribute map for a world created with these settings.
///
/// An unrecognised storm setting is written as `off`.
fn initial_world_config(settings: &EngineSettings) -> WorldConfig {
    let storminess = settings.temporal_storms.as_deref().map(|value| {
        Storminess::parse(value).unwrap_or_else(|| {
            warn!("Unknown temporal_storms setting {value:?}, storms disabled");
            Storminess::Off
        })
    });
    let mut config = WorldConfig::new();
    WorldSettings {
        temporal_stability: settings.temporal_stability,
        storminess,
    }
    .write_to(&mut config);
    config
}

/// Runs the simulation described by `settings`.
pub fn run(settings: &EngineSettings) -> Result<SimulationReport> {
    let new_world = NewWorld {
        seed: settings.world_seed.unwrap_or_else(|| fastrand::u64(..)),
        play_style: settings.play_style.clone(),
        world_config: initial_world_config(settings),
    };
    let mut store = FileSaveStore::open(&settings.save_dir, &new_world)
        .with_context(|| format!("Failed to open world at {}", settings.save_dir.display()))?;

    let mut calendar = GameCalendar::at_day(store.total_days());
    calendar.set_time_scale(settings.seconds_per_game_minute);
    if settings.fast_forward_days > 0.0 {
        calendar.advance_days(settings.fast_forward_days);
        info!("Fast-forwarded to {}", calendar.format_date());
    }

    let dims = WorldDimensions::new(settings.sea_level, settings.map_height);
    let seed = store.seed();
    let mut session = StormSession::load(&mut store, seed, dims, calendar.total_days());
    let recorder = EventRecorder::new();
    session.subscribe(recorder.clone());

    let world = session.settings();
    info!(
        "World seed {seed}, stability {}, storms {}",
        world.temporal_stability,
        world.storminess.map_or("off", |s| s.as_str())
    );

    let mut report = SimulationReport {
        created_world: store.is_new(),
        ..SimulationReport::default()
    };

    if let Some(greeting) = session.first_hazard_notice(calendar.total_days()) {
        info!("{greeting}");
        report.notices.push(greeting);
    }

    // A single local observer stands in for a connected client
    let mut observer = session.observer_joined(ObserverId::new());
    let spawn_point = DVec3::new(0.0, settings.sea_level, 0.0);

    let end_day = calendar.total_days() + settings.days_to_simulate;
    let mut days_since_save = 0;
    while calendar.total_days() < end_day {
        let new_day = calendar.update(settings.step_seconds);
        session.update(settings.step_seconds, calendar.total_days());

        if observer.poll() {
            debug!(
                "Observer glitch now {:.2}, stability at spawn {:.3}",
                observer.glitch_strength(),
                session.stability_at(spawn_point)
            );
        }

        for event in recorder.drain() {
            match event {
                StormEvent::Notice(notice) => {
                    info!("[{}] {}", calendar.format_date(), notice.text);
                    report.notices.push(notice.text);
                },
                StormEvent::Started { .. } => report.storms_started += 1,
                StormEvent::Skipped { .. } => report.storms_skipped += 1,
                StormEvent::Ended { .. } | StormEvent::StateChanged(_) => {},
            }
        }

        if let Some(day) = new_day {
            days_since_save += 1;
            if settings.autosave_interval_days > 0 && days_since_save >= settings.autosave_interval_days {
                days_since_save = 0;
                save_world(&session, &mut store, &calendar)?;
                debug!("Autosaved on day {day}");
            }
        }
    }

    save_world(&session, &mut store, &calendar)?;
    report.final_day = calendar.total_days();
    info!(
        "Simulated to {} ({} storms, {} skipped)",
        calendar.format_date(),
        report.storms_started,
        report.storms_skipped
    );
    Ok(report)
}

fn save_world(session: &StormSession, store: &mut FileSaveStore, calendar: &GameCalendar) -> Result<()> {
    session.save(store).context("Failed to save storm data")?;
    store.set_total_days(calendar.total_days());
    store.flush().context("Failed to write world metadata")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings(dir: &TempDir, days: f64) -> EngineSettings {
        EngineSettings {
            world_seed: Some(2024),
            save_dir: dir.path().join("world"),
            temporal_storms: Some("veryoften".to_string()),
            days_to_simulate: days,
            ..EngineSettings::default()
        }
    }

    #[test]
    fn test_run_creates_world_and_sees_storms() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let report = run(&settings(&temp_dir, 20.0)).expect("run failed");

        assert!(report.created_world);
        assert!(report.storms_started >= 1);
        assert!(report
            .notices
            .first()
            .is_some_and(|n| n.ends_with("days until the first temporal storm.")));
        assert!(report.notices.iter().any(|n| n.contains("is imminent")));
        assert!(report.final_day >= 20.0);
        assert!(temp_dir.path().join("world/data/temporalStormData.bin").exists());
    }

    #[test]
    fn test_run_resumes_saved_world() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let first = run(&settings(&temp_dir, 2.0)).expect("first run failed");
        let second = run(&settings(&temp_dir, 2.0)).expect("second run failed");

        assert!(!second.created_world);
        assert!(second.final_day >= first.final_day + 1.9);
        assert!(!second
            .notices
            .iter()
            .any(|n| n.ends_with("days until the first temporal storm.")));

        let store = FileSaveStore::open(temp_dir.path().join("world"), &NewWorld {
            seed: 0,
            play_style: String::new(),
            world_config: WorldConfig::new(),
        })
        .expect("reopen failed");
        assert_eq!(store.seed(), 2024);
        assert!(store.world_config().contains_key("schemaVersion"));
    }

    #[test]
    fn test_disabled_world_stays_quiet() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let settings = EngineSettings {
            temporal_stability: false,
            ..settings(&temp_dir, 10.0)
        };
        let report = run(&settings).expect("run failed");
        assert_eq!(report.storms_started, 0);
        assert!(report.notices.is_empty());
    }

    #[test]
    fn test_fast_forward_skips_pending_storm() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let first = run(&settings(&temp_dir, 0.5)).expect("first run failed");

        let jump = EngineSettings {
            fast_forward_days: 200.0,
            ..settings(&temp_dir, 0.5)
        };
        let second = run(&jump).expect("second run failed");

        assert!(second.final_day >= first.final_day + 200.0);
        assert!(second.storms_skipped >= 1);
    }

    #[test]
    fn test_unknown_storm_setting_disables_storms() {
        let settings = EngineSettings {
            temporal_storms: Some("hurricane".to_string()),
            ..EngineSettings::default()
        };
        let config = initial_world_config(&settings);
        assert_eq!(config.get("temporalStorms"), Some(&serde_json::json!("off")));
        assert_eq!(config.get("temporalStability"), Some(&serde_json::json!(true)));
    }
}
