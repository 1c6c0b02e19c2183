//! # Riftwatch
//!
//! Headless world authority for the temporal storm systems.
//!
//! Usage: `riftwatch [settings.toml | --init]`
//!
//! This binary ties together:
//! - World: the stability field
//! - Gameplay: storm scheduling, lifecycle, replication and persistence
//! - A file-backed world save and a fixed-step simulation loop

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;
mod save_store;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

use crate::config::{EngineSettings, DEFAULT_LOG_FILTER, SETTINGS_FILE};

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing before settings are read so load warnings are shown
    let (filter, filter_handle) = reload::Layer::new(
        EnvFilter::from_default_env().add_directive(DEFAULT_LOG_FILTER.parse()?),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let settings = match std::env::args().nth(1).as_deref() {
        Some("--init") => {
            let settings = EngineSettings::default();
            settings.save_to(SETTINGS_FILE)?;
            settings
        },
        Some(path) => EngineSettings::load_from(path),
        None => EngineSettings::load(),
    };

    filter_handle
        .reload(EnvFilter::from_default_env().add_directive(settings.log_filter.parse()?))?;

    info!("Riftwatch starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let report = app::run(&settings)?;

    info!(
        "Riftwatch shutdown complete on day {:.2} ({} notices{})",
        report.final_day,
        report.notices.len(),
        if report.created_world { ", new world" } else { "" }
    );
    Ok(())
}
