//! # Riftwatch Gameplay
//!
//! Temporal storm systems for a persistent world.
//!
//! This crate handles:
//! - Storm scheduling with severity that escalates as the world ages
//! - The storm lifecycle state machine and its notifications
//! - Replication of the authoritative state to observers
//! - Persistence and world-config migration
//! - Spawn modulation under low stability
//!
//! A [`StormSession`] bundles all of it for one loaded world.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod calendar;
pub mod events;
pub mod lifecycle;
pub mod migration;
pub mod persistence;
pub mod replication;
pub mod scheduler;
pub mod session;
pub mod severity;
pub mod spawn;
pub mod storm_state;
pub mod world_config;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::calendar::*;
    pub use crate::events::*;
    pub use crate::lifecycle::*;
    pub use crate::migration::*;
    pub use crate::persistence::*;
    pub use crate::replication::*;
    pub use crate::scheduler::*;
    pub use crate::session::*;
    pub use crate::severity::*;
    pub use crate::spawn::*;
    pub use crate::storm_state::*;
    pub use crate::world_config::*;
}

pub use prelude::*;
