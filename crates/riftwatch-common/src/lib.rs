//! # Riftwatch Common
//!
//! Common types, utilities, and shared abstractions for Riftwatch.
//!
//! This crate provides foundational types used across all Riftwatch subsystems:
//! - Block and world position types
//! - Observer identifiers for replication
//! - Schema versions and magic bytes for persisted blobs
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;
