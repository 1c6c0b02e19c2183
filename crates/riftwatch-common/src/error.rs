//! Error types for Riftwatch.

use thiserror::Error;

/// Errors shared by the persisted and replicated storm formats.
#[derive(Debug, Error)]
pub enum RiftError {
    /// Magic bytes did not identify a known format
    #[error("Unrecognised format: expected {expected:?}")]
    BadMagic {
        /// Expected magic bytes
        expected: [u8; 4],
    },
}

/// Result type alias for Riftwatch operations.
pub type RiftResult<T> = Result<T, RiftError>;
