//! Version types for schema compatibility.

use serde::{Deserialize, Serialize};

use crate::error::{RiftError, RiftResult};

/// Schema version using semantic versioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version (breaking changes)
    pub major: u16,
    /// Minor version (backwards-compatible additions)
    pub minor: u16,
    /// Patch version (bug fixes)
    pub patch: u16,
}

impl SchemaVersion {
    /// Creates a new schema version.
    #[must_use]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Current persisted storm blob version.
    pub const STORM_SAVE: Self = Self::new(1, 0, 0);

    /// Current replication protocol version.
    pub const STORM_PROTOCOL: Self = Self::new(1, 0, 0);

    /// Checks if this version can read data from another version.
    #[must_use]
    pub const fn can_read(&self, data_version: &Self) -> bool {
        self.major == data_version.major
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Magic bytes for format identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicBytes(pub [u8; 4]);

impl MagicBytes {
    /// Persisted storm state blob.
    pub const STORM_SAVE: Self = Self(*b"RWST");

    /// Replicated storm state packet.
    pub const STORM_PACKET: Self = Self(*b"RWSP");

    /// Prepends these magic bytes to a payload.
    #[must_use]
    pub fn wrap(self, payload: &[u8]) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(payload.len() + 4);
        buffer.extend_from_slice(&self.0);
        buffer.extend_from_slice(payload);
        buffer
    }

    /// Strips these magic bytes from the front of `bytes`.
    pub fn strip(self, bytes: &[u8]) -> RiftResult<&[u8]> {
        if bytes.len() < 4 || bytes[0..4] != self.0 {
            return Err(RiftError::BadMagic { expected: self.0 });
        }
        Ok(&bytes[4..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_wrap_strip() {
        let wrapped = MagicBytes::STORM_SAVE.wrap(&[1, 2, 3]);
        assert_eq!(&wrapped[..4], b"RWST");
        let body = MagicBytes::STORM_SAVE.strip(&wrapped).expect("strip failed");
        assert_eq!(body, &[1, 2, 3]);
    }

    #[test]
    fn test_magic_rejects_other_format() {
        let wrapped = MagicBytes::STORM_PACKET.wrap(&[9]);
        assert!(MagicBytes::STORM_SAVE.strip(&wrapped).is_err());
        assert!(MagicBytes::STORM_SAVE.strip(&[1, 2]).is_err());
    }

    #[test]
    fn test_can_read_same_major_only() {
        let current = SchemaVersion::new(1, 2, 0);
        assert!(current.can_read(&SchemaVersion::new(1, 0, 0)));
        assert!(current.can_read(&SchemaVersion::new(1, 5, 3)));
        assert!(!current.can_read(&SchemaVersion::new(2, 0, 0)));
    }

    #[test]
    fn test_magic_error_names_expected_format() {
        let err = MagicBytes::STORM_SAVE.strip(b"nope").err();
        assert!(matches!(err, Some(RiftError::BadMagic { expected }) if &expected == b"RWST"));
    }

    #[test]
    fn test_version_display() {
        assert_eq!(SchemaVersion::new(1, 2, 3).to_string(), "1.2.3");
    }
}
