//! Record identifiers.
//!
//! Record IDs are 128-bit opaque values, unique per record within a
//! collection and stable for the record's lifetime. They are generated from
//! UUIDs and displayed/serialized as bs58check (base58 with checksum).

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur with record IDs.
#[derive(Error, Debug)]
pub enum RecordIdError {
    #[error("Invalid bs58check encoding: {0}")]
    InvalidEncoding(String),

    #[error("Invalid record ID length: expected 16 bytes, got {0}")]
    InvalidLength(usize),
}

/// A 128-bit record identifier.
///
/// Internally stores 16 raw bytes, but displays and serializes as a
/// bs58check-encoded string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId([u8; 16]);

impl RecordId {
    /// Generate a new random record ID.
    pub fn new() -> Self {
        let uuid = Uuid::new_v4();
        Self(*uuid.as_bytes())
    }

    /// Create a record ID from raw bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Encode as bs58check string.
    pub fn to_bs58check(&self) -> String {
        bs58::encode(&self.0).with_check().into_string()
    }

    /// Decode from bs58check string.
    pub fn from_bs58check(s: &str) -> Result<Self, RecordIdError> {
        let bytes = bs58::decode(s)
            .with_check(None)
            .into_vec()
            .map_err(|e| RecordIdError::InvalidEncoding(e.to_string()))?;

        if bytes.len() != 16 {
            return Err(RecordIdError::InvalidLength(bytes.len()));
        }

        let mut arr = [0u8; 16];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_bs58check())
    }
}

impl Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_bs58check())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_bs58check(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(*uuid.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_id() {
        let id1 = RecordId::new();
        let id2 = RecordId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_bs58check_roundtrip() {
        let id = RecordId::new();
        let encoded = id.to_bs58check();
        let decoded = RecordId::from_bs58check(&encoded).unwrap();
        assert_eq!(id, decoded);
    }

    #[test]
    fn test_invalid_bs58check() {
        let result = RecordId::from_bs58check("invalid");
        assert!(result.is_err());
    }

    #[test]
    fn test_display_matches_encoding() {
        let id = RecordId::new();
        assert_eq!(format!("{}", id), id.to_bs58check());
    }

    #[test]
    fn test_serialization() {
        let id = RecordId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn test_ordering_is_byte_order() {
        let a = RecordId::from_bytes([0u8; 16]);
        let b = RecordId::from_bytes([1u8; 16]);
        assert!(a < b);
    }
}
