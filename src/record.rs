//! Record value types: per-item metadata and the described record itself.

use serde::{Deserialize, Serialize};

use crate::context::ContentHash;
use crate::record_id::RecordId;

/// Metadata describing one record.
///
/// `hash` always equals the content hash of the encoded payload as of the
/// last successful mutation, and `updated >= created`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    /// Creation time, epoch milliseconds.
    pub created: i64,
    /// Last mutation time, epoch milliseconds.
    pub updated: i64,
    /// Content hash of the encoded payload.
    pub hash: ContentHash,
}

/// A record: identifier, metadata, and payload.
///
/// Immutable value; any change produces a new record with a new
/// `updated`/`hash`/payload and the same `id` and `created`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: RecordId,
    pub info: ItemInfo,
    pub payload: T,
}

/// A record whose payload is still in its encoded form.
///
/// This is what the catalog persists and what crosses the wire inside
/// merge/commit exchanges.
pub type RawRecord = Record<Vec<u8>>;

impl<T> Record<T> {
    /// Map the payload, keeping id and metadata.
    pub fn map_payload<U>(self, f: impl FnOnce(T) -> U) -> Record<U> {
        Record {
            id: self.id,
            info: self.info,
            payload: f(self.payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(created: i64, updated: i64) -> ItemInfo {
        ItemInfo {
            created,
            updated,
            hash: ContentHash::from_bytes(vec![1, 2, 3]),
        }
    }

    #[test]
    fn test_map_payload_keeps_metadata() {
        let record = Record {
            id: RecordId::new(),
            info: info(100, 200),
            payload: vec![1u8, 2, 3],
        };
        let id = record.id;

        let mapped = record.map_payload(|bytes| bytes.len());
        assert_eq!(mapped.id, id);
        assert_eq!(mapped.info.created, 100);
        assert_eq!(mapped.info.updated, 200);
        assert_eq!(mapped.payload, 3);
    }

    #[test]
    fn test_record_json_roundtrip() {
        let record: RawRecord = Record {
            id: RecordId::new(),
            info: info(1, 2),
            payload: vec![9, 8, 7],
        };

        let json = serde_json::to_string(&record).unwrap();
        let parsed: RawRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, parsed);
    }
}
