//! Protocol value types exchanged between replicas, plus a CBOR envelope.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::context::ContentHash;
use crate::record::{ItemInfo, RawRecord};
use crate::record_id::RecordId;
use crate::storage::CollectionId;

/// One-shot token binding a protocol round to a specific pair of digests:
/// `src` is the digest of the state the peer believes it has, `dst` is the
/// issuing registry's own global digest at issue time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSession {
    pub src: ContentHash,
    pub dst: ContentHash,
}

/// Metadata-only snapshot of one collection: no payload bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncInfo {
    /// Per-active-record metadata.
    pub metadata: BTreeMap<RecordId, ItemInfo>,
    /// Tombstones, always shipped whole.
    pub deleted: BTreeSet<RecordId>,
}

/// One-sided diff of a collection against a peer's [`SyncInfo`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeInfo {
    /// Ids this side is missing and wants the peer's copy of.
    pub download: BTreeSet<RecordId>,
    /// Records this side uploads because the peer lacks or diverged on them.
    pub items: Vec<RawRecord>,
    /// This side's full tombstone set.
    pub deleted: BTreeSet<RecordId>,
}

/// Authoritative result of a merge, to be applied verbatim by the peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Digest the peer's catalog must hash to after applying this.
    pub hash: ContentHash,
    /// Records requested through `MergeInfo::download`.
    pub items: Vec<RawRecord>,
    /// The merged tombstone set.
    pub deleted: BTreeSet<RecordId>,
}

/// CBOR-framed envelope for moving round payloads between replicas.
///
/// Transport itself (sockets, files, whatever carries the bytes) stays
/// outside this crate; this only fixes a self-describing message encoding so
/// both ends agree on framing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SyncMessage {
    /// Round opener: the initiator's per-collection digests.
    Digests {
        digests: BTreeMap<CollectionId, ContentHash>,
    },
    /// Responder's session plus snapshots of the differing collections.
    SyncInfos {
        session: SyncSession,
        infos: BTreeMap<CollectionId, SyncInfo>,
    },
    /// Initiator's per-collection diffs.
    MergeInfos {
        session: SyncSession,
        infos: BTreeMap<CollectionId, MergeInfo>,
    },
    /// Responder's authoritative merge results.
    CommitInfos {
        session: SyncSession,
        infos: BTreeMap<CollectionId, CommitInfo>,
    },
    /// Round closer: which collections the initiator actually advanced.
    Committed { collections: BTreeSet<CollectionId> },
}

impl SyncMessage {
    /// Encode message as CBOR bytes.
    pub fn encode(&self) -> Result<Vec<u8>, ciborium::ser::Error<std::io::Error>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)?;
        Ok(buf)
    }

    /// Decode message from CBOR bytes.
    pub fn decode(data: &[u8]) -> Result<Self, ciborium::de::Error<std::io::Error>> {
        ciborium::from_reader(data)
    }
}
