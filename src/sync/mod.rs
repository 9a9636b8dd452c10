//! Sync protocol value types and errors.
//!
//! One full round between an initiator and a responder:
//! 1. Initiator sends its per-collection digests.
//! 2. Responder answers with a [`SyncSession`] and a metadata-only
//!    [`SyncInfo`] per differing collection.
//! 3. Initiator computes a [`MergeInfo`] per collection and sends it back.
//! 4. Responder merges, advancing its version pointers, and answers with an
//!    authoritative [`CommitInfo`] per collection.
//! 5. Initiator commits, verifying its catalogs now hash identically.
//!
//! The types here are plain values; moving them between replicas is the
//! embedding application's job, with [`SyncMessage`] as an optional
//! CBOR-framed envelope.

mod error;
mod protocol;

pub use error::{ConfigError, SyncError};
pub use protocol::{CommitInfo, MergeInfo, SyncInfo, SyncMessage, SyncSession};
