//! Sync and configuration error types.

use thiserror::Error;

use crate::codec::CodecError;
use crate::context::ContentHash;
use crate::storage::{CollectionId, StorageError};

/// Construction-time registry configuration errors. Not recoverable; a
/// registry with a bad binding set must not be built.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Duplicate collection id: {0}")]
    DuplicateCollection(CollectionId),

    #[error("Duplicate collection type tag: {0}")]
    DuplicateTag(String),

    #[error("A registry needs at least one collection binding")]
    NoCollections,
}

/// Errors that can occur during collection and registry operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The registry's content changed after the session was issued. The
    /// round must be restarted from `get_sync_info`.
    #[error("Session expired: registry state changed since the session was issued")]
    SessionExpired,

    /// The supplied session is not the registry's outstanding one. The
    /// round must be restarted from `get_sync_info`.
    #[error("No outstanding session matches the supplied token")]
    SessionMismatch,

    /// A commit produced a catalog whose digest differs from the peer's.
    /// Signals divergent computation or corruption; the previously durable
    /// version is untouched.
    #[error("Wrong hash: expected {expected}, computed {actual}")]
    WrongHash {
        expected: ContentHash,
        actual: ContentHash,
    },

    /// A protocol map referenced a collection this registry never bound.
    /// Caller bug, not a recoverable protocol state.
    #[error("Unknown collection: {0}")]
    UnknownCollection(CollectionId),

    /// No binding carries this type tag.
    #[error("Unknown collection type tag: {0}")]
    UnknownTag(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
