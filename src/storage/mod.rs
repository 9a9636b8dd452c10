//! Byte media and durable version pointers.
//!
//! A collection's persisted state lives in one blob per `(collection,
//! pointer)` pair. A [`VersionDirectory`] maps collection IDs to their
//! current pointer, hands out [`ByteChannel`]s for specific pointers, and
//! advances pointers atomically in batches. Two implementations ship with
//! the crate: [`fs::FsDirectory`] and [`memory::MemoryDirectory`].

pub mod fs;
pub mod memory;

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of one typed, independently synchronized collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(String);

impl CollectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Display for CollectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CollectionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CollectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Errors from the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error for {path}: {source}")]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt catalog: {0}")]
    Corrupt(&'static str),

    #[error("Corrupt pointer table: {0}")]
    PointerTable(String),
}

/// Byte streams for one specific `(collection, pointer)` version.
///
/// `reader` yields the full persisted blob for the input pointer (an empty
/// stream if nothing has been written there yet); `writer` replaces the blob
/// at the output pointer wholesale.
pub trait ByteChannel {
    fn reader(&self) -> Result<Box<dyn Read>, StorageError>;
    fn writer(&self) -> Result<Box<dyn Write>, StorageError>;
}

/// Durable map from collection ID to current version pointer, plus access to
/// the byte medium holding each version.
pub trait VersionDirectory: Send + Sync {
    /// Current pointer for a collection. Collections that have never been
    /// written report pointer 0.
    fn pointer(&self, id: &CollectionId) -> Result<u64, StorageError>;

    /// Durably advance a batch of pointers in one step.
    fn advance(&self, pointers: &BTreeMap<CollectionId, u64>) -> Result<(), StorageError>;

    /// Open a channel reading version `input` and writing version `output`
    /// of the given collection.
    fn channel(
        &self,
        id: &CollectionId,
        input: u64,
        output: u64,
    ) -> Result<Box<dyn ByteChannel>, StorageError>;
}
