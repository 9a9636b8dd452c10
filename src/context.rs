//! Shared collaborators: content hashing, clock, and ID generation.
//!
//! These are the seams a collection engine depends on. The defaults
//! ([`Sha256Hasher`], [`SystemClock`], [`RandomIds`]) are what a production
//! registry uses; [`FixedClock`] and [`SequentialIds`] exist for
//! deterministic tests.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::record_id::RecordId;

/// A fixed-size content fingerprint produced by a [`ContentHasher`].
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHash(#[serde(with = "serde_bytes")] Vec<u8>);

impl ContentHash {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContentHash({})", self)
    }
}

/// Deterministic fixed-size hash of a byte sequence.
///
/// Same input must always produce the same output, and the output length
/// must equal [`ContentHasher::output_len`].
pub trait ContentHasher: Send + Sync {
    /// Length in bytes of every hash this hasher produces.
    fn output_len(&self) -> usize;

    /// Hash a byte sequence.
    fn hash(&self, bytes: &[u8]) -> ContentHash;
}

/// SHA-256 backed [`ContentHasher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn output_len(&self) -> usize {
        32
    }

    fn hash(&self, bytes: &[u8]) -> ContentHash {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        ContentHash::from_bytes(hasher.finalize().to_vec())
    }
}

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock that returns a manually controlled instant.
///
/// Deterministic stand-in for [`SystemClock`] in tests.
#[derive(Debug, Default)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Source of fresh record IDs.
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> RecordId;
}

/// Random UUID-backed [`IdSource`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&self) -> RecordId {
        RecordId::new()
    }
}

/// Counter-backed [`IdSource`] producing predictable IDs for tests.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for SequentialIds {
    fn next_id(&self) -> RecordId {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        let mut bytes = [0u8; 16];
        bytes[8..].copy_from_slice(&n.to_be_bytes());
        RecordId::from_bytes(bytes)
    }
}

/// Bundle of the collaborators shared by every collection a registry binds.
#[derive(Clone)]
pub struct SyncContext {
    pub hasher: Arc<dyn ContentHasher>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdSource>,
}

impl SyncContext {
    pub fn new(
        hasher: Arc<dyn ContentHasher>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdSource>,
    ) -> Self {
        Self { hasher, clock, ids }
    }

    /// SHA-256, wall clock, random IDs.
    pub fn system() -> Self {
        Self::new(
            Arc::new(Sha256Hasher),
            Arc::new(SystemClock),
            Arc::new(RandomIds),
        )
    }
}

impl Default for SyncContext {
    fn default() -> Self {
        Self::system()
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("hash_len", &self.hasher.output_len())
            .finish()
    }
}
