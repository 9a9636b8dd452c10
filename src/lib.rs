//! Carton Sync
//!
//! Peer-to-peer synchronization engine for named typed record collections.
//! Two replicas, each holding several collections of records, converge to
//! the same content after one bounded exchange of metadata and data.
//!
//! Applications talk to a [`SyncRegistry`], which binds collections by id
//! and type tag, resolves a [`CatalogStore`] engine per call through a
//! [`VersionDirectory`], and drives the session-guarded
//! `get_sync_info → get_merge_info → merge → commit` protocol round.

pub mod catalog;
pub mod codec;
pub mod collection;
pub mod context;
pub mod record;
pub mod record_id;
pub mod registry;
pub mod storage;
pub mod sync;

pub use catalog::Catalog;
pub use codec::{Codec, CodecCheck, CodecError, JsonCodec, PayloadCheck};
pub use collection::{
    CatalogStore, Collection, MutableStorage, Storage, SynchronizedStorage,
};
pub use context::{
    Clock, ContentHash, ContentHasher, FixedClock, IdSource, RandomIds, SequentialIds,
    Sha256Hasher, SyncContext, SystemClock,
};
pub use record::{ItemInfo, RawRecord, Record};
pub use record_id::{RecordId, RecordIdError};
pub use registry::{RegistryBuilder, SessionState, SyncRegistry};
pub use storage::{
    fs::FsDirectory, memory::MemoryDirectory, ByteChannel, CollectionId, StorageError,
    VersionDirectory,
};
pub use sync::{CommitInfo, ConfigError, MergeInfo, SyncError, SyncInfo, SyncMessage, SyncSession};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
