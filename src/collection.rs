//! The collection engine: CRUD, digesting, and the diff/merge/commit
//! algorithm for one collection.
//!
//! [`CatalogStore`] is the single canonical engine. It is byte-level: it
//! moves encoded payloads in and out of the catalog and validates incoming
//! peer payloads through the collection's bound codec without knowing the
//! payload type. [`Collection`] layers a typed [`Codec`] on top for
//! application use.
//!
//! Every logical read opens an independent, full read of the current
//! version; the engine holds no catalog state between calls.

use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::codec::{Codec, PayloadCheck};
use crate::context::{ContentHash, SyncContext};
use crate::record::{ItemInfo, RawRecord, Record};
use crate::record_id::RecordId;
use crate::storage::{ByteChannel, CollectionId};
use crate::sync::{CommitInfo, MergeInfo, SyncError, SyncInfo};

/// Read-only view of one collection.
pub trait Storage {
    /// Content digest over `(id, updated, hash)` triples in stored order.
    fn digest(&self) -> Result<ContentHash, SyncError>;

    /// Active records, ascending by `created`.
    fn items(&self) -> Result<Vec<RawRecord>, SyncError>;

    /// Tombstoned record ids.
    fn deleted(&self) -> Result<BTreeSet<RecordId>, SyncError>;

    /// Ids added since the last completed sync round.
    fn locals(&self) -> Result<BTreeSet<RecordId>, SyncError>;
}

/// A collection that accepts mutations.
pub trait MutableStorage: Storage {
    /// Adds a record with a fresh id and `created = updated = now`.
    fn add(&mut self, payload: Vec<u8>) -> Result<RawRecord, SyncError>;

    /// Replaces the payload of an active record. Returns `None` if the id is
    /// not active; absence is a routine outcome, not an error.
    fn update(&mut self, id: RecordId, payload: Vec<u8>) -> Result<Option<ItemInfo>, SyncError>;

    /// Removes an active record. A record still pending its first sync round
    /// leaves no tombstone; anything else does. Returns `false` if the id is
    /// not active.
    fn delete(&mut self, id: RecordId) -> Result<bool, SyncError>;
}

/// A collection that can take part in a sync round.
pub trait SynchronizedStorage: MutableStorage {
    /// Metadata-only snapshot for the peer.
    fn sync_info(&self) -> Result<SyncInfo, SyncError>;

    /// One-sided diff against a peer's snapshot.
    fn merge_info(&self, peer: &SyncInfo) -> Result<MergeInfo, SyncError>;

    /// Applies a peer's diff and answers with the authoritative result.
    fn merge(&mut self, info: MergeInfo) -> Result<CommitInfo, SyncError>;

    /// Applies a peer's authoritative merge result. Returns `true` if the
    /// catalog changed.
    fn commit(&mut self, info: CommitInfo) -> Result<bool, SyncError>;
}

/// The canonical collection engine, backed by a byte channel.
pub struct CatalogStore {
    id: CollectionId,
    channel: Box<dyn ByteChannel>,
    check: Arc<dyn PayloadCheck>,
    ctx: SyncContext,
}

impl CatalogStore {
    pub fn new(
        id: CollectionId,
        channel: Box<dyn ByteChannel>,
        check: Arc<dyn PayloadCheck>,
        ctx: SyncContext,
    ) -> Self {
        Self {
            id,
            channel,
            check,
            ctx,
        }
    }

    pub fn collection_id(&self) -> &CollectionId {
        &self.id
    }

    fn load(&self) -> Result<Catalog, SyncError> {
        let mut reader = self.channel.reader()?;
        Ok(Catalog::read_from(&mut reader, self.ctx.hasher.output_len())?)
    }

    fn persist(&self, catalog: &Catalog) -> Result<(), SyncError> {
        let mut writer = self.channel.writer()?;
        catalog.write_to(&mut writer)?;
        tracing::debug!(
            collection = %self.id,
            items = catalog.items.len(),
            deleted = catalog.deleted.len(),
            locals = catalog.locals.len(),
            "persisted catalog"
        );
        Ok(())
    }

    fn digest_of(&self, catalog: &Catalog) -> ContentHash {
        self.ctx.hasher.hash(&catalog.digest_input())
    }

    /// Merge/commit reconciliation: drop records the peer is authoritative
    /// for, append the peer's records, union tombstones, clear locals, and
    /// restore `created` order.
    fn reconciled(mut catalog: Catalog, items: &[RawRecord], deleted: &BTreeSet<RecordId>) -> Catalog {
        let incoming: BTreeSet<RecordId> = items.iter().map(|record| record.id).collect();
        catalog
            .items
            .retain(|item| !deleted.contains(&item.id) && !incoming.contains(&item.id));
        catalog.items.extend(items.iter().cloned());
        catalog.deleted.extend(deleted.iter().copied());
        catalog.locals.clear();
        catalog.sort_items();
        catalog
    }

    fn check_payloads(&self, items: &[RawRecord]) -> Result<(), SyncError> {
        for record in items {
            self.check.check(&record.payload)?;
        }
        Ok(())
    }
}

impl Storage for CatalogStore {
    fn digest(&self) -> Result<ContentHash, SyncError> {
        let catalog = self.load()?;
        Ok(self.digest_of(&catalog))
    }

    fn items(&self) -> Result<Vec<RawRecord>, SyncError> {
        Ok(self.load()?.items)
    }

    fn deleted(&self) -> Result<BTreeSet<RecordId>, SyncError> {
        Ok(self.load()?.deleted)
    }

    fn locals(&self) -> Result<BTreeSet<RecordId>, SyncError> {
        Ok(self.load()?.locals)
    }
}

impl MutableStorage for CatalogStore {
    fn add(&mut self, payload: Vec<u8>) -> Result<RawRecord, SyncError> {
        let now = self.ctx.clock.now_millis();
        let record = Record {
            id: self.ctx.ids.next_id(),
            info: ItemInfo {
                created: now,
                updated: now,
                hash: self.ctx.hasher.hash(&payload),
            },
            payload,
        };

        let mut catalog = self.load()?;
        catalog.items.push(record.clone());
        catalog.sort_items();
        catalog.locals.insert(record.id);
        self.persist(&catalog)?;

        Ok(record)
    }

    fn update(&mut self, id: RecordId, payload: Vec<u8>) -> Result<Option<ItemInfo>, SyncError> {
        let mut catalog = self.load()?;
        let item = match catalog.items.iter_mut().find(|item| item.id == id) {
            Some(item) => item,
            None => return Ok(None),
        };

        item.info.updated = self.ctx.clock.now_millis();
        item.info.hash = self.ctx.hasher.hash(&payload);
        item.payload = payload;
        let info = item.info.clone();

        self.persist(&catalog)?;
        Ok(Some(info))
    }

    fn delete(&mut self, id: RecordId) -> Result<bool, SyncError> {
        let mut catalog = self.load()?;
        let before = catalog.items.len();
        catalog.items.retain(|item| item.id != id);
        if catalog.items.len() == before {
            return Ok(false);
        }

        // A record no peer has ever seen needs no tombstone.
        if !catalog.locals.remove(&id) {
            catalog.deleted.insert(id);
        }

        self.persist(&catalog)?;
        Ok(true)
    }
}

impl SynchronizedStorage for CatalogStore {
    fn sync_info(&self) -> Result<SyncInfo, SyncError> {
        let catalog = self.load()?;
        let metadata: BTreeMap<RecordId, ItemInfo> = catalog
            .items
            .iter()
            .map(|item| (item.id, item.info.clone()))
            .collect();

        Ok(SyncInfo {
            metadata,
            deleted: catalog.deleted,
        })
    }

    fn merge_info(&self, peer: &SyncInfo) -> Result<MergeInfo, SyncError> {
        let catalog = self.load()?;
        let mut result = MergeInfo {
            // Tombstones are always shipped whole, never diffed.
            deleted: catalog.deleted.clone(),
            ..MergeInfo::default()
        };

        // Records the peer has never heard of: upload.
        for item in &catalog.items {
            if !peer.metadata.contains_key(&item.id) && !peer.deleted.contains(&item.id) {
                result.items.push(item.clone());
            }
        }

        for (peer_id, peer_info) in &peer.metadata {
            match catalog.find(*peer_id) {
                None => {
                    // Agreed-deleted records need no transfer.
                    if !catalog.deleted.contains(peer_id) {
                        result.download.insert(*peer_id);
                    }
                }
                Some(item) => {
                    if peer_info.updated > item.info.updated {
                        // Strictly newer on the peer: last writer wins.
                        result.download.insert(*peer_id);
                    } else if peer_info.hash != item.info.hash {
                        // Same or older timestamp but diverged content:
                        // this side wins the tie and uploads its copy.
                        result.items.push(item.clone());
                    }
                }
            }
        }

        Ok(result)
    }

    fn merge(&mut self, info: MergeInfo) -> Result<CommitInfo, SyncError> {
        self.check_payloads(&info.items)?;

        let catalog = self.load()?;
        let pre_merge_items = catalog.items.clone();

        let next = Self::reconciled(catalog, &info.items, &info.deleted);
        self.persist(&next)?;

        // The peer asked to download these; answer from the pre-merge state,
        // which is where its requests pointed.
        let uploads: Vec<RawRecord> = pre_merge_items
            .into_iter()
            .filter(|item| info.download.contains(&item.id))
            .collect();

        tracing::debug!(
            collection = %self.id,
            applied = info.items.len(),
            uploads = uploads.len(),
            "merged peer changes"
        );

        Ok(CommitInfo {
            hash: self.digest_of(&next),
            items: uploads,
            deleted: next.deleted,
        })
    }

    fn commit(&mut self, info: CommitInfo) -> Result<bool, SyncError> {
        let catalog = self.load()?;

        if info.items.is_empty()
            && info.deleted.is_subset(&catalog.deleted)
            && catalog.locals.is_empty()
        {
            // Nothing to apply; the two sides must already agree.
            let actual = self.digest_of(&catalog);
            if actual != info.hash {
                return Err(SyncError::WrongHash {
                    expected: info.hash,
                    actual,
                });
            }
            return Ok(false);
        }

        self.check_payloads(&info.items)?;

        let next = Self::reconciled(catalog, &info.items, &info.deleted);
        let actual = self.digest_of(&next);
        if actual != info.hash {
            return Err(SyncError::WrongHash {
                expected: info.hash,
                actual,
            });
        }

        self.persist(&next)?;
        tracing::debug!(collection = %self.id, applied = info.items.len(), "committed peer result");
        Ok(true)
    }
}

/// Typed facade over a collection engine.
///
/// Encodes payloads on the way in and decodes them on the way out with the
/// collection's [`Codec`].
pub struct Collection<T, C, S = CatalogStore> {
    store: S,
    codec: C,
    _payload: PhantomData<fn() -> T>,
}

impl<T, C, S> Collection<T, C, S>
where
    C: Codec<T>,
    S: SynchronizedStorage,
{
    pub fn new(store: S, codec: C) -> Self {
        Self {
            store,
            codec,
            _payload: PhantomData,
        }
    }

    /// The underlying byte-level engine.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn digest(&self) -> Result<ContentHash, SyncError> {
        self.store.digest()
    }

    pub fn add(&mut self, payload: T) -> Result<Record<T>, SyncError> {
        let bytes = self.codec.encode(&payload)?;
        let raw = self.store.add(bytes)?;
        Ok(Record {
            id: raw.id,
            info: raw.info,
            payload,
        })
    }

    pub fn update(&mut self, id: RecordId, payload: &T) -> Result<Option<ItemInfo>, SyncError> {
        let bytes = self.codec.encode(payload)?;
        self.store.update(id, bytes)
    }

    pub fn delete(&mut self, id: RecordId) -> Result<bool, SyncError> {
        self.store.delete(id)
    }

    /// Active records with decoded payloads, ascending by `created`.
    pub fn items(&self) -> Result<Vec<Record<T>>, SyncError> {
        self.store
            .items()?
            .into_iter()
            .map(|raw| {
                let payload = self.codec.decode(&raw.payload)?;
                Ok(Record {
                    id: raw.id,
                    info: raw.info,
                    payload,
                })
            })
            .collect()
    }

    /// One decoded record, or `None` if the id is not active.
    pub fn get(&self, id: RecordId) -> Result<Option<Record<T>>, SyncError> {
        for raw in self.store.items()? {
            if raw.id == id {
                let payload = self.codec.decode(&raw.payload)?;
                return Ok(Some(Record {
                    id: raw.id,
                    info: raw.info,
                    payload,
                }));
            }
        }
        Ok(None)
    }

    pub fn deleted(&self) -> Result<BTreeSet<RecordId>, SyncError> {
        self.store.deleted()
    }

    pub fn locals(&self) -> Result<BTreeSet<RecordId>, SyncError> {
        self.store.locals()
    }
}
