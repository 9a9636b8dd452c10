//! The registry: binds collections and drives the two-sided sync protocol.
//!
//! A [`SyncRegistry`] owns a set of `(collection id, type tag, codec)`
//! bindings over one [`VersionDirectory`], computes the global digest across
//! all of them, and guards each merge/commit round with a one-shot session
//! token. One registry instance assumes single-threaded use; serializing
//! access is the embedding application's job.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::codec::{Codec, CodecCheck, PayloadCheck};
use crate::collection::{CatalogStore, Storage, SynchronizedStorage};
use crate::context::{ContentHash, SyncContext};
use crate::storage::{CollectionId, VersionDirectory};
use crate::sync::{CommitInfo, ConfigError, MergeInfo, SyncError, SyncInfo, SyncSession};

/// Protocol position of a registry: either no round is open, or one session
/// is outstanding and the next `merge`/`commit` must present it.
///
/// Transitions are pure; the registry assigns the returned state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingMerge(SyncSession),
}

impl SessionState {
    /// State after issuing a session. Always overwrites; there is no queue
    /// of outstanding sessions.
    pub fn begin(session: SyncSession) -> SessionState {
        SessionState::AwaitingMerge(session)
    }

    /// State after consuming `token`, or [`SyncError::SessionMismatch`] if
    /// `token` is not the outstanding session.
    pub fn consume(&self, token: &SyncSession) -> Result<SessionState, SyncError> {
        match self {
            SessionState::AwaitingMerge(current) if current == token => Ok(SessionState::Idle),
            _ => Err(SyncError::SessionMismatch),
        }
    }
}

struct Binding {
    tag: String,
    check: Arc<dyn PayloadCheck>,
}

/// Builder for [`SyncRegistry`]. Rejects duplicate collection ids and
/// duplicate type tags at bind time and an empty binding set at build time.
pub struct RegistryBuilder {
    directory: Arc<dyn VersionDirectory>,
    ctx: SyncContext,
    bindings: BTreeMap<CollectionId, Binding>,
}

impl RegistryBuilder {
    pub fn new(directory: Arc<dyn VersionDirectory>) -> Self {
        Self {
            directory,
            ctx: SyncContext::system(),
            bindings: BTreeMap::new(),
        }
    }

    /// Replaces the default collaborators (SHA-256, wall clock, random ids).
    pub fn with_context(mut self, ctx: SyncContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Binds a collection id and type tag to a payload codec.
    pub fn bind<T, C>(
        mut self,
        id: impl Into<CollectionId>,
        tag: impl Into<String>,
        codec: C,
    ) -> Result<Self, ConfigError>
    where
        T: 'static,
        C: Codec<T> + 'static,
    {
        let id = id.into();
        let tag = tag.into();

        if self.bindings.contains_key(&id) {
            return Err(ConfigError::DuplicateCollection(id));
        }
        if self.bindings.values().any(|binding| binding.tag == tag) {
            return Err(ConfigError::DuplicateTag(tag));
        }

        self.bindings.insert(
            id,
            Binding {
                tag,
                check: Arc::new(CodecCheck::new(codec)),
            },
        );
        Ok(self)
    }

    pub fn build(self) -> Result<SyncRegistry, ConfigError> {
        if self.bindings.is_empty() {
            return Err(ConfigError::NoCollections);
        }
        Ok(SyncRegistry {
            directory: self.directory,
            ctx: self.ctx,
            bindings: self.bindings,
            session: SessionState::Idle,
        })
    }
}

/// Multi-collection registry orchestrating the sync protocol.
pub struct SyncRegistry {
    directory: Arc<dyn VersionDirectory>,
    ctx: SyncContext,
    bindings: BTreeMap<CollectionId, Binding>,
    session: SessionState,
}

impl SyncRegistry {
    /// Bound collection ids, ascending.
    pub fn collection_ids(&self) -> Vec<CollectionId> {
        self.bindings.keys().cloned().collect()
    }

    /// Current protocol position.
    pub fn session_state(&self) -> &SessionState {
        &self.session
    }

    fn binding(&self, id: &CollectionId) -> Result<&Binding, SyncError> {
        self.bindings
            .get(id)
            .ok_or_else(|| SyncError::UnknownCollection(id.clone()))
    }

    fn require_known<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a CollectionId>,
    ) -> Result<(), SyncError> {
        for id in ids {
            self.binding(id)?;
        }
        Ok(())
    }

    /// Opens a collection engine reading version `input` and writing version
    /// `output`.
    fn open(
        &self,
        id: &CollectionId,
        input: u64,
        output: u64,
    ) -> Result<CatalogStore, SyncError> {
        let binding = self.binding(id)?;
        let channel = self.directory.channel(id, input, output)?;
        Ok(CatalogStore::new(
            id.clone(),
            channel,
            binding.check.clone(),
            self.ctx.clone(),
        ))
    }

    /// Opens the live engine for a collection. Reads and writes target the
    /// current pointer; only protocol merges and commits advance pointers.
    pub fn resolve(&self, id: &CollectionId) -> Result<CatalogStore, SyncError> {
        let pointer = self.directory.pointer(id)?;
        self.open(id, pointer, pointer)
    }

    /// Opens the live engine for the collection bound with `tag`.
    pub fn resolve_tag(&self, tag: &str) -> Result<CatalogStore, SyncError> {
        let id = self
            .bindings
            .iter()
            .find(|(_, binding)| binding.tag == tag)
            .map(|(id, _)| id.clone())
            .ok_or_else(|| SyncError::UnknownTag(tag.to_string()))?;
        self.resolve(&id)
    }

    /// Per-collection content digests at the current pointers.
    pub fn digests(&self) -> Result<BTreeMap<CollectionId, ContentHash>, SyncError> {
        let mut digests = BTreeMap::new();
        for id in self.bindings.keys() {
            digests.insert(id.clone(), self.resolve(id)?.digest()?);
        }
        Ok(digests)
    }

    /// Hash over `(id ∥ digest)` pairs in ascending id order.
    fn combine(&self, digests: &BTreeMap<CollectionId, ContentHash>) -> ContentHash {
        let mut buf = Vec::new();
        for (id, digest) in digests {
            buf.extend_from_slice(id.as_bytes());
            buf.extend_from_slice(digest.as_bytes());
        }
        self.ctx.hasher.hash(&buf)
    }

    /// Digest of the whole registry's content.
    pub fn global_digest(&self) -> Result<ContentHash, SyncError> {
        let digests = self.digests()?;
        Ok(self.combine(&digests))
    }

    /// Protocol step 1 (responder side): compare the initiator's digests
    /// with our own and snapshot every differing collection.
    ///
    /// Issues the session that must accompany the rest of the round;
    /// `src` fingerprints the digests the peer sent, `dst` our own state.
    /// Any previous outstanding session is overwritten.
    pub fn get_sync_info(
        &mut self,
        peer_digests: &BTreeMap<CollectionId, ContentHash>,
    ) -> Result<(SyncSession, BTreeMap<CollectionId, SyncInfo>), SyncError> {
        self.require_known(peer_digests.keys())?;

        let local = self.digests()?;
        let session = SyncSession {
            src: self.combine(peer_digests),
            dst: self.combine(&local),
        };

        let mut infos = BTreeMap::new();
        for (id, peer_digest) in peer_digests {
            if local.get(id) != Some(peer_digest) {
                infos.insert(id.clone(), self.resolve(id)?.sync_info()?);
            }
        }

        tracing::debug!(differing = infos.len(), "issued sync session");
        self.session = SessionState::begin(session.clone());
        Ok((session, infos))
    }

    /// Protocol step 2 (initiator side): diff each snapshotted collection
    /// against our state.
    ///
    /// Fails with [`SyncError::SessionExpired`] if our content no longer
    /// matches what the session was issued against. Stores the session as
    /// outstanding for the closing `commit`.
    pub fn get_merge_info(
        &mut self,
        session: &SyncSession,
        peer_infos: &BTreeMap<CollectionId, SyncInfo>,
    ) -> Result<BTreeMap<CollectionId, MergeInfo>, SyncError> {
        self.require_known(peer_infos.keys())?;

        if session.src != self.global_digest()? {
            tracing::warn!("merge info refused: session expired");
            return Err(SyncError::SessionExpired);
        }
        self.session = SessionState::begin(session.clone());

        let mut infos = BTreeMap::new();
        for (id, peer_info) in peer_infos {
            infos.insert(id.clone(), self.resolve(id)?.merge_info(peer_info)?);
        }
        Ok(infos)
    }

    /// Protocol step 3 (responder side): apply the initiator's diffs and
    /// answer with authoritative per-collection results.
    ///
    /// The session must be the outstanding one and its `dst` must still
    /// match our global digest; this is the one-shot compare-and-swap that
    /// rejects rounds raced by local mutations. Each merged collection is
    /// written at `pointer + 1` and all pointers advance as one batch.
    pub fn merge(
        &mut self,
        session: &SyncSession,
        peer_infos: BTreeMap<CollectionId, MergeInfo>,
    ) -> Result<BTreeMap<CollectionId, CommitInfo>, SyncError> {
        self.require_known(peer_infos.keys())?;

        let next = self.session.consume(session)?;
        if session.dst != self.global_digest()? {
            tracing::warn!("merge refused: session expired");
            return Err(SyncError::SessionExpired);
        }
        self.session = next;

        let mut commits = BTreeMap::new();
        let mut pointers = BTreeMap::new();
        for (id, info) in peer_infos {
            let pointer = self.directory.pointer(&id)?;
            let mut store = self.open(&id, pointer, pointer + 1)?;
            let commit = store.merge(info)?;
            tracing::debug!(collection = %id, pointer = pointer + 1, "collection merged");
            commits.insert(id.clone(), commit);
            pointers.insert(id, pointer + 1);
        }

        self.directory.advance(&pointers)?;
        Ok(commits)
    }

    /// Protocol step 4 (initiator side): apply the responder's authoritative
    /// results.
    ///
    /// Same session guard as [`merge`](Self::merge), keyed on `src`. Only
    /// collections whose engine-level commit changed anything advance their
    /// pointer; the batch is persisted once. Returns the ids that advanced.
    pub fn commit(
        &mut self,
        session: &SyncSession,
        peer_infos: BTreeMap<CollectionId, CommitInfo>,
    ) -> Result<BTreeSet<CollectionId>, SyncError> {
        self.require_known(peer_infos.keys())?;

        let next = self.session.consume(session)?;
        if session.src != self.global_digest()? {
            tracing::warn!("commit refused: session expired");
            return Err(SyncError::SessionExpired);
        }
        self.session = next;

        let mut changed = BTreeSet::new();
        let mut pointers = BTreeMap::new();
        for (id, info) in peer_infos {
            let pointer = self.directory.pointer(&id)?;
            let mut store = self.open(&id, pointer, pointer + 1)?;
            if store.commit(info)? {
                tracing::debug!(collection = %id, pointer = pointer + 1, "collection committed");
                pointers.insert(id.clone(), pointer + 1);
                changed.insert(id);
            }
        }

        self.directory.advance(&pointers)?;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::collection::MutableStorage;
    use crate::context::{ContentHasher, FixedClock, RandomIds, Sha256Hasher};
    use crate::record::RawRecord;
    use crate::record_id::RecordId;
    use crate::storage::memory::MemoryDirectory;

    const NOTES: &str = "notes";
    const TAGS: &str = "tags";

    fn test_registry(clock: Arc<FixedClock>) -> (SyncRegistry, MemoryDirectory) {
        let dir = MemoryDirectory::new();
        let ctx = SyncContext::new(Arc::new(Sha256Hasher), clock, Arc::new(RandomIds));
        let registry = RegistryBuilder::new(Arc::new(dir.clone()))
            .with_context(ctx)
            .bind::<String, _>(NOTES, "note", JsonCodec::<String>::new())
            .unwrap()
            .bind::<String, _>(TAGS, "tag", JsonCodec::<String>::new())
            .unwrap()
            .build()
            .unwrap();
        (registry, dir)
    }

    fn add(registry: &SyncRegistry, collection: &str, payload: &str) -> RawRecord {
        let mut store = registry.resolve(&collection.into()).unwrap();
        let bytes = JsonCodec::<String>::new()
            .encode(&payload.to_string())
            .unwrap();
        store.add(bytes).unwrap()
    }

    /// One full round: `x` initiates, `y` responds. Returns the collections
    /// `x` advanced.
    fn run_round(x: &mut SyncRegistry, y: &mut SyncRegistry) -> BTreeSet<CollectionId> {
        let digests = x.digests().unwrap();
        let (session, sync_infos) = y.get_sync_info(&digests).unwrap();
        let merge_infos = x.get_merge_info(&session, &sync_infos).unwrap();
        let commit_infos = y.merge(&session, merge_infos).unwrap();
        x.commit(&session, commit_infos).unwrap()
    }

    fn assert_converged(x: &SyncRegistry, y: &SyncRegistry) {
        assert_eq!(x.digests().unwrap(), y.digests().unwrap());
        assert_eq!(
            x.global_digest().unwrap(),
            y.global_digest().unwrap()
        );
    }

    #[test]
    fn test_builder_rejects_duplicate_collection() {
        let dir: Arc<dyn VersionDirectory> = Arc::new(MemoryDirectory::new());
        let result = RegistryBuilder::new(dir)
            .bind::<String, _>(NOTES, "note", JsonCodec::<String>::new())
            .unwrap()
            .bind::<String, _>(NOTES, "other", JsonCodec::<String>::new());
        assert!(matches!(result, Err(ConfigError::DuplicateCollection(_))));
    }

    #[test]
    fn test_builder_rejects_duplicate_tag() {
        let dir: Arc<dyn VersionDirectory> = Arc::new(MemoryDirectory::new());
        let result = RegistryBuilder::new(dir)
            .bind::<String, _>(NOTES, "note", JsonCodec::<String>::new())
            .unwrap()
            .bind::<String, _>(TAGS, "note", JsonCodec::<String>::new());
        assert!(matches!(result, Err(ConfigError::DuplicateTag(_))));
    }

    #[test]
    fn test_builder_rejects_empty_binding_set() {
        let dir: Arc<dyn VersionDirectory> = Arc::new(MemoryDirectory::new());
        let result = RegistryBuilder::new(dir).build();
        assert!(matches!(result, Err(ConfigError::NoCollections)));
    }

    #[test]
    fn test_resolve_unknown_collection() {
        let (registry, _dir) = test_registry(Arc::new(FixedClock::new(0)));
        assert!(matches!(
            registry.resolve(&"nope".into()),
            Err(SyncError::UnknownCollection(_))
        ));
        assert!(matches!(
            registry.resolve_tag("nope"),
            Err(SyncError::UnknownTag(_))
        ));
    }

    #[test]
    fn test_resolve_by_tag_reaches_same_collection() {
        let (registry, _dir) = test_registry(Arc::new(FixedClock::new(0)));
        add(&registry, NOTES, "hello");

        let by_tag = registry.resolve_tag("note").unwrap();
        assert_eq!(by_tag.collection_id(), &CollectionId::new(NOTES));
        assert_eq!(
            by_tag.digest().unwrap(),
            registry.resolve(&NOTES.into()).unwrap().digest().unwrap()
        );
    }

    #[test]
    fn test_global_digest_covers_all_collections() {
        let (registry, _dir) = test_registry(Arc::new(FixedClock::new(0)));
        let before = registry.global_digest().unwrap();

        add(&registry, TAGS, "urgent");
        let after = registry.global_digest().unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_get_sync_info_includes_only_differing_collections() {
        let clock = Arc::new(FixedClock::new(1_000));
        let (mut x, _xdir) = test_registry(clock.clone());
        let (mut y, _ydir) = test_registry(Arc::new(FixedClock::new(2_000)));

        add(&x, NOTES, "only on x");

        let (_, infos) = y.get_sync_info(&x.digests().unwrap()).unwrap();
        // tags matches on both sides (empty), notes differs
        assert_eq!(infos.len(), 1);
        assert!(infos.contains_key(&CollectionId::new(NOTES)));
    }

    #[test]
    fn test_disjoint_adds_converge_in_one_round() {
        let (mut x, _xdir) = test_registry(Arc::new(FixedClock::new(1_000)));
        let (mut y, _ydir) = test_registry(Arc::new(FixedClock::new(2_000)));

        let a = add(&x, NOTES, "from x");
        let b = add(&y, NOTES, "from y");
        let t = add(&x, TAGS, "tagged");

        let advanced = run_round(&mut x, &mut y);
        assert_eq!(
            advanced,
            BTreeSet::from([CollectionId::new(NOTES), CollectionId::new(TAGS)])
        );
        assert_converged(&x, &y);

        for registry in [&x, &y] {
            let ids: BTreeSet<RecordId> = registry
                .resolve(&NOTES.into())
                .unwrap()
                .items()
                .unwrap()
                .iter()
                .map(|item| item.id)
                .collect();
            assert_eq!(ids, BTreeSet::from([a.id, b.id]));

            let tags = registry.resolve(&TAGS.into()).unwrap().items().unwrap();
            assert_eq!(tags.len(), 1);
            assert_eq!(tags[0].id, t.id);

            // Completed rounds leave nothing pending.
            assert!(registry.resolve(&NOTES.into()).unwrap().locals().unwrap().is_empty());
        }

        // A second round over converged replicas changes nothing.
        let advanced = run_round(&mut x, &mut y);
        assert!(advanced.is_empty());
        assert_converged(&x, &y);
    }

    #[test]
    fn test_newer_update_propagates() {
        let x_clock = Arc::new(FixedClock::new(1_000));
        let y_clock = Arc::new(FixedClock::new(1_000));
        let (mut x, _xdir) = test_registry(x_clock.clone());
        let (mut y, _ydir) = test_registry(y_clock.clone());

        let record = add(&x, NOTES, "v1");
        run_round(&mut x, &mut y);

        // y edits the record later than x created it.
        y_clock.advance(500);
        let bytes = JsonCodec::<String>::new().encode(&"v2".to_string()).unwrap();
        y.resolve(&NOTES.into())
            .unwrap()
            .update(record.id, bytes.clone())
            .unwrap()
            .unwrap();

        run_round(&mut x, &mut y);
        assert_converged(&x, &y);

        let items = x.resolve(&NOTES.into()).unwrap().items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].payload, bytes);
        assert_eq!(items[0].info.updated, 1_500);
    }

    #[test]
    fn test_later_delete_beats_earlier_update() {
        let x_clock = Arc::new(FixedClock::new(1_000));
        let y_clock = Arc::new(FixedClock::new(1_000));
        let (mut x, _xdir) = test_registry(x_clock.clone());
        let (mut y, _ydir) = test_registry(y_clock.clone());

        let record = add(&x, NOTES, "shared");
        run_round(&mut x, &mut y);

        // x updates at t1, y deletes at t2 > t1, neither knowing of the other.
        x_clock.advance(100);
        let bytes = JsonCodec::<String>::new().encode(&"edited".to_string()).unwrap();
        x.resolve(&NOTES.into())
            .unwrap()
            .update(record.id, bytes)
            .unwrap()
            .unwrap();

        y_clock.advance(200);
        assert!(y.resolve(&NOTES.into()).unwrap().delete(record.id).unwrap());

        run_round(&mut x, &mut y);
        assert_converged(&x, &y);

        for registry in [&x, &y] {
            let store = registry.resolve(&NOTES.into()).unwrap();
            assert!(store.items().unwrap().is_empty());
            assert!(store.deleted().unwrap().contains(&record.id));
        }
    }

    #[test]
    fn test_merge_with_stale_session_is_expired_and_advances_nothing() {
        let (mut x, _xdir) = test_registry(Arc::new(FixedClock::new(1_000)));
        let (mut y, ydir) = test_registry(Arc::new(FixedClock::new(2_000)));

        add(&x, NOTES, "from x");
        let digests = x.digests().unwrap();
        let (session, sync_infos) = y.get_sync_info(&digests).unwrap();
        let merge_infos = x.get_merge_info(&session, &sync_infos).unwrap();

        // y changes underneath the open round.
        add(&y, NOTES, "raced");
        let pointer_before = ydir.pointer(&NOTES.into()).unwrap();

        assert!(matches!(
            y.merge(&session, merge_infos),
            Err(SyncError::SessionExpired)
        ));
        assert_eq!(ydir.pointer(&NOTES.into()).unwrap(), pointer_before);
    }

    #[test]
    fn test_merge_without_outstanding_session_is_mismatch() {
        let (mut y, _ydir) = test_registry(Arc::new(FixedClock::new(0)));
        let digest = y.global_digest().unwrap();
        let session = SyncSession {
            src: digest.clone(),
            dst: digest,
        };

        assert!(matches!(
            y.merge(&session, BTreeMap::new()),
            Err(SyncError::SessionMismatch)
        ));
    }

    #[test]
    fn test_session_is_one_shot() {
        let (mut x, _xdir) = test_registry(Arc::new(FixedClock::new(1_000)));
        let (mut y, _ydir) = test_registry(Arc::new(FixedClock::new(2_000)));

        add(&x, NOTES, "from x");
        let digests = x.digests().unwrap();
        let (session, sync_infos) = y.get_sync_info(&digests).unwrap();
        let merge_infos = x.get_merge_info(&session, &sync_infos).unwrap();
        y.merge(&session, merge_infos.clone()).unwrap();

        // The session was consumed by the first merge.
        assert!(matches!(
            y.merge(&session, merge_infos),
            Err(SyncError::SessionMismatch)
        ));
        assert_eq!(y.session_state(), &SessionState::Idle);
    }

    #[test]
    fn test_unknown_collection_in_protocol_map() {
        let (mut y, _ydir) = test_registry(Arc::new(FixedClock::new(0)));

        let mut digests = BTreeMap::new();
        digests.insert(
            CollectionId::new("never-bound"),
            Sha256Hasher.hash(b"whatever"),
        );

        assert!(matches!(
            y.get_sync_info(&digests),
            Err(SyncError::UnknownCollection(_))
        ));
    }

    #[test]
    fn test_get_sync_info_overwrites_outstanding_session() {
        let (mut x, _xdir) = test_registry(Arc::new(FixedClock::new(1_000)));
        let (mut y, _ydir) = test_registry(Arc::new(FixedClock::new(2_000)));

        add(&x, NOTES, "from x");
        let digests = x.digests().unwrap();
        let (first, _) = y.get_sync_info(&digests).unwrap();

        add(&x, NOTES, "more");
        let digests = x.digests().unwrap();
        let (second, sync_infos) = y.get_sync_info(&digests).unwrap();
        assert_ne!(first, second);

        // Only the latest session is honored.
        let merge_infos = x.get_merge_info(&second, &sync_infos).unwrap();
        assert!(matches!(
            y.merge(&first, merge_infos.clone()),
            Err(SyncError::SessionMismatch)
        ));
        y.merge(&second, merge_infos).unwrap();
    }

    #[test]
    fn test_round_over_filesystem_directories() {
        use crate::storage::fs::FsDirectory;
        use std::path::PathBuf;

        fn fs_registry(path: PathBuf, clock: Arc<FixedClock>) -> SyncRegistry {
            let ctx = SyncContext::new(Arc::new(Sha256Hasher), clock, Arc::new(RandomIds));
            RegistryBuilder::new(Arc::new(FsDirectory::new(path)))
                .with_context(ctx)
                .bind::<String, _>(NOTES, "note", JsonCodec::<String>::new())
                .unwrap()
                .bind::<String, _>(TAGS, "tag", JsonCodec::<String>::new())
                .unwrap()
                .build()
                .unwrap()
        }

        let x_temp = tempfile::TempDir::new().unwrap();
        let y_temp = tempfile::TempDir::new().unwrap();
        let mut x = fs_registry(x_temp.path().to_path_buf(), Arc::new(FixedClock::new(1_000)));
        let mut y = fs_registry(y_temp.path().to_path_buf(), Arc::new(FixedClock::new(2_000)));

        let record = add(&x, NOTES, "on disk");
        let advanced = run_round(&mut x, &mut y);
        assert_eq!(advanced, BTreeSet::from([CollectionId::new(NOTES)]));
        assert_converged(&x, &y);

        let items = y.resolve(&NOTES.into()).unwrap().items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, record.id);
    }

    #[test]
    fn test_merge_advances_pointers_as_a_batch() {
        let (mut x, _xdir) = test_registry(Arc::new(FixedClock::new(1_000)));
        let (mut y, ydir) = test_registry(Arc::new(FixedClock::new(2_000)));

        add(&x, NOTES, "n");
        add(&x, TAGS, "t");

        run_round(&mut x, &mut y);
        assert_eq!(ydir.pointer(&NOTES.into()).unwrap(), 1);
        assert_eq!(ydir.pointer(&TAGS.into()).unwrap(), 1);
    }
}
