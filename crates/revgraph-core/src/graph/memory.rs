//! In-memory vertex store.

use super::store::{VertexIter, VertexStore};
use super::{EditionFilter, RevisionFilter, Vertex, VertexFilter, VertexUpdate};
use crate::lifecycle::{Lifecycle, Phase, PhaseTracker};
use crate::storage::snapshot::{self, SnapshotKind};
use indexmap::IndexMap;
use parking_lot::RwLock;
use revgraph_common::types::{
    AccessContext, EditionName, RevisionClock, RevisionId, VertexId, VertexTypeId,
};
use revgraph_common::utils::error::{LifecycleError, Result};
use revgraph_common::utils::hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::ops::Bound;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for the in-memory store.
#[derive(Debug, Clone)]
pub struct VertexStoreConfig {
    /// Snapshot file read on load and written on flush. `None` keeps the
    /// store purely in memory.
    pub snapshot_path: Option<PathBuf>,
    /// Number of vertices a scan materializes per lock acquisition.
    pub scan_batch_size: usize,
}

impl Default for VertexStoreConfig {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            scan_batch_size: 256,
        }
    }
}

impl VertexStoreConfig {
    /// Persists to the given snapshot file.
    #[must_use]
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Sets the scan batch size. Zero is treated as one.
    #[must_use]
    pub fn with_scan_batch_size(mut self, size: usize) -> Self {
        self.scan_batch_size = size.max(1);
        self
    }
}

/// Revisions of one edition, ascending.
type Revisions = BTreeMap<RevisionId, Arc<Vertex>>;

/// Everything stored for one `(type, id)`.
#[derive(Debug, Clone)]
struct VertexEntry {
    default_edition: EditionName,
    /// Editions in creation order.
    editions: IndexMap<EditionName, Revisions>,
}

impl VertexEntry {
    fn resolve_edition<'e>(&'e self, edition: Option<&'e str>) -> &'e str {
        edition.unwrap_or_else(|| self.default_edition.as_str())
    }

    fn resolve(&self, edition: Option<&str>, revision: Option<RevisionId>) -> Option<&Arc<Vertex>> {
        let revisions = self.editions.get(self.resolve_edition(edition))?;
        match revision {
            Some(r) => revisions.get(&r),
            None => revisions.values().next_back(),
        }
    }

    /// Appends every snapshot selected by the filters to `out`.
    fn collect(
        &self,
        editions: &EditionFilter,
        revisions: &RevisionFilter,
        out: &mut VecDeque<Arc<Vertex>>,
    ) {
        for (name, revs) in &self.editions {
            if !editions.selects(name, &self.default_edition) {
                continue;
            }
            let Some(&latest) = revs.keys().next_back() else {
                continue;
            };
            if revisions.is_latest() {
                if let Some(v) = revs.get(&latest) {
                    out.push_back(Arc::clone(v));
                }
                continue;
            }
            out.extend(
                revs.iter()
                    .filter(|(r, _)| revisions.selects(**r, latest))
                    .map(|(_, v)| Arc::clone(v)),
            );
        }
    }

    /// Drops empty editions and repairs the default edition.
    ///
    /// Returns `false` when no edition is left.
    fn settle(&mut self) -> bool {
        self.editions.retain(|_, revs| !revs.is_empty());
        if !self.editions.contains_key(self.default_edition.as_str()) {
            match self.editions.keys().next() {
                Some(first) => self.default_edition = first.clone(),
                None => return false,
            }
        }
        true
    }

    fn snapshot_count(&self) -> usize {
        self.editions.values().map(BTreeMap::len).sum()
    }
}

type TypeTable = BTreeMap<VertexId, VertexEntry>;

/// On-disk form of one vertex entry.
#[derive(Serialize, Deserialize)]
struct PersistedVertex {
    type_id: VertexTypeId,
    vertex_id: VertexId,
    default_edition: EditionName,
    editions: Vec<(EditionName, Vec<Arc<Vertex>>)>,
}

/// A [`VertexStore`] kept entirely in memory, optionally snapshotted to a
/// file on flush and restored on load.
///
/// Reads take a shared lock per call. Scans re-acquire the lock for every
/// batch, so a scan that is abandoned half way holds nothing and later
/// batches observe writes made in between.
pub struct InMemoryVertexStore {
    config: VertexStoreConfig,
    types: RwLock<FxHashMap<VertexTypeId, TypeTable>>,
    clock: RevisionClock,
    phase: PhaseTracker,
}

impl InMemoryVertexStore {
    /// Creates an empty, non-persistent store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(VertexStoreConfig::default())
    }

    /// Creates an empty store with custom configuration.
    #[must_use]
    pub fn with_config(config: VertexStoreConfig) -> Self {
        Self {
            config,
            types: RwLock::new(FxHashMap::default()),
            clock: RevisionClock::new(),
            phase: PhaseTracker::new("vertex store"),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &VertexStoreConfig {
        &self.config
    }

    /// Returns the total number of stored snapshots across all types.
    #[must_use]
    pub fn snapshot_count(&self) -> usize {
        self.types
            .read()
            .values()
            .flat_map(BTreeMap::values)
            .map(VertexEntry::snapshot_count)
            .sum()
    }

    fn scan(
        &self,
        type_id: VertexTypeId,
        vertex_ids: Option<Vec<VertexId>>,
        editions: EditionFilter,
        revisions: RevisionFilter,
    ) -> TypeScan<'_> {
        let ids = vertex_ids.map(|mut ids| {
            ids.sort_unstable();
            ids.dedup();
            ids
        });
        TypeScan {
            store: self,
            type_id,
            ids,
            position: 0,
            cursor: None,
            editions,
            revisions,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    /// Runs `f` on the entry of one vertex, removing the vertex if `f`
    /// leaves it without editions. Returns `f`'s result, or `false` if the
    /// vertex does not exist.
    fn modify_entry(
        &self,
        type_id: VertexTypeId,
        vertex_id: VertexId,
        f: impl FnOnce(&mut VertexEntry) -> bool,
    ) -> bool {
        let mut types = self.types.write();
        let Some(table) = types.get_mut(&type_id) else {
            return false;
        };
        let Some(entry) = table.get_mut(&vertex_id) else {
            return false;
        };
        let changed = f(entry);
        if changed && !entry.settle() {
            table.remove(&vertex_id);
            if table.is_empty() {
                types.remove(&type_id);
            }
        }
        changed
    }

    fn export(&self) -> Vec<PersistedVertex> {
        let types = self.types.read();
        let mut type_ids: Vec<_> = types.keys().copied().collect();
        type_ids.sort_unstable();
        let mut out = Vec::new();
        for type_id in type_ids {
            let Some(table) = types.get(&type_id) else {
                continue;
            };
            for (vertex_id, entry) in table {
                out.push(PersistedVertex {
                    type_id,
                    vertex_id: *vertex_id,
                    default_edition: entry.default_edition.clone(),
                    editions: entry
                        .editions
                        .iter()
                        .map(|(name, revs)| (name.clone(), revs.values().cloned().collect()))
                        .collect(),
                });
            }
        }
        out
    }

    fn import(&self, persisted: Vec<PersistedVertex>) -> usize {
        let mut types = self.types.write();
        let count = persisted.len();
        for record in persisted {
            let mut editions = IndexMap::with_capacity(record.editions.len());
            for (name, snapshots) in record.editions {
                let revs: Revisions = snapshots
                    .into_iter()
                    .map(|v| {
                        self.clock.observe(v.revision());
                        (v.revision(), v)
                    })
                    .collect();
                editions.insert(name, revs);
            }
            let mut entry = VertexEntry {
                default_edition: record.default_edition,
                editions,
            };
            if entry.settle() {
                types
                    .entry(record.type_id)
                    .or_default()
                    .insert(record.vertex_id, entry);
            }
        }
        count
    }
}

impl Default for InMemoryVertexStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VertexStore for InMemoryVertexStore {
    fn is_persistent(&self) -> bool {
        self.config.snapshot_path.is_some()
    }

    fn has_revisions(&self) -> bool {
        true
    }

    fn has_editions(&self) -> bool {
        true
    }

    fn startup_phase(&self) -> Phase {
        self.phase.get()
    }

    fn get_vertex(
        &self,
        _ctx: &AccessContext,
        type_id: VertexTypeId,
        vertex_id: VertexId,
        edition: Option<&str>,
        revision: Option<RevisionId>,
    ) -> Option<Arc<Vertex>> {
        let types = self.types.read();
        types
            .get(&type_id)?
            .get(&vertex_id)?
            .resolve(edition, revision)
            .cloned()
    }

    fn get_all_vertices<'a>(
        &'a self,
        _ctx: &AccessContext,
        filter: &VertexFilter,
    ) -> VertexIter<'a> {
        let type_ids = match &filter.type_ids {
            Some(ids) => ids.clone(),
            None => {
                let mut ids: Vec<_> = self.types.read().keys().copied().collect();
                ids.sort_unstable();
                ids
            }
        };
        let vertex_ids = filter.vertex_ids.clone();
        let editions = filter.edition_filter();
        let revisions = filter.revision_filter();
        Box::new(type_ids.into_iter().flat_map(move |type_id| {
            self.scan(type_id, vertex_ids.clone(), editions.clone(), revisions.clone())
        }))
    }

    fn get_vertices_by_type_id<'a>(
        &'a self,
        _ctx: &AccessContext,
        type_id: VertexTypeId,
        vertex_ids: Option<&[VertexId]>,
        editions: &EditionFilter,
        revisions: &RevisionFilter,
    ) -> VertexIter<'a> {
        Box::new(self.scan(
            type_id,
            vertex_ids.map(<[VertexId]>::to_vec),
            editions.clone(),
            revisions.clone(),
        ))
    }

    fn get_vertex_editions(
        &self,
        _ctx: &AccessContext,
        type_id: VertexTypeId,
        vertex_id: VertexId,
    ) -> Vec<EditionName> {
        let types = self.types.read();
        types
            .get(&type_id)
            .and_then(|t| t.get(&vertex_id))
            .map(|entry| entry.editions.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn get_default_edition(
        &self,
        _ctx: &AccessContext,
        type_id: VertexTypeId,
        vertex_id: VertexId,
    ) -> Option<EditionName> {
        let types = self.types.read();
        types
            .get(&type_id)?
            .get(&vertex_id)
            .map(|entry| entry.default_edition.clone())
    }

    fn get_vertex_revision_ids(
        &self,
        _ctx: &AccessContext,
        type_id: VertexTypeId,
        vertex_id: VertexId,
        editions: Option<&[EditionName]>,
    ) -> Vec<RevisionId> {
        let types = self.types.read();
        let Some(entry) = types.get(&type_id).and_then(|t| t.get(&vertex_id)) else {
            return Vec::new();
        };
        match editions {
            None => entry
                .editions
                .values()
                .flat_map(|revs| revs.keys().copied())
                .collect(),
            Some(names) => names
                .iter()
                .filter_map(|name| entry.editions.get(name))
                .flat_map(|revs| revs.keys().copied())
                .collect(),
        }
    }

    fn add_vertex(
        &self,
        _ctx: &AccessContext,
        vertex: Vertex,
        edition: Option<&str>,
        revision: Option<RevisionId>,
    ) -> bool {
        let type_id = vertex.type_id();
        let vertex_id = vertex.vertex_id();
        let mut types = self.types.write();
        let table = types.entry(type_id).or_default();

        let Some(entry) = table.get_mut(&vertex_id) else {
            let name = edition.map_or_else(EditionName::default_edition, EditionName::from);
            let revision = match revision {
                Some(r) => {
                    self.clock.observe(r);
                    r
                }
                None => self.clock.next(),
            };
            let mut editions = IndexMap::new();
            let mut revs = Revisions::new();
            revs.insert(revision, Arc::new(vertex.placed(name.clone(), revision)));
            editions.insert(name.clone(), revs);
            table.insert(
                vertex_id,
                VertexEntry {
                    default_edition: name,
                    editions,
                },
            );
            return true;
        };

        let name = EditionName::from(entry.resolve_edition(edition));
        match (entry.editions.get_mut(name.as_str()), revision) {
            (Some(_), None) => false,
            (Some(revs), Some(r)) => {
                if revs.contains_key(&r) {
                    return false;
                }
                self.clock.observe(r);
                revs.insert(r, Arc::new(vertex.placed(name, r)));
                true
            }
            (None, revision) => {
                let r = match revision {
                    Some(r) => {
                        self.clock.observe(r);
                        r
                    }
                    None => self.clock.next(),
                };
                let mut revs = Revisions::new();
                revs.insert(r, Arc::new(vertex.placed(name.clone(), r)));
                entry.editions.insert(name, revs);
                true
            }
        }
    }

    fn update_vertex(
        &self,
        _ctx: &AccessContext,
        type_id: VertexTypeId,
        vertex_id: VertexId,
        update: &VertexUpdate,
        edition: Option<&str>,
        revision: Option<RevisionId>,
        create_new_revision: bool,
    ) -> Option<Arc<Vertex>> {
        let mut types = self.types.write();
        let entry = types.get_mut(&type_id)?.get_mut(&vertex_id)?;
        let name = EditionName::from(entry.resolve_edition(edition));
        let revs = entry.editions.get_mut(name.as_str())?;
        let base = match revision {
            Some(r) => revs.get(&r)?,
            None => revs.values().next_back()?,
        };

        let base_revision = base.revision();
        let next = update.apply(base);
        let target = if create_new_revision {
            let latest = revs.keys().next_back().copied().unwrap_or(base_revision);
            self.clock.next_after(latest)
        } else {
            base_revision
        };
        let written = Arc::new(next.placed(name, target));
        revs.insert(target, Arc::clone(&written));
        Some(written)
    }

    fn remove_vertex_revision(
        &self,
        _ctx: &AccessContext,
        type_id: VertexTypeId,
        vertex_id: VertexId,
        editions: Option<&[EditionName]>,
        revisions: Option<&[RevisionId]>,
    ) -> bool {
        self.modify_entry(type_id, vertex_id, |entry| {
            let mut removed = false;
            for (name, revs) in &mut entry.editions {
                if editions.is_some_and(|names| !names.contains(name)) {
                    continue;
                }
                match revisions {
                    None => {
                        removed |= !revs.is_empty();
                        revs.clear();
                    }
                    Some(ids) => {
                        for id in ids {
                            removed |= revs.remove(id).is_some();
                        }
                    }
                }
            }
            removed
        })
    }

    fn remove_vertex_edition(
        &self,
        _ctx: &AccessContext,
        type_id: VertexTypeId,
        vertex_id: VertexId,
        editions: Option<&[EditionName]>,
    ) -> bool {
        self.modify_entry(type_id, vertex_id, |entry| {
            let before = entry.editions.len();
            match editions {
                None => entry.editions.clear(),
                Some(names) => entry.editions.retain(|name, _| !names.contains(name)),
            }
            entry.editions.len() != before
        })
    }

    fn remove_vertex(
        &self,
        _ctx: &AccessContext,
        type_id: VertexTypeId,
        vertex_id: VertexId,
    ) -> bool {
        let mut types = self.types.write();
        let Some(table) = types.get_mut(&type_id) else {
            return false;
        };
        let removed = table.remove(&vertex_id).is_some();
        if table.is_empty() {
            types.remove(&type_id);
        }
        removed
    }

    fn get_highest_vertex_id(
        &self,
        _ctx: &AccessContext,
        type_id: VertexTypeId,
    ) -> Option<VertexId> {
        let types = self.types.read();
        types.get(&type_id)?.keys().next_back().copied()
    }

    fn vertex_types(&self, _ctx: &AccessContext) -> Vec<VertexTypeId> {
        let mut ids: Vec<_> = self.types.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn vertex_count(&self, _ctx: &AccessContext, type_id: VertexTypeId) -> usize {
        self.types.read().get(&type_id).map_or(0, BTreeMap::len)
    }

    fn wipe(&self, _ctx: &AccessContext) {
        self.types.write().clear();
        tracing::debug!("vertex store wiped");
    }
}

impl Lifecycle for InMemoryVertexStore {
    fn initialize(&self) -> Result<()> {
        self.phase
            .advance(Phase::Created, Phase::Initialized, "initialize")?;
        tracing::debug!(persistent = self.is_persistent(), "vertex store initialized");
        Ok(())
    }

    fn load(&self, _ctx: &AccessContext) -> Result<()> {
        if self.phase.get() != Phase::Initialized {
            return Err(LifecycleError::InvalidTransition {
                component: "vertex store",
                action: "load",
                phase: self.phase.get().name(),
            }
            .into());
        }
        let mut loaded = 0;
        if let Some(path) = &self.config.snapshot_path {
            let persisted: Option<Vec<PersistedVertex>> =
                snapshot::read(path, SnapshotKind::Vertices)?;
            if let Some(persisted) = persisted {
                loaded = self.import(persisted);
            }
        }
        self.phase.advance(Phase::Initialized, Phase::Loaded, "load")?;
        tracing::info!(vertices = loaded, "vertex store loaded");
        Ok(())
    }

    fn flush(&self, _ctx: &AccessContext) -> Result<()> {
        let Some(path) = &self.config.snapshot_path else {
            return Ok(());
        };
        if self.phase.get() != Phase::Loaded {
            tracing::debug!(phase = %self.phase.get(), "skipping flush of unloaded vertex store");
            return Ok(());
        }
        let persisted = self.export();
        let count = persisted.len();
        snapshot::write(path, SnapshotKind::Vertices, &persisted)?;
        tracing::debug!(vertices = count, path = %path.display(), "vertex store flushed");
        Ok(())
    }

    fn phase(&self) -> Phase {
        self.phase.get()
    }
}

/// Lazy scan over one vertex type.
///
/// Walks vertex ids in ascending order, materializing up to
/// `scan_batch_size` vertices per lock acquisition and resuming after the
/// last visited id.
struct TypeScan<'a> {
    store: &'a InMemoryVertexStore,
    type_id: VertexTypeId,
    /// Sorted, deduplicated id restriction.
    ids: Option<Vec<VertexId>>,
    position: usize,
    cursor: Option<VertexId>,
    editions: EditionFilter,
    revisions: RevisionFilter,
    buffer: VecDeque<Arc<Vertex>>,
    done: bool,
}

impl TypeScan<'_> {
    fn fill(&mut self) {
        let batch = self.store.config.scan_batch_size.max(1);
        let types = self.store.types.read();
        let Some(table) = types.get(&self.type_id) else {
            self.done = true;
            return;
        };

        match &self.ids {
            Some(ids) => {
                let end = (self.position + batch).min(ids.len());
                for id in &ids[self.position..end] {
                    if let Some(entry) = table.get(id) {
                        entry.collect(&self.editions, &self.revisions, &mut self.buffer);
                    }
                }
                self.position = end;
                if end == ids.len() {
                    self.done = true;
                }
            }
            None => {
                let lower = match self.cursor {
                    Some(last) => Bound::Excluded(last),
                    None => Bound::Unbounded,
                };
                let mut visited = 0;
                for (id, entry) in table.range((lower, Bound::Unbounded)).take(batch) {
                    entry.collect(&self.editions, &self.revisions, &mut self.buffer);
                    self.cursor = Some(*id);
                    visited += 1;
                }
                if visited < batch {
                    self.done = true;
                }
            }
        }
    }
}

impl Iterator for TypeScan<'_> {
    type Item = Arc<Vertex>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(v) = self.buffer.pop_front() {
                return Some(v);
            }
            if self.done {
                return None;
            }
            self.fill();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revgraph_common::types::{AttributeId, SecurityToken, TransactionToken, Value};

    const PERSON: VertexTypeId = VertexTypeId::new(1);
    const AGE: AttributeId = AttributeId::new(2);

    fn ctx() -> AccessContext {
        AccessContext::new(SecurityToken::new(1), TransactionToken::new(1))
    }

    fn person(id: u64, age: i64) -> Vertex {
        Vertex::new(PERSON, VertexId::new(id)).with_property(AGE, age)
    }

    fn age_of(v: &Vertex) -> Option<i64> {
        v.property(AGE).and_then(Value::as_int64)
    }

    #[test]
    fn test_add_and_get_defaults() {
        let store = InMemoryVertexStore::new();
        assert!(store.add_vertex(&ctx(), person(1, 30), None, None));

        let v = store.get_vertex(&ctx(), PERSON, VertexId::new(1), None, None).unwrap();
        assert_eq!(v.edition(), "default");
        assert_eq!(age_of(&v), Some(30));
        assert_eq!(
            store.get_default_edition(&ctx(), PERSON, VertexId::new(1)),
            Some(EditionName::from("default"))
        );
    }

    #[test]
    fn test_add_existing_edition_without_revision_fails() {
        let store = InMemoryVertexStore::new();
        assert!(store.add_vertex(&ctx(), person(1, 30), None, None));
        assert!(!store.add_vertex(&ctx(), person(1, 31), None, None));
        assert!(!store.add_vertex(&ctx(), person(1, 31), Some("default"), None));
    }

    #[test]
    fn test_add_explicit_revision() {
        let store = InMemoryVertexStore::new();
        let r1 = RevisionId::new(100);
        let r2 = RevisionId::new(200);
        assert!(store.add_vertex(&ctx(), person(1, 30), None, Some(r1)));
        assert!(store.add_vertex(&ctx(), person(1, 31), None, Some(r2)));
        assert!(!store.add_vertex(&ctx(), person(1, 32), None, Some(r2)));

        let latest = store.get_vertex(&ctx(), PERSON, VertexId::new(1), None, None).unwrap();
        assert_eq!(latest.revision(), r2);
        let old = store.get_vertex(&ctx(), PERSON, VertexId::new(1), None, Some(r1)).unwrap();
        assert_eq!(age_of(&old), Some(30));
    }

    #[test]
    fn test_editions_and_default_resolution() {
        let store = InMemoryVertexStore::new();
        assert!(store.add_vertex(&ctx(), person(1, 30), Some("en"), None));
        assert!(store.add_vertex(&ctx(), person(1, 40), Some("de"), None));

        let v = store.get_vertex(&ctx(), PERSON, VertexId::new(1), None, None).unwrap();
        assert_eq!(v.edition(), "en");
        let de = store.get_vertex(&ctx(), PERSON, VertexId::new(1), Some("de"), None).unwrap();
        assert_eq!(age_of(&de), Some(40));
        assert!(store.get_vertex(&ctx(), PERSON, VertexId::new(1), Some("fr"), None).is_none());
        assert_eq!(
            store.get_vertex_editions(&ctx(), PERSON, VertexId::new(1)),
            vec![EditionName::from("en"), EditionName::from("de")]
        );
    }

    #[test]
    fn test_update_creates_new_revision() {
        let store = InMemoryVertexStore::new();
        store.add_vertex(&ctx(), person(1, 30), None, None);
        let first = store.get_vertex(&ctx(), PERSON, VertexId::new(1), None, None).unwrap();

        let update = VertexUpdate::new().set_property(AGE, 31i64);
        let written = store
            .update_vertex(&ctx(), PERSON, VertexId::new(1), &update, None, None, true)
            .unwrap();
        assert!(written.revision() > first.revision());
        assert_eq!(age_of(&written), Some(31));

        let revisions = store.get_vertex_revision_ids(&ctx(), PERSON, VertexId::new(1), None);
        assert_eq!(revisions, vec![first.revision(), written.revision()]);
        let old = store
            .get_vertex(&ctx(), PERSON, VertexId::new(1), None, Some(first.revision()))
            .unwrap();
        assert_eq!(age_of(&old), Some(30));
    }

    #[test]
    fn test_update_in_place_keeps_revision() {
        let store = InMemoryVertexStore::new();
        store.add_vertex(&ctx(), person(1, 30), None, None);
        let update = VertexUpdate::new().set_property(AGE, 31i64);
        let written = store
            .update_vertex(&ctx(), PERSON, VertexId::new(1), &update, None, None, false)
            .unwrap();
        assert_eq!(
            store.get_vertex_revision_ids(&ctx(), PERSON, VertexId::new(1), None),
            vec![written.revision()]
        );
    }

    #[test]
    fn test_update_from_old_revision_sorts_last() {
        let store = InMemoryVertexStore::new();
        let r1 = RevisionId::new(10);
        store.add_vertex(&ctx(), person(1, 30), None, Some(r1));
        store.add_vertex(&ctx(), person(1, 35), None, Some(RevisionId::new(20)));

        let update = VertexUpdate::new().set_property(AGE, 31i64);
        let written = store
            .update_vertex(&ctx(), PERSON, VertexId::new(1), &update, None, Some(r1), true)
            .unwrap();
        assert!(written.revision() > RevisionId::new(20));
        let latest = store.get_vertex(&ctx(), PERSON, VertexId::new(1), None, None).unwrap();
        assert_eq!(age_of(&latest), Some(31));
    }

    #[test]
    fn test_update_missing_is_none() {
        let store = InMemoryVertexStore::new();
        let update = VertexUpdate::new().set_property(AGE, 1i64);
        assert!(
            store
                .update_vertex(&ctx(), PERSON, VertexId::new(9), &update, None, None, true)
                .is_none()
        );
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = InMemoryVertexStore::new();
        store.add_vertex(&ctx(), person(1, 30), None, None);
        assert!(store.remove_vertex(&ctx(), PERSON, VertexId::new(1)));
        assert!(!store.remove_vertex(&ctx(), PERSON, VertexId::new(1)));
        assert!(!store.vertex_exists(&ctx(), PERSON, VertexId::new(1), None, None));
    }

    #[test]
    fn test_remove_default_edition_moves_default() {
        let store = InMemoryVertexStore::new();
        store.add_vertex(&ctx(), person(1, 30), Some("en"), None);
        store.add_vertex(&ctx(), person(1, 40), Some("de"), None);
        store.add_vertex(&ctx(), person(1, 50), Some("fr"), None);

        let en = [EditionName::from("en")];
        assert!(store.remove_vertex_edition(&ctx(), PERSON, VertexId::new(1), Some(&en[..])));
        assert_eq!(
            store.get_default_edition(&ctx(), PERSON, VertexId::new(1)),
            Some(EditionName::from("de"))
        );
        assert!(!store.remove_vertex_edition(&ctx(), PERSON, VertexId::new(1), Some(&en[..])));
    }

    #[test]
    fn test_removing_last_revision_cascades() {
        let store = InMemoryVertexStore::new();
        store.add_vertex(&ctx(), person(1, 30), Some("en"), None);
        store.add_vertex(&ctx(), person(1, 40), Some("de"), None);

        let en = [EditionName::from("en")];
        let one = VertexId::new(1);
        assert!(store.remove_vertex_revision(&ctx(), PERSON, one, Some(&en[..]), None));
        assert_eq!(
            store.get_vertex_editions(&ctx(), PERSON, VertexId::new(1)),
            vec![EditionName::from("de")]
        );

        let revs = store.get_vertex_revision_ids(&ctx(), PERSON, VertexId::new(1), None);
        assert!(store.remove_vertex_revision(
            &ctx(),
            PERSON,
            VertexId::new(1),
            None,
            Some(revs.as_slice())
        ));
        assert_eq!(store.vertex_count(&ctx(), PERSON), 0);
        assert!(store.get_highest_vertex_id(&ctx(), PERSON).is_none());
    }

    #[test]
    fn test_highest_vertex_id() {
        let store = InMemoryVertexStore::new();
        assert!(store.get_highest_vertex_id(&ctx(), PERSON).is_none());
        store.add_vertex(&ctx(), person(3, 1), None, None);
        store.add_vertex(&ctx(), person(17, 1), Some("de"), None);
        store.add_vertex(&ctx(), person(5, 1), None, None);
        assert_eq!(store.get_highest_vertex_id(&ctx(), PERSON), Some(VertexId::new(17)));
    }

    #[test]
    fn test_scan_filters() {
        let config = VertexStoreConfig::default().with_scan_batch_size(2);
        let store = InMemoryVertexStore::with_config(config);
        for id in 1..=5 {
            store.add_vertex(&ctx(), person(id, id as i64), None, None);
        }
        let update = VertexUpdate::new().set_property(AGE, 100i64);
        store.update_vertex(&ctx(), PERSON, VertexId::new(2), &update, None, None, true);
        store.add_vertex(&ctx(), person(3, 33), Some("de"), None);

        let latest: Vec<_> = store
            .get_vertices_by_type_id(
                &ctx(),
                PERSON,
                None,
                &EditionFilter::Default,
                &RevisionFilter::Latest,
            )
            .map(|v| age_of(&v).unwrap())
            .collect();
        assert_eq!(latest, vec![1, 100, 3, 4, 5]);

        let all_revisions = store
            .get_vertices_by_type_id(
                &ctx(),
                PERSON,
                None,
                &EditionFilter::Default,
                &RevisionFilter::All,
            )
            .count();
        assert_eq!(all_revisions, 6);

        let everything = store
            .get_vertices_by_type_id(
                &ctx(),
                PERSON,
                None,
                &EditionFilter::All,
                &RevisionFilter::All,
            )
            .count();
        assert_eq!(everything, 7);

        let subset: Vec<_> = store
            .get_vertices_by_type_id(
                &ctx(),
                PERSON,
                Some(&[4, 1, 4, 99].map(VertexId::new)[..]),
                &EditionFilter::Default,
                &RevisionFilter::Latest,
            )
            .map(|v| v.vertex_id())
            .collect();
        assert_eq!(subset, vec![VertexId::new(1), VertexId::new(4)]);
    }

    #[test]
    fn test_get_all_vertices_conjunction() {
        let store = InMemoryVertexStore::new();
        let other = VertexTypeId::new(2);
        store.add_vertex(&ctx(), person(1, 10), None, None);
        store.add_vertex(&ctx(), person(1, 11), Some("de"), None);
        store.add_vertex(&ctx(), Vertex::new(other, VertexId::new(1)), None, None);

        assert_eq!(store.get_all_vertices(&ctx(), &VertexFilter::new()).count(), 3);
        let filter = VertexFilter::new().with_types([PERSON]).with_editions(["de"]);
        let hits: Vec<_> = store.get_all_vertices(&ctx(), &filter).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(age_of(&hits[0]), Some(11));
    }

    #[test]
    fn test_scan_sees_writes_between_batches() {
        let config = VertexStoreConfig::default().with_scan_batch_size(1);
        let store = InMemoryVertexStore::with_config(config);
        store.add_vertex(&ctx(), person(1, 1), None, None);
        store.add_vertex(&ctx(), person(2, 2), None, None);

        let mut scan = store.get_vertices_by_type_id(
            &ctx(),
            PERSON,
            None,
            &EditionFilter::Default,
            &RevisionFilter::Latest,
        );
        assert_eq!(scan.next().map(|v| v.vertex_id()), Some(VertexId::new(1)));
        store.add_vertex(&ctx(), person(3, 3), None, None);
        let rest: Vec<_> = scan.map(|v| v.vertex_id()).collect();
        assert_eq!(rest, vec![VertexId::new(2), VertexId::new(3)]);
    }

    #[test]
    fn test_edition_predicate_called_per_candidate() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let store = InMemoryVertexStore::new();
        for id in 1..=4 {
            store.add_vertex(&ctx(), person(id, 0), None, None);
        }
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let filter = EditionFilter::predicate(move |_| {
            seen.fetch_add(1, Ordering::Relaxed);
            true
        });
        let count = store
            .get_vertices_by_type_id(&ctx(), PERSON, None, &filter, &RevisionFilter::Latest)
            .count();
        assert_eq!(count, 4);
        assert_eq!(calls.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn test_wipe() {
        let store = InMemoryVertexStore::new();
        store.add_vertex(&ctx(), person(1, 1), None, None);
        store.wipe(&ctx());
        assert!(store.vertex_types(&ctx()).is_empty());
    }

    #[test]
    fn test_lifecycle_order_enforced() {
        let store = InMemoryVertexStore::new();
        assert!(store.load(&ctx()).is_err());
        store.initialize().unwrap();
        store.load(&ctx()).unwrap();
        assert_eq!(store.phase(), Phase::Loaded);
        assert!(store.initialize().is_err());
    }

    #[test]
    fn test_snapshot_reload() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            VertexStoreConfig::default().with_snapshot_path(dir.path().join("vertices.snap"));

        let store = InMemoryVertexStore::with_config(config.clone());
        store.initialize().unwrap();
        store.load(&ctx()).unwrap();
        store.add_vertex(&ctx(), person(1, 30), Some("en"), None);
        store.add_vertex(&ctx(), person(1, 40), Some("de"), None);
        store.add_vertex(&ctx(), person(7, 50), None, None);
        let revs_before = store.get_vertex_revision_ids(&ctx(), PERSON, VertexId::new(1), None);
        store.flush(&ctx()).unwrap();

        let reopened = InMemoryVertexStore::with_config(config);
        reopened.initialize().unwrap();
        reopened.load(&ctx()).unwrap();
        assert!(reopened.is_persistent());
        assert_eq!(reopened.get_highest_vertex_id(&ctx(), PERSON), Some(VertexId::new(7)));
        assert_eq!(
            reopened.get_default_edition(&ctx(), PERSON, VertexId::new(1)),
            Some(EditionName::from("en"))
        );
        assert_eq!(
            reopened.get_vertex_revision_ids(&ctx(), PERSON, VertexId::new(1), None),
            revs_before
        );
        let de = reopened.get_vertex(&ctx(), PERSON, VertexId::new(1), Some("de"), None).unwrap();
        assert_eq!(age_of(&de), Some(40));
    }
}
