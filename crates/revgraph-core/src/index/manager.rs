//! Index registry and maintenance.

use super::value_index::{
    BTreeValueIndex, HashValueIndex, IndexDefinition, IndexKind, VertexIndex,
};
use crate::graph::{EditionFilter, RevisionFilter, VertexStore};
use crate::lifecycle::{Lifecycle, Phase, PhaseTracker};
use crate::storage::snapshot::{self, SnapshotKind};
use indexmap::IndexMap;
use parking_lot::RwLock;
use revgraph_common::types::{AccessContext, AttributeId, Value, VertexId, VertexTypeId};
use revgraph_common::utils::error::{IndexError, LifecycleError, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for the index manager.
#[derive(Debug, Clone, Default)]
pub struct IndexManagerConfig {
    /// File holding the index definitions. Index contents are rebuilt from
    /// the store on load, so only definitions are persisted.
    pub snapshot_path: Option<PathBuf>,
}

impl IndexManagerConfig {
    /// Persists definitions to the given file.
    #[must_use]
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }
}

struct IndexSlot {
    index: Arc<dyn VertexIndex>,
    available: bool,
}

/// Owns every index and keeps them in step with the store.
///
/// An index over `(type, attribute)` holds, for each vertex of the type,
/// the attribute values of the latest revision of every edition. Stale
/// entries are harmless because the query plan re-checks live values;
/// missing entries are not, so every store write must be followed by
/// [`IndexManager::reindex_vertex`].
pub struct IndexManager {
    config: IndexManagerConfig,
    store: Arc<dyn VertexStore>,
    indices: RwLock<IndexMap<String, IndexSlot>>,
    phase: PhaseTracker,
}

impl IndexManager {
    /// Creates a manager over `store` without persistence.
    #[must_use]
    pub fn new(store: Arc<dyn VertexStore>) -> Self {
        Self::with_config(store, IndexManagerConfig::default())
    }

    /// Creates a manager with custom configuration.
    #[must_use]
    pub fn with_config(store: Arc<dyn VertexStore>, config: IndexManagerConfig) -> Self {
        Self {
            config,
            store,
            indices: RwLock::new(IndexMap::new()),
            phase: PhaseTracker::new("index manager"),
        }
    }

    /// Creates an index.
    ///
    /// Once the manager is loaded the new index is filled from the store
    /// right away; before that, filling happens during load.
    pub fn create_index(
        &self,
        ctx: &AccessContext,
        definition: IndexDefinition,
    ) -> Result<Arc<dyn VertexIndex>> {
        let index: Arc<dyn VertexIndex> = match definition.kind {
            IndexKind::Hash => Arc::new(HashValueIndex::new(definition.clone())),
            IndexKind::BTree => Arc::new(BTreeValueIndex::new(definition.clone())),
        };
        {
            let mut indices = self.indices.write();
            if indices.contains_key(&definition.name) {
                return Err(IndexError::AlreadyExists(definition.name).into());
            }
            indices.insert(
                definition.name.clone(),
                IndexSlot {
                    index: Arc::clone(&index),
                    available: true,
                },
            );
        }
        if self.phase.get() == Phase::Loaded {
            self.populate(ctx, index.as_ref());
        }
        tracing::debug!(
            name = %definition.name,
            kind = %definition.kind,
            vertex_type = %definition.vertex_type,
            attribute = %definition.attribute,
            "index created"
        );
        Ok(index)
    }

    /// Drops an index. Returns `false` if it did not exist.
    pub fn drop_index(&self, name: &str) -> bool {
        self.indices.write().shift_remove(name).is_some()
    }

    /// Returns an index by name, available or not.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<Arc<dyn VertexIndex>> {
        self.indices
            .read()
            .get(name)
            .map(|slot| Arc::clone(&slot.index))
    }

    /// Returns the definitions of every index, in creation order.
    #[must_use]
    pub fn index_definitions(&self) -> Vec<IndexDefinition> {
        self.indices
            .read()
            .values()
            .map(|slot| slot.index.definition().clone())
            .collect()
    }

    /// Marks an index available or unavailable for lookups.
    pub fn set_available(&self, name: &str, available: bool) -> Result<()> {
        let mut indices = self.indices.write();
        let slot = indices
            .get_mut(name)
            .ok_or_else(|| IndexError::NotFound(name.to_string()))?;
        slot.available = available;
        tracing::debug!(name, available, "index availability changed");
        Ok(())
    }

    /// Returns an available index over the attribute, preferring hash
    /// indices since they answer equality lookups fastest.
    #[must_use]
    pub fn try_get_index(
        &self,
        vertex_type: VertexTypeId,
        attribute: AttributeId,
    ) -> Option<Arc<dyn VertexIndex>> {
        let indices = self.indices.read();
        let mut fallback = None;
        for slot in indices.values().filter(|s| s.available) {
            let def = slot.index.definition();
            if def.vertex_type != vertex_type || def.attribute != attribute {
                continue;
            }
            if !slot.index.is_ordered() {
                return Some(Arc::clone(&slot.index));
            }
            fallback.get_or_insert_with(|| Arc::clone(&slot.index));
        }
        fallback
    }

    /// Returns an available ordered index over the attribute.
    #[must_use]
    pub fn try_get_ordered_index(
        &self,
        vertex_type: VertexTypeId,
        attribute: AttributeId,
    ) -> Option<Arc<dyn VertexIndex>> {
        self.indices
            .read()
            .values()
            .filter(|s| s.available && s.index.is_ordered())
            .map(|s| &s.index)
            .find(|index| {
                let def = index.definition();
                def.vertex_type == vertex_type && def.attribute == attribute
            })
            .cloned()
    }

    /// Brings the entries of one vertex in line with the store.
    ///
    /// Unavailable indices are maintained too, so they are consistent once
    /// made available again.
    pub fn reindex_vertex(
        &self,
        ctx: &AccessContext,
        vertex_type: VertexTypeId,
        vertex_id: VertexId,
    ) {
        let targets: Vec<Arc<dyn VertexIndex>> = self
            .indices
            .read()
            .values()
            .filter(|s| s.index.definition().vertex_type == vertex_type)
            .map(|s| Arc::clone(&s.index))
            .collect();
        if targets.is_empty() {
            return;
        }

        let snapshots: Vec<_> = self
            .store
            .get_vertices_by_type_id(
                ctx,
                vertex_type,
                Some(std::slice::from_ref(&vertex_id)),
                &EditionFilter::All,
                &RevisionFilter::Latest,
            )
            .collect();
        for index in targets {
            let attribute = index.definition().attribute;
            let values: Vec<Value> = snapshots
                .iter()
                .filter_map(|v| v.property(attribute).cloned())
                .collect();
            index.replace_vertex(vertex_id, &values);
        }
    }

    /// Refills every index from the store.
    pub fn rebuild(&self, ctx: &AccessContext) {
        let all: Vec<Arc<dyn VertexIndex>> = self
            .indices
            .read()
            .values()
            .map(|s| Arc::clone(&s.index))
            .collect();
        for index in &all {
            index.clear();
            self.populate(ctx, index.as_ref());
        }
        tracing::debug!(indices = all.len(), "indices rebuilt");
    }

    fn populate(&self, ctx: &AccessContext, index: &dyn VertexIndex) {
        let def = index.definition();
        let scan = self.store.get_vertices_by_type_id(
            ctx,
            def.vertex_type,
            None,
            &EditionFilter::All,
            &RevisionFilter::Latest,
        );
        for vertex in scan {
            if let Some(value) = vertex.property(def.attribute) {
                index.insert(value, vertex.vertex_id());
            }
        }
    }
}

impl Lifecycle for IndexManager {
    fn initialize(&self) -> Result<()> {
        self.phase
            .advance(Phase::Created, Phase::Initialized, "initialize")?;
        tracing::debug!("index manager initialized");
        Ok(())
    }

    /// Restores persisted definitions and fills every index.
    ///
    /// The vertex store must be loaded first.
    fn load(&self, ctx: &AccessContext) -> Result<()> {
        if self.phase.get() != Phase::Initialized {
            return Err(LifecycleError::InvalidTransition {
                component: "index manager",
                action: "load",
                phase: self.phase.get().name(),
            }
            .into());
        }
        let store_phase = self.store.startup_phase();
        if store_phase != Phase::Loaded {
            return Err(LifecycleError::InvalidTransition {
                component: "index manager",
                action: "load before the vertex store",
                phase: store_phase.name(),
            }
            .into());
        }
        if let Some(path) = &self.config.snapshot_path {
            let definitions: Vec<IndexDefinition> =
                snapshot::read(path, SnapshotKind::Indices)?.unwrap_or_default();
            for definition in definitions {
                if self.indices.read().contains_key(&definition.name) {
                    continue;
                }
                self.create_index(ctx, definition)?;
            }
        }
        self.phase.advance(Phase::Initialized, Phase::Loaded, "load")?;
        self.rebuild(ctx);
        tracing::info!(indices = self.indices.read().len(), "index manager loaded");
        Ok(())
    }

    fn flush(&self, _ctx: &AccessContext) -> Result<()> {
        let Some(path) = &self.config.snapshot_path else {
            return Ok(());
        };
        if self.phase.get() != Phase::Loaded {
            return Ok(());
        }
        snapshot::write(path, SnapshotKind::Indices, &self.index_definitions())
    }

    fn phase(&self) -> Phase {
        self.phase.get()
    }
}
