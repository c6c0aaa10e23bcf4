//! The meta manager: startup orchestration and the write path.

use crate::config::{Config, IndexConsistency};
use crate::ids::IdManager;
use crate::security::SecurityManager;
use crate::transaction::TransactionManager;
use revgraph_common::types::{
    AccessContext, AttributeId, EditionName, RevisionId, SecurityToken, TransactionToken, Value,
    VertexId, VertexInformation, VertexTypeId,
};
use revgraph_common::utils::error::{Error, LifecycleError, Result};
use revgraph_core::execution::{PendingIndexUpdates, PlanContext, QueryPlanProperty};
use revgraph_core::graph::{
    InMemoryVertexStore, Vertex, VertexStore, VertexStoreConfig, VertexUpdate,
};
use revgraph_core::index::{IndexManager, IndexManagerConfig};
use revgraph_core::lifecycle::Lifecycle;
use revgraph_core::schema::TypeLookup;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// File name of the vertex snapshot inside the data directory.
pub const VERTEX_SNAPSHOT: &str = "vertices.snap";

/// File name of the index definitions inside the data directory.
pub const INDEX_SNAPSHOT: &str = "indices.snap";

/// Owns the store and everything around it.
///
/// [`MetaManager::create`] runs the whole startup sequence: both
/// components are initialized, then loaded (store first, since indices are
/// rebuilt from it), declared indices are created and every id counter is
/// seeded from the store. Only then are writes and plan contexts served.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use revgraph_common::types::{AttributeId, LogicalType, VertexTypeId};
/// use revgraph_core::QueryPlan;
/// use revgraph_core::schema::TypeCatalog;
/// use revgraph_engine::{Config, MetaManager};
///
/// let person = VertexTypeId::new(1);
/// let age = AttributeId::new(1);
/// let catalog = Arc::new(TypeCatalog::new());
/// catalog.define_vertex_type(person, "Person", None).unwrap();
/// catalog.define_attribute(person, age, "age", LogicalType::Int64).unwrap();
///
/// let manager = MetaManager::create(Config::in_memory(), catalog).unwrap();
/// let security = manager.security_manager().issue();
/// let tx = manager.begin_transaction(security).unwrap();
/// manager.create_vertex(security, tx, person, [(age, 30i64.into())], None).unwrap();
///
/// let ctx = manager.plan_context(security, tx, false).unwrap();
/// let property = manager.property(person, age).unwrap();
/// let plan = QueryPlan::greater_than(&ctx, property, 18i64).unwrap();
/// assert_eq!(plan.execute().count(), 1);
/// manager.commit_transaction(security, tx).unwrap();
/// ```
pub struct MetaManager {
    config: Config,
    types: Arc<dyn TypeLookup>,
    store: Arc<InMemoryVertexStore>,
    indices: Arc<IndexManager>,
    ids: IdManager,
    transactions: Arc<TransactionManager>,
    security: SecurityManager,
    ready: AtomicBool,
    closed: AtomicBool,
}

impl MetaManager {
    /// Builds every component and runs startup.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration, unreadable snapshots, or a declared
    /// index that cannot be created. Startup is aborted as a whole.
    pub fn create(config: Config, types: Arc<dyn TypeLookup>) -> Result<Self> {
        config.validate()?;

        let mut store_config =
            VertexStoreConfig::default().with_scan_batch_size(config.scan_batch_size);
        let mut index_config = IndexManagerConfig::default();
        if let Some(path) = &config.path {
            std::fs::create_dir_all(path)?;
            store_config = store_config.with_snapshot_path(path.join(VERTEX_SNAPSHOT));
            index_config = index_config.with_snapshot_path(path.join(INDEX_SNAPSHOT));
        }
        let store = Arc::new(InMemoryVertexStore::with_config(store_config));
        let indices = Arc::new(IndexManager::with_config(store.clone(), index_config));

        let manager = Self {
            config,
            types,
            store,
            indices,
            ids: IdManager::new(),
            transactions: Arc::new(TransactionManager::new()),
            security: SecurityManager::new(),
            ready: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        };

        let system = manager.security.system_token();
        let tx = manager.transactions.begin(system);
        let ctx = AccessContext::new(system, tx);
        if let Err(err) = manager.startup(&ctx) {
            // Nothing was loaded completely, so there is nothing to flush.
            manager.closed.store(true, Ordering::Release);
            if let Err(abort) = manager.transactions.abort(tx) {
                tracing::warn!(error = %abort, "failed to abort startup transaction");
            }
            tracing::error!(error = %err, "startup aborted");
            return Err(err);
        }
        manager.transactions.commit(tx)?;
        manager.ready.store(true, Ordering::Release);
        Ok(manager)
    }

    fn startup(&self, ctx: &AccessContext) -> Result<()> {
        self.store.initialize()?;
        self.indices.initialize()?;

        self.store.load(ctx)?;
        self.indices.load(ctx)?;

        for definition in &self.config.indices {
            if self.indices.index(&definition.name).is_none() {
                self.indices.create_index(ctx, definition.clone())?;
            }
        }

        let types: BTreeSet<VertexTypeId> = self
            .types
            .vertex_types()
            .into_iter()
            .chain(self.store.vertex_types(ctx))
            .collect();
        for &vertex_type in &types {
            self.seed(ctx, vertex_type);
        }

        tracing::info!(
            vertex_types = types.len(),
            indices = self.indices.index_definitions().len(),
            persistent = self.config.path.is_some(),
            "meta manager started"
        );
        Ok(())
    }

    fn seed(&self, ctx: &AccessContext, vertex_type: VertexTypeId) {
        let highest = self.store.get_highest_vertex_id(ctx, vertex_type);
        self.ids.seed(vertex_type, highest);
    }

    /// Seeds the id counter of a vertex type defined after startup.
    ///
    /// # Errors
    ///
    /// Fails if the manager is not ready.
    pub fn register_vertex_type(&self, vertex_type: VertexTypeId) -> Result<()> {
        self.ensure_ready()?;
        let system = self.security.system_token();
        let ctx = AccessContext::new(system, TransactionToken::new(0));
        self.seed(&ctx, vertex_type);
        Ok(())
    }

    /// Returns `true` once startup has completed and until close.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire) && !self.closed.load(Ordering::Acquire)
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(LifecycleError::NotReady("meta manager").into())
        }
    }

    fn access(&self, security: SecurityToken, tx: TransactionToken) -> Result<AccessContext> {
        self.ensure_ready()?;
        self.security.validate(security)?;
        self.transactions.ensure_active(tx)?;
        Ok(AccessContext::new(security, tx))
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the vertex store.
    #[must_use]
    pub fn vertex_store(&self) -> Arc<dyn VertexStore> {
        self.store.clone()
    }

    /// Returns the index manager.
    #[must_use]
    pub fn index_manager(&self) -> &Arc<IndexManager> {
        &self.indices
    }

    /// Returns the id manager.
    #[must_use]
    pub fn id_manager(&self) -> &IdManager {
        &self.ids
    }

    /// Returns the transaction manager.
    #[must_use]
    pub fn transaction_manager(&self) -> &TransactionManager {
        &self.transactions
    }

    /// Returns the security manager.
    #[must_use]
    pub fn security_manager(&self) -> &SecurityManager {
        &self.security
    }

    /// Returns the type lookup.
    #[must_use]
    pub fn types(&self) -> &Arc<dyn TypeLookup> {
        &self.types
    }

    // === Transactions ===

    /// Begins a transaction.
    ///
    /// # Errors
    ///
    /// Fails for invalid tokens or before startup completed.
    pub fn begin_transaction(&self, security: SecurityToken) -> Result<TransactionToken> {
        self.ensure_ready()?;
        self.security.validate(security)?;
        Ok(self.transactions.begin(security))
    }

    /// Commits a transaction, re-indexing what it touched under deferred
    /// consistency.
    ///
    /// # Errors
    ///
    /// Fails for invalid tokens or inactive transactions.
    pub fn commit_transaction(&self, security: SecurityToken, tx: TransactionToken) -> Result<()> {
        self.security.validate(security)?;
        // Indices catch up while the transaction still counts as pending,
        // so no reader sees the indices before they hold its writes.
        let touched = self.transactions.pending(tx)?;
        self.catch_up(AccessContext::new(security, tx), &touched);
        self.transactions.commit(tx)?;
        Ok(())
    }

    /// Aborts a transaction.
    ///
    /// Store writes are not undone; indices are still brought in line with
    /// whatever the transaction left behind.
    ///
    /// # Errors
    ///
    /// Fails for invalid tokens or inactive transactions.
    pub fn abort_transaction(&self, security: SecurityToken, tx: TransactionToken) -> Result<()> {
        self.security.validate(security)?;
        let touched = self.transactions.pending(tx)?;
        self.catch_up(AccessContext::new(security, tx), &touched);
        self.transactions.abort(tx)?;
        Ok(())
    }

    fn catch_up(&self, ctx: AccessContext, touched: &[VertexInformation]) {
        for vertex in touched {
            self.indices
                .reindex_vertex(&ctx, vertex.type_id, vertex.vertex_id);
        }
        if !touched.is_empty() {
            tracing::debug!(
                tx = %ctx.transaction,
                vertices = touched.len(),
                "deferred re-index done"
            );
        }
    }

    fn written(&self, ctx: &AccessContext, vertex: VertexInformation) -> Result<()> {
        match self.config.index_consistency {
            IndexConsistency::Immediate => {
                self.indices
                    .reindex_vertex(ctx, vertex.type_id, vertex.vertex_id);
                Ok(())
            }
            IndexConsistency::Deferred => self.transactions.touch(ctx.transaction, vertex),
        }
    }

    // === Write path ===

    /// Adds a vertex under its own id. See [`VertexStore::add_vertex`].
    ///
    /// The type's id counter is raised past the id so later allocations
    /// cannot collide with it.
    ///
    /// # Errors
    ///
    /// Fails for invalid tokens, inactive transactions, or before startup.
    pub fn add_vertex(
        &self,
        security: SecurityToken,
        tx: TransactionToken,
        vertex: Vertex,
        edition: Option<&str>,
        revision: Option<RevisionId>,
    ) -> Result<bool> {
        let ctx = self.access(security, tx)?;
        let info = vertex.information();
        self.ids
            .vertex_type_id(info.type_id)
            .set_to_max_id(info.vertex_id.next());
        let added = self.store.add_vertex(&ctx, vertex, edition, revision);
        if added {
            self.written(&ctx, info)?;
        }
        Ok(added)
    }

    /// Creates a vertex under a freshly allocated id.
    ///
    /// # Errors
    ///
    /// Fails for invalid tokens, inactive transactions, or when the type's
    /// id counter has not been seeded.
    pub fn create_vertex(
        &self,
        security: SecurityToken,
        tx: TransactionToken,
        vertex_type: VertexTypeId,
        properties: impl IntoIterator<Item = (AttributeId, Value)>,
        edition: Option<&str>,
    ) -> Result<Arc<Vertex>> {
        let ctx = self.access(security, tx)?;
        let vertex_id = self.ids.next_id(vertex_type)?;
        let vertex = properties
            .into_iter()
            .fold(Vertex::new(vertex_type, vertex_id), |v, (attr, value)| {
                v.with_property(attr, value)
            });
        if !self.store.add_vertex(&ctx, vertex, edition, None) {
            return Err(Error::Internal(format!(
                "allocated id {vertex_id} already taken in type {vertex_type}"
            )));
        }
        self.written(&ctx, VertexInformation::new(vertex_type, vertex_id))?;
        self.store
            .get_vertex(&ctx, vertex_type, vertex_id, edition, None)
            .ok_or_else(|| Error::Internal(format!("vertex {vertex_type}:{vertex_id} vanished")))
    }

    /// Updates a vertex. See [`VertexStore::update_vertex`].
    ///
    /// # Errors
    ///
    /// Fails for invalid tokens, inactive transactions, or before startup.
    #[allow(clippy::too_many_arguments)]
    pub fn update_vertex(
        &self,
        security: SecurityToken,
        tx: TransactionToken,
        vertex_type: VertexTypeId,
        vertex_id: VertexId,
        update: &VertexUpdate,
        edition: Option<&str>,
        revision: Option<RevisionId>,
        create_new_revision: bool,
    ) -> Result<Option<Arc<Vertex>>> {
        let ctx = self.access(security, tx)?;
        let written = self.store.update_vertex(
            &ctx,
            vertex_type,
            vertex_id,
            update,
            edition,
            revision,
            create_new_revision,
        );
        if written.is_some() {
            self.written(&ctx, VertexInformation::new(vertex_type, vertex_id))?;
        }
        Ok(written)
    }

    /// Removes revisions. See [`VertexStore::remove_vertex_revision`].
    ///
    /// # Errors
    ///
    /// Fails for invalid tokens, inactive transactions, or before startup.
    pub fn remove_vertex_revision(
        &self,
        security: SecurityToken,
        tx: TransactionToken,
        vertex_type: VertexTypeId,
        vertex_id: VertexId,
        editions: Option<&[EditionName]>,
        revisions: Option<&[RevisionId]>,
    ) -> Result<bool> {
        let ctx = self.access(security, tx)?;
        let removed = self
            .store
            .remove_vertex_revision(&ctx, vertex_type, vertex_id, editions, revisions);
        if removed {
            self.written(&ctx, VertexInformation::new(vertex_type, vertex_id))?;
        }
        Ok(removed)
    }

    /// Removes editions. See [`VertexStore::remove_vertex_edition`].
    ///
    /// # Errors
    ///
    /// Fails for invalid tokens, inactive transactions, or before startup.
    pub fn remove_vertex_edition(
        &self,
        security: SecurityToken,
        tx: TransactionToken,
        vertex_type: VertexTypeId,
        vertex_id: VertexId,
        editions: Option<&[EditionName]>,
    ) -> Result<bool> {
        let ctx = self.access(security, tx)?;
        let removed = self
            .store
            .remove_vertex_edition(&ctx, vertex_type, vertex_id, editions);
        if removed {
            self.written(&ctx, VertexInformation::new(vertex_type, vertex_id))?;
        }
        Ok(removed)
    }

    /// Removes a vertex entirely.
    ///
    /// # Errors
    ///
    /// Fails for invalid tokens, inactive transactions, or before startup.
    pub fn remove_vertex(
        &self,
        security: SecurityToken,
        tx: TransactionToken,
        vertex_type: VertexTypeId,
        vertex_id: VertexId,
    ) -> Result<bool> {
        let ctx = self.access(security, tx)?;
        let removed = self.store.remove_vertex(&ctx, vertex_type, vertex_id);
        if removed {
            self.written(&ctx, VertexInformation::new(vertex_type, vertex_id))?;
        }
        Ok(removed)
    }

    // === Read path ===

    /// Returns a context for building query plans.
    ///
    /// # Errors
    ///
    /// Fails for invalid tokens, inactive transactions, or before startup.
    pub fn plan_context(
        &self,
        security: SecurityToken,
        tx: TransactionToken,
        long_running: bool,
    ) -> Result<Arc<PlanContext>> {
        self.access(security, tx)?;
        if self.config.query_logging {
            tracing::info!(security = security.as_u64(), %tx, long_running, "plan context issued");
        }
        let mut ctx = PlanContext::new(security, tx, self.vertex_store(), long_running)
            .with_indices(Arc::clone(&self.indices));
        if self.config.index_consistency == IndexConsistency::Deferred {
            // Types with uncommitted writes are scanned until their indices
            // catch up.
            let pending: Arc<dyn PendingIndexUpdates> = self.transactions.clone();
            ctx = ctx.with_pending_updates(pending);
        }
        Ok(Arc::new(ctx))
    }

    /// Resolves an attribute for use in a plan leaf.
    ///
    /// # Errors
    ///
    /// Fails if the attribute is unknown on the type.
    pub fn property(
        &self,
        vertex_type: VertexTypeId,
        attribute: AttributeId,
    ) -> Result<QueryPlanProperty> {
        QueryPlanProperty::resolve(self.types.as_ref(), vertex_type, attribute)
    }

    // === Shutdown ===

    /// Writes the store and the index definitions to disk, if persistent.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors.
    pub fn flush(&self) -> Result<()> {
        if self.config.path.is_none() {
            return Ok(());
        }
        let system = self.security.system_token();
        let ctx = AccessContext::new(system, TransactionToken::new(0));
        self.store.flush(&ctx)?;
        self.indices.flush(&ctx)?;
        tracing::debug!("meta manager flushed");
        Ok(())
    }

    /// Flushes and stops serving requests. Further calls are no-ops.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let active = self.transactions.active_count();
        if active > 0 {
            tracing::warn!(active, "closing with active transactions");
        }
        self.flush()
    }
}

impl Drop for MetaManager {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::error!(error = %err, "failed to flush on drop");
        }
    }
}
