//! Shared state of one query plan.

use crate::graph::VertexStore;
use crate::index::IndexManager;
use revgraph_common::types::{AccessContext, SecurityToken, TransactionToken, VertexTypeId};
use std::fmt;
use std::sync::Arc;

/// Index candidates resolved per store call for interactive queries.
const SHORT_BATCH: usize = 64;

/// Index candidates resolved per store call for long-running queries.
const LONG_BATCH: usize = 1024;

/// Reports vertex types whose store writes the indices have not caught up
/// with yet.
///
/// Leaves scan such types instead of trusting the indices.
pub trait PendingIndexUpdates: Send + Sync {
    /// Returns `true` if indices over `vertex_type` may miss stored values.
    fn has_pending(&self, vertex_type: VertexTypeId) -> bool;
}

/// Everything the nodes of a plan share: caller tokens, the store, the
/// optional index manager and the long-running hint.
///
/// Built once per plan and shared by every node through an `Arc`.
pub struct PlanContext {
    access: AccessContext,
    store: Arc<dyn VertexStore>,
    indices: Option<Arc<IndexManager>>,
    pending: Option<Arc<dyn PendingIndexUpdates>>,
    long_running: bool,
}

impl PlanContext {
    /// Creates a context without indices; every leaf scans.
    #[must_use]
    pub fn new(
        security: SecurityToken,
        transaction: TransactionToken,
        store: Arc<dyn VertexStore>,
        long_running: bool,
    ) -> Self {
        Self {
            access: AccessContext::new(security, transaction),
            store,
            indices: None,
            pending: None,
            long_running,
        }
    }

    /// Lets leaves use the indices of `manager`.
    #[must_use]
    pub fn with_indices(mut self, manager: Arc<IndexManager>) -> Self {
        self.indices = Some(manager);
        self
    }

    /// Consults `pending` before each index use.
    #[must_use]
    pub fn with_pending_updates(mut self, pending: Arc<dyn PendingIndexUpdates>) -> Self {
        self.pending = Some(pending);
        self
    }

    /// Returns the caller tokens.
    #[must_use]
    pub fn access(&self) -> &AccessContext {
        &self.access
    }

    /// Returns the store.
    #[must_use]
    pub fn store(&self) -> &dyn VertexStore {
        self.store.as_ref()
    }

    /// Returns the index manager, if indices may be used.
    #[must_use]
    pub fn indices(&self) -> Option<&IndexManager> {
        self.indices.as_deref()
    }

    /// Returns the index manager if its indices over `vertex_type` are
    /// current.
    #[must_use]
    pub fn indices_for(&self, vertex_type: VertexTypeId) -> Option<&IndexManager> {
        let indices = self.indices.as_deref()?;
        match &self.pending {
            Some(pending) if pending.has_pending(vertex_type) => None,
            _ => Some(indices),
        }
    }

    /// Returns `true` for plans expected to run long.
    #[must_use]
    pub fn is_long_running(&self) -> bool {
        self.long_running
    }

    /// Number of index candidates resolved per store call.
    #[must_use]
    pub fn candidate_batch_size(&self) -> usize {
        if self.long_running { LONG_BATCH } else { SHORT_BATCH }
    }
}

impl fmt::Debug for PlanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanContext")
            .field("access", &self.access)
            .field("indices", &self.indices.is_some())
            .field("tracks_pending", &self.pending.is_some())
            .field("long_running", &self.long_running)
            .finish_non_exhaustive()
    }
}
