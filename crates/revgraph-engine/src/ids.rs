//! Vertex id allocation.
//!
//! Every vertex type has its own monotonic counter. Counters start out
//! unseeded and refuse to allocate until startup has seeded them from the
//! highest id the store holds, so reloaded data never collides with new ids.

use parking_lot::RwLock;
use revgraph_common::types::{VertexId, VertexTypeId};
use revgraph_common::utils::error::{LifecycleError, Result};
use revgraph_common::utils::hash::FxHashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// A monotonic id counter.
#[derive(Debug, Default)]
pub struct UniqueId {
    next: AtomicU64,
    seeded: AtomicBool,
}

impl UniqueId {
    /// Creates an unseeded counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the next id to at least `id`. Never moves the counter back.
    pub fn set_to_max_id(&self, id: VertexId) {
        self.next.fetch_max(id.as_u64(), Ordering::AcqRel);
        self.seeded.store(true, Ordering::Release);
    }

    /// Returns `true` once the counter has been seeded.
    #[must_use]
    pub fn is_seeded(&self) -> bool {
        self.seeded.load(Ordering::Acquire)
    }

    /// Returns the id the next allocation hands out.
    #[must_use]
    pub fn peek(&self) -> VertexId {
        VertexId::new(self.next.load(Ordering::Acquire))
    }

    /// Allocates an id.
    ///
    /// # Errors
    ///
    /// Fails if the counter was never seeded.
    pub fn next_id(&self) -> Result<VertexId> {
        if !self.is_seeded() {
            return Err(LifecycleError::NotReady("vertex id counter").into());
        }
        Ok(VertexId::new(self.next.fetch_add(1, Ordering::AcqRel)))
    }
}

/// Per-type id counters.
#[derive(Debug, Default)]
pub struct IdManager {
    counters: RwLock<FxHashMap<VertexTypeId, Arc<UniqueId>>>,
}

impl IdManager {
    /// Creates a manager without counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the counter of a type, creating it unseeded if needed.
    pub fn vertex_type_id(&self, vertex_type: VertexTypeId) -> Arc<UniqueId> {
        if let Some(counter) = self.counters.read().get(&vertex_type) {
            return Arc::clone(counter);
        }
        Arc::clone(self.counters.write().entry(vertex_type).or_default())
    }

    /// Seeds the counter of a type from the highest id present, if any.
    pub fn seed(&self, vertex_type: VertexTypeId, highest: Option<VertexId>) {
        let next = highest.map_or(VertexId::new(0), VertexId::next);
        self.vertex_type_id(vertex_type).set_to_max_id(next);
        tracing::debug!(%vertex_type, next = %next, "id counter seeded");
    }

    /// Allocates an id for a type.
    ///
    /// # Errors
    ///
    /// Fails if the type's counter was never seeded.
    pub fn next_id(&self, vertex_type: VertexTypeId) -> Result<VertexId> {
        let counter = self.counters.read().get(&vertex_type).cloned();
        counter
            .ok_or(LifecycleError::NotReady("vertex id counter"))?
            .next_id()
    }

    /// Returns `true` if the type's counter has been seeded.
    #[must_use]
    pub fn is_seeded(&self, vertex_type: VertexTypeId) -> bool {
        self.counters
            .read()
            .get(&vertex_type)
            .is_some_and(|c| c.is_seeded())
    }
}
