//! The vertex store contract.

use super::{EditionFilter, RevisionFilter, Vertex, VertexFilter, VertexUpdate};
use crate::lifecycle::Phase;
use revgraph_common::types::{AccessContext, EditionName, RevisionId, VertexId, VertexTypeId};
use std::sync::Arc;

/// A lazy stream of vertex snapshots.
pub type VertexIter<'a> = Box<dyn Iterator<Item = Arc<Vertex>> + Send + 'a>;

/// Versioned storage of vertices addressed by
/// `(type, id, edition, revision)`.
///
/// Every call carries the caller's [`AccessContext`]; the store passes it
/// through and does not interpret it. Arguments are always ordered
/// `(type_id, vertex_id, ...)`.
///
/// Omitted editions resolve to the vertex's default edition and omitted
/// revisions to the latest revision of that edition. Missing vertices are
/// reported as `None`/`false`/empty, never as errors.
pub trait VertexStore: Send + Sync {
    /// Whether the store survives a restart.
    fn is_persistent(&self) -> bool;

    /// Whether the store keeps more than one revision per edition.
    fn has_revisions(&self) -> bool;

    /// Whether the store supports more than one edition per vertex.
    fn has_editions(&self) -> bool;

    /// Startup phase of the store. Indices are only filled from a loaded
    /// store; stores without a startup sequence are always loaded.
    fn startup_phase(&self) -> Phase {
        Phase::Loaded
    }

    /// Returns `true` if the addressed snapshot exists.
    fn vertex_exists(
        &self,
        ctx: &AccessContext,
        type_id: VertexTypeId,
        vertex_id: VertexId,
        edition: Option<&str>,
        revision: Option<RevisionId>,
    ) -> bool {
        self.get_vertex(ctx, type_id, vertex_id, edition, revision)
            .is_some()
    }

    /// Returns the addressed snapshot.
    fn get_vertex(
        &self,
        ctx: &AccessContext,
        type_id: VertexTypeId,
        vertex_id: VertexId,
        edition: Option<&str>,
        revision: Option<RevisionId>,
    ) -> Option<Arc<Vertex>>;

    /// Streams every snapshot that passes `filter`.
    fn get_all_vertices<'a>(&'a self, ctx: &AccessContext, filter: &VertexFilter) -> VertexIter<'a>;

    /// Streams the snapshots of one vertex type, optionally restricted to
    /// a set of vertex ids.
    ///
    /// This is the full-scan path of the query plan. Results are ordered by
    /// vertex id, then edition insertion order, then revision.
    fn get_vertices_by_type_id<'a>(
        &'a self,
        ctx: &AccessContext,
        type_id: VertexTypeId,
        vertex_ids: Option<&[VertexId]>,
        editions: &EditionFilter,
        revisions: &RevisionFilter,
    ) -> VertexIter<'a>;

    /// Returns the names of all editions of a vertex.
    fn get_vertex_editions(
        &self,
        ctx: &AccessContext,
        type_id: VertexTypeId,
        vertex_id: VertexId,
    ) -> Vec<EditionName>;

    /// Returns the edition used when a caller omits one.
    fn get_default_edition(
        &self,
        ctx: &AccessContext,
        type_id: VertexTypeId,
        vertex_id: VertexId,
    ) -> Option<EditionName>;

    /// Returns the revision ids of a vertex, ascending within each edition.
    ///
    /// `None` selects every edition.
    fn get_vertex_revision_ids(
        &self,
        ctx: &AccessContext,
        type_id: VertexTypeId,
        vertex_id: VertexId,
        editions: Option<&[EditionName]>,
    ) -> Vec<RevisionId>;

    /// Writes a new snapshot. Returns `false` if the address is occupied.
    ///
    /// Without a revision a new one is minted; in that case an existing
    /// edition counts as occupied, so adding never silently appends a
    /// revision. Use [`VertexStore::update_vertex`] for that.
    fn add_vertex(
        &self,
        ctx: &AccessContext,
        vertex: Vertex,
        edition: Option<&str>,
        revision: Option<RevisionId>,
    ) -> bool;

    /// Applies `update` to the addressed snapshot.
    ///
    /// With `create_new_revision` the result is stored as a new revision
    /// greater than the edition's latest one and the base is preserved;
    /// otherwise the addressed snapshot is replaced in place. Returns the
    /// written snapshot, or `None` if the address does not exist.
    #[allow(clippy::too_many_arguments)]
    fn update_vertex(
        &self,
        ctx: &AccessContext,
        type_id: VertexTypeId,
        vertex_id: VertexId,
        update: &VertexUpdate,
        edition: Option<&str>,
        revision: Option<RevisionId>,
        create_new_revision: bool,
    ) -> Option<Arc<Vertex>>;

    /// Removes revisions. `None` selects every edition or every revision.
    ///
    /// Editions left without revisions are removed, and a vertex left
    /// without editions is removed.
    fn remove_vertex_revision(
        &self,
        ctx: &AccessContext,
        type_id: VertexTypeId,
        vertex_id: VertexId,
        editions: Option<&[EditionName]>,
        revisions: Option<&[RevisionId]>,
    ) -> bool;

    /// Removes editions with all their revisions. `None` selects every edition.
    fn remove_vertex_edition(
        &self,
        ctx: &AccessContext,
        type_id: VertexTypeId,
        vertex_id: VertexId,
        editions: Option<&[EditionName]>,
    ) -> bool;

    /// Removes a vertex with all editions and revisions.
    fn remove_vertex(&self, ctx: &AccessContext, type_id: VertexTypeId, vertex_id: VertexId)
    -> bool;

    /// Returns the highest vertex id present for the type across all
    /// editions and revisions, or `None` if the type holds no vertices.
    fn get_highest_vertex_id(&self, ctx: &AccessContext, type_id: VertexTypeId)
    -> Option<VertexId>;

    /// Returns every vertex type that holds at least one vertex.
    fn vertex_types(&self, ctx: &AccessContext) -> Vec<VertexTypeId>;

    /// Returns the number of distinct vertices of a type.
    fn vertex_count(&self, ctx: &AccessContext, type_id: VertexTypeId) -> usize;

    /// Removes every vertex.
    fn wipe(&self, ctx: &AccessContext);
}
