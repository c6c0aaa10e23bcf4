//! Attribute references and the vertex extent a plan leaf ranges over.

use super::PlanContext;
use crate::graph::{EditionFilter, RevisionFilter, Vertex};
use crate::schema::{AttributeDefinition, TypeLookup};
use revgraph_common::types::{AttributeId, LogicalType, Value, VertexTypeId};
use revgraph_common::utils::error::{QueryError, Result};
use smallvec::SmallVec;
use std::fmt;

/// The set of snapshots a plan node ranges over: a vertex type with its
/// descendants, narrowed by edition and revision selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Extent {
    types: SmallVec<[VertexTypeId; 4]>,
    editions: EditionFilter,
    revisions: RevisionFilter,
}

impl Extent {
    /// Returns the vertex types, root type first.
    #[must_use]
    pub fn types(&self) -> &[VertexTypeId] {
        &self.types
    }

    /// Returns the edition selection.
    #[must_use]
    pub fn editions(&self) -> &EditionFilter {
        &self.editions
    }

    /// Returns the revision selection.
    #[must_use]
    pub fn revisions(&self) -> &RevisionFilter {
        &self.revisions
    }

    /// Returns `true` if `vertex_type` belongs to the extent.
    #[must_use]
    pub fn covers(&self, vertex_type: VertexTypeId) -> bool {
        self.types.contains(&vertex_type)
    }

    /// Returns `true` if the snapshot belongs to the extent.
    ///
    /// Consults the store only when the selection depends on the vertex's
    /// default edition or latest revision.
    #[must_use]
    pub fn contains(&self, ctx: &PlanContext, vertex: &Vertex) -> bool {
        if !self.covers(vertex.type_id()) {
            return false;
        }
        let edition_ok = match &self.editions {
            EditionFilter::Default => ctx
                .store()
                .get_default_edition(ctx.access(), vertex.type_id(), vertex.vertex_id())
                .is_some_and(|default| &default == vertex.edition()),
            other => other.selects(vertex.edition(), vertex.edition()),
        };
        if !edition_ok {
            return false;
        }
        match &self.revisions {
            RevisionFilter::Latest => ctx
                .store()
                .get_vertex(
                    ctx.access(),
                    vertex.type_id(),
                    vertex.vertex_id(),
                    Some(vertex.edition().as_str()),
                    None,
                )
                .is_some_and(|latest| latest.revision() == vertex.revision()),
            other => other.selects(vertex.revision(), vertex.revision()),
        }
    }
}

/// A resolved attribute of a vertex type, as referenced by a plan leaf.
#[derive(Debug, Clone)]
pub struct QueryPlanProperty {
    vertex_type: VertexTypeId,
    definition: AttributeDefinition,
    extent: Extent,
}

impl QueryPlanProperty {
    /// Resolves `attribute` on `vertex_type`.
    ///
    /// The extent covers the type and all its descendants, the default
    /// edition, and the latest revision.
    pub fn resolve(
        types: &dyn TypeLookup,
        vertex_type: VertexTypeId,
        attribute: AttributeId,
    ) -> Result<Self> {
        let definition = types.attribute(vertex_type, attribute).ok_or(
            QueryError::UnknownAttribute {
                vertex_type: vertex_type.as_u64(),
                attribute: attribute.as_u64(),
            },
        )?;
        let mut extent_types = types.type_extent(vertex_type);
        if extent_types.is_empty() {
            extent_types.push(vertex_type);
        }
        Ok(Self {
            vertex_type,
            definition,
            extent: Extent {
                types: extent_types,
                editions: EditionFilter::Default,
                revisions: RevisionFilter::Latest,
            },
        })
    }

    /// Selects editions.
    #[must_use]
    pub fn with_editions(mut self, editions: EditionFilter) -> Self {
        self.extent.editions = editions;
        self
    }

    /// Selects revisions.
    #[must_use]
    pub fn with_revisions(mut self, revisions: RevisionFilter) -> Self {
        self.extent.revisions = revisions;
        self
    }

    /// Returns the type the attribute was resolved on.
    #[must_use]
    pub fn vertex_type(&self) -> VertexTypeId {
        self.vertex_type
    }

    /// Returns the attribute id.
    #[must_use]
    pub fn attribute(&self) -> AttributeId {
        self.definition.id
    }

    /// Returns the declared attribute type.
    #[must_use]
    pub fn data_type(&self) -> &LogicalType {
        &self.definition.data_type
    }

    /// Returns the attribute definition.
    #[must_use]
    pub fn definition(&self) -> &AttributeDefinition {
        &self.definition
    }

    /// Returns the extent.
    #[must_use]
    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    /// Extracts the attribute value from a snapshot.
    #[must_use]
    pub fn value_of<'v>(&self, vertex: &'v Vertex) -> Option<&'v Value> {
        vertex.property(self.definition.id)
    }
}

impl fmt::Display for QueryPlanProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.vertex_type, self.definition.name)
    }
}
