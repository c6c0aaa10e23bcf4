//! Vertex snapshots, their full address, and update diffs.

use revgraph_common::types::{
    AttributeId, EditionName, RevisionId, Value, VertexId, VertexInformation, VertexTypeId,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

/// Outgoing edge targets of one edge attribute.
pub type EdgeTargets = SmallVec<[VertexInformation; 2]>;

/// The full address of one stored vertex snapshot.
///
/// Ordered by type, id, edition and revision in that order.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexKey {
    /// Vertex type.
    pub type_id: VertexTypeId,
    /// Vertex id within the type.
    pub vertex_id: VertexId,
    /// Edition name.
    pub edition: EditionName,
    /// Revision within the edition.
    pub revision: RevisionId,
}

impl VertexKey {
    /// Creates a key.
    #[must_use]
    pub fn new(
        type_id: VertexTypeId,
        vertex_id: VertexId,
        edition: EditionName,
        revision: RevisionId,
    ) -> Self {
        Self {
            type_id,
            vertex_id,
            edition,
            revision,
        }
    }
}

impl fmt::Debug for VertexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VertexKey({}:{}@{}/{})",
            self.type_id, self.vertex_id, self.edition, self.revision
        )
    }
}

/// An immutable vertex snapshot.
///
/// A vertex built by a caller carries a type and id; the edition and
/// revision are assigned by the store when the snapshot is written. Stored
/// snapshots are shared as `Arc<Vertex>` and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    type_id: VertexTypeId,
    vertex_id: VertexId,
    edition: EditionName,
    revision: RevisionId,
    properties: BTreeMap<AttributeId, Value>,
    edges: BTreeMap<AttributeId, EdgeTargets>,
}

impl Vertex {
    /// Creates an empty vertex in the default edition.
    #[must_use]
    pub fn new(type_id: VertexTypeId, vertex_id: VertexId) -> Self {
        Self {
            type_id,
            vertex_id,
            edition: EditionName::default_edition(),
            revision: RevisionId::MIN,
            properties: BTreeMap::new(),
            edges: BTreeMap::new(),
        }
    }

    /// Adds a property.
    #[must_use]
    pub fn with_property(mut self, attribute: AttributeId, value: impl Into<Value>) -> Self {
        self.set_property(attribute, value);
        self
    }

    /// Adds an outgoing edge.
    #[must_use]
    pub fn with_edge(mut self, attribute: AttributeId, target: VertexInformation) -> Self {
        self.add_edge(attribute, target);
        self
    }

    /// Returns the vertex type.
    #[inline]
    #[must_use]
    pub fn type_id(&self) -> VertexTypeId {
        self.type_id
    }

    /// Returns the vertex id.
    #[inline]
    #[must_use]
    pub fn vertex_id(&self) -> VertexId {
        self.vertex_id
    }

    /// Returns the edition this snapshot belongs to.
    #[inline]
    #[must_use]
    pub fn edition(&self) -> &EditionName {
        &self.edition
    }

    /// Returns the revision of this snapshot.
    #[inline]
    #[must_use]
    pub fn revision(&self) -> RevisionId {
        self.revision
    }

    /// Returns the full address of this snapshot.
    #[must_use]
    pub fn key(&self) -> VertexKey {
        VertexKey::new(self.type_id, self.vertex_id, self.edition.clone(), self.revision)
    }

    /// Returns the type and id pair, as used for edge targets.
    #[must_use]
    pub fn information(&self) -> VertexInformation {
        VertexInformation::new(self.type_id, self.vertex_id)
    }

    /// Returns `true` if a non-null value is stored for the attribute.
    #[must_use]
    pub fn has_property(&self, attribute: AttributeId) -> bool {
        self.property(attribute).is_some()
    }

    /// Returns the value stored for the attribute, treating null as absent.
    #[must_use]
    pub fn property(&self, attribute: AttributeId) -> Option<&Value> {
        self.properties.get(&attribute).filter(|v| !v.is_null())
    }

    /// Iterates over all properties in attribute order.
    pub fn properties(&self) -> impl Iterator<Item = (AttributeId, &Value)> {
        self.properties.iter().map(|(k, v)| (*k, v))
    }

    /// Returns the edge targets of an edge attribute.
    #[must_use]
    pub fn edges(&self, attribute: AttributeId) -> &[VertexInformation] {
        self.edges.get(&attribute).map_or(&[], |targets| targets.as_slice())
    }

    /// Iterates over all edge attributes.
    pub fn all_edges(&self) -> impl Iterator<Item = (AttributeId, &[VertexInformation])> {
        self.edges.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Returns the number of stored properties.
    #[must_use]
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub(crate) fn set_property(&mut self, attribute: AttributeId, value: impl Into<Value>) {
        self.properties.insert(attribute, value.into());
    }

    pub(crate) fn add_edge(&mut self, attribute: AttributeId, target: VertexInformation) {
        let targets = self.edges.entry(attribute).or_default();
        if !targets.contains(&target) {
            targets.push(target);
        }
    }

    /// Rebinds the snapshot to a stored address.
    pub(crate) fn placed(mut self, edition: EditionName, revision: RevisionId) -> Self {
        self.edition = edition;
        self.revision = revision;
        self
    }
}

/// A diff against a stored vertex.
///
/// Applied attribute by attribute: removals first, then sets, so an
/// attribute both removed and set ends up with the new value. Attributes
/// the diff does not mention keep their current values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexUpdate {
    set_properties: BTreeMap<AttributeId, Value>,
    removed_properties: Vec<AttributeId>,
    added_edges: BTreeMap<AttributeId, EdgeTargets>,
    removed_edges: BTreeMap<AttributeId, EdgeTargets>,
    cleared_edges: Vec<AttributeId>,
}

impl VertexUpdate {
    /// Creates an empty diff.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a property value. Setting `Value::Null` removes the property.
    #[must_use]
    pub fn set_property(mut self, attribute: AttributeId, value: impl Into<Value>) -> Self {
        let value = value.into();
        if value.is_null() {
            self.set_properties.remove(&attribute);
            self.removed_properties.push(attribute);
        } else {
            self.set_properties.insert(attribute, value);
        }
        self
    }

    /// Removes a property.
    #[must_use]
    pub fn remove_property(mut self, attribute: AttributeId) -> Self {
        self.removed_properties.push(attribute);
        self
    }

    /// Adds an edge target.
    #[must_use]
    pub fn add_edge(mut self, attribute: AttributeId, target: VertexInformation) -> Self {
        self.added_edges.entry(attribute).or_default().push(target);
        self
    }

    /// Removes one edge target.
    #[must_use]
    pub fn remove_edge(mut self, attribute: AttributeId, target: VertexInformation) -> Self {
        self.removed_edges.entry(attribute).or_default().push(target);
        self
    }

    /// Removes every target of an edge attribute.
    #[must_use]
    pub fn clear_edges(mut self, attribute: AttributeId) -> Self {
        self.cleared_edges.push(attribute);
        self
    }

    /// Returns `true` if applying the diff changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set_properties.is_empty()
            && self.removed_properties.is_empty()
            && self.added_edges.is_empty()
            && self.removed_edges.is_empty()
            && self.cleared_edges.is_empty()
    }

    /// Returns the attributes whose property values this diff touches.
    pub fn touched_properties(&self) -> impl Iterator<Item = AttributeId> + '_ {
        self.removed_properties
            .iter()
            .copied()
            .chain(self.set_properties.keys().copied())
    }

    /// Produces the updated snapshot from `base`.
    #[must_use]
    pub fn apply(&self, base: &Vertex) -> Vertex {
        let mut next = base.clone();
        for attribute in &self.removed_properties {
            next.properties.remove(attribute);
        }
        for (attribute, value) in &self.set_properties {
            next.properties.insert(*attribute, value.clone());
        }
        for attribute in &self.cleared_edges {
            next.edges.remove(attribute);
        }
        for (attribute, targets) in &self.removed_edges {
            if let Some(current) = next.edges.get_mut(attribute) {
                current.retain(|t| !targets.contains(t));
                if current.is_empty() {
                    next.edges.remove(attribute);
                }
            }
        }
        for (attribute, targets) in &self.added_edges {
            for target in targets {
                next.add_edge(*attribute, *target);
            }
        }
        next
    }
}
