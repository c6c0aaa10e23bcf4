//! Read-only view of the vertex type system.
//!
//! Type definitions live outside the store. Query planning only needs to
//! resolve attributes (including inherited ones) and to enumerate the
//! descendants of a type, which is what [`TypeLookup`] offers.

use parking_lot::RwLock;
use revgraph_common::types::{AttributeId, LogicalType, VertexTypeId};
use revgraph_common::utils::hash::FxHashMap;
use smallvec::SmallVec;

/// A property attribute as declared on a vertex type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDefinition {
    /// Attribute id.
    pub id: AttributeId,
    /// Attribute name.
    pub name: String,
    /// Vertex type that declares the attribute.
    pub declared_on: VertexTypeId,
    /// Declared value type.
    pub data_type: LogicalType,
}

/// Read access to vertex type metadata.
pub trait TypeLookup: Send + Sync {
    /// Resolves an attribute on a type, walking up to its ancestors.
    fn attribute(&self, vertex_type: VertexTypeId, attribute: AttributeId)
    -> Option<AttributeDefinition>;

    /// Returns the type followed by all its transitive descendants.
    ///
    /// Empty if the type is unknown.
    fn type_extent(&self, vertex_type: VertexTypeId) -> SmallVec<[VertexTypeId; 4]>;

    /// Returns every known vertex type.
    fn vertex_types(&self) -> Vec<VertexTypeId>;
}

#[derive(Debug, Clone)]
struct TypeEntry {
    name: String,
    parent: Option<VertexTypeId>,
    children: Vec<VertexTypeId>,
    attributes: FxHashMap<AttributeId, AttributeDefinition>,
}

/// An in-memory type catalog.
///
/// # Examples
///
/// ```
/// use revgraph_common::types::{AttributeId, LogicalType, VertexTypeId};
/// use revgraph_core::schema::{TypeCatalog, TypeLookup};
///
/// let catalog = TypeCatalog::new();
/// let person = VertexTypeId::new(1);
/// let employee = VertexTypeId::new(2);
/// catalog.define_vertex_type(person, "Person", None).unwrap();
/// catalog.define_vertex_type(employee, "Employee", Some(person)).unwrap();
/// catalog.define_attribute(person, AttributeId::new(1), "age", LogicalType::Int64).unwrap();
///
/// assert!(catalog.attribute(employee, AttributeId::new(1)).is_some());
/// assert_eq!(catalog.type_extent(person).len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct TypeCatalog {
    types: RwLock<FxHashMap<VertexTypeId, TypeEntry>>,
}

/// Error raised while defining catalog entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// The vertex type id is already taken.
    #[error("vertex type {0} already defined")]
    TypeExists(VertexTypeId),
    /// The referenced vertex type does not exist.
    #[error("vertex type {0} not found")]
    TypeNotFound(VertexTypeId),
    /// The attribute id is already declared on the type or an ancestor.
    #[error("attribute {0} already defined")]
    AttributeExists(AttributeId),
}

impl TypeCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a vertex type, optionally deriving from `parent`.
    pub fn define_vertex_type(
        &self,
        id: VertexTypeId,
        name: impl Into<String>,
        parent: Option<VertexTypeId>,
    ) -> Result<(), CatalogError> {
        let mut types = self.types.write();
        if types.contains_key(&id) {
            return Err(CatalogError::TypeExists(id));
        }
        if let Some(parent) = parent {
            types
                .get_mut(&parent)
                .ok_or(CatalogError::TypeNotFound(parent))?
                .children
                .push(id);
        }
        types.insert(
            id,
            TypeEntry {
                name: name.into(),
                parent,
                children: Vec::new(),
                attributes: FxHashMap::default(),
            },
        );
        Ok(())
    }

    /// Declares a property attribute on a vertex type.
    pub fn define_attribute(
        &self,
        vertex_type: VertexTypeId,
        id: AttributeId,
        name: impl Into<String>,
        data_type: LogicalType,
    ) -> Result<(), CatalogError> {
        if self.attribute(vertex_type, id).is_some() {
            return Err(CatalogError::AttributeExists(id));
        }
        let mut types = self.types.write();
        let entry = types
            .get_mut(&vertex_type)
            .ok_or(CatalogError::TypeNotFound(vertex_type))?;
        entry.attributes.insert(
            id,
            AttributeDefinition {
                id,
                name: name.into(),
                declared_on: vertex_type,
                data_type,
            },
        );
        Ok(())
    }

    /// Returns the name of a vertex type.
    #[must_use]
    pub fn type_name(&self, vertex_type: VertexTypeId) -> Option<String> {
        self.types.read().get(&vertex_type).map(|t| t.name.clone())
    }
}

impl TypeLookup for TypeCatalog {
    fn attribute(
        &self,
        vertex_type: VertexTypeId,
        attribute: AttributeId,
    ) -> Option<AttributeDefinition> {
        let types = self.types.read();
        let mut current = Some(vertex_type);
        while let Some(id) = current {
            let entry = types.get(&id)?;
            if let Some(def) = entry.attributes.get(&attribute) {
                return Some(def.clone());
            }
            current = entry.parent;
        }
        None
    }

    fn type_extent(&self, vertex_type: VertexTypeId) -> SmallVec<[VertexTypeId; 4]> {
        let types = self.types.read();
        let mut extent = SmallVec::new();
        if !types.contains_key(&vertex_type) {
            return extent;
        }
        let mut stack = vec![vertex_type];
        while let Some(id) = stack.pop() {
            extent.push(id);
            if let Some(entry) = types.get(&id) {
                stack.extend(entry.children.iter().rev().copied());
            }
        }
        extent
    }

    fn vertex_types(&self) -> Vec<VertexTypeId> {
        let mut ids: Vec<_> = self.types.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
