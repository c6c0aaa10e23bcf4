//! Identifier types for vertex types, vertices, and attributes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a vertex type.
///
/// Vertex types form a hierarchy managed outside the store; the store only
/// ever sees the numeric id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[repr(transparent)]
pub struct VertexTypeId(pub u64);

impl VertexTypeId {
    /// Creates a new VertexTypeId from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for VertexTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VertexTypeId({})", self.0)
    }
}

impl fmt::Display for VertexTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for VertexTypeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Identifier of a vertex, unique within its vertex type.
///
/// Ids are allocated monotonically per type; they are never reused after a
/// restart because allocation is seeded from the highest stored id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[repr(transparent)]
pub struct VertexId(pub u64);

impl VertexId {
    /// Creates a new VertexId from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the id that follows this one, saturating at `u64::MAX`.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Debug for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VertexId({})", self.0)
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for VertexId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<VertexId> for u64 {
    fn from(id: VertexId) -> Self {
        id.0
    }
}

/// Identifier of an attribute (property or edge) declared on a vertex type.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[repr(transparent)]
pub struct AttributeId(pub u64);

impl AttributeId {
    /// Creates a new AttributeId from a raw u64 value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttributeId({})", self.0)
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AttributeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// The target of an outgoing edge: a vertex addressed by type and id.
///
/// Edge targets carry no edition or revision; they resolve against the
/// target's defaults at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexInformation {
    /// Type of the target vertex.
    pub type_id: VertexTypeId,
    /// Id of the target vertex.
    pub vertex_id: VertexId,
}

impl VertexInformation {
    /// Creates a new edge target.
    #[inline]
    #[must_use]
    pub const fn new(type_id: VertexTypeId, vertex_id: VertexId) -> Self {
        Self { type_id, vertex_id }
    }
}

impl fmt::Display for VertexInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_id, self.vertex_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_id_basic() {
        let id = VertexId::new(42);
        assert_eq!(id.as_u64(), 42);
        assert_eq!(format!("{id:?}"), "VertexId(42)");
        assert_eq!(format!("{id}"), "42");
    }

    #[test]
    fn test_vertex_id_next_saturates() {
        assert_eq!(VertexId::new(7).next(), VertexId::new(8));
        assert_eq!(VertexId::new(u64::MAX).next(), VertexId::new(u64::MAX));
    }

    #[test]
    fn test_vertex_information_ordering() {
        let a = VertexInformation::new(VertexTypeId::new(1), VertexId::new(9));
        let b = VertexInformation::new(VertexTypeId::new(2), VertexId::new(0));
        assert!(a < b);
        assert_eq!(a.to_string(), "1:9");
    }
}
