//! Value-to-vertex indices over one attribute of one vertex type.

use parking_lot::RwLock;
use revgraph_common::types::{
    AttributeId, HashableValue, OrderableValue, OrderedFloat64, Value, VertexId, VertexTypeId,
};
use revgraph_common::utils::hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Bound;

/// Index structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    /// Hash map, equality lookups only.
    Hash,
    /// B-tree, equality and range lookups.
    BTree,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Hash => write!(f, "HASH"),
            IndexKind::BTree => write!(f, "BTREE"),
        }
    }
}

/// Declares an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Unique index name.
    pub name: String,
    /// Indexed vertex type.
    pub vertex_type: VertexTypeId,
    /// Indexed property attribute.
    pub attribute: AttributeId,
    /// Index structure.
    pub kind: IndexKind,
}

impl IndexDefinition {
    /// Declares a hash index.
    #[must_use]
    pub fn hash(
        name: impl Into<String>,
        vertex_type: VertexTypeId,
        attribute: AttributeId,
    ) -> Self {
        Self {
            name: name.into(),
            vertex_type,
            attribute,
            kind: IndexKind::Hash,
        }
    }

    /// Declares a B-tree index.
    #[must_use]
    pub fn btree(
        name: impl Into<String>,
        vertex_type: VertexTypeId,
        attribute: AttributeId,
    ) -> Self {
        Self {
            name: name.into(),
            vertex_type,
            attribute,
            kind: IndexKind::BTree,
        }
    }
}

/// An index from attribute values to vertex ids.
///
/// A vertex may be indexed under several values at once, one per edition.
/// Lookups return each vertex id at most once.
pub trait VertexIndex: Send + Sync {
    /// Returns the index definition.
    fn definition(&self) -> &IndexDefinition;

    /// Returns `true` if [`VertexIndex::lookup_range`] is supported.
    fn is_ordered(&self) -> bool;

    /// Returns the vertices indexed under a value equal to `value`.
    fn lookup(&self, value: &Value) -> Vec<VertexId>;

    /// Returns the vertices indexed under values within the bounds.
    ///
    /// Unbounded sides stop at the value family of the bounded side, so a
    /// numeric bound never yields string entries. `None` if unsupported,
    /// including bounds the index cannot hold.
    fn lookup_range(&self, lower: Bound<&Value>, upper: Bound<&Value>) -> Option<Vec<VertexId>>;

    /// Indexes `vertex_id` under `value`. Values the index cannot hold are ignored.
    fn insert(&self, value: &Value, vertex_id: VertexId);

    /// Drops every entry of a vertex.
    fn remove_vertex(&self, vertex_id: VertexId);

    /// Replaces every entry of a vertex with `values`.
    fn replace_vertex(&self, vertex_id: VertexId, values: &[Value]) {
        self.remove_vertex(vertex_id);
        for value in values {
            self.insert(value, vertex_id);
        }
    }

    /// Returns the number of indexed vertices.
    fn len(&self) -> usize;

    /// Returns `true` if nothing is indexed.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry.
    fn clear(&self);
}

struct HashEntries {
    by_value: FxHashMap<HashableValue, FxHashSet<VertexId>>,
    by_vertex: FxHashMap<VertexId, SmallVec<[HashableValue; 2]>>,
}

/// Equality-only index keyed by [`HashableValue`].
pub struct HashValueIndex {
    definition: IndexDefinition,
    entries: RwLock<HashEntries>,
}

impl HashValueIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new(definition: IndexDefinition) -> Self {
        Self {
            definition,
            entries: RwLock::new(HashEntries {
                by_value: FxHashMap::default(),
                by_vertex: FxHashMap::default(),
            }),
        }
    }
}

impl VertexIndex for HashValueIndex {
    fn definition(&self) -> &IndexDefinition {
        &self.definition
    }

    fn is_ordered(&self) -> bool {
        false
    }

    fn lookup(&self, value: &Value) -> Vec<VertexId> {
        if value.is_null() {
            return Vec::new();
        }
        let key = HashableValue::new(value.clone());
        self.entries
            .read()
            .by_value
            .get(&key)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    fn lookup_range(&self, _lower: Bound<&Value>, _upper: Bound<&Value>) -> Option<Vec<VertexId>> {
        None
    }

    fn insert(&self, value: &Value, vertex_id: VertexId) {
        if value.is_null() {
            return;
        }
        let key = HashableValue::new(value.clone());
        let mut entries = self.entries.write();
        let keys = entries.by_vertex.entry(vertex_id).or_default();
        if keys.contains(&key) {
            return;
        }
        keys.push(key.clone());
        entries.by_value.entry(key).or_default().insert(vertex_id);
    }

    fn remove_vertex(&self, vertex_id: VertexId) {
        let mut entries = self.entries.write();
        let Some(keys) = entries.by_vertex.remove(&vertex_id) else {
            return;
        };
        for key in keys {
            if let Some(ids) = entries.by_value.get_mut(&key) {
                ids.remove(&vertex_id);
                if ids.is_empty() {
                    entries.by_value.remove(&key);
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.read().by_vertex.len()
    }

    fn clear(&self) {
        let mut entries = self.entries.write();
        entries.by_value.clear();
        entries.by_vertex.clear();
    }
}

struct OrderedEntries {
    by_value: BTreeMap<OrderableValue, BTreeSet<VertexId>>,
    by_vertex: FxHashMap<VertexId, SmallVec<[OrderableValue; 2]>>,
}

/// Order-preserving index keyed by [`OrderableValue`].
///
/// Only bools, numbers and strings are indexed; other values are skipped
/// and therefore never returned by a lookup.
pub struct BTreeValueIndex {
    definition: IndexDefinition,
    entries: RwLock<OrderedEntries>,
}

impl BTreeValueIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new(definition: IndexDefinition) -> Self {
        Self {
            definition,
            entries: RwLock::new(OrderedEntries {
                by_value: BTreeMap::new(),
                by_vertex: FxHashMap::default(),
            }),
        }
    }
}

/// The smallest and largest keys of the value family `key` belongs to.
fn family_bounds(key: &OrderableValue) -> (Bound<OrderableValue>, Bound<OrderableValue>) {
    match key {
        OrderableValue::Bool(_) => (
            Bound::Included(OrderableValue::Bool(false)),
            Bound::Included(OrderableValue::Bool(true)),
        ),
        OrderableValue::Int64(_) | OrderableValue::Float64(_) => (
            Bound::Included(OrderableValue::Float64(OrderedFloat64(f64::NEG_INFINITY))),
            Bound::Included(OrderableValue::Float64(OrderedFloat64(f64::NAN))),
        ),
        OrderableValue::String(_) => (
            Bound::Included(OrderableValue::String(arcstr::ArcStr::new())),
            Bound::Unbounded,
        ),
    }
}

fn to_key(bound: Bound<&Value>) -> Option<Bound<OrderableValue>> {
    match bound {
        Bound::Included(v) => OrderableValue::try_from(v).map(Bound::Included),
        Bound::Excluded(v) => OrderableValue::try_from(v).map(Bound::Excluded),
        Bound::Unbounded => Some(Bound::Unbounded),
    }
}

fn bound_key(bound: &Bound<OrderableValue>) -> Option<&OrderableValue> {
    match bound {
        Bound::Included(k) | Bound::Excluded(k) => Some(k),
        Bound::Unbounded => None,
    }
}

/// `BTreeMap::range` panics on inverted or empty-exclusive ranges.
fn is_empty_range(lower: &Bound<OrderableValue>, upper: &Bound<OrderableValue>) -> bool {
    match (lower, upper) {
        (Bound::Included(l), Bound::Included(u)) => l > u,
        (Bound::Included(l) | Bound::Excluded(l), Bound::Excluded(u))
        | (Bound::Excluded(l), Bound::Included(u)) => l >= u,
        _ => false,
    }
}

impl VertexIndex for BTreeValueIndex {
    fn definition(&self) -> &IndexDefinition {
        &self.definition
    }

    fn is_ordered(&self) -> bool {
        true
    }

    fn lookup(&self, value: &Value) -> Vec<VertexId> {
        let Some(key) = OrderableValue::try_from(value) else {
            return Vec::new();
        };
        self.entries
            .read()
            .by_value
            .get(&key)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    fn lookup_range(&self, lower: Bound<&Value>, upper: Bound<&Value>) -> Option<Vec<VertexId>> {
        let (Some(mut lower), Some(mut upper)) = (to_key(lower), to_key(upper)) else {
            return None;
        };
        let Some(anchor) = bound_key(&lower).or_else(|| bound_key(&upper)).cloned() else {
            // Fully unbounded: every entry.
            let entries = self.entries.read();
            let mut ids: Vec<_> = entries.by_vertex.keys().copied().collect();
            ids.sort_unstable();
            return Some(ids);
        };
        let (family_lower, family_upper) = family_bounds(&anchor);
        if matches!(lower, Bound::Unbounded) {
            lower = family_lower;
        }
        if matches!(upper, Bound::Unbounded) {
            upper = family_upper;
        }
        if is_empty_range(&lower, &upper) {
            return Some(Vec::new());
        }

        let entries = self.entries.read();
        let mut seen = FxHashSet::default();
        let mut ids = Vec::new();
        for (_, bucket) in entries.by_value.range((lower, upper)) {
            for id in bucket {
                if seen.insert(*id) {
                    ids.push(*id);
                }
            }
        }
        Some(ids)
    }

    fn insert(&self, value: &Value, vertex_id: VertexId) {
        let Some(key) = OrderableValue::try_from(value) else {
            return;
        };
        let mut entries = self.entries.write();
        let keys = entries.by_vertex.entry(vertex_id).or_default();
        if keys.contains(&key) {
            return;
        }
        keys.push(key.clone());
        entries.by_value.entry(key).or_default().insert(vertex_id);
    }

    fn remove_vertex(&self, vertex_id: VertexId) {
        let mut entries = self.entries.write();
        let Some(keys) = entries.by_vertex.remove(&vertex_id) else {
            return;
        };
        for key in keys {
            if let Some(ids) = entries.by_value.get_mut(&key) {
                ids.remove(&vertex_id);
                if ids.is_empty() {
                    entries.by_value.remove(&key);
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.read().by_vertex.len()
    }

    fn clear(&self) {
        let mut entries = self.entries.write();
        entries.by_value.clear();
        entries.by_vertex.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(kind: IndexKind) -> IndexDefinition {
        IndexDefinition {
            name: "by_age".into(),
            vertex_type: VertexTypeId::new(1),
            attribute: AttributeId::new(2),
            kind,
        }
    }

    fn sorted(mut ids: Vec<VertexId>) -> Vec<u64> {
        ids.sort_unstable();
        ids.into_iter().map(VertexId::as_u64).collect()
    }

    fn populated(index: &dyn VertexIndex) {
        for (id, age) in [(1, 18i64), (2, 21), (3, 21), (4, 30)] {
            index.insert(&Value::Int64(age), VertexId::new(id));
        }
        index.insert(&Value::from("n/a"), VertexId::new(5));
    }

    #[test]
    fn test_hash_lookup() {
        let index = HashValueIndex::new(def(IndexKind::Hash));
        populated(&index);
        assert_eq!(sorted(index.lookup(&Value::Int64(21))), vec![2, 3]);
        assert_eq!(sorted(index.lookup(&Value::Float64(21.0))), vec![2, 3]);
        assert!(index.lookup(&Value::Null).is_empty());
        assert!(index.lookup_range(Bound::Unbounded, Bound::Unbounded).is_none());
        assert_eq!(index.len(), 5);
    }

    #[test]
    fn test_hash_replace_vertex() {
        let index = HashValueIndex::new(def(IndexKind::Hash));
        populated(&index);
        index.replace_vertex(VertexId::new(2), &[Value::Int64(40), Value::Int64(41)]);
        assert_eq!(sorted(index.lookup(&Value::Int64(21))), vec![3]);
        assert_eq!(sorted(index.lookup(&Value::Int64(41))), vec![2]);
        index.remove_vertex(VertexId::new(2));
        assert!(index.lookup(&Value::Int64(40)).is_empty());
    }

    #[test]
    fn test_btree_ranges() {
        let index = BTreeValueIndex::new(def(IndexKind::BTree));
        populated(&index);
        let ge = index
            .lookup_range(Bound::Included(&Value::Int64(21)), Bound::Unbounded)
            .unwrap();
        assert_eq!(sorted(ge), vec![2, 3, 4]);
        let gt = index
            .lookup_range(Bound::Excluded(&Value::Int64(21)), Bound::Unbounded)
            .unwrap();
        assert_eq!(sorted(gt), vec![4]);
        let lt = index
            .lookup_range(Bound::Unbounded, Bound::Excluded(&Value::Float64(21.5)))
            .unwrap();
        assert_eq!(sorted(lt), vec![1, 2, 3]);
    }

    #[test]
    fn test_btree_range_stays_in_family() {
        let index = BTreeValueIndex::new(def(IndexKind::BTree));
        populated(&index);
        let ge_zero = index
            .lookup_range(Bound::Included(&Value::Int64(0)), Bound::Unbounded)
            .unwrap();
        assert!(!ge_zero.contains(&VertexId::new(5)));
        let strings = index
            .lookup_range(Bound::Included(&Value::from("a")), Bound::Unbounded)
            .unwrap();
        assert_eq!(sorted(strings), vec![5]);
    }

    #[test]
    fn test_btree_empty_ranges_do_not_panic() {
        let index = BTreeValueIndex::new(def(IndexKind::BTree));
        populated(&index);
        let v = Value::Int64(21);
        assert!(
            index
                .lookup_range(Bound::Excluded(&v), Bound::Excluded(&v))
                .unwrap()
                .is_empty()
        );
        assert!(
            index
                .lookup_range(
                    Bound::Included(&Value::Int64(30)),
                    Bound::Included(&Value::Int64(18))
                )
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_btree_skips_unorderable_values() {
        let index = BTreeValueIndex::new(def(IndexKind::BTree));
        index.insert(&Value::from(vec![1u8, 2]), VertexId::new(1));
        index.insert(&Value::Null, VertexId::new(1));
        assert!(index.is_empty());
    }

    #[test]
    fn test_btree_range_over_unorderable_bound_is_unsupported() {
        let index = BTreeValueIndex::new(def(IndexKind::BTree));
        index.insert(&Value::Int64(1), VertexId::new(1));
        let photo = Value::from(vec![1u8, 2]);
        assert!(index.lookup_range(Bound::Excluded(&photo), Bound::Unbounded).is_none());
        assert!(index.lookup_range(Bound::Unbounded, Bound::Excluded(&photo)).is_none());
    }
}
