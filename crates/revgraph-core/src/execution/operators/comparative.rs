//! Leaf operators comparing one attribute against a constant.

use super::AccessCost;
use crate::execution::{PlanContext, QueryPlanProperty};
use crate::graph::{RevisionFilter, Vertex, VertexIter};
use crate::index::VertexIndex;
use revgraph_common::types::{OrderableValue, Value, VertexId, VertexTypeId};
use revgraph_common::utils::error::{Error, QueryError, Result};
use smallvec::{SmallVec, smallvec};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

/// Comparison operator of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl CompareOp {
    /// Returns the operator symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Returns `true` for operators that need an order on the attribute type.
    #[must_use]
    pub const fn is_ordered(self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }

    /// Evaluates `value <op> constant`.
    ///
    /// Values of a different family than the constant never match, not even
    /// under `Ne`.
    #[must_use]
    pub fn evaluate(self, value: &Value, constant: &Value) -> bool {
        match self {
            Self::Eq => value.matches(constant),
            Self::Ne => comparable(value, constant) && !value.matches(constant),
            Self::Lt => value.compare(constant) == Some(Ordering::Less),
            Self::Le => matches!(value.compare(constant), Some(Ordering::Less | Ordering::Equal)),
            Self::Gt => value.compare(constant) == Some(Ordering::Greater),
            Self::Ge => matches!(
                value.compare(constant),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }

    /// Key ranges of an ordered index that hold every match.
    fn ranges(self, constant: &Value) -> SmallVec<[(Bound<&Value>, Bound<&Value>); 2]> {
        match self {
            Self::Eq => smallvec![(Bound::Included(constant), Bound::Included(constant))],
            Self::Ne => smallvec![
                (Bound::Unbounded, Bound::Excluded(constant)),
                (Bound::Excluded(constant), Bound::Unbounded),
            ],
            Self::Lt => smallvec![(Bound::Unbounded, Bound::Excluded(constant))],
            Self::Le => smallvec![(Bound::Unbounded, Bound::Included(constant))],
            Self::Gt => smallvec![(Bound::Excluded(constant), Bound::Unbounded)],
            Self::Ge => smallvec![(Bound::Included(constant), Bound::Unbounded)],
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

fn comparable(a: &Value, b: &Value) -> bool {
    a.compare(b).is_some()
        || matches!(
            (a, b),
            (Value::Bytes(_), Value::Bytes(_)) | (Value::List(_), Value::List(_))
        )
}

/// How a leaf reaches its candidates for one vertex type.
enum Access {
    Lookup(Arc<dyn VertexIndex>),
    Range(Arc<dyn VertexIndex>),
    Scan,
}

impl Access {
    fn cost(&self) -> AccessCost {
        match self {
            Self::Lookup(_) => AccessCost::IndexLookup,
            Self::Range(_) => AccessCost::IndexRange,
            Self::Scan => AccessCost::FullScan,
        }
    }
}

/// Compares one attribute against a constant.
///
/// Uses an index when one is available and the plan reads latest
/// revisions only; otherwise scans the store. Index candidates are always
/// re-checked against the stored snapshot, so both paths return the same
/// set.
pub struct ComparativeOperator {
    ctx: Arc<PlanContext>,
    op: CompareOp,
    property: QueryPlanProperty,
    constant: Value,
}

impl ComparativeOperator {
    /// Validates the comparison and builds the leaf.
    ///
    /// # Errors
    ///
    /// Fails on a null constant, on a constant the attribute type does not
    /// accept, and on an ordered comparison of an unordered attribute type.
    pub fn new(
        ctx: Arc<PlanContext>,
        op: CompareOp,
        property: QueryPlanProperty,
        constant: Value,
    ) -> Result<Self> {
        if constant.is_null() {
            return Err(QueryError::NullConstant.into());
        }
        let data_type = property.data_type();
        if !data_type.accepts(&constant) {
            return Err(Error::TypeMismatch {
                expected: data_type.to_string(),
                found: constant.type_name().to_string(),
            });
        }
        if op.is_ordered() && !data_type.is_orderable() && !constant_orders(&constant) {
            return Err(QueryError::NotOrderable(data_type.to_string()).into());
        }
        Ok(Self {
            ctx,
            op,
            property,
            constant,
        })
    }

    /// Returns the comparison operator.
    #[must_use]
    pub fn op(&self) -> CompareOp {
        self.op
    }

    /// Returns the compared attribute.
    #[must_use]
    pub fn property(&self) -> &QueryPlanProperty {
        &self.property
    }

    /// Returns the constant.
    #[must_use]
    pub fn constant(&self) -> &Value {
        &self.constant
    }

    /// Returns `true` if the snapshot's attribute satisfies the comparison.
    /// Ignores the extent.
    #[must_use]
    pub fn matches(&self, vertex: &Vertex) -> bool {
        self.property
            .value_of(vertex)
            .is_some_and(|value| self.op.evaluate(value, &self.constant))
    }

    /// Returns `true` if the snapshot is in the extent and matches.
    #[must_use]
    pub fn contains(&self, vertex: &Vertex) -> bool {
        self.matches(vertex) && self.property.extent().contains(&self.ctx, vertex)
    }

    /// Estimated cost of evaluating the leaf on its root type.
    #[must_use]
    pub fn cost(&self) -> AccessCost {
        self.access(self.property.vertex_type()).cost()
    }

    pub(crate) fn context(&self) -> &Arc<PlanContext> {
        &self.ctx
    }

    fn access(&self, vertex_type: VertexTypeId) -> Access {
        if !self.property.extent().revisions().is_latest() {
            return Access::Scan;
        }
        let Some(indices) = self.ctx.indices() else {
            return Access::Scan;
        };
        if self.ctx.indices_for(vertex_type).is_none() {
            tracing::debug!(%vertex_type, "indices behind pending writes, scanning");
            return Access::Scan;
        }
        let attribute = self.property.attribute();
        // Ordered indices only hold values with an order; bytes and lists
        // are invisible to them.
        let orderable = OrderableValue::try_from(&self.constant).is_some();
        let access = match self.op {
            CompareOp::Eq => indices
                .try_get_index(vertex_type, attribute)
                .filter(|index| orderable || !index.is_ordered())
                .map(|index| {
                    if index.is_ordered() {
                        Access::Range(index)
                    } else {
                        Access::Lookup(index)
                    }
                }),
            _ if orderable => indices
                .try_get_ordered_index(vertex_type, attribute)
                .map(Access::Range),
            _ => None,
        };
        access.unwrap_or_else(|| {
            tracing::debug!(
                %vertex_type,
                %attribute,
                op = %self.op,
                "no usable index, falling back to scan"
            );
            Access::Scan
        })
    }

    fn candidates(&self, index: &dyn VertexIndex) -> Option<Vec<VertexId>> {
        let mut ids = if self.op == CompareOp::Eq {
            index.lookup(&self.constant)
        } else {
            let mut ids = Vec::new();
            for (lower, upper) in self.op.ranges(&self.constant) {
                ids.extend(index.lookup_range(lower, upper)?);
            }
            ids
        };
        ids.sort_unstable();
        ids.dedup();
        Some(ids)
    }

    /// Streams the matches of exactly `vertex_type`.
    ///
    /// Empty if the type is outside the extent.
    pub(crate) fn matching(&self, vertex_type: VertexTypeId) -> VertexIter<'_> {
        let extent = self.property.extent();
        if !extent.covers(vertex_type) {
            return Box::new(std::iter::empty());
        }
        let candidates = match self.access(vertex_type) {
            Access::Lookup(index) | Access::Range(index) => self.candidates(index.as_ref()),
            Access::Scan => None,
        };
        let store = self.ctx.store();
        let access = *self.ctx.access();
        let editions = extent.editions().clone();

        let Some(ids) = candidates else {
            let revisions = extent.revisions().clone();
            return Box::new(
                store
                    .get_vertices_by_type_id(&access, vertex_type, None, &editions, &revisions)
                    .filter(move |vertex| self.matches(vertex)),
            );
        };

        tracing::trace!(%vertex_type, candidates = ids.len(), "resolving index candidates");
        let batches: Vec<Vec<VertexId>> = ids
            .chunks(self.ctx.candidate_batch_size())
            .map(<[VertexId]>::to_vec)
            .collect();
        Box::new(
            batches
                .into_iter()
                .flat_map(move |batch| {
                    store.get_vertices_by_type_id(
                        &access,
                        vertex_type,
                        Some(batch.as_slice()),
                        &editions,
                        &RevisionFilter::Latest,
                    )
                })
                .filter(move |vertex| {
                    let hit = self.matches(vertex);
                    if !hit {
                        tracing::trace!(key = ?vertex.key(), "index candidate rejected on recheck");
                    }
                    hit
                }),
        )
    }

    /// Streams the matches over every type of the extent.
    pub(crate) fn matching_all(&self) -> VertexIter<'_> {
        Box::new(
            self.property
                .extent()
                .types()
                .iter()
                .flat_map(move |&vertex_type| self.matching(vertex_type)),
        )
    }
}

/// `Any`-typed attributes can still be ordered when the constant has an order.
fn constant_orders(constant: &Value) -> bool {
    matches!(
        constant,
        Value::Bool(_) | Value::Int64(_) | Value::Float64(_) | Value::String(_)
    )
}

impl fmt::Display for ComparativeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.property, self.op, self.constant)
    }
}

impl fmt::Debug for ComparativeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComparativeOperator")
            .field("op", &self.op)
            .field("property", &self.property)
            .field("constant", &self.constant)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_ordered() {
        let c = Value::Int64(21);
        assert!(CompareOp::Ge.evaluate(&Value::Int64(21), &c));
        assert!(!CompareOp::Gt.evaluate(&Value::Int64(21), &c));
        assert!(CompareOp::Lt.evaluate(&Value::Float64(20.5), &c));
        assert!(CompareOp::Le.evaluate(&Value::Float64(21.0), &c));
    }

    #[test]
    fn test_incompatible_values_never_match() {
        let c = Value::Int64(21);
        for op in [
            CompareOp::Eq,
            CompareOp::Ne,
            CompareOp::Lt,
            CompareOp::Le,
            CompareOp::Gt,
            CompareOp::Ge,
        ] {
            assert!(!op.evaluate(&Value::from("21"), &c), "{op}");
            assert!(!op.evaluate(&Value::Null, &c), "{op}");
        }
    }

    #[test]
    fn test_not_equals_on_bytes() {
        let c = Value::from(vec![1u8, 2]);
        assert!(CompareOp::Ne.evaluate(&Value::from(vec![3u8]), &c));
        assert!(!CompareOp::Ne.evaluate(&Value::from(vec![1u8, 2]), &c));
    }

    #[test]
    fn test_ranges_for_not_equals_split_around_constant() {
        let c = Value::Int64(5);
        let ranges = CompareOp::Ne.ranges(&c);
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0], (Bound::Unbounded, Bound::Excluded(&c)));
        assert_eq!(ranges[1], (Bound::Excluded(&c), Bound::Unbounded));
    }
}
