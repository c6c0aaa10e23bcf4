//! Query plan operators.
//!
//! A [`QueryPlan`] is a tree of comparison leaves combined with `And`, `Or`
//! and `Not`. Every node can stream its matches lazily and test a single
//! snapshot for membership:
//!
//! - comparison leaves use an index when one is available and fall back to
//!   a full scan of the store otherwise
//! - `And` evaluates its cheapest operand and checks the others
//! - `Or` merges its operands, yielding each snapshot once
//! - `Not` scans its operand's extent and drops what the operand contains

mod comparative;
mod logical;

pub use comparative::{CompareOp, ComparativeOperator};
pub use logical::{AndOperator, NotOperator, OrOperator};

use super::{Extent, PlanContext, QueryPlanProperty, VertexStream};
use crate::graph::{Vertex, VertexIter};
use revgraph_common::types::{Value, VertexTypeId};
use revgraph_common::utils::error::Result;
use std::fmt;
use std::sync::Arc;

/// Relative cost class of evaluating a plan node, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessCost {
    /// Exact lookup in a hash or ordered index.
    IndexLookup,
    /// Range scan of an ordered index.
    IndexRange,
    /// Scan of every snapshot in the extent.
    FullScan,
    /// A composite node.
    Composite,
}

impl fmt::Display for AccessCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::IndexLookup => "index lookup",
            Self::IndexRange => "index range",
            Self::FullScan => "full scan",
            Self::Composite => "composite",
        })
    }
}

/// A lazily evaluated predicate tree over vertex snapshots.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use revgraph_common::types::{
///     AttributeId, LogicalType, SecurityToken, TransactionToken, VertexId, VertexTypeId,
/// };
/// use revgraph_core::execution::{PlanContext, QueryPlan, QueryPlanProperty};
/// use revgraph_core::graph::{InMemoryVertexStore, Vertex, VertexStore};
/// use revgraph_core::schema::TypeCatalog;
///
/// let person = VertexTypeId::new(1);
/// let age = AttributeId::new(1);
/// let catalog = TypeCatalog::new();
/// catalog.define_vertex_type(person, "Person", None).unwrap();
/// catalog.define_attribute(person, age, "age", LogicalType::Int64).unwrap();
///
/// let store = Arc::new(InMemoryVertexStore::new());
/// let tx = TransactionToken::new(1);
/// let ctx = PlanContext::new(SecurityToken::SYSTEM, tx, store.clone(), false);
/// for (id, years) in [(1, 18), (2, 21), (3, 30)] {
///     let vertex = Vertex::new(person, VertexId::new(id)).with_property(age, years);
///     store.add_vertex(ctx.access(), vertex, None, None);
/// }
///
/// let ctx = Arc::new(ctx);
/// let property = QueryPlanProperty::resolve(&catalog, person, age).unwrap();
/// let plan = QueryPlan::greater_or_equal(&ctx, property, 21).unwrap();
/// assert_eq!(plan.execute().count(), 2);
/// ```
#[derive(Debug)]
pub enum QueryPlan {
    /// `attribute = constant`
    Equals(ComparativeOperator),
    /// `attribute <> constant`
    NotEquals(ComparativeOperator),
    /// `attribute > constant`
    GreaterThan(ComparativeOperator),
    /// `attribute >= constant`
    GreaterOrEqual(ComparativeOperator),
    /// `attribute < constant`
    LessThan(ComparativeOperator),
    /// `attribute <= constant`
    LessOrEqual(ComparativeOperator),
    /// Conjunction.
    And(AndOperator),
    /// Disjunction.
    Or(OrOperator),
    /// Complement within the operand's extent.
    Not(NotOperator),
}

impl QueryPlan {
    /// Builds a comparison leaf.
    ///
    /// # Errors
    ///
    /// See [`ComparativeOperator::new`].
    pub fn compare(
        ctx: &Arc<PlanContext>,
        op: CompareOp,
        property: QueryPlanProperty,
        constant: impl Into<Value>,
    ) -> Result<Self> {
        let leaf = ComparativeOperator::new(Arc::clone(ctx), op, property, constant.into())?;
        Ok(match op {
            CompareOp::Eq => Self::Equals(leaf),
            CompareOp::Ne => Self::NotEquals(leaf),
            CompareOp::Gt => Self::GreaterThan(leaf),
            CompareOp::Ge => Self::GreaterOrEqual(leaf),
            CompareOp::Lt => Self::LessThan(leaf),
            CompareOp::Le => Self::LessOrEqual(leaf),
        })
    }

    /// `attribute = constant`
    pub fn equals(
        ctx: &Arc<PlanContext>,
        property: QueryPlanProperty,
        constant: impl Into<Value>,
    ) -> Result<Self> {
        Self::compare(ctx, CompareOp::Eq, property, constant)
    }

    /// `attribute <> constant`
    pub fn not_equals(
        ctx: &Arc<PlanContext>,
        property: QueryPlanProperty,
        constant: impl Into<Value>,
    ) -> Result<Self> {
        Self::compare(ctx, CompareOp::Ne, property, constant)
    }

    /// `attribute > constant`
    pub fn greater_than(
        ctx: &Arc<PlanContext>,
        property: QueryPlanProperty,
        constant: impl Into<Value>,
    ) -> Result<Self> {
        Self::compare(ctx, CompareOp::Gt, property, constant)
    }

    /// `attribute >= constant`
    pub fn greater_or_equal(
        ctx: &Arc<PlanContext>,
        property: QueryPlanProperty,
        constant: impl Into<Value>,
    ) -> Result<Self> {
        Self::compare(ctx, CompareOp::Ge, property, constant)
    }

    /// `attribute < constant`
    pub fn less_than(
        ctx: &Arc<PlanContext>,
        property: QueryPlanProperty,
        constant: impl Into<Value>,
    ) -> Result<Self> {
        Self::compare(ctx, CompareOp::Lt, property, constant)
    }

    /// `attribute <= constant`
    pub fn less_or_equal(
        ctx: &Arc<PlanContext>,
        property: QueryPlanProperty,
        constant: impl Into<Value>,
    ) -> Result<Self> {
        Self::compare(ctx, CompareOp::Le, property, constant)
    }

    /// Conjunction of `operands`.
    ///
    /// # Errors
    ///
    /// Fails if `operands` is empty.
    pub fn and(operands: impl IntoIterator<Item = QueryPlan>) -> Result<Self> {
        AndOperator::new(operands.into_iter().collect()).map(Self::And)
    }

    /// Disjunction of `operands`.
    ///
    /// # Errors
    ///
    /// Fails if `operands` is empty.
    pub fn or(operands: impl IntoIterator<Item = QueryPlan>) -> Result<Self> {
        OrOperator::new(operands.into_iter().collect()).map(Self::Or)
    }

    /// Complement of `operand` within its extent.
    ///
    /// # Errors
    ///
    /// Fails if the operand's leaves do not all range over the same extent.
    pub fn not(operand: QueryPlan) -> Result<Self> {
        NotOperator::new(operand).map(Self::Not)
    }

    /// Operator name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Equals(_) => "Equals",
            Self::NotEquals(_) => "NotEquals",
            Self::GreaterThan(_) => "GreaterThan",
            Self::GreaterOrEqual(_) => "GreaterOrEqual",
            Self::LessThan(_) => "LessThan",
            Self::LessOrEqual(_) => "LessOrEqual",
            Self::And(_) => "And",
            Self::Or(_) => "Or",
            Self::Not(_) => "Not",
        }
    }

    fn leaf(&self) -> Option<&ComparativeOperator> {
        match self {
            Self::Equals(leaf)
            | Self::NotEquals(leaf)
            | Self::GreaterThan(leaf)
            | Self::GreaterOrEqual(leaf)
            | Self::LessThan(leaf)
            | Self::LessOrEqual(leaf) => Some(leaf),
            Self::And(_) | Self::Or(_) | Self::Not(_) => None,
        }
    }

    /// Streams every matching snapshot of the plan's extent.
    ///
    /// Nothing is evaluated until the first element is pulled.
    #[must_use]
    pub fn execute(&self) -> VertexStream<'_> {
        VertexStream::deferred(self.name(), move || self.matching_all())
    }

    /// Streams the matching snapshots of exactly `vertex_type`.
    #[must_use]
    pub fn get_matching_vertices(&self, vertex_type: VertexTypeId) -> VertexStream<'_> {
        VertexStream::deferred(self.name(), move || self.matching(vertex_type))
    }

    /// Returns `true` if the plan matches the snapshot.
    #[must_use]
    pub fn contains(&self, vertex: &Vertex) -> bool {
        match self {
            Self::And(and) => and.contains(vertex),
            Self::Or(or) => or.contains(vertex),
            Self::Not(not) => not.contains(vertex),
            leaf => leaf.leaf().is_some_and(|l| l.contains(vertex)),
        }
    }

    /// Cost class used to pick the driver of a conjunction.
    #[must_use]
    pub fn cost(&self) -> AccessCost {
        match self {
            Self::And(_) | Self::Or(_) => AccessCost::Composite,
            Self::Not(not) => not.cost(),
            leaf => leaf.leaf().map_or(AccessCost::Composite, ComparativeOperator::cost),
        }
    }

    /// The extent the plan ranges over, if all its leaves share one.
    #[must_use]
    pub fn extent(&self) -> Option<&Extent> {
        match self {
            Self::And(and) => shared_extent(and.operands()),
            Self::Or(or) => shared_extent(or.operands()),
            Self::Not(not) => Some(not.extent()),
            leaf => leaf.leaf().map(|l| l.property().extent()),
        }
    }

    pub(crate) fn context(&self) -> &Arc<PlanContext> {
        match self {
            Self::And(and) => and.context(),
            Self::Or(or) => or.context(),
            Self::Not(not) => not.context(),
            Self::Equals(leaf)
            | Self::NotEquals(leaf)
            | Self::GreaterThan(leaf)
            | Self::GreaterOrEqual(leaf)
            | Self::LessThan(leaf)
            | Self::LessOrEqual(leaf) => leaf.context(),
        }
    }

    pub(crate) fn matching(&self, vertex_type: VertexTypeId) -> VertexIter<'_> {
        match self {
            Self::And(and) => and.matching(vertex_type),
            Self::Or(or) => or.matching(vertex_type),
            Self::Not(not) => not.matching(vertex_type),
            Self::Equals(leaf)
            | Self::NotEquals(leaf)
            | Self::GreaterThan(leaf)
            | Self::GreaterOrEqual(leaf)
            | Self::LessThan(leaf)
            | Self::LessOrEqual(leaf) => leaf.matching(vertex_type),
        }
    }

    pub(crate) fn matching_all(&self) -> VertexIter<'_> {
        match self {
            Self::And(and) => and.matching_all(),
            Self::Or(or) => or.matching_all(),
            Self::Not(not) => not.matching_all(),
            Self::Equals(leaf)
            | Self::NotEquals(leaf)
            | Self::GreaterThan(leaf)
            | Self::GreaterOrEqual(leaf)
            | Self::LessThan(leaf)
            | Self::LessOrEqual(leaf) => leaf.matching_all(),
        }
    }

    fn explain(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = depth * 2;
        if let Some(leaf) = self.leaf() {
            return writeln!(f, "{:indent$}{} {} [{}]", "", self.name(), leaf, leaf.cost());
        }
        writeln!(f, "{:indent$}{}", "", self.name())?;
        match self {
            Self::And(and) => and
                .operands()
                .iter()
                .try_for_each(|op| op.explain(f, depth + 1)),
            Self::Or(or) => or
                .operands()
                .iter()
                .try_for_each(|op| op.explain(f, depth + 1)),
            Self::Not(not) => not.operand().explain(f, depth + 1),
            _ => Ok(()),
        }
    }
}

fn shared_extent(operands: &[QueryPlan]) -> Option<&Extent> {
    let (first, rest) = operands.split_first()?;
    let extent = first.extent()?;
    rest.iter()
        .all(|op| op.extent() == Some(extent))
        .then_some(extent)
}

/// Renders the plan as an indented tree, one node per line.
impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.explain(f, 0)
    }
}
