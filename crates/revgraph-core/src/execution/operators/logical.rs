//! Composite operators: conjunction, disjunction and negation.

use super::{AccessCost, QueryPlan};
use crate::execution::{Extent, PlanContext};
use crate::graph::{Vertex, VertexIter, VertexKey};
use revgraph_common::types::VertexTypeId;
use revgraph_common::utils::error::{QueryError, Result};
use revgraph_common::utils::hash::FxHashSet;
use std::sync::Arc;

/// Yields snapshots matched by every operand.
///
/// The cheapest operand drives the evaluation; the others are only checked
/// with [`QueryPlan::contains`] for the snapshots it yields.
#[derive(Debug)]
pub struct AndOperator {
    operands: Vec<QueryPlan>,
}

impl AndOperator {
    pub(super) fn new(operands: Vec<QueryPlan>) -> Result<Self> {
        if operands.is_empty() {
            return Err(QueryError::EmptyComposite("And").into());
        }
        Ok(Self { operands })
    }

    /// Returns the operands.
    #[must_use]
    pub fn operands(&self) -> &[QueryPlan] {
        &self.operands
    }

    /// Index of the operand that drives evaluation.
    #[must_use]
    pub fn driver(&self) -> usize {
        self.operands
            .iter()
            .enumerate()
            .min_by_key(|(_, op)| op.cost())
            .map_or(0, |(i, _)| i)
    }

    pub(super) fn contains(&self, vertex: &Vertex) -> bool {
        self.operands.iter().all(|op| op.contains(vertex))
    }

    fn intersect<'a>(&'a self, source: VertexIter<'a>, driver: usize) -> VertexIter<'a> {
        Box::new(source.filter(move |vertex| {
            self.operands
                .iter()
                .enumerate()
                .all(|(i, op)| i == driver || op.contains(vertex))
        }))
    }

    pub(super) fn matching(&self, vertex_type: VertexTypeId) -> VertexIter<'_> {
        let driver = self.driver();
        self.intersect(self.operands[driver].matching(vertex_type), driver)
    }

    pub(super) fn matching_all(&self) -> VertexIter<'_> {
        let driver = self.driver();
        tracing::trace!(
            driver = self.operands[driver].name(),
            operands = self.operands.len(),
            "conjunction driver chosen"
        );
        self.intersect(self.operands[driver].matching_all(), driver)
    }

    pub(super) fn context(&self) -> &Arc<PlanContext> {
        self.operands[0].context()
    }
}

/// Yields snapshots matched by at least one operand, each once.
#[derive(Debug)]
pub struct OrOperator {
    operands: Vec<QueryPlan>,
}

impl OrOperator {
    pub(super) fn new(operands: Vec<QueryPlan>) -> Result<Self> {
        if operands.is_empty() {
            return Err(QueryError::EmptyComposite("Or").into());
        }
        Ok(Self { operands })
    }

    /// Returns the operands.
    #[must_use]
    pub fn operands(&self) -> &[QueryPlan] {
        &self.operands
    }

    pub(super) fn contains(&self, vertex: &Vertex) -> bool {
        self.operands.iter().any(|op| op.contains(vertex))
    }

    pub(super) fn matching(&self, vertex_type: VertexTypeId) -> VertexIter<'_> {
        distinct(Box::new(
            self.operands
                .iter()
                .flat_map(move |op| op.matching(vertex_type)),
        ))
    }

    pub(super) fn matching_all(&self) -> VertexIter<'_> {
        distinct(Box::new(self.operands.iter().flat_map(QueryPlan::matching_all)))
    }

    pub(super) fn context(&self) -> &Arc<PlanContext> {
        self.operands[0].context()
    }
}

fn distinct(source: VertexIter<'_>) -> VertexIter<'_> {
    let mut seen: FxHashSet<VertexKey> = FxHashSet::default();
    Box::new(source.filter(move |vertex| seen.insert(vertex.key())))
}

/// Yields the snapshots of the operand's extent the operand does not match.
#[derive(Debug)]
pub struct NotOperator {
    operand: Box<QueryPlan>,
    extent: Extent,
}

impl NotOperator {
    pub(super) fn new(operand: QueryPlan) -> Result<Self> {
        let extent = operand.extent().cloned().ok_or_else(|| {
            QueryError::UnboundedNegation(format!(
                "operands of {} range over different extents",
                operand.name()
            ))
        })?;
        Ok(Self {
            operand: Box::new(operand),
            extent,
        })
    }

    /// Returns the negated operand.
    #[must_use]
    pub fn operand(&self) -> &QueryPlan {
        &self.operand
    }

    /// Returns the extent the complement is taken in.
    #[must_use]
    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    pub(super) fn contains(&self, vertex: &Vertex) -> bool {
        self.extent.contains(self.context(), vertex) && !self.operand.contains(vertex)
    }

    pub(super) fn matching(&self, vertex_type: VertexTypeId) -> VertexIter<'_> {
        if !self.extent.covers(vertex_type) {
            return Box::new(std::iter::empty());
        }
        let ctx = self.context();
        Box::new(
            ctx.store()
                .get_vertices_by_type_id(
                    ctx.access(),
                    vertex_type,
                    None,
                    self.extent.editions(),
                    self.extent.revisions(),
                )
                .filter(move |vertex| !self.operand.contains(vertex)),
        )
    }

    pub(super) fn matching_all(&self) -> VertexIter<'_> {
        Box::new(
            self.extent
                .types()
                .iter()
                .flat_map(move |&vertex_type| self.matching(vertex_type)),
        )
    }

    pub(super) fn context(&self) -> &Arc<PlanContext> {
        self.operand.context()
    }

    pub(super) fn cost(&self) -> AccessCost {
        AccessCost::Composite
    }
}
