#![allow(missing_docs)]
//! Benchmark: comparison leaves over an indexed and an unindexed store.
//!
//! Populates `n` vertices with a uniformly spread integer attribute and
//! measures a selective range query through the ordered index against the
//! same query answered by a full scan.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use revgraph_common::types::{
    AccessContext, AttributeId, LogicalType, SecurityToken, TransactionToken, VertexId,
    VertexTypeId,
};
use revgraph_core::execution::{PlanContext, QueryPlan, QueryPlanProperty};
use revgraph_core::graph::{InMemoryVertexStore, Vertex, VertexStore};
use revgraph_core::index::{IndexDefinition, IndexManager};
use revgraph_core::lifecycle::Lifecycle;
use revgraph_core::schema::TypeCatalog;

const SENSOR: VertexTypeId = VertexTypeId::new(1);
const READING: AttributeId = AttributeId::new(1);

fn access() -> AccessContext {
    AccessContext::new(SecurityToken::SYSTEM, TransactionToken::new(1))
}

fn setup(n: u64) -> (TypeCatalog, Arc<InMemoryVertexStore>, Arc<IndexManager>) {
    let catalog = TypeCatalog::new();
    catalog.define_vertex_type(SENSOR, "Sensor", None).unwrap();
    catalog.define_attribute(SENSOR, READING, "reading", LogicalType::Int64).unwrap();

    let store = Arc::new(InMemoryVertexStore::new());
    store.initialize().unwrap();
    store.load(&access()).unwrap();
    for id in 0..n {
        let reading = i64::try_from(id.wrapping_mul(7919) % 1000).unwrap();
        let vertex = Vertex::new(SENSOR, VertexId::new(id)).with_property(READING, reading);
        store.add_vertex(&access(), vertex, None, None);
    }

    let indices = Arc::new(IndexManager::new(store.clone()));
    indices.initialize().unwrap();
    indices.load(&access()).unwrap();
    indices
        .create_index(&access(), IndexDefinition::btree("reading", SENSOR, READING))
        .unwrap();
    (catalog, store, indices)
}

fn bench_range_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("range_query");
    for n in [1_000u64, 10_000, 50_000] {
        let (catalog, store, indices) = setup(n);
        let scan = Arc::new(PlanContext::new(
            SecurityToken::SYSTEM,
            TransactionToken::new(1),
            store.clone(),
            false,
        ));
        let indexed = Arc::new(
            PlanContext::new(SecurityToken::SYSTEM, TransactionToken::new(1), store, false)
                .with_indices(indices),
        );
        group.throughput(Throughput::Elements(n));

        for (label, ctx) in [("scan", &scan), ("index", &indexed)] {
            let property = QueryPlanProperty::resolve(&catalog, SENSOR, READING).unwrap();
            let plan = QueryPlan::greater_or_equal(ctx, property, 990).unwrap();
            group.bench_with_input(BenchmarkId::new(label, n), &plan, |b, plan| {
                b.iter(|| plan.execute().count());
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_range_query);
criterion_main!(benches);
