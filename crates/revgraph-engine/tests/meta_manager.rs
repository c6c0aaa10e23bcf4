#![allow(missing_docs)]

use std::sync::Arc;

use revgraph_common::types::{
    AttributeId, EditionName, LogicalType, SecurityToken, TransactionToken, Value, VertexId,
    VertexTypeId,
};
use revgraph_common::utils::error::{Error, LifecycleError, TransactionError};
use revgraph_core::execution::AccessCost;
use revgraph_core::graph::{Vertex, VertexUpdate};
use revgraph_core::index::IndexDefinition;
use revgraph_core::schema::TypeCatalog;
use revgraph_core::{Lifecycle, Phase, QueryPlan};
use revgraph_engine::manager::{INDEX_SNAPSHOT, VERTEX_SNAPSHOT};
use revgraph_engine::{Config, IndexConsistency, MetaManager};

const PERSON: VertexTypeId = VertexTypeId::new(1);
const CITY: VertexTypeId = VertexTypeId::new(2);
const AGE: AttributeId = AttributeId::new(1);
const NAME: AttributeId = AttributeId::new(2);

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn catalog() -> Arc<TypeCatalog> {
    let catalog = TypeCatalog::new();
    catalog.define_vertex_type(PERSON, "Person", None).unwrap();
    catalog.define_vertex_type(CITY, "City", None).unwrap();
    catalog
        .define_attribute(PERSON, AGE, "age", LogicalType::Int64)
        .unwrap();
    catalog
        .define_attribute(PERSON, NAME, "name", LogicalType::String)
        .unwrap();
    Arc::new(catalog)
}

fn age_index() -> IndexDefinition {
    IndexDefinition::btree("person_age", PERSON, AGE)
}

fn ages(
    manager: &MetaManager,
    security: SecurityToken,
    tx: TransactionToken,
    min: i64,
) -> Vec<u64> {
    let ctx = manager.plan_context(security, tx, false).unwrap();
    let plan = QueryPlan::greater_or_equal(&ctx, manager.property(PERSON, AGE).unwrap(), min)
        .unwrap();
    let mut ids: Vec<u64> = plan.execute().map(|v| v.vertex_id().as_u64()).collect();
    ids.sort_unstable();
    ids
}

#[test]
fn test_startup_leaves_everything_loaded() {
    init_tracing();
    let manager =
        MetaManager::create(Config::in_memory().with_index(age_index()), catalog()).unwrap();

    assert!(manager.is_ready());
    assert_eq!(manager.index_manager().phase(), Phase::Loaded);
    assert!(manager.index_manager().index("person_age").is_some());
    assert!(manager.id_manager().is_seeded(PERSON));
    assert!(manager.id_manager().is_seeded(CITY));
    assert_eq!(manager.transaction_manager().active_count(), 0);
}

#[test]
fn test_created_vertices_get_sequential_ids() {
    init_tracing();
    let manager = MetaManager::create(Config::in_memory(), catalog()).unwrap();
    let security = manager.security_manager().issue();
    let tx = manager.begin_transaction(security).unwrap();

    let first = manager
        .create_vertex(security, tx, PERSON, [(AGE, Value::Int64(40))], None)
        .unwrap();
    let second = manager
        .create_vertex(security, tx, PERSON, [(AGE, Value::Int64(41))], None)
        .unwrap();
    let city = manager
        .create_vertex(security, tx, CITY, std::iter::empty(), None)
        .unwrap();

    assert_eq!(first.vertex_id(), VertexId::new(0));
    assert_eq!(second.vertex_id(), VertexId::new(1));
    assert_eq!(city.vertex_id(), VertexId::new(0));
    assert_eq!(first.property(AGE), Some(&Value::Int64(40)));
    manager.commit_transaction(security, tx).unwrap();
}

#[test]
fn test_added_vertex_raises_id_counter() {
    init_tracing();
    let manager = MetaManager::create(Config::in_memory(), catalog()).unwrap();
    let security = manager.security_manager().issue();
    let tx = manager.begin_transaction(security).unwrap();

    let explicit = Vertex::new(PERSON, VertexId::new(9)).with_property(AGE, 20i64);
    assert!(manager.add_vertex(security, tx, explicit, None, None).unwrap());

    let created = manager
        .create_vertex(security, tx, PERSON, std::iter::empty(), None)
        .unwrap();
    assert_eq!(created.vertex_id(), VertexId::new(10));

    let again = Vertex::new(PERSON, VertexId::new(9));
    assert!(!manager.add_vertex(security, tx, again, None, None).unwrap());
}

#[test]
fn test_reload_seeds_ids_past_persisted_vertices() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = Config::persistent(dir.path()).with_index(age_index());

    {
        let manager = MetaManager::create(config.clone(), catalog()).unwrap();
        let security = manager.security_manager().issue();
        let tx = manager.begin_transaction(security).unwrap();
        for age in [18i64, 25, 40] {
            manager
                .create_vertex(security, tx, PERSON, [(AGE, Value::Int64(age))], None)
                .unwrap();
        }
        let late = Vertex::new(PERSON, VertexId::new(41)).with_property(AGE, 60i64);
        manager.add_vertex(security, tx, late, None, None).unwrap();
        manager.commit_transaction(security, tx).unwrap();
        manager.close().unwrap();
        manager.close().unwrap();
    }
    assert!(dir.path().join(VERTEX_SNAPSHOT).exists());
    assert!(dir.path().join(INDEX_SNAPSHOT).exists());

    let manager = MetaManager::create(config, catalog()).unwrap();
    let security = manager.security_manager().issue();
    let tx = manager.begin_transaction(security).unwrap();
    let next = manager
        .create_vertex(security, tx, PERSON, std::iter::empty(), None)
        .unwrap();
    assert_eq!(next.vertex_id(), VertexId::new(42));

    assert_eq!(manager.index_manager().index_definitions().len(), 1);
    assert_eq!(ages(&manager, security, tx, 25), vec![1, 2, 41]);
}

#[test]
fn test_queries_use_declared_indices() {
    init_tracing();
    let manager =
        MetaManager::create(Config::in_memory().with_index(age_index()), catalog()).unwrap();
    let security = manager.security_manager().issue();
    let tx = manager.begin_transaction(security).unwrap();
    for age in [10i64, 20, 30] {
        manager
            .create_vertex(security, tx, PERSON, [(AGE, Value::Int64(age))], None)
            .unwrap();
    }

    let ctx = manager.plan_context(security, tx, false).unwrap();
    let age = manager.property(PERSON, AGE).unwrap();
    let indexed = QueryPlan::greater_than(&ctx, age.clone(), 15i64).unwrap();
    let scanned = QueryPlan::equals(&ctx, manager.property(PERSON, NAME).unwrap(), "x").unwrap();
    assert_eq!(indexed.cost(), AccessCost::IndexRange);
    assert_eq!(scanned.cost(), AccessCost::FullScan);
    assert_eq!(indexed.execute().count(), 2);
    assert_eq!(scanned.execute().count(), 0);
}

#[test]
fn test_immediate_consistency_sees_updates() {
    init_tracing();
    let manager =
        MetaManager::create(Config::in_memory().with_index(age_index()), catalog()).unwrap();
    let security = manager.security_manager().issue();
    let tx = manager.begin_transaction(security).unwrap();
    let vertex = manager
        .create_vertex(security, tx, PERSON, [(AGE, Value::Int64(10))], None)
        .unwrap();
    assert!(ages(&manager, security, tx, 50).is_empty());

    let update = VertexUpdate::new().set_property(AGE, 70i64);
    manager
        .update_vertex(security, tx, PERSON, vertex.vertex_id(), &update, None, None, true)
        .unwrap()
        .unwrap();
    assert_eq!(ages(&manager, security, tx, 50), vec![0]);

    assert!(manager.remove_vertex(security, tx, PERSON, vertex.vertex_id()).unwrap());
    assert!(ages(&manager, security, tx, 0).is_empty());
}

#[test]
fn test_deferred_consistency_catches_up_on_commit() {
    init_tracing();
    let config = Config::in_memory()
        .with_index(age_index())
        .with_index_consistency(IndexConsistency::Deferred);
    let manager = MetaManager::create(config, catalog()).unwrap();
    let security = manager.security_manager().issue();

    let tx = manager.begin_transaction(security).unwrap();
    let vertex = manager
        .create_vertex(security, tx, PERSON, [(AGE, Value::Int64(30))], None)
        .unwrap();
    // The index has not seen the vertex yet, so the type is scanned.
    let index = manager.index_manager().index("person_age").unwrap();
    assert!(index.lookup(&Value::Int64(30)).is_empty());
    assert_eq!(ages(&manager, security, tx, 18), vec![0]);
    manager.commit_transaction(security, tx).unwrap();
    assert_eq!(index.lookup(&Value::Int64(30)), vec![vertex.vertex_id()]);

    let tx = manager.begin_transaction(security).unwrap();
    assert_eq!(ages(&manager, security, tx, 18), vec![0]);

    let update = VertexUpdate::new().set_property(AGE, 5i64);
    manager
        .update_vertex(security, tx, PERSON, vertex.vertex_id(), &update, None, None, false)
        .unwrap()
        .unwrap();
    assert!(ages(&manager, security, tx, 18).is_empty());
    manager.abort_transaction(security, tx).unwrap();

    let tx = manager.begin_transaction(security).unwrap();
    assert_eq!(ages(&manager, security, tx, 5), vec![0]);
}

#[test]
fn test_edition_writes_go_through_manager() {
    init_tracing();
    let manager =
        MetaManager::create(Config::in_memory().with_index(age_index()), catalog()).unwrap();
    let security = manager.security_manager().issue();
    let tx = manager.begin_transaction(security).unwrap();

    let vertex = manager
        .create_vertex(security, tx, PERSON, [(AGE, Value::Int64(20))], None)
        .unwrap();
    let draft = Vertex::new(PERSON, vertex.vertex_id()).with_property(AGE, 90i64);
    assert!(manager.add_vertex(security, tx, draft, Some("draft"), None).unwrap());
    assert_eq!(ages(&manager, security, tx, 80), Vec::<u64>::new());

    let draft_name = [EditionName::new("draft")];
    assert!(
        manager
            .remove_vertex_edition(security, tx, PERSON, vertex.vertex_id(), Some(&draft_name[..]))
            .unwrap()
    );
    assert!(
        manager
            .remove_vertex_revision(security, tx, PERSON, vertex.vertex_id(), None, None)
            .unwrap()
    );
    assert!(ages(&manager, security, tx, 0).is_empty());
}

#[test]
fn test_tokens_are_checked() {
    init_tracing();
    let manager = MetaManager::create(Config::in_memory(), catalog()).unwrap();
    let security = manager.security_manager().issue();

    let stranger = SecurityToken::new(999);
    assert!(matches!(
        manager.begin_transaction(stranger),
        Err(Error::Security(_))
    ));

    let tx = manager.begin_transaction(security).unwrap();
    manager.commit_transaction(security, tx).unwrap();
    assert!(matches!(
        manager.plan_context(security, tx, false),
        Err(Error::Transaction(TransactionError::NotActive(_)))
    ));
    assert!(matches!(
        manager.create_vertex(security, tx, PERSON, std::iter::empty(), None),
        Err(Error::Transaction(TransactionError::NotActive(_)))
    ));

    let tx = manager.begin_transaction(security).unwrap();
    manager.security_manager().revoke(security);
    assert!(matches!(
        manager.plan_context(security, tx, false),
        Err(Error::Security(_))
    ));
}

#[test]
fn test_closed_manager_refuses_requests() {
    init_tracing();
    let manager = MetaManager::create(Config::in_memory(), catalog()).unwrap();
    let security = manager.security_manager().issue();
    manager.close().unwrap();

    assert!(!manager.is_ready());
    assert!(matches!(
        manager.begin_transaction(security),
        Err(Error::Lifecycle(LifecycleError::NotReady(_)))
    ));
}

#[test]
fn test_late_vertex_types_are_registered() {
    init_tracing();
    let types = catalog();
    let manager = MetaManager::create(Config::in_memory(), types.clone()).unwrap();
    let security = manager.security_manager().issue();
    let tx = manager.begin_transaction(security).unwrap();

    let late = VertexTypeId::new(7);
    types.define_vertex_type(late, "Late", None).unwrap();
    assert!(manager.create_vertex(security, tx, late, std::iter::empty(), None).is_err());

    manager.register_vertex_type(late).unwrap();
    let vertex = manager
        .create_vertex(security, tx, late, std::iter::empty(), None)
        .unwrap();
    assert_eq!(vertex.vertex_id(), VertexId::new(0));
}

#[test]
fn test_startup_fails_on_bad_input() {
    init_tracing();
    let err = MetaManager::create(Config::in_memory().with_scan_batch_size(0), catalog())
        .err()
        .unwrap();
    assert!(matches!(err, Error::Config(_)));

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(VERTEX_SNAPSHOT), b"not a snapshot").unwrap();
    let err = MetaManager::create(Config::persistent(dir.path()), catalog())
        .err()
        .unwrap();
    assert!(matches!(err, Error::Storage(_)));
}
