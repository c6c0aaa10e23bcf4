#![allow(missing_docs)]

use std::sync::Arc;

use proptest::prelude::*;
use revgraph_common::types::{VertexId, VertexTypeId};
use revgraph_core::graph::Vertex;
use revgraph_core::schema::TypeCatalog;
use revgraph_engine::{Config, MetaManager};

const DOC: VertexTypeId = VertexTypeId::new(3);

#[derive(Debug, Clone)]
enum Step {
    Create,
    AddAt(u64),
    Remove(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => Just(Step::Create),
        1 => (0u64..200).prop_map(Step::AddAt),
        1 => (0usize..16).prop_map(Step::Remove),
    ]
}

fn catalog() -> Arc<TypeCatalog> {
    let catalog = TypeCatalog::new();
    catalog.define_vertex_type(DOC, "Doc", None).unwrap();
    Arc::new(catalog)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn ids_never_reused_across_reload(steps in prop::collection::vec(step(), 1..24)) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::persistent(dir.path());
        let mut issued: Vec<VertexId> = Vec::new();

        {
            let manager = MetaManager::create(config.clone(), catalog()).unwrap();
            let security = manager.security_manager().issue();
            let tx = manager.begin_transaction(security).unwrap();
            for step in &steps {
                match *step {
                    Step::Create => {
                        let vertex = manager
                            .create_vertex(security, tx, DOC, std::iter::empty(), None)
                            .unwrap();
                        prop_assert!(!issued.contains(&vertex.vertex_id()));
                        issued.push(vertex.vertex_id());
                    }
                    Step::AddAt(raw) => {
                        let id = VertexId::new(raw);
                        let added = manager
                            .add_vertex(security, tx, Vertex::new(DOC, id), None, None)
                            .unwrap();
                        prop_assert_eq!(added, !issued.contains(&id));
                        if added {
                            issued.push(id);
                        }
                    }
                    Step::Remove(slot) => {
                        if !issued.is_empty() {
                            let id = issued.remove(slot % issued.len());
                            prop_assert!(manager.remove_vertex(security, tx, DOC, id).unwrap());
                        }
                    }
                }
            }
            manager.commit_transaction(security, tx).unwrap();
            manager.close().unwrap();
        }

        let manager = MetaManager::create(config, catalog()).unwrap();
        let security = manager.security_manager().issue();
        let tx = manager.begin_transaction(security).unwrap();
        let next = manager
            .create_vertex(security, tx, DOC, std::iter::empty(), None)
            .unwrap()
            .vertex_id();
        let expected = issued.iter().max().map_or(VertexId::new(0), |id| id.next());
        prop_assert_eq!(next, expected);
    }
}
