use objgraph_context::{GraphManager, ObjectContext, ObjectStore};
use objgraph_model::{
    downcast_ref, into_handle, DataObject, ObjectHandle, ObjectId, PersistenceState, Value,
};
use objgraph_reflect::{ClassDescriptor, EntityResolver};
use proptest::prelude::*;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

/// Node i: optional `next` arc and a set of `links`.
type Graph = Vec<(Option<usize>, BTreeSet<usize>)>;

fn graph_strategy() -> impl Strategy<Value = Graph> {
    (1usize..10).prop_flat_map(|n| {
        prop::collection::vec(
            (
                prop::option::of(0..n),
                prop::collection::btree_set(0..n, 0..4),
            ),
            n,
        )
    })
}

fn node_model() -> Arc<EntityResolver> {
    let mut resolver = EntityResolver::new();
    resolver
        .register(
            ClassDescriptor::data_object("Node")
                .with_attribute("label")
                .with_to_one("next", "Node", None)
                .with_to_many("links", "Node", None),
        )
        .expect("register Node");
    Arc::new(resolver)
}

fn nid(i: usize) -> ObjectId {
    ObjectId::permanent("Node", "ID", i as i64)
}

fn build_source(graph: &Graph) -> (ObjectStore, ObjectHandle) {
    let mut source = ObjectStore::new();
    let mut root = None;
    for (i, (next, links)) in graph.iter().enumerate() {
        let handle = into_handle(
            DataObject::with_id("Node", nid(i))
                .with_value("label", format!("node {i}"))
                .with_value("next", next.map(nid))
                .with_value("links", links.iter().copied().map(nid).collect::<Vec<_>>()),
        );
        source.register_node(nid(i), Arc::clone(&handle));
        root.get_or_insert(handle);
    }
    (source, root.expect("graph has at least one node"))
}

fn reachable_from_root(graph: &Graph) -> BTreeSet<usize> {
    let mut seen = BTreeSet::from([0]);
    let mut queue = VecDeque::from([0]);
    while let Some(i) = queue.pop_front() {
        let (next, links) = &graph[i];
        for j in next.iter().chain(links.iter()) {
            if seen.insert(*j) {
                queue.push_back(*j);
            }
        }
    }
    seen
}

fn snapshot(handle: &ObjectHandle) -> (PersistenceState, Vec<(String, Value)>) {
    let object = handle.read();
    let data = downcast_ref::<DataObject>(&*object).expect("data object");
    (
        data.state(),
        data.values()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    /// One target per distinct id, every arc linked to that target's id, and
    /// a repeated merge reuses the same targets.
    #[test]
    fn merge_uniques_every_reachable_id(graph in graph_strategy()) {
        let (source, root) = build_source(&graph);
        let reachable = reachable_from_root(&graph);
        let mut ctx = ObjectContext::with_defaults(node_model()).expect("context");

        let report = ctx.merge(&source, &[Arc::clone(&root)]).expect("merge");
        prop_assert_eq!(ctx.len(), reachable.len());
        prop_assert_eq!(report.stats.visited, reachable.len());
        prop_assert_eq!(report.stats.created, reachable.len());

        for &i in &reachable {
            let (state, values) = snapshot(&ctx.object(&nid(i)).expect("merged"));
            prop_assert_eq!(state, PersistenceState::Committed);

            let (next, links) = &graph[i];
            let expected_next: Value = next.map(nid).into();
            let expected_links = Value::Objects(links.iter().copied().map(nid).collect());
            let lookup = |name: &str| {
                values
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_default()
            };
            prop_assert_eq!(lookup("next"), expected_next);
            prop_assert_eq!(lookup("links"), expected_links);
        }

        let first: Vec<ObjectHandle> = reachable
            .iter()
            .map(|&i| ctx.object(&nid(i)).expect("merged"))
            .collect();
        let again = ctx.merge(&source, &[root]).expect("second merge");
        prop_assert_eq!(again.stats.created, 0);
        prop_assert_eq!(ctx.len(), reachable.len());
        for (&i, handle) in reachable.iter().zip(&first) {
            prop_assert!(Arc::ptr_eq(handle, &ctx.object(&nid(i)).expect("merged")));
        }
    }

    /// Objects with local changes come out of a merge exactly as they went in.
    #[test]
    fn merge_never_touches_dirty_targets(
        (graph, dirty) in graph_strategy().prop_flat_map(|graph| {
            let n = graph.len();
            (Just(graph), prop::collection::btree_set(0..n, 0..n))
        })
    ) {
        let (source, root) = build_source(&graph);
        let mut ctx = ObjectContext::with_defaults(node_model()).expect("context");

        let mut before = Vec::new();
        for &i in &dirty {
            let handle = into_handle(DataObject::with_id("Node", nid(i)));
            ctx.register_object(&handle).expect("register");
            ctx.write_property(&nid(i), "label", "local".into()).expect("local edit");
            before.push((i, snapshot(&handle)));
        }

        let report = ctx.merge(&source, &[root]).expect("merge");
        prop_assert!(report.stats.skipped_dirty <= dirty.len());

        for (i, expected) in before {
            let handle = ctx.object(&nid(i)).expect("still registered");
            let after = snapshot(&handle);
            prop_assert_eq!(after.0, PersistenceState::Modified);
            prop_assert_eq!(after, expected);
        }
    }
}
