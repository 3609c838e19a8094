//! 並行解決時の一回限りの登録

use std::sync::Arc;

use sotconduit::topology::resolver::{workshop_path, DEFAULT_WORKSHOP};
use sotconduit::topology::{IdentityResolver, InMemoryTopologyStore};
use sotconduit_common::types::{HierarchicalName, NodeKind, TopologyNode};

fn root() -> HierarchicalName {
    HierarchicalName::root("ProcessingPlant", "sotconduit")
}

async fn resolver_with_store() -> (Arc<IdentityResolver>, InMemoryTopologyStore) {
    let store = InMemoryTopologyStore::with_nodes(vec![TopologyNode::new(
        workshop_path(&root(), DEFAULT_WORKSHOP),
        NodeKind::Workshop,
        "1.0.0",
    )])
    .await;
    let resolver = Arc::new(IdentityResolver::new(Arc::new(store.clone())));
    (resolver, store)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_resolution_registers_once() {
    let (resolver, store) = resolver_with_store().await;

    let mut tasks = Vec::new();
    for _ in 0..32 {
        let resolver = resolver.clone();
        tasks.push(tokio::spawn(async move {
            resolver
                .resolve_accessor_identity(&root(), "Patient", "4.0.1")
                .await
        }));
    }

    let mut paths = Vec::new();
    for task in tasks {
        paths.push(task.await.unwrap().unwrap().path);
    }

    assert!(paths.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(store.registration_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_distinct_accessors_register_each_once() {
    let (resolver, store) = resolver_with_store().await;
    let types = ["Patient", "Encounter", "Practitioner", "Organization"];

    let mut tasks = Vec::new();
    for i in 0..40 {
        let resolver = resolver.clone();
        let accessor = types[i % types.len()];
        tasks.push(tokio::spawn(async move {
            resolver
                .resolve_accessor_identity(&root(), accessor, "4.0.1")
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(store.registration_count(), types.len());
    let workshop = workshop_path(&root(), DEFAULT_WORKSHOP);
    assert_eq!(store.children(&workshop).await.len(), types.len());
}
