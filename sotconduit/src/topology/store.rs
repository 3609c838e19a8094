//! トポロジーストア
//!
//! Hierarchical node persistence. [`InMemoryTopologyStore`] keeps nodes in
//! memory keyed by their id token.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use sotconduit_common::types::{HierarchicalName, TopologyNode};

use crate::error::TopologyError;

/// Hierarchical identity persistence
#[async_trait]
pub trait TopologyStore: Send + Sync {
    /// Look up a node by id
    async fn get_node(&self, id: &HierarchicalName) -> Result<Option<TopologyNode>, TopologyError>;
    /// Register (insert or replace) a node
    async fn register_node(&self, node: TopologyNode) -> Result<(), TopologyError>;
}

/// インメモリのトポロジーストア
#[derive(Clone, Default)]
pub struct InMemoryTopologyStore {
    nodes: Arc<RwLock<HashMap<HierarchicalName, TopologyNode>>>,
    registrations: Arc<AtomicUsize>,
}

impl InMemoryTopologyStore {
    /// 新しいストアを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the given nodes (not counted as registrations)
    pub async fn with_nodes(nodes: impl IntoIterator<Item = TopologyNode>) -> Self {
        let store = Self::new();
        {
            let mut map = store.nodes.write().await;
            for node in nodes {
                map.insert(node.id.clone(), node);
            }
        }
        store
    }

    /// Number of `register_node` calls served so far
    pub fn registration_count(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    /// 全ノードを取得
    pub async fn list(&self) -> Vec<TopologyNode> {
        let nodes = self.nodes.read().await;
        let mut list: Vec<TopologyNode> = nodes.values().cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    /// Direct children of `parent`
    pub async fn children(&self, parent: &HierarchicalName) -> Vec<TopologyNode> {
        let nodes = self.nodes.read().await;
        let mut list: Vec<TopologyNode> = nodes
            .values()
            .filter(|n| n.containing_element.as_ref() == Some(parent))
            .cloned()
            .collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }
}

#[async_trait]
impl TopologyStore for InMemoryTopologyStore {
    async fn get_node(&self, id: &HierarchicalName) -> Result<Option<TopologyNode>, TopologyError> {
        let nodes = self.nodes.read().await;
        Ok(nodes.get(id).cloned())
    }

    async fn register_node(&self, node: TopologyNode) -> Result<(), TopologyError> {
        if node.id.is_empty() {
            return Err(TopologyError::Registration(
                "node id must not be empty".to_string(),
            ));
        }
        let mut nodes = self.nodes.write().await;
        self.registrations.fetch_add(1, Ordering::SeqCst);
        nodes.insert(node.id.clone(), node);
        Ok(())
    }
}
