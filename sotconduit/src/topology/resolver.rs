//! アクセサーIDの解決
//!
//! Builds the accessor identity `root → [Workshop=<name>] → [WUP=Accessor-<type>]`
//! and registers it with the topology store exactly once per
//! (root, workshop, accessor, version).

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, trace};

use sotconduit_common::types::{ComponentIdentity, HierarchicalName, NodeKind};

use super::store::TopologyStore;
use crate::error::TopologyError;

/// Default workshop hosting accessors
pub const DEFAULT_WORKSHOP: &str = "Edge";

/// Prefix of an accessor's leaf segment
pub const ACCESSOR_PREFIX: &str = "Accessor-";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct IdentityKey {
    root: HierarchicalName,
    workshop: String,
    accessor: String,
    version: String,
}

/// Path of the workshop node under `root`
pub fn workshop_path(root: &HierarchicalName, workshop: &str) -> HierarchicalName {
    root.child(NodeKind::Workshop.as_str(), workshop)
}

/// Path of the accessor node for `accessor_type_name` under the workshop
pub fn accessor_path(
    root: &HierarchicalName,
    workshop: &str,
    accessor_type_name: &str,
) -> HierarchicalName {
    workshop_path(root, workshop).child(
        NodeKind::Wup.as_str(),
        format!("{}{}", ACCESSOR_PREFIX, accessor_type_name),
    )
}

/// Resolves and caches accessor identities
///
/// Registration happens under a resolver-wide async mutex, so concurrent
/// first calls for the same key register once. Failed resolutions are not
/// cached.
pub struct IdentityResolver {
    store: Arc<dyn TopologyStore>,
    workshop: String,
    resolved: Mutex<HashMap<IdentityKey, ComponentIdentity>>,
}

impl IdentityResolver {
    /// Resolver placing accessors under the default "Edge" workshop
    pub fn new(store: Arc<dyn TopologyStore>) -> Self {
        Self::with_workshop(store, DEFAULT_WORKSHOP)
    }

    /// Resolver placing accessors under the given workshop
    pub fn with_workshop(store: Arc<dyn TopologyStore>, workshop: impl Into<String>) -> Self {
        Self {
            store,
            workshop: workshop.into(),
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Workshop name used by this resolver
    pub fn workshop(&self) -> &str {
        &self.workshop
    }

    /// Resolve (and on first use register) the identity of an accessor
    pub async fn resolve_accessor_identity(
        &self,
        root: &HierarchicalName,
        accessor_type_name: &str,
        version: &str,
    ) -> Result<ComponentIdentity, TopologyError> {
        debug!(
            root = %root,
            accessor = accessor_type_name,
            version,
            "resolve_accessor_identity(): Entry"
        );
        let key = self.key(root, accessor_type_name, version);

        let mut resolved = self.resolved.lock().await;
        if let Some(identity) = resolved.get(&key) {
            trace!(identity = %identity, "resolve_accessor_identity(): cache hit");
            return Ok(identity.clone());
        }

        let identity = self
            .build_and_register(root, accessor_type_name, version)
            .await?;
        resolved.insert(key, identity.clone());
        Ok(identity)
    }

    /// Previously resolved identity, without touching the store
    pub async fn cached(
        &self,
        root: &HierarchicalName,
        accessor_type_name: &str,
        version: &str,
    ) -> Option<ComponentIdentity> {
        let key = self.key(root, accessor_type_name, version);
        self.resolved.lock().await.get(&key).cloned()
    }

    fn key(&self, root: &HierarchicalName, accessor: &str, version: &str) -> IdentityKey {
        IdentityKey {
            root: root.clone(),
            workshop: self.workshop.clone(),
            accessor: accessor.to_string(),
            version: version.to_string(),
        }
    }

    async fn build_and_register(
        &self,
        root: &HierarchicalName,
        accessor_type_name: &str,
        version: &str,
    ) -> Result<ComponentIdentity, TopologyError> {
        if accessor_type_name.trim().is_empty() {
            return Err(TopologyError::Registration(
                "accessor type name must not be empty".to_string(),
            ));
        }

        let workshop_id = workshop_path(root, &self.workshop);
        trace!(workshop = %workshop_id, "build_and_register(): retrieving workshop node");
        let workshop = match self.store.get_node(&workshop_id).await? {
            Some(node) => node,
            None => {
                error!(
                    workshop = %workshop_id,
                    accessor = accessor_type_name,
                    "Parent workshop scope is not registered; accessor identity cannot be resolved"
                );
                return Err(TopologyError::MissingParentScope(workshop_id));
            }
        };

        let identity = ComponentIdentity {
            path: accessor_path(root, &self.workshop, accessor_type_name),
            version: version.to_string(),
            concurrency_mode: workshop.concurrency_mode,
            resilience_mode: workshop.resilience_mode,
            registered: true,
            containing_element: workshop.id,
        };

        trace!(identity = %identity, "build_and_register(): registering accessor node");
        self.store.register_node(identity.to_node()).await?;
        info!(identity = %identity, "Accessor identity registered");
        Ok(identity)
    }
}
