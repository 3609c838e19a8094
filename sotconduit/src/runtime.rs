//! ランタイム構築
//!
//! Wires configuration, topology store, buffered audit broker, audit
//! manager and identity resolver together, and hands out gatekeepers.

use std::sync::Arc;
use tracing::info;

use sotconduit_common::config::ConduitConfig;
use sotconduit_common::types::HierarchicalName;

use crate::audit::{AuditManager, AuditTrailSink, AuditWriterConfig, QueuedAuditBroker};
use crate::encoding::{Encoder, JsonEncoder};
use crate::error::GatekeeperResult;
use crate::gatekeeper::{Gatekeeper, SourceOfTruth};
use crate::topology::{IdentityResolver, TopologyStore};

/// Shared services of a running conduit
pub struct ConduitRuntime {
    config: ConduitConfig,
    resolver: Arc<IdentityResolver>,
    audit: Arc<AuditManager>,
}

impl ConduitRuntime {
    /// Build the runtime with the default JSON encoder
    ///
    /// Spawns the audit flush task, so it must be called from within a tokio
    /// runtime.
    pub fn new(
        config: ConduitConfig,
        store: Arc<dyn TopologyStore>,
        sink: Arc<dyn AuditTrailSink>,
    ) -> Self {
        Self::with_encoder(config, store, sink, Arc::new(JsonEncoder))
    }

    /// Build the runtime with a custom encoder
    pub fn with_encoder(
        config: ConduitConfig,
        store: Arc<dyn TopologyStore>,
        sink: Arc<dyn AuditTrailSink>,
        encoder: Arc<dyn Encoder>,
    ) -> Self {
        let broker = QueuedAuditBroker::new(sink, AuditWriterConfig::from(&config));
        let audit = AuditManager::from_config(Arc::new(broker), encoder, &config);
        let resolver = IdentityResolver::with_workshop(store, config.workshop_name.as_str());
        info!(
            workshop = %config.workshop_name,
            definer = %config.classification_definer,
            "Conduit runtime ready"
        );
        Self {
            config,
            resolver: Arc::new(resolver),
            audit: Arc::new(audit),
        }
    }

    /// 設定
    pub fn config(&self) -> &ConduitConfig {
        &self.config
    }

    /// 監査マネージャー
    pub fn audit(&self) -> &Arc<AuditManager> {
        &self.audit
    }

    /// IDリゾルバー
    pub fn resolver(&self) -> &Arc<IdentityResolver> {
        &self.resolver
    }

    /// Gatekeeper for `resource_type` at the configured default version
    pub async fn gatekeeper<S: SourceOfTruth + ?Sized>(
        &self,
        root: &HierarchicalName,
        resource_type: &str,
        source: Arc<S>,
    ) -> GatekeeperResult<Gatekeeper<S>> {
        Gatekeeper::initialise(
            root,
            resource_type,
            self.config.default_version.as_str(),
            &self.resolver,
            Arc::clone(&self.audit),
            source,
        )
        .await
    }
}
