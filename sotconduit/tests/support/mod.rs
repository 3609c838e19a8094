//! テスト共通フィクスチャ

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sotconduit::audit::{
    AuditBroker, AuditManager, AuditReceipt, InMemoryAuditTrail, TransactionRef,
};
use sotconduit::encoding::JsonEncoder;
use sotconduit::error::{BrokerError, SourceError};
use sotconduit::gatekeeper::{Gatekeeper, InMemorySourceOfTruth, SourceOfTruth};
use sotconduit::topology::resolver::{workshop_path, DEFAULT_WORKSHOP};
use sotconduit::topology::{IdentityResolver, InMemoryTopologyStore};
use sotconduit_common::protocol::{ResultSet, WorkUnit};
use sotconduit_common::types::{
    ComponentIdentity, HierarchicalName, NodeKind, Resource, ResourceKey, SearchCriteria,
    TopologyNode,
};

pub fn root() -> HierarchicalName {
    HierarchicalName::root("Site", "site-a").child("ProcessingPlant", "sotconduit")
}

pub async fn seeded_store() -> InMemoryTopologyStore {
    InMemoryTopologyStore::with_nodes(vec![
        TopologyNode::new(root(), NodeKind::ProcessingPlant, "1.0.0"),
        TopologyNode::new(
            workshop_path(&root(), DEFAULT_WORKSHOP),
            NodeKind::Workshop,
            "1.0.0",
        ),
    ])
    .await
}

pub fn patient(id: &str, family: &str) -> Resource {
    Resource::new("Patient")
        .with_id(id)
        .with_field("family", family)
        .with_field(
            "identifier",
            json!([{"system": "urn:mrn", "value": format!("MRN-{}", id)}]),
        )
}

/// Gatekeeper over `source`, audited into `trail`
pub async fn gatekeeper<S: SourceOfTruth + ?Sized>(
    trail: &InMemoryAuditTrail,
    source: Arc<S>,
) -> Gatekeeper<S> {
    let audit = Arc::new(AuditManager::new(
        Arc::new(trail.clone()),
        Arc::new(JsonEncoder),
    ));
    gatekeeper_with(audit, source).await
}

pub async fn gatekeeper_with<S: SourceOfTruth + ?Sized>(
    audit: Arc<AuditManager>,
    source: Arc<S>,
) -> Gatekeeper<S> {
    let resolver = IdentityResolver::new(Arc::new(seeded_store().await));
    Gatekeeper::initialise(&root(), "Patient", "4.0.1", &resolver, audit, source)
        .await
        .unwrap()
}

/// Broker that sleeps before delegating to an in-memory trail
pub struct SlowBroker {
    pub delay: Duration,
    pub trail: InMemoryAuditTrail,
    calls: AtomicUsize,
}

impl SlowBroker {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            trail: InMemoryAuditTrail::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuditBroker for SlowBroker {
    async fn open(
        &self,
        identity: &ComponentIdentity,
        action_label: &str,
        work_unit: &WorkUnit,
    ) -> Result<AuditReceipt, BrokerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.trail.open(identity, action_label, work_unit).await
    }

    async fn close(
        &self,
        identity: &ComponentIdentity,
        action_label: &str,
        work_unit: &WorkUnit,
        parent: &TransactionRef,
    ) -> Result<AuditReceipt, BrokerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.trail.close(identity, action_label, work_unit, parent).await
    }
}

/// Failure injected into every hook call of [`FaultySource`]
#[derive(Debug, Clone, Default)]
pub enum Fault {
    #[default]
    None,
    Error(SourceError),
    Panic,
    NoResultSet,
    /// フック内で指定時間待機する
    Hang(Duration),
}

/// Source of truth with injectable failures and a call counter
pub struct FaultySource {
    inner: InMemorySourceOfTruth,
    fault: Mutex<Fault>,
    calls: AtomicUsize,
}

impl FaultySource {
    pub fn new(fault: Fault) -> Self {
        Self {
            inner: InMemorySourceOfTruth::new("Patient"),
            fault: Mutex::new(fault),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_fault(&self, fault: Fault) {
        *self.fault.lock().unwrap() = fault;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn check(&self) -> Result<bool, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fault = self.fault.lock().unwrap().clone();
        match fault {
            Fault::None => Ok(true),
            Fault::Error(err) => Err(err),
            Fault::Panic => panic!("injected source-of-truth panic"),
            Fault::NoResultSet => Ok(false),
            Fault::Hang(delay) => {
                tokio::time::sleep(delay).await;
                Ok(true)
            }
        }
    }
}

#[async_trait]
impl SourceOfTruth for FaultySource {
    async fn perform_create(&self, resource: Resource) -> Result<Resource, SourceError> {
        self.check().await?;
        self.inner.perform_create(resource).await
    }

    async fn perform_read(&self, key: &ResourceKey) -> Result<Option<Resource>, SourceError> {
        self.check().await?;
        self.inner.perform_read(key).await
    }

    async fn perform_update(&self, resource: Resource) -> Result<Resource, SourceError> {
        self.check().await?;
        self.inner.perform_update(resource).await
    }

    async fn perform_delete(&self, key: &ResourceKey) -> Result<Option<Resource>, SourceError> {
        self.check().await?;
        self.inner.perform_delete(key).await
    }

    async fn perform_search(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Option<ResultSet>, SourceError> {
        if !self.check().await? {
            return Ok(None);
        }
        self.inner.perform_search(criteria).await
    }
}
