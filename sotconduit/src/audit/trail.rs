//! インメモリ監査トレイル
//!
//! Records every open/close (or every flushed entry when used as an
//! [`AuditTrailSink`]) in arrival order. Useful as a reference broker and in
//! tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use sotconduit_common::protocol::WorkUnit;
use sotconduit_common::types::ComponentIdentity;

use super::broker::{AuditBroker, AuditReceipt, AuditTrailEntry, TransactionPhase, TransactionRef};
use super::writer::AuditTrailSink;
use crate::error::BrokerError;

/// インメモリの監査トレイル
#[derive(Clone)]
pub struct InMemoryAuditTrail {
    entries: Arc<RwLock<Vec<AuditTrailEntry>>>,
    available: Arc<AtomicBool>,
}

impl Default for InMemoryAuditTrail {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl InMemoryAuditTrail {
    /// 新しいトレイルを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle availability; an unavailable trail rejects every call
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// 記録済みエントリ（到着順）
    pub async fn entries(&self) -> Vec<AuditTrailEntry> {
        self.entries.read().await.clone()
    }

    /// 記録済みエントリ数
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// 空かどうか
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Number of opening entries
    pub async fn open_count(&self) -> usize {
        self.count_phase(TransactionPhase::Open).await
    }

    /// Number of closing entries
    pub async fn close_count(&self) -> usize {
        self.count_phase(TransactionPhase::Close).await
    }

    /// Closing entries whose parent is `transaction_id`
    pub async fn closes_for(&self, transaction_id: Uuid) -> Vec<AuditTrailEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.parent_id == Some(transaction_id))
            .cloned()
            .collect()
    }

    async fn count_phase(&self, phase: TransactionPhase) -> usize {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.phase == phase)
            .count()
    }

    fn check_available(&self) -> Result<(), BrokerError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BrokerError::Unavailable(
                "in-memory audit trail is offline".to_string(),
            ))
        }
    }

    async fn record(&self, entry: AuditTrailEntry) -> Result<AuditReceipt, BrokerError> {
        self.check_available()?;
        let receipt = entry.receipt();
        self.entries.write().await.push(entry);
        Ok(receipt)
    }
}

#[async_trait]
impl AuditBroker for InMemoryAuditTrail {
    async fn open(
        &self,
        identity: &ComponentIdentity,
        action_label: &str,
        work_unit: &WorkUnit,
    ) -> Result<AuditReceipt, BrokerError> {
        self.record(AuditTrailEntry::opening(identity, action_label, work_unit))
            .await
    }

    async fn close(
        &self,
        identity: &ComponentIdentity,
        action_label: &str,
        work_unit: &WorkUnit,
        parent: &TransactionRef,
    ) -> Result<AuditReceipt, BrokerError> {
        self.record(AuditTrailEntry::closing(
            identity,
            action_label,
            work_unit,
            parent,
        ))
        .await
    }
}

#[async_trait]
impl AuditTrailSink for InMemoryAuditTrail {
    async fn persist(&self, entries: Vec<AuditTrailEntry>) -> Result<(), BrokerError> {
        self.check_available()?;
        self.entries.write().await.extend(entries);
        Ok(())
    }
}
