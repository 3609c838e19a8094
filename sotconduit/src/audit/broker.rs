//! 監査ブローカー
//!
//! The broker persists or forwards audit transaction records. A transaction
//! is opened once with the ingress envelope and closed once with the final
//! envelope, referencing the opening record as its parent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sotconduit_common::protocol::WorkUnit;
use sotconduit_common::types::{AccessAction, ComponentIdentity, HierarchicalName};

use crate::error::BrokerError;

/// Acknowledgement returned by the broker for a recorded entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReceipt {
    /// トランザクションID
    pub transaction_id: Uuid,
    /// 記録時刻
    pub recorded_at: DateTime<Utc>,
}

/// Correlation reference of an open transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRef {
    /// トランザクションID
    pub transaction_id: Uuid,
    /// 操作種別
    pub action: AccessAction,
    /// 開始時刻
    pub opened_at: DateTime<Utc>,
    /// ブローカーが開始を受理したか
    pub delivered: bool,
}

impl TransactionRef {
    /// Reference built from a broker receipt
    pub fn from_receipt(receipt: AuditReceipt, action: AccessAction) -> Self {
        Self {
            transaction_id: receipt.transaction_id,
            action,
            opened_at: receipt.recorded_at,
            delivered: true,
        }
    }

    /// Locally generated reference used when the broker could not be reached
    pub fn local(action: AccessAction) -> Self {
        Self {
            transaction_id: Uuid::new_v4(),
            action,
            opened_at: Utc::now(),
            delivered: false,
        }
    }
}

/// Handle of an open audit transaction.
///
/// Not `Clone`: it is moved into `end_transaction`, which consumes it. A
/// handle therefore closes exactly once and cannot be shared between
/// concurrent operations.
#[derive(Debug)]
#[must_use = "an open transaction must be closed with end_transaction"]
pub struct TransactionHandle {
    reference: TransactionRef,
    work_unit: WorkUnit,
}

impl TransactionHandle {
    pub(crate) fn new(reference: TransactionRef, work_unit: WorkUnit) -> Self {
        Self {
            reference,
            work_unit,
        }
    }

    /// 相関参照
    pub fn reference(&self) -> &TransactionRef {
        &self.reference
    }

    /// トランザクションID
    pub fn transaction_id(&self) -> Uuid {
        self.reference.transaction_id
    }

    /// Envelope as opened
    pub fn work_unit(&self) -> &WorkUnit {
        &self.work_unit
    }

    pub(crate) fn into_parts(self) -> (TransactionRef, WorkUnit) {
        (self.reference, self.work_unit)
    }
}

/// Phase of a trail entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionPhase {
    /// 開始
    Open,
    /// 終了
    Close,
}

/// One record kept by an audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrailEntry {
    /// このエントリのトランザクションID
    pub transaction_id: Uuid,
    /// 親トランザクションID（終了エントリのみ）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    /// フェーズ
    pub phase: TransactionPhase,
    /// アクセサーID
    pub accessor: HierarchicalName,
    /// アクセサーバージョン
    pub accessor_version: String,
    /// 操作ラベル
    pub action_label: String,
    /// 監査対象のWork Unit
    pub work_unit: WorkUnit,
    /// 記録時刻
    pub recorded_at: DateTime<Utc>,
}

impl AuditTrailEntry {
    /// Entry recording the opening of a transaction
    pub fn opening(identity: &ComponentIdentity, action_label: &str, work_unit: &WorkUnit) -> Self {
        Self {
            transaction_id: Uuid::new_v4(),
            parent_id: None,
            phase: TransactionPhase::Open,
            accessor: identity.path.clone(),
            accessor_version: identity.version.clone(),
            action_label: action_label.to_string(),
            work_unit: work_unit.clone(),
            recorded_at: Utc::now(),
        }
    }

    /// Entry recording the closing of `parent`
    pub fn closing(
        identity: &ComponentIdentity,
        action_label: &str,
        work_unit: &WorkUnit,
        parent: &TransactionRef,
    ) -> Self {
        Self {
            parent_id: Some(parent.transaction_id),
            phase: TransactionPhase::Close,
            ..Self::opening(identity, action_label, work_unit)
        }
    }

    /// 受領証
    pub fn receipt(&self) -> AuditReceipt {
        AuditReceipt {
            transaction_id: self.transaction_id,
            recorded_at: self.recorded_at,
        }
    }
}

/// Audit persistence / forwarding service
#[async_trait]
pub trait AuditBroker: Send + Sync {
    /// Record the opening of a transaction
    async fn open(
        &self,
        identity: &ComponentIdentity,
        action_label: &str,
        work_unit: &WorkUnit,
    ) -> Result<AuditReceipt, BrokerError>;

    /// Record the closing of the transaction referenced by `parent`
    async fn close(
        &self,
        identity: &ComponentIdentity,
        action_label: &str,
        work_unit: &WorkUnit,
        parent: &TransactionRef,
    ) -> Result<AuditReceipt, BrokerError>;
}
