//! 監査トランザクション管理
//!
//! Builds the work-unit envelope for each access operation, opens it with
//! the broker before the operation runs and closes it afterwards. Broker
//! failures and timeouts are logged and counted but never reach the caller.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use sotconduit_common::config::ConduitConfig;
use sotconduit_common::error::EncodingError;
use sotconduit_common::protocol::{
    ClassificationToken, Payload, ResultSet, WorkUnit, WorkUnitOutcome,
};
use sotconduit_common::types::{AccessAction, ComponentIdentity, Resource, SearchCriteria};

use super::broker::{AuditBroker, TransactionHandle, TransactionRef};
use super::classification::ClassificationTokenBuilder;
use super::summary::{
    begin_label, end_label, render_criteria, render_result_summary, ENCODING_ERROR_PREFIX,
};
use crate::encoding::Encoder;
use crate::error::BrokerError;

/// Default bound on a single broker call
pub const DEFAULT_BROKER_TIMEOUT: Duration = Duration::from_millis(5_000);

/// 監査トランザクションマネージャー
///
/// Shared behind an `Arc` by every gatekeeper; holds no per-call state.
pub struct AuditManager {
    broker: Arc<dyn AuditBroker>,
    encoder: Arc<dyn Encoder>,
    tokens: ClassificationTokenBuilder,
    broker_timeout: Duration,
    delivery_failures: AtomicU64,
}

impl AuditManager {
    /// Manager with the default classification definer and broker timeout
    pub fn new(broker: Arc<dyn AuditBroker>, encoder: Arc<dyn Encoder>) -> Self {
        Self {
            broker,
            encoder,
            tokens: ClassificationTokenBuilder::default(),
            broker_timeout: DEFAULT_BROKER_TIMEOUT,
            delivery_failures: AtomicU64::new(0),
        }
    }

    /// Manager configured from [`ConduitConfig`]
    pub fn from_config(
        broker: Arc<dyn AuditBroker>,
        encoder: Arc<dyn Encoder>,
        config: &ConduitConfig,
    ) -> Self {
        Self::new(broker, encoder)
            .with_token_builder(ClassificationTokenBuilder::new(
                config.classification_definer.as_str(),
            ))
            .with_broker_timeout(config.broker_timeout())
    }

    /// ブローカータイムアウトを設定
    pub fn with_broker_timeout(mut self, timeout: Duration) -> Self {
        self.broker_timeout = timeout;
        self
    }

    /// 分類トークンビルダーを設定
    pub fn with_token_builder(mut self, tokens: ClassificationTokenBuilder) -> Self {
        self.tokens = tokens;
        self
    }

    /// ブローカータイムアウト
    pub fn broker_timeout(&self) -> Duration {
        self.broker_timeout
    }

    /// Number of broker calls that failed or timed out
    pub fn delivery_failures(&self) -> u64 {
        self.delivery_failures.load(Ordering::Relaxed)
    }

    /// Open an audit transaction for an access operation
    ///
    /// `resource`, when present, is encoded into the ingress payload;
    /// otherwise `payload_summary` is used. Never fails.
    pub async fn begin_transaction(
        &self,
        payload_summary: &str,
        resource_type: &str,
        resource: Option<&Resource>,
        action: AccessAction,
        identity: &ComponentIdentity,
        version: &str,
    ) -> TransactionHandle {
        debug!(
            action = %action,
            resource_type,
            accessor = %identity,
            "begin_transaction(): Entry"
        );
        let label = begin_label(action);
        let work_unit = match resource {
            Some(resource) => match self.encoder.encode(resource) {
                Ok(encoded) => WorkUnit::new(Payload::new(
                    format!("{}{}", label, encoded),
                    self.tokens.build(resource_type, version),
                )),
                Err(err) => {
                    error!(
                        action = %action,
                        resource_type,
                        error = %err,
                        "Could not encode record for audit, opening a failed transaction"
                    );
                    WorkUnit::failed(encoding_error_payload(&err))
                }
            },
            None => WorkUnit::new(Payload::new(
                format!("{}{}", label, payload_summary),
                self.tokens.build(resource_type, version),
            )),
        };

        let reference = match self
            .deliver("open", self.broker.open(identity, action.as_str(), &work_unit))
            .await
        {
            Some(receipt) => TransactionRef::from_receipt(receipt, action),
            None => TransactionRef::local(action),
        };
        TransactionHandle::new(reference, work_unit)
    }

    /// Close an audit transaction
    ///
    /// Consumes `handle` and returns the final envelope as forwarded to the
    /// broker.
    #[allow(clippy::too_many_arguments)]
    pub async fn end_transaction(
        &self,
        result_summary: &str,
        resource_type: &str,
        resource: Option<&Resource>,
        action: AccessAction,
        success: bool,
        handle: TransactionHandle,
        identity: &ComponentIdentity,
        version: &str,
    ) -> WorkUnit {
        debug!(
            action = %action,
            success,
            transaction_id = %handle.transaction_id(),
            "end_transaction(): Entry"
        );
        let (reference, mut work_unit) = handle.into_parts();

        if success {
            let label = end_label(action);
            let mut encoding_failed = false;
            let payload = match resource {
                Some(resource) => match self.encoder.encode(resource) {
                    Ok(encoded) => Payload::new(
                        format!("{}{}", label, encoded),
                        self.tokens.build(resource_type, version),
                    ),
                    Err(err) => {
                        error!(
                            action = %action,
                            resource_type,
                            error = %err,
                            "Could not encode result record for audit"
                        );
                        encoding_failed = true;
                        encoding_error_payload(&err)
                    }
                },
                None => Payload::new(
                    format!("{}{}", label, result_summary),
                    self.tokens.build(resource_type, version),
                ),
            };
            work_unit.push_egress(payload);

            if work_unit.outcome() == WorkUnitOutcome::Failed {
                warn!(
                    transaction_id = %reference.transaction_id,
                    "Transaction was opened in a failed state, keeping FAILED outcome"
                );
            } else if encoding_failed {
                work_unit.set_outcome(WorkUnitOutcome::Failed);
            } else {
                work_unit.set_outcome(WorkUnitOutcome::Success);
            }
        } else {
            work_unit.set_outcome(WorkUnitOutcome::Failed);
        }

        self.deliver(
            "close",
            self.broker
                .close(identity, action.as_str(), &work_unit, &reference),
        )
        .await;
        work_unit
    }

    /// Open a search transaction; the ingress payload is the rendered criteria
    pub async fn begin_search_transaction(
        &self,
        criteria: &SearchCriteria,
        resource_type: &str,
        action: AccessAction,
        identity: &ComponentIdentity,
        version: &str,
    ) -> TransactionHandle {
        let summary = render_criteria(criteria);
        self.begin_transaction(&summary, resource_type, None, action, identity, version)
            .await
    }

    /// Close a search transaction with a summary of `result_set`
    #[allow(clippy::too_many_arguments)]
    pub async fn end_search_transaction(
        &self,
        result_set: Option<&ResultSet>,
        resource_type: &str,
        action: AccessAction,
        success: bool,
        handle: TransactionHandle,
        identity: &ComponentIdentity,
        version: &str,
    ) -> WorkUnit {
        let summary = render_result_summary(result_set);
        self.end_transaction(
            &summary,
            resource_type,
            None,
            action,
            success,
            handle,
            identity,
            version,
        )
        .await
    }

    async fn deliver<T, F>(&self, call: &'static str, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T, BrokerError>>,
    {
        let err = match tokio::time::timeout(self.broker_timeout, fut).await {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(err)) => err,
            Err(_) => BrokerError::Timeout(self.broker_timeout),
        };
        let failures = self.delivery_failures.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(
            call,
            error = %err,
            failures,
            "Audit broker delivery failed, continuing without audit record"
        );
        None
    }
}

fn encoding_error_payload(err: &EncodingError) -> Payload {
    Payload::new(
        format!("{}{}", ENCODING_ERROR_PREFIX, err),
        ClassificationToken::encoding_error(),
    )
}
