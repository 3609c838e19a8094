//! Gatekeeper（アクセス制御と監査の入り口）
//!
//! A [`Gatekeeper`] fronts one resource type. Every create/read/update/
//! delete/search runs inside an audit transaction that is closed exactly
//! once: when the source-of-truth hook returns or panics, or when the
//! caller drops the operation before it completes.

pub mod memory;
pub mod source;

pub use memory::InMemorySourceOfTruth;
pub use source::SourceOfTruth;

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use sotconduit_common::protocol::{ResultSet, RESOURCE_HAS_NO_ID};
use sotconduit_common::types::{
    AccessAction, ComponentIdentity, HierarchicalName, Resource, ResourceKey, SearchCriteria,
};

use crate::audit::{AuditManager, TransactionHandle};
use crate::error::{GatekeeperError, GatekeeperResult, SourceError};
use crate::topology::IdentityResolver;

/// Result of running a source-of-truth hook under `catch_unwind`
type HookOutcome<T> = std::thread::Result<Result<T, SourceError>>;

/// Wrap a single record into a one-entry search set (MATCH, score 1)
pub fn wrap_into_result_set(resource: Resource) -> ResultSet {
    ResultSet::search_set(std::iter::once(resource))
}

/// Audited front door of one resource type
pub struct Gatekeeper<S: SourceOfTruth + ?Sized> {
    identity: ComponentIdentity,
    resource_type: String,
    version: String,
    audit: Arc<AuditManager>,
    source: Arc<S>,
}

impl<S: SourceOfTruth + ?Sized> Gatekeeper<S> {
    /// Resolve the accessor identity under `root` and build the gatekeeper
    ///
    /// Fails when the parent workshop is not part of the topology.
    pub async fn initialise(
        root: &HierarchicalName,
        resource_type: impl Into<String>,
        version: impl Into<String>,
        resolver: &IdentityResolver,
        audit: Arc<AuditManager>,
        source: Arc<S>,
    ) -> GatekeeperResult<Self> {
        let resource_type = resource_type.into();
        let version = version.into();
        debug!(root = %root, resource_type = %resource_type, "initialise(): Entry");

        let identity = resolver
            .resolve_accessor_identity(root, &resource_type, &version)
            .await?;
        info!(
            accessor = %identity,
            resource_type = %resource_type,
            version = %version,
            "Gatekeeper initialised"
        );

        Ok(Self {
            identity,
            resource_type,
            version,
            audit,
            source,
        })
    }

    /// アクセサーID
    pub fn identity(&self) -> &ComponentIdentity {
        &self.identity
    }

    /// アクセサー名（例: "Accessor-Patient"）
    pub fn accessor_name(&self) -> &str {
        self.identity.name()
    }

    /// リソース種別
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// バージョン
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Source of truth behind this gatekeeper
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Create a record
    pub async fn create(&self, resource: Resource) -> GatekeeperResult<Resource> {
        let action = AccessAction::Create;
        let summary = record_summary(&resource);
        let tx = self.begin(&summary, Some(&resource), action).await;

        match guarded(self.source.perform_create(resource)).await {
            Ok(Ok(created)) => {
                tx.close(&record_summary(&created), Some(&created), true).await;
                Ok(created)
            }
            Ok(Err(err)) => Err(tx.fail(err).await),
            Err(panic) => tx.abort(panic).await,
        }
    }

    /// Read a record by id or business identifier
    ///
    /// A missing record is `Ok(None)` and closes the transaction as failed.
    pub async fn read(&self, key: &ResourceKey) -> GatekeeperResult<Option<Resource>> {
        let action = AccessAction::Read;
        let summary = key.to_string();
        let tx = self.begin(&summary, None, action).await;

        match guarded(self.source.perform_read(key)).await {
            Ok(Ok(found)) => {
                tx.close(&summary, found.as_ref(), found.is_some()).await;
                Ok(found)
            }
            Ok(Err(err)) => Err(tx.fail(err).await),
            Err(panic) => tx.abort(panic).await,
        }
    }

    /// Replace a record
    pub async fn update(&self, resource: Resource) -> GatekeeperResult<Resource> {
        let action = AccessAction::Update;
        let summary = record_summary(&resource);
        let tx = self.begin(&summary, Some(&resource), action).await;

        match guarded(self.source.perform_update(resource)).await {
            Ok(Ok(updated)) => {
                tx.close(&summary, Some(&updated), true).await;
                Ok(updated)
            }
            Ok(Err(err)) => Err(tx.fail(err).await),
            Err(panic) => tx.abort(panic).await,
        }
    }

    /// Delete a record, returning it if it existed
    pub async fn delete(&self, key: &ResourceKey) -> GatekeeperResult<Option<Resource>> {
        let action = AccessAction::Delete;
        let summary = key.to_string();
        let tx = self.begin(&summary, None, action).await;

        match guarded(self.source.perform_delete(key)).await {
            Ok(Ok(removed)) => {
                tx.close(&summary, removed.as_ref(), removed.is_some()).await;
                Ok(removed)
            }
            Ok(Err(err)) => Err(tx.fail(err).await),
            Err(panic) => tx.abort(panic).await,
        }
    }

    /// Search
    ///
    /// `Ok(None)` when the source could not produce a result set; the
    /// transaction is then closed as failed.
    pub async fn search(&self, criteria: &SearchCriteria) -> GatekeeperResult<Option<ResultSet>> {
        let action = AccessAction::Search;
        let handle = self
            .audit
            .begin_search_transaction(
                criteria,
                &self.resource_type,
                action,
                &self.identity,
                &self.version,
            )
            .await;
        let tx = self.track(action, handle);

        match guarded(self.source.perform_search(criteria)).await {
            Ok(Ok(result_set)) => {
                let success = result_set.is_some();
                tx.close_search(result_set.as_ref(), success).await;
                Ok(result_set)
            }
            Ok(Err(err)) => Err(tx.fail(err).await),
            Err(panic) => tx.abort(panic).await,
        }
    }

    /// Read through a business identifier and wrap a hit into a search set
    pub async fn find_by_identifier(
        &self,
        system: Option<&str>,
        value: &str,
    ) -> GatekeeperResult<Option<ResultSet>> {
        let key = ResourceKey::identifier(system, value);
        Ok(self.read(&key).await?.map(wrap_into_result_set))
    }

    async fn begin(
        &self,
        summary: &str,
        resource: Option<&Resource>,
        action: AccessAction,
    ) -> OpenTransaction<'_> {
        let handle = self
            .audit
            .begin_transaction(
                summary,
                &self.resource_type,
                resource,
                action,
                &self.identity,
                &self.version,
            )
            .await;
        self.track(action, handle)
    }

    fn track(&self, action: AccessAction, handle: TransactionHandle) -> OpenTransaction<'_> {
        OpenTransaction {
            audit: &self.audit,
            identity: &self.identity,
            resource_type: &self.resource_type,
            version: &self.version,
            action,
            handle: Some(handle),
        }
    }
}

/// 実行中の監査トランザクション
///
/// Closing consumes the guard. If the operation future is dropped first
/// (timeout, `select!`, client disconnect) the guard closes the transaction
/// as failed on a spawned task.
struct OpenTransaction<'a> {
    audit: &'a Arc<AuditManager>,
    identity: &'a ComponentIdentity,
    resource_type: &'a str,
    version: &'a str,
    action: AccessAction,
    handle: Option<TransactionHandle>,
}

impl OpenTransaction<'_> {
    async fn close(mut self, summary: &str, resource: Option<&Resource>, success: bool) {
        if let Some(handle) = self.handle.take() {
            self.audit
                .end_transaction(
                    summary,
                    self.resource_type,
                    resource,
                    self.action,
                    success,
                    handle,
                    self.identity,
                    self.version,
                )
                .await;
        }
    }

    async fn close_search(mut self, result_set: Option<&ResultSet>, success: bool) {
        if let Some(handle) = self.handle.take() {
            self.audit
                .end_search_transaction(
                    result_set,
                    self.resource_type,
                    self.action,
                    success,
                    handle,
                    self.identity,
                    self.version,
                )
                .await;
        }
    }

    async fn fail(self, err: SourceError) -> GatekeeperError {
        warn!(action = %self.action, error = %err, "source of truth failed");
        self.close("", None, false).await;
        err.into()
    }

    async fn abort<T>(self, panic: Box<dyn Any + Send>) -> T {
        error!(
            action = %self.action,
            "source of truth panicked, closing transaction as failed"
        );
        self.close("", None, false).await;
        std::panic::resume_unwind(panic)
    }
}

impl Drop for OpenTransaction<'_> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        warn!(
            action = %self.action,
            transaction_id = %handle.transaction_id(),
            "operation dropped before completion, closing transaction as failed"
        );
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!(
                transaction_id = %handle.transaction_id(),
                "no tokio runtime available, transaction cannot be closed"
            );
            return;
        };

        let audit = Arc::clone(self.audit);
        let identity = self.identity.clone();
        let resource_type = self.resource_type.to_string();
        let version = self.version.to_string();
        let action = self.action;
        runtime.spawn(async move {
            audit
                .end_transaction(
                    "",
                    &resource_type,
                    None,
                    action,
                    false,
                    handle,
                    &identity,
                    &version,
                )
                .await;
        });
    }
}

async fn guarded<T, F>(hook: F) -> HookOutcome<T>
where
    F: Future<Output = Result<T, SourceError>>,
{
    AssertUnwindSafe(hook).catch_unwind().await
}

fn record_summary(resource: &Resource) -> String {
    resource
        .non_empty_id()
        .unwrap_or(RESOURCE_HAS_NO_ID)
        .to_string()
}
