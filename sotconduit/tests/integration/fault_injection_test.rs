//! フック失敗時も監査トランザクションが必ず閉じられることの検証

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use sotconduit::audit::{AuditManager, InMemoryAuditTrail, TransactionPhase};
use sotconduit::error::{GatekeeperError, SourceError};
use sotconduit_common::error::EncodingError;
use sotconduit_common::protocol::WorkUnitOutcome;
use sotconduit_common::types::{Resource, ResourceKey, SearchCriteria};

use crate::support::{gatekeeper, gatekeeper_with, patient, Fault, FaultySource};

async fn assert_single_failed_close(trail: &InMemoryAuditTrail) {
    assert_eq!(trail.open_count().await, 1);
    assert_eq!(trail.close_count().await, 1);
    let entries = trail.entries().await;
    let close = entries
        .iter()
        .find(|e| e.phase == TransactionPhase::Close)
        .unwrap();
    assert_eq!(close.parent_id, Some(entries[0].transaction_id));
    assert_eq!(close.work_unit.outcome(), WorkUnitOutcome::Failed);
    assert!(close.work_unit.egress().is_empty());
}

fn backend_down() -> Fault {
    Fault::Error(SourceError::Backend("connection reset".to_string()))
}

#[tokio::test]
async fn test_create_error_closes_once() {
    let trail = InMemoryAuditTrail::new();
    let source = Arc::new(FaultySource::new(backend_down()));
    let gk = gatekeeper(&trail, source.clone()).await;

    let err = gk.create(patient("p-1", "Jones")).await.unwrap_err();

    assert!(matches!(err, GatekeeperError::Source(SourceError::Backend(_))));
    assert_eq!(source.calls(), 1);
    assert_single_failed_close(&trail).await;
}

#[tokio::test]
async fn test_read_error_closes_once() {
    let trail = InMemoryAuditTrail::new();
    let source = Arc::new(FaultySource::new(backend_down()));
    let gk = gatekeeper(&trail, source.clone()).await;

    assert!(gk.read(&ResourceKey::id("p-1")).await.is_err());
    assert_eq!(source.calls(), 1);
    assert_single_failed_close(&trail).await;
}

#[tokio::test]
async fn test_update_not_found_closes_once() {
    let trail = InMemoryAuditTrail::new();
    let source = Arc::new(FaultySource::new(Fault::None));
    let gk = gatekeeper(&trail, source.clone()).await;

    let err = gk.update(patient("p-404", "Jones")).await.unwrap_err();

    assert_eq!(err.to_string(), "Not found: p-404");
    assert_single_failed_close(&trail).await;
}

#[tokio::test]
async fn test_delete_error_closes_once() {
    let trail = InMemoryAuditTrail::new();
    let source = Arc::new(FaultySource::new(Fault::Error(SourceError::Rejected(
        "locked".to_string(),
    ))));
    let gk = gatekeeper(&trail, source.clone()).await;

    assert!(gk.delete(&ResourceKey::id("p-1")).await.is_err());
    assert_single_failed_close(&trail).await;
}

#[tokio::test]
async fn test_search_error_closes_once() {
    let trail = InMemoryAuditTrail::new();
    let source = Arc::new(FaultySource::new(backend_down()));
    let gk = gatekeeper(&trail, source.clone()).await;

    assert!(gk.search(&SearchCriteria::new()).await.is_err());
    assert_eq!(source.calls(), 1);
    assert_single_failed_close(&trail).await;
}

#[tokio::test]
async fn test_search_without_result_set_is_failed_not_error() {
    let trail = InMemoryAuditTrail::new();
    let source = Arc::new(FaultySource::new(Fault::NoResultSet));
    let gk = gatekeeper(&trail, source.clone()).await;

    let result = gk.search(&SearchCriteria::new().with("family", "Jones")).await;

    assert!(matches!(result, Ok(None)));
    assert_single_failed_close(&trail).await;
}

#[tokio::test]
async fn test_create_panic_closes_then_resumes() {
    let trail = InMemoryAuditTrail::new();
    let source = Arc::new(FaultySource::new(Fault::Panic));
    let gk = gatekeeper(&trail, source.clone()).await;

    let outcome = AssertUnwindSafe(gk.create(patient("p-1", "Jones")))
        .catch_unwind()
        .await;

    assert!(outcome.is_err(), "panic must propagate to the caller");
    assert_eq!(source.calls(), 1);
    assert_single_failed_close(&trail).await;
}

#[tokio::test]
async fn test_search_panic_closes_then_resumes() {
    let trail = InMemoryAuditTrail::new();
    let source = Arc::new(FaultySource::new(Fault::Panic));
    let gk = gatekeeper(&trail, source.clone()).await;

    let outcome = AssertUnwindSafe(gk.search(&SearchCriteria::new()))
        .catch_unwind()
        .await;

    assert!(outcome.is_err());
    assert_single_failed_close(&trail).await;
}

#[tokio::test]
async fn test_gatekeeper_recovers_after_fault_cleared() {
    let trail = InMemoryAuditTrail::new();
    let source = Arc::new(FaultySource::new(backend_down()));
    let gk = gatekeeper(&trail, source.clone()).await;

    assert!(gk.create(patient("p-1", "Jones")).await.is_err());
    source.set_fault(Fault::None);
    gk.create(patient("p-1", "Jones")).await.unwrap();

    assert_eq!(trail.open_count().await, 2);
    assert_eq!(trail.close_count().await, 2);
    let last = trail.entries().await.pop().unwrap();
    assert_eq!(last.work_unit.outcome(), WorkUnitOutcome::Success);
}

#[tokio::test]
async fn test_unencodable_record_is_audited_as_failed() {
    let trail = InMemoryAuditTrail::new();
    let encoder = |_: &Resource| -> Result<String, EncodingError> {
        Err(EncodingError::new("cannot serialize"))
    };
    let audit = Arc::new(AuditManager::new(Arc::new(trail.clone()), Arc::new(encoder)));
    let source = Arc::new(FaultySource::new(Fault::None));
    let gk = gatekeeper_with(audit, source.clone()).await;

    // 監査のエンコード失敗は業務操作を止めない
    let created = gk.create(patient("p-1", "Jones")).await.unwrap();
    assert_eq!(created.id.as_deref(), Some("p-1"));
    assert_eq!(source.calls(), 1);

    let entries = trail.entries().await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].work_unit.outcome(), WorkUnitOutcome::Failed);
    assert!(entries[0].work_unit.ingress().classification.is_encoding_error());
    assert_eq!(entries[1].work_unit.outcome(), WorkUnitOutcome::Failed);
}

#[tokio::test]
async fn test_body_key_collision_is_audited_as_failed() {
    let trail = InMemoryAuditTrail::new();
    let source = Arc::new(FaultySource::new(Fault::None));
    let gk = gatekeeper(&trail, source.clone()).await;

    let record = patient("p-1", "Jones").with_field("id", "shadow");
    let created = gk.create(record).await.unwrap();
    assert_eq!(created.id.as_deref(), Some("p-1"));

    let entries = trail.entries().await;
    assert_eq!(entries.len(), 2);
    let ingress = entries[0].work_unit.ingress();
    assert!(ingress.classification.is_encoding_error());
    assert!(ingress.content.contains("body field 'id'"));
    assert_eq!(entries[1].work_unit.outcome(), WorkUnitOutcome::Failed);
}
