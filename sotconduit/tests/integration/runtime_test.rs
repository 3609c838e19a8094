//! ConduitRuntime（設定→キュー型ブローカー→シンク）の結合テスト

use serial_test::serial;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use sotconduit::audit::{InMemoryAuditTrail, TransactionPhase};
use sotconduit::config::load_conduit_config;
use sotconduit::gatekeeper::InMemorySourceOfTruth;
use sotconduit::ConduitRuntime;
use sotconduit_common::config::ConduitConfig;
use sotconduit_common::protocol::WorkUnitOutcome;
use sotconduit_common::types::ResourceKey;

use crate::support::{patient, root, seeded_store};

fn config() -> ConduitConfig {
    ConduitConfig {
        writer_flush_interval_secs: 1,
        ..ConduitConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_runtime_flushes_audit_trail() {
    let sink = InMemoryAuditTrail::new();
    let runtime = ConduitRuntime::new(
        config(),
        Arc::new(seeded_store().await),
        Arc::new(sink.clone()),
    );
    let gk = runtime
        .gatekeeper(&root(), "Patient", Arc::new(InMemorySourceOfTruth::new("Patient")))
        .await
        .unwrap();
    assert_eq!(gk.version(), "4.0.1");

    gk.create(patient("p-1", "Jones")).await.unwrap();
    gk.read(&ResourceKey::id("p-1")).await.unwrap();
    assert!(sink.is_empty().await);

    tokio::time::sleep(Duration::from_secs(2)).await;

    let entries = sink.entries().await;
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].phase, TransactionPhase::Open);
    assert_eq!(entries[1].parent_id, Some(entries[0].transaction_id));
    assert_eq!(entries[3].work_unit.outcome(), WorkUnitOutcome::Success);
    assert_eq!(runtime.audit().delivery_failures(), 0);
}

#[tokio::test]
async fn test_runtime_uses_configured_workshop() {
    let config = ConduitConfig {
        workshop_name: "Interact".to_string(),
        ..ConduitConfig::default()
    };
    let runtime = ConduitRuntime::new(
        config,
        Arc::new(seeded_store().await),
        Arc::new(InMemoryAuditTrail::new()),
    );
    assert_eq!(runtime.resolver().workshop(), "Interact");

    // seeded_storeにはEdgeしか無い
    let result = runtime
        .gatekeeper(&root(), "Patient", Arc::new(InMemorySourceOfTruth::new("Patient")))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
#[serial]
async fn test_runtime_from_config_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "classification_definer = \"HL7\"").unwrap();
    writeln!(file, "broker_timeout_ms = 750").unwrap();
    writeln!(file, "default_version = \"5.0.0\"").unwrap();
    std::env::set_var("SOTCONDUIT_CONFIG_FILE", file.path());
    let loaded = load_conduit_config();
    std::env::remove_var("SOTCONDUIT_CONFIG_FILE");
    let config = loaded.unwrap();

    assert_eq!(config.broker_timeout(), Duration::from_millis(750));
    let sink = InMemoryAuditTrail::new();
    let runtime = ConduitRuntime::new(
        config,
        Arc::new(seeded_store().await),
        Arc::new(sink),
    );
    assert_eq!(runtime.audit().broker_timeout(), Duration::from_millis(750));

    let gk = runtime
        .gatekeeper(&root(), "Patient", Arc::new(InMemorySourceOfTruth::new("Patient")))
        .await
        .unwrap();
    assert_eq!(gk.version(), "5.0.0");
    assert_eq!(gk.identity().version, "5.0.0");
}
