//! 監査トレイルの非同期バッファブローカー
//!
//! mpscチャネルでエントリを受信し、定期的にシンクへ一括書き込みする。
//! `open`/`close` never wait on the sink: entries are queued with
//! `try_send` and a background task flushes them on an interval, and once
//! more when every sender has been dropped.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use sotconduit_common::config::ConduitConfig;
use sotconduit_common::protocol::WorkUnit;
use sotconduit_common::types::ComponentIdentity;

use super::broker::{AuditBroker, AuditReceipt, AuditTrailEntry, TransactionRef};
use crate::config::get_env_with_fallback_parse;
use crate::error::BrokerError;

/// Flush target of [`QueuedAuditBroker`]
#[async_trait]
pub trait AuditTrailSink: Send + Sync {
    /// Persist a batch of entries in order
    async fn persist(&self, entries: Vec<AuditTrailEntry>) -> Result<(), BrokerError>;
}

/// 監査ブローカーのバッファ設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditWriterConfig {
    /// フラッシュ間隔。デフォルト: 30秒
    pub flush_interval: Duration,
    /// バッファ上限エントリ数。デフォルト: 10000
    pub buffer_capacity: usize,
}

impl Default for AuditWriterConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_secs(get_env_with_fallback_parse(
                "SOTCONDUIT_AUDIT_FLUSH_INTERVAL_SECS",
                "CONDUIT_AUDIT_FLUSH_INTERVAL_SECS",
                30,
            )),
            buffer_capacity: get_env_with_fallback_parse(
                "SOTCONDUIT_AUDIT_BUFFER_CAPACITY",
                "CONDUIT_AUDIT_BUFFER_CAPACITY",
                10_000,
            ),
        }
    }
}

impl From<&ConduitConfig> for AuditWriterConfig {
    fn from(config: &ConduitConfig) -> Self {
        Self {
            flush_interval: config.writer_flush_interval(),
            buffer_capacity: config.writer_buffer_capacity,
        }
    }
}

/// Buffered audit broker
///
/// Clone可能（senderのクローン）。The background task stops after the last
/// clone is dropped and the remaining entries are flushed.
#[derive(Clone)]
pub struct QueuedAuditBroker {
    sender: mpsc::Sender<AuditTrailEntry>,
}

impl QueuedAuditBroker {
    /// Create the broker and spawn its flush task
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(sink: Arc<dyn AuditTrailSink>, config: AuditWriterConfig) -> Self {
        Self::spawn(sink, config).0
    }

    /// Like [`QueuedAuditBroker::new`], also returning the flush task handle
    pub fn spawn(
        sink: Arc<dyn AuditTrailSink>,
        config: AuditWriterConfig,
    ) -> (Self, JoinHandle<()>) {
        // 0はmpscでpanicするため最小1
        let capacity = config.buffer_capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let task = tokio::spawn(Self::background_task(rx, sink, config));
        (Self { sender: tx }, task)
    }

    fn enqueue(&self, entry: AuditTrailEntry) -> Result<AuditReceipt, BrokerError> {
        let receipt = entry.receipt();
        match self.sender.try_send(entry) {
            Ok(()) => Ok(receipt),
            Err(mpsc::error::TrySendError::Full(_)) => Err(BrokerError::Unavailable(
                "audit queue is full".to_string(),
            )),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(BrokerError::Closed),
        }
    }

    async fn background_task(
        mut rx: mpsc::Receiver<AuditTrailEntry>,
        sink: Arc<dyn AuditTrailSink>,
        config: AuditWriterConfig,
    ) {
        let capacity = config.buffer_capacity.max(1);
        let mut buffer = VecDeque::with_capacity(capacity);
        let period = config.flush_interval.max(Duration::from_millis(1));
        let mut interval = tokio::time::interval(period);
        // 最初のtickはすぐに発火するのでスキップ
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if !buffer.is_empty() {
                        Self::flush_buffer(&mut buffer, sink.as_ref()).await;
                    }
                }
                entry = rx.recv() => {
                    match entry {
                        Some(entry) => {
                            if buffer.len() >= capacity {
                                let discarded = buffer.pop_front();
                                warn!(
                                    capacity,
                                    discarded = ?discarded.map(|e| e.transaction_id),
                                    "Audit trail buffer overflow, discarding oldest entry"
                                );
                            }
                            buffer.push_back(entry);
                        }
                        None => {
                            // チャネルが閉じられた → 残りをフラッシュして終了
                            if !buffer.is_empty() {
                                info!(
                                    remaining = buffer.len(),
                                    "Audit trail broker shutting down, flushing remaining entries"
                                );
                                Self::flush_buffer(&mut buffer, sink.as_ref()).await;
                            }
                            info!("Audit trail broker background task stopped");
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn flush_buffer(buffer: &mut VecDeque<AuditTrailEntry>, sink: &dyn AuditTrailSink) {
        let entries: Vec<AuditTrailEntry> = buffer.drain(..).collect();
        let count = entries.len();

        if let Err(e) = sink.persist(entries).await {
            warn!(
                "Failed to flush audit trail entries: {}. {} entries lost.",
                e, count
            );
            return;
        }

        debug!("Flushed {} audit trail entries", count);
    }
}

#[async_trait]
impl AuditBroker for QueuedAuditBroker {
    async fn open(
        &self,
        identity: &ComponentIdentity,
        action_label: &str,
        work_unit: &WorkUnit,
    ) -> Result<AuditReceipt, BrokerError> {
        self.enqueue(AuditTrailEntry::opening(identity, action_label, work_unit))
    }

    async fn close(
        &self,
        identity: &ComponentIdentity,
        action_label: &str,
        work_unit: &WorkUnit,
        parent: &TransactionRef,
    ) -> Result<AuditReceipt, BrokerError> {
        self.enqueue(AuditTrailEntry::closing(
            identity,
            action_label,
            work_unit,
            parent,
        ))
    }
}
