//! 監査トランザクション
//!
//! Every access operation is bracketed by an audit transaction: the
//! [`AuditManager`] opens a work-unit envelope with the [`AuditBroker`]
//! before the source of truth is called, and closes it with the outcome.

pub mod broker;
pub mod classification;
pub mod manager;
pub mod summary;
pub mod trail;
pub mod writer;

pub use broker::{
    AuditBroker, AuditReceipt, AuditTrailEntry, TransactionHandle, TransactionPhase,
    TransactionRef,
};
pub use classification::ClassificationTokenBuilder;
pub use manager::AuditManager;
pub use summary::{render_criteria, render_result_summary};
pub use trail::InMemoryAuditTrail;
pub use writer::{AuditTrailSink, AuditWriterConfig, QueuedAuditBroker};
