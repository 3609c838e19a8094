//! エラー型定義
//!
//! 統一エラー型（thiserror使用）

use std::time::Duration;
use thiserror::Error;

use sotconduit_common::types::HierarchicalName;

/// Identity resolution / topology store error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TopologyError {
    /// Parent workshop scope is not present in the topology
    #[error("Missing parent scope: {0}")]
    MissingParentScope(HierarchicalName),

    /// The topology store rejected the registration
    #[error("Node registration failed: {0}")]
    Registration(String),
}

/// Audit broker delivery error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrokerError {
    /// Broker rejected or could not accept the record
    #[error("Audit broker unavailable: {0}")]
    Unavailable(String),

    /// Broker call exceeded the configured bound
    #[error("Audit broker call timed out after {0:?}")]
    Timeout(Duration),

    /// Broker has been shut down
    #[error("Audit broker closed")]
    Closed,
}

/// Error raised by a source-of-truth hook
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Source of truth rejected the request
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Backend failure
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Gatekeeper orchestrator error
#[derive(Debug, Error)]
pub enum GatekeeperError {
    /// Identity could not be resolved at startup
    #[error(transparent)]
    Identity(#[from] TopologyError),

    /// Source-of-truth hook failed
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Gatekeeper result alias
pub type GatekeeperResult<T> = Result<T, GatekeeperError>;
