//! Source-of-truth フック

use async_trait::async_trait;

use sotconduit_common::protocol::ResultSet;
use sotconduit_common::types::{Resource, ResourceKey, SearchCriteria};

use crate::error::SourceError;

/// Backing store of one resource type
///
/// Implemented by concrete accessors. The gatekeeper audits every call.
#[async_trait]
pub trait SourceOfTruth: Send + Sync {
    /// Create a record, returning it as stored
    async fn perform_create(&self, resource: Resource) -> Result<Resource, SourceError>;

    /// Read a record; `None` when it does not exist
    async fn perform_read(&self, key: &ResourceKey) -> Result<Option<Resource>, SourceError>;

    /// Replace a record, returning it as stored
    async fn perform_update(&self, resource: Resource) -> Result<Resource, SourceError>;

    /// Delete a record, returning the removed record if there was one
    async fn perform_delete(&self, key: &ResourceKey) -> Result<Option<Resource>, SourceError>;

    /// Search; `None` means the search could not produce a result set
    async fn perform_search(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Option<ResultSet>, SourceError>;
}
