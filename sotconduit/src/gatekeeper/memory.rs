//! インメモリのSource-of-truth
//!
//! Records are keyed by logical id. Business identifiers are read from the
//! body's `identifier` array (`[{"system": .., "value": ..}]`).

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use sotconduit_common::protocol::ResultSet;
use sotconduit_common::types::{Resource, ResourceKey, SearchCriteria};

use super::source::SourceOfTruth;
use crate::error::SourceError;

/// Reference source of truth for one resource type
#[derive(Clone)]
pub struct InMemorySourceOfTruth {
    resource_type: String,
    records: Arc<RwLock<HashMap<String, Resource>>>,
}

impl InMemorySourceOfTruth {
    /// 新しいストアを作成
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 格納件数
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// 空かどうか
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn check_type(&self, resource: &Resource) -> Result<(), SourceError> {
        if resource.resource_type != self.resource_type {
            return Err(SourceError::Rejected(format!(
                "expected resourceType {}, got {}",
                self.resource_type, resource.resource_type
            )));
        }
        Ok(())
    }

    fn find_key<'a>(
        records: &'a HashMap<String, Resource>,
        key: &ResourceKey,
    ) -> Option<&'a str> {
        match key {
            ResourceKey::Id(id) => records.get_key_value(id).map(|(k, _)| k.as_str()),
            ResourceKey::Identifier { system, value } => records
                .iter()
                .find(|(_, r)| has_identifier(r, system.as_deref(), value))
                .map(|(k, _)| k.as_str()),
        }
    }
}

fn has_identifier(resource: &Resource, system: Option<&str>, value: &str) -> bool {
    let Some(Value::Array(identifiers)) = resource.body.get("identifier") else {
        return false;
    };
    identifiers.iter().any(|identifier| {
        let value_matches = identifier.get("value").and_then(Value::as_str) == Some(value);
        let system_matches = match system {
            Some(system) => identifier.get("system").and_then(Value::as_str) == Some(system),
            None => true,
        };
        value_matches && system_matches
    })
}

fn field_matches(resource: &Resource, property: &str, expected: &str) -> bool {
    if property == "_id" {
        return resource.id.as_deref() == Some(expected);
    }
    match resource.body.get(property) {
        Some(Value::String(s)) => s == expected,
        Some(other) => other.to_string() == expected,
        None => false,
    }
}

#[async_trait]
impl SourceOfTruth for InMemorySourceOfTruth {
    async fn perform_create(&self, mut resource: Resource) -> Result<Resource, SourceError> {
        self.check_type(&resource)?;
        let mut records = self.records.write().await;
        let id = match resource.non_empty_id() {
            Some(id) if records.contains_key(id) => {
                return Err(SourceError::Rejected(format!("{} already exists", id)));
            }
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };
        resource.id = Some(id.clone());
        records.insert(id, resource.clone());
        Ok(resource)
    }

    async fn perform_read(&self, key: &ResourceKey) -> Result<Option<Resource>, SourceError> {
        let records = self.records.read().await;
        Ok(Self::find_key(&records, key).and_then(|k| records.get(k).cloned()))
    }

    async fn perform_update(&self, resource: Resource) -> Result<Resource, SourceError> {
        self.check_type(&resource)?;
        let id = resource
            .non_empty_id()
            .map(str::to_string)
            .ok_or_else(|| SourceError::Rejected("update requires an id".to_string()))?;
        let mut records = self.records.write().await;
        match records.get_mut(&id) {
            Some(stored) => {
                *stored = resource.clone();
                Ok(resource)
            }
            None => Err(SourceError::NotFound(id)),
        }
    }

    async fn perform_delete(&self, key: &ResourceKey) -> Result<Option<Resource>, SourceError> {
        let mut records = self.records.write().await;
        let Some(id) = Self::find_key(&records, key).map(str::to_string) else {
            return Ok(None);
        };
        Ok(records.remove(&id))
    }

    async fn perform_search(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Option<ResultSet>, SourceError> {
        let records = self.records.read().await;
        let mut matches: Vec<Resource> = records
            .values()
            .filter(|r| {
                criteria
                    .iter()
                    .all(|(property, value)| field_matches(r, property, value))
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(Some(ResultSet::search_set(matches)))
    }
}
