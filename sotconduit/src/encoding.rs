//! ドメインレコードのエンコード
//!
//! The audit manager only needs "serializes to a string or fails". Encoders
//! are stateless and shared across concurrent operations.

use sotconduit_common::error::EncodingError;
use sotconduit_common::types::Resource;

/// Encodes a domain record to its canonical string form
pub trait Encoder: Send + Sync {
    /// Encode a record, failing with [`EncodingError`]
    fn encode(&self, resource: &Resource) -> Result<String, EncodingError>;
}

/// Top-level keys owned by [`Resource`] itself
const RESERVED_KEYS: [&str; 2] = ["resourceType", "id"];

/// Canonical JSON encoder
///
/// Emits a compact JSON object with `resourceType`, `id`, then body fields
/// in key order. A body field named like a top-level key is an error, so
/// every key appears once.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(&self, resource: &Resource) -> Result<String, EncodingError> {
        if resource.resource_type.trim().is_empty() {
            return Err(EncodingError::new("resource has no resourceType"));
        }
        if let Some(key) = RESERVED_KEYS.iter().find(|k| resource.body.contains_key(**k)) {
            return Err(EncodingError::new(format!(
                "body field '{}' collides with a top-level key",
                key
            )));
        }
        Ok(serde_json::to_string(resource)?)
    }
}

impl<F> Encoder for F
where
    F: Fn(&Resource) -> Result<String, EncodingError> + Send + Sync,
{
    fn encode(&self, resource: &Resource) -> Result<String, EncodingError> {
        self(resource)
    }
}
