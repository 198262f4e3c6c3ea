//! DNS provider abstraction for challenge record management
//!
//! This trait allows for different DNS backends (ArvanCloud, mock for testing, etc.)

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Record type managed by the solver
pub const TXT_RECORD_TYPE: &str = "TXT";

/// A TXT record to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxtRecord {
    /// Record name relative to the zone, or "@" for the apex
    pub name: String,
    /// TXT payload (the challenge key)
    pub text: String,
    /// TTL in seconds
    pub ttl: u32,
}

/// A record as returned by the provider
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DnsRecord {
    /// Provider-assigned identifier
    #[serde(default)]
    pub id: String,

    /// Record name relative to the zone
    #[serde(default)]
    pub name: String,

    #[serde(rename = "type", default)]
    pub record_type: String,

    /// Type-specific payload; `{"text": ...}` for TXT records
    #[serde(default)]
    pub value: serde_json::Value,

    #[serde(default)]
    pub ttl: Option<u32>,
}

impl DnsRecord {
    /// The `text` field of the value payload, if it is a string
    pub fn text(&self) -> Option<&str> {
        self.value.get("text").and_then(serde_json::Value::as_str)
    }
}

/// Errors from DNS provider operations
#[derive(Debug, Error)]
pub enum DnsError {
    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected API response: {0}")]
    Decode(String),

    #[error("invalid client configuration: {0}")]
    Client(String),
}

/// Trait for DNS record management providers
///
/// Every operation is scoped to a zone (`domain`, without trailing dot).
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Create a TXT record in the zone
    ///
    /// # Returns
    /// The provider's response message
    async fn create_txt_record(&self, domain: &str, record: &TxtRecord)
        -> Result<String, DnsError>;

    /// List TXT records of the zone matching a free-text search on `name`
    ///
    /// The search is loose; callers must filter the result themselves.
    async fn search_txt_records(&self, domain: &str, name: &str)
        -> Result<Vec<DnsRecord>, DnsError>;

    /// Delete a record by its provider-assigned ID
    ///
    /// # Returns
    /// The provider's response message
    async fn delete_record(&self, domain: &str, record_id: &str) -> Result<String, DnsError>;
}

/// Builds a provider client bound to a credential
///
/// Credentials are resolved per challenge, so clients are built per
/// challenge as well.
pub trait DnsClientFactory: Send + Sync {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn DnsProvider>, DnsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_text() {
        let record: DnsRecord = serde_json::from_str(
            r#"{"id":"r1","type":"txt","name":"_acme-challenge","value":{"text":"abc"},"ttl":120}"#,
        )
        .unwrap();
        assert_eq!(record.id, "r1");
        assert_eq!(record.text(), Some("abc"));
        assert_eq!(record.ttl, Some(120));
    }

    #[test]
    fn test_record_text_non_string_payload() {
        let record: DnsRecord = serde_json::from_str(
            r#"{"id":"r2","type":"a","name":"www","value":[{"ip":"192.0.2.1"}]}"#,
        )
        .unwrap();
        assert_eq!(record.text(), None);

        let record: DnsRecord =
            serde_json::from_str(r#"{"id":"r3","name":"x","value":{"text":42}}"#).unwrap();
        assert_eq!(record.text(), None);
    }
}
