use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::BuildInfo;
use crate::dns_provider::{
    DnsClientFactory, DnsError, DnsProvider, DnsRecord, TxtRecord, TXT_RECORD_TYPE,
};

/// Authorization scheme expected by the ArvanCloud API
const API_KEY_SCHEME: &str = "apikey";

/// ArvanCloud CDN API client for DNS management
pub struct ArvancloudClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct CreateTxtRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    name: &'a str,
    value: TxtValue<'a>,
    ttl: u32,
}

#[derive(Debug, Serialize)]
struct TxtValue<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MessageResponse {
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RecordIndexResponse {
    data: Vec<DnsRecord>,
}

impl From<reqwest::Error> for DnsError {
    fn from(e: reqwest::Error) -> Self {
        DnsError::Request(e.to_string())
    }
}

/// Build the Authorization header value for an API key
///
/// Keys are accepted with or without their "Apikey " prefix, in any case.
pub fn authorization_header(api_key: &str) -> String {
    let key = api_key.trim().to_lowercase();
    let token = match key.strip_prefix(API_KEY_SCHEME) {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => key.as_str(),
    };
    format!("{} {}", API_KEY_SCHEME, token)
}

/// Pull a human-readable message out of an error response body
fn error_message(body: &[u8]) -> String {
    if let Ok(MessageResponse {
        message: Some(message),
    }) = serde_json::from_slice::<MessageResponse>(body)
    {
        return message;
    }

    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        "empty response body".to_string()
    } else {
        text
    }
}

async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, DnsError> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        return Err(DnsError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    // Some endpoints answer with an empty body
    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        &body
    };

    serde_json::from_slice(body).map_err(|e| DnsError::Decode(e.to_string()))
}

impl ArvancloudClient {
    /// Create a client authenticated with `api_key`
    ///
    /// # Arguments
    /// * `api_key` - ArvanCloud API key, with or without its "Apikey " prefix
    /// * `base_url` - API root (e.g., "https://napi.arvancloud.ir/cdn/4.0")
    /// * `user_agent` - User agent identifying this build
    pub fn new(api_key: &str, base_url: &str, user_agent: &str) -> Result<Self, DnsError> {
        let mut auth = HeaderValue::from_str(&authorization_header(api_key))
            .map_err(|_| DnsError::Client("API key contains invalid characters".to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()
            .map_err(|e| DnsError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn records_url(&self, domain: &str) -> String {
        format!("{}/domains/{}/dns-records", self.base_url, domain)
    }
}

#[async_trait]
impl DnsProvider for ArvancloudClient {
    async fn create_txt_record(
        &self,
        domain: &str,
        record: &TxtRecord,
    ) -> Result<String, DnsError> {
        tracing::debug!(
            "Creating TXT record {} in {} (ttl: {})",
            record.name,
            domain,
            record.ttl
        );

        let response = self
            .client
            .post(self.records_url(domain))
            .json(&CreateTxtRecord {
                record_type: TXT_RECORD_TYPE,
                name: &record.name,
                value: TxtValue { text: &record.text },
                ttl: record.ttl,
            })
            .send()
            .await?;

        let result: MessageResponse = read_response(response).await?;
        Ok(result.message.unwrap_or_default())
    }

    async fn search_txt_records(
        &self,
        domain: &str,
        name: &str,
    ) -> Result<Vec<DnsRecord>, DnsError> {
        tracing::debug!("Searching TXT records named {} in {}", name, domain);

        let response = self
            .client
            .get(self.records_url(domain))
            .query(&[("type", TXT_RECORD_TYPE), ("search", name)])
            .send()
            .await?;

        let result: RecordIndexResponse = read_response(response).await?;
        Ok(result.data)
    }

    async fn delete_record(&self, domain: &str, record_id: &str) -> Result<String, DnsError> {
        tracing::debug!("Deleting DNS record {} in {}", record_id, domain);

        let response = self
            .client
            .delete(format!("{}/{}", self.records_url(domain), record_id))
            .send()
            .await?;

        let result: MessageResponse = read_response(response).await?;
        Ok(result.message.unwrap_or_default())
    }
}

/// Builds [`ArvancloudClient`]s for a fixed endpoint and build identity
#[derive(Debug, Clone)]
pub struct ArvancloudClientFactory {
    base_url: String,
    user_agent: String,
}

impl ArvancloudClientFactory {
    pub fn new(base_url: impl Into<String>, build: &BuildInfo) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: build.user_agent(),
        }
    }
}

impl DnsClientFactory for ArvancloudClientFactory {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn DnsProvider>, DnsError> {
        let client = ArvancloudClient::new(api_key, &self.base_url, &self.user_agent)?;
        Ok(Arc::new(client))
    }
}
