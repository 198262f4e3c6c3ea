//! Per-challenge solver configuration
//!
//! Each challenge carries an opaque JSON blob taken from the issuer:
//!
//! ```json
//! {"apiKey": "...", "apiKeySecretRef": {"name": "...", "key": "..."}, "ttl": 120}
//! ```

use arvancloud_secrets::{SecretError, SecretStore};
use serde::Deserialize;
use thiserror::Error;

/// TTL applied when the configuration leaves it unset or non-positive
pub const DEFAULT_TTL: u32 = 120;

/// Reference to a field of a secret in the challenge's namespace
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SecretKeySelector {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawSolverConfig {
    api_key: Option<String>,
    api_key_secret_ref: Option<SecretKeySelector>,
    ttl: Option<i64>,
}

/// Errors loading the configuration blob
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration not provided")]
    Missing,

    #[error("error decoding solver config: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors resolving the API key
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("one of apiKey or apiKeySecretRef should be provided")]
    MissingSource,

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("key {key} in {namespace}/{name} is empty")]
    EmptyCredential {
        namespace: String,
        name: String,
        key: String,
    },
}

/// Decoded solver configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverConfig {
    /// Inline API key; empty strings are treated as unset
    pub api_key: Option<String>,
    pub api_key_secret_ref: Option<SecretKeySelector>,
    /// Record TTL in seconds, never zero
    pub ttl: u32,
}

impl SolverConfig {
    /// Decode the configuration attached to a challenge
    pub fn from_json(config: Option<&serde_json::Value>) -> Result<Self, ConfigError> {
        let config = match config {
            None | Some(serde_json::Value::Null) => return Err(ConfigError::Missing),
            Some(config) => config,
        };

        let raw = RawSolverConfig::deserialize(config)?;

        let ttl = match raw.ttl {
            Some(ttl) if ttl > 0 => u32::try_from(ttl).unwrap_or(u32::MAX),
            _ => DEFAULT_TTL,
        };

        Ok(Self {
            api_key: raw.api_key.filter(|key| !key.is_empty()),
            api_key_secret_ref: raw.api_key_secret_ref.filter(|r| !r.name.is_empty()),
            ttl,
        })
    }

    /// Resolve the API key, inline first, then through the secret reference
    pub async fn api_key(
        &self,
        namespace: &str,
        secrets: &dyn SecretStore,
    ) -> Result<String, CredentialError> {
        if let Some(api_key) = &self.api_key {
            return Ok(api_key.clone());
        }

        let selector = self
            .api_key_secret_ref
            .as_ref()
            .ok_or(CredentialError::MissingSource)?;

        let api_key = secrets
            .resolve_key(namespace, &selector.name, &selector.key)
            .await?;

        if api_key.trim().is_empty() {
            return Err(CredentialError::EmptyCredential {
                namespace: namespace.to_string(),
                name: selector.name.clone(),
                key: selector.key.clone(),
            });
        }

        Ok(api_key)
    }
}
