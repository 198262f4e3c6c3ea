//! In-memory backend

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::SecretError;
use crate::store::{SecretData, SecretStore};

/// Secrets held in process memory, keyed by (namespace, name)
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<(String, String), SecretData>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a string field, creating the secret if needed
    pub fn insert(&self, namespace: &str, name: &str, key: &str, value: &str) {
        self.insert_bytes(namespace, name, key, value.as_bytes().to_vec());
    }

    /// Set a raw field, creating the secret if needed
    pub fn insert_bytes(&self, namespace: &str, name: &str, key: &str, value: Vec<u8>) {
        self.secrets
            .write()
            .entry((namespace.to_string(), name.to_string()))
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Remove a whole secret
    pub fn remove(&self, namespace: &str, name: &str) {
        self.secrets
            .write()
            .remove(&(namespace.to_string(), name.to_string()));
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn fetch(&self, namespace: &str, name: &str) -> Result<SecretData, SecretError> {
        self.secrets
            .read()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| SecretError::not_found(namespace, name))
    }
}
