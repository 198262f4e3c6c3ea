//! Kubernetes Secret backend

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};

use crate::error::SecretError;
use crate::store::{SecretData, SecretStore};

/// Secrets read from core/v1 `Secret` objects through the API server
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using the in-cluster service account or the local kubeconfig
    pub async fn try_default() -> Result<Self, SecretError> {
        let client = Client::try_default()
            .await
            .map_err(|e| SecretError::backend("kubernetes", e.to_string()))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    fn backend_name(&self) -> &'static str {
        "kubernetes"
    }

    async fn fetch(&self, namespace: &str, name: &str) -> Result<SecretData, SecretError> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);

        let secret = secrets
            .get_opt(name)
            .await
            .map_err(|e| SecretError::backend("kubernetes", e.to_string()))?
            .ok_or_else(|| SecretError::not_found(namespace, name))?;

        Ok(secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| (key, value.0))
            .collect())
    }
}
