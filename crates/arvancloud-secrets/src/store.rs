//! Secret store abstraction

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::SecretError;

/// Field name -> raw value of a single secret
pub type SecretData = BTreeMap<String, Vec<u8>>;

/// A key/value secret store addressed by namespace and name
///
/// Backends only implement [`SecretStore::fetch`]; field selection and
/// decoding are shared.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Backend name for logging/errors
    fn backend_name(&self) -> &'static str;

    /// Fetch every field of the secret `namespace/name`
    ///
    /// Returns [`SecretError::NotFound`] if the secret does not exist.
    async fn fetch(&self, namespace: &str, name: &str) -> Result<SecretData, SecretError>;

    /// Fetch a single field of the secret `namespace/name` as a string
    async fn resolve_key(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
    ) -> Result<String, SecretError> {
        tracing::debug!(
            backend = self.backend_name(),
            namespace,
            name,
            key,
            "Resolving secret"
        );

        let mut data = self.fetch(namespace, name).await?;
        let value = data.remove(key).ok_or_else(|| SecretError::FieldNotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
            key: key.to_string(),
        })?;

        String::from_utf8(value).map_err(|_| SecretError::NotUtf8 {
            namespace: namespace.to_string(),
            name: name.to_string(),
            key: key.to_string(),
        })
    }
}
