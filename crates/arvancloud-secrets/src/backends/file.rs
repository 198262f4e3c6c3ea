//! Directory backend
//!
//! Mirrors how Kubernetes projects a Secret into a volume: one directory per
//! secret, one file per field. Secrets live at `{root}/{namespace}/{name}/`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::SecretError;
use crate::store::{SecretData, SecretStore};

/// Secrets read from a directory tree
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    root: PathBuf,
}

impl FileSecretStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Reject components that would escape the namespace/name directories
fn is_safe_component(component: &str) -> bool {
    !component.is_empty()
        && component != "."
        && component != ".."
        && !component.contains(['/', '\\'])
}

#[async_trait]
impl SecretStore for FileSecretStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn fetch(&self, namespace: &str, name: &str) -> Result<SecretData, SecretError> {
        if !is_safe_component(namespace) || !is_safe_component(name) {
            return Err(SecretError::not_found(namespace, name));
        }

        let dir = self.root.join(namespace).join(name);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SecretError::not_found(namespace, name));
            }
            Err(e) => {
                return Err(SecretError::FileError {
                    path: dir,
                    message: e.to_string(),
                })
            }
        };

        let file_error = |path: &Path, e: std::io::Error| SecretError::FileError {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let mut data = SecretData::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| file_error(&dir, e))? {
            let path = entry.path();
            let Some(key) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            // Projected volumes keep timestamped payload dirs behind dot-prefixed links
            if key.starts_with('.') || !path.is_file() {
                continue;
            }
            let value = tokio::fs::read(&path)
                .await
                .map_err(|e| file_error(&path, e))?;
            data.insert(key, value);
        }

        Ok(data)
    }
}
