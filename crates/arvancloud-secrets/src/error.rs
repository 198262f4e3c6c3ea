use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during secret resolution
#[derive(Debug, Error)]
pub enum SecretError {
    /// The secret itself does not exist
    #[error("secret {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    /// The secret exists but lacks the requested field
    #[error("key {key} not found in {namespace}/{name}")]
    FieldNotFound {
        namespace: String,
        name: String,
        key: String,
    },

    /// The field holds bytes that are not valid UTF-8
    #[error("key {key} in {namespace}/{name} is not valid UTF-8")]
    NotUtf8 {
        namespace: String,
        name: String,
        key: String,
    },

    /// Backend runtime error
    #[error("{backend} error: {message}")]
    BackendError { backend: String, message: String },

    /// File IO error
    #[error("Failed to read '{path}': {message}")]
    FileError { path: PathBuf, message: String },
}

impl SecretError {
    /// Create a not-found error
    pub fn not_found(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create a backend error
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendError {
            backend: backend.into(),
            message: message.into(),
        }
    }
}
