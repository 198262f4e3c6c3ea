//! Namespaced secret lookups with multiple backend support
//!
//! Solver configuration may point at a credential instead of embedding it.
//! A reference names a secret inside the requesting namespace and a field
//! within that secret. This crate resolves such references through a
//! [`SecretStore`]:
//!
//! - **Kubernetes** ([`KubeSecretStore`]): core/v1 `Secret` objects via the API server
//! - **Directory** ([`FileSecretStore`]): `{root}/{namespace}/{name}/{key}` files,
//!   for running outside a cluster
//! - **Memory** ([`MemorySecretStore`]): an in-process map, mostly for tests
//!
//! # Example
//!
//! ```rust,ignore
//! use arvancloud_secrets::{KubeSecretStore, SecretStore};
//!
//! let store = KubeSecretStore::try_default().await?;
//! let api_key = store.resolve_key("cert-manager", "arvancloud", "apiKey").await?;
//! ```
//!
//! # Features
//!
//! - `kube` (default): Enable the Kubernetes backend via the `kube` crate
//! - `file` (default): Enable the directory backend

mod backends;
mod error;
mod store;

pub use backends::memory::MemorySecretStore;
pub use error::SecretError;
pub use store::{SecretData, SecretStore};

#[cfg(feature = "file")]
pub use backends::file::FileSecretStore;

#[cfg(feature = "kube")]
pub use backends::kube::KubeSecretStore;
