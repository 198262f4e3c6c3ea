//! ArvanCloud DNS-01 webhook solver
//!
//! This library provides the solver, the ArvanCloud API client and the
//! webhook server that exposes them to the certificate controller.
//! It can be used to embed the solver in other applications or for testing.

mod arvancloud;
mod config;
mod dns_provider;
mod record_name;
mod solver;
mod solver_config;
mod webhook;

// Re-export public types
pub use arvancloud::{authorization_header, ArvancloudClient, ArvancloudClientFactory};
pub use config::{BuildInfo, TlsFiles, WebhookConfig, WebhookSettings, DEFAULT_BASE_URL};
pub use dns_provider::{
    DnsClientFactory, DnsError, DnsProvider, DnsRecord, TxtRecord, TXT_RECORD_TYPE,
};
pub use record_name::{relative_record_name, un_fqdn, ZONE_APEX};
pub use solver::{ArvancloudSolver, SolverError, SOLVER_NAME};
pub use solver_config::{
    ConfigError, CredentialError, SecretKeySelector, SolverConfig, DEFAULT_TTL,
};
pub use webhook::{Solver, WebhookServer};
