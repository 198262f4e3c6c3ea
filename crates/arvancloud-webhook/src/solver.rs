//! ArvanCloud DNS-01 solver
//!
//! Present creates one TXT record; clean-up looks the record up by name and
//! value and deletes it. Both resolve the solver configuration and API key
//! afresh for every challenge.

use std::sync::Arc;

use acme_webhook_protocol::ChallengeRequest;
use arvancloud_secrets::SecretStore;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

use crate::dns_provider::{DnsClientFactory, DnsError, DnsProvider, TxtRecord};
use crate::record_name::{relative_record_name, un_fqdn};
use crate::solver_config::{ConfigError, CredentialError, SolverConfig};
use crate::webhook::Solver;

/// Name the solver is registered under
pub const SOLVER_NAME: &str = "arvancloud";

/// Errors from presenting or cleaning up a challenge
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("unable to load config: {0}")]
    Config(#[from] ConfigError),

    #[error("unable to get API key: {0}")]
    Credential(#[from] CredentialError),

    #[error("failed to create ArvanCloud CDN API client: {0}")]
    ClientConstruction(#[source] DnsError),

    #[error("failed to create DNS record: {0}")]
    RecordCreate(#[source] DnsError),

    #[error("failed to find DNS record: {0}")]
    RecordSearch(#[source] DnsError),

    #[error("failed to delete DNS record: {0}")]
    RecordDelete(#[source] DnsError),
}

/// Everything a challenge needs once configuration is resolved
struct PreparedChallenge {
    client: Arc<dyn DnsProvider>,
    /// Zone without trailing dot
    domain: String,
    record_name: String,
    ttl: u32,
}

/// DNS-01 solver backed by the ArvanCloud CDN DNS API
pub struct ArvancloudSolver {
    secrets: Arc<dyn SecretStore>,
    clients: Arc<dyn DnsClientFactory>,
}

impl ArvancloudSolver {
    pub fn new(secrets: Arc<dyn SecretStore>, clients: Arc<dyn DnsClientFactory>) -> Self {
        Self { secrets, clients }
    }

    async fn prepare(&self, ch: &ChallengeRequest) -> Result<PreparedChallenge, SolverError> {
        let config = SolverConfig::from_json(ch.config.as_ref())?;
        let api_key = config
            .api_key(&ch.resource_namespace, self.secrets.as_ref())
            .await?;

        let client = self
            .clients
            .connect(&api_key)
            .map_err(SolverError::ClientConstruction)?;

        let domain = un_fqdn(&ch.resolved_zone).to_string();
        let record_name = relative_record_name(&ch.resolved_fqdn, &domain);

        Ok(PreparedChallenge {
            client,
            domain,
            record_name,
            ttl: config.ttl,
        })
    }

    /// Create the challenge TXT record
    pub async fn present_challenge(&self, ch: &ChallengeRequest) -> Result<(), SolverError> {
        tracing::info!("Presenting DNS01 challenge for {}", ch.dns_name);

        let prepared = self.prepare(ch).await?;
        let record = TxtRecord {
            name: prepared.record_name.clone(),
            text: ch.key.clone(),
            ttl: prepared.ttl,
        };

        let message = prepared
            .client
            .create_txt_record(&prepared.domain, &record)
            .await
            .map_err(SolverError::RecordCreate)?;

        tracing::info!(
            domain = %prepared.domain,
            record_name = %prepared.record_name,
            message = %message,
            "DNS record created successfully"
        );
        Ok(())
    }

    /// Delete the challenge TXT record, if it still exists
    pub async fn clean_up_challenge(&self, ch: &ChallengeRequest) -> Result<(), SolverError> {
        tracing::info!("Cleaning up DNS01 challenge for {}", ch.dns_name);

        let prepared = self.prepare(ch).await?;

        let records = prepared
            .client
            .search_txt_records(&prepared.domain, &prepared.record_name)
            .await
            .map_err(SolverError::RecordSearch)?;

        let matching = records
            .iter()
            .filter(|r| !r.id.is_empty())
            .find(|r| r.name == prepared.record_name && r.text() == Some(ch.key.as_str()));

        let Some(record) = matching else {
            tracing::warn!(
                "DNS record not found for cleanup (domain: {}, record name: {})",
                prepared.domain,
                prepared.record_name
            );
            return Ok(());
        };

        let message = prepared
            .client
            .delete_record(&prepared.domain, &record.id)
            .await
            .map_err(SolverError::RecordDelete)?;

        tracing::info!(
            domain = %prepared.domain,
            record_name = %prepared.record_name,
            record_id = %record.id,
            message = %message,
            "DNS record deleted successfully"
        );
        Ok(())
    }
}

#[async_trait]
impl Solver for ArvancloudSolver {
    fn name(&self) -> &str {
        SOLVER_NAME
    }

    async fn initialize(&self, _shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        tracing::info!(
            "Initialized {} solver (secret backend: {})",
            SOLVER_NAME,
            self.secrets.backend_name()
        );
        Ok(())
    }

    async fn present(&self, ch: &ChallengeRequest) -> anyhow::Result<()> {
        Ok(self.present_challenge(ch).await?)
    }

    async fn clean_up(&self, ch: &ChallengeRequest) -> anyhow::Result<()> {
        Ok(self.clean_up_challenge(ch).await?)
    }
}
