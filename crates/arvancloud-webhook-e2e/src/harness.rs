//! Test webhook harness for E2E tests
//!
//! This module starts the real webhook server with the ArvanCloud solver
//! wired to a mocked DNS provider and an in-memory secret store.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use acme_webhook_protocol::{
    ChallengeAction, ChallengePayload, ChallengeRequest, ChallengeResponse,
};
use arvancloud_secrets::MemorySecretStore;
use arvancloud_webhook::{ArvancloudSolver, Solver, WebhookServer, SOLVER_NAME};
use hyper::StatusCode;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};

use crate::certificates::TestCertificates;
use crate::mock_dns::{MockClientFactory, MockDnsProvider};

/// API group the test webhook is registered under
pub const TEST_GROUP_NAME: &str = "acme.test.example.com";

static UID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Build a challenge request with a fresh UID
pub fn challenge(
    action: ChallengeAction,
    fqdn: &str,
    zone: &str,
    key: &str,
    config: Option<serde_json::Value>,
) -> ChallengeRequest {
    ChallengeRequest {
        uid: format!("uid-{}", UID_COUNTER.fetch_add(1, Ordering::Relaxed)),
        action,
        challenge_type: "dns-01".to_string(),
        dns_name: fqdn
            .trim_end_matches('.')
            .trim_start_matches("_acme-challenge.")
            .to_string(),
        key: key.to_string(),
        resource_namespace: "default".to_string(),
        resolved_fqdn: fqdn.to_string(),
        resolved_zone: zone.to_string(),
        allow_ambient_credentials: false,
        config,
    }
}

/// A running webhook instance
pub struct TestWebhook {
    /// Listening address
    pub addr: SocketAddr,
    /// Mock DNS provider for assertions
    pub dns_provider: Arc<MockDnsProvider>,
    /// Mock client factory for assertions on credentials
    pub clients: Arc<MockClientFactory>,
    /// Secret store the solver reads from
    pub secrets: Arc<MemorySecretStore>,
    /// Certificates when serving HTTPS
    pub certs: Option<Arc<TestCertificates>>,
    http_client: reqwest::Client,
    shutdown_tx: Option<oneshot::Sender<()>>,
    _solver_shutdown: watch::Sender<bool>,
}

impl TestWebhook {
    /// Start a plain-HTTP webhook with mock DNS
    pub async fn start() -> Self {
        Self::start_inner(None).await
    }

    /// Start an HTTPS webhook with generated certificates
    pub async fn start_tls() -> Self {
        Self::start_inner(Some(Arc::new(TestCertificates::generate()))).await
    }

    async fn start_inner(certs: Option<Arc<TestCertificates>>) -> Self {
        let dns_provider = MockDnsProvider::new();
        let clients = MockClientFactory::new(dns_provider.clone());
        let secrets = Arc::new(MemorySecretStore::new());

        let solver: Arc<dyn Solver> =
            Arc::new(ArvancloudSolver::new(secrets.clone(), clients.clone()));

        let tls_acceptor = certs.as_ref().map(|certs| {
            let config = acme_webhook_common::load_server_config_from_pem(
                &certs.server_cert_pem,
                &certs.server_key_pem,
                &certs.ca_cert_pem,
            )
            .expect("Failed to load server TLS config");
            acme_webhook_common::tls_acceptor(config)
        });

        let http_client = match &certs {
            Some(certs) => https_client(certs, Some(certs)),
            None => reqwest::Client::new(),
        };

        let server = WebhookServer::new(TEST_GROUP_NAME, vec![solver], tls_acceptor);

        let (solver_shutdown, solver_shutdown_rx) = watch::channel(false);
        server
            .initialize(solver_shutdown_rx)
            .await
            .expect("Failed to initialize solvers");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind webhook");
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        tokio::spawn(async move {
            tokio::select! {
                result = server.serve(listener) => {
                    if let Err(e) = result {
                        tracing::error!("Webhook error: {}", e);
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Webhook shutting down");
                }
            }
        });

        Self {
            addr,
            dns_provider,
            clients,
            secrets,
            certs,
            http_client,
            shutdown_tx: Some(shutdown_tx),
            _solver_shutdown: solver_shutdown,
        }
    }

    /// Base URL of the webhook ("http://..." or "https://localhost:...")
    pub fn base_url(&self) -> String {
        match self.certs {
            Some(_) => format!("https://localhost:{}", self.addr.port()),
            None => format!("http://{}", self.addr),
        }
    }

    /// URL of the solver's challenge endpoint
    pub fn challenge_url(&self) -> String {
        format!(
            "{}/apis/{}/v1alpha1/{}",
            self.base_url(),
            TEST_GROUP_NAME,
            SOLVER_NAME
        )
    }

    /// HTTP client trusting this webhook, presenting the front-proxy
    /// client certificate over HTTPS
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// HTTPS client trusting this webhook without a client certificate
    pub fn anonymous_client(&self) -> reqwest::Client {
        let certs = self.certs.as_ref().expect("Webhook is not serving HTTPS");
        https_client(certs, None)
    }

    /// HTTPS client trusting this webhook, presenting the client
    /// certificate from `identity`
    pub fn client_with_identity(&self, identity: &TestCertificates) -> reqwest::Client {
        let certs = self.certs.as_ref().expect("Webhook is not serving HTTPS");
        https_client(certs, Some(identity))
    }

    /// POST a challenge and return the HTTP status and decoded envelope
    pub async fn send(&self, request: ChallengeRequest) -> (StatusCode, ChallengePayload) {
        let resp = self
            .http_client
            .post(self.challenge_url())
            .json(&ChallengePayload::for_request(request))
            .send()
            .await
            .expect("Challenge request failed");

        let status = resp.status();
        let payload = resp
            .json::<ChallengePayload>()
            .await
            .expect("Failed to decode challenge response");
        (status, payload)
    }

    /// POST a challenge and return only its response
    pub async fn solve(&self, request: ChallengeRequest) -> ChallengeResponse {
        let (_, payload) = self.send(request).await;
        payload.response.expect("Envelope has no response")
    }

    /// Shutdown the test webhook
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn https_client(trust: &TestCertificates, identity: Option<&TestCertificates>) -> reqwest::Client {
    let mut builder = reqwest::Client::builder().add_root_certificate(
        reqwest::Certificate::from_pem(trust.ca_cert_pem.as_bytes())
            .expect("Failed to parse CA certificate"),
    );
    if let Some(identity) = identity {
        builder = builder.identity(
            reqwest::Identity::from_pem(identity.client_identity_pem().as_bytes())
                .expect("Failed to parse client identity"),
        );
    }
    builder.build().expect("Failed to build HTTPS client")
}

impl Drop for TestWebhook {
    fn drop(&mut self) {
        self.shutdown();
    }
}
