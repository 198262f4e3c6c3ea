use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arvancloud_secrets::{FileSecretStore, KubeSecretStore, SecretStore};
use arvancloud_webhook::{
    ArvancloudClientFactory, ArvancloudSolver, Solver, WebhookConfig, WebhookServer,
};
use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// DNS-01 webhook solver for ArvanCloud
#[derive(Parser, Debug)]
#[command(name = "arvancloud-webhook")]
#[command(version, about = "cert-manager DNS-01 webhook solver for ArvanCloud")]
struct Args {
    /// Path to an optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTPS listening port
    #[arg(long)]
    secure_port: Option<u16>,

    /// Serving certificate chain (PEM)
    #[arg(long)]
    tls_cert_file: Option<PathBuf>,

    /// Serving private key (PEM)
    #[arg(long)]
    tls_private_key_file: Option<PathBuf>,

    /// CA bundle for the front-proxy client certificate
    /// (`requestheader-client-ca-file` of the extension-apiserver-authentication ConfigMap)
    #[arg(long)]
    requestheader_client_ca_file: Option<PathBuf>,

    /// Serve plain HTTP with no client authentication when no certificate is set
    #[arg(long)]
    insecure_http: bool,

    /// Read API key secrets from this directory instead of the Kubernetes API
    #[arg(long)]
    secrets_dir: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> WebhookConfig {
        WebhookConfig {
            secure_port: self.secure_port,
            tls_cert_file: self.tls_cert_file.clone(),
            tls_private_key_file: self.tls_private_key_file.clone(),
            requestheader_client_ca_file: self.requestheader_client_ca_file.clone(),
            insecure_http: self.insecure_http.then_some(true),
            secrets_dir: self.secrets_dir.clone(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install crypto provider before any TLS operations
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("arvancloud_webhook=info".parse()?)
                .add_directive("arvancloud_secrets=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let settings = WebhookConfig::load(args.config.as_deref())
        .resolve(args.overrides())
        .context("Failed to resolve webhook configuration")?;

    tracing::info!("Group name: {}", settings.group_name);
    tracing::info!("ArvanCloud API: {}", settings.arvancloud_base_url);
    tracing::info!("User agent: {}", settings.build.user_agent());

    let secrets: Arc<dyn SecretStore> = match &settings.secrets_dir {
        Some(dir) => {
            tracing::info!("Reading secrets from {}", dir.display());
            Arc::new(FileSecretStore::new(dir))
        }
        None => Arc::new(
            KubeSecretStore::try_default()
                .await
                .context("Failed to create Kubernetes client")?,
        ),
    };

    let clients = Arc::new(ArvancloudClientFactory::new(
        &settings.arvancloud_base_url,
        &settings.build,
    ));
    let solver: Arc<dyn Solver> = Arc::new(ArvancloudSolver::new(secrets, clients));

    let tls_acceptor = match &settings.tls {
        Some(tls) => {
            let config = acme_webhook_common::load_server_config(
                &tls.cert_file,
                &tls.key_file,
                &tls.client_ca_file,
            )
            .context("Failed to load serving certificate")?;
            Some(acme_webhook_common::tls_acceptor(config))
        }
        None => {
            tracing::warn!("Serving plain HTTP without client authentication");
            None
        }
    };

    let server = WebhookServer::new(settings.group_name.clone(), vec![solver], tls_acceptor);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    server.initialize(shutdown_rx).await?;

    let addr: SocketAddr = format!("0.0.0.0:{}", settings.secure_port).parse()?;

    tokio::select! {
        result = server.run(addr) => {
            result.context("Webhook server stopped")?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received");
        }
    }

    let _ = shutdown_tx.send(true);
    tracing::info!("Webhook shutdown complete");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM");
        }
    }
}
