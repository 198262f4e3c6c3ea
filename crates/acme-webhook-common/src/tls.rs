use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use rustls_pemfile::{certs, private_key};
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;

use crate::WebhookError;

/// Load certificates from a PEM file
fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, WebhookError> {
    let file = File::open(path).map_err(|e| {
        WebhookError::Certificate(format!("Failed to open cert file {:?}: {}", path, e))
    })?;
    let mut reader = BufReader::new(file);
    certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| WebhookError::Certificate(format!("Failed to parse certificates: {}", e)))
}

/// Load a private key from a PEM file
fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, WebhookError> {
    let file = File::open(path).map_err(|e| {
        WebhookError::Certificate(format!("Failed to open key file {:?}: {}", path, e))
    })?;
    let mut reader = BufReader::new(file);
    private_key(&mut reader)
        .map_err(|e| WebhookError::Certificate(format!("Failed to parse private key: {}", e)))?
        .ok_or_else(|| WebhookError::Certificate("No private key found in file".to_string()))
}

/// Load certificates from PEM content string
pub fn load_certs_from_pem(
    pem_content: &str,
) -> Result<Vec<CertificateDer<'static>>, WebhookError> {
    let mut cursor = Cursor::new(pem_content.as_bytes());
    certs(&mut cursor)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| WebhookError::Certificate(format!("Failed to parse certificates: {}", e)))
}

/// Load a private key from PEM content string
pub fn load_private_key_from_pem(
    pem_content: &str,
) -> Result<PrivateKeyDer<'static>, WebhookError> {
    let mut cursor = Cursor::new(pem_content.as_bytes());
    private_key(&mut cursor)
        .map_err(|e| WebhookError::Certificate(format!("Failed to parse private key: {}", e)))?
        .ok_or_else(|| WebhookError::Certificate("No private key found in PEM content".to_string()))
}

/// Build a trust store from CA certificates
fn root_store(ca_certs: Vec<CertificateDer<'static>>) -> Result<RootCertStore, WebhookError> {
    let mut root_store = RootCertStore::empty();
    for cert in ca_certs {
        root_store.add(cert).map_err(|e| {
            WebhookError::Certificate(format!("Failed to add CA certificate: {}", e))
        })?;
    }
    Ok(root_store)
}

fn build_server_config(
    certs: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
    client_ca: RootCertStore,
) -> Result<ServerConfig, WebhookError> {
    if certs.is_empty() {
        return Err(WebhookError::Certificate(
            "No certificates found".to_string(),
        ));
    }

    // Presented client certificates must chain to the client CA. Connections
    // without one still complete the handshake so the kubelet can reach the
    // health endpoints. The API routes reject them.
    let client_verifier = WebPkiClientVerifier::builder(Arc::new(client_ca))
        .allow_unauthenticated()
        .build()
        .map_err(|e| WebhookError::Tls(format!("Failed to build client verifier: {}", e)))?;

    let mut config = ServerConfig::builder()
        .with_client_cert_verifier(client_verifier)
        .with_single_cert(certs, key)
        .map_err(|e| WebhookError::Tls(format!("Failed to build server config: {}", e)))?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(config)
}

/// Load server TLS config with client certificate verification
///
/// # Arguments
/// * `cert_path` - Path to server certificate chain PEM file
/// * `key_path` - Path to server private key PEM file
/// * `client_ca_path` - CA bundle that signs the front-proxy client certificate
///   (`requestheader-client-ca-file` of the `extension-apiserver-authentication` ConfigMap)
pub fn load_server_config(
    cert_path: &Path,
    key_path: &Path,
    client_ca_path: &Path,
) -> Result<ServerConfig, WebhookError> {
    tracing::debug!("Loading serving certificate from {:?}", cert_path);
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;
    tracing::debug!("Loading client CA from {:?}", client_ca_path);
    let client_ca = root_store(load_certs(client_ca_path)?)?;
    build_server_config(certs, key, client_ca)
}

/// Load server TLS config from PEM content strings
///
/// # Arguments
/// * `cert_pem` - Server certificate chain PEM content
/// * `key_pem` - Server private key PEM content
/// * `client_ca_pem` - CA bundle PEM content for verifying client certificates
pub fn load_server_config_from_pem(
    cert_pem: &str,
    key_pem: &str,
    client_ca_pem: &str,
) -> Result<ServerConfig, WebhookError> {
    let certs = load_certs_from_pem(cert_pem)?;
    let key = load_private_key_from_pem(key_pem)?;
    let client_ca = root_store(load_certs_from_pem(client_ca_pem)?)?;
    build_server_config(certs, key, client_ca)
}

/// Wrap a server config into an acceptor
pub fn tls_acceptor(config: ServerConfig) -> TlsAcceptor {
    TlsAcceptor::from(Arc::new(config))
}
