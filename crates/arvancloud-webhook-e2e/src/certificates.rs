//! Serving certificates for HTTPS tests, generated with rcgen

use std::net::IpAddr;

use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose,
    IsCa, Issuer, KeyPair, KeyUsagePurpose, SanType,
};

/// Hosts the test webhook is reachable under
const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1"];

/// Common name of the aggregator's front-proxy client certificate
pub const FRONT_PROXY_CLIENT_NAME: &str = "front-proxy-client";

/// A throwaway CA with a webhook serving certificate and a client
/// certificate it signed
///
/// The CA doubles as the serving trust anchor and the requestheader client CA.
#[derive(Clone)]
pub struct TestCertificates {
    /// Trust anchor handed to HTTP clients and to the webhook
    pub ca_cert_pem: String,
    pub server_cert_pem: String,
    pub server_key_pem: String,
    /// Front-proxy client certificate
    pub client_cert_pem: String,
    pub client_key_pem: String,
}

fn common_name(name: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, name);
    dn
}

fn subject_alt_name(host: &str) -> SanType {
    match host.parse::<IpAddr>() {
        Ok(ip) => SanType::IpAddress(ip),
        Err(_) => SanType::DnsName(
            host.try_into()
                .unwrap_or_else(|e| panic!("Invalid DNS name {}: {}", host, e)),
        ),
    }
}

impl TestCertificates {
    /// Certificates valid for localhost over IPv4 and IPv6
    pub fn generate() -> Self {
        Self::generate_for(LOCAL_HOSTS)
    }

    /// Certificates whose serving cert covers `hosts` (DNS names or IPs)
    pub fn generate_for(hosts: &[&str]) -> Self {
        let mut ca_params = CertificateParams::default();
        ca_params.distinguished_name = common_name("ArvanCloud Webhook Test CA");
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        ca_params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];

        let ca_key = KeyPair::generate().expect("Failed to generate CA key");
        let ca_cert = ca_params
            .clone()
            .self_signed(&ca_key)
            .expect("Failed to self-sign CA");
        let issuer = Issuer::new(ca_params, ca_key);

        let mut params = CertificateParams::default();
        params.distinguished_name = common_name(hosts.first().copied().unwrap_or("localhost"));
        params.subject_alt_names = hosts.iter().map(|host| subject_alt_name(host)).collect();
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];

        let server_key = KeyPair::generate().expect("Failed to generate serving key");
        let server_cert = params
            .signed_by(&server_key, &issuer)
            .expect("Failed to sign serving certificate");

        let mut client_params = CertificateParams::default();
        client_params.distinguished_name = common_name(FRONT_PROXY_CLIENT_NAME);
        client_params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
        client_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];

        let client_key = KeyPair::generate().expect("Failed to generate client key");
        let client_cert = client_params
            .signed_by(&client_key, &issuer)
            .expect("Failed to sign client certificate");

        Self {
            ca_cert_pem: ca_cert.pem(),
            server_cert_pem: server_cert.pem(),
            server_key_pem: server_key.serialize_pem(),
            client_cert_pem: client_cert.pem(),
            client_key_pem: client_key.serialize_pem(),
        }
    }

    /// Client certificate and key as one PEM bundle, as `reqwest::Identity` expects
    pub fn client_identity_pem(&self) -> String {
        format!("{}{}", self.client_cert_pem, self.client_key_pem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pem_output() {
        let certs = TestCertificates::generate();

        assert!(certs.ca_cert_pem.starts_with("-----BEGIN CERTIFICATE-----"));
        assert!(certs
            .server_cert_pem
            .starts_with("-----BEGIN CERTIFICATE-----"));
        assert!(certs.server_key_pem.contains("PRIVATE KEY-----"));
        assert_ne!(certs.ca_cert_pem, certs.server_cert_pem);
        assert!(certs
            .client_identity_pem()
            .starts_with(&certs.client_cert_pem));
    }

    #[test]
    fn test_subject_alt_names() {
        assert!(matches!(subject_alt_name("::1"), SanType::IpAddress(_)));
        assert!(matches!(
            subject_alt_name("webhook.cert-manager.svc"),
            SanType::DnsName(_)
        ));
    }

    #[test]
    fn test_serving_config_accepts_generated_pair() {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let certs = TestCertificates::generate_for(&["webhook.cert-manager.svc"]);

        let config = acme_webhook_common::load_server_config_from_pem(
            &certs.server_cert_pem,
            &certs.server_key_pem,
            &certs.ca_cert_pem,
        )
        .expect("Generated pair should load");
        assert_eq!(config.alpn_protocols, vec![b"http/1.1".to_vec()]);
    }
}
