//! Webhook configuration with environment variable priority
//!
//! Configuration is resolved in this order (first found wins):
//! 1. Command-line flags
//! 2. Environment variables
//! 3. Config file (TOML, optional)
//! 4. Default values (where applicable)

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Production endpoint of the ArvanCloud CDN API
pub const DEFAULT_BASE_URL: &str = "https://napi.arvancloud.ir/cdn/4.0";

const DEFAULT_SECURE_PORT: u16 = 443;

const ENV_GROUP_NAME: &str = "GROUP_NAME";
const ENV_BASE_URL: &str = "ARVANCLOUD_CDN_BASE_URL";
const ENV_SECURE_PORT: &str = "WEBHOOK_SECURE_PORT";
const ENV_TLS_CERT_FILE: &str = "WEBHOOK_TLS_CERT_FILE";
const ENV_TLS_KEY_FILE: &str = "WEBHOOK_TLS_PRIVATE_KEY_FILE";
const ENV_CLIENT_CA_FILE: &str = "WEBHOOK_REQUESTHEADER_CLIENT_CA_FILE";
const ENV_INSECURE_HTTP: &str = "WEBHOOK_INSECURE_HTTP";
const ENV_SECRETS_DIR: &str = "WEBHOOK_SECRETS_DIR";

/// Webhook configuration (parsed from TOML, can be overridden by env and flags)
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct WebhookConfig {
    /// API group the solver is registered under (e.g., "acme.example.com")
    pub group_name: Option<String>,

    /// Base URL of the ArvanCloud CDN API
    pub arvancloud_base_url: Option<String>,

    /// HTTPS listening port
    pub secure_port: Option<u16>,

    /// Serving certificate chain (PEM file)
    pub tls_cert_file: Option<PathBuf>,

    /// Serving private key (PEM file)
    pub tls_private_key_file: Option<PathBuf>,

    /// CA bundle that signs the aggregator's front-proxy client certificate
    pub requestheader_client_ca_file: Option<PathBuf>,

    /// Serve plain HTTP without client authentication when no certificate is set
    pub insecure_http: Option<bool>,

    /// Read secrets from this directory instead of the Kubernetes API
    pub secrets_dir: Option<PathBuf>,
}

/// Serving certificate, key and client CA paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
    pub client_ca_file: PathBuf,
}

/// Resolved webhook settings
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub group_name: String,
    pub arvancloud_base_url: String,
    pub secure_port: u16,
    /// Unset only when plain HTTP was explicitly allowed
    pub tls: Option<TlsFiles>,
    pub secrets_dir: Option<PathBuf>,
    pub build: BuildInfo,
}

/// Build metadata reported in the API client's user agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: String,
    pub build_date: String,
    pub commit: String,
    pub os: String,
    pub arch: String,
}

impl BuildInfo {
    /// Metadata of the running binary
    ///
    /// Build date and commit are stamped at compile time through the
    /// `ARVANCLOUD_WEBHOOK_BUILD_DATE` and `ARVANCLOUD_WEBHOOK_COMMIT`
    /// environment variables.
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            build_date: option_env!("ARVANCLOUD_WEBHOOK_BUILD_DATE")
                .unwrap_or("(unknown)")
                .to_string(),
            commit: option_env!("ARVANCLOUD_WEBHOOK_COMMIT")
                .unwrap_or("(unknown)")
                .to_string(),
            os: env::consts::OS.to_string(),
            arch: env::consts::ARCH.to_string(),
        }
    }

    pub fn user_agent(&self) -> String {
        format!(
            "cert-manager-arvancloud (Version: {};BuildDate: {};Commit: {};OS/Arch: {}/{};)",
            self.version, self.build_date, self.commit, self.os, self.arch
        )
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

impl WebhookConfig {
    /// Load configuration from a TOML file (optional)
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", path.display(), e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
            }
        }
        Self::default()
    }

    /// Resolve against command-line flags and the process environment
    pub fn resolve(self, flags: WebhookConfig) -> anyhow::Result<WebhookSettings> {
        self.resolve_with(flags, |name| env::var(name).ok())
    }

    /// Resolve against command-line flags and an environment lookup
    pub fn resolve_with<F>(self, flags: WebhookConfig, env: F) -> anyhow::Result<WebhookSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty variables count as unset
        let get_env = |name: &str| env(name).filter(|v| !v.is_empty());

        let group_name = flags
            .group_name
            .or_else(|| get_env(ENV_GROUP_NAME))
            .or(self.group_name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("GROUP_NAME must be specified (environment or group_name in config)")
            })?;

        let arvancloud_base_url = flags
            .arvancloud_base_url
            .or_else(|| get_env(ENV_BASE_URL))
            .or(self.arvancloud_base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let secure_port = match flags.secure_port {
            Some(port) => port,
            None => match get_env(ENV_SECURE_PORT) {
                Some(port) => port
                    .parse()
                    .map_err(|e| anyhow::anyhow!("Invalid {}: {}", ENV_SECURE_PORT, e))?,
                None => self.secure_port.unwrap_or(DEFAULT_SECURE_PORT),
            },
        };

        let cert_file = flags
            .tls_cert_file
            .or_else(|| get_env(ENV_TLS_CERT_FILE).map(PathBuf::from))
            .or(self.tls_cert_file);
        let key_file = flags
            .tls_private_key_file
            .or_else(|| get_env(ENV_TLS_KEY_FILE).map(PathBuf::from))
            .or(self.tls_private_key_file);

        let client_ca_file = flags
            .requestheader_client_ca_file
            .or_else(|| get_env(ENV_CLIENT_CA_FILE).map(PathBuf::from))
            .or(self.requestheader_client_ca_file);

        let insecure_http = match flags.insecure_http {
            Some(insecure) => insecure,
            None => match get_env(ENV_INSECURE_HTTP) {
                Some(value) => parse_bool(&value)
                    .ok_or_else(|| anyhow::anyhow!("Invalid {}: {}", ENV_INSECURE_HTTP, value))?,
                None => self.insecure_http.unwrap_or(false),
            },
        };

        let tls = match (cert_file, key_file) {
            (Some(cert_file), Some(key_file)) => {
                let client_ca_file = client_ca_file.ok_or_else(|| {
                    anyhow::anyhow!(
                        "{} must be set when serving TLS (requestheader-client-ca-file of the \
                         extension-apiserver-authentication ConfigMap)",
                        ENV_CLIENT_CA_FILE
                    )
                })?;
                Some(TlsFiles {
                    cert_file,
                    key_file,
                    client_ca_file,
                })
            }
            (None, None) if insecure_http => None,
            (None, None) => anyhow::bail!(
                "No serving certificate configured: set {} and {}, or {}=true to serve \
                 unauthenticated plain HTTP",
                ENV_TLS_CERT_FILE,
                ENV_TLS_KEY_FILE,
                ENV_INSECURE_HTTP
            ),
            _ => anyhow::bail!("TLS certificate and private key must be configured together"),
        };

        let secrets_dir = flags
            .secrets_dir
            .or_else(|| get_env(ENV_SECRETS_DIR).map(PathBuf::from))
            .or(self.secrets_dir);

        Ok(WebhookSettings {
            group_name,
            arvancloud_base_url,
            secure_port,
            tls,
            secrets_dir,
            build: BuildInfo::current(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_group_name_required() {
        let result = WebhookConfig::default().resolve_with(WebhookConfig::default(), env_of(&[]));
        assert!(result.is_err());

        let result = WebhookConfig::default()
            .resolve_with(WebhookConfig::default(), env_of(&[("GROUP_NAME", "")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults() {
        let settings = WebhookConfig::default()
            .resolve_with(
                WebhookConfig::default(),
                env_of(&[
                    ("GROUP_NAME", "acme.example.com"),
                    ("WEBHOOK_INSECURE_HTTP", "true"),
                ]),
            )
            .unwrap();

        assert_eq!(settings.group_name, "acme.example.com");
        assert_eq!(settings.arvancloud_base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.secure_port, 443);
        assert!(settings.tls.is_none());
        assert!(settings.secrets_dir.is_none());
    }

    #[test]
    fn test_priority_flags_env_file() {
        let file = WebhookConfig {
            group_name: Some("from-file".to_string()),
            arvancloud_base_url: Some("http://file".to_string()),
            secure_port: Some(1000),
            insecure_http: Some(true),
            ..Default::default()
        };
        let flags = WebhookConfig {
            secure_port: Some(3000),
            ..Default::default()
        };
        let settings = file
            .resolve_with(
                flags,
                env_of(&[
                    ("ARVANCLOUD_CDN_BASE_URL", "http://env"),
                    ("WEBHOOK_SECURE_PORT", "2000"),
                ]),
            )
            .unwrap();

        assert_eq!(settings.group_name, "from-file");
        assert_eq!(settings.arvancloud_base_url, "http://env");
        assert_eq!(settings.secure_port, 3000);
    }

    #[test]
    fn test_invalid_port() {
        let result = WebhookConfig::default().resolve_with(
            WebhookConfig::default(),
            env_of(&[("GROUP_NAME", "g"), ("WEBHOOK_SECURE_PORT", "https")]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_tls_requires_both_files() {
        let flags = WebhookConfig {
            tls_cert_file: Some(PathBuf::from("/tls/tls.crt")),
            requestheader_client_ca_file: Some(PathBuf::from("/tls/client-ca.crt")),
            ..Default::default()
        };
        let result = WebhookConfig::default().resolve_with(flags, env_of(&[("GROUP_NAME", "g")]));
        assert!(result.is_err());

        let settings = WebhookConfig::default()
            .resolve_with(
                WebhookConfig::default(),
                env_of(&[
                    ("GROUP_NAME", "g"),
                    ("WEBHOOK_TLS_CERT_FILE", "/tls/tls.crt"),
                    ("WEBHOOK_TLS_PRIVATE_KEY_FILE", "/tls/tls.key"),
                    ("WEBHOOK_REQUESTHEADER_CLIENT_CA_FILE", "/tls/client-ca.crt"),
                ]),
            )
            .unwrap();
        assert_eq!(
            settings.tls,
            Some(TlsFiles {
                cert_file: PathBuf::from("/tls/tls.crt"),
                key_file: PathBuf::from("/tls/tls.key"),
                client_ca_file: PathBuf::from("/tls/client-ca.crt"),
            })
        );
    }

    #[test]
    fn test_tls_requires_client_ca() {
        let result = WebhookConfig::default().resolve_with(
            WebhookConfig::default(),
            env_of(&[
                ("GROUP_NAME", "g"),
                ("WEBHOOK_TLS_CERT_FILE", "/tls/tls.crt"),
                ("WEBHOOK_TLS_PRIVATE_KEY_FILE", "/tls/tls.key"),
            ]),
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("WEBHOOK_REQUESTHEADER_CLIENT_CA_FILE"), "{}", err);
    }

    #[test]
    fn test_plain_http_needs_explicit_opt_in() {
        let result = WebhookConfig::default()
            .resolve_with(WebhookConfig::default(), env_of(&[("GROUP_NAME", "g")]));
        assert!(result.is_err());

        let result = WebhookConfig::default().resolve_with(
            WebhookConfig::default(),
            env_of(&[("GROUP_NAME", "g"), ("WEBHOOK_INSECURE_HTTP", "false")]),
        );
        assert!(result.is_err());

        let result = WebhookConfig::default().resolve_with(
            WebhookConfig::default(),
            env_of(&[("GROUP_NAME", "g"), ("WEBHOOK_INSECURE_HTTP", "maybe")]),
        );
        assert!(result.is_err());

        let flags = WebhookConfig {
            insecure_http: Some(true),
            ..Default::default()
        };
        let settings = WebhookConfig::default()
            .resolve_with(flags, env_of(&[("GROUP_NAME", "g")]))
            .unwrap();
        assert!(settings.tls.is_none());
    }

    #[test]
    fn test_parse_toml() {
        let config: WebhookConfig = toml::from_str(
            r#"
            group_name = "acme.example.com"
            secure_port = 8443
            requestheader_client_ca_file = "/etc/webhook/client-ca.crt"
            secrets_dir = "/var/run/arvancloud-secrets"
            "#,
        )
        .unwrap();
        assert_eq!(config.group_name.as_deref(), Some("acme.example.com"));
        assert_eq!(config.secure_port, Some(8443));
        assert_eq!(
            config.requestheader_client_ca_file,
            Some(PathBuf::from("/etc/webhook/client-ca.crt"))
        );
        assert_eq!(
            config.secrets_dir,
            Some(PathBuf::from("/var/run/arvancloud-secrets"))
        );
    }

    #[test]
    fn test_user_agent() {
        let build = BuildInfo {
            version: "1.2.3".to_string(),
            build_date: "2024-01-01".to_string(),
            commit: "abc123".to_string(),
            os: "linux".to_string(),
            arch: "x86_64".to_string(),
        };
        assert_eq!(
            build.user_agent(),
            "cert-manager-arvancloud (Version: 1.2.3;BuildDate: 2024-01-01;Commit: abc123;OS/Arch: linux/x86_64;)"
        );
    }

    #[test]
    fn test_missing_config_file_falls_back_to_default() {
        let config = WebhookConfig::load(Some(Path::new("/definitely/not/webhook.toml")));
        assert!(config.group_name.is_none());
    }
}
