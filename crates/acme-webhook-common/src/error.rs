use thiserror::Error;

/// Common errors for serving the webhook
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Certificate error: {0}")]
    Certificate(String),
}
