mod error;
mod tls;

pub use error::WebhookError;
pub use tls::{
    load_certs_from_pem, load_private_key_from_pem, load_server_config,
    load_server_config_from_pem, tls_acceptor,
};
