use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use acme_webhook_protocol::{
    ApiResourceList, ChallengeAction, ChallengePayload, ChallengeRequest, ChallengeResponse,
    SOLVER_VERSION,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_rustls::TlsAcceptor;

/// Largest challenge payload accepted
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Pause after a failed accept before trying again
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// A DNS-01 challenge solver registered with the webhook
///
/// Mirrors the host contract: initialize once at startup, then present and
/// clean up challenges as the controller asks. Implementations must tolerate
/// concurrent calls for distinct challenges.
#[async_trait]
pub trait Solver: Send + Sync {
    /// Resource name the solver is exposed under
    fn name(&self) -> &str;

    /// Called once before serving, with a signal that flips to `true` on shutdown
    async fn initialize(&self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()>;

    /// Create the record that proves ownership
    async fn present(&self, request: &ChallengeRequest) -> anyhow::Result<()>;

    /// Remove the record; succeeding when it is already gone
    async fn clean_up(&self, request: &ChallengeRequest) -> anyhow::Result<()>;
}

enum Route<'a> {
    Health,
    Discovery,
    Challenge(&'a str),
    NotFound,
}

/// HTTPS endpoint the controller posts challenge payloads to
pub struct WebhookServer {
    group_name: String,
    solvers: HashMap<String, Arc<dyn Solver>>,
    /// Optional TLS acceptor; plain HTTP when unset
    tls_acceptor: Option<TlsAcceptor>,
}

impl WebhookServer {
    pub fn new(
        group_name: impl Into<String>,
        solvers: Vec<Arc<dyn Solver>>,
        tls_acceptor: Option<TlsAcceptor>,
    ) -> Arc<Self> {
        Arc::new(Self {
            group_name: group_name.into(),
            solvers: solvers
                .into_iter()
                .map(|solver| (solver.name().to_string(), solver))
                .collect(),
            tls_acceptor,
        })
    }

    /// Initialize every registered solver
    pub async fn initialize(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        for (name, solver) in &self.solvers {
            solver
                .initialize(shutdown.clone())
                .await
                .with_context(|| format!("Failed to initialize solver {}", name))?;
        }
        Ok(())
    }

    /// Bind and serve on the given address
    pub async fn run(self: Arc<Self>, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        if self.tls_acceptor.is_some() {
            tracing::info!("Webhook listening on https://{}", addr);
        } else {
            tracing::info!("Webhook listening on http://{}", addr);
        }

        loop {
            let (stream, peer_addr) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    // Transient (e.g. out of file descriptors); keep serving
                    tracing::error!("Webhook accept error: {}", e);
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    continue;
                }
            };
            tracing::debug!("Connection from {}", peer_addr);
            let this = self.clone();

            tokio::spawn(async move {
                if let Some(ref acceptor) = this.tls_acceptor {
                    match acceptor.accept(stream).await {
                        Ok(tls_stream) => {
                            // Only certificates chaining to the client CA get this far
                            let authenticated = tls_stream.get_ref().1.peer_certificates().is_some();
                            this.serve_connection(tls_stream, peer_addr, authenticated)
                                .await;
                        }
                        Err(e) => {
                            tracing::warn!("TLS handshake failed from {}: {}", peer_addr, e);
                        }
                    }
                } else {
                    // Plain HTTP is an explicit opt-out of client authentication
                    this.serve_connection(stream, peer_addr, true).await;
                }
            });
        }
    }

    /// Serve an HTTP connection on any AsyncRead + AsyncWrite stream
    async fn serve_connection<S>(
        self: Arc<Self>,
        stream: S,
        peer_addr: SocketAddr,
        authenticated: bool,
    ) where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let io = TokioIo::new(stream);

        let service = service_fn(move |req| {
            let this = self.clone();
            async move { this.handle_request(req, authenticated).await }
        });

        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
            tracing::debug!("HTTP connection error from {}: {}", peer_addr, e);
        }
    }

    fn route<'a>(&self, path: &'a str) -> Route<'a> {
        match path {
            "/healthz" | "/livez" | "/readyz" => return Route::Health,
            _ => {}
        }

        let Some(rest) = path
            .strip_prefix("/apis/")
            .and_then(|p| p.strip_prefix(self.group_name.as_str()))
            .and_then(|p| p.strip_prefix('/'))
            .and_then(|p| p.strip_prefix(SOLVER_VERSION))
        else {
            return Route::NotFound;
        };

        match rest.trim_end_matches('/') {
            "" => Route::Discovery,
            resource => match resource.strip_prefix('/') {
                Some(name) if !name.contains('/') => Route::Challenge(name),
                _ => Route::NotFound,
            },
        }
    }

    async fn handle_request(
        self: Arc<Self>,
        req: Request<Incoming>,
        authenticated: bool,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        tracing::debug!("Webhook request: {} {}", req.method(), req.uri());

        let path = req.uri().path().to_string();
        let method = req.method().clone();
        let route = self.route(&path);

        if !authenticated && matches!(route, Route::Discovery | Route::Challenge(_)) {
            tracing::warn!("Rejected unauthenticated request: {} {}", method, path);
            return Ok(text_response(StatusCode::UNAUTHORIZED, "Unauthorized"));
        }

        let response = match (route, method) {
            (Route::Health, Method::GET) => text_response(StatusCode::OK, "ok"),
            (Route::Discovery, Method::GET) => {
                let list = ApiResourceList::for_solvers(
                    &self.group_name,
                    self.solvers.keys().map(String::as_str),
                );
                json_response(StatusCode::OK, &list)
            }
            (Route::Challenge(name), Method::POST) => match self.solvers.get(name) {
                Some(solver) => self.handle_challenge(solver.clone(), req).await,
                None => {
                    tracing::warn!("Challenge for unknown solver: {}", name);
                    text_response(
                        StatusCode::NOT_FOUND,
                        format!("Solver not found: {}", name),
                    )
                }
            },
            (Route::NotFound, _) => text_response(StatusCode::NOT_FOUND, "Not found"),
            _ => text_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
        };

        Ok(response)
    }

    async fn handle_challenge(
        &self,
        solver: Arc<dyn Solver>,
        req: Request<Incoming>,
    ) -> Response<Full<Bytes>> {
        let body = match Limited::new(req.into_body(), MAX_BODY_SIZE).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                tracing::warn!("Failed to read challenge payload: {}", e);
                return text_response(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read body: {}", e),
                );
            }
        };

        let payload = match ChallengePayload::decode_request(&body) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Rejected challenge payload: {}", e);
                return text_response(StatusCode::BAD_REQUEST, e.to_string());
            }
        };
        let Some(request) = payload.request.as_ref() else {
            return text_response(StatusCode::BAD_REQUEST, "challenge payload has no request");
        };

        tracing::debug!(
            uid = %request.uid,
            action = ?request.action,
            fqdn = %request.resolved_fqdn,
            "Dispatching challenge to {}",
            solver.name()
        );

        let result = match request.action {
            ChallengeAction::Present => solver.present(request).await,
            ChallengeAction::CleanUp => solver.clean_up(request).await,
        };

        let response = match result {
            Ok(()) => ChallengeResponse::success(&request.uid),
            Err(e) => {
                tracing::error!(
                    uid = %request.uid,
                    action = ?request.action,
                    "Challenge failed: {}",
                    e
                );
                ChallengeResponse::failure(&request.uid, e.to_string())
            }
        };

        json_response(
            StatusCode::CREATED,
            &ChallengePayload::for_response(&payload.api_version, &payload.kind, response),
        )
    }
}

fn text_response(status: StatusCode, body: impl Into<String>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.into())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut response = Response::new(Full::new(Bytes::from(body)));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(e) => {
            tracing::error!("Failed to encode response: {}", e);
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode response")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NamedSolver(&'static str);

    #[async_trait]
    impl Solver for NamedSolver {
        fn name(&self) -> &str {
            self.0
        }

        async fn initialize(&self, _shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
            Ok(())
        }

        async fn present(&self, _request: &ChallengeRequest) -> anyhow::Result<()> {
            Ok(())
        }

        async fn clean_up(&self, _request: &ChallengeRequest) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn server() -> Arc<WebhookServer> {
        WebhookServer::new(
            "acme.example.com",
            vec![Arc::new(NamedSolver("arvancloud"))],
            None,
        )
    }

    #[test]
    fn test_route_health() {
        let server = server();
        assert!(matches!(server.route("/healthz"), Route::Health));
        assert!(matches!(server.route("/readyz"), Route::Health));
        assert!(matches!(server.route("/livez"), Route::Health));
    }

    #[test]
    fn test_route_discovery() {
        let server = server();
        assert!(matches!(
            server.route("/apis/acme.example.com/v1alpha1"),
            Route::Discovery
        ));
        assert!(matches!(
            server.route("/apis/acme.example.com/v1alpha1/"),
            Route::Discovery
        ));
    }

    #[test]
    fn test_route_challenge() {
        let server = server();
        assert!(matches!(
            server.route("/apis/acme.example.com/v1alpha1/arvancloud"),
            Route::Challenge("arvancloud")
        ));
    }

    #[test]
    fn test_route_rejects_other_groups_and_paths() {
        let server = server();
        assert!(matches!(
            server.route("/apis/acme.other.com/v1alpha1/arvancloud"),
            Route::NotFound
        ));
        assert!(matches!(
            server.route("/apis/acme.example.com.evil/v1alpha1/arvancloud"),
            Route::NotFound
        ));
        assert!(matches!(
            server.route("/apis/acme.example.com/v1alpha1/arvancloud/extra"),
            Route::NotFound
        ));
        assert!(matches!(server.route("/"), Route::NotFound));
    }

    #[tokio::test]
    async fn test_run_reports_bind_failure() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let result = server().run(addr).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to bind"));
    }
}
