//! Mock ArvanCloud API for E2E tests
//!
//! This module provides a mock HTTP service that records incoming requests
//! and returns configurable responses per HTTP method. It stands in for the
//! ArvanCloud CDN API when exercising the real client.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::RwLock;
use tokio::net::TcpListener;

/// A recorded HTTP request for test assertions
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    /// HTTP method (GET, POST, etc.)
    pub method: String,
    /// Request path
    pub path: String,
    /// Decoded query parameters
    pub query: Vec<(String, String)>,
    /// Request headers (names lower-cased)
    pub headers: Vec<(String, String)>,
    /// Request body
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// First value of a header
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// First value of a query parameter
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Body parsed as JSON
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("Request body is not JSON")
    }
}

type CannedResponses = Arc<RwLock<HashMap<String, (StatusCode, Vec<u8>)>>>;

/// A mock ArvanCloud API for testing
///
/// Listens on a local port and records all incoming requests. Responses are
/// chosen by HTTP method and default to `200 {"message": "ok"}`.
pub struct MockArvancloudApi {
    addr: SocketAddr,
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
    responses: CannedResponses,
}

fn parse_query(query: Option<&str>) -> Vec<(String, String)> {
    let Some(query) = query else {
        return Vec::new();
    };
    reqwest::Url::parse(&format!("http://localhost/?{}", query))
        .map(|url| {
            url.query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default()
}

impl MockArvancloudApi {
    /// Start the mock API on an ephemeral port
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock API");
        let addr = listener.local_addr().unwrap();

        let requests: Arc<RwLock<Vec<RecordedRequest>>> = Arc::new(RwLock::new(Vec::new()));
        let responses: CannedResponses = Arc::new(RwLock::new(HashMap::new()));

        let requests_clone = requests.clone();
        let responses_clone = responses.clone();

        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };

                let requests = requests_clone.clone();
                let responses = responses_clone.clone();

                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let requests = requests.clone();
                        let responses = responses.clone();
                        async move {
                            let method = req.method().to_string();
                            let path = req.uri().path().to_string();
                            let query = parse_query(req.uri().query());
                            let headers: Vec<(String, String)> = req
                                .headers()
                                .iter()
                                .map(|(k, v)| {
                                    (k.to_string(), v.to_str().unwrap_or("").to_string())
                                })
                                .collect();

                            let body = req
                                .into_body()
                                .collect()
                                .await
                                .map(|b| b.to_bytes().to_vec())
                                .unwrap_or_default();

                            requests.write().push(RecordedRequest {
                                method: method.clone(),
                                path,
                                query,
                                headers,
                                body,
                            });

                            let (status, body) = responses
                                .read()
                                .get(&method)
                                .cloned()
                                .unwrap_or_else(|| {
                                    (StatusCode::OK, br#"{"message":"ok"}"#.to_vec())
                                });

                            Ok::<_, Infallible>(
                                Response::builder()
                                    .status(status)
                                    .header("Content-Type", "application/json")
                                    .body(Full::new(Bytes::from(body)))
                                    .unwrap(),
                            )
                        }
                    });

                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        Self {
            addr,
            requests,
            responses,
        }
    }

    /// Base URL to point the client at (mimics the real `/cdn/4.0` root)
    pub fn base_url(&self) -> String {
        format!("http://{}/cdn/4.0", self.addr)
    }

    /// Set the response for every request with the given method
    pub fn set_response(&self, method: &str, status: StatusCode, body: impl Into<Vec<u8>>) {
        self.responses
            .write()
            .insert(method.to_uppercase(), (status, body.into()));
    }

    /// Set the response for GET requests to a record index listing
    pub fn set_index_response(&self, records: serde_json::Value) {
        let body = serde_json::json!({ "data": records }).to_string();
        self.set_response("GET", StatusCode::OK, body);
    }

    /// Get all recorded requests
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().clone()
    }

    /// Get recorded requests with the given method
    pub fn requests_with_method(&self, method: &str) -> Vec<RecordedRequest> {
        self.requests
            .read()
            .iter()
            .filter(|r| r.method.eq_ignore_ascii_case(method))
            .cloned()
            .collect()
    }

    /// Clear recorded requests
    pub fn clear_requests(&self) {
        self.requests.write().clear();
    }
}
