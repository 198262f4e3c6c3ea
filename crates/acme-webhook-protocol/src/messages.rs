use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API version of the challenge envelope
pub const CHALLENGE_API_VERSION: &str = "acme.cert-manager.io/v1alpha1";

/// Kind of the challenge envelope
pub const CHALLENGE_PAYLOAD_KIND: &str = "ChallengePayload";

/// Version segment of the solver API group
pub const SOLVER_VERSION: &str = "v1alpha1";

/// What the controller wants the solver to do
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChallengeAction {
    /// Create the TXT record
    Present,
    /// Remove the TXT record
    CleanUp,
}

/// A single DNS-01 challenge, owned by the controller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    /// Unique ID of this request, echoed in the response
    #[serde(default)]
    pub uid: String,

    /// Requested action
    pub action: ChallengeAction,

    /// Challenge type (always "dns-01" for this contract)
    #[serde(rename = "type", default)]
    pub challenge_type: String,

    /// Name of the domain under validation
    #[serde(default)]
    pub dns_name: String,

    /// Expected TXT record value
    #[serde(default)]
    pub key: String,

    /// Namespace of the resource that requested the challenge
    #[serde(default)]
    pub resource_namespace: String,

    /// Fully-qualified name the TXT record must exist at
    #[serde(rename = "resolvedFQDN", default)]
    pub resolved_fqdn: String,

    /// Zone the FQDN resolves into
    #[serde(default)]
    pub resolved_zone: String,

    /// Whether ambient credentials may be used
    #[serde(default)]
    pub allow_ambient_credentials: bool,

    /// Opaque solver configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

/// Outcome of a challenge request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    /// UID of the request this answers
    #[serde(default)]
    pub uid: String,

    /// Whether the action succeeded
    pub success: bool,

    /// Failure details, set when `success` is false
    #[serde(rename = "status", default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Status>,
}

impl ChallengeResponse {
    pub fn success(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            success: true,
            result: None,
        }
    }

    pub fn failure(uid: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            success: false,
            result: Some(Status::failure(message)),
        }
    }
}

/// Kubernetes `meta/v1` Status, as embedded in a failed response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default)]
    pub code: u16,
}

impl Status {
    /// A `Failure` status carrying the given message
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            kind: "Status".to_string(),
            api_version: "v1".to_string(),
            metadata: serde_json::Map::new(),
            status: "Failure".to_string(),
            message: message.into(),
            reason: "InternalError".to_string(),
            code: 500,
        }
    }
}

/// Errors decoding a challenge envelope
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("invalid challenge payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("challenge payload has no request")]
    MissingRequest,
}

/// The envelope exchanged with the controller in both directions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChallengePayload {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<ChallengeRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ChallengeResponse>,
}

impl ChallengePayload {
    /// Wrap a request for sending to a solver
    pub fn for_request(request: ChallengeRequest) -> Self {
        Self {
            api_version: CHALLENGE_API_VERSION.to_string(),
            kind: CHALLENGE_PAYLOAD_KIND.to_string(),
            request: Some(request),
            response: None,
        }
    }

    /// Wrap a response, keeping the version and kind the caller sent
    pub fn for_response(api_version: &str, kind: &str, response: ChallengeResponse) -> Self {
        let api_version = if api_version.is_empty() {
            CHALLENGE_API_VERSION
        } else {
            api_version
        };
        let kind = if kind.is_empty() {
            CHALLENGE_PAYLOAD_KIND
        } else {
            kind
        };
        Self {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            request: None,
            response: Some(response),
        }
    }

    /// Decode an envelope that must carry a request
    pub fn decode_request(body: &[u8]) -> Result<Self, PayloadError> {
        let payload: ChallengePayload = serde_json::from_slice(body)?;
        if payload.request.is_none() {
            return Err(PayloadError::MissingRequest);
        }
        Ok(payload)
    }
}
