//! Webhook wire contract end-to-end tests

use acme_webhook_protocol::{ChallengeAction, ChallengePayload, CHALLENGE_API_VERSION};
use arvancloud_webhook_e2e::harness::TEST_GROUP_NAME;
use arvancloud_webhook_e2e::{challenge, TestCertificates, TestWebhook};
use hyper::StatusCode;
use serde_json::json;

/// Initialize tracing and crypto provider for tests
fn init_test() {
    // Install rustls crypto provider (ignore if already installed)
    let _ = rustls::crypto::ring::default_provider().install_default();

    let _ = tracing_subscriber::fmt()
        .with_env_filter("arvancloud_webhook=debug,arvancloud_webhook_e2e=debug")
        .with_test_writer()
        .try_init();
}

const FQDN: &str = "_acme-challenge.example.com.";
const ZONE: &str = "example.com.";

#[tokio::test]
async fn test_present_over_http() {
    init_test();
    let webhook = TestWebhook::start().await;

    let request = challenge(
        ChallengeAction::Present,
        FQDN,
        ZONE,
        "token",
        Some(json!({"apiKey": "abc"})),
    );
    let uid = request.uid.clone();
    let (status, payload) = webhook.send(request).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payload.api_version, CHALLENGE_API_VERSION);
    assert_eq!(payload.kind, "ChallengePayload");
    assert!(payload.request.is_none());

    let response = payload.response.expect("Envelope has no response");
    assert_eq!(response.uid, uid);
    assert!(response.success);
    assert!(response.result.is_none());

    assert!(webhook
        .dns_provider
        .has_record("example.com", "_acme-challenge", "token"));
}

#[tokio::test]
async fn test_present_then_clean_up_over_https() {
    init_test();
    let webhook = TestWebhook::start_tls().await;
    let config = Some(json!({"apiKey": "abc"}));

    let present = challenge(ChallengeAction::Present, FQDN, ZONE, "token", config.clone());
    assert!(webhook.solve(present).await.success);
    assert_eq!(webhook.dns_provider.record_count(), 1);

    let clean_up = challenge(ChallengeAction::CleanUp, FQDN, ZONE, "token", config);
    assert!(webhook.solve(clean_up).await.success);
    assert_eq!(webhook.dns_provider.record_count(), 0);
    assert_eq!(webhook.dns_provider.delete_calls().len(), 1);
}

#[tokio::test]
async fn test_failure_is_reported_in_envelope() {
    init_test();
    let webhook = TestWebhook::start().await;

    let request = challenge(ChallengeAction::Present, FQDN, ZONE, "token", Some(json!({})));
    let uid = request.uid.clone();
    let (status, payload) = webhook.send(request).await;

    assert_eq!(status, StatusCode::CREATED);
    let response = payload.response.expect("Envelope has no response");
    assert_eq!(response.uid, uid);
    assert!(!response.success);

    let result = response.result.expect("Failure has no status");
    assert_eq!(result.status, "Failure");
    assert_eq!(result.code, 500);
    assert_eq!(
        result.message,
        "unable to get API key: one of apiKey or apiKeySecretRef should be provided"
    );
    assert!(webhook.dns_provider.create_calls().is_empty());
}

#[tokio::test]
async fn test_missing_config_is_reported() {
    init_test();
    let webhook = TestWebhook::start().await;

    let response = webhook
        .solve(challenge(ChallengeAction::CleanUp, FQDN, ZONE, "token", None))
        .await;

    assert!(!response.success);
    let message = response.result.expect("Failure has no status").message;
    assert!(message.starts_with("unable to load config:"), "{}", message);
    assert_eq!(webhook.dns_provider.search_count(), 0);
}

#[tokio::test]
async fn test_secret_ref_is_resolved_in_request_namespace() {
    init_test();
    let webhook = TestWebhook::start().await;
    webhook
        .secrets
        .insert("default", "arvancloud-credentials", "apiKey", "from-secret");

    let response = webhook
        .solve(challenge(
            ChallengeAction::Present,
            FQDN,
            ZONE,
            "token",
            Some(json!({"apiKeySecretRef": {"name": "arvancloud-credentials", "key": "apiKey"}})),
        ))
        .await;

    assert!(response.success);
    assert_eq!(webhook.clients.api_keys(), vec!["from-secret".to_string()]);
}

#[tokio::test]
async fn test_clean_up_of_missing_record_succeeds() {
    init_test();
    let webhook = TestWebhook::start().await;

    let response = webhook
        .solve(challenge(
            ChallengeAction::CleanUp,
            FQDN,
            ZONE,
            "token",
            Some(json!({"apiKey": "abc"})),
        ))
        .await;

    assert!(response.success);
    assert_eq!(webhook.dns_provider.search_count(), 1);
    assert!(webhook.dns_provider.delete_calls().is_empty());
}

#[tokio::test]
async fn test_concurrent_challenges() {
    init_test();
    let webhook = TestWebhook::start().await;
    let config = Some(json!({"apiKey": "abc"}));

    let present = |fqdn: &str| {
        webhook.solve(challenge(
            ChallengeAction::Present,
            fqdn,
            ZONE,
            "token",
            config.clone(),
        ))
    };
    let (a, b, c) = tokio::join!(
        present("_acme-challenge.a.example.com."),
        present("_acme-challenge.b.example.com."),
        present("_acme-challenge.c.example.com."),
    );

    assert!(a.success && b.success && c.success);
    assert_eq!(webhook.dns_provider.record_count(), 3);
    assert!(webhook
        .dns_provider
        .has_record("example.com", "_acme-challenge.b", "token"));
}

#[tokio::test]
async fn test_discovery() {
    init_test();
    let webhook = TestWebhook::start().await;

    let resp = webhook
        .http_client()
        .get(format!(
            "{}/apis/{}/v1alpha1",
            webhook.base_url(),
            TEST_GROUP_NAME
        ))
        .send()
        .await
        .expect("Discovery request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let list: serde_json::Value = resp.json().await.expect("Invalid discovery body");
    assert_eq!(list["kind"], "APIResourceList");
    assert_eq!(
        list["groupVersion"],
        format!("{}/v1alpha1", TEST_GROUP_NAME)
    );
    assert_eq!(list["resources"][0]["name"], "arvancloud");
    assert_eq!(list["resources"][0]["kind"], "ChallengePayload");
    assert_eq!(list["resources"][0]["verbs"], json!(["create"]));
}

#[tokio::test]
async fn test_health_endpoints() {
    init_test();
    let webhook = TestWebhook::start_tls().await;

    for path in ["/healthz", "/livez", "/readyz"] {
        let resp = webhook
            .http_client()
            .get(format!("{}{}", webhook.base_url(), path))
            .send()
            .await
            .expect("Health request failed");
        assert_eq!(resp.status(), StatusCode::OK, "path {}", path);
    }
}

#[tokio::test]
async fn test_client_without_certificate_is_rejected() {
    init_test();
    let webhook = TestWebhook::start_tls().await;
    webhook
        .secrets
        .insert("victim-ns", "arvan-creds", "apiKey", "victim-key");

    let mut request = challenge(
        ChallengeAction::Present,
        FQDN,
        ZONE,
        "attacker-token",
        Some(json!({"apiKeySecretRef": {"name": "arvan-creds", "key": "apiKey"}})),
    );
    request.resource_namespace = "victim-ns".to_string();

    let resp = webhook
        .anonymous_client()
        .post(webhook.challenge_url())
        .json(&ChallengePayload::for_request(request))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(webhook.dns_provider.create_calls().is_empty());
    assert!(webhook.clients.api_keys().is_empty());
}

#[tokio::test]
async fn test_anonymous_client_reaches_only_health() {
    init_test();
    let webhook = TestWebhook::start_tls().await;
    let client = webhook.anonymous_client();

    let resp = client
        .get(format!(
            "{}/apis/{}/v1alpha1",
            webhook.base_url(),
            TEST_GROUP_NAME
        ))
        .send()
        .await
        .expect("Discovery request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .get(format!("{}/healthz", webhook.base_url()))
        .send()
        .await
        .expect("Health request failed");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_client_certificate_from_other_ca_is_refused() {
    init_test();
    let webhook = TestWebhook::start_tls().await;
    let foreign = TestCertificates::generate();

    let request = challenge(
        ChallengeAction::Present,
        FQDN,
        ZONE,
        "token",
        Some(json!({"apiKey": "abc"})),
    );
    let result = webhook
        .client_with_identity(&foreign)
        .post(webhook.challenge_url())
        .json(&ChallengePayload::for_request(request))
        .send()
        .await;

    assert!(result.is_err(), "handshake should fail: {:?}", result);
    assert!(webhook.dns_provider.create_calls().is_empty());
}

#[tokio::test]
async fn test_unknown_solver_is_not_found() {
    init_test();
    let webhook = TestWebhook::start().await;

    let request = challenge(
        ChallengeAction::Present,
        FQDN,
        ZONE,
        "token",
        Some(json!({"apiKey": "abc"})),
    );
    let resp = webhook
        .http_client()
        .post(format!(
            "{}/apis/{}/v1alpha1/cloudflare",
            webhook.base_url(),
            TEST_GROUP_NAME
        ))
        .json(&ChallengePayload::for_request(request))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(webhook.dns_provider.create_calls().is_empty());
}

#[tokio::test]
async fn test_other_group_is_not_found() {
    init_test();
    let webhook = TestWebhook::start().await;

    let resp = webhook
        .http_client()
        .get(format!("{}/apis/acme.other.example.com/v1alpha1", webhook.base_url()))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_payload_is_bad_request() {
    init_test();
    let webhook = TestWebhook::start().await;

    let resp = webhook
        .http_client()
        .post(webhook.challenge_url())
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = webhook
        .http_client()
        .post(webhook.challenge_url())
        .json(&json!({"apiVersion": CHALLENGE_API_VERSION, "kind": "ChallengePayload"}))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_method_is_rejected() {
    init_test();
    let webhook = TestWebhook::start().await;

    let resp = webhook
        .http_client()
        .get(webhook.challenge_url())
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}
