use serde_json::{Value, json};

use lockgate::config::{GatewayConfig, default_policies};
use lockgate::core::{PolicyRegistry, Validator};
use lockgate::security::SigningKey;
use lockgate::transport::gateway::run_gateway_with_listener;

/// Start a gateway on an ephemeral loopback port and return its base URL.
async fn spawn_gateway(api_token: Option<&str>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let registry = PolicyRegistry::from_config(&default_policies()).unwrap();
    let validator = Validator::builder(registry)
        .signing_key(Some(SigningKey::generate()))
        .build();
    let config = GatewayConfig {
        api_token: api_token.map(str::to_string),
        ..GatewayConfig::default()
    };

    tokio::spawn(async move {
        run_gateway_with_listener("127.0.0.1", listener, &config, validator)
            .await
            .unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn health_endpoint_is_public() {
    let base = spawn_gateway(Some("s3cret")).await;
    let response = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn validate_then_verify_round_trip() {
    let base = spawn_gateway(None).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/v1/validate"))
        .json(&json!({
            "request_id": "it-1",
            "payload": {"plan": "rotate credentials"},
            "policy_version": "v1",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let decision: Value = response.json().await.unwrap();
    assert_eq!(decision["decision"], "locked");

    let response = client
        .post(format!("{base}/v1/verify"))
        .json(&json!({ "token": decision["token"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let verdict: Value = response.json().await.unwrap();
    assert_eq!(verdict["valid"], true);
    assert_eq!(verdict["subject"], "it-1");
    assert_eq!(verdict["policy_version"], "v1");
}

#[tokio::test]
async fn quarantine_and_reject_are_normal_responses() {
    let base = spawn_gateway(None).await;
    let client = reqwest::Client::new();

    let quarantined: Value = client
        .post(format!("{base}/v1/validate"))
        .json(&json!({
            "request_id": "it-2",
            "payload": "this is a contradiction",
            "policy_version": "v1",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(quarantined["decision"], "quarantine");
    assert_eq!(quarantined["reasons"].as_array().unwrap().len(), 1);

    let rejected: Value = client
        .post(format!("{base}/v1/validate"))
        .json(&json!({
            "request_id": "it-3",
            "payload": {},
            "policy_version": "v1",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rejected["decision"], "reject");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let base = spawn_gateway(None).await;
    let response = reqwest::Client::new()
        .post(format!("{base}/v1/validate"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn oversized_body_is_refused() {
    let base = spawn_gateway(None).await;
    let payload = "a".repeat(70_000);
    let response = reqwest::Client::new()
        .post(format!("{base}/v1/validate"))
        .json(&json!({
            "request_id": "big",
            "payload": payload,
            "policy_version": "v1",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 413);
}

#[tokio::test]
async fn bearer_token_guards_validate_only() {
    let base = spawn_gateway(Some("s3cret")).await;
    let client = reqwest::Client::new();
    let body = json!({
        "request_id": "it-4",
        "payload": "ok",
        "policy_version": "v1",
    });

    let response = client
        .post(format!("{base}/v1/validate"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = client
        .post(format!("{base}/v1/validate"))
        .bearer_auth("s3cret")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .get(format!("{base}/v1/policies"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let policies: Value = response.json().await.unwrap();
    assert_eq!(policies[0]["version"], "v1");
}
