use super::handlers::{handle_health, handle_policies, handle_validate, handle_verify};
use super::server::is_public_bind;
use super::*;
use crate::config::default_policies;
use crate::core::{PolicyRegistry, Request, Validator};
use crate::security::SigningKey;
use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde_json::{Value, json};

fn validator(with_key: bool) -> Validator {
    let registry = PolicyRegistry::from_config(&default_policies()).unwrap();
    let key = with_key.then(|| SigningKey::from_bytes(vec![3u8; 32]).unwrap());
    Validator::builder(registry).signing_key(key).build()
}

fn state() -> AppState {
    AppState::new(validator(true), None)
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn validate(state: &AppState, headers: HeaderMap, request: Request) -> Response {
    handle_validate(State(state.clone()), headers, Ok(Json(request))).await
}

fn verify_body(token: Value) -> VerifyBody {
    serde_json::from_value(json!({ "token": token })).unwrap()
}

#[test]
fn security_body_limit_is_64kb() {
    assert_eq!(MAX_BODY_SIZE, 65_536);
}

#[test]
fn security_timeout_is_30_seconds() {
    assert_eq!(REQUEST_TIMEOUT_SECS, 30);
}

#[test]
fn loopback_hosts_are_not_public() {
    for host in ["127.0.0.1", "localhost", "::1", "[::1]"] {
        assert!(!is_public_bind(host), "{host} should be loopback");
    }
    assert!(is_public_bind("0.0.0.0"));
    assert!(is_public_bind("192.168.1.10"));
}

#[test]
fn blank_api_token_disables_auth() {
    let state = AppState::new(validator(true), Some("   "));
    assert!(state.api_token.is_none());
}

#[test]
fn app_state_is_clone() {
    fn assert_clone<T: Clone>() {}
    assert_clone::<AppState>();
}

#[test]
fn verify_body_accepts_compact_string() {
    let body = verify_body(json!("lg1.abc.def"));
    assert!(matches!(body.token, TokenInput::Compact(ref raw) if raw == "lg1.abc.def"));
}

#[tokio::test]
async fn health_reports_ok() {
    let response = handle_health().await.into_response();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn policies_lists_default_rules() {
    let response = handle_policies(State(state())).await.into_response();
    let body = body_json(response).await;
    assert_eq!(body[0]["version"], "v1");
    assert_eq!(body[0]["ttl_secs"], 300);
    assert_eq!(body[0]["rules"][2], json!({"name": "truth", "severity": "recoverable"}));
}

#[tokio::test]
async fn validate_returns_locked_decision() {
    let state = state();
    let response = validate(
        &state,
        HeaderMap::new(),
        Request::new("g1", json!({"plan": "archive logs"}), "v1"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["decision"], "locked");
    assert_eq!(body["token"]["subject"], "g1");
    assert_eq!(body["token"]["policy_version"], "v1");
}

#[tokio::test]
async fn validate_returns_reject_with_reasons() {
    let state = state();
    let response = validate(&state, HeaderMap::new(), Request::new("g2", json!(null), "v1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["decision"], "reject");
    assert_eq!(body["reasons"].as_array().unwrap().len(), 1);
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn validate_unknown_policy_is_422() {
    let state = state();
    let response = validate(&state, HeaderMap::new(), Request::new("g3", json!("x"), "v7")).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("v7"));
}

#[tokio::test]
async fn validate_blank_id_is_400() {
    let state = state();
    let response = validate(&state, HeaderMap::new(), Request::new("", json!("x"), "v1")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn validate_without_key_is_retryable_503() {
    let state = AppState::new(validator(false), None);
    let response = validate(&state, HeaderMap::new(), Request::new("g4", json!("x"), "v1")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn validate_requires_bearer_when_configured() {
    let state = AppState::new(validator(true), Some("s3cret"));
    let request = Request::new("g5", json!("x"), "v1");

    let response = validate(&state, HeaderMap::new(), request.clone()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mut wrong = HeaderMap::new();
    wrong.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer nope"));
    let response = validate(&state, wrong, request.clone()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mut right = HeaderMap::new();
    right.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
    let response = validate(&state, right, request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn verify_accepts_issued_token_in_both_forms() {
    let state = state();
    let response = validate(&state, HeaderMap::new(), Request::new("g6", json!("x"), "v1")).await;
    let token = body_json(response).await["token"].clone();

    let response = handle_verify(State(state.clone()), Ok(Json(verify_body(token.clone())))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["subject"], "g6");

    let parsed: crate::security::Token = serde_json::from_value(token).unwrap();
    let compact = json!(parsed.to_compact());
    let response = handle_verify(State(state), Ok(Json(verify_body(compact)))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn verify_rejects_tampered_token() {
    let state = state();
    let response = validate(&state, HeaderMap::new(), Request::new("g7", json!("x"), "v1")).await;
    let mut token = body_json(response).await["token"].clone();
    token["subject"] = json!("someone-else");

    let response = handle_verify(State(state), Ok(Json(verify_body(token)))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["valid"], false);
    assert_eq!(body["reason"], "token signature mismatch");
}

#[tokio::test]
async fn verify_rejects_garbage_compact_token() {
    let response = handle_verify(State(state()), Ok(Json(verify_body(json!("not-a-token"))))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn verify_without_key_is_503() {
    let state = AppState::new(validator(false), None);
    let response = handle_verify(State(state), Ok(Json(verify_body(json!("lg1.a.b"))))).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
