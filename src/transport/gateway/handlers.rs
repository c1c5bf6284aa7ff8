use crate::core::Request;
use crate::error::GateError;
use crate::security::Token;
use axum::{
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use super::{AppState, TokenInput, VerifyBody};

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| raw.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

/// Constant-time equality comparison for secret strings.
fn constant_time_eq(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn gate_error_response(error: &GateError) -> Response {
    match error {
        GateError::InvalidRequest(_) => error_response(StatusCode::BAD_REQUEST, error.to_string()),
        GateError::Configuration(_) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
        }
        GateError::Signing(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": error.to_string(), "retryable": error.is_retryable() })),
        )
            .into_response(),
        GateError::Other(_) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

/// GET /health, always public
pub(super) async fn handle_health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// GET /v1/policies
pub(super) async fn handle_policies(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.validator.policies())
}

/// POST /v1/validate: evaluate a request and return its decision
pub(super) async fn handle_validate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Request>, JsonRejection>,
) -> Response {
    if let Some(expected) = state.api_token.as_deref() {
        match bearer_token(&headers) {
            Some(token) if constant_time_eq(token, expected) => {}
            _ => {
                tracing::warn!("validate request rejected: missing or invalid bearer token");
                return error_response(StatusCode::UNAUTHORIZED, "unauthorized");
            }
        }
    }

    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("invalid request: {}", rejection.body_text()),
            );
        }
    };

    let request_id = request.request_id.clone();
    match state.validator.validate(request).await {
        Ok(validation) => (StatusCode::OK, Json(validation.decision)).into_response(),
        Err(error) => {
            if matches!(error, GateError::Other(_)) {
                tracing::error!(request_id = %request_id, "validation failed: {error:#}");
            } else {
                tracing::warn!(request_id = %request_id, "validation not performed: {error}");
            }
            gate_error_response(&error)
        }
    }
}

fn invalid_token_response(reason: impl Into<String>) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "valid": false, "reason": reason.into() })),
    )
        .into_response()
}

fn valid_token_response(token: &Token) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "valid": true,
            "subject": token.subject,
            "policy_version": token.policy_version,
            "expires_at": token.expires_at,
        })),
    )
        .into_response()
}

/// POST /v1/verify: check a lock token against the process key
pub(super) async fn handle_verify(
    State(state): State<AppState>,
    body: Result<Json<VerifyBody>, JsonRejection>,
) -> Response {
    let Json(VerifyBody { token }) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("invalid request: {}", rejection.body_text()),
            );
        }
    };

    let Some(verifier) = state.validator.verifier() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "valid": false,
                "reason": "signing key unavailable",
                "retryable": true,
            })),
        )
            .into_response();
    };

    let verified = match token {
        TokenInput::Compact(raw) => verifier.verify_compact(&raw),
        TokenInput::Object(token) => verifier.verify(&token).map(|()| token),
    };

    match verified {
        Ok(token) => valid_token_response(&token),
        Err(error) => {
            tracing::debug!("token verification failed: {error}");
            invalid_token_response(error.to_string())
        }
    }
}
