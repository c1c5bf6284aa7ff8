//! Axum-based HTTP gateway for the validator.
//!
//! - Request body size limits (64KB max)
//! - Request timeouts (30s) to prevent slow-loris attacks
//! - Optional bearer token on the issuing endpoint

mod handlers;
mod server;

pub use server::{build_app, run_gateway, run_gateway_with_listener};

use crate::core::Validator;
use crate::security::Token;
use serde::Deserialize;
use std::sync::Arc;

/// Maximum request body size (64KB) -- prevents memory exhaustion
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s) -- prevents slow-loris attacks
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub validator: Validator,
    /// Bearer token guarding `POST /v1/validate`
    pub api_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(validator: Validator, api_token: Option<&str>) -> Self {
        Self {
            validator,
            api_token: api_token
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(Arc::from),
        }
    }
}

/// `POST /v1/verify` request body
#[derive(Debug, Deserialize)]
pub struct VerifyBody {
    pub token: TokenInput,
}

/// A token as its JSON object or its `lg1.` compact string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TokenInput {
    Compact(String),
    Object(Token),
}

#[cfg(test)]
mod tests;
