use crate::error::GateError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A proposition or plan submitted for validation.
///
/// Consumed exactly once by [`crate::core::Validator::validate`]; the
/// validator keeps nothing of it after returning a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub request_id: String,
    #[serde(default)]
    pub payload: Value,
    pub policy_version: String,
}

impl Request {
    pub fn new(
        request_id: impl Into<String>,
        payload: Value,
        policy_version: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            payload,
            policy_version: policy_version.into(),
        }
    }

    /// Reject requests that cannot be evaluated at all.
    pub fn ensure_well_formed(&self) -> Result<(), GateError> {
        if self.request_id.trim().is_empty() {
            return Err(GateError::InvalidRequest(
                "request_id cannot be empty".into(),
            ));
        }
        if self.policy_version.trim().is_empty() {
            return Err(GateError::InvalidRequest(
                "policy_version cannot be empty".into(),
            ));
        }
        Ok(())
    }

    /// Every string value and object key in the payload, depth-first,
    /// lowercased and joined by newlines. Rules match terms against this.
    pub fn payload_text(&self) -> String {
        let mut parts = Vec::new();
        collect_text(&self.payload, &mut parts);
        parts.join("\n").to_lowercase()
    }
}

fn collect_text<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => {
            for item in items {
                collect_text(item, out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                out.push(key);
                collect_text(item, out);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
