use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

/// A quarantined request handed off for human review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewTicket {
    pub ticket_id: Uuid,
    pub request_id: String,
    pub policy_version: String,
    pub reasons: Vec<String>,
    pub payload: serde_json::Value,
    pub submitted_at: DateTime<Utc>,
}

impl ReviewTicket {
    pub fn new(
        request_id: impl Into<String>,
        policy_version: impl Into<String>,
        reasons: Vec<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            ticket_id: Uuid::new_v4(),
            request_id: request_id.into(),
            policy_version: policy_version.into(),
            reasons,
            payload,
            submitted_at: Utc::now(),
        }
    }
}

/// Sink for quarantined requests.
///
/// Submission is best-effort from the validator's point of view: an error is
/// logged and the decision already made stands.
pub trait ReviewQueue: Send + Sync {
    /// Backend name (e.g. "memory", "webhook")
    fn name(&self) -> &str;

    fn submit<'a>(
        &'a self,
        ticket: &'a ReviewTicket,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;
}
