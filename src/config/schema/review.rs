use serde::{Deserialize, Serialize};

/// Where quarantined requests are sent for human review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReviewBackend {
    #[default]
    None,
    Memory,
    Jsonl,
    Webhook,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default)]
    pub backend: ReviewBackend,
    /// Journal file for the `jsonl` backend; `~` is expanded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Endpoint for the `webhook` backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Request timeout for the `webhook` backend
    #[serde(default = "default_review_timeout_ms")]
    pub timeout_ms: u64,
    /// Tickets kept by the `memory` backend before the oldest are dropped
    #[serde(default = "default_review_max_tickets")]
    pub max_tickets: usize,
}

fn default_review_timeout_ms() -> u64 {
    5_000
}

fn default_review_max_tickets() -> usize {
    1_000
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            backend: ReviewBackend::None,
            path: None,
            url: None,
            timeout_ms: default_review_timeout_ms(),
            max_tickets: default_review_max_tickets(),
        }
    }
}
