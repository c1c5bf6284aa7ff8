use crate::core::rules::RuleSpec;
use serde::{Deserialize, Serialize};

/// One `[[policies]]` table: a version tag and its ordered rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Overrides the global `token_ttl_secs` for tokens issued under this policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_ttl_secs: Option<u64>,
    /// Evaluated in declaration order
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}
