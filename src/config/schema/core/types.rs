use super::super::{
    GatewayConfig, ObservabilityConfig, PolicyConfig, ReviewBackend, ReviewConfig,
    SigningConfig,
};
use crate::core::rules::{RuleKind, RuleSpec, Severity};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::num::NonZeroU64;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Set when `load_or_init` wrote this file during the current run
    #[serde(skip)]
    pub freshly_created: bool,

    /// Lifetime of issued lock tokens, in seconds (must be > 0)
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    /// Upper bound on a single rule evaluation, in milliseconds
    #[serde(default = "default_rule_timeout_ms")]
    pub rule_timeout_ms: u64,

    /// Refuse a second live token for the same request id
    #[serde(default = "default_true")]
    pub replay_protection: bool,

    #[serde(default)]
    pub signing: SigningConfig,

    #[serde(default)]
    pub review: ReviewConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default = "default_policies")]
    pub policies: Vec<PolicyConfig>,
}

fn default_token_ttl_secs() -> u64 {
    300
}

fn default_rule_timeout_ms() -> u64 {
    2_000
}

fn default_true() -> bool {
    true
}

/// Policy `v1`: existence, goodness, truth and coherence checks.
pub fn default_policies() -> Vec<PolicyConfig> {
    vec![PolicyConfig {
        version: "v1".into(),
        description: Some("baseline existence / goodness / truth / coherence checks".into()),
        token_ttl_secs: None,
        rules: vec![
            RuleSpec::new("existence", RuleKind::NonEmpty, Severity::Fatal),
            RuleSpec::new("goodness", RuleKind::ForbiddenTerms, Severity::Fatal)
                .with_terms(&["evil"]),
            RuleSpec::new("truth", RuleKind::ForbiddenTerms, Severity::Recoverable)
                .with_terms(&["lie", "false", "deceive"]),
            RuleSpec::new("coherence", RuleKind::ForbiddenTerms, Severity::Recoverable)
                .with_terms(&["contradiction"]),
        ],
    }]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            freshly_created: false,
            token_ttl_secs: default_token_ttl_secs(),
            rule_timeout_ms: default_rule_timeout_ms(),
            replay_protection: true,
            signing: SigningConfig::default(),
            review: ReviewConfig::default(),
            gateway: GatewayConfig::default(),
            observability: ObservabilityConfig::default(),
            policies: default_policies(),
        }
    }
}

impl Config {
    /// Global token TTL. Only valid after [`Config::validate`].
    pub fn token_ttl(&self) -> Result<NonZeroU64, ConfigError> {
        NonZeroU64::new(self.token_ttl_secs)
            .ok_or_else(|| ConfigError::Validation("token_ttl_secs must be > 0".into()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_ttl_secs == 0 {
            return Err(ConfigError::Validation("token_ttl_secs must be > 0".into()));
        }
        if self.rule_timeout_ms == 0 {
            return Err(ConfigError::Validation("rule_timeout_ms must be > 0".into()));
        }
        self.observability.validate()?;
        self.validate_review()?;
        self.validate_policies()
    }

    fn validate_review(&self) -> Result<(), ConfigError> {
        let review = &self.review;
        match review.backend {
            ReviewBackend::Jsonl if review.path.as_deref().is_none_or(|p| p.trim().is_empty()) => {
                Err(ConfigError::Validation(
                    "review.backend = \"jsonl\" requires review.path".into(),
                ))
            }
            ReviewBackend::Webhook if review.url.as_deref().is_none_or(|u| u.trim().is_empty()) => {
                Err(ConfigError::Validation(
                    "review.backend = \"webhook\" requires review.url".into(),
                ))
            }
            ReviewBackend::Webhook if review.timeout_ms == 0 => Err(ConfigError::Validation(
                "review.timeout_ms must be > 0".into(),
            )),
            _ => Ok(()),
        }
    }

    fn validate_policies(&self) -> Result<(), ConfigError> {
        let mut versions = HashSet::new();
        for policy in &self.policies {
            let version = policy.version.trim();
            if version.is_empty() {
                return Err(ConfigError::Validation(
                    "policy version cannot be empty".into(),
                ));
            }
            if !versions.insert(version) {
                return Err(ConfigError::Validation(format!(
                    "duplicate policy version: {version}"
                )));
            }
            if policy.token_ttl_secs == Some(0) {
                return Err(ConfigError::Validation(format!(
                    "policy {version}: token_ttl_secs must be > 0"
                )));
            }

            let mut names = HashSet::new();
            for rule in &policy.rules {
                rule.validate()
                    .map_err(|e| ConfigError::Validation(format!("policy {version}: {e}")))?;
                if !names.insert(rule.name.trim()) {
                    return Err(ConfigError::Validation(format!(
                        "policy {version}: duplicate rule name {}",
                        rule.name.trim()
                    )));
                }
            }
        }
        Ok(())
    }
}
