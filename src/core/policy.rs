//! Policy-version → rule-set table, built once at startup and immutable after.

use super::rules::{Rule, Severity, build_rule};
use crate::config::PolicyConfig;
use crate::error::ConfigError;
use serde::Serialize;
use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;

/// Ordered rules for one policy version.
pub struct RuleSet {
    version: String,
    ttl_override: Option<NonZeroU64>,
    rules: Vec<Arc<dyn Rule>>,
}

impl RuleSet {
    pub fn new(version: impl Into<String>, rules: Vec<Arc<dyn Rule>>) -> Self {
        Self {
            version: version.into(),
            ttl_override: None,
            rules,
        }
    }

    pub fn with_ttl(mut self, ttl_secs: NonZeroU64) -> Self {
        self.ttl_override = Some(ttl_secs);
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Policy-specific TTL, falling back to `default`.
    pub fn ttl_or(&self, default: NonZeroU64) -> NonZeroU64 {
        self.ttl_override.unwrap_or(default)
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.rules.iter().map(|r| r.name()).collect();
        f.debug_struct("RuleSet")
            .field("version", &self.version)
            .field("ttl_override", &self.ttl_override)
            .field("rules", &names)
            .finish()
    }
}

/// Listing entry for `lockgate policies` and `GET /v1/policies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicySummary {
    pub version: String,
    pub ttl_secs: u64,
    pub rules: Vec<RuleSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSummary {
    pub name: String,
    pub severity: Severity,
}

#[derive(Debug, Default)]
pub struct PolicyRegistry {
    sets: HashMap<String, Arc<RuleSet>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from validated config sections.
    pub fn from_config(policies: &[PolicyConfig]) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for policy in policies {
            for spec in &policy.rules {
                spec.validate().map_err(|e| {
                    ConfigError::Validation(format!("policy {}: {e}", policy.version))
                })?;
            }
            let rules = policy.rules.iter().map(build_rule).collect();
            let mut set = RuleSet::new(policy.version.trim(), rules);
            if let Some(ttl) = policy.token_ttl_secs {
                let ttl = NonZeroU64::new(ttl).ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "policy {}: token_ttl_secs must be > 0",
                        policy.version
                    ))
                })?;
                set = set.with_ttl(ttl);
            }
            registry.insert(set)?;
        }
        Ok(registry)
    }

    pub fn insert(&mut self, set: RuleSet) -> Result<(), ConfigError> {
        if set.version.trim().is_empty() {
            return Err(ConfigError::Validation(
                "policy version cannot be empty".into(),
            ));
        }
        if self.sets.contains_key(&set.version) {
            return Err(ConfigError::Validation(format!(
                "duplicate policy version: {}",
                set.version
            )));
        }
        self.sets.insert(set.version.clone(), Arc::new(set));
        Ok(())
    }

    pub fn resolve(&self, version: &str) -> Result<Arc<RuleSet>, ConfigError> {
        self.sets
            .get(version)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownPolicy(version.to_string()))
    }

    pub fn versions(&self) -> Vec<&str> {
        let mut versions: Vec<&str> = self.sets.keys().map(String::as_str).collect();
        versions.sort_unstable();
        versions
    }

    pub fn summaries(&self, default_ttl: NonZeroU64) -> Vec<PolicySummary> {
        self.versions()
            .into_iter()
            .filter_map(|v| self.sets.get(v))
            .map(|set| PolicySummary {
                version: set.version.clone(),
                ttl_secs: set.ttl_or(default_ttl).get(),
                rules: set
                    .rules
                    .iter()
                    .map(|r| RuleSummary {
                        name: r.name().to_string(),
                        severity: r.severity(),
                    })
                    .collect(),
            })
            .collect()
    }
}
