use super::{
    ForbiddenTermsRule, MaxPayloadBytesRule, NonEmptyPayloadRule, RequiredFieldsRule,
    RequiredTermsRule, Rule, RuleFuture, RuleVerdict, Severity,
};
use crate::core::request::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Declarative rule kinds available from config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RuleKind {
    NonEmpty,
    ForbiddenTerms,
    RequiredTerms,
    RequiredFields,
    MaxPayloadBytes,
}

/// One `[[policies.rules]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub kind: RuleKind,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    /// Used by `forbidden_terms` / `required_terms`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub terms: Vec<String>,
    /// Used by `required_fields`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    /// Used by `max_payload_bytes`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Replaces the default failure reason for this rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn default_severity() -> Severity {
    Severity::Fatal
}

impl RuleSpec {
    pub fn new(name: impl Into<String>, kind: RuleKind, severity: Severity) -> Self {
        Self {
            name: name.into(),
            kind,
            severity,
            terms: Vec::new(),
            fields: Vec::new(),
            limit: None,
            reason: None,
        }
    }

    pub fn with_terms(mut self, terms: &[&str]) -> Self {
        self.terms = terms.iter().map(|t| (*t).to_string()).collect();
        self
    }

    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Check kind-specific parameters. Returns a human-readable problem.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("rule name cannot be empty".into());
        }
        let name = &self.name;
        match self.kind {
            RuleKind::NonEmpty => Ok(()),
            RuleKind::ForbiddenTerms | RuleKind::RequiredTerms => {
                if self.terms.iter().all(|t| t.trim().is_empty()) {
                    Err(format!("rule {name} ({}) needs at least one term", self.kind))
                } else {
                    Ok(())
                }
            }
            RuleKind::RequiredFields => {
                if self.fields.iter().all(|f| f.trim().is_empty()) {
                    Err(format!("rule {name} (required_fields) needs at least one field"))
                } else {
                    Ok(())
                }
            }
            RuleKind::MaxPayloadBytes => match self.limit {
                Some(limit) if limit > 0 => Ok(()),
                _ => Err(format!(
                    "rule {name} (max_payload_bytes) needs a positive limit"
                )),
            },
        }
    }
}

/// Instantiate a rule from its spec. Callers validate first.
pub fn build_rule(spec: &RuleSpec) -> Arc<dyn Rule> {
    let rule = build_kind(spec);
    match spec.reason.as_deref().map(str::trim) {
        Some(reason) if !reason.is_empty() => Arc::new(WithReason {
            inner: rule,
            reason: reason.to_string(),
        }),
        _ => rule,
    }
}

fn build_kind(spec: &RuleSpec) -> Arc<dyn Rule> {
    let name = spec.name.trim();
    match spec.kind {
        RuleKind::NonEmpty => Arc::new(NonEmptyPayloadRule::new(name, spec.severity)),
        RuleKind::ForbiddenTerms => {
            Arc::new(ForbiddenTermsRule::new(name, spec.severity, &spec.terms))
        }
        RuleKind::RequiredTerms => {
            Arc::new(RequiredTermsRule::new(name, spec.severity, &spec.terms))
        }
        RuleKind::RequiredFields => {
            Arc::new(RequiredFieldsRule::new(name, spec.severity, &spec.fields))
        }
        RuleKind::MaxPayloadBytes => Arc::new(MaxPayloadBytesRule::new(
            name,
            spec.severity,
            spec.limit.unwrap_or(0),
        )),
    }
}

/// Reports a configured reason whenever the wrapped rule fails.
struct WithReason {
    inner: Arc<dyn Rule>,
    reason: String,
}

impl Rule for WithReason {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn severity(&self) -> Severity {
        self.inner.severity()
    }

    fn evaluate<'a>(&'a self, request: &'a Request) -> RuleFuture<'a> {
        Box::pin(async move {
            match self.inner.evaluate(request).await {
                RuleVerdict::Pass => RuleVerdict::Pass,
                RuleVerdict::Fail { .. } => RuleVerdict::fail(self.reason.clone()),
            }
        })
    }
}
