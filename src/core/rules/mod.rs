//! Rules: named, pure predicates over a [`Request`].
//!
//! A rule never mutates shared state. It may await a bounded external lookup;
//! the evaluator owns the timeout, so rules do not need to enforce one.

mod builtin;
mod catalogue;

pub use builtin::{
    FnRule, ForbiddenTermsRule, MaxPayloadBytesRule, NonEmptyPayloadRule, RequiredFieldsRule,
    RequiredTermsRule,
};
pub use catalogue::{RuleKind, RuleSpec, build_rule};

use super::request::Request;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// How a failing rule affects the aggregate decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    /// Failure maps to `reject`; evaluation stops.
    Fatal,
    /// Failure maps to `quarantine`; evaluation continues.
    Recoverable,
}

/// What a single rule reports about a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleVerdict {
    Pass,
    Fail { reason: Option<String> },
}

impl RuleVerdict {
    pub fn fail(reason: impl Into<String>) -> Self {
        Self::Fail {
            reason: Some(reason.into()),
        }
    }

    pub fn fail_silent() -> Self {
        Self::Fail { reason: None }
    }

    pub fn from_bool(passed: bool) -> Self {
        if passed {
            Self::Pass
        } else {
            Self::fail_silent()
        }
    }
}

pub type RuleFuture<'a> = Pin<Box<dyn Future<Output = RuleVerdict> + Send + 'a>>;

pub trait Rule: Send + Sync {
    fn name(&self) -> &str;

    fn severity(&self) -> Severity;

    fn evaluate<'a>(&'a self, request: &'a Request) -> RuleFuture<'a>;
}

/// Recorded outcome of one rule, in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleResult {
    pub rule: String,
    pub severity: Severity,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RuleResult {
    pub fn passed(rule: &str, severity: Severity) -> Self {
        Self {
            rule: rule.to_string(),
            severity,
            passed: true,
            reason: None,
        }
    }

    /// Failed result; falls back to the default wording when the rule gave no
    /// reason of its own.
    pub fn failed(rule: &str, severity: Severity, reason: Option<String>) -> Self {
        let reason = reason.unwrap_or_else(|| default_reason(rule, severity));
        Self {
            rule: rule.to_string(),
            severity,
            passed: false,
            reason: Some(reason),
        }
    }

    pub fn is_fatal_failure(&self) -> bool {
        !self.passed && self.severity == Severity::Fatal
    }

    pub fn is_recoverable_failure(&self) -> bool {
        !self.passed && self.severity == Severity::Recoverable
    }
}

pub fn default_reason(rule: &str, severity: Severity) -> String {
    match severity {
        Severity::Fatal => format!("{rule} check failed"),
        Severity::Recoverable => format!("{rule} check inconclusive"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reasons_follow_severity() {
        assert_eq!(
            default_reason("existence", Severity::Fatal),
            "existence check failed"
        );
        assert_eq!(
            default_reason("truth", Severity::Recoverable),
            "truth check inconclusive"
        );
    }

    #[test]
    fn failed_result_keeps_rule_reason() {
        let result = RuleResult::failed(
            "goodness",
            Severity::Fatal,
            Some("payload mentions evil".into()),
        );
        assert_eq!(result.reason.as_deref(), Some("payload mentions evil"));
        assert!(result.is_fatal_failure());
        assert!(!result.is_recoverable_failure());
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Severity::Recoverable).unwrap(),
            "\"recoverable\""
        );
        assert_eq!(Severity::Fatal.to_string(), "fatal");
    }
}
