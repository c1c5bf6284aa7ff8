//! Ordered rule evaluation with short-circuit on the first fatal failure.

use super::decision::Outcome;
use super::policy::RuleSet;
use super::request::Request;
use super::rules::{RuleResult, RuleVerdict};
use crate::error::RuleEvaluationTimeout;
use std::time::Duration;

/// Per-rule results in evaluation order plus the aggregate outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub results: Vec<RuleResult>,
    pub outcome: Outcome,
    /// Set only when the rule set was empty and evaluation failed closed.
    pub fail_closed_reason: Option<String>,
}

impl Evaluation {
    /// Reasons of every failed rule, in order.
    pub fn reasons(&self) -> Vec<String> {
        if let Some(reason) = &self.fail_closed_reason {
            return vec![reason.clone()];
        }
        self.results
            .iter()
            .filter(|r| !r.passed)
            .filter_map(|r| r.reason.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RuleEvaluator {
    rule_timeout: Duration,
}

impl RuleEvaluator {
    pub fn new(rule_timeout: Duration) -> Self {
        Self { rule_timeout }
    }

    pub fn rule_timeout(&self) -> Duration {
        self.rule_timeout
    }

    pub async fn evaluate(&self, request: &Request, set: &RuleSet) -> Evaluation {
        if set.is_empty() {
            tracing::warn!(
                request_id = %request.request_id,
                policy_version = set.version(),
                "no rules configured; failing closed"
            );
            return Evaluation {
                results: Vec::new(),
                outcome: Outcome::Reject,
                fail_closed_reason: Some(format!(
                    "no rules configured for policy version {}",
                    set.version()
                )),
            };
        }

        let mut results = Vec::with_capacity(set.rules().len());
        for rule in set.rules() {
            let name = rule.name();
            let severity = rule.severity();

            let result = match tokio::time::timeout(self.rule_timeout, rule.evaluate(request)).await
            {
                Ok(RuleVerdict::Pass) => RuleResult::passed(name, severity),
                Ok(RuleVerdict::Fail { reason }) => RuleResult::failed(name, severity, reason),
                Err(_) => {
                    let timeout = RuleEvaluationTimeout {
                        rule: name.to_string(),
                        after_ms: u64::try_from(self.rule_timeout.as_millis())
                            .unwrap_or(u64::MAX),
                    };
                    tracing::warn!(
                        request_id = %request.request_id,
                        rule = name,
                        "{timeout}"
                    );
                    RuleResult {
                        rule: name.to_string(),
                        severity: super::rules::Severity::Recoverable,
                        passed: false,
                        reason: Some(timeout.to_string()),
                    }
                }
            };

            tracing::debug!(
                request_id = %request.request_id,
                rule = name,
                passed = result.passed,
                "rule evaluated"
            );

            let stop = result.is_fatal_failure();
            results.push(result);
            if stop {
                break;
            }
        }

        let outcome = aggregate(&results);
        Evaluation {
            results,
            outcome,
            fail_closed_reason: None,
        }
    }
}

fn aggregate(results: &[RuleResult]) -> Outcome {
    if results.iter().any(RuleResult::is_fatal_failure) {
        Outcome::Reject
    } else if results.iter().any(RuleResult::is_recoverable_failure) {
        Outcome::Quarantine
    } else {
        Outcome::Locked
    }
}
