//! Request → decision pipeline: resolve policy, evaluate rules, mint token.

use super::decision::{Decision, DecisionState, Outcome};
use super::evaluator::RuleEvaluator;
use super::policy::{PolicyRegistry, PolicySummary, RuleSet};
use super::request::Request;
use super::rules::RuleResult;
use crate::config::Config;
use crate::error::{ConfigError, GateError};
use crate::review::{NoopReviewQueue, ReviewQueue, ReviewTicket, create_review_queue};
use crate::security::{IssuedTokenIndex, SigningKey, TokenIssuer, TokenVerifier};
use chrono::Utc;
use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::Duration;

pub const REPLAY_REASON: &str = "request id already holds a live lock token";

const DEFAULT_TTL_SECS: NonZeroU64 = match NonZeroU64::new(300) {
    Some(ttl) => ttl,
    None => panic!("default ttl must be non-zero"),
};
const DEFAULT_RULE_TIMEOUT: Duration = Duration::from_millis(2_000);

/// Final decision plus the per-rule results that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub decision: Decision,
    pub results: Vec<RuleResult>,
}

/// Shared, cheaply cloneable validator. All state is read-only except the
/// replay index.
#[derive(Clone)]
pub struct Validator {
    inner: Arc<ValidatorInner>,
}

struct ValidatorInner {
    registry: PolicyRegistry,
    evaluator: RuleEvaluator,
    issuer: TokenIssuer,
    default_ttl: NonZeroU64,
    replay: Option<IssuedTokenIndex>,
    review: Arc<dyn ReviewQueue>,
}

impl Validator {
    pub fn builder(registry: PolicyRegistry) -> ValidatorBuilder {
        ValidatorBuilder::new(registry)
    }

    /// Assemble from a validated [`Config`]. A missing key is not an error
    /// here; issuance fails later with a retryable signing error.
    pub fn from_config(config: &Config, key: Option<SigningKey>) -> Result<Self, ConfigError> {
        let registry = PolicyRegistry::from_config(&config.policies)?;
        let review = create_review_queue(&config.review)?;
        Ok(Self::builder(registry)
            .signing_key(key)
            .default_ttl(config.token_ttl()?)
            .rule_timeout(Duration::from_millis(config.rule_timeout_ms))
            .replay_protection(config.replay_protection)
            .review_queue(review)
            .build())
    }

    pub fn verifier(&self) -> Option<TokenVerifier> {
        self.inner.issuer.verifier()
    }

    pub fn has_signing_key(&self) -> bool {
        self.inner.issuer.has_key()
    }

    pub fn policies(&self) -> Vec<PolicySummary> {
        self.inner.registry.summaries(self.inner.default_ttl)
    }

    pub fn review_backend(&self) -> &str {
        self.inner.review.name()
    }

    pub async fn validate(&self, request: Request) -> Result<Validation, GateError> {
        request.ensure_well_formed()?;
        let set = self
            .inner
            .registry
            .resolve(request.policy_version.trim())?;

        tracing::debug!(
            request_id = %request.request_id,
            policy_version = set.version(),
            state = %DecisionState::Pending,
            "request received"
        );

        if let Some(replay) = &self.inner.replay
            && replay.holds_live_token(&request.request_id, Utc::now())
        {
            let decision = Decision::Reject {
                reasons: vec![REPLAY_REASON.to_string()],
            };
            return self.finish(&request, &set, decision, Vec::new());
        }

        let evaluation = self.inner.evaluator.evaluate(&request, &set).await;
        let reasons = evaluation.reasons();

        let decision = match evaluation.outcome {
            Outcome::Locked => self.lock(&request, &set)?,
            Outcome::Quarantine => {
                self.submit_for_review(&request, &set, &reasons).await;
                Decision::Quarantine { reasons }
            }
            Outcome::Reject => Decision::Reject { reasons },
        };

        self.finish(&request, &set, decision, evaluation.results)
    }

    fn lock(&self, request: &Request, set: &RuleSet) -> Result<Decision, GateError> {
        let ttl = set.ttl_or(self.inner.default_ttl);
        let token = self
            .inner
            .issuer
            .issue(&request.request_id, set.version(), ttl)?;

        if let Some(replay) = &self.inner.replay
            && !replay.try_record(&request.request_id, token.expires_at, Utc::now())
        {
            tracing::warn!(
                request_id = %request.request_id,
                "concurrent validation already holds a lock token; discarding"
            );
            return Ok(Decision::Reject {
                reasons: vec![REPLAY_REASON.to_string()],
            });
        }

        Ok(Decision::Locked { token })
    }

    async fn submit_for_review(&self, request: &Request, set: &RuleSet, reasons: &[String]) {
        let ticket = ReviewTicket::new(
            request.request_id.clone(),
            set.version(),
            reasons.to_vec(),
            request.payload.clone(),
        );
        if let Err(e) = self.inner.review.submit(&ticket).await {
            tracing::warn!(
                request_id = %request.request_id,
                backend = self.inner.review.name(),
                "review submission failed: {e:#}"
            );
        } else {
            tracing::debug!(
                request_id = %request.request_id,
                ticket_id = %ticket.ticket_id,
                backend = self.inner.review.name(),
                "quarantined request submitted for review"
            );
        }
    }

    fn finish(
        &self,
        request: &Request,
        set: &RuleSet,
        decision: Decision,
        results: Vec<RuleResult>,
    ) -> Result<Validation, GateError> {
        let state = DecisionState::Pending
            .advance(decision.outcome().into())
            .map_err(|e| GateError::Other(e.into()))?;

        tracing::debug!(
            request_id = %request.request_id,
            from = %DecisionState::Pending,
            to = %state,
            "decision state transition"
        );
        tracing::info!(
            request_id = %request.request_id,
            policy_version = set.version(),
            decision = %decision.outcome(),
            failed_rules = decision.reasons().len(),
            "request decided"
        );

        Ok(Validation { decision, results })
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("policies", &self.inner.registry.versions())
            .field("default_ttl", &self.inner.default_ttl)
            .field("has_signing_key", &self.inner.issuer.has_key())
            .field("replay_protection", &self.inner.replay.is_some())
            .field("review", &self.inner.review.name())
            .finish_non_exhaustive()
    }
}

pub struct ValidatorBuilder {
    registry: PolicyRegistry,
    key: Option<Arc<SigningKey>>,
    default_ttl: NonZeroU64,
    rule_timeout: Duration,
    replay_protection: bool,
    review: Arc<dyn ReviewQueue>,
}

impl ValidatorBuilder {
    pub fn new(registry: PolicyRegistry) -> Self {
        Self {
            registry,
            key: None,
            default_ttl: DEFAULT_TTL_SECS,
            rule_timeout: DEFAULT_RULE_TIMEOUT,
            replay_protection: true,
            review: Arc::new(NoopReviewQueue),
        }
    }

    pub fn signing_key(mut self, key: Option<SigningKey>) -> Self {
        self.key = key.map(Arc::new);
        self
    }

    pub fn default_ttl(mut self, ttl: NonZeroU64) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn rule_timeout(mut self, timeout: Duration) -> Self {
        self.rule_timeout = timeout;
        self
    }

    pub fn replay_protection(mut self, enabled: bool) -> Self {
        self.replay_protection = enabled;
        self
    }

    pub fn review_queue(mut self, queue: Arc<dyn ReviewQueue>) -> Self {
        self.review = queue;
        self
    }

    pub fn build(self) -> Validator {
        Validator {
            inner: Arc::new(ValidatorInner {
                registry: self.registry,
                evaluator: RuleEvaluator::new(self.rule_timeout),
                issuer: TokenIssuer::new(self.key),
                default_ttl: self.default_ttl,
                replay: self.replay_protection.then(IssuedTokenIndex::new),
                review: self.review,
            }),
        }
    }
}
