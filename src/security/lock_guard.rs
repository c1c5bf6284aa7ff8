//! Guard for operations that may only run under a valid lock token.

use super::token::{Token, TokenVerifier};
use crate::error::GuardError;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct LockGuard {
    verifier: TokenVerifier,
    required_policy: Option<String>,
}

impl LockGuard {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self {
            verifier,
            required_policy: None,
        }
    }

    /// Only accept tokens issued under `policy_version`.
    pub fn with_required_policy(mut self, policy_version: impl Into<String>) -> Self {
        self.required_policy = Some(policy_version.into());
        self
    }

    pub fn require<'a>(&self, token: Option<&'a Token>) -> Result<&'a Token, GuardError> {
        self.require_at(token, Utc::now())
    }

    pub fn require_at<'a>(
        &self,
        token: Option<&'a Token>,
        now: DateTime<Utc>,
    ) -> Result<&'a Token, GuardError> {
        let token = token.ok_or(GuardError::MissingLock)?;
        self.verifier.verify_at(token, now)?;
        if let Some(required) = &self.required_policy
            && *required != token.policy_version
        {
            return Err(GuardError::PolicyMismatch {
                required: required.clone(),
                actual: token.policy_version.clone(),
            });
        }
        tracing::debug!(subject = %token.subject, "lock token accepted");
        Ok(token)
    }

    /// Same as [`Self::require`] for a bearer-style compact token.
    pub fn require_compact(&self, raw: Option<&str>) -> Result<Token, GuardError> {
        let raw = raw
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or(GuardError::MissingLock)?;
        let token = Token::from_compact(raw)?;
        self.require(Some(&token))?;
        Ok(token)
    }
}
