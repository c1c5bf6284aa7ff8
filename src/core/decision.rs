use crate::security::token::Token;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Aggregate outcome of rule evaluation, before any token is minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Outcome {
    Locked,
    Quarantine,
    Reject,
}

/// Final, immutable answer for a request. Serializes to the wire shape
/// `{"decision": "...", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum Decision {
    Locked { token: Token },
    Quarantine { reasons: Vec<String> },
    Reject { reasons: Vec<String> },
}

impl Decision {
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Locked { .. } => Outcome::Locked,
            Self::Quarantine { .. } => Outcome::Quarantine,
            Self::Reject { .. } => Outcome::Reject,
        }
    }

    pub fn token(&self) -> Option<&Token> {
        match self {
            Self::Locked { token } => Some(token),
            Self::Quarantine { .. } | Self::Reject { .. } => None,
        }
    }

    pub fn reasons(&self) -> &[String] {
        match self {
            Self::Locked { .. } => &[],
            Self::Quarantine { reasons } | Self::Reject { reasons } => reasons,
        }
    }
}

/// Lifecycle of one request: `pending` then exactly one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DecisionState {
    Pending,
    Locked,
    Quarantine,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid decision transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: DecisionState,
    pub to: DecisionState,
}

impl DecisionState {
    pub fn is_terminal(self) -> bool {
        self != Self::Pending
    }

    /// `LOCKED` is the only state a token may be produced from.
    pub fn permits_token(self) -> bool {
        self == Self::Locked
    }

    pub fn advance(self, to: Self) -> Result<Self, InvalidTransition> {
        if self.is_terminal() || !to.is_terminal() {
            return Err(InvalidTransition { from: self, to });
        }
        Ok(to)
    }
}

impl From<Outcome> for DecisionState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Locked => Self::Locked,
            Outcome::Quarantine => Self::Quarantine,
            Outcome::Reject => Self::Reject,
        }
    }
}
