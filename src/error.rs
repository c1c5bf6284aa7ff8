use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Infrastructure faults raised while handling a validation request.
///
/// Business outcomes (`locked`, `quarantine`, `reject`) are never errors; they
/// are returned as [`crate::core::Decision`] values. Anything surfaced through
/// this type means the request could not be evaluated (or its token could not
/// be minted), so callers can tell "rejected" apart from "not evaluated".
#[derive(Debug, Error)]
pub enum GateError {
    // ── Config / policy selection ───────────────────────────────────────
    #[error("configuration: {0}")]
    Configuration(#[from] ConfigError),

    // ── Token signing ───────────────────────────────────────────────────
    #[error("signing: {0}")]
    Signing(#[from] SigningError),

    // ── Malformed input ─────────────────────────────────────────────────
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GateError {
    /// Signing faults are transient; everything else will fail again unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Signing(_))
    }
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unknown policy version: {0}")]
    UnknownPolicy(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Signing errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("signing key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    #[error("signing operation failed: {0}")]
    Sign(String),
}

// ─── Token verification errors ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token expired at {expires_at}")]
    Expired { expires_at: String },

    #[error("token signature mismatch")]
    BadSignature,

    #[error("malformed token: {0}")]
    Malformed(String),
}

// ─── Lock guard errors ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("operation requires a lock token")]
    MissingLock,

    #[error("lock token rejected: {0}")]
    InvalidLock(#[from] TokenError),

    #[error("lock token issued under policy {actual}, operation requires {required}")]
    PolicyMismatch { required: String, actual: String },
}

// ─── Rule timeouts ───────────────────────────────────────────────────────────

/// A rule exceeded its evaluation bound. Folded into a recoverable rule
/// failure by the evaluator; never returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{rule} check timed out after {after_ms}ms")]
pub struct RuleEvaluationTimeout {
    pub rule: String,
    pub after_ms: u64,
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, GateError>;
