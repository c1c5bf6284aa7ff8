//! Lock tokens: signed, time-limited credentials minted for `locked` requests.
//!
//! The signature is HMAC-SHA256 over a domain-separated, length-prefixed
//! encoding of every claim, so no field can be altered or reinterpreted
//! without invalidating it. Timestamps carry whole seconds only.

use super::signing::SigningKey;
use crate::error::{SigningError, TokenError};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;
use std::sync::Arc;

const SIGNING_DOMAIN: &[u8] = b"LOCKGATE_TOKEN_V1:";
const COMPACT_PREFIX: &str = "lg1";
/// Issuance times further ahead of the local clock than this are logged as
/// clock drift. They do not affect validity.
pub const MAX_CLOCK_SKEW_SECS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Request identifier the token was issued for.
    pub subject: String,
    pub policy_version: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(with = "signature_hex")]
    pub signature: Vec<u8>,
}

mod signature_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        hex::decode(raw).map_err(serde::de::Error::custom)
    }
}

/// Claims as carried inside the compact form.
#[derive(Serialize, Deserialize)]
struct CompactClaims {
    sub: String,
    pv: String,
    iat: i64,
    exp: i64,
}

impl Token {
    fn signing_input(
        subject: &str,
        policy_version: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Vec<u8> {
        let mut out = Vec::with_capacity(SIGNING_DOMAIN.len() + subject.len() + 64);
        out.extend_from_slice(SIGNING_DOMAIN);
        push_len_prefixed(&mut out, subject.as_bytes());
        push_len_prefixed(&mut out, policy_version.as_bytes());
        out.extend_from_slice(&issued_at.timestamp().to_be_bytes());
        out.extend_from_slice(&expires_at.timestamp().to_be_bytes());
        out
    }

    fn canonical_bytes(&self) -> Vec<u8> {
        Self::signing_input(
            &self.subject,
            &self.policy_version,
            self.issued_at,
            self.expires_at,
        )
    }

    pub fn ttl_secs(&self) -> i64 {
        (self.expires_at - self.issued_at).num_seconds()
    }

    /// `lg1.<claims>.<signature>`, both parts base64url without padding.
    pub fn to_compact(&self) -> String {
        let claims = CompactClaims {
            sub: self.subject.clone(),
            pv: self.policy_version.clone(),
            iat: self.issued_at.timestamp(),
            exp: self.expires_at.timestamp(),
        };
        let claims_json = serde_json::to_vec(&claims).unwrap_or_default();
        format!(
            "{COMPACT_PREFIX}.{}.{}",
            URL_SAFE_NO_PAD.encode(claims_json),
            URL_SAFE_NO_PAD.encode(&self.signature)
        )
    }

    pub fn from_compact(raw: &str) -> Result<Self, TokenError> {
        let mut parts = raw.trim().split('.');
        let (Some(prefix), Some(claims), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed("expected three dot-separated parts".into()));
        };
        if prefix != COMPACT_PREFIX {
            return Err(TokenError::Malformed(format!("unknown token prefix: {prefix}")));
        }

        let claims_json = URL_SAFE_NO_PAD
            .decode(claims)
            .map_err(|_| TokenError::Malformed("claims are not base64url".into()))?;
        let claims: CompactClaims = serde_json::from_slice(&claims_json)
            .map_err(|e| TokenError::Malformed(format!("invalid claims: {e}")))?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed("signature is not base64url".into()))?;

        Ok(Self {
            subject: claims.sub,
            policy_version: claims.pv,
            issued_at: from_unix(claims.iat)?,
            expires_at: from_unix(claims.exp)?,
            signature,
        })
    }
}

fn push_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
}

fn from_unix(secs: i64) -> Result<DateTime<Utc>, TokenError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| TokenError::Malformed(format!("timestamp out of range: {secs}")))
}

/// Mints tokens with the process-held key. Holds no mutable state, so one
/// issuer is shared by every concurrent validation.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    key: Option<Arc<SigningKey>>,
}

impl TokenIssuer {
    pub fn new(key: Option<Arc<SigningKey>>) -> Self {
        Self { key }
    }

    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Verifier bound to the same key, if one is loaded.
    pub fn verifier(&self) -> Option<TokenVerifier> {
        self.key.as_ref().map(|key| TokenVerifier::new(Arc::clone(key)))
    }

    pub fn issue(
        &self,
        subject: &str,
        policy_version: &str,
        ttl_secs: NonZeroU64,
    ) -> Result<Token, SigningError> {
        self.issue_at(subject, policy_version, ttl_secs, Utc::now())
    }

    /// Issue with an explicit clock reading; `now` is truncated to seconds.
    pub fn issue_at(
        &self,
        subject: &str,
        policy_version: &str,
        ttl_secs: NonZeroU64,
        now: DateTime<Utc>,
    ) -> Result<Token, SigningError> {
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| SigningError::KeyUnavailable("no signing key configured".into()))?;

        let issued_at = now.trunc_subsecs(0);
        let ttl = i64::try_from(ttl_secs.get())
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| SigningError::Sign(format!("ttl out of range: {ttl_secs}s")))?;
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| SigningError::Sign("token expiration overflows".into()))?;

        let signature = key.sign(&Token::signing_input(
            subject,
            policy_version,
            issued_at,
            expires_at,
        ))?;

        Ok(Token {
            subject: subject.to_string(),
            policy_version: policy_version.to_string(),
            issued_at,
            expires_at,
            signature,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TokenVerifier {
    key: Arc<SigningKey>,
}

impl TokenVerifier {
    pub fn new(key: Arc<SigningKey>) -> Self {
        Self { key }
    }

    pub fn verify(&self, token: &Token) -> Result<(), TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Accepts iff the signature matches and `now < expires_at`.
    pub fn verify_at(&self, token: &Token, now: DateTime<Utc>) -> Result<(), TokenError> {
        if token.issued_at.timestamp_subsec_nanos() != 0
            || token.expires_at.timestamp_subsec_nanos() != 0
        {
            return Err(TokenError::Malformed(
                "timestamps must have whole-second precision".into(),
            ));
        }
        if token.expires_at <= token.issued_at {
            return Err(TokenError::Malformed("expires_at must follow issued_at".into()));
        }
        if !self.key.verify(&token.canonical_bytes(), &token.signature) {
            return Err(TokenError::BadSignature);
        }
        if now >= token.expires_at {
            return Err(TokenError::Expired {
                expires_at: token.expires_at.to_rfc3339(),
            });
        }
        if token.issued_at > now + Duration::seconds(MAX_CLOCK_SKEW_SECS) {
            tracing::warn!(
                subject = %token.subject,
                issued_at = %token.issued_at.to_rfc3339(),
                "lock token issued ahead of local clock; check clock sync"
            );
        }
        Ok(())
    }

    pub fn verify_compact(&self, raw: &str) -> Result<Token, TokenError> {
        let token = Token::from_compact(raw)?;
        self.verify(&token)?;
        Ok(token)
    }
}
