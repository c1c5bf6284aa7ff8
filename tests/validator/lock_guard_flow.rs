use serde_json::json;

use lockgate::config::default_policies;
use lockgate::core::{PolicyRegistry, Request, Validator};
use lockgate::error::GuardError;
use lockgate::security::{LockGuard, SigningKey};

#[tokio::test]
async fn guard_admits_token_from_validator() {
    let registry = PolicyRegistry::from_config(&default_policies()).unwrap();
    let validator = Validator::builder(registry)
        .signing_key(Some(SigningKey::generate()))
        .build();

    let validation = validator
        .validate(Request::new("guarded", json!({"plan": "publish"}), "v1"))
        .await
        .unwrap();
    let token = validation.decision.token().unwrap();

    let guard = LockGuard::new(validator.verifier().unwrap()).with_required_policy("v1");
    let admitted = guard.require(Some(token)).unwrap();
    assert_eq!(admitted.subject, "guarded");

    let compact = token.to_compact();
    assert!(guard.require_compact(Some(&compact)).is_ok());
    assert_eq!(guard.require(None).unwrap_err(), GuardError::MissingLock);
}

#[tokio::test]
async fn guard_rejects_token_from_other_key() {
    let registry = PolicyRegistry::from_config(&default_policies()).unwrap();
    let issuing = Validator::builder(registry)
        .signing_key(Some(SigningKey::generate()))
        .build();
    let validation = issuing
        .validate(Request::new("foreign", json!("ok"), "v1"))
        .await
        .unwrap();

    let other = Validator::builder(PolicyRegistry::from_config(&default_policies()).unwrap())
        .signing_key(Some(SigningKey::generate()))
        .build();
    let guard = LockGuard::new(other.verifier().unwrap());
    assert!(matches!(
        guard.require(validation.decision.token()),
        Err(GuardError::InvalidLock(_))
    ));
}
