use serde_json::json;

use lockgate::config::default_policies;
use lockgate::core::{Outcome, PolicyRegistry, REPLAY_REASON, Request, Validator};
use lockgate::security::SigningKey;

fn validator() -> Validator {
    let registry = PolicyRegistry::from_config(&default_policies()).unwrap();
    Validator::builder(registry)
        .signing_key(Some(SigningKey::generate()))
        .build()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicates_lock_exactly_once() {
    let validator = validator();
    let mut handles = Vec::new();
    for _ in 0..16 {
        let validator = validator.clone();
        handles.push(tokio::spawn(async move {
            validator
                .validate(Request::new("same-id", json!("deploy"), "v1"))
                .await
                .unwrap()
        }));
    }

    let mut locked = 0;
    for handle in handles {
        let validation = handle.await.unwrap();
        match validation.decision.outcome() {
            Outcome::Locked => locked += 1,
            Outcome::Reject => assert_eq!(validation.decision.reasons(), [REPLAY_REASON]),
            Outcome::Quarantine => panic!("unexpected quarantine"),
        }
    }
    assert_eq!(locked, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_requests_validate_independently() {
    let validator = validator();
    let mut handles = Vec::new();
    for i in 0..32 {
        let validator = validator.clone();
        handles.push(tokio::spawn(async move {
            let payload = if i % 2 == 0 { json!("honest") } else { json!("evil") };
            validator
                .validate(Request::new(format!("req-{i}"), payload, "v1"))
                .await
                .unwrap()
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let outcome = handle.await.unwrap().decision.outcome();
        let expected = if i % 2 == 0 { Outcome::Locked } else { Outcome::Reject };
        assert_eq!(outcome, expected, "request {i}");
    }
}
