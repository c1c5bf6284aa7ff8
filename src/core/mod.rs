pub mod decision;
pub mod evaluator;
pub mod policy;
pub mod request;
pub mod rules;
pub mod validator;

pub use decision::{Decision, DecisionState, InvalidTransition, Outcome};
pub use evaluator::{Evaluation, RuleEvaluator};
pub use policy::{PolicyRegistry, PolicySummary, RuleSet, RuleSummary};
pub use request::Request;
pub use rules::{Rule, RuleFuture, RuleResult, RuleVerdict, Severity};
pub use validator::{REPLAY_REASON, Validation, Validator, ValidatorBuilder};
