use super::{Rule, RuleFuture, RuleVerdict, Severity};
use crate::core::request::Request;
use serde_json::Value;

/// Failures report the default reason. Detail goes to the debug log only,
/// since it can echo payload structure.
fn fail_with_detail(rule: &str, detail: &str) -> RuleVerdict {
    tracing::debug!(rule, detail, "rule failed");
    RuleVerdict::fail_silent()
}

/// Passes when the payload carries any content at all.
pub struct NonEmptyPayloadRule {
    name: String,
    severity: Severity,
}

impl NonEmptyPayloadRule {
    pub fn new(name: impl Into<String>, severity: Severity) -> Self {
        Self {
            name: name.into(),
            severity,
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

impl Rule for NonEmptyPayloadRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn evaluate<'a>(&'a self, request: &'a Request) -> RuleFuture<'a> {
        Box::pin(async move {
            if is_empty_value(&request.payload) {
                fail_with_detail(&self.name, "payload is empty")
            } else {
                RuleVerdict::Pass
            }
        })
    }
}

/// A configured term split into lowercase words. Matches whole words only,
/// so "lie" does not match "client".
#[derive(Debug, Clone)]
struct Term {
    words: Vec<String>,
}

impl Term {
    fn parse(raw: &str) -> Option<Self> {
        let words: Vec<String> = split_words(&raw.to_lowercase())
            .map(str::to_string)
            .collect();
        (!words.is_empty()).then_some(Self { words })
    }

    fn occurs_in(&self, haystack: &[&str]) -> bool {
        haystack
            .windows(self.words.len())
            .any(|window| window.iter().zip(&self.words).all(|(w, t)| *w == t.as_str()))
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.words.join(" "))
    }
}

fn split_words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
}

/// Fails when any listed term occurs in the payload text as whole words.
pub struct ForbiddenTermsRule {
    name: String,
    severity: Severity,
    terms: Vec<Term>,
}

impl ForbiddenTermsRule {
    pub fn new(name: impl Into<String>, severity: Severity, terms: &[String]) -> Self {
        Self {
            name: name.into(),
            severity,
            terms: normalize_terms(terms),
        }
    }
}

impl Rule for ForbiddenTermsRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn evaluate<'a>(&'a self, request: &'a Request) -> RuleFuture<'a> {
        Box::pin(async move {
            let text = request.payload_text();
            let words: Vec<&str> = split_words(&text).collect();
            match self.terms.iter().find(|term| term.occurs_in(&words)) {
                Some(term) => fail_with_detail(
                    &self.name,
                    &format!("payload contains forbidden term '{term}'"),
                ),
                None => RuleVerdict::Pass,
            }
        })
    }
}

/// Fails unless every listed term occurs in the payload text as whole words.
pub struct RequiredTermsRule {
    name: String,
    severity: Severity,
    terms: Vec<Term>,
}

impl RequiredTermsRule {
    pub fn new(name: impl Into<String>, severity: Severity, terms: &[String]) -> Self {
        Self {
            name: name.into(),
            severity,
            terms: normalize_terms(terms),
        }
    }
}

impl Rule for RequiredTermsRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn evaluate<'a>(&'a self, request: &'a Request) -> RuleFuture<'a> {
        Box::pin(async move {
            let text = request.payload_text();
            let words: Vec<&str> = split_words(&text).collect();
            let missing: Vec<String> = self
                .terms
                .iter()
                .filter(|term| !term.occurs_in(&words))
                .map(Term::to_string)
                .collect();
            if missing.is_empty() {
                RuleVerdict::Pass
            } else {
                fail_with_detail(
                    &self.name,
                    &format!("payload is missing required terms: {}", missing.join(", ")),
                )
            }
        })
    }
}

/// Fails unless the payload is an object whose listed fields are present and
/// truthy (not null, false, zero, or empty).
pub struct RequiredFieldsRule {
    name: String,
    severity: Severity,
    fields: Vec<String>,
}

impl RequiredFieldsRule {
    pub fn new(name: impl Into<String>, severity: Severity, fields: &[String]) -> Self {
        Self {
            name: name.into(),
            severity,
            fields: fields.to_vec(),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        other => !is_empty_value(other),
    }
}

impl Rule for RequiredFieldsRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn evaluate<'a>(&'a self, request: &'a Request) -> RuleFuture<'a> {
        Box::pin(async move {
            let Some(object) = request.payload.as_object() else {
                return fail_with_detail(&self.name, "payload is not an object");
            };
            let missing: Vec<&str> = self
                .fields
                .iter()
                .filter(|field| !object.get(field.as_str()).is_some_and(is_truthy))
                .map(String::as_str)
                .collect();
            if missing.is_empty() {
                RuleVerdict::Pass
            } else {
                fail_with_detail(
                    &self.name,
                    &format!("missing required fields: {}", missing.join(", ")),
                )
            }
        })
    }
}

/// Fails when the serialized payload exceeds `limit` bytes.
pub struct MaxPayloadBytesRule {
    name: String,
    severity: Severity,
    limit: usize,
}

impl MaxPayloadBytesRule {
    pub fn new(name: impl Into<String>, severity: Severity, limit: usize) -> Self {
        Self {
            name: name.into(),
            severity,
            limit,
        }
    }
}

impl Rule for MaxPayloadBytesRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn evaluate<'a>(&'a self, request: &'a Request) -> RuleFuture<'a> {
        Box::pin(async move {
            let size = serde_json::to_vec(&request.payload).map_or(usize::MAX, |b| b.len());
            if size <= self.limit {
                RuleVerdict::Pass
            } else {
                fail_with_detail(
                    &self.name,
                    &format!("payload is {size} bytes (limit {})", self.limit),
                )
            }
        })
    }
}

/// Adapts a synchronous closure into a [`Rule`].
pub struct FnRule<F> {
    name: String,
    severity: Severity,
    check: F,
}

impl<F> FnRule<F>
where
    F: Fn(&Request) -> RuleVerdict + Send + Sync,
{
    pub fn new(name: impl Into<String>, severity: Severity, check: F) -> Self {
        Self {
            name: name.into(),
            severity,
            check,
        }
    }
}

impl<F> Rule for FnRule<F>
where
    F: Fn(&Request) -> RuleVerdict + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn evaluate<'a>(&'a self, request: &'a Request) -> RuleFuture<'a> {
        let verdict = (self.check)(request);
        Box::pin(async move { verdict })
    }
}

fn normalize_terms(terms: &[String]) -> Vec<Term> {
    terms.iter().filter_map(|term| Term::parse(term)).collect()
}
