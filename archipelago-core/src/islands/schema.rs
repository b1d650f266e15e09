//! Props validation hooks.
//!
//! A component may register a [`Validator`] that runs against the parsed
//! props before its factory is invoked. The validator either returns the
//! (possibly transformed) value to hand to the factory, or a list of
//! [`Issue`]s, in which case the island is rejected. Validators may answer
//! synchronously or with a future.
//!
//! Three kinds of validator are provided:
//!
//! - any closure `Fn(Value) -> Result<Value, Vec<Issue>>`;
//! - [`AsyncValidator`], wrapping a closure that returns a future;
//! - [`TypedSchema`], which checks that the props deserialize into a Rust
//!   type and hands the factory the re-serialized value, with serde defaults
//!   applied and unknown fields dropped.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

use futures_util::future::{FutureExt, LocalBoxFuture};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// One reason a validator rejected its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Location of the problem, e.g. `"items.2.name"`. Empty for the whole value.
    pub path: String,
    pub message: String,
}

impl Issue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// An issue with the value as a whole.
    pub fn root(message: impl Into<String>) -> Self {
        Self::new("", message)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

pub type ValidationResult = Result<Value, Vec<Issue>>;

/// A validator's answer.
pub enum Validation {
    Ready(ValidationResult),
    Pending(LocalBoxFuture<'static, ValidationResult>),
}

impl Validation {
    pub fn accept(value: Value) -> Self {
        Self::Ready(Ok(value))
    }

    pub fn reject(issues: Vec<Issue>) -> Self {
        Self::Ready(Err(issues))
    }

    pub fn pending(future: impl Future<Output = ValidationResult> + 'static) -> Self {
        Self::Pending(future.boxed_local())
    }

    /// Wait for the answer.
    pub async fn resolve(self) -> ValidationResult {
        match self {
            Self::Ready(result) => result,
            Self::Pending(future) => future.await,
        }
    }
}

impl fmt::Debug for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Validates the parsed props of an island.
pub trait Validator {
    fn validate(&self, value: Value) -> Validation;
}

impl<F> Validator for F
where
    F: Fn(Value) -> ValidationResult,
{
    fn validate(&self, value: Value) -> Validation {
        Validation::Ready(self(value))
    }
}

/// A validator that answers with a future.
pub struct AsyncValidator<F> {
    validate: F,
}

impl<F, Fut> AsyncValidator<F>
where
    F: Fn(Value) -> Fut,
    Fut: Future<Output = ValidationResult> + 'static,
{
    pub fn new(validate: F) -> Self {
        Self { validate }
    }
}

impl<F, Fut> Validator for AsyncValidator<F>
where
    F: Fn(Value) -> Fut,
    Fut: Future<Output = ValidationResult> + 'static,
{
    fn validate(&self, value: Value) -> Validation {
        Validation::pending((self.validate)(value))
    }
}

type Refinement<P> = Box<dyn Fn(&P) -> Vec<Issue>>;

/// Accepts props that deserialize into `P`.
///
/// The factory receives `P` serialized back to JSON, so defaults declared
/// with `#[serde(default)]` are filled in and fields `P` does not know are
/// dropped.
pub struct TypedSchema<P> {
    refinements: Vec<Refinement<P>>,
    _props: PhantomData<fn() -> P>,
}

impl<P> TypedSchema<P>
where
    P: DeserializeOwned + Serialize + 'static,
{
    pub fn new() -> Self {
        Self {
            refinements: Vec::new(),
            _props: PhantomData,
        }
    }

    /// Add a check on the deserialized value. Every refinement runs; their
    /// issues are collected.
    pub fn refine(mut self, check: impl Fn(&P) -> Vec<Issue> + 'static) -> Self {
        self.refinements.push(Box::new(check));
        self
    }

    /// Deserialize and refine, without re-serializing.
    pub fn parse(&self, value: Value) -> Result<P, Vec<Issue>> {
        let props: P =
            serde_json::from_value(value).map_err(|e| vec![Issue::root(e.to_string())])?;

        let issues: Vec<Issue> = self
            .refinements
            .iter()
            .flat_map(|check| check(&props))
            .collect();

        if issues.is_empty() {
            Ok(props)
        } else {
            Err(issues)
        }
    }
}

impl<P> Default for TypedSchema<P>
where
    P: DeserializeOwned + Serialize + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Validator for TypedSchema<P>
where
    P: DeserializeOwned + Serialize + 'static,
{
    fn validate(&self, value: Value) -> Validation {
        let result = self.parse(value).and_then(|props| {
            serde_json::to_value(&props).map_err(|e| vec![Issue::root(e.to_string())])
        });
        Validation::Ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct CounterProps {
        start: i64,
        #[serde(default = "default_step")]
        step: i64,
    }

    fn default_step() -> i64 {
        1
    }

    fn ready(validation: Validation) -> ValidationResult {
        validation
            .resolve()
            .now_or_never()
            .expect("ready validation resolves immediately")
    }

    #[test]
    fn closure_validators_answer_synchronously() {
        let reject_all = |_: Value| -> ValidationResult { Err(vec![Issue::root("no")]) };
        let validation = reject_all.validate(json!({}));
        assert!(matches!(validation, Validation::Ready(Err(_))));
    }

    #[test]
    fn async_validator_answers_pending() {
        let validator = AsyncValidator::new(|value: Value| async move { Ok(value) });
        let validation = validator.validate(json!(1));
        assert!(matches!(validation, Validation::Pending(_)));
        assert_eq!(
            validation.resolve().now_or_never(),
            Some(Ok(json!(1)))
        );
    }

    #[test]
    fn typed_schema_fills_defaults_and_drops_unknown_fields() {
        let schema = TypedSchema::<CounterProps>::new();
        let result = ready(schema.validate(json!({"start": 3, "color": "red"})));
        assert_eq!(result, Ok(json!({"start": 3, "step": 1})));
    }

    #[test]
    fn typed_schema_rejects_wrong_shape() {
        let schema = TypedSchema::<CounterProps>::new();
        let issues = ready(schema.validate(json!({"start": "three"}))).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].path.is_empty());
    }

    #[test]
    fn typed_schema_collects_refinement_issues() {
        let schema = TypedSchema::<CounterProps>::new()
            .refine(|p| {
                if p.start < 0 {
                    vec![Issue::new("start", "must not be negative")]
                } else {
                    Vec::new()
                }
            })
            .refine(|p| {
                if p.step == 0 {
                    vec![Issue::new("step", "must not be zero")]
                } else {
                    Vec::new()
                }
            });

        let issues = ready(schema.validate(json!({"start": -1, "step": 0}))).unwrap_err();
        assert_eq!(
            issues,
            vec![
                Issue::new("start", "must not be negative"),
                Issue::new("step", "must not be zero"),
            ]
        );
    }

    #[test]
    fn issue_display_includes_path() {
        assert_eq!(Issue::new("a.b", "bad").to_string(), "a.b: bad");
        assert_eq!(Issue::root("bad").to_string(), "bad");
    }
}
