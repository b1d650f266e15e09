//! Error types for registration and hydration.
//!
//! None of these cross the public entry points as panics: registration
//! returns them, hydration records them in its report, and both log them.

use thiserror::Error;

use super::schema::Issue;
use crate::reactive::ComputationError;

/// Untrusted strings are cut to this many characters before they are stored
/// in an error or logged.
const ECHO_LIMIT: usize = 64;

pub(crate) fn echo(untrusted: &str) -> String {
    untrusted.chars().take(ECHO_LIMIT).collect()
}

/// The island's trust boundary rejected it. The factory was not invoked.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("island has no component identifier")]
    MissingIdentifier,

    #[error("component identifier {0:?} does not match [A-Za-z0-9_-]+")]
    InvalidIdentifier(String),

    #[error("component {0:?} is not registered")]
    UnknownComponent(String),

    #[error("props are not valid JSON: {0}")]
    MalformedProps(String),

    #[error("props attribute is {len} bytes; the limit is {limit}")]
    PropsTooLarge { len: usize, limit: usize },

    #[error("props rejected by schema: {}", describe(.0))]
    SchemaRejected(Vec<Issue>),

    #[error("schema validator panicked: {0}")]
    SchemaPanicked(String),

    #[error("schema validation did not complete synchronously")]
    AsyncValidator,
}

fn describe(issues: &[Issue]) -> String {
    if issues.is_empty() {
        return "no issues reported".to_string();
    }
    issues
        .iter()
        .map(Issue::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A component could not be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("component name {0:?} does not match [A-Za-z0-9_-]+")]
    InvalidName(String),
}

/// A validated island could not be brought to life.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("component factory failed: {0}")]
    FactoryFailed(String),

    #[error("component factory panicked: {0}")]
    FactoryPanicked(String),

    #[error("initial render failed: {0}")]
    RenderFailed(#[source] ComputationError),
}

/// Why an island was not hydrated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IslandError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Bind(#[from] BindError),
}
