//! Failures raised inside tracked executions.

use thiserror::Error;

/// A tracked execution (computation body, derived expression, or island
/// render) failed.
///
/// Never propagated to the writer that triggered the execution. It is logged
/// and, for island renders, reported by the binder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComputationError {
    /// The body panicked.
    #[error("computation panicked: {0}")]
    Panicked(String),

    /// The body returned an error value.
    #[error("computation failed: {0}")]
    Failed(String),
}
