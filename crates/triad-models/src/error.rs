//! Validation errors for caller-supplied input.

use thiserror::Error;

/// A task (or part of one) failed validation.
///
/// Validation errors are caller errors: they are surfaced immediately and
/// never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Difficulty was not one of `low`, `medium`, `high`.
    #[error("unknown difficulty tier: {0:?} (expected low, medium or high)")]
    UnknownDifficulty(String),

    /// Estimated duration was negative.
    #[error("estimated_hours must be non-negative, got {0}")]
    NegativeDuration(f64),

    /// Estimated duration was NaN or infinite.
    #[error("estimated_hours must be a finite number")]
    NonFiniteDuration,

    /// Input could not be parsed into a task.
    #[error("malformed task: {0}")]
    Malformed(String),
}
