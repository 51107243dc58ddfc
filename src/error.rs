//! Stage errors.

use thiserror::Error;

/// Result type used throughout the stage.
pub type Result<T> = std::result::Result<T, TraceMathError>;

/// Errors surfaced by the expression stage.
///
/// Numeric edge cases (division by ~0 producing Inf/NaN during the
/// impedance conversion) are *not* errors; they flow downstream as ordinary
/// floating-point outputs.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TraceMathError {
    /// The expression text is empty or blank; nothing was recomputed.
    #[error("empty expression")]
    EmptyExpression,

    /// The evaluator rejected the formula or a per-sample evaluation failed.
    /// Carries the evaluator's diagnostic text. The recompute call that hit
    /// this was aborted, leaving earlier indices of the output updated.
    #[error("expression evaluation failed: {0}")]
    Evaluation(String),
}
