use thiserror::Error;

/// Errors observed by a caller waiting on a network evaluation.
///
/// Cloneable so a single failed batch can be reported to every caller in it.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum EvaluationError {
    #[error("predictor failed: {0}")]
    Predictor(String),
    #[error("predictor returned {actual} results for a batch of {expected}")]
    BatchSizeMismatch { expected: usize, actual: usize },
    #[error("evaluation broker is shut down")]
    Disconnected,
}
