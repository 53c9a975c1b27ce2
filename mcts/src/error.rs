use model::EvaluationError;
use thiserror::Error;

#[derive(Error, Clone, Debug, PartialEq)]
pub enum SearchError {
    /// The decision was aborted because a network evaluation failed. The tree has been cleared and
    /// the whole decision may be retried.
    #[error("evaluation failed during search: {0}")]
    Evaluation(#[from] EvaluationError),
    #[error("invalid search options: {0}")]
    InvalidOptions(String),
}
