use anyhow::Result;

use super::analytics::Prediction;

/// Batched policy and value inference over canonical states.
pub trait Predictor {
    type State;

    /// Returns exactly one prediction per state, in the same order.
    fn predict(&self, states: &[Self::State]) -> Result<Vec<Prediction>>;
}
