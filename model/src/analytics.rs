use std::future::Future;

use super::error::EvaluationError;

/// Asynchronous, per-state access to network evaluations.
pub trait GameAnalyzer {
    type State;
    type Future: Future<Output = Result<Prediction, EvaluationError>>;

    fn get_state_analysis(&self, game_state: &Self::State) -> Self::Future;
}

/// A network evaluation of a single canonical state.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// Scores over the full action label space, indexed by `GameRules::action_index`.
    pub policy: Vec<f32>,
    /// Value in [-1, 1] from the perspective of the player to move.
    pub value: f32,
}

impl Prediction {
    pub fn new(policy: Vec<f32>, value: f32) -> Self {
        Prediction { policy, value }
    }
}
