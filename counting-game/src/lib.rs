//! A two-player counting race used to exercise search and self-play.
//!
//! Both players share one counter. The player to move wants it to reach `goal`, the opponent wants
//! it to reach zero. States are stored from the mover's perspective, so flipping a state mirrors
//! the counter around `goal`.

use anyhow::Result;
use engine::{Flip, GameRules, Terminal};
use futures::future;
use model::{EvaluationError, GameAnalyzer, Prediction, Predictor};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_GOAL: u32 = 20;

#[derive(Hash, PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CountingGameState {
    pub count: u32,
    pub goal: u32,
}

impl CountingGameState {
    pub fn new(count: u32, goal: u32) -> Self {
        Self { count, goal }
    }
}

impl Flip for CountingGameState {
    fn flip(&self) -> Self {
        Self::new(self.goal - self.count, self.goal)
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum CountingAction {
    Increment,
    Decrement,
    Stay,
}

impl Flip for CountingAction {
    fn flip(&self) -> Self {
        match self {
            CountingAction::Increment => CountingAction::Decrement,
            CountingAction::Decrement => CountingAction::Increment,
            CountingAction::Stay => CountingAction::Stay,
        }
    }
}

/// Distance from either end of the counter within which `Stay` counts as pressing or being pressed.
const PRESSURE_DISTANCE: u32 = 3;

pub struct CountingGame {
    goal: u32,
}

impl CountingGame {
    pub fn new() -> Self {
        Self::with_goal(DEFAULT_GOAL)
    }

    pub fn with_goal(goal: u32) -> Self {
        assert!(goal >= 2, "goal must leave room for a move");
        Self { goal }
    }

    pub fn state(&self, count: u32) -> CountingGameState {
        CountingGameState::new(count, self.goal)
    }
}

impl Default for CountingGame {
    fn default() -> Self {
        Self::new()
    }
}

impl GameRules for CountingGame {
    type State = CountingGameState;
    type Action = CountingAction;

    fn initial_state(&self) -> Self::State {
        self.state(self.goal / 2)
    }

    fn legal_actions(&self, state: &Self::State) -> Vec<Self::Action> {
        if self.terminal_state(state).is_some() {
            return Vec::new();
        }

        vec![
            CountingAction::Increment,
            CountingAction::Decrement,
            CountingAction::Stay,
        ]
    }

    fn take_action(&self, state: &Self::State, action: &Self::Action) -> Self::State {
        let count = match action {
            CountingAction::Increment => state.count + 1,
            CountingAction::Decrement => state.count - 1,
            CountingAction::Stay => state.count,
        };

        CountingGameState::new(count, state.goal).flip()
    }

    fn terminal_state(&self, state: &Self::State) -> Option<Terminal<Self::Action>> {
        if state.count == 0 {
            Some(Terminal::loss())
        } else if state.count == state.goal {
            Some(Terminal::win())
        } else {
            None
        }
    }

    fn would_check_or_chase(&self, state: &Self::State, action: &Self::Action) -> bool {
        *action == CountingAction::Stay && state.count + PRESSURE_DISTANCE >= state.goal
    }

    fn is_caught(&self, state: &Self::State, action: &Self::Action) -> bool {
        *action == CountingAction::Stay && state.count <= PRESSURE_DISTANCE
    }

    fn action_index(&self, action: &Self::Action) -> usize {
        match action {
            CountingAction::Increment => 0,
            CountingAction::Decrement => 1,
            CountingAction::Stay => 2,
        }
    }

    fn action_space_size(&self) -> usize {
        3
    }

    fn is_capture(&self, _state: &Self::State, action: &Self::Action) -> bool {
        *action != CountingAction::Stay
    }
}

/// Predicts a fixed policy and a value proportional to the mover's progress.
pub struct CountingPredictor {
    policy: [f32; 3],
    batch_sizes: Mutex<Vec<usize>>,
}

impl CountingPredictor {
    pub fn new(policy: [f32; 3]) -> Self {
        Self {
            policy,
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    pub fn uniform() -> Self {
        Self::new([1.0 / 3.0; 3])
    }

    pub fn predict_one(&self, state: &CountingGameState) -> Prediction {
        let value = 2.0 * state.count as f32 / state.goal as f32 - 1.0;

        Prediction::new(self.policy.to_vec(), value)
    }

    /// The size of every batch received so far, in arrival order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().clone()
    }
}

impl Predictor for CountingPredictor {
    type State = CountingGameState;

    fn predict(&self, states: &[Self::State]) -> Result<Vec<Prediction>> {
        self.batch_sizes.lock().push(states.len());

        Ok(states.iter().map(|s| self.predict_one(s)).collect())
    }
}

/// Answers analysis requests immediately, without batching.
pub struct CountingAnalyzer {
    predictor: CountingPredictor,
}

impl CountingAnalyzer {
    pub fn new(policy: [f32; 3]) -> Self {
        Self {
            predictor: CountingPredictor::new(policy),
        }
    }
}

impl GameAnalyzer for CountingAnalyzer {
    type State = CountingGameState;
    type Future = future::Ready<Result<Prediction, EvaluationError>>;

    fn get_state_analysis(&self, game_state: &Self::State) -> Self::Future {
        future::ready(Ok(self.predictor.predict_one(game_state)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_is_an_involution() {
        let game = CountingGame::new();

        for count in 0..=DEFAULT_GOAL {
            let state = game.state(count);
            assert_eq!(state.flip().flip(), state);
        }

        for action in [
            CountingAction::Increment,
            CountingAction::Decrement,
            CountingAction::Stay,
        ] {
            assert_eq!(action.flip().flip(), action);
        }
    }

    #[test]
    fn test_take_action_hands_the_state_to_the_opponent() {
        let game = CountingGame::with_goal(10);
        let next = game.take_action(&game.state(5), &CountingAction::Increment);

        assert_eq!(next, game.state(4));
    }

    #[test]
    fn test_reaching_the_goal_is_a_loss_for_the_next_mover() {
        let game = CountingGame::with_goal(10);
        let next = game.take_action(&game.state(9), &CountingAction::Increment);

        assert_eq!(game.terminal_state(&next), Some(Terminal::loss()));
        assert!(game.legal_actions(&next).is_empty());
    }

    #[test]
    fn test_actions_are_in_canonical_order() {
        let game = CountingGame::new();
        let actions = game.legal_actions(&game.initial_state());

        let mut sorted = actions.clone();
        sorted.sort();

        assert_eq!(actions, sorted);
    }
}
