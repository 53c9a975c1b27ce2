use super::game_state::{GameAction, GameState};
use super::terminal::Terminal;

/// Rules of a two-player zero-sum game, expressed over canonical states.
///
/// Every state handed out by `take_action` is already canonical for the player who moves next.
pub trait GameRules {
    type State: GameState;
    type Action: GameAction;

    fn initial_state(&self) -> Self::State;

    /// Normalizes a state to the perspective of its player to move.
    fn canonical_view(&self, state: &Self::State) -> Self::State {
        state.clone()
    }

    fn legal_actions(&self, state: &Self::State) -> Vec<Self::Action>;

    fn take_action(&self, state: &Self::State, action: &Self::Action) -> Self::State;

    fn terminal_state(&self, state: &Self::State) -> Option<Terminal<Self::Action>>;

    /// Whether playing `action` checks the opponent or chases one of their pieces.
    fn would_check_or_chase(&self, state: &Self::State, action: &Self::Action) -> bool;

    /// Whether `action` answers a chase, the mover being the side that is chased.
    fn is_caught(&self, state: &Self::State, action: &Self::Action) -> bool;

    /// The slot of `action` in the fixed policy label space.
    fn action_index(&self, action: &Self::Action) -> usize;

    fn action_space_size(&self) -> usize;

    fn is_capture(&self, _state: &Self::State, _action: &Self::Action) -> bool {
        false
    }

    fn in_check(&self, _state: &Self::State) -> bool {
        false
    }

    fn has_attacking_pieces(&self, _state: &Self::State) -> bool {
        true
    }
}
