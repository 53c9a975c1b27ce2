use engine::GameRules;

use super::self_play_metrics::PlyRecord;

/// How the next decision should respond to a position that has occurred before.
#[derive(Clone, Debug, PartialEq)]
pub struct RepetitionVerdict<A> {
    /// Moves that would repeat a check or chase from this position.
    pub forbidden_actions: Vec<A>,
    pub boosted_exploration: bool,
    /// Earlier occurrences left with a move that neither pressed nor escaped.
    pub idle_repetitions: usize,
}

impl<A> Default for RepetitionVerdict<A> {
    fn default() -> Self {
        Self {
            forbidden_actions: Vec::new(),
            boosted_exploration: false,
            idle_repetitions: 0,
        }
    }
}

/// Inspects every earlier occurrence of `state` in the game and the move played from it.
///
/// Nothing is restricted while the mover is in check.
pub fn assess_repetition<R>(
    rules: &R,
    state: &R::State,
    plies: &[PlyRecord<R::State, R::Action>],
) -> RepetitionVerdict<R::Action>
where
    R: GameRules,
{
    let mut verdict = RepetitionVerdict::default();

    if rules.in_check(state) {
        return verdict;
    }

    for ply in plies.iter().filter(|ply| ply.state == *state) {
        if rules.would_check_or_chase(state, &ply.action) {
            if !verdict.forbidden_actions.contains(&ply.action) {
                verdict.forbidden_actions.push(ply.action.clone());
            }
        } else if !rules.is_caught(state, &ply.action) {
            verdict.boosted_exploration = true;
            verdict.idle_repetitions += 1;
        }
    }

    verdict
}
