use anyhow::{Context, Result};
use engine::GameRules;
use log::{debug, info};
use mcts::{DecisionOutcome, SearchEngine, SearchOptions};
use model::GameAnalyzer;

use super::repetition::assess_repetition;
use super::{GameEnd, PlyRecord, SelfPlayMetrics, SelfPlayOptions};

/// Plays one game of the agent against itself.
///
/// `seed` overrides the search seed so that concurrent games do not share a random stream.
pub async fn play_self_one<R, M>(
    rules: &R,
    analyzer: &M,
    options: &SelfPlayOptions,
    seed: Option<u64>,
) -> Result<SelfPlayMetrics<R::State, R::Action>>
where
    R: GameRules,
    M: GameAnalyzer<State = R::State>,
{
    let search_options = SearchOptions {
        seed: seed.or(options.search.seed),
        ..options.search.clone()
    };

    let mut engine = SearchEngine::new(rules, analyzer, search_options)?;

    let mut state = rules.initial_state();
    let mut history: Vec<R::State> = Vec::new();
    let mut plies: Vec<PlyRecord<R::State, R::Action>> = Vec::new();
    let mut forbidden_actions: Vec<R::Action> = Vec::new();
    let mut boosted_exploration = false;
    let mut plies_without_capture = 0;

    // Value for the player to move after the last recorded ply.
    let (mover_value, end) = loop {
        let decision = engine
            .decide_move(&state, &history, &forbidden_actions, boosted_exploration)
            .await
            .with_context(|| format!("Failed to decide the move at ply {}", plies.len()))?;

        let action = match decision.outcome {
            DecisionOutcome::Terminal => {
                let outcome = decision.metrics.value;

                match decision.action {
                    Some(action) => {
                        plies.push(PlyRecord {
                            state,
                            action,
                            metrics: decision.metrics,
                        });

                        break (-outcome, GameEnd::Terminal);
                    }
                    None => break (outcome, GameEnd::Terminal),
                }
            }
            DecisionOutcome::Resigned => break (-1.0, GameEnd::Resigned),
            DecisionOutcome::NoLegalActions => break (-1.0, GameEnd::NoLegalActions),
            DecisionOutcome::Searched => decision
                .action
                .context("Search finished without choosing an action")?,
        };

        if rules.is_capture(&state, &action) {
            plies_without_capture = 0;
        } else {
            plies_without_capture += 1;
        }

        let next_state = rules.take_action(&state, &action);
        debug!("Ply {}: {:?}", plies.len(), action);

        history.push(state.clone());
        plies.push(PlyRecord {
            state,
            action,
            metrics: decision.metrics,
        });
        state = next_state;

        forbidden_actions.clear();
        boosted_exploration = false;

        if plies_without_capture >= options.no_capture_draw_plies {
            break (0.0, GameEnd::NoCaptureLimit);
        }

        if plies.len() / 2 >= options.max_game_length {
            break (0.0, GameEnd::MaxGameLength);
        }

        if rules.terminal_state(&state).is_some() {
            continue;
        }

        if !rules.has_attacking_pieces(&state) {
            break (0.0, GameEnd::NoAttackingPieces);
        }

        let verdict = assess_repetition(rules, &state, &plies);
        if verdict.idle_repetitions >= options.idle_repetition_draw {
            break (0.0, GameEnd::IdleRepetition);
        }

        forbidden_actions = verdict.forbidden_actions;
        boosted_exploration = verdict.boosted_exploration;
    };

    let outcome = if plies.len() % 2 == 0 {
        mover_value
    } else {
        -mover_value
    };

    info!(
        "Game finished. End: {:?}, Number of Plies: {}, Outcome: {}",
        end,
        plies.len(),
        outcome
    );

    Ok(SelfPlayMetrics::new(plies, outcome, end))
}
