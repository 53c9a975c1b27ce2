use counting_game::{CountingAction, CountingGame, CountingGameState};
use engine::{GameRules, Terminal};
use futures::future;
use model::{EvaluationError, GameAnalyzer, Prediction};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Uniform policy with the same value for every state.
struct FixedValueAnalyzer {
    value: f32,
}

impl GameAnalyzer for FixedValueAnalyzer {
    type State = CountingGameState;
    type Future = future::Ready<Result<Prediction, EvaluationError>>;

    fn get_state_analysis(&self, _: &Self::State) -> Self::Future {
        future::ready(Ok(Prediction::new(vec![1.0 / 3.0; 3], self.value)))
    }
}

/// Answers a fixed number of requests, then fails every later one.
struct FailingAfter {
    remaining: AtomicUsize,
}

impl FailingAfter {
    fn new(successes: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(successes),
        }
    }
}

impl GameAnalyzer for FailingAfter {
    type State = CountingGameState;
    type Future = future::Ready<Result<Prediction, EvaluationError>>;

    fn get_state_analysis(&self, _: &Self::State) -> Self::Future {
        let succeeded = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |r| r.checked_sub(1))
            .is_ok();

        future::ready(if succeeded {
            Ok(Prediction::new(vec![1.0 / 3.0; 3], 0.0))
        } else {
            Err(EvaluationError::Predictor("device lost".to_string()))
        })
    }
}

/// The counting game, except that moves stay listed once the game is over.
struct OpenEndedCounting(CountingGame);

impl GameRules for OpenEndedCounting {
    type State = CountingGameState;
    type Action = CountingAction;

    fn initial_state(&self) -> Self::State {
        self.0.initial_state()
    }

    fn legal_actions(&self, _: &Self::State) -> Vec<Self::Action> {
        vec![
            CountingAction::Stay,
            CountingAction::Decrement,
            CountingAction::Increment,
        ]
    }

    fn take_action(&self, state: &Self::State, action: &Self::Action) -> Self::State {
        self.0.take_action(state, action)
    }

    fn terminal_state(&self, state: &Self::State) -> Option<Terminal<Self::Action>> {
        self.0.terminal_state(state)
    }

    fn would_check_or_chase(&self, state: &Self::State, action: &Self::Action) -> bool {
        self.0.would_check_or_chase(state, action)
    }

    fn is_caught(&self, state: &Self::State, action: &Self::Action) -> bool {
        self.0.is_caught(state, action)
    }

    fn action_index(&self, action: &Self::Action) -> usize {
        self.0.action_index(action)
    }

    fn action_space_size(&self) -> usize {
        self.0.action_space_size()
    }
}

#[cfg(test)]
mod tests {
    use super::super::{
        DecisionOutcome, NeverExempt, SampledExemption, SearchEngine, SearchError, SearchOptions,
    };
    use super::{FailingAfter, FixedValueAnalyzer, OpenEndedCounting};
    use assert_approx_eq::assert_approx_eq;
    use broker::{BrokerOptions, EvaluationBroker};
    use counting_game::{CountingAction, CountingAnalyzer, CountingGame, CountingPredictor};
    use engine::GameRules;
    use model::EvaluationError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    fn options(simulation_num_per_move: usize, search_threads: usize) -> SearchOptions {
        SearchOptions {
            simulation_num_per_move,
            search_threads,
            seed: Some(1),
            ..SearchOptions::default()
        }
    }

    #[tokio::test]
    async fn test_root_visits_match_the_simulation_budget() {
        let game = CountingGame::with_goal(20);
        let analyzer = CountingAnalyzer::new([0.3, 0.3, 0.4]);
        let mut engine = SearchEngine::new(&game, &analyzer, options(200, 4)).unwrap();

        let decision = engine
            .decide_move(&game.state(10), &[], &[], false)
            .await
            .unwrap();

        assert_eq!(decision.outcome, DecisionOutcome::Searched);
        assert!(decision.action.is_some());
        assert_eq!(decision.metrics.visits, 200);
        assert_eq!(
            decision.metrics.children.iter().map(|c| c.visits()).sum::<usize>(),
            200
        );
        assert_eq!(decision.stats.simulations, 200);
        assert_approx_eq!(
            decision.visit_distribution.iter().map(|(_, p)| p).sum::<f32>(),
            1.0,
            1e-5
        );
        assert!(engine.tree().is_empty());
    }

    #[tokio::test]
    async fn test_decisions_are_reproducible_with_a_seed() {
        let game = CountingGame::with_goal(20);
        let analyzer = CountingAnalyzer::new([0.3, 0.3, 0.4]);
        let history = vec![game.state(9), game.state(11), game.state(8)];

        let mut decisions = Vec::new();
        for _ in 0..2 {
            let options = SearchOptions {
                seed: Some(7),
                ..options(100, 1)
            };
            let mut engine = SearchEngine::new(&game, &analyzer, options).unwrap();

            decisions.push(
                engine
                    .decide_move(&game.state(10), &history, &[], false)
                    .await
                    .unwrap(),
            );
        }

        assert_eq!(decisions[0], decisions[1]);
    }

    #[tokio::test]
    async fn test_visits_are_conserved_with_concurrent_workers() {
        let game = CountingGame::with_goal(20);
        let broker = EvaluationBroker::new(
            CountingPredictor::uniform(),
            BrokerOptions::new(8, Duration::from_millis(1)),
        )
        .unwrap();
        let mut engine = SearchEngine::new(&game, &broker, options(300, 16)).unwrap();

        let (root, _, stats) = engine
            .search(&game.state(10), &[], &[], false)
            .await
            .unwrap();

        assert_eq!(root.sum_of_visits(), 300);
        assert_eq!(stats.simulations, 300);

        let nodes = engine.tree().iter_nodes();
        for (_, node) in &nodes {
            assert_eq!(node.total_visits, node.sum_of_visits());
        }

        let total_visits: u64 = nodes.iter().map(|(_, node)| node.total_visits).sum();
        assert_eq!(total_visits, stats.total_steps as u64);
        assert!(broker.stats().max_batch_size <= 8);
    }

    #[tokio::test]
    async fn test_terminal_root_short_circuits() {
        let game = CountingGame::with_goal(20);
        let analyzer = CountingAnalyzer::new([0.3, 0.3, 0.4]);
        let mut engine = SearchEngine::new(&game, &analyzer, options(100, 4)).unwrap();

        let decision = engine
            .decide_move(&game.state(20), &[], &[], false)
            .await
            .unwrap();

        assert_eq!(decision.outcome, DecisionOutcome::Terminal);
        assert_eq!(decision.action, None);
        assert_eq!(decision.metrics.value, 1.0);
        assert_eq!(decision.stats.simulations, 0);
    }

    #[tokio::test]
    async fn test_terminal_root_reports_zero_visits_for_listed_moves() {
        let game = OpenEndedCounting(CountingGame::with_goal(20));
        let analyzer = CountingAnalyzer::new([0.3, 0.3, 0.4]);
        let mut engine = SearchEngine::new(&game, &analyzer, options(100, 4)).unwrap();

        let decision = engine
            .decide_move(&game.0.state(0), &[], &[], false)
            .await
            .unwrap();

        assert_eq!(decision.outcome, DecisionOutcome::Terminal);
        assert_eq!(decision.metrics.value, -1.0);
        assert_eq!(
            decision.visit_distribution,
            vec![
                (CountingAction::Increment, 0.0),
                (CountingAction::Decrement, 0.0),
                (CountingAction::Stay, 0.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_forbidding_every_action_is_a_forced_loss() {
        let game = CountingGame::with_goal(20);
        let analyzer = CountingAnalyzer::new([0.3, 0.3, 0.4]);
        let mut engine = SearchEngine::new(&game, &analyzer, options(100, 4)).unwrap();
        let state = game.state(10);
        let forbidden = game.legal_actions(&state);

        let decision = engine
            .decide_move(&state, &[], &forbidden, false)
            .await
            .unwrap();

        assert_eq!(decision.outcome, DecisionOutcome::NoLegalActions);
        assert_eq!(decision.action, None);
        assert_eq!(decision.stats.simulations, 0);
        assert!(decision.visit_distribution.iter().all(|(_, p)| *p == 0.0));
    }

    #[tokio::test]
    async fn test_forbidden_actions_are_never_visited_at_the_root() {
        let game = CountingGame::with_goal(20);
        let analyzer = CountingAnalyzer::new([0.8, 0.1, 0.1]);
        let mut engine = SearchEngine::new(&game, &analyzer, options(100, 4)).unwrap();

        let decision = engine
            .decide_move(&game.state(10), &[], &[CountingAction::Increment], false)
            .await
            .unwrap();

        let increment = &decision.metrics.children[0];
        assert_eq!(increment.action(), &CountingAction::Increment);
        assert_eq!(increment.visits(), 0);
        assert_ne!(decision.action, Some(CountingAction::Increment));
        assert_eq!(decision.metrics.visits, 100);
    }

    #[tokio::test]
    async fn test_a_winning_move_is_found() {
        let game = CountingGame::with_goal(20);
        let analyzer = CountingAnalyzer::new([0.34, 0.33, 0.33]);
        let options = SearchOptions {
            simulation_num_per_move: 200,
            search_threads: 4,
            ..SearchOptions::evaluation()
        };
        let mut engine = SearchEngine::new(&game, &analyzer, options).unwrap();

        let decision = engine
            .decide_move(&game.state(19), &[], &[], false)
            .await
            .unwrap();

        assert_eq!(decision.action, Some(CountingAction::Increment));
        assert_approx_eq!(decision.metrics.children[0].q(), 1.0);
    }

    fn stay_heavy_options() -> SearchOptions {
        SearchOptions {
            simulation_num_per_move: 200,
            search_threads: 1,
            seed: Some(1),
            ..SearchOptions::evaluation()
        }
    }

    #[tokio::test]
    async fn test_repeating_a_chase_in_search_is_a_loss_for_the_chaser() {
        let game = CountingGame::with_goal(20);
        let analyzer = CountingAnalyzer::new([0.05, 0.05, 0.9]);
        let mut engine = SearchEngine::new(&game, &analyzer, stay_heavy_options()).unwrap();

        let (root, _, stats) = engine
            .search(&game.state(18), &[], &[], false)
            .await
            .unwrap();

        let stay = root.edges.iter().find(|e| *e.action() == CountingAction::Stay).unwrap();
        assert!(stats.repetitions > 0);
        assert!(stay.n() > 0);
        assert!(stay.q() < -0.5);

        let chased = engine.tree().get(&game.state(2)).unwrap().snapshot();
        let chased_stay = chased.edges.iter().find(|e| *e.action() == CountingAction::Stay).unwrap();
        assert!(chased_stay.n() > 0);
        assert!(chased_stay.q() > 0.5);
    }

    #[tokio::test]
    async fn test_repeating_a_caught_response_in_search_is_a_win_for_the_caught_side() {
        let game = CountingGame::with_goal(20);
        let analyzer = CountingAnalyzer::new([0.05, 0.05, 0.9]);
        let mut engine = SearchEngine::new(&game, &analyzer, stay_heavy_options()).unwrap();

        let (_, _, stats) = engine
            .search(&game.state(2), &[], &[], false)
            .await
            .unwrap();

        assert!(stats.repetitions > 0);

        let chaser = engine.tree().get(&game.state(18)).unwrap().snapshot();
        let chaser_stay = chaser.edges.iter().find(|e| *e.action() == CountingAction::Stay).unwrap();
        assert!(chaser_stay.n() > 0);
        assert!(chaser_stay.q() < -0.5);
    }

    #[tokio::test]
    async fn test_idle_repetition_in_search_scores_a_draw() {
        let game = CountingGame::with_goal(20);
        let analyzer = CountingAnalyzer::new([0.05, 0.05, 0.9]);
        let mut engine = SearchEngine::new(&game, &analyzer, stay_heavy_options()).unwrap();

        let (root, _, stats) = engine
            .search(&game.state(10), &[], &[], false)
            .await
            .unwrap();

        let stay = root.edges.iter().find(|e| *e.action() == CountingAction::Stay).unwrap();
        assert!(stay.n() > 0);
        assert_approx_eq!(stay.q(), 0.0);
        assert!(stats.repetitions >= stay.n() as usize);
    }

    #[tokio::test]
    async fn test_positions_from_the_game_history_score_a_draw() {
        let game = CountingGame::with_goal(20);
        let analyzer = CountingAnalyzer::new([0.05, 0.05, 0.9]);
        let mut engine = SearchEngine::new(&game, &analyzer, stay_heavy_options()).unwrap();
        let root = game.state(12);
        let history = vec![game.take_action(&root, &CountingAction::Stay)];

        let (root_snapshot, _, stats) = engine
            .search(&root, &history, &[], false)
            .await
            .unwrap();

        let stay = root_snapshot
            .edges
            .iter()
            .find(|e| *e.action() == CountingAction::Stay)
            .unwrap();
        assert!(stay.n() > 0);
        assert_approx_eq!(stay.q(), 0.0);
        assert!(stats.repetitions >= stay.n() as usize);
        assert!(engine.tree().get(&history[0]).is_none());
    }

    #[tokio::test]
    async fn test_boosted_exploration_samples_beyond_the_most_visited_move() {
        let game = CountingGame::with_goal(20);
        let analyzer = FixedValueAnalyzer { value: 0.0 };
        let state = game.state(10);
        let history = vec![game.state(1); 60];
        let mut sampled_elsewhere = 0;

        for seed in 0..20 {
            let options = SearchOptions {
                simulation_num_per_move: 60,
                search_threads: 1,
                noise_eps: 0.0,
                boosted_noise_eps: 0.25,
                boosted_temperature: 1.0,
                enable_resign: false,
                seed: Some(seed),
                ..SearchOptions::default()
            };

            for boosted in [false, true] {
                let mut engine = SearchEngine::new(&game, &analyzer, options.clone()).unwrap();
                let decision = engine
                    .decide_move(&state, &history, &[], boosted)
                    .await
                    .unwrap();

                let most_visited = decision
                    .visit_distribution
                    .iter()
                    .fold(None, |best: Option<&(CountingAction, f32)>, entry| match best {
                        Some(b) if b.1 >= entry.1 => Some(b),
                        _ => Some(entry),
                    })
                    .map(|(action, _)| *action);

                assert_eq!(decision.outcome, DecisionOutcome::Searched);

                if boosted {
                    if decision.action != most_visited {
                        sampled_elsewhere += 1;
                    }
                } else {
                    assert_eq!(decision.action, most_visited);
                }
            }
        }

        assert!(sampled_elsewhere > 0);
    }

    fn resign_options() -> SearchOptions {
        SearchOptions {
            simulation_num_per_move: 3,
            search_threads: 1,
            noise_eps: 0.0,
            boosted_noise_eps: 0.0,
            enable_resign: true,
            resign_threshold: -0.9,
            min_resign_ply: 0,
            seed: Some(3),
            ..SearchOptions::default()
        }
    }

    #[tokio::test]
    async fn test_resigns_after_two_low_decisions_by_the_same_side() {
        let game = CountingGame::with_goal(20);
        let analyzer = FixedValueAnalyzer { value: 0.95 };
        let mut engine = SearchEngine::new(&game, &analyzer, resign_options())
            .unwrap()
            .with_resign_exemption(NeverExempt);
        let state = game.state(5);
        let history = vec![game.state(2); 42];

        let first = engine.decide_move(&state, &history[..40], &[], false).await.unwrap();
        let other_side = engine.decide_move(&state, &history[..41], &[], false).await.unwrap();
        let second = engine.decide_move(&state, &history, &[], false).await.unwrap();

        assert_eq!(first.outcome, DecisionOutcome::Searched);
        assert!(first.metrics.children.iter().all(|c| c.q() < -0.9));
        assert_eq!(other_side.outcome, DecisionOutcome::Searched);
        assert_eq!(second.outcome, DecisionOutcome::Resigned);
        assert_eq!(second.action, None);
    }

    #[tokio::test]
    async fn test_exempt_games_never_resign() {
        let game = CountingGame::with_goal(20);
        let analyzer = FixedValueAnalyzer { value: 0.95 };
        let mut engine = SearchEngine::new(&game, &analyzer, resign_options())
            .unwrap()
            .with_resign_exemption(SampledExemption::new(1.0, StdRng::seed_from_u64(0)));
        let state = game.state(5);
        let history = vec![game.state(2); 50];

        for ply in (40..50).step_by(2) {
            let decision = engine
                .decide_move(&state, &history[..ply], &[], false)
                .await
                .unwrap();

            assert_eq!(decision.outcome, DecisionOutcome::Searched);
            assert!(decision.action.is_some());
        }
    }

    #[tokio::test]
    async fn test_evaluation_failure_aborts_the_decision() {
        let game = CountingGame::with_goal(20);
        let analyzer = FailingAfter::new(5);
        let mut engine = SearchEngine::new(&game, &analyzer, options(100, 4)).unwrap();

        let result = engine.decide_move(&game.state(10), &[], &[], false).await;

        assert_eq!(
            result,
            Err(SearchError::Evaluation(EvaluationError::Predictor(
                "device lost".to_string()
            )))
        );
        assert!(engine.tree().is_empty());
    }

    #[tokio::test]
    async fn test_failed_root_expansion_aborts_the_decision() {
        let game = CountingGame::with_goal(20);
        let analyzer = FailingAfter::new(0);
        let mut engine = SearchEngine::new(&game, &analyzer, options(10, 2)).unwrap();

        let result = engine.decide_move(&game.state(10), &[], &[], false).await;

        assert!(matches!(result, Err(SearchError::Evaluation(_))));
        assert!(engine.tree().is_empty());
    }

    #[tokio::test]
    async fn test_tree_reuse_carries_visits_forward() {
        let game = CountingGame::with_goal(20);
        let analyzer = CountingAnalyzer::new([0.3, 0.3, 0.4]);
        let options = SearchOptions {
            simulation_num_per_move: 100,
            search_threads: 2,
            tree_reuse: true,
            ..SearchOptions::evaluation()
        };
        let mut engine = SearchEngine::new(&game, &analyzer, options).unwrap();
        let state = game.state(7);

        let first = engine.decide_move(&state, &[], &[], false).await.unwrap();
        let action = first.action.unwrap();
        let next = game.take_action(&state, &action);

        let carried = engine.tree().get(&next).map(|node| node.total_visits());
        assert!(carried.is_some());

        let second = engine.decide_move(&next, &[state], &[], false).await.unwrap();

        assert_eq!(second.metrics.visits as u64, carried.unwrap() + 100);
        for (_, node) in engine.tree().iter_nodes() {
            assert_eq!(node.total_visits, node.sum_of_visits());
        }
    }

    #[tokio::test]
    async fn test_reset_clears_the_tree() {
        let game = CountingGame::with_goal(20);
        let analyzer = CountingAnalyzer::new([0.3, 0.3, 0.4]);
        let options = SearchOptions {
            tree_reuse: true,
            ..options(50, 2)
        };
        let mut engine = SearchEngine::new(&game, &analyzer, options).unwrap();

        engine.decide_move(&game.state(7), &[], &[], false).await.unwrap();
        assert!(!engine.tree().is_empty());

        engine.reset();
        assert!(engine.tree().is_empty());
    }
}
