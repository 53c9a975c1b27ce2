use anyhow::Result;
use engine::GameRules;
use futures::stream::{FuturesUnordered, StreamExt};
use log::{info, warn};
use model::GameAnalyzer;
use std::time::Instant;
use tokio::sync::mpsc::Sender;

use super::{play_self_one, SelfPlayMetrics, SelfPlayOptions};

/// Plays `num_games` games, keeping `self_play_parallelism` of them in flight against the shared
/// analyzer, and sends each finished game through `results_tx`.
///
/// Returns the number of games played. The first failed game stops the run.
pub async fn play_self<R, M>(
    num_games: usize,
    rules: &R,
    analyzer: &M,
    options: &SelfPlayOptions,
    results_tx: Sender<SelfPlayMetrics<R::State, R::Action>>,
) -> Result<usize>
where
    R: GameRules,
    M: GameAnalyzer<State = R::State>,
{
    let starting_run_time = Instant::now();
    let mut self_play_metric_stream = FuturesUnordered::new();
    let mut num_of_games_started = 0;
    let mut num_of_games_played = 0;

    let play_game = |game_index: usize| {
        let seed = options
            .search
            .seed
            .map(|seed| seed.wrapping_add(game_index as u64));

        play_self_one(rules, analyzer, options, seed)
    };

    while num_of_games_started < num_games.min(options.self_play_parallelism.max(1)) {
        self_play_metric_stream.push(play_game(num_of_games_started));
        num_of_games_started += 1;
    }

    while let Some(self_play_metric) = self_play_metric_stream.next().await {
        let self_play_metric = self_play_metric?;
        num_of_games_played += 1;

        info!(
            "Number of Plies: {}, Score: {}, End: {:?}, Number of Games Played: {}, GPM: {:.2}",
            self_play_metric.plies().len(),
            self_play_metric.outcome(),
            self_play_metric.end(),
            num_of_games_played,
            num_of_games_played as f32 / starting_run_time.elapsed().as_secs_f32() * 60_f32
        );

        if let Err(e) = results_tx.send(self_play_metric).await {
            warn!("Failed to send game results through writer channel. {}", e);
        }

        if num_of_games_started < num_games {
            self_play_metric_stream.push(play_game(num_of_games_started));
            num_of_games_started += 1;
        }
    }

    Ok(num_of_games_played)
}
