use anyhow::{Context, Result};
use common::{Config, ConfigLoader};
use mcts::SearchOptions;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SelfPlayOptions {
    pub search: SearchOptions,
    /// Games reaching this many full moves are drawn.
    pub max_game_length: usize,
    /// Consecutive plies without a capture after which the game is drawn.
    pub no_capture_draw_plies: usize,
    /// Idle repetitions of a position after which the game is drawn.
    pub idle_repetition_draw: usize,
    pub self_play_parallelism: usize,
}

impl Default for SelfPlayOptions {
    fn default() -> Self {
        Self {
            search: SearchOptions::default(),
            max_game_length: 200,
            no_capture_draw_plies: 120,
            idle_repetition_draw: 3,
            self_play_parallelism: 8,
        }
    }
}

impl Config for SelfPlayOptions {
    fn load(config: &ConfigLoader) -> Result<Self> {
        let default = Self::default();

        Ok(Self {
            search: config
                .scoped("search")
                .load()
                .context("Failed to load search options")?,
            max_game_length: config
                .get("max_game_length")
                .and_then(|v| v.as_usize())
                .unwrap_or(default.max_game_length),
            no_capture_draw_plies: config
                .get("no_capture_draw_plies")
                .and_then(|v| v.as_usize())
                .unwrap_or(default.no_capture_draw_plies),
            idle_repetition_draw: config
                .get("idle_repetition_draw")
                .and_then(|v| v.as_usize())
                .unwrap_or(default.idle_repetition_draw),
            self_play_parallelism: config
                .get("self_play_parallelism")
                .and_then(|v| v.as_usize())
                .unwrap_or(default.self_play_parallelism)
                .max(1),
        })
    }
}
