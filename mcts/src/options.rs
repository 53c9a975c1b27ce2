use anyhow::Result;
use common::{Config, ConfigLoader};
use serde::{Deserialize, Serialize};

use super::error::SearchError;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SearchOptions {
    pub simulation_num_per_move: usize,
    pub c_puct: f32,
    /// Number of simulations in flight at once against the shared tree.
    pub search_threads: usize,
    pub virtual_loss: u32,
    pub noise_eps: f32,
    pub dirichlet_alpha: f32,
    pub tau_decay_rate: f32,
    pub boosted_temperature: f32,
    pub boosted_noise_eps: f32,
    pub enable_resign: bool,
    pub resign_threshold: f32,
    pub resign_exempt_rate: f32,
    pub min_resign_ply: usize,
    /// Keep the subtree under the chosen move for the next decision instead of rebuilding it.
    pub tree_reuse: bool,
    pub seed: Option<u64>,
}

impl SearchOptions {
    /// Settings for competitive play: no root noise, always the most visited move, no resignation.
    pub fn evaluation() -> Self {
        Self {
            noise_eps: 0.0,
            tau_decay_rate: 0.0,
            boosted_noise_eps: 0.0,
            boosted_temperature: 0.0,
            enable_resign: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        let invalid = |msg: &str| Err(SearchError::InvalidOptions(msg.to_string()));

        if self.simulation_num_per_move == 0 {
            return invalid("simulation_num_per_move must be positive");
        }

        if self.search_threads == 0 {
            return invalid("search_threads must be positive");
        }

        if !(self.c_puct >= 0.0) {
            return invalid("c_puct must not be negative");
        }

        let in_unit_range = |v: f32| (0.0..=1.0).contains(&v);
        if !in_unit_range(self.noise_eps) || !in_unit_range(self.boosted_noise_eps) {
            return invalid("noise weights must lie in [0, 1]");
        }

        if (self.noise_eps > 0.0 || self.boosted_noise_eps > 0.0) && !(self.dirichlet_alpha > 0.0)
        {
            return invalid("dirichlet_alpha must be positive when noise is enabled");
        }

        if !in_unit_range(self.tau_decay_rate) {
            return invalid("tau_decay_rate must lie in [0, 1]");
        }

        if !(self.boosted_temperature >= 0.0) {
            return invalid("boosted_temperature must not be negative");
        }

        if !in_unit_range(self.resign_exempt_rate) {
            return invalid("resign_exempt_rate must lie in [0, 1]");
        }

        Ok(())
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            simulation_num_per_move: 800,
            c_puct: 1.5,
            search_threads: 16,
            virtual_loss: 3,
            noise_eps: 0.25,
            dirichlet_alpha: 0.2,
            tau_decay_rate: 0.9,
            boosted_temperature: 1.0,
            boosted_noise_eps: 0.25,
            enable_resign: true,
            resign_threshold: -0.98,
            resign_exempt_rate: 0.1,
            min_resign_ply: 40,
            tree_reuse: false,
            seed: None,
        }
    }
}

impl Config for SearchOptions {
    fn load(config: &ConfigLoader) -> Result<Self> {
        let default = Self::default();
        let usize_or = |name: &str, default: usize| {
            config.get(name).and_then(|v| v.as_usize()).unwrap_or(default)
        };
        let f32_or = |name: &str, default: f32| {
            config.get(name).and_then(|v| v.as_f32()).unwrap_or(default)
        };
        let bool_or = |name: &str, default: bool| {
            config.get(name).and_then(|v| v.as_bool()).unwrap_or(default)
        };

        let options = Self {
            simulation_num_per_move: usize_or(
                "simulation_num_per_move",
                default.simulation_num_per_move,
            ),
            c_puct: f32_or("c_puct", default.c_puct),
            search_threads: usize_or("search_threads", default.search_threads),
            virtual_loss: config
                .get("virtual_loss")
                .and_then(|v| v.as_u64())
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(default.virtual_loss),
            noise_eps: f32_or("noise_eps", default.noise_eps),
            dirichlet_alpha: f32_or("dirichlet_alpha", default.dirichlet_alpha),
            tau_decay_rate: f32_or("tau_decay_rate", default.tau_decay_rate),
            boosted_temperature: f32_or("boosted_temperature", default.boosted_temperature),
            boosted_noise_eps: f32_or("boosted_noise_eps", default.boosted_noise_eps),
            enable_resign: bool_or("enable_resign", default.enable_resign),
            resign_threshold: f32_or("resign_threshold", default.resign_threshold),
            resign_exempt_rate: f32_or("resign_exempt_rate", default.resign_exempt_rate),
            min_resign_ply: usize_or("min_resign_ply", default.min_resign_ply),
            tree_reuse: bool_or("tree_reuse", default.tree_reuse),
            seed: config.get("seed").and_then(|v| v.as_u64()),
        };

        options.validate()?;

        Ok(options)
    }
}
