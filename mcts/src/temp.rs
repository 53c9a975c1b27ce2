use log::warn;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Temperatures below this are treated as zero, selecting the most visited action.
pub const MIN_TEMPERATURE: f32 = 0.1;

/// Temperature that decays geometrically with the ply of the game.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemperatureDecay {
    pub decay_rate: f32,
    pub boosted_temperature: f32,
}

impl TemperatureDecay {
    pub fn new(decay_rate: f32, boosted_temperature: f32) -> Self {
        Self {
            decay_rate,
            boosted_temperature,
        }
    }

    pub fn temperature(&self, ply: usize, boosted: bool) -> f32 {
        let temperature = self.decay_rate.powf((ply + 1) as f32);
        let temperature = if temperature < MIN_TEMPERATURE {
            0.0
        } else {
            temperature
        };

        if boosted {
            temperature.max(self.boosted_temperature)
        } else {
            temperature
        }
    }
}

/// Visit counts raised to `1 / temperature` and normalized to sum to one.
///
/// A temperature of zero puts all the mass on the first most visited action. All zero visits
/// produce all zero probabilities.
pub fn visit_probabilities(visits: &[u32], temperature: f32) -> Vec<f32> {
    let max_visits = visits.iter().copied().max().unwrap_or(0);
    if max_visits == 0 {
        return vec![0.0; visits.len()];
    }

    if temperature == 0.0 {
        let best = argmax(visits.iter().copied().enumerate());
        return (0..visits.len())
            .map(|i| if Some(i) == best { 1.0 } else { 0.0 })
            .collect();
    }

    let weights: Vec<f64> = visits
        .iter()
        .map(|n| weight(*n, max_visits, temperature))
        .collect();
    let total: f64 = weights.iter().sum();

    weights.iter().map(|w| (w / total) as f32).collect()
}

/// Samples the index of an allowed action from `visits ^ (1 / temperature)`.
///
/// Returns `None` when no action is allowed. When none of the allowed actions were visited an
/// allowed action is picked uniformly.
pub fn select_by_temperature<R: Rng>(
    visits: &[u32],
    allowed: &[bool],
    temperature: f32,
    rng: &mut R,
) -> Option<usize> {
    let candidates: Vec<usize> = (0..visits.len()).filter(|i| allowed[*i]).collect();
    if candidates.is_empty() {
        return None;
    }

    let max_visits = candidates.iter().map(|i| visits[*i]).max().unwrap_or(0);
    if max_visits == 0 {
        warn!(
            "No visits among {} allowed actions. Move will be randomly selected.",
            candidates.len()
        );
        return Some(candidates[rng.gen_range(0..candidates.len())]);
    }

    if temperature == 0.0 {
        return argmax(candidates.iter().map(|i| (*i, visits[*i])));
    }

    let weights = candidates
        .iter()
        .map(|i| weight(visits[*i], max_visits, temperature));

    match WeightedIndex::new(weights) {
        Ok(weighted_index) => Some(candidates[weighted_index.sample(rng)]),
        Err(err) => {
            warn!(
                "Invalid visit weights ({}). Move will be randomly selected. {:?}",
                err, visits
            );
            Some(candidates[rng.gen_range(0..candidates.len())])
        }
    }
}

fn weight(visits: u32, max_visits: u32, temperature: f32) -> f64 {
    let relative = visits as f64 / max_visits as f64;

    if temperature == 1.0 {
        relative
    } else {
        relative.powf(1.0 / temperature as f64)
    }
}

/// First index with the most visits.
fn argmax(visits: impl Iterator<Item = (usize, u32)>) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;

    for (i, n) in visits {
        if best.map_or(true, |(_, best_n)| n > best_n) {
            best = Some((i, n));
        }
    }

    best.map(|(i, _)| i)
}
