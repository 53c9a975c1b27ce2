use log::warn;
use rand::Rng;
use rand_distr::{Dirichlet, Distribution};

/// Mixes Dirichlet noise into the priors of the allowed actions.
///
/// Disallowed actions keep their prior. Nothing changes when `epsilon` is zero or fewer than two
/// actions are allowed.
pub fn apply_dirichlet_noise<R: Rng>(
    priors: &[f32],
    allowed: &[bool],
    alpha: f32,
    epsilon: f32,
    rng: &mut R,
) -> Vec<f32> {
    let num_allowed = allowed.iter().filter(|a| **a).count();

    if epsilon <= 0.0 || num_allowed < 2 {
        return priors.to_vec();
    }

    let dirichlet = match Dirichlet::new_with_size(alpha, num_allowed) {
        Ok(dirichlet) => dirichlet,
        Err(err) => {
            warn!("Skipping root noise, alpha {} is invalid: {}", alpha, err);
            return priors.to_vec();
        }
    };

    let mut noise = dirichlet.sample(rng).into_iter();

    priors
        .iter()
        .zip(allowed)
        .map(|(prior, allowed)| {
            if !*allowed {
                return *prior;
            }

            noise
                .next()
                .map_or(*prior, |noise| (1.0 - epsilon) * prior + epsilon * noise)
        })
        .collect()
}
