use rand::rngs::StdRng;
use rand::Rng;

/// Number of consecutive decisions by the same side below the threshold before resigning.
pub const RESIGN_CONSECUTIVE_DECISIONS: usize = 2;

/// Decides which decisions may not resign regardless of the position's value.
///
/// Exempt games play on so the rate of false resignations stays measurable.
pub trait ResignExemption: Send {
    /// Asked whenever a decision would otherwise resign.
    fn is_exempt(&mut self, ply: usize) -> bool;

    /// Called when a new game starts.
    fn reset(&mut self) {}
}

/// Exempts whole games, each with probability `rate`.
pub struct SampledExemption {
    rate: f32,
    rng: StdRng,
    exempt: bool,
}

impl SampledExemption {
    pub fn new(rate: f32, rng: StdRng) -> Self {
        let mut exemption = Self {
            rate,
            rng,
            exempt: false,
        };
        exemption.reset();
        exemption
    }

    pub fn exempt(&self) -> bool {
        self.exempt
    }
}

impl ResignExemption for SampledExemption {
    fn is_exempt(&mut self, _ply: usize) -> bool {
        self.exempt
    }

    fn reset(&mut self) {
        self.exempt = self.rng.gen::<f32>() < self.rate;
    }
}

pub struct NeverExempt;

impl ResignExemption for NeverExempt {
    fn is_exempt(&mut self, _ply: usize) -> bool {
        false
    }
}

/// Tracks, per side, how many consecutive decisions found the best root value below the threshold.
#[derive(Clone, Debug)]
pub struct ResignTracker {
    threshold: f32,
    min_ply: usize,
    streaks: [usize; 2],
}

impl ResignTracker {
    pub fn new(threshold: f32, min_ply: usize) -> Self {
        Self {
            threshold,
            min_ply,
            streaks: [0; 2],
        }
    }

    /// Records the best root value of the decision at `ply`, returning whether the mover should
    /// resign. `None` means no allowed action was visited.
    pub fn observe(&mut self, ply: usize, best_value: Option<f32>) -> bool {
        if ply < self.min_ply {
            return false;
        }

        let streak = &mut self.streaks[ply % 2];
        match best_value {
            Some(value) if value < self.threshold => *streak += 1,
            _ => *streak = 0,
        }

        *streak >= RESIGN_CONSECUTIVE_DECISIONS
    }

    pub fn reset(&mut self) {
        self.streaks = [0; 2];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_resigns_after_consecutive_low_decisions_by_one_side() {
        let mut tracker = ResignTracker::new(-0.9, 0);

        assert!(!tracker.observe(10, Some(-0.95)));
        assert!(!tracker.observe(11, Some(0.95)));
        assert!(tracker.observe(12, Some(-0.95)));
    }

    #[test]
    fn test_a_recovered_value_resets_the_streak() {
        let mut tracker = ResignTracker::new(-0.9, 0);

        assert!(!tracker.observe(10, Some(-0.95)));
        assert!(!tracker.observe(12, Some(-0.5)));
        assert!(!tracker.observe(14, Some(-0.95)));
        assert!(!tracker.observe(16, None));
        assert!(!tracker.observe(18, Some(-0.95)));
    }

    #[test]
    fn test_no_resignation_before_min_ply() {
        let mut tracker = ResignTracker::new(-0.9, 40);

        assert!(!tracker.observe(36, Some(-1.0)));
        assert!(!tracker.observe(38, Some(-1.0)));
        assert!(!tracker.observe(40, Some(-1.0)));
        assert!(tracker.observe(42, Some(-1.0)));
    }

    #[test]
    fn test_sampled_exemption_extremes() {
        let mut always = SampledExemption::new(1.0, StdRng::seed_from_u64(0));
        let mut never = SampledExemption::new(0.0, StdRng::seed_from_u64(0));

        for _ in 0..10 {
            assert!(always.is_exempt(50));
            assert!(!never.is_exempt(50));
            always.reset();
            never.reset();
        }

        assert!(!NeverExempt.is_exempt(50));
    }
}
