use super::edge::ActionStats;

/// Adjustments that apply to the root of a single move decision only.
#[derive(Clone, Debug, PartialEq)]
pub struct RootSelection {
    /// Priors used in place of the node's own, such as priors mixed with exploration noise.
    pub priors: Vec<f32>,
    /// Whether each edge may be selected during this decision.
    pub allowed: Vec<bool>,
}

impl RootSelection {
    pub fn new(priors: Vec<f32>, allowed: Vec<bool>) -> Self {
        assert_eq!(priors.len(), allowed.len(), "Every edge needs a prior and a mask");
        Self { priors, allowed }
    }

    pub fn is_allowed(&self, edge_index: usize) -> bool {
        self.allowed.get(edge_index).copied().unwrap_or(false)
    }
}

pub fn puct_score(q: f64, n: u32, prior: f32, sqrt_total_visits: f64, c_puct: f32) -> f64 {
    q + c_puct as f64 * prior as f64 * sqrt_total_visits / (1.0 + n as f64)
}

/// Returns the index of the edge maximizing `q + c_puct * p * sqrt(total_visits) / (1 + n)`.
///
/// Edges are scanned in canonical action order and only a strictly greater score replaces the
/// current best, so ties resolve to the earliest action. `total_visits` is floored at one so the
/// priors order the choice at a node that has not been visited yet.
pub fn select_edge<A>(
    edges: &[ActionStats<A>],
    total_visits: u64,
    c_puct: f32,
    root: Option<&RootSelection>,
) -> Option<usize> {
    let sqrt_total_visits = (total_visits.max(1) as f64).sqrt();
    let mut best: Option<(usize, f64)> = None;

    for (edge_index, edge) in edges.iter().enumerate() {
        let prior = match root {
            Some(root) if !root.is_allowed(edge_index) => continue,
            Some(root) => root.priors[edge_index],
            None => edge.prior(),
        };

        let score = puct_score(edge.q(), edge.n(), prior, sqrt_total_visits, c_puct);

        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((edge_index, score));
        }
    }

    best.map(|(edge_index, _)| edge_index)
}
