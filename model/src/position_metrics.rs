use serde::{Deserialize, Serialize};

use super::node_metrics::NodeMetrics;

/// A single training sample: a canonical state, the search policy and the eventual result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionMetrics<S, A> {
    pub game_state: S,
    /// Game result from the perspective of the player to move in `game_state`.
    pub score: f32,
    pub policy: NodeMetrics<A>,
}
