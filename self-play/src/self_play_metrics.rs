use model::{NodeMetrics, PositionMetrics};
use serde::{Deserialize, Serialize};

/// Why a self-play game stopped.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameEnd {
    Terminal,
    Resigned,
    NoLegalActions,
    NoCaptureLimit,
    MaxGameLength,
    NoAttackingPieces,
    IdleRepetition,
}

impl GameEnd {
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            GameEnd::NoCaptureLimit
                | GameEnd::MaxGameLength
                | GameEnd::NoAttackingPieces
                | GameEnd::IdleRepetition
        )
    }
}

/// A move played during self-play together with the search that chose it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlyRecord<S, A> {
    pub state: S,
    pub action: A,
    pub metrics: NodeMetrics<A>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SelfPlayMetrics<S, A> {
    plies: Vec<PlyRecord<S, A>>,
    /// Result from the perspective of the player who moved first.
    outcome: f32,
    end: GameEnd,
}

impl<S, A> SelfPlayMetrics<S, A> {
    pub fn new(plies: Vec<PlyRecord<S, A>>, outcome: f32, end: GameEnd) -> Self {
        Self {
            plies,
            outcome,
            end,
        }
    }

    pub fn plies(&self) -> &[PlyRecord<S, A>] {
        &self.plies
    }

    pub fn outcome(&self) -> f32 {
        self.outcome
    }

    pub fn end(&self) -> GameEnd {
        self.end
    }

    /// The game result for the player to move at `ply`.
    pub fn value_for_ply(&self, ply: usize) -> f32 {
        if ply % 2 == 0 {
            self.outcome
        } else {
            -self.outcome
        }
    }

    /// Training samples, one per ply, each scored for its player to move.
    pub fn into_positions(self) -> Vec<PositionMetrics<S, A>> {
        let outcome = self.outcome;

        self.plies
            .into_iter()
            .enumerate()
            .map(|(ply, record)| PositionMetrics {
                game_state: record.state,
                score: if ply % 2 == 0 { outcome } else { -outcome },
                policy: record.metrics,
            })
            .collect()
    }
}
