use std::fmt::Debug;
use std::hash::Hash;

/// Maps a value between the two players' perspectives.
///
/// Implementations must be involutions: `x.flip().flip() == x`.
pub trait Flip {
    fn flip(&self) -> Self;
}

/// A position normalized to the perspective of the player to move.
pub trait GameState: Hash + Eq + Clone + Debug + Flip {}

impl<T> GameState for T where T: Hash + Eq + Clone + Debug + Flip {}

/// Actions are totally ordered. The ordering is the canonical order used to break ties.
pub trait GameAction: Ord + Hash + Clone + Debug + Flip {}

impl<T> GameAction for T where T: Ord + Hash + Clone + Debug + Flip {}
