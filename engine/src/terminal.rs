/// The rule-based result of a finished position.
#[derive(Clone, Debug, PartialEq)]
pub struct Terminal<A> {
    /// The result in [-1, 1] for the player to move in the terminal position.
    pub outcome: f32,
    /// A move that concludes the game, such as capturing the exposed general.
    pub special_action: Option<A>,
}

impl<A> Terminal<A> {
    pub fn win() -> Self {
        Self::new(1.0, None)
    }

    pub fn loss() -> Self {
        Self::new(-1.0, None)
    }

    pub fn draw() -> Self {
        Self::new(0.0, None)
    }

    pub fn new(outcome: f32, special_action: Option<A>) -> Self {
        Self {
            outcome,
            special_action,
        }
    }
}
