/// Visit statistics of a single action out of a node.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionStats<A> {
    action: A,
    prior: f32,
    n: u32,
    w: f64,
    q: f64,
}

impl<A> ActionStats<A> {
    pub fn new(action: A, prior: f32) -> Self {
        Self {
            action,
            prior,
            n: 0,
            w: 0.0,
            q: 0.0,
        }
    }

    pub fn action(&self) -> &A {
        &self.action
    }

    pub fn prior(&self) -> f32 {
        self.prior
    }

    pub fn n(&self) -> u32 {
        self.n
    }

    pub fn w(&self) -> f64 {
        self.w
    }

    /// Mean value for the player choosing this action. Only meaningful once `n > 0`.
    pub fn q(&self) -> f64 {
        self.q
    }

    pub(crate) fn add_virtual_loss(&mut self, virtual_loss: u32) {
        self.n += virtual_loss;
        self.w -= virtual_loss as f64;
        self.update_q();
    }

    pub(crate) fn remove_virtual_loss(&mut self, virtual_loss: u32) {
        assert!(
            self.n >= virtual_loss,
            "Virtual loss removed from an edge that never received it"
        );
        self.n -= virtual_loss;
        self.w += virtual_loss as f64;
        self.update_q();
    }

    pub(crate) fn add_visit(&mut self, value: f32) {
        self.n += 1;
        self.w += value as f64;
        self.update_q();
    }

    fn update_q(&mut self) {
        self.q = if self.n == 0 {
            0.0
        } else {
            self.w / self.n as f64
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_virtual_loss_lowers_q_until_removed() {
        let mut edge = ActionStats::new('a', 0.5);
        edge.add_visit(0.5);

        edge.add_virtual_loss(3);
        assert_eq!(edge.n(), 4);
        assert_approx_eq!(edge.q(), -2.5 / 4.0);

        edge.remove_virtual_loss(3);
        edge.add_visit(0.25);
        assert_eq!(edge.n(), 2);
        assert_approx_eq!(edge.w(), 0.75);
        assert_approx_eq!(edge.q(), 0.375);
    }

    #[test]
    #[should_panic(expected = "never received it")]
    fn test_removing_unapplied_virtual_loss_panics() {
        let mut edge = ActionStats::new('a', 0.5);
        edge.remove_virtual_loss(3);
    }
}
