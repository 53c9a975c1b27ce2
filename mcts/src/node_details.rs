use std::cmp::Ordering;
use std::fmt::{self, Debug, Display, Formatter};

/// A readable breakdown of a node's selection scores, most promising child first.
pub struct NodeDetails<A> {
    pub visits: usize,
    pub value: f32,
    pub children: Vec<(A, PUCT)>,
}

impl<A: Debug> Display for NodeDetails<A> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let actions = format!(
            "[{}]",
            self.children
                .iter()
                .fold(String::new(), |acc, (a, puct)| acc
                    + &format!("\n\t(A: {:?}, {}),", a, puct))
        );

        write!(
            f,
            "V: {visits}, Value: {value:.3}, Actions: {actions}",
            visits = self.visits,
            value = self.value,
            actions = actions
        )
    }
}

impl<A: Debug> Debug for NodeDetails<A> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(self, f)
    }
}

#[derive(PartialEq)]
#[allow(non_snake_case)]
pub struct PUCT {
    pub Nsa: usize,
    pub Qsa: f32,
    pub Psa: f32,
    pub Usa: f32,
    pub cpuct: f32,
    pub PUCT: f32,
}

impl Display for PUCT {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "Nsa: {Nsa}, Qsa: {Qsa:.3}, Psa: {Psa:.3}, Usa: {Usa:.2}, cpuct: {cpuct:.2}, PUCT: {PUCT:.3}",
            Nsa = self.Nsa,
            Qsa = self.Qsa,
            Psa = self.Psa,
            Usa = self.Usa,
            cpuct = self.cpuct,
            PUCT = self.PUCT,
        )
    }
}

impl Debug for PUCT {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Ord for PUCT {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.Nsa, &self.Qsa, &self.Psa, &self.Usa).partial_cmp(&(
            other.Nsa,
            &other.Qsa,
            &other.Psa,
            &other.Usa,
        )) {
            Some(ordering) => ordering,
            None => {
                panic!(
                    "Could not compare: {:?} to {:?}",
                    (self.Nsa, &self.Qsa, &self.Psa, &self.Usa),
                    (other.Nsa, &other.Qsa, &other.Psa, &other.Usa)
                );
            }
        }
    }
}

impl PartialOrd for PUCT {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for PUCT {}
