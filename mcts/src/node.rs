use futures_intrusive::sync::ManualResetEvent;
use model::{EdgeMetrics, EvaluationError, NodeMetrics};
use parking_lot::Mutex;

use super::edge::ActionStats;
use super::node_details::{NodeDetails, PUCT};
use super::selection::{puct_score, select_edge, RootSelection};

#[derive(Clone, Debug, PartialEq)]
pub enum ExpansionStatus {
    Pending,
    Expanded,
    Failed(EvaluationError),
}

/// Statistics of a single canonical state within a search tree.
///
/// A node starts out pending. Exactly one worker completes or fails its expansion, which also wakes
/// every worker waiting on it. All statistics are guarded by a node level lock that is never held
/// across an await.
pub struct VisitState<A> {
    stats: Mutex<NodeStats<A>>,
    expansion: ManualResetEvent,
    virtual_loss: u32,
}

#[derive(Debug)]
struct NodeStats<A> {
    status: ExpansionStatus,
    total_visits: u64,
    value: f32,
    edges: Vec<ActionStats<A>>,
}

/// A consistent copy of a node's statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeSnapshot<A> {
    pub status: ExpansionStatus,
    pub total_visits: u64,
    pub value: f32,
    pub edges: Vec<ActionStats<A>>,
}

impl<A> VisitState<A> {
    pub fn pending(virtual_loss: u32) -> Self {
        Self {
            stats: Mutex::new(NodeStats {
                status: ExpansionStatus::Pending,
                total_visits: 0,
                value: 0.0,
                edges: Vec::new(),
            }),
            expansion: ManualResetEvent::new(false),
            virtual_loss,
        }
    }

    pub fn status(&self) -> ExpansionStatus {
        self.stats.lock().status.clone()
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self.stats.lock().status, ExpansionStatus::Expanded)
    }

    pub fn total_visits(&self) -> u64 {
        self.stats.lock().total_visits
    }

    /// Value of the state for its player to move, recorded at expansion.
    pub fn value(&self) -> f32 {
        self.stats.lock().value
    }

    pub fn priors(&self) -> Vec<f32> {
        self.stats.lock().edges.iter().map(|e| e.prior()).collect()
    }

    /// Installs the edges and value of a pending node and wakes its waiters.
    ///
    /// `edges` must be sorted by action.
    pub fn complete_expansion(&self, edges: Vec<(A, f32)>, value: f32) {
        {
            let mut stats = self.stats.lock();
            assert!(
                matches!(stats.status, ExpansionStatus::Pending),
                "Node expanded twice"
            );

            stats.edges = edges
                .into_iter()
                .map(|(action, prior)| ActionStats::new(action, prior))
                .collect();
            stats.value = value;
            stats.status = ExpansionStatus::Expanded;
        }

        self.expansion.set();
    }

    pub fn fail_expansion(&self, err: EvaluationError) {
        {
            let mut stats = self.stats.lock();
            assert!(
                matches!(stats.status, ExpansionStatus::Pending),
                "Failed expansion of a node that is not pending"
            );
            stats.status = ExpansionStatus::Failed(err);
        }

        self.expansion.set();
    }

    /// Resolves once the node is no longer pending.
    pub async fn wait_for_expansion(&self) -> ExpansionStatus {
        self.expansion.wait().await;
        self.status()
    }

    /// Picks the edge with the highest PUCT score and applies virtual loss to it, as one atomic step.
    ///
    /// Returns `None` when no edge is selectable.
    pub fn select_and_apply_virtual_loss(
        &self,
        c_puct: f32,
        root: Option<&RootSelection>,
    ) -> Option<(usize, A)>
    where
        A: Clone,
    {
        let mut stats = self.stats.lock();
        stats.assert_expanded();

        let edge_index = select_edge(&stats.edges, stats.total_visits, c_puct, root)?;
        stats.add_virtual_loss(edge_index, self.virtual_loss);

        Some((edge_index, stats.edges[edge_index].action().clone()))
    }

    pub fn apply_virtual_loss_at(&self, edge_index: usize) {
        let mut stats = self.stats.lock();
        stats.assert_expanded();
        stats.add_virtual_loss(edge_index, self.virtual_loss);
    }

    /// Reverts the virtual loss previously applied to the edge and records a real visit of `value`.
    pub fn backup_at(&self, edge_index: usize, value: f32) {
        let mut stats = self.stats.lock();
        stats.assert_expanded();
        stats.remove_virtual_loss(edge_index, self.virtual_loss);
        stats.total_visits += 1;
        stats.edges[edge_index].add_visit(value);
    }

    /// Reverts the virtual loss previously applied to the edge without recording a visit.
    pub fn revert_virtual_loss_at(&self, edge_index: usize) {
        let mut stats = self.stats.lock();
        stats.remove_virtual_loss(edge_index, self.virtual_loss);
    }

    pub fn snapshot(&self) -> NodeSnapshot<A>
    where
        A: Clone,
    {
        let stats = self.stats.lock();

        NodeSnapshot {
            status: stats.status.clone(),
            total_visits: stats.total_visits,
            value: stats.value,
            edges: stats.edges.clone(),
        }
    }
}

impl<A> VisitState<A>
where
    A: Ord,
{
    pub fn edge_index(&self, action: &A) -> Option<usize> {
        self.stats
            .lock()
            .edges
            .binary_search_by(|e| e.action().cmp(action))
            .ok()
    }
}

impl<A> NodeStats<A> {
    fn assert_expanded(&self) {
        assert!(
            matches!(self.status, ExpansionStatus::Expanded),
            "Node statistics accessed before expansion: {:?}",
            self.status
        );
    }

    fn edge_mut(&mut self, edge_index: usize) -> &mut ActionStats<A> {
        let num_edges = self.edges.len();
        self.edges.get_mut(edge_index).unwrap_or_else(|| {
            panic!(
                "Edge {} does not exist on a node with {} edges",
                edge_index, num_edges
            )
        })
    }

    fn add_virtual_loss(&mut self, edge_index: usize, virtual_loss: u32) {
        self.edge_mut(edge_index).add_virtual_loss(virtual_loss);
        self.total_visits += virtual_loss as u64;
    }

    fn remove_virtual_loss(&mut self, edge_index: usize, virtual_loss: u32) {
        self.edge_mut(edge_index).remove_virtual_loss(virtual_loss);
        self.total_visits -= virtual_loss as u64;
    }
}

impl<A> NodeSnapshot<A> {
    pub fn sum_of_visits(&self) -> u64 {
        self.edges.iter().map(|e| e.n() as u64).sum()
    }

    pub fn to_metrics(&self) -> NodeMetrics<A>
    where
        A: Clone,
    {
        NodeMetrics {
            visits: self.total_visits as usize,
            value: self.value,
            children: self
                .edges
                .iter()
                .map(|e| EdgeMetrics::new(e.action().clone(), e.n() as usize, e.q() as f32, e.prior()))
                .collect(),
        }
    }

    pub fn to_details(&self, c_puct: f32) -> NodeDetails<A>
    where
        A: Clone,
    {
        let sqrt_total = (self.total_visits.max(1) as f64).sqrt();

        let mut children: Vec<_> = self
            .edges
            .iter()
            .map(|e| {
                let usa = c_puct as f64 * e.prior() as f64 * sqrt_total / (1.0 + e.n() as f64);
                let puct = PUCT {
                    Nsa: e.n() as usize,
                    Qsa: e.q() as f32,
                    Psa: e.prior(),
                    Usa: usa as f32,
                    cpuct: c_puct,
                    PUCT: puct_score(e.q(), e.n(), e.prior(), sqrt_total, c_puct) as f32,
                };
                (e.action().clone(), puct)
            })
            .collect();

        children.sort_by(|(_, a), (_, b)| b.cmp(a));

        NodeDetails {
            visits: self.total_visits as usize,
            value: self.value,
            children,
        }
    }
}
