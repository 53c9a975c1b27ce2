use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use engine::GameRules;
use std::collections::{HashSet, VecDeque};
use std::hash::Hash;
use std::sync::Arc;

use super::node::{NodeSnapshot, VisitState};

/// Visit statistics of every canonical state reached during a search, shared by all workers.
pub struct SearchTree<S, A> {
    nodes: DashMap<S, Arc<VisitState<A>>>,
    virtual_loss: u32,
}

impl<S, A> SearchTree<S, A>
where
    S: Hash + Eq + Clone,
{
    pub fn new(virtual_loss: u32) -> Self {
        Self {
            nodes: DashMap::new(),
            virtual_loss,
        }
    }

    pub fn virtual_loss(&self) -> u32 {
        self.virtual_loss
    }

    /// Returns the node of `state`, inserting a pending one if the state has not been seen.
    ///
    /// The second value is `true` for exactly one caller per state, which is then responsible for
    /// completing or failing the expansion.
    pub fn get_or_init(&self, state: &S) -> (Arc<VisitState<A>>, bool) {
        if let Some(node) = self.nodes.get(state) {
            return (node.clone(), false);
        }

        match self.nodes.entry(state.clone()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let node = Arc::new(VisitState::pending(self.virtual_loss));
                entry.insert(node.clone());
                (node, true)
            }
        }
    }

    pub fn get(&self, state: &S) -> Option<Arc<VisitState<A>>> {
        self.nodes.get(state).map(|node| node.clone())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&self) {
        self.nodes.clear();
    }

    pub fn iter_nodes(&self) -> Vec<(S, NodeSnapshot<A>)>
    where
        A: Clone,
    {
        self.nodes
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().snapshot()))
            .collect()
    }
}

impl<S, A> SearchTree<S, A>
where
    S: Hash + Eq + Clone,
    A: Ord,
{
    pub fn apply_virtual_loss(&self, state: &S, action: &A) {
        let (node, edge_index) = self.edge(state, action);
        node.apply_virtual_loss_at(edge_index);
    }

    /// Replaces the virtual loss on the edge with a real visit worth `value` to the player choosing
    /// `action`.
    pub fn backup(&self, state: &S, action: &A, value: f32) {
        let (node, edge_index) = self.edge(state, action);
        node.backup_at(edge_index, value);
    }

    pub fn revert_virtual_loss(&self, state: &S, action: &A) {
        let (node, edge_index) = self.edge(state, action);
        node.revert_virtual_loss_at(edge_index);
    }

    /// Backs up every edge of a path, root first. `value` is credited to the player choosing the
    /// last edge and alternates sign towards the root.
    pub fn backup_path(&self, path: &[(S, A)], value: f32) {
        let mut value = value;

        for (state, action) in path.iter().rev() {
            self.backup(state, action, value);
            value = -value;
        }
    }

    fn edge(&self, state: &S, action: &A) -> (Arc<VisitState<A>>, usize) {
        let node = self
            .get(state)
            .unwrap_or_else(|| panic!("State is not part of the search tree"));

        let edge_index = node
            .edge_index(action)
            .unwrap_or_else(|| panic!("Action is not an edge of the node"));

        (node, edge_index)
    }
}

impl<S, A> SearchTree<S, A>
where
    S: Hash + Eq + Clone,
    A: Clone,
{
    /// Drops every node that is not reachable from `root` through a visited edge.
    pub fn retain_subtree<R>(&self, root: &S, rules: &R)
    where
        R: GameRules<State = S, Action = A>,
    {
        let mut reachable = HashSet::new();
        let mut queue = VecDeque::new();

        if self.nodes.contains_key(root) {
            reachable.insert(root.clone());
            queue.push_back(root.clone());
        }

        while let Some(state) = queue.pop_front() {
            let snapshot = match self.get(&state) {
                Some(node) => node.snapshot(),
                None => continue,
            };

            for edge in snapshot.edges.iter().filter(|e| e.n() > 0) {
                let child = rules.take_action(&state, edge.action());

                if self.nodes.contains_key(&child) && reachable.insert(child.clone()) {
                    queue.push_back(child);
                }
            }
        }

        self.nodes.retain(|state, _| reachable.contains(state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use counting_game::{CountingAction, CountingGame};

    fn expanded_tree(states: &[u32]) -> SearchTree<u32, char> {
        let tree = SearchTree::new(3);

        for state in states {
            let (node, is_new) = tree.get_or_init(state);
            assert!(is_new);
            node.complete_expansion(vec![('a', 0.6), ('b', 0.4)], 0.0);
        }

        tree
    }

    #[test]
    fn test_get_or_init_expands_once() {
        let tree: SearchTree<u32, char> = SearchTree::new(3);

        let (first, first_is_new) = tree.get_or_init(&1);
        let (second, second_is_new) = tree.get_or_init(&1);

        assert!(first_is_new);
        assert!(!second_is_new);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_backup_alternates_perspective_up_the_path() {
        let tree = expanded_tree(&[0, 1, 2, 3]);
        let path = vec![(0, 'a'), (1, 'b'), (2, 'a'), (3, 'b')];

        for (state, action) in &path {
            tree.apply_virtual_loss(state, action);
        }

        tree.backup_path(&path, 0.9);

        let w = |state: u32, edge: usize| tree.get(&state).unwrap().snapshot().edges[edge].w();
        assert_approx_eq!(w(3, 1), 0.9);
        assert_approx_eq!(w(2, 0), -0.9);
        assert_approx_eq!(w(1, 1), 0.9);
        assert_approx_eq!(w(0, 0), -0.9);

        for (_, snapshot) in tree.iter_nodes() {
            assert_eq!(snapshot.total_visits, 1);
            assert_eq!(snapshot.sum_of_visits(), 1);
        }
    }

    #[test]
    fn test_revert_virtual_loss_restores_the_edge() {
        let tree = expanded_tree(&[0]);

        tree.apply_virtual_loss(&0, &'b');
        tree.revert_virtual_loss(&0, &'b');

        let snapshot = tree.get(&0).unwrap().snapshot();
        assert_eq!(snapshot.total_visits, 0);
        assert_eq!(snapshot.edges[1].n(), 0);
    }

    #[test]
    #[should_panic(expected = "not an edge")]
    fn test_backup_of_unknown_action_panics() {
        let tree = expanded_tree(&[0]);
        tree.backup(&0, &'z', 1.0);
    }

    #[test]
    #[should_panic(expected = "not part of the search tree")]
    fn test_backup_of_unknown_state_panics() {
        let tree = expanded_tree(&[0]);
        tree.backup(&9, &'a', 1.0);
    }

    #[test]
    fn test_retain_subtree_keeps_only_visited_descendants() {
        let game = CountingGame::with_goal(20);
        let tree = SearchTree::new(3);
        let edges = || {
            vec![
                (CountingAction::Increment, 0.4),
                (CountingAction::Decrement, 0.4),
                (CountingAction::Stay, 0.2),
            ]
        };

        let root = game.state(5);
        let child = game.take_action(&root, &CountingAction::Increment);
        let grandchild = game.take_action(&child, &CountingAction::Stay);
        let sibling = game.take_action(&root, &CountingAction::Decrement);
        let unrelated = game.state(2);

        for state in [&root, &child, &grandchild, &sibling, &unrelated] {
            tree.get_or_init(state).0.complete_expansion(edges(), 0.0);
        }

        let path = vec![(root, CountingAction::Increment), (child, CountingAction::Stay)];
        for (state, action) in &path {
            tree.apply_virtual_loss(state, action);
        }
        tree.backup_path(&path, 0.5);

        tree.retain_subtree(&child, &game);

        assert_eq!(tree.len(), 2);
        assert!(tree.get(&child).is_some());
        assert!(tree.get(&grandchild).is_some());
        assert!(tree.get(&root).is_none());
        assert!(tree.get(&sibling).is_none());

        tree.retain_subtree(&unrelated, &game);
        assert!(tree.is_empty());
    }
}
