use common::create_rng;
use engine::GameRules;
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, info, warn};
use model::{EvaluationError, GameAnalyzer, NodeMetrics};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::error::SearchError;
use super::node::{ExpansionStatus, NodeSnapshot, VisitState};
use super::noise::apply_dirichlet_noise;
use super::options::SearchOptions;
use super::resign::{ResignExemption, ResignTracker, SampledExemption};
use super::selection::RootSelection;
use super::temp::{select_by_temperature, visit_probabilities, TemperatureDecay};
use super::tree::SearchTree;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionOutcome {
    /// The move was sampled from the root visits.
    Searched,
    /// The root is terminal. The move, if any, is the rule's concluding action.
    Terminal,
    Resigned,
    /// Nothing was left to play once forbidden actions were removed. A forced loss for the mover.
    NoLegalActions,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub simulations: usize,
    pub max_depth: usize,
    /// Number of edges traversed over all simulations.
    pub total_steps: usize,
    pub uniform_fallbacks: usize,
    pub expansion_waits: usize,
    pub repetitions: usize,
}

/// The result of one move decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoveDecision<A> {
    /// `None` when the mover resigns or has no move left.
    pub action: Option<A>,
    /// Root visits over the legal actions, normalized to sum to one.
    pub visit_distribution: Vec<(A, f32)>,
    pub metrics: NodeMetrics<A>,
    pub outcome: DecisionOutcome,
    pub stats: SearchStats,
}

/// Decides moves for one game by running concurrent simulations against a shared tree.
pub struct SearchEngine<'a, R, M>
where
    R: GameRules,
{
    rules: &'a R,
    analyzer: &'a M,
    options: SearchOptions,
    tree: SearchTree<R::State, R::Action>,
    temperature: TemperatureDecay,
    resign: ResignTracker,
    exemption: Box<dyn ResignExemption>,
    rng: StdRng,
}

impl<'a, R, M> SearchEngine<'a, R, M>
where
    R: GameRules,
    M: GameAnalyzer<State = R::State>,
{
    pub fn new(rules: &'a R, analyzer: &'a M, options: SearchOptions) -> Result<Self, SearchError> {
        options.validate()?;

        let mut rng = create_rng(options.seed);
        let exemption = SampledExemption::new(
            options.resign_exempt_rate,
            StdRng::seed_from_u64(rng.gen()),
        );

        Ok(Self {
            rules,
            analyzer,
            tree: SearchTree::new(options.virtual_loss),
            temperature: TemperatureDecay::new(
                options.tau_decay_rate,
                options.boosted_temperature,
            ),
            resign: ResignTracker::new(options.resign_threshold, options.min_resign_ply),
            exemption: Box::new(exemption),
            rng,
            options,
        })
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_resign_exemption<E>(mut self, exemption: E) -> Self
    where
        E: ResignExemption + 'static,
    {
        self.exemption = Box::new(exemption);
        self
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn tree(&self) -> &SearchTree<R::State, R::Action> {
        &self.tree
    }

    /// Prepares the engine for a new game.
    pub fn reset(&mut self) {
        self.tree.clear();
        self.resign.reset();
        self.exemption.reset();
    }

    /// Searches `state` and picks a move.
    ///
    /// `history` holds the canonical states of the earlier plies of the game, oldest first. Its
    /// length is the ply of `state`. `forbidden_actions` are excluded at the root for this decision
    /// only.
    pub async fn decide_move(
        &mut self,
        state: &R::State,
        history: &[R::State],
        forbidden_actions: &[R::Action],
        boosted_exploration: bool,
    ) -> Result<MoveDecision<R::Action>, SearchError> {
        let root = self.rules.canonical_view(state);
        let ply = history.len();

        if let Some(terminal) = self.rules.terminal_state(&root) {
            debug!("Root is terminal with outcome {}", terminal.outcome);
            self.release_tree(&root, None);

            let mut actions = self.rules.legal_actions(&root);
            actions.sort();

            return Ok(MoveDecision {
                action: terminal.special_action,
                visit_distribution: actions.into_iter().map(|a| (a, 0.0)).collect(),
                metrics: NodeMetrics {
                    visits: 0,
                    value: terminal.outcome,
                    children: Vec::new(),
                },
                outcome: DecisionOutcome::Terminal,
                stats: SearchStats::default(),
            });
        }

        self.prepare_tree(&root);

        let result = self
            .search(&root, history, forbidden_actions, boosted_exploration)
            .await;

        let (root_snapshot, root_selection, stats) = match result {
            Ok(searched) => searched,
            Err(err) => {
                warn!("Search aborted, discarding the tree: {}", err);
                self.tree.clear();
                return Err(err);
            }
        };

        let decision = self.choose_move(ply, boosted_exploration, root_snapshot, &root_selection, stats);
        self.release_tree(&root, decision.action.as_ref());

        Ok(decision)
    }

    fn prepare_tree(&self, root: &R::State) {
        if self.options.tree_reuse && self.tree.get(root).is_some() {
            self.tree.retain_subtree(root, self.rules);
        } else {
            self.tree.clear();
        }
    }

    fn release_tree(&self, root: &R::State, action: Option<&R::Action>) {
        match action {
            Some(action) if self.options.tree_reuse => {
                let next = self.rules.take_action(root, action);
                self.tree.retain_subtree(&next, self.rules);
            }
            _ => self.tree.clear(),
        }
    }

    /// Runs the simulations of a decision without choosing a move or releasing the tree.
    pub(crate) async fn search(
        &mut self,
        root: &R::State,
        history: &[R::State],
        forbidden_actions: &[R::Action],
        boosted_exploration: bool,
    ) -> Result<(NodeSnapshot<R::Action>, RootSelection, SearchStats), SearchError> {
        let simulator = Simulator {
            rules: self.rules,
            analyzer: self.analyzer,
            tree: &self.tree,
            c_puct: self.options.c_puct,
            history: history.iter().collect(),
            remaining: AtomicUsize::new(self.options.simulation_num_per_move),
            aborted: AtomicBool::new(false),
            counters: SearchCounters::default(),
        };

        let root_node = simulator.ensure_expanded(root).await?;
        let root_snapshot = root_node.snapshot();

        let allowed: Vec<bool> = root_snapshot
            .edges
            .iter()
            .map(|e| !forbidden_actions.contains(e.action()))
            .collect();

        if !allowed.iter().any(|a| *a) {
            let root_selection = RootSelection::new(root_node.priors(), allowed);
            return Ok((root_snapshot, root_selection, simulator.counters.to_stats()));
        }

        let noise_eps = if boosted_exploration {
            self.options.noise_eps.max(self.options.boosted_noise_eps)
        } else {
            self.options.noise_eps
        };

        let priors = apply_dirichlet_noise(
            &root_node.priors(),
            &allowed,
            self.options.dirichlet_alpha,
            noise_eps,
            &mut self.rng,
        );
        let root_selection = RootSelection::new(priors, allowed);

        let mut workers: FuturesUnordered<_> = (0..self.options.search_threads)
            .map(|_| simulator.run_worker(root, &root_node, &root_selection))
            .collect();

        let mut first_error = None;
        while let Some(result) = workers.next().await {
            if let Err(err) = result {
                first_error.get_or_insert(err);
            }
        }

        drop(workers);

        if let Some(err) = first_error {
            return Err(err);
        }

        Ok((
            root_node.snapshot(),
            root_selection,
            simulator.counters.to_stats(),
        ))
    }

    fn choose_move(
        &mut self,
        ply: usize,
        boosted_exploration: bool,
        root: NodeSnapshot<R::Action>,
        root_selection: &RootSelection,
        stats: SearchStats,
    ) -> MoveDecision<R::Action> {
        let visits: Vec<u32> = root
            .edges
            .iter()
            .enumerate()
            .map(|(i, e)| if root_selection.is_allowed(i) { e.n() } else { 0 })
            .collect();

        let visit_distribution = root
            .edges
            .iter()
            .zip(visit_probabilities(&visits, 1.0))
            .map(|(e, p)| (e.action().clone(), p))
            .collect();

        debug!("{:?}", root.to_details(self.options.c_puct));

        let mut decision = MoveDecision {
            action: None,
            visit_distribution,
            metrics: root.to_metrics(),
            outcome: DecisionOutcome::NoLegalActions,
            stats,
        };

        if !root_selection.allowed.iter().any(|a| *a) {
            info!("No allowed actions at ply {}, the mover loses", ply);
            return decision;
        }

        if self.should_resign(ply, &root, root_selection) {
            decision.outcome = DecisionOutcome::Resigned;
            return decision;
        }

        let temperature = self.temperature.temperature(ply, boosted_exploration);
        let allowed = &root_selection.allowed;

        if let Some(index) = select_by_temperature(&visits, allowed, temperature, &mut self.rng) {
            decision.action = Some(root.edges[index].action().clone());
            decision.outcome = DecisionOutcome::Searched;
        }

        decision
    }

    fn should_resign(
        &mut self,
        ply: usize,
        root: &NodeSnapshot<R::Action>,
        root_selection: &RootSelection,
    ) -> bool {
        if !self.options.enable_resign {
            return false;
        }

        let best_value = root
            .edges
            .iter()
            .enumerate()
            .filter(|(i, e)| root_selection.is_allowed(*i) && e.n() > 0)
            .map(|(_, e)| e.q() as f32)
            .fold(None, |best: Option<f32>, q| Some(best.map_or(q, |b| b.max(q))));

        if !self.resign.observe(ply, best_value) {
            return false;
        }

        if self.exemption.is_exempt(ply) {
            debug!(
                "Resignation at ply {} skipped, game is exempt. Best value: {:?}",
                ply, best_value
            );
            return false;
        }

        info!("Resigning at ply {}. Best value: {:?}", ply, best_value);

        true
    }
}

#[derive(Default)]
struct SearchCounters {
    simulations: AtomicUsize,
    max_depth: AtomicUsize,
    total_steps: AtomicUsize,
    uniform_fallbacks: AtomicUsize,
    expansion_waits: AtomicUsize,
    repetitions: AtomicUsize,
}

impl SearchCounters {
    fn to_stats(&self) -> SearchStats {
        SearchStats {
            simulations: self.simulations.load(Ordering::Relaxed),
            max_depth: self.max_depth.load(Ordering::Relaxed),
            total_steps: self.total_steps.load(Ordering::Relaxed),
            uniform_fallbacks: self.uniform_fallbacks.load(Ordering::Relaxed),
            expansion_waits: self.expansion_waits.load(Ordering::Relaxed),
            repetitions: self.repetitions.load(Ordering::Relaxed),
        }
    }
}

struct PathStep<S, A> {
    state: S,
    action: A,
    node: Arc<VisitState<A>>,
    edge_index: usize,
}

/// Shared state of the workers of a single decision.
struct Simulator<'t, R, M>
where
    R: GameRules,
{
    rules: &'t R,
    analyzer: &'t M,
    tree: &'t SearchTree<R::State, R::Action>,
    c_puct: f32,
    history: HashSet<&'t R::State>,
    remaining: AtomicUsize,
    aborted: AtomicBool,
    counters: SearchCounters,
}

impl<'t, R, M> Simulator<'t, R, M>
where
    R: GameRules,
    M: GameAnalyzer<State = R::State>,
{
    async fn run_worker(
        &self,
        root: &R::State,
        root_node: &Arc<VisitState<R::Action>>,
        root_selection: &RootSelection,
    ) -> Result<(), SearchError> {
        while !self.aborted.load(Ordering::SeqCst) && self.claim_simulation() {
            if let Err(err) = self.simulate(root, root_node, root_selection).await {
                self.aborted.store(true, Ordering::SeqCst);
                return Err(err);
            }
        }

        Ok(())
    }

    fn claim_simulation(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |r| r.checked_sub(1))
            .is_ok()
    }

    /// Returns the node of `state`, expanding it if no worker has yet.
    async fn ensure_expanded(
        &self,
        state: &R::State,
    ) -> Result<Arc<VisitState<R::Action>>, SearchError> {
        let (node, is_new) = self.tree.get_or_init(state);

        if is_new {
            self.expand(state, &node).await?;
            return Ok(node);
        }

        match node.wait_for_expansion().await {
            ExpansionStatus::Failed(err) => Err(err.into()),
            _ => Ok(node),
        }
    }

    /// Evaluates a pending node and installs its edges. Returns the value of the state for its
    /// mover.
    async fn expand(
        &self,
        state: &R::State,
        node: &VisitState<R::Action>,
    ) -> Result<f32, EvaluationError> {
        let mut actions = self.rules.legal_actions(state);
        actions.sort();

        if actions.is_empty() {
            node.complete_expansion(Vec::new(), -1.0);
            return Ok(-1.0);
        }

        let prediction = match self.analyzer.get_state_analysis(state).await {
            Ok(prediction) => prediction,
            Err(err) => {
                node.fail_expansion(err.clone());
                return Err(err);
            }
        };

        let (priors, uniform) = mask_policy(self.rules, &prediction.policy, &actions);
        if uniform {
            warn!(
                "Policy is unusable for the {} legal actions of {:?}, using a uniform prior",
                actions.len(),
                state
            );
            self.counters.uniform_fallbacks.fetch_add(1, Ordering::Relaxed);
        }

        node.complete_expansion(actions.into_iter().zip(priors).collect(), prediction.value);

        Ok(prediction.value)
    }

    /// Runs one simulation from the root and backs up its result.
    async fn simulate(
        &self,
        root: &R::State,
        root_node: &Arc<VisitState<R::Action>>,
        root_selection: &RootSelection,
    ) -> Result<(), SearchError> {
        let mut path: Vec<PathStep<R::State, R::Action>> = Vec::new();
        let mut state = root.clone();
        let mut node = root_node.clone();

        let leaf_value = loop {
            let selection = if path.is_empty() {
                Some(root_selection)
            } else {
                None
            };

            let (edge_index, action) = match node.select_and_apply_virtual_loss(self.c_puct, selection)
            {
                Some(selected) => selected,
                None => break -1.0,
            };

            let next = self.rules.take_action(&state, &action);
            path.push(PathStep {
                state,
                action,
                node: node.clone(),
                edge_index,
            });

            if let Some(value) = self.repetition_value(&path, &next) {
                self.counters.repetitions.fetch_add(1, Ordering::Relaxed);
                break value;
            }

            if let Some(terminal) = self.rules.terminal_state(&next) {
                break terminal.outcome;
            }

            let (child, is_new) = self.tree.get_or_init(&next);

            if is_new {
                match self.expand(&next, &child).await {
                    Ok(value) => break value,
                    Err(err) => return Err(self.abort(&path, err)),
                }
            }

            match child.status() {
                ExpansionStatus::Expanded => {}
                ExpansionStatus::Failed(err) => return Err(self.abort(&path, err)),
                ExpansionStatus::Pending => {
                    self.counters.expansion_waits.fetch_add(1, Ordering::Relaxed);

                    match child.wait_for_expansion().await {
                        ExpansionStatus::Failed(err) => return Err(self.abort(&path, err)),
                        _ => break child.value(),
                    }
                }
            }

            state = next;
            node = child;
        };

        self.backup(&path, leaf_value);

        Ok(())
    }

    /// Scores a state that repeats one reached earlier in this simulation or in the game.
    fn repetition_value(
        &self,
        path: &[PathStep<R::State, R::Action>],
        next: &R::State,
    ) -> Option<f32> {
        if let Some(earlier) = path.iter().find(|step| step.state == *next) {
            let value = if self.rules.would_check_or_chase(&earlier.state, &earlier.action) {
                -1.0
            } else if self.rules.is_caught(&earlier.state, &earlier.action) {
                1.0
            } else {
                0.0
            };

            return Some(value);
        }

        if self.history.contains(next) {
            return Some(0.0);
        }

        None
    }

    /// Backs up a value for the mover of the leaf along the path.
    fn backup(&self, path: &[PathStep<R::State, R::Action>], leaf_value: f32) {
        let mut value = -leaf_value;

        for step in path.iter().rev() {
            step.node.backup_at(step.edge_index, value);
            value = -value;
        }

        self.counters.simulations.fetch_add(1, Ordering::Relaxed);
        self.counters.total_steps.fetch_add(path.len(), Ordering::Relaxed);
        self.counters.max_depth.fetch_max(path.len(), Ordering::Relaxed);
    }

    fn abort(&self, path: &[PathStep<R::State, R::Action>], err: EvaluationError) -> SearchError {
        for step in path.iter().rev() {
            step.node.revert_virtual_loss_at(step.edge_index);
        }

        self.aborted.store(true, Ordering::SeqCst);

        SearchError::Evaluation(err)
    }
}

/// Gathers the policy of the legal actions and normalizes it to sum to one. Falls back to a
/// uniform distribution when the policy has no usable mass or does not cover the action space,
/// signalled by the returned flag.
fn mask_policy<R: GameRules>(rules: &R, policy: &[f32], actions: &[R::Action]) -> (Vec<f32>, bool) {
    let uniform = || vec![1.0 / actions.len() as f32; actions.len()];

    if policy.len() != rules.action_space_size() {
        warn!(
            "Policy has {} entries but the action space has {}",
            policy.len(),
            rules.action_space_size()
        );
        return (uniform(), true);
    }

    let masked: Vec<f32> = actions
        .iter()
        .map(|a| policy.get(rules.action_index(a)).copied().unwrap_or(0.0))
        .collect();

    let total: f32 = masked.iter().sum();
    let valid = total.is_finite() && total > 0.0 && masked.iter().all(|p| *p >= 0.0);

    if valid {
        (masked.iter().map(|p| p / total).collect(), false)
    } else {
        (uniform(), true)
    }
}
