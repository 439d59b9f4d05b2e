//! # Grammar-Probability Graph
//!
//! Collapses the context-sensitive production system into a minimal-state
//! hypergraph and computes, for every state, the best total log-probability
//! any complete derivation from it can achieve.
//!
//! ## Construction
//!
//! States are `(symbol, minimal context)` classes, discovered breadth-first
//! from the start symbol under the empty derivation. At each state the
//! abstracted context selects the model's ranked operator list; every rule
//! of the symbol receives a normalized weight:
//!
//! ```text
//! w(rule) = min(0, ln(max(p, default) / Σ max(p_i, default)))
//! ```
//!
//! where `p` is the model's probability for the first entry that matches
//! the rule (category-aware: `Param@T` and `Constant@...` entries match by
//! abstraction, anything else by operator name) and absent entries fall
//! back to the smoothing default. Rules the model explicitly assigns zero
//! probability are dropped. Matrix-domain runs force the normalizing sum
//! to 1.0.
//!
//! Each surviving rule becomes one **hyperedge** from the state to the
//! per-argument child states (deduplicated through the minimal context).
//!
//! ## Upper bounds
//!
//! The bound computation is single-source longest path generalized to
//! hyperedges whose targets must *all* be resolved. All weights are ≤ 0,
//! so draining a max-priority queue finalizes each node at its true bound,
//! exactly as Dijkstra does with non-positive costs traversed in
//! decreasing order. Once finalized, a bound never changes; the solver
//! uses it as an admissible search heuristic.

use std::collections::{BinaryHeap, VecDeque};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use examplar_frontend::Type;

use crate::engine::config::SynthConfig;
use crate::engine::context::{Context, ContextMaintainer, ContextModel};
use crate::engine::grammar::{Grammar, Rule, SymbolId};
use crate::engine::program::{PartialProgram, Program};
use crate::engine::semantics::{OpRef, TaskInfo};

/// Tolerance for bound finalization and improvement checks.
const BOUND_EPS: f64 = 1e-6;

/// Index of a graph state.
pub type StateId = usize;

/// The state the whole derivation starts from.
pub const START_STATE: StateId = 0;

/// One `(symbol, minimal context)` state.
pub struct GraphNode {
    pub symbol: SymbolId,
    pub context: Context,
    /// Outgoing hyperedges (indexes into [`RuleGraph::edges`]).
    pub edges: Vec<usize>,
    /// Hyperedges that list this state among their targets, once per
    /// occurrence.
    pub back_edges: Vec<usize>,
    /// Best achievable total log-probability of a complete derivation
    /// from this state; final after construction.
    pub upper_bound: f64,
}

impl GraphNode {
    fn new(symbol: SymbolId, context: Context) -> GraphNode {
        GraphNode {
            symbol,
            context,
            edges: Vec::new(),
            back_edges: Vec::new(),
            upper_bound: f64::NEG_INFINITY,
        }
    }
}

/// One weighted rule instance. The edge can contribute to its source's
/// bound only once every target is resolved.
pub struct GraphEdge {
    pub source: StateId,
    pub op: OpRef,
    /// Normalized log-probability, ≤ 0.
    pub weight: f64,
    /// One target state per rule argument.
    pub targets: SmallVec<[StateId; 3]>,
}

/// The built graph. Nodes, edges, and bounds are immutable after
/// [`RuleGraph::build`] returns.
pub struct RuleGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Pending `(bound, node)` candidate for the bound computation. Ordered
/// by bound, node id breaking ties, so the drain order is deterministic.
#[derive(PartialEq)]
struct Candidate {
    bound: f64,
    node: StateId,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.bound
            .total_cmp(&other.bound)
            .then(self.node.cmp(&other.node))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Whether a model term matches a rule, honoring the abstraction used at
/// training time: `Param@T` entries match parameter rules by type,
/// `Constant@...` entries match constant rules by learned category (PBE
/// string constants) or by type, and any other term matches by operator
/// name.
fn term_matches_rule(term: &str, rule: &Rule, maintainer: &mut ContextMaintainer) -> bool {
    if term.contains("Param@") {
        return rule.op.param_index().is_some() && term.contains(rule.op.return_type().name());
    }
    if term.contains("Constant@") {
        let Some(value) = rule.op.literal() else {
            return false;
        };
        if maintainer.is_pbe() && value.ty() == Type::Str {
            return term == maintainer.op_token(rule.op.as_ref());
        }
        return term.contains(value.ty().name());
    }
    term == rule.op.name()
}

/// The model probability of the first entry matching `rule`, if any.
fn search_probability(
    entries: &[(String, f64)],
    rule: &Rule,
    maintainer: &mut ContextMaintainer,
) -> Option<f64> {
    entries
        .iter()
        .find(|(term, _)| term_matches_rule(term, rule, maintainer))
        .map(|&(_, p)| p)
}

impl RuleGraph {
    /// Builds the graph for one grammar + model pair and computes every
    /// reachable state's upper bound.
    pub fn build(
        grammar: &Grammar,
        model: &ContextModel,
        info: &TaskInfo,
        cfg: &SynthConfig,
    ) -> RuleGraph {
        let mut maintainer = ContextMaintainer::new(model.depth, info);
        let mut nodes: Vec<GraphNode> = Vec::new();
        let mut edges: Vec<GraphEdge> = Vec::new();
        let mut index: FxHashMap<(SymbolId, Context), StateId> = FxHashMap::default();
        // Per-node snapshot of (partial program, path) used to derive
        // child contexts; dropped once the build finishes.
        let mut derivations: Vec<(PartialProgram, Vec<usize>)> = Vec::new();

        let root = PartialProgram::hole();
        let root_ctx = maintainer.minimal_context(&root, &[]);
        nodes.push(GraphNode::new(grammar.start, root_ctx.clone()));
        index.insert((grammar.start, root_ctx), START_STATE);
        derivations.push((root, Vec::new()));

        let mut queue = VecDeque::from([START_STATE]);
        while let Some(current) = queue.pop_front() {
            let (program, path) = derivations[current].clone();
            let abstracted = maintainer.abstracted_context(&program, &path);
            let entries = model.lookup(&abstracted);
            let symbol = &grammar.symbols[nodes[current].symbol];

            let mut sum = 0.0;
            for rule in &symbol.rules {
                let p = search_probability(entries, rule, &mut maintainer)
                    .unwrap_or(cfg.default_prob);
                sum += p.max(cfg.default_prob);
            }
            if cfg.uniform_weights {
                sum = 1.0;
            }

            for rule in &symbol.rules {
                let value = search_probability(entries, rule, &mut maintainer)
                    .unwrap_or(cfg.default_prob);
                if value == 0.0 {
                    continue;
                }
                let weight = (value.max(cfg.default_prob) / sum).ln().min(0.0);

                let mut expanded = program.clone();
                expanded.expand(&path, rule.op.clone());
                let mut child_path = path.clone();
                let mut targets: SmallVec<[StateId; 3]> = SmallVec::new();
                for (i, &child_symbol) in rule.args.iter().enumerate() {
                    child_path.push(i);
                    let child_ctx = maintainer.minimal_context(&expanded, &child_path);
                    let key = (child_symbol, child_ctx);
                    let id = match index.get(&key) {
                        Some(&id) => id,
                        None => {
                            let id = nodes.len();
                            nodes.push(GraphNode::new(child_symbol, key.1.clone()));
                            index.insert(key, id);
                            derivations.push((expanded.clone(), child_path.clone()));
                            queue.push_back(id);
                            id
                        }
                    };
                    targets.push(id);
                    child_path.pop();
                }

                let edge_id = edges.len();
                nodes[current].edges.push(edge_id);
                for &t in &targets {
                    nodes[t].back_edges.push(edge_id);
                }
                edges.push(GraphEdge {
                    source: current,
                    op: rule.op.clone(),
                    weight,
                    targets,
                });
            }
        }

        let mut graph = RuleGraph { nodes, edges };
        graph.compute_upper_bounds();
        graph
    }

    /// AND-OR longest path over the hypergraph; see the module docs.
    fn compute_upper_bounds(&mut self) {
        let nodes = &mut self.nodes;
        let edges = &self.edges;
        let mut unresolved: Vec<usize> = edges.iter().map(|e| e.targets.len()).collect();
        let mut finished = vec![false; nodes.len()];
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::new();

        for (id, node) in nodes.iter_mut().enumerate() {
            node.upper_bound = f64::NEG_INFINITY;
            let mut seeded = false;
            for &e in &node.edges {
                if unresolved[e] == 0 {
                    node.upper_bound = node.upper_bound.max(edges[e].weight);
                    seeded = true;
                }
            }
            if seeded {
                heap.push(Candidate {
                    bound: node.upper_bound,
                    node: id,
                });
            }
        }

        while let Some(Candidate { bound, node: pos }) = heap.pop() {
            if finished[pos] || (bound - nodes[pos].upper_bound).abs() > BOUND_EPS {
                continue;
            }
            finished[pos] = true;
            let consumers = nodes[pos].back_edges.clone();
            for e in consumers {
                unresolved[e] -= 1;
                if unresolved[e] == 0 {
                    let u = edges[e].source;
                    if finished[u] {
                        continue;
                    }
                    let mut w = edges[e].weight;
                    for &t in &edges[e].targets {
                        w += nodes[t].upper_bound;
                    }
                    if w > nodes[u].upper_bound + BOUND_EPS {
                        nodes[u].upper_bound = w;
                        heap.push(Candidate { bound: w, node: u });
                    }
                }
            }
        }
    }

    /// The most probable complete program from `state`, ignoring any
    /// output constraint; `None` when the state derives nothing.
    pub fn best_program_from(&self, state: StateId) -> Option<Program> {
        let node = &self.nodes[state];
        let mut best: Option<(f64, usize)> = None;
        for &e in &node.edges {
            let mut w = self.edges[e].weight;
            for &t in &self.edges[e].targets {
                w += self.nodes[t].upper_bound;
            }
            if best.map_or(true, |(bw, _)| w > bw) {
                best = Some((w, e));
            }
        }
        let (w, e) = best?;
        if !w.is_finite() {
            return None;
        }
        let children = self.edges[e]
            .targets
            .iter()
            .map(|&t| self.best_program_from(t))
            .collect::<Option<Vec<_>>>()?;
        Some(Program::new(self.edges[e].op.clone(), children))
    }
}
