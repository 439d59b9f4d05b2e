//! # Version-Space Solver and Synthesis Driver
//!
//! The solver searches the intersection of per-example version spaces for
//! the highest-scoring program consistent with every incorporated example.
//!
//! ## Version-space nodes
//!
//! A node pairs a graph state with one output constraint per incorporated
//! example. Nodes live in an arena and are addressed by [`VsaId`]
//! indices; requesting the same `(state, constraint tuple)` twice returns
//! the cached node. A node over a single example is a **leaf**: its edges
//! come straight from the operator witness functions. A node over
//! examples `0..=k` is **combined**: it records a *prefix* child (examples
//! `0..=k-1`) and a *singleton* child (example `k`), and its edges are the
//! name-grouped, position-wise intersection of theirs. The binary split is
//! what makes counter-example-guided iteration incremental — prefix
//! results are cached and reused when the next example arrives.
//!
//! Each node carries `p`, its best achievable score. `p` starts at the
//! graph's admissible upper bound (leaves) or the children's minimum
//! (combined) and only ever decreases as edges are explored and
//! exhausted.
//!
//! ## Search
//!
//! [`best_within`](Synthesizer) is an anytime, limit-pruned best-first
//! search: it answers whether a concrete program scoring at least `limit`
//! exists at a node, caching the program permanently when found. Among
//! pending edges it greedily picks the one with the least average
//! shortfall per unresolved child, pushes exactly enough budget into one
//! child, then re-scans for newly resolved edges and tightens the limit.
//! The final selection accepts an edge only when its weight equals the
//! settled limit to within 1e-8; every assembled fragment is immediately
//! re-verified against the examples it covers, and a violation is a fatal
//! internal-consistency error, not a recoverable condition.
//!
//! ## Driver
//!
//! [`Synthesizer::solve`] runs the counter-example-guided loop: seed one
//! example, synthesize at the current score floor, re-verify, check the
//! full specification, append the counter-example, repeat. When no
//! program exists at the floor, the floor drops by a fixed step; dropping
//! below the configured minimum reports [`Synthesis::Exhausted`] — a
//! normal negative outcome, distinct from every error.

use rustc_hash::FxHashMap;
use smallvec::{smallvec, SmallVec};

use examplar_frontend::{Example, ModelAst, SpecAst, Type, Value};

use crate::engine::config::SynthConfig;
use crate::engine::context::ContextModel;
use crate::engine::errors::SynthError;
use crate::engine::grammar::{bind, Task};
use crate::engine::graph::{RuleGraph, StateId, START_STATE};
use crate::engine::program::Program;
use crate::engine::semantics::{Constraint, ConstraintTuple, EvalContext, OpRef, Registry};

/// Tolerance for score cross-checks (matches the graph's bound epsilon).
const SCORE_EPS: f64 = 1e-6;
/// Tolerance for the final edge-weight equality test.
const WEIGHT_EPS: f64 = 1e-8;

/// Index of a version-space node in the solver's arena.
pub type VsaId = usize;

/// Outcome of a synthesis run.
#[derive(Debug)]
pub enum Synthesis {
    /// A program consistent with the full specification.
    Found {
        program: Program,
        /// Its total log-probability under the grammar model.
        score: f64,
    },
    /// No admissible program exists above the minimum score floor.
    Exhausted {
        /// The floor at which the search gave up.
        floor: f64,
    },
}

/// Which slice of the incorporated examples a node covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Exactly one example.
    Single(usize),
    /// Examples `0..=k` (`k ≥ 1`).
    Combined(usize),
}

impl Scope {
    /// The scope of a combined node's prefix child.
    fn prefix(k: usize) -> Scope {
        debug_assert!(k >= 1);
        if k >= 2 {
            Scope::Combined(k - 1)
        } else {
            Scope::Single(0)
        }
    }
}

/// One candidate derivation step out of a version-space node.
struct VsaEdge {
    op: OpRef,
    /// Log-probability of the grammar rule alone.
    rule_w: f64,
    /// One child node per operator argument.
    children: SmallVec<[VsaId; 3]>,
    /// `rule_w` plus the children's current scores; recomputed on demand,
    /// only final once every child is solved.
    w: f64,
}

/// One version-space region; see the module docs.
struct VsaNode {
    state: StateId,
    /// One output constraint per covered example.
    constraints: ConstraintTuple,
    edges: Vec<VsaEdge>,
    built: bool,
    /// Prefix child (combined nodes only).
    left: Option<VsaId>,
    /// Singleton child (combined nodes only).
    right: Option<VsaId>,
    /// Best achievable score; monotonically non-increasing.
    p: f64,
    /// The solved program, cached permanently once found.
    best: Option<Program>,
}

type NodeKey = (StateId, ConstraintTuple);

/// The synthesis engine for one task. Owns the grammar-probability graph,
/// the version-space arena, and the counter-example loop state; all of it
/// persists for the lifetime of the run, so later iterations reuse every
/// cached node.
pub struct Synthesizer {
    task: Task,
    cfg: SynthConfig,
    graph: RuleGraph,
    /// Examples incorporated so far (a prefix of the full space, plus
    /// generated counter-examples for oracle tasks).
    examples: Vec<Example>,
    nodes: Vec<VsaNode>,
    /// One cache per incorporated example.
    single_cache: Vec<FxHashMap<NodeKey, VsaId>>,
    combined_cache: FxHashMap<NodeKey, VsaId>,
    /// Current score floor; persists across counter-example iterations.
    value_limit: f64,
}

impl Synthesizer {
    /// Binds the specification against the built-in operator registry and
    /// builds the grammar-probability graph.
    pub fn new(
        spec: &SpecAst,
        model: &ModelAst,
        cfg: SynthConfig,
    ) -> Result<Synthesizer, SynthError> {
        let registry = Registry::with_builtins();
        Synthesizer::with_registry(spec, model, cfg, &registry)
    }

    /// As [`Synthesizer::new`], with a caller-supplied operator registry.
    pub fn with_registry(
        spec: &SpecAst,
        model: &ModelAst,
        cfg: SynthConfig,
        registry: &Registry,
    ) -> Result<Synthesizer, SynthError> {
        let (task, mut cfg) = bind(spec, registry, cfg)?;
        let model = ContextModel::from_ast(model, cfg.context_depth);
        cfg.context_depth = model.depth;
        let graph = RuleGraph::build(&task.grammar, &model, &task.info, &cfg);
        tracing::debug!(
            states = graph.nodes.len(),
            edges = graph.edges.len(),
            "built grammar-probability graph"
        );
        let value_limit = cfg.floor_start;
        Ok(Synthesizer {
            task,
            cfg,
            graph,
            examples: Vec::new(),
            nodes: Vec::new(),
            single_cache: Vec::new(),
            combined_cache: FxHashMap::default(),
            value_limit,
        })
    }

    /// The built grammar-probability graph.
    pub fn graph(&self) -> &RuleGraph {
        &self.graph
    }

    /// The bound task.
    pub fn task(&self) -> &Task {
        &self.task
    }

    /// The effective configuration (with task-derived fields filled in).
    pub fn config(&self) -> &SynthConfig {
        &self.cfg
    }

    /// The current score floor. Starts at the configured value and only
    /// ever decreases, one step per failed search.
    pub fn score_floor(&self) -> f64 {
        self.value_limit
    }

    /// Runs the counter-example-guided loop to completion.
    pub fn solve(&mut self) -> Result<Synthesis, SynthError> {
        if self.examples.is_empty() {
            let seed = self.seed_example()?;
            tracing::info!(example = %seed, "incorporated example");
            self.add_example(seed);
        }
        loop {
            let Some((program, score)) = self.synthesize_at_floor()? else {
                tracing::info!(
                    floor = self.value_limit,
                    "no admissible program above the minimum score floor"
                );
                return Ok(Synthesis::Exhausted {
                    floor: self.value_limit,
                });
            };
            tracing::info!(%program, score, "candidate program");

            // Consistency with the incorporated examples is enforced by
            // construction; a violation here is a logic fault.
            let recomputed = self.probability_of(START_STATE, &program)?;
            if (recomputed - score).abs() > SCORE_EPS {
                return Err(SynthError::Internal(format!(
                    "score mismatch for {}: solver reported {}, grammar recomputed {}",
                    program, score, recomputed
                )));
            }
            for example in &self.examples {
                let out = program.run(&example.inputs, &self.task.info, &self.cfg);
                if out != example.output {
                    return Err(SynthError::Internal(format!(
                        "synthesized program {} violates incorporated example {} (got {})",
                        program, example, out
                    )));
                }
            }

            match self.counter_example(&program)? {
                None => {
                    tracing::info!(%program, score, "synthesis complete");
                    return Ok(Synthesis::Found { program, score });
                }
                Some(example) => {
                    tracing::info!(example = %example, "incorporated example");
                    self.add_example(example);
                }
            }
        }
    }

    fn add_example(&mut self, example: Example) {
        self.examples.push(example);
        self.single_cache.push(FxHashMap::default());
    }

    /// The first example the loop starts from: the specification's first
    /// example, or the oracle's output on an all-zero input tuple.
    fn seed_example(&self) -> Result<Example, SynthError> {
        if let Some(example) = self.task.info.examples.first() {
            return Ok(example.clone());
        }
        let oracle = self.task.oracle.as_ref().ok_or_else(|| {
            SynthError::Validation(
                "specification provides neither examples nor an oracle".into(),
            )
        })?;
        let inputs: Vec<Value> = self
            .task
            .params
            .iter()
            .map(|ty| match ty {
                Type::Int => Ok(Value::Int(0)),
                Type::Bool => Ok(Value::Bool(false)),
                other => Err(SynthError::Validation(format!(
                    "cannot seed an oracle task over a {} parameter",
                    other
                ))),
            })
            .collect::<Result<_, _>>()?;
        let output = oracle.run(&inputs, &self.task.info, &self.cfg);
        Ok(Example { inputs, output })
    }

    /// Verifies a candidate against the full specification, producing a
    /// counter-example on failure. PBE tasks re-check the whole example
    /// space; oracle tasks enumerate the bounded input domain.
    fn counter_example(&self, program: &Program) -> Result<Option<Example>, SynthError> {
        let Some(oracle) = &self.task.oracle else {
            for example in &self.task.info.examples {
                let out = program.run(&example.inputs, &self.task.info, &self.cfg);
                if out != example.output {
                    return Ok(Some(example.clone()));
                }
            }
            return Ok(None);
        };

        let domains: Vec<Vec<Value>> = self
            .task
            .params
            .iter()
            .map(|ty| match ty {
                Type::Int => Ok((self.cfg.int_min..=self.cfg.int_max)
                    .map(Value::Int)
                    .collect()),
                Type::Bool => Ok(vec![Value::Bool(false), Value::Bool(true)]),
                other => Err(SynthError::Validation(format!(
                    "cannot enumerate the domain of a {} parameter",
                    other
                ))),
            })
            .collect::<Result<_, _>>()?;
        let mut index = vec![0usize; domains.len()];
        loop {
            let inputs: Vec<Value> = domains
                .iter()
                .zip(&index)
                .map(|(domain, &i)| domain[i].clone())
                .collect();
            let expected = oracle.run(&inputs, &self.task.info, &self.cfg);
            let actual = program.run(&inputs, &self.task.info, &self.cfg);
            if actual != expected {
                return Ok(Some(Example {
                    inputs,
                    output: expected,
                }));
            }
            let mut d = domains.len();
            loop {
                if d == 0 {
                    return Ok(None);
                }
                d -= 1;
                index[d] += 1;
                if index[d] < domains[d].len() {
                    break;
                }
                index[d] = 0;
            }
        }
    }

    /// Synthesizes the best program consistent with the incorporated
    /// examples, relaxing the score floor as needed; `None` once the
    /// floor is exhausted.
    fn synthesize_at_floor(&mut self) -> Result<Option<(Program, f64)>, SynthError> {
        let n = self.examples.len();
        let scope = if n == 1 {
            Scope::Single(0)
        } else {
            Scope::Combined(n - 1)
        };
        let constraints: ConstraintTuple = self
            .examples
            .iter()
            .map(|e| Constraint::Exact(e.output.clone()))
            .collect();
        let root = self.intern_node(START_STATE, constraints, scope);
        while !self.best_within(root, scope, self.value_limit)? {
            self.value_limit -= self.cfg.floor_step;
            if self.value_limit < self.cfg.floor_min {
                return Ok(None);
            }
            tracing::info!(floor = self.value_limit, "relaxed the global score floor");
        }
        let node = &self.nodes[root];
        let program = node
            .best
            .clone()
            .ok_or_else(|| SynthError::internal("root reported solved without a program"))?;
        Ok(Some((program, node.p)))
    }

    /// Interns the node for `(state, constraints)` in the cache matching
    /// `scope`, creating it (and, for combined scopes, its prefix and
    /// singleton children) on first request.
    fn intern_node(&mut self, state: StateId, constraints: ConstraintTuple, scope: Scope) -> VsaId {
        match scope {
            Scope::Single(i) => {
                let key = (state, constraints);
                if let Some(&id) = self.single_cache[i].get(&key) {
                    return id;
                }
                let id = self.nodes.len();
                self.nodes.push(VsaNode {
                    state,
                    constraints: key.1.clone(),
                    edges: Vec::new(),
                    built: false,
                    left: None,
                    right: None,
                    p: self.graph.nodes[state].upper_bound,
                    best: None,
                });
                self.single_cache[i].insert(key, id);
                id
            }
            Scope::Combined(k) => {
                let key = (state, constraints);
                if let Some(&id) = self.combined_cache.get(&key) {
                    return id;
                }
                let constraints = key.1.clone();
                let mut prefix = constraints.clone();
                let last = prefix.pop().expect("combined node covers >= 2 examples");
                let right = self.intern_node(state, smallvec![last], Scope::Single(k));
                let left = self.intern_node(state, prefix, Scope::prefix(k));
                let p = self.nodes[left].p.min(self.nodes[right].p);
                let id = self.nodes.len();
                self.nodes.push(VsaNode {
                    state,
                    constraints,
                    edges: Vec::new(),
                    built: false,
                    left: Some(left),
                    right: Some(right),
                    p,
                    best: None,
                });
                self.combined_cache.insert(key, id);
                id
            }
        }
    }

    /// Recomputes and caches one edge's weight from its children's
    /// current scores.
    fn recompute_edge_w(&mut self, node: VsaId, e: usize) -> f64 {
        let mut w = self.nodes[node].edges[e].rule_w;
        for i in 0..self.nodes[node].edges[e].children.len() {
            let child = self.nodes[node].edges[e].children[i];
            w += self.nodes[child].p;
        }
        self.nodes[node].edges[e].w = w;
        w
    }

    /// Whether every child of an edge has a solved program.
    fn edge_solved(&self, node: VsaId, e: usize) -> bool {
        self.nodes[node].edges[e]
            .children
            .iter()
            .all(|&c| self.nodes[c].best.is_some())
    }

    /// Refreshes a node's achievable score from its edges and children.
    fn update_p(&mut self, id: VsaId) -> f64 {
        if !self.nodes[id].built {
            if let (Some(l), Some(r)) = (self.nodes[id].left, self.nodes[id].right) {
                let p = self.nodes[l].p.min(self.nodes[r].p);
                self.nodes[id].p = p;
                return p;
            }
            return self.nodes[id].p;
        }
        let mut p = f64::NEG_INFINITY;
        for e in 0..self.nodes[id].edges.len() {
            p = p.max(self.recompute_edge_w(id, e));
        }
        if let (Some(l), Some(r)) = (self.nodes[id].left, self.nodes[id].right) {
            p = p.min(self.nodes[l].p.min(self.nodes[r].p));
        }
        self.nodes[id].p = p;
        p
    }

    /// Lazily materializes a node's outgoing edges.
    ///
    /// Leaves query each grammar edge's witness function against the
    /// node's constraint and the scope example's inputs. Combined nodes
    /// intersect their children's edges: group both sides by operator
    /// name (first-seen order, so the result is deterministic), pair the
    /// groups' edges, and merge the children position-wise — appending
    /// the singleton side's constraint to the prefix side's tuple. An
    /// edge that would make the node its own descendant is rejected.
    fn build_edges(&mut self, id: VsaId, scope: Scope) -> Result<(), SynthError> {
        self.nodes[id].built = true;
        match scope {
            Scope::Single(i) => {
                let state = self.nodes[id].state;
                let constraint = self.nodes[id].constraints[0].clone();
                let inputs = self.examples[i].inputs.clone();
                let mut planned = Vec::new();
                {
                    let ctx = EvalContext::new(&inputs, &self.task.info, &self.cfg);
                    for &ge in &self.graph.nodes[state].edges {
                        let edge = &self.graph.edges[ge];
                        let terms = edge.op.witness(&constraint, &ctx);
                        if !terms.is_empty() {
                            planned.push((
                                edge.op.clone(),
                                edge.weight,
                                edge.targets.clone(),
                                terms,
                            ));
                        }
                    }
                }
                for (op, rule_w, targets, terms) in planned {
                    for term in terms {
                        if term.len() != targets.len() {
                            return Err(SynthError::Internal(format!(
                                "witness of '{}' returned {} constraints for {} arguments",
                                op.name(),
                                term.len(),
                                targets.len()
                            )));
                        }
                        let mut children: SmallVec<[VsaId; 3]> = SmallVec::new();
                        for (j, c) in term.into_iter().enumerate() {
                            children.push(self.intern_node(targets[j], smallvec![c], scope));
                        }
                        let w = rule_w
                            + children.iter().map(|&c| self.nodes[c].p).sum::<f64>();
                        self.nodes[id].edges.push(VsaEdge {
                            op: op.clone(),
                            rule_w,
                            children,
                            w,
                        });
                    }
                }
            }
            Scope::Combined(k) => {
                let left = self.nodes[id].left.ok_or_else(|| {
                    SynthError::internal("combined node without a prefix child")
                })?;
                let right = self.nodes[id].right.ok_or_else(|| {
                    SynthError::internal("combined node without a singleton child")
                })?;
                if !self.nodes[left].built {
                    self.build_edges(left, Scope::prefix(k))?;
                }
                if !self.nodes[right].built {
                    self.build_edges(right, Scope::Single(k))?;
                }

                let mut order: Vec<String> = Vec::new();
                let mut groups: FxHashMap<String, (Vec<usize>, Vec<usize>)> =
                    FxHashMap::default();
                for (e, edge) in self.nodes[left].edges.iter().enumerate() {
                    let name = edge.op.name();
                    let entry = groups.entry(name.to_owned()).or_insert_with(|| {
                        order.push(name.to_owned());
                        (Vec::new(), Vec::new())
                    });
                    entry.0.push(e);
                }
                for (e, edge) in self.nodes[right].edges.iter().enumerate() {
                    let name = edge.op.name();
                    let entry = groups.entry(name.to_owned()).or_insert_with(|| {
                        order.push(name.to_owned());
                        (Vec::new(), Vec::new())
                    });
                    entry.1.push(e);
                }

                for name in &order {
                    let (l_edges, r_edges) = groups[name].clone();
                    for &le in &l_edges {
                        for &re in &r_edges {
                            let op = self.nodes[left].edges[le].op.clone();
                            let rule_w = self.nodes[left].edges[le].rule_w;
                            let l_children = self.nodes[left].edges[le].children.clone();
                            let r_children = self.nodes[right].edges[re].children.clone();
                            debug_assert_eq!(l_children.len(), r_children.len());
                            let mut children: SmallVec<[VsaId; 3]> = SmallVec::new();
                            for j in 0..l_children.len() {
                                let (lc, rc) = (l_children[j], r_children[j]);
                                debug_assert_eq!(self.nodes[lc].state, self.nodes[rc].state);
                                let mut tuple = self.nodes[lc].constraints.clone();
                                tuple.push(self.nodes[rc].constraints[0].clone());
                                let child = self.intern_node(
                                    self.nodes[lc].state,
                                    tuple,
                                    Scope::Combined(k),
                                );
                                children.push(child);
                            }
                            // A node cannot depend on itself.
                            if children.iter().any(|&c| c == id) {
                                continue;
                            }
                            let w = rule_w
                                + children.iter().map(|&c| self.nodes[c].p).sum::<f64>();
                            self.nodes[id].edges.push(VsaEdge {
                                op,
                                rule_w,
                                children,
                                w,
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Whether a program scoring at least `limit` exists at `id`; see the
    /// module docs for the search strategy.
    fn best_within(&mut self, id: VsaId, scope: Scope, mut limit: f64) -> Result<bool, SynthError> {
        if self.nodes[id].best.is_some() {
            return Ok(true);
        }
        if self.nodes[id].p < limit {
            return Ok(false);
        }

        if let Scope::Combined(k) = scope {
            let left = self.nodes[id]
                .left
                .ok_or_else(|| SynthError::internal("combined node without a prefix child"))?;
            let right = self.nodes[id]
                .right
                .ok_or_else(|| SynthError::internal("combined node without a singleton child"))?;
            if !self.best_within(left, Scope::prefix(k), limit)?
                || !self.best_within(right, Scope::Single(k), limit)?
            {
                self.update_p(id);
                return Ok(false);
            }
            // Fast path: the prefix's solved program may already satisfy
            // the new example outright.
            let candidate = self.nodes[left]
                .best
                .clone()
                .ok_or_else(|| SynthError::internal("prefix solved without a program"))?;
            let out = candidate.run(&self.examples[k].inputs, &self.task.info, &self.cfg);
            if self.nodes[id].constraints[k].admits(&out) {
                let p = self.nodes[left].p;
                let node = &mut self.nodes[id];
                node.best = Some(candidate);
                node.p = p;
                return Ok(true);
            }
        }

        if !self.nodes[id].built {
            self.build_edges(id, scope)?;
        }
        if self.update_p(id) < limit {
            return Ok(false);
        }

        let entry_limit = limit;
        let mut pending: Vec<usize> = Vec::new();
        for e in 0..self.nodes[id].edges.len() {
            let w = self.nodes[id].edges[e].w;
            if w >= limit {
                if self.edge_solved(id, e) {
                    limit = limit.max(w);
                } else {
                    pending.push(e);
                }
            }
        }

        loop {
            // Greedy selection: the pending edge whose shortfall per
            // unresolved child is smallest (ties keep the first, so the
            // choice is deterministic).
            let mut best_edge = None;
            let mut best_remain = 0.0f64;
            for &e in &pending {
                let w = self.nodes[id].edges[e].w;
                if w <= limit {
                    continue;
                }
                let unfinished = self.nodes[id].edges[e]
                    .children
                    .iter()
                    .filter(|&&c| self.nodes[c].best.is_none())
                    .count();
                if unfinished == 0 {
                    continue;
                }
                let remain = (limit - w) / unfinished as f64;
                if remain < best_remain {
                    best_remain = remain;
                    best_edge = Some(e);
                }
            }
            let Some(e) = best_edge else { break };

            let children = self.nodes[id].edges[e].children.clone();
            let budgets: Vec<f64> = children.iter().map(|&c| self.nodes[c].p).collect();
            for (j, &child) in children.iter().enumerate() {
                if self.nodes[child].best.is_none()
                    && self.best_within(child, scope, budgets[j] + best_remain)?
                {
                    break;
                }
            }

            // Re-scan: raise the limit past every newly resolved edge,
            // drop the ones that can no longer reach it, refresh p.
            self.nodes[id].p = limit;
            let mut kept = Vec::with_capacity(pending.len());
            for &e2 in &pending {
                let w = self.recompute_edge_w(id, e2);
                if w < limit {
                    continue;
                }
                if self.edge_solved(id, e2) {
                    limit = limit.max(w);
                } else {
                    kept.push(e2);
                }
                let node = &mut self.nodes[id];
                node.p = node.p.max(w);
            }
            if let (Some(l), Some(r)) = (self.nodes[id].left, self.nodes[id].right) {
                let bound = self.nodes[l].p.min(self.nodes[r].p);
                let node = &mut self.nodes[id];
                node.p = node.p.min(bound);
            }
            pending = kept;
        }
        self.update_p(id);

        let mut chosen = None;
        for e in 0..self.nodes[id].edges.len() {
            if (self.nodes[id].edges[e].w - limit).abs() > WEIGHT_EPS {
                continue;
            }
            if self.edge_solved(id, e) {
                chosen = Some(e);
                break;
            }
        }
        if let Some(e) = chosen {
            let op = self.nodes[id].edges[e].op.clone();
            let children = self.nodes[id].edges[e].children.clone();
            let mut subs = Vec::with_capacity(children.len());
            for &c in &children {
                subs.push(self.nodes[c].best.clone().ok_or_else(|| {
                    SynthError::internal("resolved edge with an unsolved child")
                })?);
            }
            self.nodes[id].best = Some(Program::new(op, subs));
            self.check_node_program(id, scope)?;
            return Ok(true);
        }
        debug_assert!(self.nodes[id].p <= entry_limit + SCORE_EPS);
        Ok(false)
    }

    /// Re-runs a freshly assembled fragment on every example its node
    /// covers; a constraint violation is an internal fault.
    fn check_node_program(&self, id: VsaId, scope: Scope) -> Result<(), SynthError> {
        let (lo, hi) = match scope {
            Scope::Single(i) => (i, i),
            Scope::Combined(k) => (0, k),
        };
        let node = &self.nodes[id];
        let program = node
            .best
            .as_ref()
            .ok_or_else(|| SynthError::internal("checking a node without a program"))?;
        for i in lo..=hi {
            let out = program.run(&self.examples[i].inputs, &self.task.info, &self.cfg);
            let constraint = &node.constraints[i - lo];
            if !constraint.admits(&out) {
                return Err(SynthError::Internal(format!(
                    "fragment {} at state {} violates {:?} on example {} (got {})",
                    program, node.state, constraint, self.examples[i], out
                )));
            }
        }
        Ok(())
    }

    /// Recomputes a program's total log-probability from the graph's edge
    /// weights, following the unique name-matching rule at every state.
    pub fn probability_of(&self, state: StateId, program: &Program) -> Result<f64, SynthError> {
        let mut matched: Option<usize> = None;
        for &e in &self.graph.nodes[state].edges {
            if self.graph.edges[e].op.name() == program.op.name() {
                if matched.is_some() {
                    return Err(SynthError::Internal(format!(
                        "ambiguous rule '{}' at graph state {}",
                        program.op.name(),
                        state
                    )));
                }
                matched = Some(e);
            }
        }
        let e = matched.ok_or_else(|| {
            SynthError::Internal(format!(
                "no rule '{}' at graph state {}",
                program.op.name(),
                state
            ))
        })?;
        let edge = &self.graph.edges[e];
        if edge.targets.len() != program.children.len() {
            return Err(SynthError::Internal(format!(
                "arity mismatch for '{}' at graph state {}",
                program.op.name(),
                state
            )));
        }
        let mut total = edge.weight;
        for (&t, child) in edge.targets.iter().zip(&program.children) {
            total += self.probability_of(t, child)?;
        }
        Ok(total)
    }
}

/// Convenience wrapper: bind, build, and solve in one call.
pub fn synthesize(
    spec: &SpecAst,
    model: &ModelAst,
    cfg: SynthConfig,
) -> Result<Synthesis, SynthError> {
    Synthesizer::new(spec, model, cfg)?.solve()
}

#[cfg(test)]
mod tests {
    use examplar_frontend::{parse_model, parse_spec};

    use super::*;

    const ADD_SPEC: &str = r#"{
        "spec": {
            "param": [{"name": "x", "type": "Int"}, {"name": "y", "type": "Int"}],
            "return_type": "Int",
            "non_terminal": [
                {"name": "Start", "type": "Int", "rule": [
                    {"type": "expr", "operator": "+", "param": ["A", "A"]},
                    {"type": "const", "value_type": "Int", "value": 0},
                    {"type": "const", "value_type": "Int", "value": 1},
                    {"type": "const", "value_type": "Int", "value": 2},
                    {"type": "const", "value_type": "Int", "value": 3},
                    {"type": "const", "value_type": "Int", "value": 4},
                    {"type": "const", "value_type": "Int", "value": 5}
                ]},
                {"name": "A", "type": "Int", "rule": [
                    {"type": "const", "value_type": "Int", "value": 0},
                    {"type": "const", "value_type": "Int", "value": 1},
                    {"type": "const", "value_type": "Int", "value": 2},
                    {"type": "const", "value_type": "Int", "value": 3},
                    {"type": "const", "value_type": "Int", "value": 4},
                    {"type": "const", "value_type": "Int", "value": 5}
                ]}
            ]
        },
        "constraint": [
            {"type": "expr", "operator": "=", "params": [
                {"type": "function", "params": [
                    {"type": "const", "value_type": "Int", "value": 2},
                    {"type": "const", "value_type": "Int", "value": 3}]},
                {"type": "const", "value_type": "Int", "value": 5}
            ]}
        ]
    }"#;

    const ADD_MODEL: &str = r#"[
        {"context": ["None", "None"],
         "rule": [{"term": "+", "p": 0.9}, {"term": "Constant@Int", "p": 0.001}]},
        {"context": ["None", "+@1"],
         "rule": [{"term": "Constant@Int", "p": 0.8}]},
        {"context": ["None", "+@2"],
         "rule": [{"term": "Constant@Int", "p": 0.8}]}
    ]"#;

    fn add_synthesizer() -> Synthesizer {
        let spec = parse_spec(ADD_SPEC).unwrap();
        let model = parse_model(ADD_MODEL).unwrap();
        Synthesizer::new(&spec, &model, SynthConfig::default()).unwrap()
    }

    #[test]
    fn interning_is_idempotent() {
        let mut synth = add_synthesizer();
        synth.add_example(Example {
            inputs: vec![Value::Int(2), Value::Int(3)],
            output: Value::Int(5),
        });
        let tuple: ConstraintTuple = smallvec![Constraint::Exact(Value::Int(5))];
        let a = synth.intern_node(START_STATE, tuple.clone(), Scope::Single(0));
        let b = synth.intern_node(START_STATE, tuple, Scope::Single(0));
        assert_eq!(a, b);
        // A different constraint tuple gets a different node.
        let c = synth.intern_node(
            START_STATE,
            smallvec![Constraint::Exact(Value::Int(6))],
            Scope::Single(0),
        );
        assert_ne!(a, c);
    }

    #[test]
    fn combined_nodes_record_the_binary_split() {
        let mut synth = add_synthesizer();
        for (x, y, out) in [(2, 3, 5), (1, 1, 2)] {
            synth.add_example(Example {
                inputs: vec![Value::Int(x), Value::Int(y)],
                output: Value::Int(out),
            });
        }
        let tuple: ConstraintTuple = smallvec![
            Constraint::Exact(Value::Int(5)),
            Constraint::Exact(Value::Int(2))
        ];
        let id = synth.intern_node(START_STATE, tuple, Scope::Combined(1));
        let node = &synth.nodes[id];
        let (l, r) = (node.left.unwrap(), node.right.unwrap());
        assert_eq!(synth.nodes[l].constraints.len(), 1);
        assert_eq!(synth.nodes[r].constraints.len(), 1);
        assert_eq!(
            synth.nodes[l].constraints[0],
            Constraint::Exact(Value::Int(5))
        );
        assert_eq!(
            synth.nodes[r].constraints[0],
            Constraint::Exact(Value::Int(2))
        );
        // p starts at the children's minimum, which in turn starts at the
        // graph upper bound.
        assert!(node.p <= synth.graph.nodes[START_STATE].upper_bound + 1e-9);
    }

    #[test]
    fn node_scores_never_increase() {
        let mut synth = add_synthesizer();
        synth.add_example(Example {
            inputs: vec![Value::Int(2), Value::Int(3)],
            output: Value::Int(5),
        });
        let tuple: ConstraintTuple = smallvec![Constraint::Exact(Value::Int(5))];
        let id = synth.intern_node(START_STATE, tuple, Scope::Single(0));
        let before = synth.nodes[id].p;
        synth.build_edges(id, Scope::Single(0)).unwrap();
        let after = synth.update_p(id);
        assert!(after <= before + 1e-9);
    }

    #[test]
    fn solves_the_addition_example() {
        let mut synth = add_synthesizer();
        let Synthesis::Found { program, score } = synth.solve().unwrap() else {
            panic!("expected a program");
        };
        // The model strongly prefers +, so the synthesized program is an
        // addition of constants, not the bare constant 5.
        assert_eq!(program.op.name(), "+");
        assert!(score < 0.0);
        let out = program.run(
            &[Value::Int(2), Value::Int(3)],
            &synth.task.info,
            &synth.cfg,
        );
        assert_eq!(out, Value::Int(5));
        // The reported score is the recomputed grammar probability.
        let recomputed = synth.probability_of(START_STATE, &program).unwrap();
        assert!((recomputed - score).abs() < 1e-6);
    }

    #[test]
    fn determinism_across_fresh_runs() {
        let run = || {
            let mut synth = add_synthesizer();
            match synth.solve().unwrap() {
                Synthesis::Found { program, score } => (program.to_string(), score),
                Synthesis::Exhausted { .. } => panic!("expected a program"),
            }
        };
        let (p1, s1) = run();
        let (p2, s2) = run();
        assert_eq!(p1, p2);
        assert_eq!(s1, s2);
    }

    #[test]
    fn unsatisfiable_grammars_exhaust_the_floor() {
        let spec = parse_spec(
            r#"{
            "spec": {
                "param": [{"name": "x", "type": "Int"}],
                "return_type": "Int",
                "non_terminal": [
                    {"name": "Start", "type": "Int", "rule": [
                        {"type": "expr", "operator": "+", "param": ["Start", "Start"]}
                    ]}
                ]
            },
            "constraint": [
                {"type": "expr", "operator": "=", "params": [
                    {"type": "function", "params": [
                        {"type": "const", "value_type": "Int", "value": 1}]},
                    {"type": "const", "value_type": "Int", "value": 3}
                ]}
            ]
        }"#,
        )
        .unwrap();
        let model = ModelAst::default();
        let mut synth = Synthesizer::new(&spec, &model, SynthConfig::default()).unwrap();
        let Synthesis::Exhausted { floor } = synth.solve().unwrap() else {
            panic!("expected exhaustion");
        };
        assert!(floor < SynthConfig::default().floor_min + SynthConfig::default().floor_step);
    }
}
