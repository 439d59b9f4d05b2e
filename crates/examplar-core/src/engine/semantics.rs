//! # Operator Semantics
//!
//! Every DSL operator implements the [`Semantics`] trait: forward
//! evaluation (`run`) and inverse semantics (`witness`). The witness
//! function is the solver's oracle: given a constraint on the operator's
//! output and the current example's inputs, it enumerates every tuple of
//! argument constraints that could produce an admissible output. An empty
//! list means the output is unreachable through this operator; an
//! unconstrained argument is expressed with [`Constraint::Any`].
//!
//! Constants and parameter references are themselves zero-arity operators
//! ([`ConstOp`], [`ParamOp`]), so the grammar and the solver treat leaves
//! and interior rules uniformly.
//!
//! A [`Registry`] maps operator names to shared handles once, at
//! grammar-bind time; the search hot path never performs name lookups.

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use examplar_frontend::{Example, Type, Value};

use crate::engine::config::SynthConfig;

/// A constraint on the value one subprogram must produce for one example.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// Any value of the right type is admissible.
    Any,
    /// Exactly this value.
    Exact(Value),
    /// Any integer in the inclusive range. Invariant: `lo < hi` — a
    /// degenerate range is normalized to `Exact` by [`Constraint::int_range`].
    IntRange(i64, i64),
}

impl Constraint {
    /// Builds an integer range constraint, normalizing the degenerate
    /// single-value case to `Exact`.
    pub fn int_range(lo: i64, hi: i64) -> Constraint {
        debug_assert!(lo <= hi, "empty integer range {}..={}", lo, hi);
        if lo == hi {
            Constraint::Exact(Value::Int(lo))
        } else {
            Constraint::IntRange(lo, hi)
        }
    }

    /// Whether `value` satisfies this constraint.
    pub fn admits(&self, value: &Value) -> bool {
        match self {
            Constraint::Any => true,
            Constraint::Exact(v) => v == value,
            Constraint::IntRange(lo, hi) => match value {
                Value::Int(v) => lo <= v && v <= hi,
                _ => false,
            },
        }
    }

    /// The inclusive integer interval this constraint allows, with `Any`
    /// widened to the configured domain. Only meaningful for constraints
    /// on integer-typed positions.
    pub fn int_bounds(&self, cfg: &SynthConfig) -> Option<(i64, i64)> {
        match self {
            Constraint::Any => Some((cfg.int_min, cfg.int_max)),
            Constraint::Exact(Value::Int(v)) => Some((*v, *v)),
            Constraint::IntRange(lo, hi) => Some((*lo, *hi)),
            Constraint::Exact(_) => None,
        }
    }
}

/// One candidate argument assignment: one constraint per operator
/// argument, in signature order.
pub type WitnessTerm = Vec<Constraint>;

/// Per-task information shared by witness functions and evaluation:
/// the example space and the constant pools harvested from the grammar.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    /// Whether the task is programming-by-example (string-constant
    /// abstraction and constant-pool witnesses are only active here).
    pub pbe: bool,
    /// The full example space of the specification (not just the examples
    /// incorporated so far).
    pub examples: Vec<Example>,
    /// String forms of the grammar's string and integer constants, in
    /// declaration order.
    pub str_consts: Vec<String>,
    /// Membership view of `str_consts`.
    pub const_set: FxHashSet<String>,
    /// Integer constants declared in the grammar (tensor dimension pool).
    pub int_consts: Vec<i64>,
}

impl TaskInfo {
    /// An empty task (useful for tests and unconstrained evaluation).
    pub fn empty() -> TaskInfo {
        TaskInfo {
            pbe: false,
            examples: Vec::new(),
            str_consts: Vec::new(),
            const_set: FxHashSet::default(),
            int_consts: Vec::new(),
        }
    }
}

/// Everything an operator may consult while running or inverting:
/// the current example's parameter values, the task pools, and the
/// numeric configuration.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    /// Parameter values of the example under consideration.
    pub inputs: &'a [Value],
    pub info: &'a TaskInfo,
    pub cfg: &'a SynthConfig,
}

impl<'a> EvalContext<'a> {
    pub fn new(inputs: &'a [Value], info: &'a TaskInfo, cfg: &'a SynthConfig) -> Self {
        EvalContext { inputs, info, cfg }
    }

    /// Iterates the string-typed parameter values of the current example.
    pub fn str_inputs(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.inputs.iter().filter_map(|v| v.as_str())
    }
}

/// The semantics of one DSL operator.
pub trait Semantics {
    /// Operator name as it appears in grammars and model files.
    fn name(&self) -> &str;

    /// Argument types, in order. Empty for leaves.
    fn arg_types(&self) -> &[Type];

    /// Output type.
    fn return_type(&self) -> Type;

    /// Forward evaluation. Total for any arguments matching the declared
    /// signature; a type mismatch is a precondition violation.
    fn run(&self, args: &[Value], ctx: &EvalContext) -> Value;

    /// Inverse semantics: every argument-constraint tuple whose
    /// evaluations can satisfy `output`.
    fn witness(&self, output: &Constraint, ctx: &EvalContext) -> Vec<WitnessTerm>;

    /// The constant value, for constant operators.
    fn literal(&self) -> Option<&Value> {
        None
    }

    /// The parameter index, for parameter-reference operators.
    fn param_index(&self) -> Option<usize> {
        None
    }
}

/// Shared operator handle.
pub type OpRef = Rc<dyn Semantics>;

pub(crate) fn debug_check_args(op: &dyn Semantics, args: &[Value]) {
    debug_assert_eq!(args.len(), op.arg_types().len(), "arity mismatch for {}", op.name());
    debug_assert!(
        args.iter()
            .zip(op.arg_types())
            .all(|(v, ty)| v.ty() == *ty),
        "argument type mismatch for {}",
        op.name()
    );
}

/// A literal constant as a zero-arity operator. Its name is the literal's
/// display form, which is also how model files refer to concrete
/// constants before abstraction.
pub struct ConstOp {
    value: Value,
    name: String,
}

impl ConstOp {
    pub fn new(value: Value) -> ConstOp {
        let name = value.to_string();
        ConstOp { value, name }
    }
}

impl Semantics for ConstOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn arg_types(&self) -> &[Type] {
        &[]
    }

    fn return_type(&self) -> Type {
        self.value.ty()
    }

    fn run(&self, _args: &[Value], _ctx: &EvalContext) -> Value {
        self.value.clone()
    }

    fn witness(&self, output: &Constraint, _ctx: &EvalContext) -> Vec<WitnessTerm> {
        if output.admits(&self.value) {
            vec![Vec::new()]
        } else {
            Vec::new()
        }
    }

    fn literal(&self) -> Option<&Value> {
        Some(&self.value)
    }
}

/// A parameter reference as a zero-arity operator.
pub struct ParamOp {
    index: usize,
    ty: Type,
    name: String,
}

impl ParamOp {
    pub fn new(index: usize, ty: Type) -> ParamOp {
        ParamOp {
            index,
            ty,
            name: format!("Param{}", index),
        }
    }
}

impl Semantics for ParamOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn arg_types(&self) -> &[Type] {
        &[]
    }

    fn return_type(&self) -> Type {
        self.ty
    }

    fn run(&self, _args: &[Value], ctx: &EvalContext) -> Value {
        ctx.inputs[self.index].clone()
    }

    fn witness(&self, output: &Constraint, ctx: &EvalContext) -> Vec<WitnessTerm> {
        if output.admits(&ctx.inputs[self.index]) {
            vec![Vec::new()]
        } else {
            Vec::new()
        }
    }

    fn param_index(&self) -> Option<usize> {
        Some(self.index)
    }
}

/// Maps operator names to implementations. Built once before binding;
/// the bound grammar holds the resolved handles.
///
/// A name may carry several candidates (`ite` exists for integer and
/// string branches); grammar binding disambiguates by signature.
pub struct Registry {
    ops: FxHashMap<String, Vec<OpRef>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Registry {
        Registry {
            ops: FxHashMap::default(),
        }
    }

    /// A registry preloaded with the built-in string, integer, boolean,
    /// and tensor operators.
    pub fn with_builtins() -> Registry {
        let mut registry = Registry::new();
        crate::engine::ops::install(&mut registry);
        registry
    }

    /// Registers an operator under its own name.
    pub fn register(&mut self, op: OpRef) {
        self.ops.entry(op.name().to_owned()).or_default().push(op);
    }

    /// Looks up an operator by name; with several candidates, the first
    /// registered wins.
    pub fn get(&self, name: &str) -> Option<OpRef> {
        self.ops.get(name).and_then(|ops| ops.first().cloned())
    }

    /// All candidates registered under a name.
    pub fn candidates(&self, name: &str) -> &[OpRef] {
        self.ops.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::with_builtins()
    }
}

/// A small helper used by several string witnesses: candidate strings are
/// drawn from the constant pool and the current example's parameters.
pub(crate) fn pool_and_inputs(ctx: &EvalContext) -> Vec<String> {
    let mut out: Vec<String> = ctx.info.str_consts.clone();
    out.extend(ctx.str_inputs().map(str::to_owned));
    out
}

/// Constraint tuple carried by a version-space node (one entry per
/// incorporated example).
pub type ConstraintTuple = SmallVec<[Constraint; 2]>;
