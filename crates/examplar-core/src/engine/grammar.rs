//! # Grammar Binding
//!
//! Turns a validated specification AST into the engine's working form:
//! symbols whose rules hold resolved operator handles, the task's example
//! space and constant pools, and the configuration values that are
//! derived from the task (integer domain, tensor rank).
//!
//! Operator names are resolved against the [`Registry`] exactly once
//! here; the graph and the solver only ever touch handles.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::rc::Rc;

use examplar_frontend::{validate_spec, ProgramAst, RuleAst, SpecAst, SpecStyle, Type, Value};

use crate::engine::config::SynthConfig;
use crate::engine::errors::SynthError;
use crate::engine::program::Program;
use crate::engine::semantics::{ConstOp, OpRef, ParamOp, Registry, TaskInfo};

/// Index of a symbol within its grammar.
pub type SymbolId = usize;

/// One production rule: an operator plus the symbols supplying its
/// arguments.
pub struct Rule {
    pub op: OpRef,
    pub args: SmallVec<[SymbolId; 3]>,
}

/// A typed grammar symbol and its rules, in declaration order.
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    pub rules: Vec<Rule>,
}

/// A bound grammar.
pub struct Grammar {
    pub symbols: Vec<Symbol>,
    pub start: SymbolId,
}

/// A bound synthesis task: grammar, optional oracle, and the shared
/// information witness functions consult.
pub struct Task {
    pub grammar: Grammar,
    /// Parameter types of the synthesized function, in order.
    pub params: Vec<Type>,
    /// Reference program for oracle-equivalence tasks.
    pub oracle: Option<Program>,
    pub info: TaskInfo,
}

/// Binds a specification, returning the task and the configuration with
/// its task-derived fields filled in.
pub fn bind(
    spec: &SpecAst,
    registry: &Registry,
    mut cfg: SynthConfig,
) -> Result<(Task, SynthConfig), SynthError> {
    validate_spec(spec)?;

    let symbol_id = |name: &str| -> Option<SymbolId> {
        spec.nonterminals.iter().position(|nt| nt.name == name)
    };

    let mut symbols = Vec::with_capacity(spec.nonterminals.len());
    for nt in &spec.nonterminals {
        let mut rules = Vec::with_capacity(nt.rules.len());
        for rule in &nt.rules {
            let bound = match rule {
                RuleAst::Op { name, args } => {
                    let arg_ids: SmallVec<[SymbolId; 3]> = args
                        .iter()
                        .map(|a| symbol_id(a).expect("validated rule argument"))
                        .collect();
                    let arg_types: Vec<Type> = arg_ids
                        .iter()
                        .map(|&id| spec.nonterminals[id].ty)
                        .collect();
                    let op = resolve_operator(registry, name, &arg_types, nt.ty)?;
                    Rule { op, args: arg_ids }
                }
                RuleAst::Param { index, ty } => {
                    if *ty != nt.ty {
                        return Err(SynthError::Validation(format!(
                            "parameter rule of type {} under symbol '{}' of type {}",
                            ty, nt.name, nt.ty
                        )));
                    }
                    Rule {
                        op: Rc::new(ParamOp::new(*index, *ty)),
                        args: SmallVec::new(),
                    }
                }
                RuleAst::Literal { value } => {
                    if value.ty() != nt.ty {
                        return Err(SynthError::Validation(format!(
                            "constant {} under symbol '{}' of type {}",
                            value, nt.name, nt.ty
                        )));
                    }
                    Rule {
                        op: Rc::new(ConstOp::new(value.clone())),
                        args: SmallVec::new(),
                    }
                }
            };
            rules.push(bound);
        }
        symbols.push(Symbol {
            name: nt.name.clone(),
            ty: nt.ty,
            rules,
        });
    }

    let start = spec
        .nonterminals
        .iter()
        .position(|nt| nt.name.contains("Start") && nt.ty == spec.return_type)
        .expect("validated start symbol");

    let grammar = Grammar { symbols, start };

    let (examples, oracle, pbe) = match &spec.style {
        SpecStyle::Examples(examples) => (examples.clone(), None, true),
        SpecStyle::Oracle(ast) => (Vec::new(), Some(bind_program(ast, registry)?), false),
    };

    // Constant pools, harvested from the bound grammar in declaration
    // order. Integer constants also join the string pool in decimal form.
    let mut str_consts = Vec::new();
    let mut int_consts = Vec::new();
    for symbol in &grammar.symbols {
        for rule in &symbol.rules {
            match rule.op.literal() {
                Some(Value::Int(v)) => {
                    str_consts.push(v.to_string());
                    if !int_consts.contains(v) {
                        int_consts.push(*v);
                    }
                }
                Some(Value::Str(s)) => str_consts.push(s.clone()),
                _ => {}
            }
        }
    }
    let const_set: FxHashSet<String> = str_consts.iter().cloned().collect();

    // Integer domain: wide enough to index every string and to reproduce
    // every integer the task mentions.
    if pbe {
        let mut derived: Option<i64> = None;
        let mut note = |v: i64| derived = Some(derived.unwrap_or(i64::MIN).max(v));
        for s in &str_consts {
            note(s.len() as i64);
        }
        for v in &int_consts {
            note(v.abs());
        }
        for example in &examples {
            for value in example.inputs.iter().chain(std::iter::once(&example.output)) {
                match value {
                    Value::Str(s) => note(s.len() as i64),
                    Value::Int(v) => note(v.abs()),
                    _ => {}
                }
            }
        }
        if let Some(max) = derived {
            cfg.int_max = max;
        }
    }

    // Tensor rank bound: at least every rank the examples exhibit.
    for example in &examples {
        for value in example.inputs.iter().chain(std::iter::once(&example.output)) {
            if let Value::Tensor(t) = value {
                cfg.max_rank = cfg.max_rank.max(t.rank());
            }
        }
    }

    let info = TaskInfo {
        pbe,
        examples,
        str_consts,
        const_set,
        int_consts,
    };

    Ok((
        Task {
            grammar,
            params: spec.params.iter().map(|p| p.ty).collect(),
            oracle,
            info,
        },
        cfg,
    ))
}

/// Resolves an operator by name, disambiguating same-name candidates by
/// signature.
fn resolve_operator(
    registry: &Registry,
    name: &str,
    arg_types: &[Type],
    return_type: Type,
) -> Result<OpRef, SynthError> {
    let candidates = registry.candidates(name);
    if candidates.is_empty() {
        return Err(SynthError::UnknownOperator(name.to_owned()));
    }
    candidates
        .iter()
        .find(|op| op.arg_types() == arg_types && op.return_type() == return_type)
        .cloned()
        .ok_or_else(|| {
            SynthError::Validation(format!(
                "no variant of '{}' matches signature ({:?}) -> {}",
                name, arg_types, return_type
            ))
        })
}

/// Binds a concrete program tree (oracle bodies).
fn bind_program(ast: &ProgramAst, registry: &Registry) -> Result<Program, SynthError> {
    match ast {
        ProgramAst::Literal { value } => Ok(Program::leaf(Rc::new(ConstOp::new(value.clone())))),
        ProgramAst::Param { index, ty } => Ok(Program::leaf(Rc::new(ParamOp::new(*index, *ty)))),
        ProgramAst::Apply { op, args } => {
            let children: Vec<Program> = args
                .iter()
                .map(|a| bind_program(a, registry))
                .collect::<Result<_, _>>()?;
            let arg_types: Vec<Type> = children.iter().map(|c| c.op.return_type()).collect();
            let candidates = registry.candidates(op);
            if candidates.is_empty() {
                return Err(SynthError::UnknownOperator(op.clone()));
            }
            let resolved = candidates
                .iter()
                .find(|o| o.arg_types() == arg_types.as_slice())
                .cloned()
                .ok_or_else(|| {
                    SynthError::Validation(format!(
                        "no variant of '{}' accepts arguments ({:?})",
                        op, arg_types
                    ))
                })?;
            Ok(Program::new(resolved, children))
        }
    }
}
