//! # Specification AST
//!
//! Data structures produced by the loaders: the synthesis task signature,
//! the grammar (nonterminals and their rule forms), the recognized
//! constraint style, and the probability-model records.
//!
//! Operator references are kept by name at this layer; the core engine
//! resolves them against its operator registry when the grammar is bound.

use std::fmt;

use crate::value::{Type, Value};

/// A parsed specification: signature, grammar, and semantic constraints.
#[derive(Debug, Clone)]
pub struct SpecAst {
    /// Synthesized function parameters, in declaration order.
    pub params: Vec<ParamDef>,
    /// Return type of the synthesized function.
    pub return_type: Type,
    /// Grammar nonterminals, in declaration order.
    pub nonterminals: Vec<NonTerminalDef>,
    /// The recognized constraint style.
    pub style: SpecStyle,
}

/// A named, typed parameter of the synthesized function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDef {
    pub name: String,
    pub ty: Type,
}

/// A grammar nonterminal and its production rules.
#[derive(Debug, Clone)]
pub struct NonTerminalDef {
    pub name: String,
    pub ty: Type,
    pub rules: Vec<RuleAst>,
}

/// One production rule of a nonterminal.
#[derive(Debug, Clone)]
pub enum RuleAst {
    /// Operator application; arguments name other nonterminals.
    Op { name: String, args: Vec<String> },
    /// Reference to a function parameter.
    Param { index: usize, ty: Type },
    /// A literal constant.
    Literal { value: Value },
}

/// One input/output example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    /// One value per function parameter.
    pub inputs: Vec<Value>,
    /// The required output.
    pub output: Value,
}

impl fmt::Display for Example {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, v) in self.inputs.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "}} => {}", self.output)
    }
}

/// The two supported constraint styles.
#[derive(Debug, Clone)]
pub enum SpecStyle {
    /// Programming by example: every constraint is one input/output pair.
    Examples(Vec<Example>),
    /// Oracle equivalence: the synthesized function must agree with a
    /// reference program on its whole input domain.
    Oracle(ProgramAst),
}

/// A syntax tree for a concrete program (oracle bodies).
#[derive(Debug, Clone)]
pub enum ProgramAst {
    /// Operator application.
    Apply { op: String, args: Vec<ProgramAst> },
    /// Function parameter reference.
    Param { index: usize, ty: Type },
    /// A literal constant.
    Literal { value: Value },
}

/// One record of the learned probability model: a derivation context and
/// the operators observed under it, ranked by probability (descending).
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRecord {
    /// Context tokens, outermost ancestor first.
    pub context: Vec<String>,
    /// `(operator term, probability)` pairs, sorted descending by
    /// probability.
    pub rules: Vec<(String, f64)>,
}

/// The parsed probability model.
#[derive(Debug, Clone, Default)]
pub struct ModelAst {
    /// Context depth shared by all records; `None` for an empty model.
    pub depth: Option<usize>,
    pub records: Vec<ModelRecord>,
}
