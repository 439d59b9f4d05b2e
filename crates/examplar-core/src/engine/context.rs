//! # Derivation Contexts
//!
//! "Where in the derivation are we" is encoded as a bounded window of
//! ancestor tokens: one `<operator>@<argument-position>` token per
//! ancestor step, innermost last, left-padded with `None` when the
//! derivation is shallower than the model depth.
//!
//! Operators are abstracted before tokenization: parameters become
//! `Param@<Type>`, constants become `Constant@<Type>` — except string
//! constants of a programming-by-example task, which are abstracted by a
//! *learned category* describing where the literal occurs in the example
//! space (`Constant@None`, `Constant@SomeInput`, `Constant@SomeOutput`,
//! `Constant@SomeInOutput`). Categories are computed on first request by
//! scanning the full example set and memoized per literal.
//!
//! The n-gram model's *minimal* context (the equivalence used to merge
//! graph states) coincides with the abstracted context; the two accessors
//! are kept distinct because they answer different questions.

use std::fmt;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use examplar_frontend::{ModelAst, Value};

use crate::engine::program::PartialProgram;
use crate::engine::semantics::{Semantics, TaskInfo};

/// Token used for ancestor positions above the derivation root.
pub const NONE_TOKEN: &str = "None";

/// A bounded ancestor window; the canonical key for the probability table
/// and for graph-state merging.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Context(pub SmallVec<[String; 4]>);

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, tok) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(tok)?;
        }
        f.write_str("}")
    }
}

/// The learned probability table: context → (term, probability) entries
/// sorted descending by probability. Immutable after construction;
/// unknown contexts yield the empty list.
pub struct ContextModel {
    table: FxHashMap<Context, Vec<(String, f64)>>,
    /// Window length shared by every record.
    pub depth: usize,
}

impl ContextModel {
    /// Builds the table from a parsed model file. `default_depth` applies
    /// when the model is empty.
    pub fn from_ast(ast: &ModelAst, default_depth: usize) -> ContextModel {
        let mut table = FxHashMap::default();
        for record in &ast.records {
            let ctx = Context(record.context.iter().cloned().collect());
            table.insert(ctx, record.rules.clone());
        }
        ContextModel {
            table,
            depth: ast.depth.unwrap_or(default_depth),
        }
    }

    /// The ranked entries for a context (empty when unseen).
    pub fn lookup(&self, ctx: &Context) -> &[(String, f64)] {
        self.table.get(ctx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct contexts in the model.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Occurrence category of a string literal across the example space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralCategory {
    /// Appears in no example.
    None,
    /// Appears in some example input.
    SomeInput,
    /// Appears in some example output.
    SomeOutput,
    /// Appears in inputs and outputs.
    SomeInOutput,
}

impl LiteralCategory {
    fn token(self) -> &'static str {
        match self {
            LiteralCategory::None => "Constant@None",
            LiteralCategory::SomeInput => "Constant@SomeInput",
            LiteralCategory::SomeOutput => "Constant@SomeOutput",
            LiteralCategory::SomeInOutput => "Constant@SomeInOutput",
        }
    }
}

/// Produces the abstracted and minimal contexts of positions inside a
/// partial program, and owns the literal-category cache.
pub struct ContextMaintainer<'a> {
    depth: usize,
    pbe: bool,
    info: &'a TaskInfo,
    literal_cache: FxHashMap<String, LiteralCategory>,
}

impl<'a> ContextMaintainer<'a> {
    pub fn new(depth: usize, info: &'a TaskInfo) -> ContextMaintainer<'a> {
        ContextMaintainer {
            depth,
            pbe: info.pbe,
            info,
            literal_cache: FxHashMap::default(),
        }
    }

    /// The last `depth` ancestor tokens of the node at `path`, padded
    /// with [`NONE_TOKEN`]. Used for probability-table lookup.
    pub fn abstracted_context(&mut self, program: &PartialProgram, path: &[usize]) -> Context {
        let mut tokens: SmallVec<[String; 4]> = SmallVec::new();
        let skip = path.len().saturating_sub(self.depth);
        for _ in path.len()..self.depth {
            tokens.push(NONE_TOKEN.to_owned());
        }
        let mut node = program;
        for (i, &pos) in path.iter().enumerate() {
            if i >= skip {
                let op = node.op.as_deref().expect("ancestor on a derivation path has an operator");
                tokens.push(format!("{}@{}", self.op_token(op), pos + 1));
            }
            node = &node.children[pos];
        }
        Context(tokens)
    }

    /// The coarsest context distinguishing grammar states for graph-node
    /// merging. For the n-gram model this is the abstracted context.
    pub fn minimal_context(&mut self, program: &PartialProgram, path: &[usize]) -> Context {
        self.abstracted_context(program, path)
    }

    /// Whether string literals are abstracted by learned category.
    pub fn is_pbe(&self) -> bool {
        self.pbe
    }

    /// Abstraction token of one operator (shared with the graph's
    /// category-aware rule matching).
    pub fn op_token(&mut self, op: &dyn Semantics) -> String {
        if op.param_index().is_some() {
            return format!("Param@{}", op.return_type().name());
        }
        if let Some(value) = op.literal() {
            return self.literal_token(value).to_owned();
        }
        op.name().to_owned()
    }

    fn literal_token(&mut self, value: &Value) -> String {
        match value {
            Value::Str(s) if self.pbe => self.string_category(s).token().to_owned(),
            other => format!("Constant@{}", other.ty().name()),
        }
    }

    /// Category of one string literal, computed on first request by
    /// scanning the full example space.
    pub fn string_category(&mut self, literal: &str) -> LiteralCategory {
        if let Some(&cat) = self.literal_cache.get(literal) {
            return cat;
        }
        let mut in_inputs = false;
        let mut in_outputs = false;
        for example in &self.info.examples {
            if example
                .inputs
                .iter()
                .any(|v| matches!(v, Value::Str(s) if s.contains(literal)))
            {
                in_inputs = true;
            }
            if matches!(&example.output, Value::Str(s) if s.contains(literal)) {
                in_outputs = true;
            }
        }
        let cat = match (in_inputs, in_outputs) {
            (true, true) => LiteralCategory::SomeInOutput,
            (true, false) => LiteralCategory::SomeInput,
            (false, true) => LiteralCategory::SomeOutput,
            (false, false) => LiteralCategory::None,
        };
        self.literal_cache.insert(literal.to_owned(), cat);
        cat
    }
}

#[cfg(test)]
mod tests {
    use examplar_frontend::{Example, Type};

    use super::*;
    use crate::engine::semantics::{ConstOp, ParamOp, Registry};

    fn task_with_examples() -> TaskInfo {
        let mut info = TaskInfo::empty();
        info.pbe = true;
        info.examples = vec![
            Example {
                inputs: vec![Value::Str("ab".into())],
                output: Value::Str("a!".into()),
            },
            Example {
                inputs: vec![Value::Str("cd".into())],
                output: Value::Str("c!".into()),
            },
        ];
        info
    }

    #[test]
    fn shallow_paths_are_padded() {
        let info = TaskInfo::empty();
        let mut maintainer = ContextMaintainer::new(2, &info);
        let program = PartialProgram::hole();
        let ctx = maintainer.abstracted_context(&program, &[]);
        assert_eq!(ctx.to_string(), "{None, None}");
    }

    #[test]
    fn context_window_keeps_the_innermost_ancestors() {
        let info = TaskInfo::empty();
        let registry = Registry::with_builtins();
        let concat = registry.get("str.++").unwrap();
        let mut program = PartialProgram::hole();
        program.expand(&[], concat.clone());
        program.expand(&[1], concat.clone());

        let mut maintainer = ContextMaintainer::new(2, &info);
        let ctx = maintainer.abstracted_context(&program, &[1, 0]);
        assert_eq!(ctx.to_string(), "{str.++@2, str.++@1}");

        let mut deep = ContextMaintainer::new(3, &info);
        let ctx = deep.abstracted_context(&program, &[1, 0]);
        assert_eq!(ctx.to_string(), "{None, str.++@2, str.++@1}");
    }

    #[test]
    fn leaves_are_abstracted_by_kind() {
        let info = task_with_examples();
        let mut maintainer = ContextMaintainer::new(2, &info);
        let param = ParamOp::new(0, Type::Str);
        assert_eq!(maintainer.op_token(&param), "Param@String");
        let int_const = ConstOp::new(Value::Int(3));
        assert_eq!(maintainer.op_token(&int_const), "Constant@Int");
    }

    #[test]
    fn string_literals_use_learned_categories() {
        let info = task_with_examples();
        let mut maintainer = ContextMaintainer::new(2, &info);
        assert_eq!(maintainer.string_category("a"), LiteralCategory::SomeInOutput);
        assert_eq!(maintainer.string_category("b"), LiteralCategory::SomeInput);
        assert_eq!(maintainer.string_category("!"), LiteralCategory::SomeOutput);
        assert_eq!(maintainer.string_category("z"), LiteralCategory::None);
        // Memoized: the cache answers repeated queries.
        assert_eq!(maintainer.string_category("z"), LiteralCategory::None);
        let op = ConstOp::new(Value::Str("!".into()));
        assert_eq!(maintainer.op_token(&op), "Constant@SomeOutput");
    }

    #[test]
    fn model_lookup_defaults_to_empty() {
        let model = ContextModel::from_ast(&ModelAst::default(), 2);
        assert_eq!(model.depth, 2);
        assert!(model.lookup(&Context::default()).is_empty());
        assert!(model.is_empty());
    }
}
