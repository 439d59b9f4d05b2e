//! # Program Trees
//!
//! A [`Program`] is an owned AST: an operator handle plus one subtree per
//! argument. Cloning deep-copies the tree (operator handles are shared).
//! Programs display as s-expressions, the form the CLI writes out.
//!
//! [`PartialProgram`] is the graph builder's scratch representation: the
//! same shape with an optional operator, where `None` marks a hole still
//! to be derived.

use std::fmt;

use examplar_frontend::Value;

use crate::engine::config::SynthConfig;
use crate::engine::semantics::{EvalContext, OpRef, TaskInfo};

/// A complete program in the DSL.
#[derive(Clone)]
pub struct Program {
    pub op: OpRef,
    pub children: Vec<Program>,
}

impl Program {
    /// A leaf node (constant or parameter reference).
    pub fn leaf(op: OpRef) -> Program {
        Program {
            op,
            children: Vec::new(),
        }
    }

    pub fn new(op: OpRef, children: Vec<Program>) -> Program {
        debug_assert_eq!(op.arg_types().len(), children.len());
        Program { op, children }
    }

    /// Evaluates the program under the given context.
    pub fn eval(&self, ctx: &EvalContext) -> Value {
        let args: Vec<Value> = self.children.iter().map(|c| c.eval(ctx)).collect();
        self.op.run(&args, ctx)
    }

    /// Evaluates the program on one example's inputs.
    pub fn run(&self, inputs: &[Value], info: &TaskInfo, cfg: &SynthConfig) -> Value {
        self.eval(&EvalContext::new(inputs, info, cfg))
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Program::size).sum::<usize>()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.children.is_empty() {
            return f.write_str(self.op.name());
        }
        write!(f, "({}", self.op.name())?;
        for child in &self.children {
            write!(f, " {}", child)?;
        }
        f.write_str(")")
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Program({})", self)
    }
}

/// A derivation in progress: holes (`op == None`) mark positions the
/// grammar has not expanded yet.
#[derive(Clone, Default)]
pub struct PartialProgram {
    pub op: Option<OpRef>,
    pub children: Vec<PartialProgram>,
}

impl PartialProgram {
    /// A single unexpanded hole.
    pub fn hole() -> PartialProgram {
        PartialProgram::default()
    }

    /// The node reached by following `path` (child indices, root first).
    pub fn node_at(&self, path: &[usize]) -> &PartialProgram {
        let mut node = self;
        for &pos in path {
            node = &node.children[pos];
        }
        node
    }

    fn node_at_mut(&mut self, path: &[usize]) -> &mut PartialProgram {
        let mut node = self;
        for &pos in path {
            node = &mut node.children[pos];
        }
        node
    }

    /// Expands the hole at `path` with `op`, appending one fresh hole per
    /// operator argument.
    pub fn expand(&mut self, path: &[usize], op: OpRef) {
        let node = self.node_at_mut(path);
        debug_assert!(node.op.is_none(), "expanding a non-hole node");
        let arity = op.arg_types().len();
        node.op = Some(op);
        node.children = (0..arity).map(|_| PartialProgram::hole()).collect();
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use examplar_frontend::Type;

    use super::*;
    use crate::engine::semantics::{ConstOp, ParamOp, Registry};

    #[test]
    fn display_is_an_s_expression() {
        let registry = Registry::with_builtins();
        let add = registry.get("+").unwrap();
        let prog = Program::new(
            add,
            vec![
                Program::leaf(Rc::new(ConstOp::new(Value::Int(2)))),
                Program::leaf(Rc::new(ParamOp::new(0, Type::Int))),
            ],
        );
        assert_eq!(prog.to_string(), "(+ 2 Param0)");
        assert_eq!(prog.size(), 3);
    }

    #[test]
    fn eval_walks_the_tree() {
        let cfg = SynthConfig::default();
        let info = TaskInfo::empty();
        let registry = Registry::with_builtins();
        let sub = registry.get("-").unwrap();
        let prog = Program::new(
            sub,
            vec![
                Program::leaf(Rc::new(ParamOp::new(0, Type::Int))),
                Program::leaf(Rc::new(ConstOp::new(Value::Int(3)))),
            ],
        );
        let inputs = vec![Value::Int(10)];
        assert_eq!(prog.run(&inputs, &info, &cfg), Value::Int(7));
    }

    #[test]
    fn expand_fills_holes_with_child_holes() {
        let registry = Registry::with_builtins();
        let add = registry.get("+").unwrap();
        let mut partial = PartialProgram::hole();
        partial.expand(&[], add);
        assert_eq!(partial.children.len(), 2);
        assert!(partial.node_at(&[1]).op.is_none());
    }
}
