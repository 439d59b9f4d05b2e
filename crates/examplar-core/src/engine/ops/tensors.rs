//! # Tensor Operators
//!
//! The matrix-domain operator set: shape manipulation (`Reshape`,
//! `Permute`), axis flips (`Fliplr`, `Flipud`), the identity wrapper
//! (`Var`), and the two vector builders (`B`, `L`) used to express shape
//! and permutation literals inside programs.
//!
//! The reshape witness enumerates factorization schemes of the output
//! size over the task's integer constant pool, bounded by the configured
//! maximum rank; the permute witness enumerates the non-identity
//! permutations of the output's axes. Flips are self-inverse, so their
//! witnesses just apply the flip to the required output.

use examplar_frontend::{Tensor, Type, Value};

use crate::engine::semantics::{
    debug_check_args, Constraint, EvalContext, Semantics, WitnessTerm,
};

fn exact_tensor(elems: Vec<i64>, shape: Vec<usize>) -> Constraint {
    Constraint::Exact(Value::Tensor(Tensor::new(elems, shape)))
}

fn any_term(arity: usize) -> Vec<WitnessTerm> {
    vec![vec![Constraint::Any; arity]]
}

/// Row-major stride of each dimension.
fn strides(shape: &[usize]) -> Vec<usize> {
    let mut out = vec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        out[i] = out[i + 1] * shape[i + 1];
    }
    out
}

/// Applies an axis permutation: output dimension `d` ranges over input
/// dimension `perm[d]`.
fn permute(tensor: &Tensor, perm: &[usize]) -> Tensor {
    let in_strides = strides(&tensor.shape);
    let new_shape: Vec<usize> = perm.iter().map(|&d| tensor.shape[d]).collect();
    let mut elems = Vec::with_capacity(tensor.elems.len());
    let rank = perm.len();
    let mut index = vec![0usize; rank];
    loop {
        let mut src = 0;
        for d in 0..rank {
            src += index[d] * in_strides[perm[d]];
        }
        elems.push(tensor.elems[src]);
        // Row-major increment over the output shape.
        let mut d = rank;
        loop {
            if d == 0 {
                return Tensor::new(elems, new_shape);
            }
            d -= 1;
            index[d] += 1;
            if index[d] < new_shape[d] {
                break;
            }
            index[d] = 0;
        }
    }
}

/// Reverses the tensor along one axis.
fn flip_axis(tensor: &Tensor, axis: usize) -> Tensor {
    if tensor.rank() <= axis {
        return tensor.clone();
    }
    let st = strides(&tensor.shape);
    let mut elems = tensor.elems.clone();
    let dim = tensor.shape[axis];
    let outer: usize = tensor.shape[..axis].iter().product();
    let inner = st[axis];
    let block = dim * inner;
    for o in 0..outer {
        for i in 0..dim {
            let src = o * block + i * inner;
            let dst = o * block + (dim - 1 - i) * inner;
            elems[dst..dst + inner].copy_from_slice(&tensor.elems[src..src + inner]);
        }
    }
    Tensor::new(elems, tensor.shape.clone())
}

/// Advances `perm` to the next lexicographic permutation; false at the
/// last one.
fn next_permutation(perm: &mut [usize]) -> bool {
    if perm.len() < 2 {
        return false;
    }
    let mut i = perm.len() - 1;
    while i > 0 && perm[i - 1] >= perm[i] {
        i -= 1;
    }
    if i == 0 {
        return false;
    }
    let mut j = perm.len() - 1;
    while perm[j] <= perm[i - 1] {
        j -= 1;
    }
    perm.swap(i - 1, j);
    perm[i..].reverse();
    true
}

/// All factorizations of `size` into more than one factor drawn from the
/// constant pool, bounded by `max_rank` dimensions.
fn factor_schemes(size: i64, pool: &[i64], max_rank: usize) -> Vec<Vec<usize>> {
    let mut result = Vec::new();
    let mut current = Vec::new();
    search_factors(size, pool, max_rank, &mut current, &mut result);
    result
}

fn search_factors(
    rem: i64,
    pool: &[i64],
    max_rank: usize,
    current: &mut Vec<usize>,
    result: &mut Vec<Vec<usize>>,
) {
    if rem == 1 && current.len() > 1 {
        result.push(current.clone());
    }
    if current.len() == max_rank {
        return;
    }
    for &dim in pool {
        if dim <= 1 {
            continue;
        }
        if rem % dim == 0 {
            current.push(dim as usize);
            search_factors(rem / dim, pool, max_rank, current, result);
            current.pop();
        }
    }
}

/// `Reshape` — reinterprets the contents under a new shape (given as a
/// rank-1 tensor of dimension sizes).
pub struct ReshapeOp;

impl Semantics for ReshapeOp {
    fn name(&self) -> &str {
        "Reshape"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Tensor, Type::Tensor]
    }

    fn return_type(&self) -> Type {
        Type::Tensor
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        let src = args[0].as_tensor().unwrap();
        let shape: Vec<usize> = args[1]
            .as_tensor()
            .unwrap()
            .elems
            .iter()
            .map(|&d| d.max(0) as usize)
            .collect();
        if shape.iter().product::<usize>() != src.elems.len() {
            return args[0].clone();
        }
        Value::Tensor(Tensor::new(src.elems.clone(), shape))
    }

    fn witness(&self, output: &Constraint, ctx: &EvalContext) -> Vec<WitnessTerm> {
        let out = match output {
            Constraint::Any => return any_term(2),
            Constraint::Exact(Value::Tensor(t)) => t,
            _ => return Vec::new(),
        };
        let size = out.elems.len() as i64;
        let mut schemes = vec![vec![1usize, size as usize]];
        schemes.extend(factor_schemes(size, &ctx.info.int_consts, ctx.cfg.max_rank));
        let mut result = Vec::new();
        for shape in schemes {
            if shape == out.shape {
                continue;
            }
            let rank = out.shape.len();
            result.push(vec![
                exact_tensor(out.elems.clone(), shape),
                exact_tensor(out.shape.iter().map(|&d| d as i64).collect(), vec![rank]),
            ]);
        }
        result
    }
}

/// `Permute` — permutes the axes (permutation given as a rank-1 tensor).
pub struct PermuteOp;

impl Semantics for PermuteOp {
    fn name(&self) -> &str {
        "Permute"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Tensor, Type::Tensor]
    }

    fn return_type(&self) -> Type {
        Type::Tensor
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        let src = args[0].as_tensor().unwrap();
        let perm: Vec<usize> = args[1]
            .as_tensor()
            .unwrap()
            .elems
            .iter()
            .map(|&d| d.max(0) as usize)
            .collect();
        let valid = perm.len() == src.rank() && {
            let mut seen = vec![false; perm.len()];
            perm.iter().all(|&d| {
                if d < seen.len() && !seen[d] {
                    seen[d] = true;
                    true
                } else {
                    false
                }
            })
        };
        if !valid {
            return args[0].clone();
        }
        Value::Tensor(permute(src, &perm))
    }

    fn witness(&self, output: &Constraint, _ctx: &EvalContext) -> Vec<WitnessTerm> {
        let out = match output {
            Constraint::Any => return any_term(2),
            Constraint::Exact(Value::Tensor(t)) => t,
            _ => return Vec::new(),
        };
        let rank = out.rank();
        let mut perm: Vec<usize> = (0..rank).collect();
        let mut result = Vec::new();
        while next_permutation(&mut perm) {
            let candidate = permute(out, &perm);
            let mut reversed = vec![0usize; rank];
            for (i, &d) in perm.iter().enumerate() {
                reversed[d] = i;
            }
            result.push(vec![
                exact_tensor(candidate.elems, candidate.shape),
                exact_tensor(reversed.iter().map(|&d| d as i64).collect(), vec![rank]),
            ]);
        }
        result
    }
}

/// `Var` — identity wrapper around a tensor parameter.
pub struct TensorIdOp;

impl Semantics for TensorIdOp {
    fn name(&self) -> &str {
        "Var"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Tensor]
    }

    fn return_type(&self) -> Type {
        Type::Tensor
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        args[0].clone()
    }

    fn witness(&self, output: &Constraint, _ctx: &EvalContext) -> Vec<WitnessTerm> {
        vec![vec![output.clone()]]
    }
}

/// `Fliplr` — reverses along axis 1 (identity below rank 2).
pub struct FliplrOp;

impl Semantics for FliplrOp {
    fn name(&self) -> &str {
        "Fliplr"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Tensor]
    }

    fn return_type(&self) -> Type {
        Type::Tensor
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        Value::Tensor(flip_axis(args[0].as_tensor().unwrap(), 1))
    }

    fn witness(&self, output: &Constraint, _ctx: &EvalContext) -> Vec<WitnessTerm> {
        match output {
            Constraint::Any => any_term(1),
            Constraint::Exact(Value::Tensor(t)) => {
                vec![vec![Constraint::Exact(Value::Tensor(flip_axis(t, 1)))]]
            }
            _ => Vec::new(),
        }
    }
}

/// `Flipud` — reverses along axis 0.
pub struct FlipudOp;

impl Semantics for FlipudOp {
    fn name(&self) -> &str {
        "Flipud"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Tensor]
    }

    fn return_type(&self) -> Type {
        Type::Tensor
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        Value::Tensor(flip_axis(args[0].as_tensor().unwrap(), 0))
    }

    fn witness(&self, output: &Constraint, _ctx: &EvalContext) -> Vec<WitnessTerm> {
        match output {
            Constraint::Any => any_term(1),
            Constraint::Exact(Value::Tensor(t)) => {
                vec![vec![Constraint::Exact(Value::Tensor(flip_axis(t, 0)))]]
            }
            _ => Vec::new(),
        }
    }
}

/// `B` — builds a 2-element vector from two integers.
pub struct VecInitOp;

impl Semantics for VecInitOp {
    fn name(&self) -> &str {
        "B"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Int, Type::Int]
    }

    fn return_type(&self) -> Type {
        Type::Tensor
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        let a = args[0].as_int().unwrap_or_default();
        let b = args[1].as_int().unwrap_or_default();
        Value::Tensor(Tensor::new(vec![a, b], vec![2]))
    }

    fn witness(&self, output: &Constraint, _ctx: &EvalContext) -> Vec<WitnessTerm> {
        let out = match output {
            Constraint::Any => return any_term(2),
            Constraint::Exact(Value::Tensor(t)) => t,
            _ => return Vec::new(),
        };
        if out.rank() != 1 || out.elems.len() != 2 {
            return Vec::new();
        }
        vec![vec![
            Constraint::Exact(Value::Int(out.elems[0])),
            Constraint::Exact(Value::Int(out.elems[1])),
        ]]
    }
}

/// `L` — prepends an integer to a vector.
pub struct VecConsOp;

impl Semantics for VecConsOp {
    fn name(&self) -> &str {
        "L"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Int, Type::Tensor]
    }

    fn return_type(&self) -> Type {
        Type::Tensor
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        let head = args[0].as_int().unwrap_or_default();
        let tail = args[1].as_tensor().unwrap();
        if tail.rank() != 1 {
            return args[1].clone();
        }
        let mut elems = Vec::with_capacity(tail.elems.len() + 1);
        elems.push(head);
        elems.extend_from_slice(&tail.elems);
        let len = elems.len();
        Value::Tensor(Tensor::new(elems, vec![len]))
    }

    fn witness(&self, output: &Constraint, _ctx: &EvalContext) -> Vec<WitnessTerm> {
        let out = match output {
            Constraint::Any => return any_term(2),
            Constraint::Exact(Value::Tensor(t)) => t,
            _ => return Vec::new(),
        };
        if out.rank() != 1 || out.elems.len() <= 2 {
            return Vec::new();
        }
        let tail = out.elems[1..].to_vec();
        let len = tail.len();
        vec![vec![
            Constraint::Exact(Value::Int(out.elems[0])),
            exact_tensor(tail, vec![len]),
        ]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::SynthConfig;
    use crate::engine::semantics::TaskInfo;

    fn tensor(elems: &[i64], shape: &[usize]) -> Tensor {
        Tensor::new(elems.to_vec(), shape.to_vec())
    }

    fn ctx_fixture() -> (Vec<Value>, TaskInfo, SynthConfig) {
        let mut info = TaskInfo::empty();
        info.int_consts = vec![0, 1, 2, 3, 4, 6];
        (Vec::new(), info, SynthConfig::default())
    }

    #[test]
    fn permute_transposes_a_matrix() {
        let m = tensor(&[1, 2, 3, 4, 5, 6], &[2, 3]);
        let t = permute(&m, &[1, 0]);
        assert_eq!(t.shape, vec![3, 2]);
        assert_eq!(t.elems, vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn flips_reverse_the_right_axis() {
        let m = tensor(&[1, 2, 3, 4, 5, 6], &[2, 3]);
        assert_eq!(flip_axis(&m, 0).elems, vec![4, 5, 6, 1, 2, 3]);
        assert_eq!(flip_axis(&m, 1).elems, vec![3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn flip_witness_is_self_inverse() {
        let (inputs, info, cfg) = ctx_fixture();
        let ctx = EvalContext::new(&inputs, &info, &cfg);
        let out = tensor(&[3, 2, 1, 6, 5, 4], &[2, 3]);
        let terms = FliplrOp.witness(&Constraint::Exact(Value::Tensor(out.clone())), &ctx);
        assert_eq!(terms.len(), 1);
        let Constraint::Exact(pre) = &terms[0][0] else {
            panic!("expected exact pre-image");
        };
        assert_eq!(FliplrOp.run(&[pre.clone()], &ctx), Value::Tensor(out));
    }

    #[test]
    fn reshape_witness_enumerates_factorizations() {
        let (inputs, info, cfg) = ctx_fixture();
        let ctx = EvalContext::new(&inputs, &info, &cfg);
        let out = Constraint::Exact(Value::Tensor(tensor(&[1, 2, 3, 4, 5, 6], &[2, 3])));
        let terms = ReshapeOp.witness(&out, &ctx);
        // Among others: the flat [1,6] scheme and the transposed-shape
        // [3,2] scheme; the output's own shape is excluded.
        assert!(terms.iter().any(|t| matches!(
            &t[0],
            Constraint::Exact(Value::Tensor(m)) if m.shape == vec![1, 6]
        )));
        assert!(terms.iter().any(|t| matches!(
            &t[0],
            Constraint::Exact(Value::Tensor(m)) if m.shape == vec![3, 2]
        )));
        assert!(terms.iter().all(|t| !matches!(
            &t[0],
            Constraint::Exact(Value::Tensor(m)) if m.shape == vec![2, 3]
        )));
    }

    #[test]
    fn permute_witness_round_trips() {
        let (inputs, info, cfg) = ctx_fixture();
        let ctx = EvalContext::new(&inputs, &info, &cfg);
        let out = tensor(&[1, 2, 3, 4, 5, 6], &[2, 3]);
        for term in PermuteOp.witness(&Constraint::Exact(Value::Tensor(out.clone())), &ctx) {
            let (Constraint::Exact(pre), Constraint::Exact(perm)) = (&term[0], &term[1]) else {
                panic!("expected exact constraints");
            };
            assert_eq!(
                PermuteOp.run(&[pre.clone(), perm.clone()], &ctx),
                Value::Tensor(out.clone())
            );
        }
    }

    #[test]
    fn vector_builders_invert_each_other() {
        let (inputs, info, cfg) = ctx_fixture();
        let ctx = EvalContext::new(&inputs, &info, &cfg);
        let v = VecConsOp.run(
            &[
                Value::Int(7),
                VecInitOp.run(&[Value::Int(1), Value::Int(2)], &ctx),
            ],
            &ctx,
        );
        assert_eq!(v, Value::Tensor(tensor(&[7, 1, 2], &[3])));
        let terms = VecConsOp.witness(&Constraint::Exact(v), &ctx);
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0][0], Constraint::Exact(Value::Int(7)));
        // A 2-vector bottoms out at B, not L.
        let two = Value::Tensor(tensor(&[1, 2], &[2]));
        assert!(VecConsOp.witness(&Constraint::Exact(two.clone()), &ctx).is_empty());
        assert_eq!(VecInitOp.witness(&Constraint::Exact(two), &ctx).len(), 1);
    }
}
