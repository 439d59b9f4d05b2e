//! # String, Integer, and Boolean Operators
//!
//! The operator set of the programming-by-example string domain. Forward
//! semantics are total within the declared signatures: out-of-range
//! indices yield the empty string, negative lengths yield the empty
//! string, and so on — a synthesized program can never fault.
//!
//! The witness functions enumerate candidate argument constraints for a
//! required output. Several draw candidate strings from the task's
//! constant pool and the current example's parameter values; integer
//! arguments are enumerated over the configured domain. A witness may be
//! incomplete (miss derivations) but must never be unsound: every emitted
//! tuple, filled with admissible argument values, must be able to
//! reproduce an admissible output, because the solver builds programs
//! from these tuples and only re-verifies at assembly time.

use examplar_frontend::{Type, Value};

use crate::engine::semantics::{
    debug_check_args, pool_and_inputs, Constraint, EvalContext, Semantics, WitnessTerm,
};

fn str_value(s: impl Into<String>) -> Value {
    Value::Str(s.into())
}

fn exact_str(s: impl Into<String>) -> Constraint {
    Constraint::Exact(str_value(s))
}

fn exact_int(v: i64) -> Constraint {
    Constraint::Exact(Value::Int(v))
}

/// The byte index one character past `i` (clamped to the string length).
fn next_boundary(s: &str, i: usize) -> usize {
    s[i..]
        .chars()
        .next()
        .map(|c| i + c.len_utf8())
        .unwrap_or(s.len())
}

/// Last occurrence of `needle` in `haystack` strictly before `end`,
/// reported as (index + 1); `i64::MIN`-like sentinel (the configured
/// minimum) when there is none. Mirrors the model the indexof witness
/// uses to bound its third argument.
fn last_occurrence_before(haystack: &str, needle: &str, end: usize, int_min: i64) -> i64 {
    let mut last = None;
    let mut from = 0;
    while let Some(i) = haystack[from..].find(needle) {
        let i = from + i;
        if i >= end {
            break;
        }
        last = Some(i);
        from = next_boundary(haystack, i);
    }
    match last {
        Some(i) => i as i64 + 1,
        None => int_min,
    }
}

/// `str.++` — string concatenation.
pub struct ConcatOp;

impl Semantics for ConcatOp {
    fn name(&self) -> &str {
        "str.++"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Str, Type::Str]
    }

    fn return_type(&self) -> Type {
        Type::Str
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        let mut out = args[0].as_str().unwrap_or_default().to_owned();
        out.push_str(args[1].as_str().unwrap_or_default());
        Value::Str(out)
    }

    fn witness(&self, output: &Constraint, _ctx: &EvalContext) -> Vec<WitnessTerm> {
        let s = match output {
            Constraint::Any => return vec![vec![Constraint::Any, Constraint::Any]],
            Constraint::Exact(Value::Str(s)) => s,
            _ => return Vec::new(),
        };
        // Every split point of the output, including the two trivial ones.
        (0..=s.len())
            .filter(|&i| s.is_char_boundary(i))
            .map(|i| vec![exact_str(&s[..i]), exact_str(&s[i..])])
            .collect()
    }
}

/// `str.at` — single character at an index, empty string out of range.
pub struct CharAtOp;

impl Semantics for CharAtOp {
    fn name(&self) -> &str {
        "str.at"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Str, Type::Int]
    }

    fn return_type(&self) -> Type {
        Type::Str
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        let s = args[0].as_str().unwrap_or_default();
        let pos = args[1].as_int().unwrap_or_default();
        if pos < 0 {
            return str_value("");
        }
        match s.get(pos as usize..).and_then(|rest| rest.chars().next()) {
            Some(c) => str_value(c.to_string()),
            None => str_value(""),
        }
    }

    fn witness(&self, output: &Constraint, ctx: &EvalContext) -> Vec<WitnessTerm> {
        let target = match output {
            Constraint::Any => {
                return vec![vec![
                    Constraint::Any,
                    Constraint::int_range(ctx.cfg.int_min, ctx.cfg.int_max),
                ]]
            }
            Constraint::Exact(Value::Str(s)) => s,
            _ => return Vec::new(),
        };
        let mut chars = target.chars();
        let (Some(t), None) = (chars.next(), chars.next()) else {
            return Vec::new();
        };
        let mut result = Vec::new();
        // The first argument can only come from parameters or constants.
        let mut candidates: Vec<&str> = ctx.str_inputs().collect();
        candidates.extend(ctx.info.str_consts.iter().map(String::as_str));
        for s in candidates {
            for (j, c) in s.char_indices() {
                if c == t {
                    result.push(vec![exact_str(s), exact_int(j as i64)]);
                }
            }
        }
        result
    }
}

/// `int.to.str` — decimal rendering of an integer.
pub struct IntToStrOp;

impl Semantics for IntToStrOp {
    fn name(&self) -> &str {
        "int.to.str"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Int]
    }

    fn return_type(&self) -> Type {
        Type::Str
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        str_value(args[0].as_int().unwrap_or_default().to_string())
    }

    fn witness(&self, output: &Constraint, ctx: &EvalContext) -> Vec<WitnessTerm> {
        let s = match output {
            Constraint::Any => {
                return vec![vec![Constraint::int_range(ctx.cfg.int_min, ctx.cfg.int_max)]]
            }
            Constraint::Exact(Value::Str(s)) => s,
            _ => return Vec::new(),
        };
        if s.is_empty() || s.len() >= 8 || s.starts_with('0') {
            return Vec::new();
        }
        match s.parse::<i64>() {
            Ok(v) if s.bytes().all(|b| b.is_ascii_digit()) => vec![vec![exact_int(v)]],
            _ => Vec::new(),
        }
    }
}

/// `str.substr` — substring by start index and length.
pub struct SubstrOp;

impl SubstrOp {
    /// All (start, length) constraint pairs that carve `target` out of
    /// `source`, including the empty-output edge cases.
    fn choices(source: &str, target: &str, ctx: &EvalContext, result: &mut Vec<WitnessTerm>) {
        let (int_min, int_max) = ctx.cfg.int_range();
        if target.len() > source.len() {
            return;
        }
        if target.is_empty() {
            result.push(vec![
                exact_str(source),
                Constraint::int_range(int_min, -1),
                Constraint::Any,
            ]);
            result.push(vec![
                exact_str(source),
                Constraint::Any,
                Constraint::int_range(int_min, 0),
            ]);
            if source.len() as i64 <= int_max {
                result.push(vec![
                    exact_str(source),
                    Constraint::int_range(source.len() as i64, int_max),
                    Constraint::Any,
                ]);
            }
            return;
        }
        let n = source.len();
        let m = target.len();
        let mut from = 0;
        while let Some(i) = source[from..].find(target) {
            let i = from + i;
            if i != n - m {
                result.push(vec![
                    exact_str(source),
                    exact_int(i as i64),
                    exact_int(m as i64),
                ]);
            } else {
                result.push(vec![
                    exact_str(source),
                    exact_int(i as i64),
                    Constraint::int_range(m as i64, int_max.max(m as i64)),
                ]);
            }
            from = next_boundary(source, i);
        }
    }
}

impl Semantics for SubstrOp {
    fn name(&self) -> &str {
        "str.substr"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Str, Type::Int, Type::Int]
    }

    fn return_type(&self) -> Type {
        Type::Str
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        let s = args[0].as_str().unwrap_or_default();
        let pos = args[1].as_int().unwrap_or_default();
        let len = args[2].as_int().unwrap_or_default();
        if pos < 0 || pos as usize >= s.len() || len < 0 {
            return str_value("");
        }
        let start = pos as usize;
        let end = (start + len as usize).min(s.len());
        str_value(&s[start..end])
    }

    fn witness(&self, output: &Constraint, ctx: &EvalContext) -> Vec<WitnessTerm> {
        let (int_min, int_max) = ctx.cfg.int_range();
        let target = match output {
            Constraint::Any => {
                return vec![vec![
                    Constraint::Any,
                    Constraint::int_range(int_min, int_max),
                    Constraint::int_range(int_min, int_max),
                ]]
            }
            Constraint::Exact(Value::Str(s)) => s,
            _ => return Vec::new(),
        };
        let mut result = Vec::new();
        for source in ctx.str_inputs() {
            SubstrOp::choices(source, target, ctx, &mut result);
        }
        result
    }
}

/// `str.replace` — replaces every occurrence of a pattern.
pub struct ReplaceOp;

impl ReplaceOp {
    fn replace_all(input: &str, pat: &str, to: &str) -> String {
        if pat.is_empty() {
            return input.to_owned();
        }
        let mut out = input.to_owned();
        let mut from = 0;
        while let Some(i) = out[from..].find(pat) {
            let i = from + i;
            out.replace_range(i..i + pat.len(), to);
            from = i + to.len();
        }
        out
    }

    fn is_subsequence(sub: &str, of: &str) -> bool {
        let mut sub_bytes = sub.bytes().peekable();
        for b in of.bytes() {
            if sub_bytes.peek() == Some(&b) {
                sub_bytes.next();
            }
        }
        sub_bytes.next().is_none()
    }

    /// Whether `candidate` is a plausible pre-image: it must be a
    /// subsequence of some input parameter and collapse back to `target`
    /// when the inserted pattern is deleted again.
    fn plausible(candidate: &str, pat: &str, target: &str, ctx: &EvalContext) -> bool {
        if !ctx
            .str_inputs()
            .any(|inp| ReplaceOp::is_subsequence(candidate, inp))
        {
            return false;
        }
        ReplaceOp::replace_all(candidate, pat, "") == target
    }

    /// Inserts `pat` into `candidate` at every position where the result
    /// stays plausible, emitting each maximal insertion as a witness term
    /// for "`target` was produced by deleting `pat`".
    fn search_maximal_insertions(
        pos: usize,
        candidate: &str,
        pat: &str,
        target: &str,
        ctx: &EvalContext,
        result: &mut Vec<WitnessTerm>,
    ) {
        let mut extended = false;
        for i in pos..candidate.len() {
            if !candidate.is_char_boundary(i) {
                continue;
            }
            let mut grown = String::with_capacity(candidate.len() + pat.len());
            grown.push_str(&candidate[..i]);
            grown.push_str(pat);
            grown.push_str(&candidate[i..]);
            if ReplaceOp::plausible(&grown, pat, target, ctx) {
                extended = true;
                ReplaceOp::search_maximal_insertions(pos + pat.len(), &grown, pat, target, ctx, result);
            }
        }
        if !extended {
            result.push(vec![exact_str(candidate), exact_str(pat), exact_str("")]);
        }
    }
}

impl Semantics for ReplaceOp {
    fn name(&self) -> &str {
        "str.replace"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Str, Type::Str, Type::Str]
    }

    fn return_type(&self) -> Type {
        Type::Str
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        str_value(ReplaceOp::replace_all(
            args[0].as_str().unwrap_or_default(),
            args[1].as_str().unwrap_or_default(),
            args[2].as_str().unwrap_or_default(),
        ))
    }

    fn witness(&self, output: &Constraint, ctx: &EvalContext) -> Vec<WitnessTerm> {
        let target = match output {
            Constraint::Any => {
                return vec![vec![Constraint::Any, Constraint::Any, Constraint::Any]]
            }
            Constraint::Exact(Value::Str(s)) => s,
            _ => return Vec::new(),
        };
        let mut result = Vec::new();
        let consts = &ctx.info.str_consts;
        let mut has_empty = false;
        for pat in consts {
            if pat.is_empty() {
                has_empty = true;
                continue;
            }
            for to in consts {
                if pat == to || to.is_empty() {
                    continue;
                }
                // Invert one replace step: if mapping the pattern back
                // restores the output, the intermediate string is a
                // candidate first argument.
                let previous = ReplaceOp::replace_all(target, pat, to);
                if ReplaceOp::replace_all(&previous, to, pat) == *target {
                    result.push(vec![exact_str(&previous), exact_str(to), exact_str(pat)]);
                }
            }
        }
        if has_empty && target.len() > 5 {
            for pat in consts {
                if pat.is_empty() || target.contains(pat.as_str()) {
                    continue;
                }
                ReplaceOp::search_maximal_insertions(0, target, pat, target, ctx, &mut result);
            }
        }
        result
    }
}

/// `str.len` — string length.
pub struct StrLenOp;

impl Semantics for StrLenOp {
    fn name(&self) -> &str {
        "str.len"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Str]
    }

    fn return_type(&self) -> Type {
        Type::Int
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        Value::Int(args[0].as_str().unwrap_or_default().len() as i64)
    }

    fn witness(&self, output: &Constraint, ctx: &EvalContext) -> Vec<WitnessTerm> {
        let Some((lo, hi)) = output.int_bounds(ctx.cfg) else {
            return Vec::new();
        };
        ctx.str_inputs()
            .filter(|s| {
                let len = s.len() as i64;
                lo <= len && len <= hi
            })
            .map(|s| vec![exact_str(s)])
            .collect()
    }
}

/// `str.to.int` — integer parse (0 for non-numeric input).
pub struct StrToIntOp;

impl Semantics for StrToIntOp {
    fn name(&self) -> &str {
        "str.to.int"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Str]
    }

    fn return_type(&self) -> Type {
        Type::Int
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        let s = args[0].as_str().unwrap_or_default();
        // Parse a leading optional-sign digit run; 0 when there is none.
        let mut end = 0;
        let bytes = s.as_bytes();
        if !bytes.is_empty() && (bytes[0] == b'-' || bytes[0] == b'+') {
            end = 1;
        }
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        Value::Int(s[..end].parse::<i64>().unwrap_or(0))
    }

    fn witness(&self, output: &Constraint, ctx: &EvalContext) -> Vec<WitnessTerm> {
        let Some((lo, hi)) = output.int_bounds(ctx.cfg) else {
            return Vec::new();
        };
        let lo = lo.max(0);
        (lo..=hi).map(|v| vec![exact_str(v.to_string())]).collect()
    }
}

/// `str.indexof` — first occurrence of a needle at or after a position,
/// `-1` when absent.
pub struct IndexOfOp;

impl Semantics for IndexOfOp {
    fn name(&self) -> &str {
        "str.indexof"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Str, Type::Str, Type::Int]
    }

    fn return_type(&self) -> Type {
        Type::Int
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        let s = args[0].as_str().unwrap_or_default();
        let t = args[1].as_str().unwrap_or_default();
        let from = args[2].as_int().unwrap_or_default().max(0) as usize;
        if from > s.len() {
            return Value::Int(-1);
        }
        match s[from..].find(t) {
            Some(i) => Value::Int((from + i) as i64),
            None => Value::Int(-1),
        }
    }

    fn witness(&self, output: &Constraint, ctx: &EvalContext) -> Vec<WitnessTerm> {
        let (int_min, int_max) = ctx.cfg.int_range();
        let Some((lo, hi)) = output.int_bounds(ctx.cfg) else {
            return Vec::new();
        };
        let lo = lo.max(-1);
        if lo > hi {
            return Vec::new();
        }
        let mut result = Vec::new();
        for s in ctx.str_inputs() {
            if lo == -1 {
                // Needles absent from the string explain an output of -1,
                // regardless of the starting position.
                for needle in &ctx.info.str_consts {
                    if last_occurrence_before(s, needle, s.len(), int_min) <= int_min {
                        result.push(vec![
                            exact_str(s),
                            exact_str(needle),
                            Constraint::int_range(int_min, int_max),
                        ]);
                    }
                }
            }
            let from = lo.max(0);
            for (p, c) in s.char_indices() {
                let pos = p as i64;
                if pos < from || pos > hi {
                    continue;
                }
                // The single character at `pos`, then every longer needle
                // from the constant pool anchored there.
                let one = c.to_string();
                result.push(vec![
                    exact_str(s),
                    exact_str(&one),
                    Constraint::int_range(last_occurrence_before(s, &one, p, int_min), pos),
                ]);
                let mut end = next_boundary(s, p);
                while end < s.len() {
                    end = next_boundary(s, end);
                    let needle = &s[p..end];
                    if needle.len() > 1 && ctx.info.const_set.contains(needle) {
                        result.push(vec![
                            exact_str(s),
                            exact_str(needle),
                            Constraint::int_range(
                                last_occurrence_before(s, needle, p, int_min),
                                pos,
                            ),
                        ]);
                    }
                }
            }
        }
        result
    }
}

/// Shared body for the three boolean string predicates: enumerate ordered
/// pairs from the constant pool plus the example's parameters and keep
/// those where the predicate matches the required truth value.
fn predicate_witness(
    output: &Constraint,
    ctx: &EvalContext,
    pred: impl Fn(&str, &str) -> bool,
) -> Vec<WitnessTerm> {
    let target = match output {
        Constraint::Any => return vec![vec![Constraint::Any, Constraint::Any]],
        Constraint::Exact(Value::Bool(b)) => *b,
        _ => return Vec::new(),
    };
    let pool = pool_and_inputs(ctx);
    let mut result = Vec::new();
    for a in &pool {
        for b in &pool {
            if pred(a, b) == target {
                result.push(vec![exact_str(a), exact_str(b)]);
            }
        }
    }
    result
}

/// `str.prefixof` — whether the first string is a prefix of the second.
pub struct PrefixOfOp;

impl Semantics for PrefixOfOp {
    fn name(&self) -> &str {
        "str.prefixof"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Str, Type::Str]
    }

    fn return_type(&self) -> Type {
        Type::Bool
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        let s = args[0].as_str().unwrap_or_default();
        let t = args[1].as_str().unwrap_or_default();
        Value::Bool(t.starts_with(s))
    }

    fn witness(&self, output: &Constraint, ctx: &EvalContext) -> Vec<WitnessTerm> {
        predicate_witness(output, ctx, |a, b| b.starts_with(a))
    }
}

/// `str.suffixof` — whether the first string is a suffix of the second.
pub struct SuffixOfOp;

impl Semantics for SuffixOfOp {
    fn name(&self) -> &str {
        "str.suffixof"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Str, Type::Str]
    }

    fn return_type(&self) -> Type {
        Type::Bool
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        let s = args[0].as_str().unwrap_or_default();
        let t = args[1].as_str().unwrap_or_default();
        Value::Bool(t.ends_with(s))
    }

    fn witness(&self, output: &Constraint, ctx: &EvalContext) -> Vec<WitnessTerm> {
        predicate_witness(output, ctx, |a, b| b.ends_with(a))
    }
}

/// `str.contains` — whether the first string contains the second.
pub struct ContainsOp;

impl Semantics for ContainsOp {
    fn name(&self) -> &str {
        "str.contains"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Str, Type::Str]
    }

    fn return_type(&self) -> Type {
        Type::Bool
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        let s = args[0].as_str().unwrap_or_default();
        let t = args[1].as_str().unwrap_or_default();
        Value::Bool(s.contains(t))
    }

    fn witness(&self, output: &Constraint, ctx: &EvalContext) -> Vec<WitnessTerm> {
        predicate_witness(output, ctx, |a, b| a.contains(b))
    }
}

/// `+` — integer addition.
pub struct AddOp;

impl Semantics for AddOp {
    fn name(&self) -> &str {
        "+"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Int, Type::Int]
    }

    fn return_type(&self) -> Type {
        Type::Int
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        Value::Int(args[0].as_int().unwrap_or_default() + args[1].as_int().unwrap_or_default())
    }

    fn witness(&self, output: &Constraint, ctx: &EvalContext) -> Vec<WitnessTerm> {
        let (int_min, int_max) = ctx.cfg.int_range();
        match output {
            Constraint::Any => vec![vec![Constraint::Any, Constraint::Any]],
            Constraint::Exact(Value::Int(v)) => {
                let mut result = Vec::new();
                // Second addend bounded by the first to skip symmetric
                // duplicates.
                for i in int_min..=int_max {
                    let j = v - i;
                    if j >= int_min && j <= i {
                        result.push(vec![exact_int(i), exact_int(j)]);
                    }
                }
                result
            }
            Constraint::IntRange(lo, hi) => {
                let mut result = Vec::new();
                for i in int_min..=int_max {
                    let new_lo = (lo - i).max(int_min);
                    let new_hi = (hi - i).min(int_max);
                    if new_lo <= new_hi {
                        result.push(vec![exact_int(i), Constraint::int_range(new_lo, new_hi)]);
                    }
                }
                result
            }
            _ => Vec::new(),
        }
    }
}

/// `-` — integer subtraction.
pub struct SubOp;

impl Semantics for SubOp {
    fn name(&self) -> &str {
        "-"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Int, Type::Int]
    }

    fn return_type(&self) -> Type {
        Type::Int
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        Value::Int(args[0].as_int().unwrap_or_default() - args[1].as_int().unwrap_or_default())
    }

    fn witness(&self, output: &Constraint, ctx: &EvalContext) -> Vec<WitnessTerm> {
        let (int_min, int_max) = ctx.cfg.int_range();
        match output {
            Constraint::Any => vec![vec![Constraint::Any, Constraint::Any]],
            Constraint::Exact(Value::Int(v)) => {
                let mut result = Vec::new();
                for i in int_min..=int_max {
                    let j = i - v;
                    if j >= int_min && j <= int_max {
                        result.push(vec![exact_int(i), exact_int(j)]);
                    }
                }
                result
            }
            Constraint::IntRange(lo, hi) => {
                let mut result = Vec::new();
                for i in int_min..=int_max {
                    let new_lo = (i - hi).max(int_min);
                    let new_hi = (i - lo).min(int_max);
                    if new_lo <= new_hi {
                        result.push(vec![exact_int(i), Constraint::int_range(new_lo, new_hi)]);
                    }
                }
                result
            }
            _ => Vec::new(),
        }
    }
}

/// `=` — integer equality.
pub struct IntEqOp;

impl Semantics for IntEqOp {
    fn name(&self) -> &str {
        "="
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Int, Type::Int]
    }

    fn return_type(&self) -> Type {
        Type::Bool
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        Value::Bool(args[0].as_int() == args[1].as_int())
    }

    fn witness(&self, output: &Constraint, ctx: &EvalContext) -> Vec<WitnessTerm> {
        let (int_min, int_max) = ctx.cfg.int_range();
        let target = match output {
            Constraint::Any => return vec![vec![Constraint::Any, Constraint::Any]],
            Constraint::Exact(Value::Bool(b)) => *b,
            _ => return Vec::new(),
        };
        let mut result = Vec::new();
        if target {
            for i in int_min..=int_max {
                result.push(vec![exact_int(i), exact_int(i)]);
            }
        } else {
            for i in int_min..=int_max {
                if i > int_min {
                    result.push(vec![exact_int(i), Constraint::int_range(int_min, i - 1)]);
                }
                if i < int_max {
                    result.push(vec![exact_int(i), Constraint::int_range(i + 1, int_max)]);
                }
            }
        }
        result
    }
}

/// `ite` over integers.
pub struct IteIntOp;

impl Semantics for IteIntOp {
    fn name(&self) -> &str {
        "ite"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Bool, Type::Int, Type::Int]
    }

    fn return_type(&self) -> Type {
        Type::Int
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        if args[0].as_bool().unwrap_or_default() {
            args[1].clone()
        } else {
            args[2].clone()
        }
    }

    fn witness(&self, output: &Constraint, ctx: &EvalContext) -> Vec<WitnessTerm> {
        let (int_min, int_max) = ctx.cfg.int_range();
        let t = Constraint::Exact(Value::Bool(true));
        let f = Constraint::Exact(Value::Bool(false));
        if matches!(output, Constraint::Any) {
            return vec![
                vec![t, Constraint::Any, Constraint::Any],
                vec![f, Constraint::Any, Constraint::Any],
            ];
        }
        // The untaken branch may produce anything in the domain.
        let free = Constraint::int_range(int_min, int_max);
        vec![
            vec![t, output.clone(), free.clone()],
            vec![f, free, output.clone()],
        ]
    }
}

/// `ite` over strings.
pub struct IteStrOp;

impl Semantics for IteStrOp {
    fn name(&self) -> &str {
        "ite"
    }

    fn arg_types(&self) -> &[Type] {
        &[Type::Bool, Type::Str, Type::Str]
    }

    fn return_type(&self) -> Type {
        Type::Str
    }

    fn run(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        debug_check_args(self, args);
        if args[0].as_bool().unwrap_or_default() {
            args[1].clone()
        } else {
            args[2].clone()
        }
    }

    fn witness(&self, output: &Constraint, _ctx: &EvalContext) -> Vec<WitnessTerm> {
        if matches!(output, Constraint::Any) {
            return vec![vec![Constraint::Any, Constraint::Any, Constraint::Any]];
        }
        vec![
            vec![
                Constraint::Exact(Value::Bool(true)),
                output.clone(),
                Constraint::Any,
            ],
            vec![
                Constraint::Exact(Value::Bool(false)),
                Constraint::Any,
                output.clone(),
            ],
        ]
    }
}
