//! # Specification and Model Loaders
//!
//! Both input formats are JSON produced by the offline toolchain:
//!
//! - the **specification file** carries the synthesized function's
//!   signature, the grammar, and a constraint list;
//! - the **model file** carries the learned context → ranked operator
//!   probability table.
//!
//! The outer shells are rigid and parsed with serde derives; the rule and
//! constraint nodes are polymorphic (discriminated by a `"type"` field
//!   whose payload shape varies) and are walked manually.
//!
//! Constraint-style recognition happens here: a specification is either
//! **oracle-equivalence** (a single `var = f(vars)` constraint with the
//! reference program supplied under `extra`) or **programming by example**
//! (every constraint is `f(consts) = const`). Anything else is rejected
//! with [`FrontendError::UnsupportedSpec`].

use std::path::Path;

use serde::Deserialize;
use serde_json::Value as Json;

use crate::ast::*;
use crate::errors::FrontendError;
use crate::value::{Tensor, Type, Value};

#[derive(Deserialize)]
struct RawSpecFile {
    spec: RawSignature,
    #[serde(default)]
    constraint: Vec<Json>,
    #[serde(default)]
    extra: Option<Json>,
}

#[derive(Deserialize)]
struct RawSignature {
    param: Vec<RawVar>,
    return_type: String,
    non_terminal: Vec<RawNonTerminal>,
}

#[derive(Deserialize)]
struct RawVar {
    name: String,
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Deserialize)]
struct RawNonTerminal {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    rule: Vec<Json>,
}

#[derive(Deserialize)]
struct RawModelRecord {
    context: Vec<String>,
    rule: Vec<RawRuleProb>,
}

#[derive(Deserialize)]
struct RawRuleProb {
    term: String,
    p: f64,
}

/// Loads a specification from a file.
pub fn load_spec(path: impl AsRef<Path>) -> Result<SpecAst, FrontendError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| FrontendError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_spec(&source)
}

/// Parses a specification from JSON source.
pub fn parse_spec(source: &str) -> Result<SpecAst, FrontendError> {
    let raw: RawSpecFile = serde_json::from_str(source)?;

    let mut params = Vec::with_capacity(raw.spec.param.len());
    for p in &raw.spec.param {
        params.push(ParamDef {
            name: p.name.clone(),
            ty: parse_type(&p.ty)?,
        });
    }
    let return_type = parse_type(&raw.spec.return_type)?;

    let mut nonterminals = Vec::with_capacity(raw.spec.non_terminal.len());
    for nt in &raw.spec.non_terminal {
        let mut rules = Vec::with_capacity(nt.rule.len());
        for rule in &nt.rule {
            rules.push(parse_rule(rule, &params)?);
        }
        nonterminals.push(NonTerminalDef {
            name: nt.name.clone(),
            ty: parse_type(&nt.ty)?,
            rules,
        });
    }

    let style = recognize_style(&raw.constraint, raw.extra.as_ref(), &params)?;

    Ok(SpecAst {
        params,
        return_type,
        nonterminals,
        style,
    })
}

/// Loads a probability model from a file.
pub fn load_model(path: impl AsRef<Path>) -> Result<ModelAst, FrontendError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| FrontendError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_model(&source)
}

/// Parses a probability model from JSON source.
///
/// Entries of each record are sorted descending by probability; the
/// context depth is fixed by the first record and every later record must
/// agree with it.
pub fn parse_model(source: &str) -> Result<ModelAst, FrontendError> {
    let raw: Vec<RawModelRecord> = serde_json::from_str(source)?;
    let depth = raw.first().map(|r| r.context.len());
    let mut records = Vec::with_capacity(raw.len());
    for r in raw {
        if Some(r.context.len()) != depth {
            return Err(FrontendError::Parse(format!(
                "model record has context depth {} but the model uses depth {}",
                r.context.len(),
                depth.unwrap_or(0)
            )));
        }
        for entry in &r.rule {
            if !entry.p.is_finite() || entry.p < 0.0 {
                return Err(FrontendError::Parse(format!(
                    "invalid probability {} for term '{}'",
                    entry.p, entry.term
                )));
            }
        }
        let mut rules: Vec<(String, f64)> =
            r.rule.into_iter().map(|e| (e.term, e.p)).collect();
        rules.sort_by(|a, b| b.1.total_cmp(&a.1));
        records.push(ModelRecord {
            context: r.context,
            rules,
        });
    }
    Ok(ModelAst { depth, records })
}

fn parse_type(name: &str) -> Result<Type, FrontendError> {
    Type::parse(name).ok_or_else(|| FrontendError::Parse(format!("unknown type '{}'", name)))
}

fn str_field<'a>(node: &'a Json, key: &str) -> Result<&'a str, FrontendError> {
    node.get(key)
        .and_then(Json::as_str)
        .ok_or_else(|| FrontendError::Parse(format!("missing string field '{}'", key)))
}

fn node_kind<'a>(node: &'a Json) -> Result<&'a str, FrontendError> {
    str_field(node, "type")
}

/// Parses a typed literal from a node carrying `value_type` and `value`.
///
/// Booleans accept both JSON booleans and the strings `"True"`/`"true"`
/// (the offline serializer emits strings); tensors are
/// `{"elems": [...], "shape": [...]}` objects.
fn parse_value(node: &Json) -> Result<Value, FrontendError> {
    let ty = parse_type(str_field(node, "value_type")?)?;
    let raw = node
        .get("value")
        .ok_or_else(|| FrontendError::Parse("missing field 'value'".into()))?;
    match ty {
        Type::Int => raw
            .as_i64()
            .map(Value::Int)
            .ok_or_else(|| FrontendError::Parse(format!("expected integer, got {}", raw))),
        Type::Bool => match raw {
            Json::Bool(b) => Ok(Value::Bool(*b)),
            Json::String(s) => Ok(Value::Bool(s == "True" || s == "true")),
            _ => Err(FrontendError::Parse(format!(
                "expected boolean, got {}",
                raw
            ))),
        },
        Type::Str => raw
            .as_str()
            .map(|s| Value::Str(s.to_owned()))
            .ok_or_else(|| FrontendError::Parse(format!("expected string, got {}", raw))),
        Type::Tensor => {
            let elems = raw
                .get("elems")
                .and_then(Json::as_array)
                .ok_or_else(|| FrontendError::Parse("tensor value needs 'elems'".into()))?
                .iter()
                .map(|v| {
                    v.as_i64()
                        .ok_or_else(|| FrontendError::Parse("tensor element must be integer".into()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let shape = raw
                .get("shape")
                .and_then(Json::as_array)
                .ok_or_else(|| FrontendError::Parse("tensor value needs 'shape'".into()))?
                .iter()
                .map(|v| {
                    v.as_u64().map(|d| d as usize).ok_or_else(|| {
                        FrontendError::Parse("tensor dimension must be a positive integer".into())
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if elems.len() != shape.iter().product::<usize>() {
                return Err(FrontendError::Parse(format!(
                    "tensor has {} elements but shape {:?}",
                    elems.len(),
                    shape
                )));
            }
            Ok(Value::Tensor(Tensor::new(elems, shape)))
        }
    }
}

fn parse_rule(node: &Json, params: &[ParamDef]) -> Result<RuleAst, FrontendError> {
    match node_kind(node)? {
        "expr" => {
            let name = str_field(node, "operator")?.to_owned();
            let args = node
                .get("param")
                .and_then(Json::as_array)
                .map(|a| {
                    a.iter()
                        .map(|v| {
                            v.as_str().map(str::to_owned).ok_or_else(|| {
                                FrontendError::Parse("rule argument must be a nonterminal name".into())
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()
                })
                .unwrap_or_else(|| Ok(Vec::new()))?;
            Ok(RuleAst::Op { name, args })
        }
        "var" => {
            let ty = parse_type(str_field(node, "var_type")?)?;
            let name = str_field(node, "var_name")?;
            let index = params
                .iter()
                .position(|p| p.name == name)
                .ok_or_else(|| FrontendError::Parse(format!("unknown parameter '{}'", name)))?;
            if params[index].ty != ty {
                return Err(FrontendError::Parse(format!(
                    "parameter '{}' is declared {} but referenced as {}",
                    name, params[index].ty, ty
                )));
            }
            Ok(RuleAst::Param { index, ty })
        }
        "const" => Ok(RuleAst::Literal {
            value: parse_value(node)?,
        }),
        other => Err(FrontendError::Parse(format!(
            "unknown rule form '{}'",
            other
        ))),
    }
}

/// Parses a concrete program tree (oracle bodies). Parameter references
/// use the `{"type": "var", "id": N, "var_type": T}` form.
fn parse_program(node: &Json, params: &[ParamDef]) -> Result<ProgramAst, FrontendError> {
    match node_kind(node)? {
        "expr" => {
            let op = str_field(node, "operator")?.to_owned();
            let args = node
                .get("params")
                .and_then(Json::as_array)
                .map(|a| {
                    a.iter()
                        .map(|v| parse_program(v, params))
                        .collect::<Result<Vec<_>, _>>()
                })
                .unwrap_or_else(|| Ok(Vec::new()))?;
            Ok(ProgramAst::Apply { op, args })
        }
        "var" => {
            let index = node
                .get("id")
                .and_then(Json::as_u64)
                .ok_or_else(|| FrontendError::Parse("var node needs an integer 'id'".into()))?
                as usize;
            let ty = parse_type(str_field(node, "var_type")?)?;
            if index >= params.len() {
                return Err(FrontendError::Parse(format!(
                    "var id {} out of range ({} parameters)",
                    index,
                    params.len()
                )));
            }
            Ok(ProgramAst::Param { index, ty })
        }
        "const" => Ok(ProgramAst::Literal {
            value: parse_value(node)?,
        }),
        other => Err(FrontendError::Parse(format!(
            "unknown program node '{}'",
            other
        ))),
    }
}

/// Recognizes the constraint style; see the module docs.
fn recognize_style(
    constraints: &[Json],
    extra: Option<&Json>,
    params: &[ParamDef],
) -> Result<SpecStyle, FrontendError> {
    if let Some(oracle) = try_oracle(constraints, extra, params)? {
        return Ok(SpecStyle::Oracle(oracle));
    }
    if let Some(examples) = try_examples(constraints, extra)? {
        return Ok(SpecStyle::Examples(examples));
    }
    Err(FrontendError::UnsupportedSpec(
        "constraints are neither a single oracle equation nor a list of input/output examples"
            .into(),
    ))
}

/// Oracle style: exactly one constraint `var = f(vars)` (either side may
/// come first). The executable reference program must be supplied under
/// `extra`.
fn try_oracle(
    constraints: &[Json],
    extra: Option<&Json>,
    params: &[ParamDef],
) -> Result<Option<ProgramAst>, FrontendError> {
    if constraints.len() != 1 {
        return Ok(None);
    }
    let c = &constraints[0];
    if node_kind(c).ok() != Some("expr") || str_field(c, "operator").ok() != Some("=") {
        return Ok(None);
    }
    let Some(sides) = c.get("params").and_then(Json::as_array) else {
        return Ok(None);
    };
    if sides.len() != 2 {
        return Ok(None);
    }
    let (mut l, mut r) = (&sides[0], &sides[1]);
    if node_kind(l).ok() != Some("var") {
        std::mem::swap(&mut l, &mut r);
    }
    if node_kind(l).ok() != Some("var") || node_kind(r).ok() != Some("function") {
        return Ok(None);
    }
    let all_vars = r
        .get("params")
        .and_then(Json::as_array)
        .map(|a| a.iter().all(|p| node_kind(p).ok() == Some("var")))
        .unwrap_or(false);
    if !all_vars {
        return Ok(None);
    }
    let oracle = extra.ok_or_else(|| {
        FrontendError::UnsupportedSpec(
            "oracle-style constraint without a reference program under 'extra'".into(),
        )
    })?;
    Ok(Some(parse_program(oracle, params)?))
}

/// Example style: `extra` absent and every constraint is
/// `f(const, ...) = const`, yielding one example per constraint.
fn try_examples(
    constraints: &[Json],
    extra: Option<&Json>,
) -> Result<Option<Vec<Example>>, FrontendError> {
    if matches!(extra, Some(e) if !e.is_null()) {
        return Ok(None);
    }
    let mut examples = Vec::with_capacity(constraints.len());
    for c in constraints {
        if node_kind(c).ok() != Some("expr") {
            return Ok(None);
        }
        let Some(sides) = c.get("params").and_then(Json::as_array) else {
            return Ok(None);
        };
        if sides.len() != 2 {
            return Ok(None);
        }
        let (mut l, mut r) = (&sides[0], &sides[1]);
        if node_kind(l).ok() != Some("function") {
            std::mem::swap(&mut l, &mut r);
        }
        if node_kind(l).ok() != Some("function") || node_kind(r).ok() != Some("const") {
            return Ok(None);
        }
        let output = parse_value(r)?;
        let mut inputs = Vec::new();
        for arg in l.get("params").and_then(Json::as_array).into_iter().flatten() {
            if node_kind(arg).ok() != Some("const") {
                return Ok(None);
            }
            inputs.push(parse_value(arg)?);
        }
        examples.push(Example { inputs, output });
    }
    Ok(Some(examples))
}
