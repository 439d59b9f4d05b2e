//! # Semantic Validation
//!
//! Checks performed after parsing, before the grammar is handed to the
//! engine:
//!
//! - nonterminal names are unique and rule arguments reference defined
//!   nonterminals;
//! - exactly one start symbol exists (name contains `Start`, type equal to
//!   the declared return type);
//! - every example supplies one value per parameter, with matching types,
//!   and an output of the declared return type;
//! - oracle tasks are verifiable: every parameter is integer or boolean,
//!   so the input domain can be enumerated.
//!
//! Validation is separate from parsing so that structurally well-formed
//! files still get precise, actionable error messages.

use std::collections::HashSet;

use crate::ast::{RuleAst, SpecAst, SpecStyle};
use crate::errors::FrontendError;
use crate::value::Type;

/// Validates a parsed specification.
pub fn validate_spec(ast: &SpecAst) -> Result<(), FrontendError> {
    let mut names = HashSet::new();
    for nt in &ast.nonterminals {
        if !names.insert(nt.name.as_str()) {
            return Err(FrontendError::Validation(format!(
                "duplicate nonterminal '{}'",
                nt.name
            )));
        }
    }

    for nt in &ast.nonterminals {
        for rule in &nt.rules {
            match rule {
                RuleAst::Op { name, args } => {
                    for arg in args {
                        if !names.contains(arg.as_str()) {
                            return Err(FrontendError::Validation(format!(
                                "rule '{}' of '{}' references undefined nonterminal '{}'",
                                name, nt.name, arg
                            )));
                        }
                    }
                }
                RuleAst::Param { index, .. } => {
                    if *index >= ast.params.len() {
                        return Err(FrontendError::Validation(format!(
                            "parameter index {} out of range in '{}'",
                            index, nt.name
                        )));
                    }
                }
                RuleAst::Literal { .. } => {}
            }
        }
    }

    let mut start = None;
    for nt in &ast.nonterminals {
        if nt.name.contains("Start") && nt.ty == ast.return_type {
            if start.is_some() {
                return Err(FrontendError::Validation(
                    "multiple start symbols match the return type".into(),
                ));
            }
            start = Some(nt);
        }
    }
    if start.is_none() {
        return Err(FrontendError::Validation(format!(
            "no start symbol: expected a nonterminal named '*Start*' of type {}",
            ast.return_type
        )));
    }

    match &ast.style {
        SpecStyle::Examples(examples) => {
            for ex in examples {
                if ex.inputs.len() != ast.params.len() {
                    return Err(FrontendError::Validation(format!(
                        "example {} supplies {} inputs for {} parameters",
                        ex,
                        ex.inputs.len(),
                        ast.params.len()
                    )));
                }
                for (v, p) in ex.inputs.iter().zip(&ast.params) {
                    if v.ty() != p.ty {
                        return Err(FrontendError::Validation(format!(
                            "example input {} has type {}, parameter '{}' expects {}",
                            v,
                            v.ty(),
                            p.name,
                            p.ty
                        )));
                    }
                }
                if ex.output.ty() != ast.return_type {
                    return Err(FrontendError::Validation(format!(
                        "example output {} does not match return type {}",
                        ex.output, ast.return_type
                    )));
                }
            }
        }
        SpecStyle::Oracle(_) => {
            let enumerable = ast
                .params
                .iter()
                .all(|p| matches!(p.ty, Type::Int | Type::Bool));
            if !enumerable {
                return Err(FrontendError::Validation(
                    "oracle tasks require integer or boolean parameters (no enumerable domain otherwise)"
                        .into(),
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Example, NonTerminalDef, ParamDef};
    use crate::value::Value;

    fn minimal_spec() -> SpecAst {
        SpecAst {
            params: vec![ParamDef {
                name: "x".into(),
                ty: Type::Int,
            }],
            return_type: Type::Int,
            nonterminals: vec![NonTerminalDef {
                name: "Start".into(),
                ty: Type::Int,
                rules: vec![RuleAst::Param {
                    index: 0,
                    ty: Type::Int,
                }],
            }],
            style: SpecStyle::Examples(vec![Example {
                inputs: vec![Value::Int(1)],
                output: Value::Int(1),
            }]),
        }
    }

    #[test]
    fn accepts_minimal_spec() {
        assert!(validate_spec(&minimal_spec()).is_ok());
    }

    #[test]
    fn rejects_missing_start_symbol() {
        let mut spec = minimal_spec();
        spec.nonterminals[0].name = "Expr".into();
        assert!(matches!(
            validate_spec(&spec),
            Err(FrontendError::Validation(_))
        ));
    }

    #[test]
    fn rejects_arity_mismatch_in_example() {
        let mut spec = minimal_spec();
        spec.style = SpecStyle::Examples(vec![Example {
            inputs: vec![],
            output: Value::Int(1),
        }]);
        assert!(matches!(
            validate_spec(&spec),
            Err(FrontendError::Validation(_))
        ));
    }

    #[test]
    fn rejects_undefined_rule_argument() {
        let mut spec = minimal_spec();
        spec.nonterminals[0].rules.push(RuleAst::Op {
            name: "+".into(),
            args: vec!["Missing".into()],
        });
        assert!(matches!(
            validate_spec(&spec),
            Err(FrontendError::Validation(_))
        ));
    }
}
