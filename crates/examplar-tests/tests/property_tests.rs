//! Property tests: admissibility of the graph's upper bounds, soundness
//! of synthesis results, and determinism under arbitrary learned
//! probabilities.

use examplar_core::engine::graph::{RuleGraph, START_STATE};
use examplar_core::{Program, Synthesis, SynthConfig, Synthesizer};
use examplar_frontend::{parse_model, parse_spec, Value};
use proptest::prelude::*;

const SPEC: &str = r#"{
    "spec": {
        "param": [{"name": "x", "type": "Int"}, {"name": "y", "type": "Int"}],
        "return_type": "Int",
        "non_terminal": [
            {"name": "Start", "type": "Int", "rule": [
                {"type": "expr", "operator": "+", "param": ["Start", "Start"]},
                {"type": "const", "value_type": "Int", "value": 1},
                {"type": "const", "value_type": "Int", "value": 2},
                {"type": "var", "var_type": "Int", "var_name": "x"}
            ]}
        ]
    },
    "constraint": [
        {"type": "expr", "operator": "=", "params": [
            {"type": "function", "params": [
                {"type": "const", "value_type": "Int", "value": 1},
                {"type": "const", "value_type": "Int", "value": 2}]},
            {"type": "const", "value_type": "Int", "value": 3}
        ]}
    ]
}"#;

fn model_source(p_plus: f64, p_const: f64, p_param: f64) -> String {
    let contexts = [
        r#"["None", "None"]"#,
        r#"["None", "+@1"]"#,
        r#"["None", "+@2"]"#,
        r#"["+@1", "+@1"]"#,
        r#"["+@1", "+@2"]"#,
        r#"["+@2", "+@1"]"#,
        r#"["+@2", "+@2"]"#,
    ];
    let records: Vec<String> = contexts
        .iter()
        .map(|ctx| {
            format!(
                r#"{{"context": {}, "rule": [
                    {{"term": "+", "p": {}}},
                    {{"term": "Constant@Int", "p": {}}},
                    {{"term": "Param@Int", "p": {}}}
                ]}}"#,
                ctx, p_plus, p_const, p_param
            )
        })
        .collect();
    format!("[{}]", records.join(","))
}

fn build(p_plus: f64, p_const: f64, p_param: f64) -> Synthesizer {
    let spec = parse_spec(SPEC).unwrap();
    let model = parse_model(&model_source(p_plus, p_const, p_param)).unwrap();
    Synthesizer::new(&spec, &model, SynthConfig::default()).unwrap()
}

/// Every complete program derivable from `state` using at most `depth`
/// nested applications.
fn enumerate(graph: &RuleGraph, state: usize, depth: usize) -> Vec<Program> {
    let mut out = Vec::new();
    for &e in &graph.nodes[state].edges {
        let edge = &graph.edges[e];
        if edge.targets.is_empty() {
            out.push(Program::leaf(edge.op.clone()));
            continue;
        }
        if depth == 0 {
            continue;
        }
        let child_sets: Vec<Vec<Program>> = edge
            .targets
            .iter()
            .map(|&t| enumerate(graph, t, depth - 1))
            .collect();
        if child_sets.iter().any(Vec::is_empty) {
            continue;
        }
        let mut combos: Vec<Vec<Program>> = vec![Vec::new()];
        for set in &child_sets {
            let mut next = Vec::with_capacity(combos.len() * set.len());
            for combo in &combos {
                for child in set {
                    let mut extended = combo.clone();
                    extended.push(child.clone());
                    next.push(extended);
                }
            }
            combos = next;
        }
        for children in combos {
            out.push(Program::new(edge.op.clone(), children));
        }
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// No enumerated derivation ever scores above its state's finalized
    /// upper bound.
    #[test]
    fn upper_bounds_are_admissible(
        p_plus in 0.001f64..0.95,
        p_const in 0.001f64..0.95,
        p_param in 0.001f64..0.95,
    ) {
        let synth = build(p_plus, p_const, p_param);
        let ub = synth.graph().nodes[START_STATE].upper_bound;
        for program in enumerate(synth.graph(), START_STATE, 3) {
            let score = synth.probability_of(START_STATE, &program).unwrap();
            prop_assert!(
                score <= ub + 1e-6,
                "program {} scores {} above bound {}",
                program, score, ub
            );
        }
    }

    /// Whatever the model says, a found program satisfies the example,
    /// and re-running the whole pipeline reproduces it exactly.
    #[test]
    fn synthesis_is_sound_and_deterministic(
        p_plus in 0.001f64..0.95,
        p_const in 0.001f64..0.95,
        p_param in 0.001f64..0.95,
    ) {
        let run = || {
            let mut synth = build(p_plus, p_const, p_param);
            let outcome = synth.solve().unwrap();
            match outcome {
                Synthesis::Found { program, score } => {
                    let out = program.run(
                        &[Value::Int(1), Value::Int(2)],
                        &synth.task().info,
                        synth.config(),
                    );
                    prop_assert_eq!(out, Value::Int(3), "unsound program {}", program);
                    Ok(Some((program.to_string(), score)))
                }
                Synthesis::Exhausted { .. } => Ok(None),
            }
        };
        let first = run()?;
        let second = run()?;
        prop_assert_eq!(first, second);
    }
}

/// With a model whose optimum is a shallow derivation, the root bound is
/// not merely admissible but exact.
#[test]
fn root_bound_is_tight_for_shallow_optima() {
    let synth = build(0.5, 0.4, 0.3);
    let ub = synth.graph().nodes[START_STATE].upper_bound;
    let best = enumerate(synth.graph(), START_STATE, 2)
        .into_iter()
        .map(|p| synth.probability_of(START_STATE, &p).unwrap())
        .fold(f64::NEG_INFINITY, f64::max);
    assert!((ub - best).abs() < 1e-6, "bound {} vs best {}", ub, best);
}
