//! Examplar CLI - synthesize a DSL program from a specification and a
//! learned probability model.
//!
//! Usage:
//!   examplar --spec task.json --model ngram.json
//!   examplar --spec task.json --model ngram.json --oup result.txt
//!   examplar --spec task.json --type matrix --log run.log

use std::process;
use std::time::Instant;

use clap::{Parser, ValueEnum};

use examplar_core::{Synthesis, SynthConfig, Synthesizer};
use examplar_frontend::{load_model, load_spec, ModelAst};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BenchmarkKind {
    /// Programming-by-example string tasks (learned rule weights).
    String,
    /// Matrix-domain tasks (uniform rule weights).
    Matrix,
}

#[derive(Parser)]
#[command(name = "examplar")]
#[command(version)]
#[command(about = "Probabilistic-model-guided program synthesis")]
struct Cli {
    /// Path of the specification file
    #[arg(long, value_name = "FILE")]
    spec: String,

    /// Path of the probability-model file (optional for matrix tasks)
    #[arg(long, value_name = "FILE")]
    model: Option<String>,

    /// Path of the output file (defaults to stdout)
    #[arg(long = "oup", value_name = "FILE")]
    output: Option<String>,

    /// Path of the log file (defaults to stderr)
    #[arg(long, value_name = "FILE")]
    log: Option<String>,

    /// The type of the benchmark
    #[arg(long = "type", value_enum, default_value = "string")]
    benchmark: BenchmarkKind,
}

fn init_logging(log_file: Option<&str>) {
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_ansi(false);
    match log_file {
        Some(path) => {
            let file = match std::fs::File::create(path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Error creating log file '{}': {}", path, e);
                    process::exit(1);
                }
            };
            builder.with_writer(std::sync::Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref());

    tracing::info!(spec = %cli.spec, benchmark = ?cli.benchmark, "parsing the specification");
    let spec = match load_spec(&cli.spec) {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("Error loading specification '{}': {}", cli.spec, e);
            process::exit(1);
        }
    };

    let model = match &cli.model {
        Some(path) => {
            tracing::info!(model = %path, "parsing the probability model");
            match load_model(path) {
                Ok(model) => model,
                Err(e) => {
                    eprintln!("Error loading model '{}': {}", path, e);
                    process::exit(1);
                }
            }
        }
        None => ModelAst::default(),
    };
    tracing::info!(contexts = model.records.len(), "model ready");

    let cfg = SynthConfig {
        uniform_weights: cli.benchmark == BenchmarkKind::Matrix,
        ..SynthConfig::default()
    };

    tracing::info!("building the grammar-probability graph");
    let mut synthesizer = match Synthesizer::new(&spec, &model, cfg) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    tracing::info!("synthesizing");
    let start = Instant::now();
    let outcome = match synthesizer.solve() {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    let elapsed = start.elapsed().as_secs_f64();

    match outcome {
        Synthesis::Found { program, score } => {
            tracing::info!(%program, score, elapsed, "done");
            let rendered = format!("{}\n{:.10}\n", program, elapsed);
            match &cli.output {
                Some(path) => {
                    if let Err(e) = std::fs::write(path, rendered) {
                        eprintln!("Error writing output file '{}': {}", path, e);
                        process::exit(1);
                    }
                }
                None => print!("{}", rendered),
            }
        }
        Synthesis::Exhausted { floor } => {
            tracing::info!(floor, elapsed, "no valid program found");
            println!("No valid program found (score floor exhausted at {})", floor);
        }
    }
}
