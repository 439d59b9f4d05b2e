//! # Examplar Core
//!
//! The synthesis engine: a probabilistic-grammar-guided, counter-example-
//! driven program synthesizer for a small typed DSL.

pub mod engine;

// Re-export commonly used types
pub use engine::config::SynthConfig;
pub use engine::errors::SynthError;
pub use engine::program::Program;
pub use engine::semantics::Registry;
pub use engine::solver::{synthesize, Synthesis, Synthesizer};

use examplar_frontend::{ModelAst, SpecAst};

/// Parses and validates a specification and a model, then synthesizes.
///
/// This is a convenience wrapper combining the frontend loaders with
/// [`synthesize`]; frontend errors are converted to [`SynthError`].
pub fn synthesize_sources(
    spec_source: &str,
    model_source: &str,
    cfg: SynthConfig,
) -> Result<Synthesis, SynthError> {
    let spec: SpecAst = examplar_frontend::parse_spec(spec_source)?;
    let model: ModelAst = examplar_frontend::parse_model(model_source)?;
    synthesize(&spec, &model, cfg)
}
