//! Error types for grammar binding and synthesis.

use thiserror::Error;

use examplar_frontend::FrontendError;

/// Errors that can occur while binding a specification or running the
/// synthesizer.
///
/// Search exhaustion (no program above the minimum score floor) is a
/// normal, expected outcome and is deliberately **not** represented here;
/// it is the [`Synthesis::Exhausted`](crate::engine::solver::Synthesis)
/// variant of the driver's result.
#[derive(Debug, Error)]
pub enum SynthError {
    /// The specification or model file could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The specification is semantically inconsistent (bad arity, type
    /// mismatch, missing start symbol, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// The grammar references an operator the registry does not know.
    #[error("unknown operator '{0}' in grammar")]
    UnknownOperator(String),

    /// Internal-consistency violation (programmer error, not user error):
    /// a synthesized program failed an example it was built to satisfy, a
    /// recomputed score diverged from a cached bound, or an expected
    /// node/edge was missing. Never silently ignored.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SynthError {
    pub(crate) fn internal(msg: impl Into<String>) -> SynthError {
        SynthError::Internal(msg.into())
    }
}

impl From<FrontendError> for SynthError {
    fn from(err: FrontendError) -> Self {
        match err {
            FrontendError::Validation(msg) => SynthError::Validation(msg),
            FrontendError::UnsupportedSpec(msg) => SynthError::Validation(msg),
            other => SynthError::Parse(other.to_string()),
        }
    }
}
