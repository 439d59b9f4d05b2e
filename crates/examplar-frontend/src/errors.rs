//! Error types for loading and validation.

use thiserror::Error;

/// Errors produced while loading or validating a specification or a
/// probability model.
///
/// Every variant is fatal: the loaders perform no recovery, and the caller
/// is expected to abort the run (spec files are machine-generated, so a
/// malformed file indicates a broken toolchain rather than a user typo).
#[derive(Debug, Error)]
pub enum FrontendError {
    /// The file could not be read.
    #[error("error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file is not well-formed JSON.
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON is well-formed but does not describe a specification or
    /// model this system understands.
    #[error("parse error: {0}")]
    Parse(String),

    /// The specification parsed but is semantically inconsistent.
    #[error("validation error: {0}")]
    Validation(String),

    /// The constraint section matches neither of the two supported
    /// specification styles.
    #[error("unsupported specification: {0}")]
    UnsupportedSpec(String),
}
