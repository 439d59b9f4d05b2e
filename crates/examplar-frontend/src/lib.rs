//! # Examplar Frontend
//!
//! Value model, specification AST, JSON loaders, and validation for the
//! examplar program synthesizer.

pub mod ast;
pub mod errors;
pub mod parser;
pub mod validate;
pub mod value;

// Re-export commonly used types
pub use ast::*;
pub use errors::FrontendError;
pub use parser::{load_model, load_spec, parse_model, parse_spec};
pub use validate::validate_spec;
pub use value::{Tensor, Type, Value};
