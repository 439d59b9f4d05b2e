//! The synthesis engine.
//!
//! This module provides:
//! - **config**: the immutable per-run tuning parameters
//! - **errors**: error types for binding and synthesis
//! - **semantics**: the operator trait, constraints, and the registry
//! - **ops**: the built-in operator library
//! - **program**: program trees and partial derivations
//! - **grammar**: specification binding
//! - **context**: derivation contexts and the probability table
//! - **graph**: the grammar-probability graph with admissible bounds
//! - **solver**: the version-space solver and the synthesis driver

pub mod config;
pub mod context;
pub mod errors;
pub mod grammar;
pub mod graph;
pub mod ops;
pub mod program;
pub mod semantics;
pub mod solver;
