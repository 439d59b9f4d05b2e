//! Integration and property tests for the examplar workspace live in
//! `tests/`; this crate intentionally exports nothing.
