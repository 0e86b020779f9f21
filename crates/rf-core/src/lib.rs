//! rf-core: shared error type and configuration for ripforge.
//!
//! This crate is the foundational dependency for the other rf-* crates,
//! providing the unified error type and the application configuration that
//! every stage consumes.

pub mod config;
pub mod error;

pub use error::{Error, Result};
