//! Core infrastructure.
//!
//! - `config` - Configuration file loading, environment overrides and validation
//! - `runtime` - Tokio runtime construction and bounded shutdown

pub mod config;
pub mod runtime;

pub use config::*;
