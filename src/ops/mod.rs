//! Operations and observability.
//!
//! - `telemetry` - Structured logging setup

pub mod telemetry;

pub use telemetry::*;
