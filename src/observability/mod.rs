//! Observability
//!
//! Tracing setup and log hygiene helpers.

pub mod telemetry;
