//! # Observability
//!
//! Structured logging and deterministic metrics for the engine.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on matching or delivery
//! 3. No async or background threads
//! 4. Deterministic output

mod logger;
mod metrics;

pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
