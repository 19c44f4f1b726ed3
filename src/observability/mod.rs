//! Observability subsystem
//!
//! - Structured logging (JSON lines) with a process-wide threshold
//! - Per-query counters injected through `MetricsSink`
//! - Lifecycle event tracing via `ObservationScope`
//!
//! # Principles
//!
//! 1. Observability is read-only and never changes query results
//! 2. No background threads
//! 3. Operators log lifecycle events only, never per row
//!
//! # Usage
//!
//! ```ignore
//! use hgroup::observability::{Counter, ExecutionMetrics, Logger, MetricsSink};
//!
//! Logger::info("QUERY_COMPLETE", &[("rows", "42")]);
//!
//! let metrics = ExecutionMetrics::new();
//! metrics.increment(Counter::IndexAdvances, 1);
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{Counter, ExecutionMetrics, MetricsSink, MetricsSnapshot, NoopMetrics};
pub use scope::{ObservationScope, Timer};

/// Log a lifecycle event at INFO level
pub fn log_event(event: Event) {
    Logger::info(event.as_str(), &[]);
}

/// Log a lifecycle event with fields at INFO level
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::info(event.as_str(), fields);
}
