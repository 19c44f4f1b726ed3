//! Per-query execution context and outer-row bindings
//!
//! A `QueryContext` is cheap to clone: every cursor in a tree keeps its own
//! copy, and all copies share the store, metrics sink and cancellation flag.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::config::EngineConfig;
use crate::observability::{Counter, ExecutionMetrics, MetricsSink, MetricsSnapshot};
use crate::row::Row;
use crate::schema::GroupSchema;
use crate::storage::GroupStore;

use super::errors::{ExecError, ExecResult};

/// Shared state for one query execution
#[derive(Clone)]
pub struct QueryContext {
    query_id: Uuid,
    store: Arc<dyn GroupStore>,
    metrics: Arc<dyn MetricsSink>,
    cancelled: Arc<AtomicBool>,
    started: Instant,
    deadline: Option<Instant>,
    config: Arc<EngineConfig>,
}

impl QueryContext {
    /// Creates a context with a fresh `ExecutionMetrics` sink
    pub fn new(store: Arc<dyn GroupStore>, config: EngineConfig) -> Self {
        let started = Instant::now();
        let deadline = config.query_timeout().map(|t| started + t);
        Self {
            query_id: Uuid::new_v4(),
            store,
            metrics: Arc::new(ExecutionMetrics::new()),
            cancelled: Arc::new(AtomicBool::new(false)),
            started,
            deadline,
            config: Arc::new(config),
        }
    }

    /// Replaces the metrics sink
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Query identifier used in log events
    pub fn query_id(&self) -> Uuid {
        self.query_id
    }

    /// Storage adapter
    pub fn store(&self) -> &Arc<dyn GroupStore> {
        &self.store
    }

    /// Schema of the queried group
    pub fn schema(&self) -> &Arc<GroupSchema> {
        self.store.schema()
    }

    /// Engine settings
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Adds to a counter on the injected sink
    pub fn count(&self, counter: Counter, n: u64) {
        self.metrics.increment(counter, n);
    }

    /// Raises a high-water mark on the injected sink
    pub fn peak(&self, counter: Counter, value: u64) {
        self.metrics.observe_peak(counter, value);
    }

    /// Counter values from the injected sink, if it keeps them
    pub fn metrics_snapshot(&self) -> Option<MetricsSnapshot> {
        self.metrics.snapshot()
    }

    /// Milliseconds since the context was created
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Requests cancellation; observed at the next interrupt check
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// True once `cancel` has been called on any copy of this context
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Fails if the query was cancelled or ran past its deadline
    pub fn check_interrupt(&self) -> ExecResult<()> {
        if self.is_cancelled() {
            return Err(ExecError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            let now = Instant::now();
            if now >= deadline {
                return Err(ExecError::TimedOut {
                    elapsed_ms: now.duration_since(self.started).as_millis() as u64,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for QueryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryContext")
            .field("query_id", &self.query_id)
            .field("group", &self.store.schema().name())
            .field("cancelled", &self.is_cancelled())
            .field("deadline", &self.deadline)
            .finish()
    }
}

/// Positional slots holding outer rows for nested operators
///
/// A nested-loop map writes its outer row into one slot and hands the
/// inner subtree a copy, so bindings never leak between nesting levels.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    slots: Vec<Option<Row>>,
}

impl Bindings {
    /// Empty bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Row bound at a position
    pub fn get(&self, position: usize) -> Option<&Row> {
        self.slots.get(position).and_then(Option::as_ref)
    }

    /// Row bound at a position, or an illegal-state error
    pub fn require(&self, position: usize) -> ExecResult<&Row> {
        self.get(position)
            .ok_or_else(|| ExecError::illegal_state(format!("no row bound at position {}", position)))
    }

    /// Binds a row in place
    pub fn set(&mut self, position: usize, row: Row) {
        if self.slots.len() <= position {
            self.slots.resize(position + 1, None);
        }
        self.slots[position] = Some(row);
    }

    /// Copy of these bindings with one more row bound
    pub fn with(&self, position: usize, row: Row) -> Bindings {
        let mut copy = self.clone();
        copy.set(position, row);
        copy
    }
}
