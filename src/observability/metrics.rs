//! Execution counters
//!
//! - Counters only, plus one high-water mark
//! - Injected per query through `MetricsSink`, never process-global
//! - Thread-safe, Relaxed ordering

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters reported by operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    /// Rows pulled from index streams
    IndexAdvances,
    /// Index stream repositionings
    IndexSeeks,
    /// Rows returned by a top-level cursor
    RowsEmitted,
    /// Point lookups issued for ancestor rows
    AncestorLookups,
    /// Branch scans issued for descendant rows
    BranchLookups,
    /// Cursor opens across the whole tree
    CursorsOpened,
    /// Most inner cursors open at once in a nested-loop map
    InnerCursorsOpenPeak,
    /// Rows consumed by sort operators
    SortedRows,
    /// Jumps issued by skip-scan intersects
    SkipScanJumps,
}

impl Counter {
    /// Every counter, in snapshot order
    pub const ALL: [Counter; 9] = [
        Counter::IndexAdvances,
        Counter::IndexSeeks,
        Counter::RowsEmitted,
        Counter::AncestorLookups,
        Counter::BranchLookups,
        Counter::CursorsOpened,
        Counter::InnerCursorsOpenPeak,
        Counter::SortedRows,
        Counter::SkipScanJumps,
    ];

    /// Snake-case name used in JSON output
    pub fn as_str(&self) -> &'static str {
        match self {
            Counter::IndexAdvances => "index_advances",
            Counter::IndexSeeks => "index_seeks",
            Counter::RowsEmitted => "rows_emitted",
            Counter::AncestorLookups => "ancestor_lookups",
            Counter::BranchLookups => "branch_lookups",
            Counter::CursorsOpened => "cursors_opened",
            Counter::InnerCursorsOpenPeak => "inner_cursors_open_peak",
            Counter::SortedRows => "sorted_rows",
            Counter::SkipScanJumps => "skip_scan_jumps",
        }
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

/// Destination for operator counters
pub trait MetricsSink: Send + Sync {
    /// Adds `n` to a counter
    fn increment(&self, counter: Counter, n: u64);

    /// Raises a high-water mark to `value` if it is larger
    fn observe_peak(&self, counter: Counter, value: u64);

    /// Current counter values, if this sink keeps them
    fn snapshot(&self) -> Option<MetricsSnapshot> {
        None
    }
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn increment(&self, _counter: Counter, _n: u64) {}

    fn observe_peak(&self, _counter: Counter, _value: u64) {}
}

/// Atomic counters for one query
#[derive(Debug, Default)]
pub struct ExecutionMetrics {
    values: [AtomicU64; 9],
}

impl ExecutionMetrics {
    /// Creates a sink with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter
    pub fn get(&self, counter: Counter) -> u64 {
        self.values[counter.slot()].load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            index_advances: self.get(Counter::IndexAdvances),
            index_seeks: self.get(Counter::IndexSeeks),
            rows_emitted: self.get(Counter::RowsEmitted),
            ancestor_lookups: self.get(Counter::AncestorLookups),
            branch_lookups: self.get(Counter::BranchLookups),
            cursors_opened: self.get(Counter::CursorsOpened),
            inner_cursors_open_peak: self.get(Counter::InnerCursorsOpenPeak),
            sorted_rows: self.get(Counter::SortedRows),
            skip_scan_jumps: self.get(Counter::SkipScanJumps),
        }
    }

    /// All counters as a JSON object keyed by counter name
    pub fn to_json(&self) -> serde_json::Value {
        let map = Counter::ALL
            .iter()
            .map(|c| (c.as_str().to_string(), serde_json::Value::from(self.get(*c))))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

impl MetricsSink for ExecutionMetrics {
    fn increment(&self, counter: Counter, n: u64) {
        self.values[counter.slot()].fetch_add(n, Ordering::Relaxed);
    }

    fn observe_peak(&self, counter: Counter, value: u64) {
        self.values[counter.slot()].fetch_max(value, Ordering::Relaxed);
    }

    fn snapshot(&self) -> Option<MetricsSnapshot> {
        Some(ExecutionMetrics::snapshot(self))
    }
}

/// A point-in-time snapshot of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub index_advances: u64,
    pub index_seeks: u64,
    pub rows_emitted: u64,
    pub ancestor_lookups: u64,
    pub branch_lookups: u64,
    pub cursors_opened: u64,
    pub inner_cursors_open_peak: u64,
    pub sorted_rows: u64,
    pub skip_scan_jumps: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_zero() {
        let metrics = ExecutionMetrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_increment_and_peak() {
        let metrics = ExecutionMetrics::new();
        metrics.increment(Counter::IndexAdvances, 3);
        metrics.increment(Counter::IndexAdvances, 2);
        metrics.observe_peak(Counter::InnerCursorsOpenPeak, 4);
        metrics.observe_peak(Counter::InnerCursorsOpenPeak, 2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.index_advances, 5);
        assert_eq!(snapshot.inner_cursors_open_peak, 4);
    }

    #[test]
    fn test_to_json() {
        let metrics = ExecutionMetrics::new();
        metrics.increment(Counter::SkipScanJumps, 7);
        let json = metrics.to_json();
        assert_eq!(json["skip_scan_jumps"], 7);
        assert_eq!(json["rows_emitted"], 0);
        assert_eq!(json.as_object().unwrap().len(), Counter::ALL.len());
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(ExecutionMetrics::new());
        let mut handles = vec![];
        for _ in 0..8 {
            let m = Arc::clone(&metrics);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    m.increment(Counter::RowsEmitted, 1);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.get(Counter::RowsEmitted), 800);
    }
}
