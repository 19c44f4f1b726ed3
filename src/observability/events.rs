//! Lifecycle events
//!
//! Operators never log per row. Only query-level and plan-level events
//! appear here.

use std::fmt;

/// Execution lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Engine configuration loaded
    ConfigLoaded,
    /// Group fixture loaded into a store
    FixtureLoaded,
    /// Query execution started
    QueryBegin,
    /// Query drained to the end
    QueryComplete,
    /// Query failed with an error
    QueryFailed,
    /// Query stopped by cancellation or timeout
    QueryCanceled,
    /// Skip-scan intersect fell back to sequential advancement
    SkipScanDegraded,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::FixtureLoaded => "FIXTURE_LOADED",
            Event::QueryBegin => "QUERY_BEGIN",
            Event::QueryComplete => "QUERY_COMPLETE",
            Event::QueryFailed => "QUERY_FAILED",
            Event::QueryCanceled => "QUERY_CANCELED",
            Event::SkipScanDegraded => "SKIP_SCAN_DEGRADED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::ConfigLoaded,
            Event::FixtureLoaded,
            Event::QueryBegin,
            Event::QueryComplete,
            Event::QueryFailed,
            Event::QueryCanceled,
            Event::SkipScanDegraded,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }
}
