//! Query runner
//!
//! Drives a plan's root cursor to completion:
//! 1. Create a cursor from the plan
//! 2. Open it at top level with the caller's bindings
//! 3. Pull rows until the end, checking for interruption
//! 4. Close it, also on failure
//!
//! Each run is wrapped in a `QUERY` observation scope. Cancellation and
//! timeouts are logged as `QUERY_CANCELED` before the scope fails.

use crate::observability::{log_event_with_fields, Counter, Event, ObservationScope};

use super::context::{Bindings, QueryContext};
use super::cursor::{drain, OperatorRef};
use super::errors::ExecResult;
use super::result::ExecutionResult;

/// Runs operator trees against a context
pub struct QueryExecutor;

impl QueryExecutor {
    /// Runs a plan and returns every row it produces.
    ///
    /// Errors are terminal; the cursor tree is closed before returning.
    pub fn run(op: &OperatorRef, ctx: &QueryContext, bindings: &Bindings) -> ExecResult<ExecutionResult> {
        let query_id = ctx.query_id().to_string();
        let scope = ObservationScope::with_fields(
            "QUERY",
            &[("query_id", query_id.as_str()), ("root", op.name())],
        );

        let outcome = op.cursor(ctx).and_then(|mut cursor| drain(cursor.as_mut(), bindings));
        match outcome {
            Ok(rows) => {
                ctx.count(Counter::RowsEmitted, rows.len() as u64);
                let count = rows.len().to_string();
                scope.complete_with_fields(&[("rows", count.as_str())]);
                Ok(ExecutionResult {
                    query_id: ctx.query_id(),
                    rows,
                    elapsed_ms: ctx.elapsed_ms(),
                    metrics: ctx.metrics_snapshot(),
                })
            }
            Err(e) => {
                if e.is_interruption() {
                    log_event_with_fields(
                        Event::QueryCanceled,
                        &[("query_id", query_id.as_str()), ("code", e.code())],
                    );
                }
                scope.fail(e.code(), &e.to_string());
                Err(e)
            }
        }
    }
}
