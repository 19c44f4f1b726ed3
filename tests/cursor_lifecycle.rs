//! Cursor Lifecycle Tests
//!
//! Tests for the cursor protocol:
//! - next() before open() or after close() is an error
//! - A closed cursor can be reopened and replays its rows
//! - A pipelined map only reopens at top level
//! - Cancellation and timeouts are terminal and surface their codes

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{context, context_with, flat_store, ints, names, ra_store, run, schema_of, A, R};
use hgroup::config::EngineConfig;
use hgroup::executor::{
    api, field, Bindings, CursorState, ExecError, IndexBound, IndexKeyRange, InputPreservation,
    IntersectOptions, OperatorRef, OutputSide, QueryExecutor, RowOrdering, ScanStrategy,
    SortOption,
};
use hgroup::row::{ColumnType, Collation, Row, RowType, Value};
use hgroup::storage::MemoryGroupStore;

fn keys(keys: &[i32]) -> OperatorRef {
    let row_type = RowType::values(vec![ColumnType::Int]);
    let rows = keys
        .iter()
        .map(|k| Row::new(row_type.clone(), vec![Value::Int(*k)]))
        .collect();
    api::values_scan_default(row_type, rows).unwrap()
}

// =============================================================================
// Protocol Tests
// =============================================================================

/// next() on a cursor that was never opened fails.
#[test]
fn test_next_before_open() {
    let (ctx, _) = context(&flat_store(&[]));
    let mut cursor = keys(&[1]).cursor(&ctx).unwrap();
    assert_eq!(cursor.state(), CursorState::Closed);
    assert!(matches!(cursor.next(), Err(ExecError::IllegalState(_))));
}

/// next() after close() fails; reopening replays the rows.
#[test]
fn test_close_and_reopen() {
    let store = flat_store(&[(1, 10, 0), (2, 20, 0), (3, 30, 0)]);
    let schema = schema_of(&store);
    let (ctx, _) = context(&store);
    let index_type = schema.index_row_type(schema.index_by_name("t_x").unwrap().id).unwrap();
    let scan = api::index_scan_default(index_type, false, IndexKeyRange::unbounded()).unwrap();

    let mut cursor = scan.cursor(&ctx).unwrap();
    let bindings = Bindings::new();
    for _ in 0..2 {
        cursor.open(&bindings).unwrap();
        let mut rows = Vec::new();
        while let Some(row) = cursor.next().unwrap() {
            rows.push(row);
        }
        assert_eq!(ints(&rows, 1), vec![1, 2, 3]);
        assert_eq!(cursor.state(), CursorState::Exhausted);
        assert!(cursor.next().unwrap().is_none());

        cursor.close();
        cursor.close();
        assert_eq!(cursor.state(), CursorState::Closed);
        assert!(matches!(cursor.next(), Err(ExecError::IllegalState(_))));
    }
}

/// Every non-pipelined operator over the r/a group, by name
fn reopenable_plans(store: &Arc<MemoryGroupStore>) -> Vec<(&'static str, OperatorRef)> {
    let schema = schema_of(store);
    let (ctx, _) = context(store);
    let index_type = schema.index_row_type(schema.index_by_name("avalue").unwrap().id).unwrap();
    let r_type = schema.table_row_type(R).unwrap();
    let avalue = |v: &str| IndexBound::of(vec![Value::varchar(v)]);

    // a13, a14, a23 and a14, a23, a24
    let low = || {
        let range = IndexKeyRange::bounded(avalue("a13"), true, avalue("a23"), true);
        api::index_scan_default(index_type.clone(), false, range).unwrap()
    };
    let high = || {
        let range = IndexKeyRange::starting_at(avalue("a14"), true);
        api::index_scan_default(index_type.clone(), false, range).unwrap()
    };
    let all = || api::index_scan_default(index_type.clone(), false, IndexKeyRange::unbounded()).unwrap();
    let roots = || {
        let rows = run(&ctx, &api::group_scan_default().unwrap())
            .into_iter()
            .filter(|row| row.row_type().table_id() == Some(R))
            .collect();
        api::values_scan_default(r_type.clone(), rows).unwrap()
    };
    let skip = IntersectOptions {
        output_side: OutputSide::Left,
        scan_strategy: ScanStrategy::Skip,
    };
    let by_aid = || RowOrdering::new().desc(field(2));
    let words = {
        let row_type = RowType::values(vec![ColumnType::Varchar]);
        let rows = ["a", "A", "b", "B", "b", "c"]
            .iter()
            .map(|w| Row::new(row_type.clone(), vec![Value::varchar(*w)]))
            .collect();
        api::values_scan_default(row_type, rows).unwrap()
    };

    vec![
        ("union", api::union_ordered(low(), high(), 1, 1, vec![true], false).unwrap()),
        (
            "intersect",
            api::intersect_ordered(low(), high(), 1, 1, vec![true], Vec::new(), skip).unwrap(),
        ),
        ("except", api::except_ordered(low(), high(), 1, 1, vec![true], false).unwrap()),
        ("hkey union", api::hkey_union_ordered(low(), high(), &schema, R).unwrap()),
        (
            "ancestor lookup",
            api::ancestor_lookup_default(all(), &schema, index_type.clone(), &[R], InputPreservation::KeepInput, 2)
                .unwrap(),
        ),
        (
            "branch lookup",
            api::branch_lookup_default(roots(), &schema, r_type.clone(), R, InputPreservation::DiscardInput, 2)
                .unwrap(),
        ),
        (
            "group lookup",
            api::group_lookup_default(all(), &schema, index_type.clone(), &[R], Some(A), InputPreservation::DiscardInput, 3)
                .unwrap(),
        ),
        ("sort", api::sort_general(all(), by_aid(), SortOption::PreserveDuplicates).unwrap()),
        (
            "limited sort",
            api::sort_insertion_limited(all(), by_aid(), SortOption::PreserveDuplicates, 2).unwrap(),
        ),
        (
            "distinct",
            api::distinct_partial(words, vec![Some(Collation::CaseInsensitive)]).unwrap(),
        ),
        (
            "map",
            api::map_nested_loops(
                all(),
                api::ancestor_lookup_nested(&schema, index_type.clone(), &[R, A], InputPreservation::DiscardInput, 0, 1)
                    .unwrap(),
                0,
                false,
                1,
            )
            .unwrap(),
        ),
    ]
}

/// open; close; open replays the same rows on every non-pipelined operator.
#[test]
fn test_reopen_replays_every_operator() {
    let store = ra_store();
    let (ctx, _) = context(&store);
    let bindings = Bindings::new();

    for (name, plan) in reopenable_plans(&store) {
        let mut cursor = plan.cursor(&ctx).unwrap();
        let mut passes = Vec::new();
        for _ in 0..2 {
            cursor.open(&bindings).unwrap();
            let mut rows = Vec::new();
            while let Some(row) = cursor.next().unwrap() {
                rows.push(row);
            }
            cursor.close();
            passes.push(names(&rows));
        }
        assert!(!passes[0].is_empty(), "{} produced nothing", name);
        assert_eq!(passes[0], passes[1], "{} changed on reopen", name);
    }
}

/// Closing part way through and reopening starts over.
#[test]
fn test_reopen_after_partial_read() {
    let store = ra_store();
    let (ctx, _) = context(&store);
    let bindings = Bindings::new();

    for (name, plan) in reopenable_plans(&store) {
        let full = names(&run(&ctx, &plan));
        let mut cursor = plan.cursor(&ctx).unwrap();
        cursor.open(&bindings).unwrap();
        cursor.next().unwrap();
        cursor.close();

        cursor.open(&bindings).unwrap();
        let mut rows = Vec::new();
        while let Some(row) = cursor.next().unwrap() {
            rows.push(row);
        }
        cursor.close();
        assert_eq!(names(&rows), full, "{} after a partial read", name);
    }
}

/// Opening an open cursor fails.
#[test]
fn test_double_open() {
    let (ctx, _) = context(&flat_store(&[]));
    let mut cursor = keys(&[1]).cursor(&ctx).unwrap();
    cursor.open(&Bindings::new()).unwrap();
    assert!(matches!(cursor.open(&Bindings::new()), Err(ExecError::IllegalState(_))));
}

/// A pipelined map may be reopened through the top-level pair only.
#[test]
fn test_pipelined_map_reopen() {
    let (ctx, _) = context(&flat_store(&[]));
    let map = api::map_nested_loops(keys(&[1, 2]), keys(&[7]), 0, true, 2).unwrap();
    let mut cursor = map.cursor(&ctx).unwrap();
    let bindings = Bindings::new();

    cursor.open_top_level(&bindings).unwrap();
    cursor.close_top_level();
    cursor.open_top_level(&bindings).unwrap();
    let mut rows = Vec::new();
    while let Some(row) = cursor.next().unwrap() {
        rows.push(row);
    }
    assert_eq!(ints(&rows, 0), vec![7, 7]);
    cursor.close();

    let err = cursor.open(&bindings).unwrap_err();
    assert_eq!(err.code(), "HG_ILLEGAL_STATE");
}

// =============================================================================
// Interruption Tests
// =============================================================================

/// Cancelling between rows stops the next pull.
#[test]
fn test_cancel_mid_scan() {
    let (ctx, _) = context(&flat_store(&[]));
    let mut cursor = keys(&[1, 2, 3]).cursor(&ctx).unwrap();
    cursor.open_top_level(&Bindings::new()).unwrap();
    assert!(cursor.next().unwrap().is_some());

    ctx.cancel();
    let err = cursor.next().unwrap_err();
    assert!(err.is_interruption());
    assert_eq!(err.code(), "HG_QUERY_CANCELED");
    cursor.close_top_level();
}

/// A cancelled context fails the whole run.
#[test]
fn test_cancelled_run() {
    let (ctx, _) = context(&flat_store(&[]));
    let sorted = api::sort_general(
        keys(&[3, 1, 2]),
        RowOrdering::index_columns(&[true]),
        SortOption::PreserveDuplicates,
    )
    .unwrap();
    ctx.cancel();
    let err = QueryExecutor::run(&sorted, &ctx, &Bindings::new()).unwrap_err();
    assert!(matches!(err, ExecError::Cancelled));
}

/// The configured deadline surfaces as a timeout.
#[test]
fn test_query_timeout() {
    let config = EngineConfig {
        query_timeout_ms: Some(1),
        ..EngineConfig::default()
    };
    let (ctx, _) = context_with(&flat_store(&[]), config);
    thread::sleep(Duration::from_millis(10));

    let err = QueryExecutor::run(&keys(&[1]), &ctx, &Bindings::new()).unwrap_err();
    assert!(matches!(err, ExecError::TimedOut { .. }));
    assert_eq!(err.code(), "HG_QUERY_TIMEOUT");
}
