//! Index Scan Tests
//!
//! Tests for index scan invariants:
//! - Every bound combination returns exactly the admitted keys
//! - A reverse scan is the exact reverse of the forward scan
//! - Mixed-direction orderings follow each column's direction
//! - Null bounds follow the IS NULL / ambiguity rules

mod common;

use common::{context, flat_store, flat_store_values, ints, run, schema_of};
use hgroup::executor::{api, Bindings, IndexBound, IndexKeyRange, QueryExecutor, RowOrdering};
use hgroup::observability::Counter;
use hgroup::row::Value;

const ROWS: [(i32, i32, i32); 8] = [
    (1, 1, 0),
    (2, 2, 2),
    (3, 2, 1),
    (4, 3, 0),
    (5, 3, 2),
    (6, 3, 1),
    (7, 5, 0),
    (8, 6, 2),
];

// =============================================================================
// Helper Functions
// =============================================================================

/// Ids admitted by a bound on x, in (x, id) order
fn expected_ids(lo: Option<(i32, bool)>, hi: Option<(i32, bool)>) -> Vec<i32> {
    let mut rows: Vec<(i32, i32)> = ROWS
        .iter()
        .filter(|(_, x, _)| match lo {
            Some((v, true)) => *x >= v,
            Some((v, false)) => *x > v,
            None => true,
        })
        .filter(|(_, x, _)| match hi {
            Some((v, true)) => *x <= v,
            Some((v, false)) => *x < v,
            None => true,
        })
        .map(|(id, x, _)| (*x, *id))
        .collect();
    rows.sort();
    rows.into_iter().map(|(_, id)| id).collect()
}

fn range(lo: Option<(i32, bool)>, hi: Option<(i32, bool)>) -> IndexKeyRange {
    let bound = |v: i32| IndexBound::of(vec![Value::Int(v)]);
    match (lo, hi) {
        (None, None) => IndexKeyRange::unbounded(),
        (Some((l, li)), None) => IndexKeyRange::starting_at(bound(l), li),
        (None, Some((h, hi))) => IndexKeyRange::ending_at(bound(h), hi),
        (Some((l, li)), Some((h, hi))) => IndexKeyRange::bounded(bound(l), li, bound(h), hi),
    }
}

fn bound_choices() -> Vec<Option<(i32, bool)>> {
    let mut choices = vec![None];
    for v in 0..=7 {
        choices.push(Some((v, true)));
        choices.push(Some((v, false)));
    }
    choices
}

// =============================================================================
// Range Grid Tests
// =============================================================================

/// Forward scans return exactly the admitted keys; reverse scans mirror them.
#[test]
fn test_direction_symmetry_over_bound_grid() {
    let store = flat_store(&ROWS);
    let schema = schema_of(&store);
    let index_type = schema.index_row_type(schema.index_by_name("t_x").unwrap().id).unwrap();
    let (ctx, _) = context(&store);

    for lo in bound_choices() {
        for hi in bound_choices() {
            let forward = api::index_scan_default(index_type.clone(), false, range(lo, hi)).unwrap();
            let reverse = api::index_scan_default(index_type.clone(), true, range(lo, hi)).unwrap();

            let forward_ids = ints(&run(&ctx, &forward), 1);
            let mut reverse_ids = ints(&run(&ctx, &reverse), 1);
            reverse_ids.reverse();

            assert_eq!(forward_ids, expected_ids(lo, hi), "lo {:?} hi {:?}", lo, hi);
            assert_eq!(reverse_ids, forward_ids, "lo {:?} hi {:?}", lo, hi);
        }
    }
}

/// A bounded scan seeks once instead of reading from the start.
#[test]
fn test_bounded_scan_skips_leading_rows() {
    let store = flat_store(&ROWS);
    let schema = schema_of(&store);
    let index_type = schema.index_row_type(schema.index_by_name("t_x").unwrap().id).unwrap();
    let (ctx, metrics) = context(&store);

    let scan = api::index_scan_default(index_type, false, range(Some((5, true)), None)).unwrap();
    assert_eq!(ints(&run(&ctx, &scan), 1), vec![7, 8]);
    assert_eq!(metrics.get(Counter::IndexSeeks), 1);
    assert!(metrics.get(Counter::IndexAdvances) <= 3);
}

// =============================================================================
// Mixed Direction Tests
// =============================================================================

/// x ascending, y descending; the trailing id inherits descending.
#[test]
fn test_mixed_direction_ordering() {
    let store = flat_store(&ROWS);
    let schema = schema_of(&store);
    let index_type = schema.index_row_type(schema.index_by_name("t_xy").unwrap().id).unwrap();
    let (ctx, _) = context(&store);

    let ordering = RowOrdering::index_columns(&[true, false]);
    let scan = api::index_scan_ordered(index_type, IndexKeyRange::unbounded(), &ordering).unwrap();
    let rows = run(&ctx, &scan);

    let mut expected: Vec<(i32, i32, i32)> = ROWS.iter().map(|(id, x, y)| (*x, -*y, *id)).collect();
    expected.sort();
    assert_eq!(ints(&rows, 2), expected.iter().map(|(_, _, id)| *id).collect::<Vec<_>>());
}

/// Mixed directions restricted to x in [2, 3].
#[test]
fn test_mixed_direction_with_range() {
    let store = flat_store(&ROWS);
    let schema = schema_of(&store);
    let index_type = schema.index_row_type(schema.index_by_name("t_xy").unwrap().id).unwrap();
    let (ctx, _) = context(&store);

    let ordering = RowOrdering::index_columns(&[false, true]);
    let scan = api::index_scan_ordered(index_type, range(Some((2, true)), Some((3, true))), &ordering)
        .unwrap();
    let rows = run(&ctx, &scan);

    assert_eq!(ints(&rows, 0), vec![3, 3, 3, 2, 2]);
    assert_eq!(ints(&rows, 1), vec![0, 1, 2, 1, 2]);
}

/// An all-descending ordering equals the reverse scan.
#[test]
fn test_all_descending_equals_reverse() {
    let store = flat_store(&ROWS);
    let schema = schema_of(&store);
    let index_type = schema.index_row_type(schema.index_by_name("t_xy").unwrap().id).unwrap();
    let (ctx, _) = context(&store);

    let ordering = RowOrdering::index_columns(&[false, false]);
    let ordered = api::index_scan_ordered(index_type.clone(), IndexKeyRange::unbounded(), &ordering)
        .unwrap();
    let reverse = api::index_scan_default(index_type, true, IndexKeyRange::unbounded()).unwrap();
    assert_eq!(ints(&run(&ctx, &ordered), 2), ints(&run(&ctx, &reverse), 2));
}

// =============================================================================
// Null Bound Tests
// =============================================================================

fn store_with_nulls() -> std::sync::Arc<hgroup::storage::MemoryGroupStore> {
    flat_store_values(vec![
        vec![Value::Int(1), Value::Null, Value::Int(0)],
        vec![Value::Int(2), Value::Int(4), Value::Int(0)],
        vec![Value::Int(3), Value::Null, Value::Int(0)],
        vec![Value::Int(4), Value::Int(1), Value::Int(0)],
    ])
}

/// Null on both bounds means IS NULL; a null lower bound alone is open or non-null.
#[test]
fn test_null_bounds() {
    let store = store_with_nulls();
    let schema = schema_of(&store);
    let index_type = schema.index_row_type(schema.index_by_name("t_x").unwrap().id).unwrap();
    let (ctx, _) = context(&store);
    let null = || IndexBound::of(vec![Value::Null]);

    let is_null = api::index_scan_default(index_type.clone(), false, IndexKeyRange::exact(null())).unwrap();
    assert_eq!(ints(&run(&ctx, &is_null), 1), vec![1, 3]);

    let all = api::index_scan_default(index_type.clone(), false, IndexKeyRange::starting_at(null(), true))
        .unwrap();
    assert_eq!(ints(&run(&ctx, &all), 1), vec![1, 3, 4, 2]);

    let not_null = api::index_scan_default(index_type, true, IndexKeyRange::starting_at(null(), false))
        .unwrap();
    assert_eq!(ints(&run(&ctx, &not_null), 1), vec![2, 4]);
}

/// `<= null` without a matching lower null is rejected when the scan opens.
#[test]
fn test_null_upper_bound_rejected() {
    let store = store_with_nulls();
    let schema = schema_of(&store);
    let index_type = schema.index_row_type(schema.index_by_name("t_x").unwrap().id).unwrap();
    let (ctx, _) = context(&store);

    let scan = api::index_scan_default(
        index_type,
        false,
        IndexKeyRange::ending_at(IndexBound::of(vec![Value::Null]), true),
    )
    .unwrap();
    let err = QueryExecutor::run(&scan, &ctx, &Bindings::new()).unwrap_err();
    assert_eq!(err.code(), "HG_ILLEGAL_NULL_BOUND");
}
