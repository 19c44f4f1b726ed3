//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use hgroup::config::EngineConfig;
use hgroup::executor::{drain, Bindings, OperatorRef, QueryContext};
use hgroup::observability::ExecutionMetrics;
use hgroup::row::{ColumnType, Row, TableId, Value};
use hgroup::schema::{ColumnDef, GroupSchema};
use hgroup::storage::{GroupStore, MemoryGroupStore};

pub const R: TableId = 1;
pub const A: TableId = 2;
pub const T: TableId = 1;

/// r(rid, rvalue) -> a(aid, rid, avalue), indexed on a.avalue
///
/// r1 owns a13, a14; r2 owns a23, a24.
pub fn ra_store() -> Arc<MemoryGroupStore> {
    let schema = GroupSchema::builder("ra")
        .table(
            "r",
            None,
            vec![
                ColumnDef::new("rid", ColumnType::Int),
                ColumnDef::new("rvalue", ColumnType::Varchar),
            ],
            &["rid"],
            &[],
        )
        .table(
            "a",
            Some("r"),
            vec![
                ColumnDef::new("aid", ColumnType::Int),
                ColumnDef::new("rid", ColumnType::Int),
                ColumnDef::new("avalue", ColumnType::Varchar),
            ],
            &["aid"],
            &["rid"],
        )
        .index("avalue", "a", &["avalue"])
        .build()
        .unwrap();

    let mut store = MemoryGroupStore::new(Arc::new(schema));
    for rid in [1, 2] {
        store
            .insert(R, vec![Value::Int(rid), Value::varchar(format!("r{}", rid))])
            .unwrap();
        for n in [3, 4] {
            let aid = rid * 10 + n;
            store
                .insert(
                    A,
                    vec![Value::Int(aid), Value::Int(rid), Value::varchar(format!("a{}", aid))],
                )
                .unwrap();
        }
    }
    Arc::new(store)
}

/// t(id, x, y) with indexes on x, on y and on (x, y)
pub fn flat_store(rows: &[(i32, i32, i32)]) -> Arc<MemoryGroupStore> {
    let rows: Vec<Vec<Value>> = rows
        .iter()
        .map(|(id, x, y)| vec![Value::Int(*id), Value::Int(*x), Value::Int(*y)])
        .collect();
    flat_store_values(rows)
}

/// `flat_store` over raw values, so x and y may be null
pub fn flat_store_values(rows: Vec<Vec<Value>>) -> Arc<MemoryGroupStore> {
    let schema = GroupSchema::builder("flat")
        .table(
            "t",
            None,
            vec![
                ColumnDef::new("id", ColumnType::Int),
                ColumnDef::new("x", ColumnType::Int),
                ColumnDef::new("y", ColumnType::Int),
            ],
            &["id"],
            &[],
        )
        .index("t_x", "t", &["x"])
        .index("t_y", "t", &["y"])
        .index("t_xy", "t", &["x", "y"])
        .build()
        .unwrap();

    let mut store = MemoryGroupStore::new(Arc::new(schema));
    for values in rows {
        store.insert(1, values).unwrap();
    }
    Arc::new(store)
}

pub fn schema_of(store: &Arc<MemoryGroupStore>) -> Arc<GroupSchema> {
    Arc::clone(store.schema())
}

/// Context with its own metrics sink
pub fn context(store: &Arc<MemoryGroupStore>) -> (QueryContext, Arc<ExecutionMetrics>) {
    context_with(store, EngineConfig::default())
}

pub fn context_with(
    store: &Arc<MemoryGroupStore>,
    config: EngineConfig,
) -> (QueryContext, Arc<ExecutionMetrics>) {
    let metrics = Arc::new(ExecutionMetrics::new());
    let store: Arc<dyn GroupStore> = store.clone();
    let ctx = QueryContext::new(store, config).with_metrics(metrics.clone());
    (ctx, metrics)
}

/// Runs a plan at top level
pub fn run(ctx: &QueryContext, op: &OperatorRef) -> Vec<Row> {
    let mut cursor = op.cursor(ctx).unwrap();
    drain(cursor.as_mut(), &Bindings::new()).unwrap()
}

/// Rows rendered as `name(v1, v2)`
pub fn names(rows: &[Row]) -> Vec<String> {
    rows.iter().map(|r| r.to_string()).collect()
}

/// Int column of every row
pub fn ints(rows: &[Row], column: usize) -> Vec<i32> {
    rows.iter()
        .map(|r| match r.value(column) {
            Some(Value::Int(v)) => *v,
            other => panic!("expected int at {}, got {:?}", column, other),
        })
        .collect()
}

pub const K: TableId = 1;
pub const L: TableId = 2;

/// k(id int, x int) -> l(lid long, id int, z int), indexed on k.x and l.z
///
/// `(id, x, Some(z))` also inserts the single child l(id, id, z), so the
/// Long `lid` ends every `l_z` row and follows the order of `id`.
pub fn mixed_width_store(rows: &[(i32, i32, Option<i32>)]) -> Arc<MemoryGroupStore> {
    let schema = GroupSchema::builder("mixed")
        .table(
            "k",
            None,
            vec![ColumnDef::new("id", ColumnType::Int), ColumnDef::new("x", ColumnType::Int)],
            &["id"],
            &[],
        )
        .table(
            "l",
            Some("k"),
            vec![
                ColumnDef::new("lid", ColumnType::Long),
                ColumnDef::new("id", ColumnType::Int),
                ColumnDef::new("z", ColumnType::Int),
            ],
            &["lid"],
            &["id"],
        )
        .index("k_x", "k", &["x"])
        .index("l_z", "l", &["z"])
        .build()
        .unwrap();

    let mut store = MemoryGroupStore::new(Arc::new(schema));
    for (id, x, z) in rows {
        store.insert(K, vec![Value::Int(*id), Value::Int(*x)]).unwrap();
        if let Some(z) = z {
            store
                .insert(L, vec![Value::Long(i64::from(*id)), Value::Int(*id), Value::Int(*z)])
                .unwrap();
        }
    }
    Arc::new(store)
}
