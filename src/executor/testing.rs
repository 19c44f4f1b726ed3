//! Fixtures for executor unit tests

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::row::{ColumnType, Row, RowType, Value};
use crate::schema::{ColumnDef, GroupSchema};
use crate::storage::MemoryGroupStore;

use super::context::{Bindings, QueryContext};
use super::cursor::{drain, OperatorRef};
use super::scan::ValuesScan;

/// Context over an empty single-table group
pub(crate) fn context() -> QueryContext {
    let schema = GroupSchema::builder("g")
        .table("t", None, vec![ColumnDef::new("id", ColumnType::Int)], &["id"], &[])
        .build()
        .unwrap();
    QueryContext::new(
        Arc::new(MemoryGroupStore::new(Arc::new(schema))),
        EngineConfig::default(),
    )
}

/// Row type `(tag varchar, key int)`
pub(crate) fn tagged_type() -> Arc<RowType> {
    RowType::values(vec![ColumnType::Varchar, ColumnType::Int])
}

/// Values scan of `(tag, key)` rows
pub(crate) fn tagged(row_type: &Arc<RowType>, rows: &[(&str, i32)]) -> OperatorRef {
    let rows = rows
        .iter()
        .map(|(tag, key)| Row::new(Arc::clone(row_type), vec![Value::varchar(*tag), Value::Int(*key)]))
        .collect();
    Arc::new(ValuesScan::new(Arc::clone(row_type), rows).unwrap())
}

/// Values scan of single-key rows, tagged with `tag`
pub(crate) fn keyed(row_type: &Arc<RowType>, tag: &str, keys: &[i32]) -> OperatorRef {
    let rows: Vec<(&str, i32)> = keys.iter().map(|k| (tag, *k)).collect();
    tagged(row_type, &rows)
}

/// Drains an operator at top level
pub(crate) fn run(ctx: &QueryContext, op: &OperatorRef) -> Vec<Row> {
    let mut cursor = op.cursor(ctx).unwrap();
    drain(cursor.as_mut(), &Bindings::new()).unwrap()
}

/// `(tag, key)` pairs of drained rows
pub(crate) fn pairs(rows: &[Row]) -> Vec<(String, i32)> {
    rows.iter()
        .map(|r| match (&r.values()[0], &r.values()[1]) {
            (Value::Varchar(tag), Value::Int(key)) => (tag.clone(), *key),
            other => panic!("unexpected row {:?}", other),
        })
        .collect()
}

/// Trailing int keys of drained rows
pub(crate) fn keys(rows: &[Row]) -> Vec<i32> {
    pairs(rows).into_iter().map(|(_, k)| k).collect()
}
