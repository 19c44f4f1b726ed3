//! Result of running a plan to completion

use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use crate::observability::MetricsSnapshot;
use crate::row::Row;

/// Rows of a finished query plus its counters
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Query identifier, as logged
    pub query_id: Uuid,
    /// Rows in output order
    pub rows: Vec<Row>,
    /// Wall time of the run
    pub elapsed_ms: u64,
    /// Counters, when the context's sink was an `ExecutionMetrics`
    pub metrics: Option<MetricsSnapshot>,
}

impl ExecutionResult {
    /// Returns true if no rows were produced
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Rows as `{"type": ..., "values": [...]}` objects, with the hkey when present
    pub fn rows_json(&self) -> JsonValue {
        JsonValue::Array(
            self.rows
                .iter()
                .map(|row| {
                    let mut entry = json!({
                        "type": row.row_type().name(),
                        "values": row.to_json(),
                    });
                    if let (Some(hkey), Some(map)) = (row.hkey(), entry.as_object_mut()) {
                        map.insert("hkey".to_string(), JsonValue::String(hkey.to_string()));
                    }
                    entry
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{ColumnType, RowType, Value};

    #[test]
    fn test_rows_json() {
        let row_type = RowType::values(vec![ColumnType::Int, ColumnType::Varchar]);
        let result = ExecutionResult {
            query_id: Uuid::new_v4(),
            rows: vec![Row::new(row_type, vec![Value::Int(1), Value::varchar("a")])],
            elapsed_ms: 0,
            metrics: None,
        };
        assert_eq!(result.len(), 1);
        let json = result.rows_json();
        assert_eq!(json[0]["values"], json!([1, "a"]));
        assert!(json[0].get("hkey").is_none());
    }
}
