//! JSON group fixtures
//!
//! A fixture declares a group's tables and indexes plus the rows to load:
//!
//! ```json
//! {
//!   "group": "ra",
//!   "tables": [
//!     {"name": "r", "columns": [{"name": "rid", "type": "int"}], "primary_key": ["rid"]},
//!     {"name": "a", "parent": "r", "columns": [...], "primary_key": ["aid"], "parent_join": ["rid"]}
//!   ],
//!   "indexes": [{"name": "avalue", "table": "a", "columns": ["avalue"]}],
//!   "rows": {"r": [[1, "r1"]], "a": [[13, 1, "a13"]]}
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::row::{TableId, Value};

use super::errors::{SchemaError, SchemaResult};
use super::group::GroupSchema;
use super::types::ColumnDef;

/// Table declaration in a fixture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableFixture {
    /// Table name
    pub name: String,
    /// Parent table name
    #[serde(default)]
    pub parent: Option<String>,
    /// Columns in order
    pub columns: Vec<ColumnDef>,
    /// Primary key column names
    pub primary_key: Vec<String>,
    /// Columns referencing the parent's primary key
    #[serde(default)]
    pub parent_join: Vec<String>,
}

/// Index declaration in a fixture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexFixture {
    /// Index name
    pub name: String,
    /// Indexed table name
    pub table: String,
    /// Key column names
    pub columns: Vec<String>,
}

/// A group declaration plus its rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupFixture {
    /// Group name
    pub group: String,
    /// Tables, root first
    pub tables: Vec<TableFixture>,
    /// Secondary indexes
    #[serde(default)]
    pub indexes: Vec<IndexFixture>,
    /// Rows keyed by table name
    #[serde(default)]
    pub rows: BTreeMap<String, Vec<Vec<serde_json::Value>>>,
}

impl GroupFixture {
    /// Reads a fixture file
    pub fn load(path: &Path) -> SchemaResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SchemaError::malformed_fixture(path.display().to_string(), format!("Failed to read file: {}", e))
        })?;
        Self::from_json(&content)
            .map_err(|e| SchemaError::malformed_fixture(path.display().to_string(), e.message()))
    }

    /// Parses a fixture from a JSON string
    pub fn from_json(content: &str) -> SchemaResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| SchemaError::malformed_fixture("<inline>", format!("Invalid JSON: {}", e)))
    }

    /// Builds the declared schema
    pub fn schema(&self) -> SchemaResult<GroupSchema> {
        let mut builder = GroupSchema::builder(self.group.clone());
        for table in &self.tables {
            let pk: Vec<&str> = table.primary_key.iter().map(String::as_str).collect();
            let join: Vec<&str> = table.parent_join.iter().map(String::as_str).collect();
            builder = builder.table(
                &table.name,
                table.parent.as_deref(),
                table.columns.clone(),
                &pk,
                &join,
            );
        }
        for index in &self.indexes {
            let columns: Vec<&str> = index.columns.iter().map(String::as_str).collect();
            builder = builder.index(&index.name, &index.table, &columns);
        }
        builder.build()
    }

    /// Converts the JSON rows into typed values, parents before children
    pub fn typed_rows(&self, schema: &GroupSchema) -> SchemaResult<Vec<(TableId, Vec<Value>)>> {
        for name in self.rows.keys() {
            schema.table_by_name(name)?;
        }

        let mut out = Vec::new();
        for table in schema.tables() {
            let Some(rows) = self.rows.get(&table.name) else {
                continue;
            };
            for raw in rows {
                if raw.len() != table.columns.len() {
                    return Err(SchemaError::row_invalid(
                        &table.name,
                        format!("expected {} columns, got {}", table.columns.len(), raw.len()),
                    ));
                }
                let values = raw
                    .iter()
                    .zip(&table.columns)
                    .map(|(json, column)| {
                        Value::from_json(json, column.column_type).ok_or_else(|| {
                            SchemaError::row_invalid(
                                &table.name,
                                format!("column '{}' cannot hold {}", column.name, json),
                            )
                        })
                    })
                    .collect::<SchemaResult<Vec<_>>>()?;
                schema.validate_row(table.id, &values)?;
                out.push((table.id, values));
            }
        }
        Ok(out)
    }
}
