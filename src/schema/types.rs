//! Table and index definitions

use serde::{Deserialize, Serialize};

use crate::row::{ColumnType, IndexId, TableId};

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Column type
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnDef {
    /// Creates a column definition
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// A table within a group
#[derive(Debug, Clone)]
pub struct TableDef {
    /// Ordinal, unique within the group; also the hkey segment ordinal
    pub id: TableId,
    /// Table name
    pub name: String,
    /// Parent table, `None` for the group root
    pub parent: Option<TableId>,
    /// Columns in order
    pub columns: Vec<ColumnDef>,
    /// Primary key column positions
    pub primary_key: Vec<usize>,
    /// Columns referencing the parent's primary key, in parent key order
    pub parent_join: Vec<usize>,
}

impl TableDef {
    /// Column types in order
    pub fn column_types(&self) -> Vec<ColumnType> {
        self.columns.iter().map(|c| c.column_type).collect()
    }

    /// Position of a named column
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Where one hkey key column's value comes from, relative to a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HKeyColumn {
    /// Depth of the hkey segment (0 = root)
    pub level: usize,
    /// Position within that segment's values
    pub position: usize,
    /// Column of the table itself holding this value, if any
    pub table_column: Option<usize>,
    /// Type of the key column
    pub column_type: ColumnType,
}

/// A secondary index on one table
#[derive(Debug, Clone)]
pub struct IndexDef {
    /// Index id, unique within the group
    pub id: IndexId,
    /// Index name
    pub name: String,
    /// Indexed table
    pub table: TableId,
    /// Declared key column positions
    pub columns: Vec<usize>,
    /// Hkey columns appended after the declared columns
    pub hkey_columns: Vec<HKeyColumn>,
}

impl IndexDef {
    /// Number of declared key columns
    pub fn declared_count(&self) -> usize {
        self.columns.len()
    }

    /// Total index row width: declared plus appended hkey columns
    pub fn row_width(&self) -> usize {
        self.columns.len() + self.hkey_columns.len()
    }
}
