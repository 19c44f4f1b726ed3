//! Row shape descriptors
//!
//! Row types are compared structurally: two operators may combine rows only
//! when their row types agree on column count and column types.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::value::ColumnType;

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

/// Table identifier (the table's ordinal within its group)
pub type TableId = u32;

/// Index identifier
pub type IndexId = u32;

/// What a row type describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowTypeKind {
    /// A declared table
    Table(TableId),
    /// An index on a table
    Index {
        /// Indexed table
        table: TableId,
        /// Index id
        index: IndexId,
    },
    /// Synthesized value tuples
    Values,
    /// Hkey-only rows identifying a table's rows
    HKey(TableId),
    /// Flattened join of a parent and child type
    Flattened {
        /// Parent row type id
        parent: u64,
        /// Child row type id
        child: u64,
    },
}

/// Column count and types for one kind of row
#[derive(Debug)]
pub struct RowType {
    type_id: u64,
    name: String,
    kind: RowTypeKind,
    columns: Vec<ColumnType>,
}

impl RowType {
    fn build(name: impl Into<String>, kind: RowTypeKind, columns: Vec<ColumnType>) -> Arc<Self> {
        Arc::new(Self {
            type_id: NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            kind,
            columns,
        })
    }

    /// Row type of a declared table
    pub fn table(name: impl Into<String>, table: TableId, columns: Vec<ColumnType>) -> Arc<Self> {
        Self::build(name, RowTypeKind::Table(table), columns)
    }

    /// Row type of an index: declared columns followed by hkey columns
    pub fn index(
        name: impl Into<String>,
        table: TableId,
        index: IndexId,
        columns: Vec<ColumnType>,
    ) -> Arc<Self> {
        Self::build(name, RowTypeKind::Index { table, index }, columns)
    }

    /// Row type for synthesized value tuples
    pub fn values(columns: Vec<ColumnType>) -> Arc<Self> {
        Self::build("values", RowTypeKind::Values, columns)
    }

    /// Hkey-only row type for a table
    pub fn hkey(name: impl Into<String>, table: TableId, columns: Vec<ColumnType>) -> Arc<Self> {
        Self::build(name, RowTypeKind::HKey(table), columns)
    }

    /// Flattened row type: parent columns followed by child columns
    pub fn flattened(parent: &RowType, child: &RowType) -> Arc<Self> {
        let mut columns = parent.columns.clone();
        columns.extend(child.columns.iter().copied());
        Self::build(
            format!("flatten({}, {})", parent.name, child.name),
            RowTypeKind::Flattened {
                parent: parent.type_id,
                child: child.type_id,
            },
            columns,
        )
    }

    /// Process-unique identity of this row type
    pub fn type_id(&self) -> u64 {
        self.type_id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// What this row type describes
    pub fn kind(&self) -> &RowTypeKind {
        &self.kind
    }

    /// Column types in order
    pub fn columns(&self) -> &[ColumnType] {
        &self.columns
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Table whose rows this type identifies, if any
    pub fn table_id(&self) -> Option<TableId> {
        match self.kind {
            RowTypeKind::Table(t) | RowTypeKind::HKey(t) => Some(t),
            RowTypeKind::Index { table, .. } => Some(table),
            RowTypeKind::Values | RowTypeKind::Flattened { .. } => None,
        }
    }

    /// True for declared table rows
    pub fn is_table(&self) -> bool {
        matches!(self.kind, RowTypeKind::Table(_))
    }

    /// True for index rows
    pub fn is_index(&self) -> bool {
        matches!(self.kind, RowTypeKind::Index { .. })
    }

    /// Structural comparison: same column count and column types
    pub fn same_shape(&self, other: &RowType) -> bool {
        self.columns == other.columns
    }
}

impl PartialEq for RowType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for RowType {}

impl fmt::Display for RowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, c) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_comparison() {
        let a = RowType::values(vec![ColumnType::Int, ColumnType::Varchar]);
        let b = RowType::values(vec![ColumnType::Int, ColumnType::Varchar]);
        let c = RowType::values(vec![ColumnType::Long, ColumnType::Varchar]);

        assert_ne!(a, b);
        assert!(a.same_shape(&b));
        assert!(!a.same_shape(&c));
    }

    #[test]
    fn test_flattened_columns() {
        let parent = RowType::table("r", 1, vec![ColumnType::Int, ColumnType::Varchar]);
        let child = RowType::table("a", 2, vec![ColumnType::Int, ColumnType::Int]);
        let flat = RowType::flattened(&parent, &child);

        assert_eq!(flat.column_count(), 4);
        assert_eq!(flat.table_id(), None);
        assert_eq!(flat.to_string(), "flatten(r, a)(int, varchar, int, int)");
    }

    #[test]
    fn test_table_id() {
        let index = RowType::index("a.avalue", 2, 7, vec![ColumnType::Varchar]);
        assert_eq!(index.table_id(), Some(2));
        assert!(index.is_index());
        assert!(!index.is_table());
    }
}
