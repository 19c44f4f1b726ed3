//! Group schema: one root table and its descendants
//!
//! Tables are declared root first; every non-root table names an earlier
//! table as its parent. Table ordinals start at 1 in declaration order and
//! double as hkey segment ordinals.

use std::collections::HashSet;
use std::sync::Arc;

use crate::row::{ColumnType, HKey, HKeySegment, IndexId, RowType, TableId, Value};

use super::errors::{SchemaError, SchemaResult};
use super::types::{ColumnDef, HKeyColumn, IndexDef, TableDef};

/// Declared shape of a group
#[derive(Debug)]
pub struct GroupSchema {
    name: String,
    tables: Vec<TableDef>,
    indexes: Vec<IndexDef>,
    table_types: Vec<Arc<RowType>>,
    hkey_types: Vec<Arc<RowType>>,
    index_types: Vec<Arc<RowType>>,
}

impl GroupSchema {
    /// Starts building a group schema
    pub fn builder(name: impl Into<String>) -> GroupSchemaBuilder {
        GroupSchemaBuilder {
            name: name.into(),
            tables: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Group name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All tables, root first
    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    /// All indexes
    pub fn indexes(&self) -> &[IndexDef] {
        &self.indexes
    }

    /// Looks up a table by id
    pub fn table(&self, id: TableId) -> SchemaResult<&TableDef> {
        id.checked_sub(1)
            .and_then(|pos| self.tables.get(pos as usize))
            .ok_or_else(|| SchemaError::unknown_table(id))
    }

    /// Looks up a table by name
    pub fn table_by_name(&self, name: &str) -> SchemaResult<&TableDef> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| SchemaError::unknown_table(name))
    }

    /// Looks up an index by id
    pub fn index(&self, id: IndexId) -> SchemaResult<&IndexDef> {
        self.indexes
            .iter()
            .find(|i| i.id == id)
            .ok_or_else(|| SchemaError::invalid_definition(format!("Unknown index {}", id)))
    }

    /// Looks up an index by name
    pub fn index_by_name(&self, name: &str) -> SchemaResult<&IndexDef> {
        self.indexes
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| SchemaError::invalid_definition(format!("Unknown index '{}'", name)))
    }

    /// Number of hkey segments for rows of a table
    pub fn depth(&self, table: TableId) -> SchemaResult<usize> {
        Ok(self.ancestors_of(table)?.len() + 1)
    }

    /// Strict ancestors of a table, root first
    pub fn ancestors_of(&self, table: TableId) -> SchemaResult<Vec<TableId>> {
        let mut chain = Vec::new();
        let mut current = self.table(table)?.parent;
        while let Some(id) = current {
            chain.push(id);
            current = self.table(id)?.parent;
        }
        chain.reverse();
        Ok(chain)
    }

    /// True if `ancestor` is `table` or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: TableId, table: TableId) -> bool {
        ancestor == table
            || self
                .ancestors_of(table)
                .map(|chain| chain.contains(&ancestor))
                .unwrap_or(false)
    }

    /// Strict descendants of a table, in declaration order
    pub fn descendants_of(&self, table: TableId) -> Vec<TableId> {
        self.tables
            .iter()
            .filter(|t| t.id != table && self.is_ancestor_or_self(table, t.id))
            .map(|t| t.id)
            .collect()
    }

    /// Hkey key columns of a table, root first
    pub fn hkey_columns(&self, table: TableId) -> SchemaResult<Vec<HKeyColumn>> {
        let def = self.table(table)?;
        let mut chain = self.ancestors_of(table)?;
        chain.push(table);

        let mut columns = Vec::new();
        for (level, id) in chain.iter().enumerate() {
            let level_def = self.table(*id)?;
            for (position, pk) in level_def.primary_key.iter().enumerate() {
                let table_column = if *id == table {
                    Some(*pk)
                } else if Some(*id) == def.parent {
                    def.parent_join.get(position).copied()
                } else {
                    None
                };
                columns.push(HKeyColumn {
                    level,
                    position,
                    table_column,
                    column_type: level_def.columns[*pk].column_type,
                });
            }
        }
        Ok(columns)
    }

    /// Row type of a table's rows
    pub fn table_row_type(&self, table: TableId) -> SchemaResult<Arc<RowType>> {
        self.table(table)?;
        Ok(Arc::clone(&self.table_types[(table - 1) as usize]))
    }

    /// Row type of hkey-only rows for a table
    pub fn hkey_row_type(&self, table: TableId) -> SchemaResult<Arc<RowType>> {
        self.table(table)?;
        Ok(Arc::clone(&self.hkey_types[(table - 1) as usize]))
    }

    /// Row type of an index's rows
    pub fn index_row_type(&self, index: IndexId) -> SchemaResult<Arc<RowType>> {
        let pos = self
            .indexes
            .iter()
            .position(|i| i.id == index)
            .ok_or_else(|| SchemaError::invalid_definition(format!("Unknown index {}", index)))?;
        Ok(Arc::clone(&self.index_types[pos]))
    }

    /// Rebuilds the indexed row's hkey from an index row's values
    pub fn hkey_for_index_row(&self, index: IndexId, values: &[Value]) -> SchemaResult<HKey> {
        let def = self.index(index)?;
        if values.len() != def.row_width() {
            return Err(SchemaError::row_invalid(
                &def.name,
                format!("expected {} index columns, got {}", def.row_width(), values.len()),
            ));
        }
        let mut chain = self.ancestors_of(def.table)?;
        chain.push(def.table);

        let mut segments: Vec<HKeySegment> =
            chain.iter().map(|id| HKeySegment::new(*id, Vec::new())).collect();
        let mut appended = def.columns.len();
        for column in self.hkey_columns(def.table)? {
            let declared = column
                .table_column
                .and_then(|c| def.columns.iter().position(|d| *d == c));
            let value = match declared {
                Some(pos) => values[pos].clone(),
                None => {
                    let value = values[appended].clone();
                    appended += 1;
                    value
                }
            };
            segments[column.level].values.push(value);
        }
        Ok(HKey::new(segments))
    }

    /// Checks a row's arity and value types against its table
    pub fn validate_row(&self, table: TableId, values: &[Value]) -> SchemaResult<()> {
        let def = self.table(table)?;
        if values.len() != def.columns.len() {
            return Err(SchemaError::row_invalid(
                &def.name,
                format!("expected {} columns, got {}", def.columns.len(), values.len()),
            ));
        }
        for (column, value) in def.columns.iter().zip(values) {
            if !column.column_type.accepts(value) {
                return Err(SchemaError::row_invalid(
                    &def.name,
                    format!("column '{}' expects {}, got {}", column.name, column.column_type, value),
                ));
            }
        }
        for pk in &def.primary_key {
            if values[*pk].is_null() {
                return Err(SchemaError::row_invalid(&def.name, "null primary key"));
            }
        }
        Ok(())
    }
}

struct TableSpec {
    name: String,
    parent: Option<String>,
    columns: Vec<ColumnDef>,
    primary_key: Vec<String>,
    parent_join: Vec<String>,
}

struct IndexSpec {
    name: String,
    table: String,
    columns: Vec<String>,
}

/// Builder for a `GroupSchema`; all validation happens in `build`
pub struct GroupSchemaBuilder {
    name: String,
    tables: Vec<TableSpec>,
    indexes: Vec<IndexSpec>,
}

impl GroupSchemaBuilder {
    /// Declares a table
    pub fn table(
        mut self,
        name: &str,
        parent: Option<&str>,
        columns: Vec<ColumnDef>,
        primary_key: &[&str],
        parent_join: &[&str],
    ) -> Self {
        self.tables.push(TableSpec {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            columns,
            primary_key: primary_key.iter().map(|s| s.to_string()).collect(),
            parent_join: parent_join.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    /// Declares an index
    pub fn index(mut self, name: &str, table: &str, columns: &[&str]) -> Self {
        self.indexes.push(IndexSpec {
            name: name.to_string(),
            table: table.to_string(),
            columns: columns.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    /// Validates the declarations and builds the schema
    pub fn build(self) -> SchemaResult<GroupSchema> {
        let mut tables: Vec<TableDef> = Vec::with_capacity(self.tables.len());
        let mut names = HashSet::new();

        for (pos, spec) in self.tables.into_iter().enumerate() {
            if !names.insert(spec.name.clone()) {
                return Err(SchemaError::invalid_definition(format!(
                    "Duplicate table '{}'",
                    spec.name
                )));
            }

            let parent = match &spec.parent {
                Some(parent_name) => Some(
                    tables
                        .iter()
                        .find(|t| &t.name == parent_name)
                        .ok_or_else(|| SchemaError::unknown_table(parent_name))?,
                ),
                None => None,
            };
            if pos == 0 && parent.is_some() {
                return Err(SchemaError::invalid_definition("First table must be the group root"));
            }
            if pos > 0 && parent.is_none() {
                return Err(SchemaError::invalid_definition(format!(
                    "Table '{}' needs a parent; a group has a single root",
                    spec.name
                )));
            }

            let resolve = |column: &String| -> SchemaResult<usize> {
                spec.columns
                    .iter()
                    .position(|c| &c.name == column)
                    .ok_or_else(|| SchemaError::unknown_column(&spec.name, column))
            };
            let primary_key = spec.primary_key.iter().map(resolve).collect::<SchemaResult<Vec<_>>>()?;
            let parent_join = spec.parent_join.iter().map(resolve).collect::<SchemaResult<Vec<_>>>()?;

            if primary_key.is_empty() {
                return Err(SchemaError::invalid_definition(format!(
                    "Table '{}' has no primary key",
                    spec.name
                )));
            }
            if let Some(parent) = parent {
                let parent_types: Vec<ColumnType> = parent
                    .primary_key
                    .iter()
                    .map(|pk| parent.columns[*pk].column_type)
                    .collect();
                let join_types: Vec<ColumnType> =
                    parent_join.iter().map(|j| spec.columns[*j].column_type).collect();
                if parent_types != join_types {
                    return Err(SchemaError::invalid_definition(format!(
                        "Join columns of '{}' do not match the primary key of '{}'",
                        spec.name, parent.name
                    )));
                }
            } else if !parent_join.is_empty() {
                return Err(SchemaError::invalid_definition("Root table cannot join to a parent"));
            }

            let parent_id = parent.map(|p| p.id);
            tables.push(TableDef {
                id: (pos + 1) as TableId,
                name: spec.name,
                parent: parent_id,
                columns: spec.columns,
                primary_key,
                parent_join,
            });
        }

        let mut schema = GroupSchema {
            name: self.name,
            tables,
            indexes: Vec::new(),
            table_types: Vec::new(),
            hkey_types: Vec::new(),
            index_types: Vec::new(),
        };

        for table in &schema.tables {
            schema.table_types.push(RowType::table(
                table.name.clone(),
                table.id,
                table.column_types(),
            ));
        }
        let mut hkey_types = Vec::with_capacity(schema.tables.len());
        for table in &schema.tables {
            let columns = schema.hkey_columns(table.id)?;
            hkey_types.push(RowType::hkey(
                format!("hkey({})", table.name),
                table.id,
                columns.iter().map(|c| c.column_type).collect(),
            ));
        }
        schema.hkey_types = hkey_types;

        for (pos, spec) in self.indexes.into_iter().enumerate() {
            let table = schema.table_by_name(&spec.table)?;
            let columns = spec
                .columns
                .iter()
                .map(|c| {
                    table
                        .column_position(c)
                        .ok_or_else(|| SchemaError::unknown_column(&table.name, c))
                })
                .collect::<SchemaResult<Vec<_>>>()?;
            if columns.is_empty() {
                return Err(SchemaError::invalid_definition(format!(
                    "Index '{}' has no columns",
                    spec.name
                )));
            }
            let hkey_columns: Vec<HKeyColumn> = schema
                .hkey_columns(table.id)?
                .into_iter()
                .filter(|h| h.table_column.map_or(true, |c| !columns.contains(&c)))
                .collect();

            let mut types: Vec<ColumnType> =
                columns.iter().map(|c| table.columns[*c].column_type).collect();
            types.extend(hkey_columns.iter().map(|h| h.column_type));

            let def = IndexDef {
                id: (pos + 1) as IndexId,
                name: spec.name,
                table: table.id,
                columns,
                hkey_columns,
            };
            let row_type = RowType::index(
                format!("{}.{}", table.name, def.name),
                def.table,
                def.id,
                types,
            );
            schema.indexes.push(def);
            schema.index_types.push(row_type);
        }

        Ok(schema)
    }
}
