//! In-memory group storage
//!
//! Group rows live in a BTreeMap keyed by hkey, so a range over the map is
//! a group scan and a prefix range is a branch. Each index keeps a sorted
//! vector of index rows; streams share the vector through an `Arc` and see
//! a stable snapshot even if rows are inserted while they are open.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::row::{HKey, HKeySegment, IndexId, Row, TableId, Value};
use crate::schema::{GroupFixture, GroupSchema};

use super::adapter::{GroupStore, IndexStream, RowStream, SortedRowStream};
use super::errors::{StorageError, StorageResult};

/// Reference `GroupStore` backed by ordered in-memory maps
#[derive(Debug)]
pub struct MemoryGroupStore {
    schema: Arc<GroupSchema>,
    rows: BTreeMap<HKey, Row>,
    /// (table, primary key) -> hkey, used to resolve parent references
    keys: BTreeMap<(TableId, Vec<Value>), HKey>,
    /// Sorted index rows, positioned by index id - 1
    indexes: Vec<Arc<Vec<Row>>>,
}

impl MemoryGroupStore {
    /// Creates an empty store for a schema
    pub fn new(schema: Arc<GroupSchema>) -> Self {
        let indexes = schema.indexes().iter().map(|_| Arc::new(Vec::new())).collect();
        Self {
            schema,
            rows: BTreeMap::new(),
            keys: BTreeMap::new(),
            indexes,
        }
    }

    /// Builds a store holding a fixture's schema and rows
    pub fn from_fixture(fixture: &GroupFixture) -> StorageResult<Self> {
        let schema = Arc::new(fixture.schema()?);
        let rows = fixture.typed_rows(&schema)?;
        let mut store = Self::new(schema);
        for (table, values) in rows {
            store.insert(table, values)?;
        }
        Ok(store)
    }

    /// Number of stored group rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if no rows are stored
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Inserts a table row, computing its hkey and index entries.
    ///
    /// The parent row must already be stored.
    pub fn insert(&mut self, table: TableId, values: Vec<Value>) -> StorageResult<Row> {
        self.schema.validate_row(table, &values)?;
        let def = self.schema.table(table)?;

        let pk: Vec<Value> = def.primary_key.iter().map(|p| values[*p].clone()).collect();
        let own = HKeySegment::new(table, pk.clone());
        let hkey = match def.parent {
            None => HKey::new(vec![own]),
            Some(parent) => {
                let parent_pk: Vec<Value> =
                    def.parent_join.iter().map(|j| values[*j].clone()).collect();
                let parent_hkey = self.keys.get(&(parent, parent_pk)).ok_or_else(|| {
                    let parent_name = self
                        .schema
                        .table(parent)
                        .map(|p| p.name.clone())
                        .unwrap_or_default();
                    StorageError::orphan_row(&def.name, &parent_name)
                })?;
                parent_hkey.child(own)
            }
        };

        if self.rows.contains_key(&hkey) || self.keys.contains_key(&(table, pk.clone())) {
            return Err(StorageError::duplicate_key(&hkey));
        }

        let row = Row::with_hkey(self.schema.table_row_type(table)?, values, hkey.clone());

        for (pos, index) in self.schema.indexes().iter().enumerate() {
            if index.table != table {
                continue;
            }
            let mut index_values: Vec<Value> =
                index.columns.iter().map(|c| row.values()[*c].clone()).collect();
            index_values.extend(
                index
                    .hkey_columns
                    .iter()
                    .map(|h| hkey.segments()[h.level].values[h.position].clone()),
            );
            let index_row = Row::with_hkey(
                self.schema.index_row_type(index.id)?,
                index_values,
                hkey.clone(),
            );
            let entries = Arc::make_mut(&mut self.indexes[pos]);
            let at = entries.partition_point(|r| r.values() < index_row.values());
            entries.insert(at, index_row);
        }

        self.keys.insert((table, pk), hkey.clone());
        self.rows.insert(hkey, row.clone());
        Ok(row)
    }

    fn index_rows(&self, index: IndexId) -> StorageResult<&Arc<Vec<Row>>> {
        self.schema.index(index)?;
        Ok(&self.indexes[(index - 1) as usize])
    }
}

impl GroupStore for MemoryGroupStore {
    fn schema(&self) -> &Arc<GroupSchema> {
        &self.schema
    }

    fn index_stream(&self, index: IndexId, reverse: bool) -> StorageResult<Box<dyn IndexStream>> {
        let rows = Arc::clone(self.index_rows(index)?);
        Ok(Box::new(SortedRowStream::new(rows, reverse)))
    }

    fn group_stream(&self) -> StorageResult<Box<dyn RowStream>> {
        let rows: Vec<Row> = self.rows.values().cloned().collect();
        Ok(Box::new(SortedRowStream::new(Arc::new(rows), false)))
    }

    fn row_at(&self, hkey: &HKey) -> StorageResult<Option<Row>> {
        Ok(self.rows.get(hkey).cloned())
    }

    fn branch(&self, hkey: &HKey) -> StorageResult<Box<dyn RowStream>> {
        let rows: Vec<Row> = self
            .rows
            .range(hkey.clone()..)
            .take_while(|(key, _)| hkey.is_prefix_of(key))
            .map(|(_, row)| row.clone())
            .collect();
        Ok(Box::new(SortedRowStream::new(Arc::new(rows), false)))
    }
}
