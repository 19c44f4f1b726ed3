//! Storage adapter contract
//!
//! The execution core treats storage as an ordered-sequence and
//! point/branch lookup provider. Anything that can hand out index rows in
//! key order and group rows in hkey order can back the operators.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::row::{HKey, IndexId, Row, Value};
use crate::schema::GroupSchema;

use super::errors::StorageResult;

/// Ordered sequence of rows
pub trait RowStream: Send {
    /// Returns the next row, or `None` at the end
    fn advance(&mut self) -> StorageResult<Option<Row>>;
}

/// Ordered index rows that can be repositioned
///
/// The direction is fixed when the stream is created. Seeks compare only
/// the leading `key.len()` columns of each row.
pub trait IndexStream: RowStream {
    /// Repositions the stream.
    ///
    /// Forward: the next row is the first whose prefix is >= `key`
    /// (> when not inclusive). Reverse: the next row is the last whose
    /// prefix is <= `key` (< when not inclusive).
    fn seek(&mut self, key: &[Value], inclusive: bool);

    /// True if the stream runs from high keys to low keys
    fn is_reverse(&self) -> bool;
}

/// Storage for one group
pub trait GroupStore: Send + Sync {
    /// Schema of the stored group
    fn schema(&self) -> &Arc<GroupSchema>;

    /// Index rows in key order, or reverse key order
    fn index_stream(&self, index: IndexId, reverse: bool) -> StorageResult<Box<dyn IndexStream>>;

    /// Every group row in hkey order
    fn group_stream(&self) -> StorageResult<Box<dyn RowStream>>;

    /// The row stored at exactly this hkey
    fn row_at(&self, hkey: &HKey) -> StorageResult<Option<Row>>;

    /// The row at this hkey (if any) and all its descendants, in hkey order
    fn branch(&self, hkey: &HKey) -> StorageResult<Box<dyn RowStream>>;
}

/// Compares the leading `key.len()` values of a row against a key prefix
pub fn compare_prefix(values: &[Value], key: &[Value]) -> Ordering {
    for (value, bound) in values.iter().zip(key) {
        match value.cmp(bound) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    if values.len() < key.len() {
        Ordering::Less
    } else {
        Ordering::Equal
    }
}

/// A stream over an in-memory sorted snapshot
pub struct SortedRowStream {
    rows: Arc<Vec<Row>>,
    reverse: bool,
    // forward: index of next row; reverse: one past the next row
    position: usize,
}

impl SortedRowStream {
    /// Creates a stream positioned at its first row in the given direction
    pub fn new(rows: Arc<Vec<Row>>, reverse: bool) -> Self {
        let position = if reverse { rows.len() } else { 0 };
        Self {
            rows,
            reverse,
            position,
        }
    }
}

impl RowStream for SortedRowStream {
    fn advance(&mut self) -> StorageResult<Option<Row>> {
        if self.reverse {
            if self.position == 0 {
                return Ok(None);
            }
            self.position -= 1;
            Ok(Some(self.rows[self.position].clone()))
        } else {
            let row = self.rows.get(self.position).cloned();
            if row.is_some() {
                self.position += 1;
            }
            Ok(row)
        }
    }
}

impl IndexStream for SortedRowStream {
    fn seek(&mut self, key: &[Value], inclusive: bool) {
        self.position = match (self.reverse, inclusive) {
            (false, true) => self
                .rows
                .partition_point(|r| compare_prefix(r.values(), key) == Ordering::Less),
            (false, false) => self
                .rows
                .partition_point(|r| compare_prefix(r.values(), key) != Ordering::Greater),
            (true, true) => self
                .rows
                .partition_point(|r| compare_prefix(r.values(), key) != Ordering::Greater),
            (true, false) => self
                .rows
                .partition_point(|r| compare_prefix(r.values(), key) == Ordering::Less),
        };
    }

    fn is_reverse(&self) -> bool {
        self.reverse
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{ColumnType, RowType};

    fn rows(keys: &[(i32, i32)]) -> Arc<Vec<Row>> {
        let row_type = RowType::values(vec![ColumnType::Int, ColumnType::Int]);
        Arc::new(
            keys.iter()
                .map(|(a, b)| Row::new(Arc::clone(&row_type), vec![Value::Int(*a), Value::Int(*b)]))
                .collect(),
        )
    }

    fn drain(stream: &mut dyn IndexStream) -> Vec<(i32, i32)> {
        let mut out = Vec::new();
        while let Some(row) = stream.advance().unwrap() {
            match (row.value(0), row.value(1)) {
                (Some(Value::Int(a)), Some(Value::Int(b))) => out.push((*a, *b)),
                _ => unreachable!(),
            }
        }
        out
    }

    #[test]
    fn test_forward_seek() {
        let data = rows(&[(1, 1), (2, 1), (2, 2), (3, 1)]);
        let mut stream = SortedRowStream::new(Arc::clone(&data), false);
        stream.seek(&[Value::Int(2)], true);
        assert_eq!(drain(&mut stream), vec![(2, 1), (2, 2), (3, 1)]);

        stream.seek(&[Value::Int(2)], false);
        assert_eq!(drain(&mut stream), vec![(3, 1)]);
    }

    #[test]
    fn test_reverse_seek() {
        let data = rows(&[(1, 1), (2, 1), (2, 2), (3, 1)]);
        let mut stream = SortedRowStream::new(Arc::clone(&data), true);
        stream.seek(&[Value::Int(2)], true);
        assert_eq!(drain(&mut stream), vec![(2, 2), (2, 1), (1, 1)]);

        stream.seek(&[Value::Int(2)], false);
        assert_eq!(drain(&mut stream), vec![(1, 1)]);
    }

    #[test]
    fn test_compare_prefix() {
        let values = [Value::Int(1), Value::Int(5)];
        assert_eq!(compare_prefix(&values, &[Value::Int(1)]), Ordering::Equal);
        assert_eq!(compare_prefix(&values, &[Value::Int(2)]), Ordering::Less);
        assert_eq!(compare_prefix(&values, &[]), Ordering::Equal);
    }
}
