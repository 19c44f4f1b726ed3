//! Immutable typed tuples
//!
//! A `Row` is an owned, reference-counted handle: cloning it shares the
//! value buffer instead of copying it. A row handed out by `Cursor::next`
//! therefore stays valid after the next pull; `detach` makes a deep copy
//! when a caller wants storage that shares nothing with the producer.

use std::fmt;
use std::sync::Arc;

use super::hkey::HKey;
use super::row_type::RowType;
use super::value::Value;

/// Immutable row tagged with its row type
#[derive(Debug, Clone)]
pub struct Row {
    row_type: Arc<RowType>,
    values: Arc<[Value]>,
    hkey: Option<Arc<HKey>>,
}

impl Row {
    /// Creates a row without an hkey
    pub fn new(row_type: Arc<RowType>, values: Vec<Value>) -> Self {
        Self {
            row_type,
            values: values.into(),
            hkey: None,
        }
    }

    /// Creates a row located in a group
    pub fn with_hkey(row_type: Arc<RowType>, values: Vec<Value>, hkey: HKey) -> Self {
        Self {
            row_type,
            values: values.into(),
            hkey: Some(Arc::new(hkey)),
        }
    }

    /// Builds a flattened row from a parent and child row
    pub fn flatten(parent: &Row, child: &Row, row_type: Arc<RowType>) -> Self {
        let mut values = parent.values.to_vec();
        values.extend(child.values.iter().cloned());
        Self {
            row_type,
            values: values.into(),
            hkey: child.hkey.clone(),
        }
    }

    /// The row's type
    pub fn row_type(&self) -> &Arc<RowType> {
        &self.row_type
    }

    /// All values
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value at a column position
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// The row's hkey, if it has one
    pub fn hkey(&self) -> Option<&HKey> {
        self.hkey.as_deref()
    }

    /// Deep copy that shares no buffers with this row
    pub fn detach(&self) -> Row {
        Row {
            row_type: Arc::clone(&self.row_type),
            values: self.values.to_vec().into(),
            hkey: self.hkey.as_ref().map(|h| Arc::new(HKey::clone(h))),
        }
    }

    /// Converts the values to a JSON array
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.values.iter().map(Value::to_json).collect())
    }
}

impl PartialEq for Row {
    /// Rows are equal when their types share a shape and their values match.
    fn eq(&self, other: &Self) -> bool {
        self.row_type.same_shape(&other.row_type) && self.values == other.values
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.row_type.name())?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, ")")
    }
}
