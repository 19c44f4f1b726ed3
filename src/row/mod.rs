//! Row data model
//!
//! Rows are immutable typed tuples tagged with a `RowType`. Rows that live
//! in a group also carry their `HKey`, the hierarchical key that orders the
//! group and drives ancestor and branch lookups.

mod hkey;
mod row;
mod row_type;
mod value;

pub use hkey::{HKey, HKeySegment};
pub use row::Row;
pub use row_type::{IndexId, RowType, RowTypeKind, TableId};
pub use value::{Collation, ColumnType, Value};
