//! Group schema subsystem
//!
//! Describes the tables clustered in one group (root table plus
//! descendants), their hkey layout, and the secondary indexes over them.
//!
//! # Invariants
//!
//! - Exactly one root table, declared first
//! - A child's join columns match its parent's primary key types
//! - Index rows are declared columns followed by the hkey columns not
//!   already declared, so every index row determines its table's hkey

mod errors;
mod group;
mod loader;
mod types;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult};
pub use group::{GroupSchema, GroupSchemaBuilder};
pub use loader::{GroupFixture, IndexFixture, TableFixture};
pub use types::{ColumnDef, HKeyColumn, IndexDef, TableDef};
