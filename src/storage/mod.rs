//! Storage adapter subsystem
//!
//! The execution core does not own storage. It pulls index rows in key
//! order and group rows in hkey order through the `GroupStore` trait, and
//! positions index streams with `seek`. `MemoryGroupStore` is the
//! reference backend used by the CLI and the tests.
//!
//! # Invariants
//!
//! - Index streams yield rows sorted by their full value tuple
//! - Group streams and branches yield rows in hkey order
//! - A child row is only stored under an existing parent

mod adapter;
mod errors;
mod memory;

pub use adapter::{compare_prefix, GroupStore, IndexStream, RowStream, SortedRowStream};
pub use errors::{StorageError, StorageErrorCode, StorageResult};
pub use memory::MemoryGroupStore;
