//! Query execution core
//!
//! Plans are trees of immutable `Operator`s built through `api`. Running a
//! plan creates a tree of pull-based cursors; a `next()` on the root walks
//! into child cursors until a row is produced or the subtree is exhausted.
//!
//! # Operators
//!
//! - Scans: index (ranges, mixed directions, jump), group, values
//! - Ordered set operators: union, intersect (with skip-scan), except, hkey union
//! - Hkey lookups: ancestor, branch, group
//! - Nested-loop map, optionally pipelined
//! - Full and insertion-limited sort, partial distinct
//!
//! # Invariants
//!
//! - Execution is single-threaded and synchronous
//! - Every leaf `next()` and every merge step checks for cancellation
//! - A child cursor belongs to exactly one parent and is rebound only
//!   through `open_top_level`/`close_top_level`
//! - Errors are terminal for the query

pub mod api;
mod context;
mod cursor;
mod distinct;
mod errors;
mod except;
mod executor;
mod expression;
mod hkey_union;
mod index_scan;
mod intersect;
mod lookup;
mod map;
mod merge;
mod ordering;
mod range;
mod result;
mod scan;
mod sort;
mod union;

#[cfg(test)]
mod testing;

pub use context::{Bindings, QueryContext};
pub use cursor::{
    drain, BoxedCursor, ColumnSelector, Cursor, CursorLifecycle, CursorState, Operator,
    OperatorRef,
};
pub use distinct::DistinctPartial;
pub use errors::{ExecError, ExecResult};
pub use except::ExceptOrdered;
pub use executor::QueryExecutor;
pub use expression::{bound_field, field, literal, BoundFieldExpr, ExprRef, Expression, FieldExpr, Literal};
pub use hkey_union::HKeyUnionOrdered;
pub use index_scan::IndexScan;
pub use intersect::{IntersectOptions, IntersectOrdered, OutputSide, ScanStrategy};
pub use lookup::{InputPreservation, LookupOperator, LookupPlan, LookupSource};
pub use map::MapNestedLoops;
pub use merge::{CollatingComparator, ComparatorRef, MergeKey, NumericComparator, TypeComparator};
pub use ordering::{OrderingColumn, RowOrdering};
pub use range::{IndexBound, IndexKeyRange, ResolvedRange};
pub use result::ExecutionResult;
pub use scan::{GroupScan, ValuesScan};
pub use sort::{SortOperator, SortOption};
pub use union::UnionOrdered;
