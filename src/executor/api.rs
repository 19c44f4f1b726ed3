//! Operator factories
//!
//! The planner-facing surface: every function validates its arguments and
//! returns a shared plan node. Plans are immutable; create cursors with
//! `Operator::cursor` and run them with `QueryExecutor`.
//!
//! ```ignore
//! let scan = api::index_scan_default(index_type, false, IndexKeyRange::unbounded())?;
//! let lookup = api::ancestor_lookup_nested(&schema, index_type, &[a, r], InputPreservation::DiscardInput, 0, 1)?;
//! let plan = api::map_nested_loops(scan, lookup, 0, false, 1)?;
//! ```

use std::sync::Arc;

use crate::row::{Collation, Row, RowType, TableId};
use crate::schema::GroupSchema;

use super::cursor::OperatorRef;
use super::distinct::DistinctPartial;
use super::errors::ExecResult;
use super::except::ExceptOrdered;
use super::hkey_union::HKeyUnionOrdered;
use super::index_scan::IndexScan;
use super::intersect::{IntersectOptions, IntersectOrdered};
use super::lookup::{InputPreservation, LookupOperator, LookupPlan, LookupSource};
use super::map::MapNestedLoops;
use super::merge::{input_type, ComparatorRef, MergeKey};
use super::ordering::RowOrdering;
use super::range::IndexKeyRange;
use super::scan::{GroupScan, ValuesScan};
use super::sort::{SortOperator, SortOption};
use super::union::UnionOrdered;

/// Scan of an index in one direction
pub fn index_scan_default(
    index_type: Arc<RowType>,
    reverse: bool,
    range: IndexKeyRange,
) -> ExecResult<OperatorRef> {
    Ok(Arc::new(IndexScan::new(index_type, reverse, range)?))
}

/// Scan of an index with per-column directions
pub fn index_scan_ordered(
    index_type: Arc<RowType>,
    range: IndexKeyRange,
    ordering: &RowOrdering,
) -> ExecResult<OperatorRef> {
    Ok(Arc::new(IndexScan::ordered(index_type, range, ordering)?))
}

/// Every group row in hkey order
pub fn group_scan_default() -> ExecResult<OperatorRef> {
    Ok(Arc::new(GroupScan))
}

/// Fixed rows of one type
pub fn values_scan_default(row_type: Arc<RowType>, rows: Vec<Row>) -> ExecResult<OperatorRef> {
    Ok(Arc::new(ValuesScan::new(row_type, rows)?))
}

pub fn ancestor_lookup_default(
    input: OperatorRef,
    schema: &Arc<GroupSchema>,
    input_type: Arc<RowType>,
    ancestors: &[TableId],
    preservation: InputPreservation,
    quantum: usize,
) -> ExecResult<OperatorRef> {
    let plan = LookupPlan {
        ancestors: ancestors.to_vec(),
        branch: None,
    };
    lookup(
        "AncestorLookup",
        LookupSource::Input(input),
        schema,
        input_type,
        plan,
        preservation,
        quantum,
    )
}

pub fn ancestor_lookup_nested(
    schema: &Arc<GroupSchema>,
    input_type: Arc<RowType>,
    ancestors: &[TableId],
    preservation: InputPreservation,
    binding_position: usize,
    quantum: usize,
) -> ExecResult<OperatorRef> {
    let plan = LookupPlan {
        ancestors: ancestors.to_vec(),
        branch: None,
    };
    lookup(
        "AncestorLookupNested",
        LookupSource::Binding(binding_position),
        schema,
        input_type,
        plan,
        preservation,
        quantum,
    )
}

pub fn branch_lookup_default(
    input: OperatorRef,
    schema: &Arc<GroupSchema>,
    input_type: Arc<RowType>,
    output_table: TableId,
    preservation: InputPreservation,
    quantum: usize,
) -> ExecResult<OperatorRef> {
    let plan = LookupPlan {
        ancestors: Vec::new(),
        branch: Some(output_table),
    };
    lookup(
        "BranchLookup",
        LookupSource::Input(input),
        schema,
        input_type,
        plan,
        preservation,
        quantum,
    )
}

pub fn branch_lookup_nested(
    schema: &Arc<GroupSchema>,
    input_type: Arc<RowType>,
    output_table: TableId,
    preservation: InputPreservation,
    binding_position: usize,
    quantum: usize,
) -> ExecResult<OperatorRef> {
    let plan = LookupPlan {
        ancestors: Vec::new(),
        branch: Some(output_table),
    };
    lookup(
        "BranchLookupNested",
        LookupSource::Binding(binding_position),
        schema,
        input_type,
        plan,
        preservation,
        quantum,
    )
}

/// Ancestors plus an optional branch, per input row
pub fn group_lookup_default(
    input: OperatorRef,
    schema: &Arc<GroupSchema>,
    input_type: Arc<RowType>,
    ancestors: &[TableId],
    branch_output: Option<TableId>,
    preservation: InputPreservation,
    quantum: usize,
) -> ExecResult<OperatorRef> {
    let plan = LookupPlan {
        ancestors: ancestors.to_vec(),
        branch: branch_output,
    };
    lookup(
        "GroupLookup",
        LookupSource::Input(input),
        schema,
        input_type,
        plan,
        preservation,
        quantum,
    )
}

fn lookup(
    name: &'static str,
    source: LookupSource,
    schema: &Arc<GroupSchema>,
    input_type: Arc<RowType>,
    plan: LookupPlan,
    preservation: InputPreservation,
    quantum: usize,
) -> ExecResult<OperatorRef> {
    Ok(Arc::new(LookupOperator::new(
        name,
        source,
        Arc::clone(schema),
        input_type,
        plan,
        preservation,
        quantum,
    )?))
}

/// Merge of two inputs ordered on their trailing `ordering_fields`
pub fn union_ordered(
    left: OperatorRef,
    right: OperatorRef,
    left_ordering_fields: usize,
    right_ordering_fields: usize,
    ascending: Vec<bool>,
    preserve_duplicates: bool,
) -> ExecResult<OperatorRef> {
    let key = merge_key(&left, &right, left_ordering_fields, right_ordering_fields, ascending, Vec::new())?;
    Ok(Arc::new(UnionOrdered::new(left, right, key, preserve_duplicates)?))
}

/// Inner intersection on the trailing ordering fields.
///
/// `comparators` is empty, or one optional comparator per compared field
/// for columns whose types differ between the inputs.
#[allow(clippy::too_many_arguments)]
pub fn intersect_ordered(
    left: OperatorRef,
    right: OperatorRef,
    left_ordering_fields: usize,
    right_ordering_fields: usize,
    ascending: Vec<bool>,
    comparators: Vec<Option<ComparatorRef>>,
    options: IntersectOptions,
) -> ExecResult<OperatorRef> {
    let key = merge_key(&left, &right, left_ordering_fields, right_ordering_fields, ascending, comparators)?;
    Ok(Arc::new(IntersectOrdered::new(left, right, key, options)?))
}

/// Left rows whose trailing ordering fields the right input lacks
pub fn except_ordered(
    left: OperatorRef,
    right: OperatorRef,
    left_ordering_fields: usize,
    right_ordering_fields: usize,
    ascending: Vec<bool>,
    remove_duplicates: bool,
) -> ExecResult<OperatorRef> {
    let key = merge_key(&left, &right, left_ordering_fields, right_ordering_fields, ascending, Vec::new())?;
    Ok(Arc::new(ExceptOrdered::new(left, right, key, remove_duplicates)?))
}

/// Distinct hkeys of `output_table` referenced by either input
pub fn hkey_union_ordered(
    left: OperatorRef,
    right: OperatorRef,
    schema: &Arc<GroupSchema>,
    output_table: TableId,
) -> ExecResult<OperatorRef> {
    Ok(Arc::new(HKeyUnionOrdered::new(left, right, Arc::clone(schema), output_table)?))
}

pub fn map_nested_loops(
    outer: OperatorRef,
    inner: OperatorRef,
    binding_position: usize,
    pipelined: bool,
    quantum: usize,
) -> ExecResult<OperatorRef> {
    Ok(Arc::new(MapNestedLoops::new(outer, inner, binding_position, pipelined, quantum)?))
}

pub fn sort_general(input: OperatorRef, ordering: RowOrdering, option: SortOption) -> ExecResult<OperatorRef> {
    Ok(Arc::new(SortOperator::general(input, ordering, option)?))
}

pub fn sort_insertion_limited(
    input: OperatorRef,
    ordering: RowOrdering,
    option: SortOption,
    limit: usize,
) -> ExecResult<OperatorRef> {
    Ok(Arc::new(SortOperator::insertion_limited(input, ordering, option, limit)?))
}

pub fn distinct_partial(input: OperatorRef, collations: Vec<Option<Collation>>) -> ExecResult<OperatorRef> {
    Ok(Arc::new(DistinctPartial::new(input, collations)?))
}

fn merge_key(
    left: &OperatorRef,
    right: &OperatorRef,
    left_fields: usize,
    right_fields: usize,
    ascending: Vec<bool>,
    comparators: Vec<Option<ComparatorRef>>,
) -> ExecResult<MergeKey> {
    let left_type = input_type(left, "left")?;
    let right_type = input_type(right, "right")?;
    MergeKey::new(&left_type, &right_type, left_fields, right_fields, ascending, comparators)
}

