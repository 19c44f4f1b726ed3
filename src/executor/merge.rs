//! Merge keys shared by the ordered set operators
//!
//! Both inputs of an ordered set operator are sorted on their trailing
//! ordering fields (for index rows, typically the appended hkey columns).
//! A `MergeKey` says how many trailing fields each side compares, their
//! directions, and optional cross-type comparators.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::row::{Collation, Row, RowType, Value};

use super::context::Bindings;
use super::cursor::{BoxedCursor, OperatorRef};
use super::errors::{ExecError, ExecResult};

/// Compares values of two column types that differ but are comparable
pub trait TypeComparator: Send + Sync + fmt::Debug {
    /// Compares a left-side value with a right-side value
    fn compare(&self, left: &Value, right: &Value) -> Ordering;

    /// True if this comparison agrees with index order, so a jump to a
    /// value found on one side lands correctly on the other
    fn order_compatible(&self) -> bool {
        true
    }
}

/// Shared comparator handle
pub type ComparatorRef = Arc<dyn TypeComparator>;

/// Narrow, wide and floating numbers compared by numeric value
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericComparator;

impl TypeComparator for NumericComparator {
    fn compare(&self, left: &Value, right: &Value) -> Ordering {
        left.cmp(right)
    }
}

/// Strings compared under a collation
#[derive(Debug, Clone, Copy)]
pub struct CollatingComparator(pub Collation);

impl TypeComparator for CollatingComparator {
    fn compare(&self, left: &Value, right: &Value) -> Ordering {
        left.compare_collated(right, Some(self.0))
    }

    fn order_compatible(&self) -> bool {
        self.0 == Collation::Binary
    }
}

/// Trailing-field comparison between a left and a right input
#[derive(Debug, Clone)]
pub struct MergeKey {
    left_start: usize,
    right_start: usize,
    ascending: Vec<bool>,
    comparators: Vec<Option<ComparatorRef>>,
}

impl MergeKey {
    /// Validates field counts, directions and column types.
    ///
    /// `comparators` is either empty or holds one optional comparator per
    /// compared field; a field without one needs equal column types.
    pub fn new(
        left: &RowType,
        right: &RowType,
        left_fields: usize,
        right_fields: usize,
        ascending: Vec<bool>,
        comparators: Vec<Option<ComparatorRef>>,
    ) -> ExecResult<Self> {
        if left_fields == 0 {
            return Err(ExecError::argument("ordering field count must be positive"));
        }
        if left_fields != right_fields {
            return Err(ExecError::argument(format!(
                "left compares {} ordering fields, right compares {}",
                left_fields, right_fields
            )));
        }
        if left_fields > left.column_count() || right_fields > right.column_count() {
            return Err(ExecError::argument(format!(
                "{} ordering fields exceed {} or {}",
                left_fields, left, right
            )));
        }
        if ascending.len() != left_fields {
            return Err(ExecError::argument(format!(
                "{} directions given for {} ordering fields",
                ascending.len(),
                left_fields
            )));
        }
        let comparators = if comparators.is_empty() {
            vec![None; left_fields]
        } else if comparators.len() == left_fields {
            comparators
        } else {
            return Err(ExecError::argument(format!(
                "{} comparators given for {} ordering fields",
                comparators.len(),
                left_fields
            )));
        };

        let left_start = left.column_count() - left_fields;
        let right_start = right.column_count() - right_fields;
        for (i, comparator) in comparators.iter().enumerate() {
            let l = left.columns()[left_start + i];
            let r = right.columns()[right_start + i];
            if comparator.is_none() && l != r {
                return Err(ExecError::shape(format!(
                    "ordering field {} is {} on the left and {} on the right",
                    i, l, r
                )));
            }
        }

        Ok(Self {
            left_start,
            right_start,
            ascending,
            comparators,
        })
    }

    /// Number of compared fields
    pub fn len(&self) -> usize {
        self.ascending.len()
    }

    /// Always false once validated
    pub fn is_empty(&self) -> bool {
        self.ascending.is_empty()
    }

    /// Compared fields of a left row
    pub fn left_key<'r>(&self, row: &'r Row) -> &'r [Value] {
        &row.values()[self.left_start.min(row.values().len())..]
    }

    /// Compared fields of a right row
    pub fn right_key<'r>(&self, row: &'r Row) -> &'r [Value] {
        &row.values()[self.right_start.min(row.values().len())..]
    }

    /// Leading fields of a right row not compared by the key
    pub fn right_prefix<'r>(&self, row: &'r Row) -> &'r [Value] {
        &row.values()[..self.right_start.min(row.values().len())]
    }

    /// Leading fields of a left row not compared by the key
    pub fn left_prefix<'r>(&self, row: &'r Row) -> &'r [Value] {
        &row.values()[..self.left_start.min(row.values().len())]
    }

    /// Compares extracted keys in merge order
    pub fn compare_keys(&self, left: &[Value], right: &[Value]) -> Ordering {
        for (i, (l, r)) in left.iter().zip(right).enumerate() {
            let ord = match &self.comparators[i] {
                Some(comparator) => comparator.compare(l, r),
                None => l.cmp(r),
            };
            let ord = if self.ascending[i] { ord } else { ord.reverse() };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Compares a left row with a right row
    pub fn compare(&self, left: &Row, right: &Row) -> Ordering {
        self.compare_keys(self.left_key(left), self.right_key(right))
    }

    /// True if every field compares in index order
    pub fn order_compatible(&self) -> bool {
        self.comparators
            .iter()
            .all(|c| c.as_ref().map_or(true, |c| c.order_compatible()))
    }
}

/// Row type of a set operator input, which must be uniform
pub(crate) fn input_type(input: &OperatorRef, side: &str) -> ExecResult<Arc<RowType>> {
    input.row_type().cloned().ok_or_else(|| {
        ExecError::argument(format!(
            "{} input {} produces rows of several types",
            side,
            input.name()
        ))
    })
}

/// A child cursor and the row it is positioned on
pub(crate) struct MergeInput {
    pub(crate) cursor: BoxedCursor,
    pub(crate) current: Option<Row>,
}

impl MergeInput {
    pub(crate) fn new(cursor: BoxedCursor) -> Self {
        Self {
            cursor,
            current: None,
        }
    }

    pub(crate) fn open(&mut self, bindings: &Bindings, top_level: bool) -> ExecResult<()> {
        self.current = None;
        if top_level {
            self.cursor.open_top_level(bindings)
        } else {
            self.cursor.open(bindings)
        }
    }

    /// Pulls the next row into `current`
    pub(crate) fn advance(&mut self) -> ExecResult<()> {
        self.current = self.cursor.next()?;
        Ok(())
    }

    /// Takes the current row and pulls the next one
    pub(crate) fn take(&mut self) -> ExecResult<Option<Row>> {
        let row = self.current.take();
        self.advance()?;
        Ok(row)
    }

    pub(crate) fn close(&mut self, top_level: bool) {
        self.current = None;
        if top_level {
            self.cursor.close_top_level();
        } else {
            self.cursor.close();
        }
    }
}

/// Opens both inputs, closing the left again if the right fails
pub(crate) fn open_pair(
    left: &mut MergeInput,
    right: &mut MergeInput,
    bindings: &Bindings,
    top_level: bool,
) -> ExecResult<()> {
    left.open(bindings, top_level)?;
    if let Err(e) = right.open(bindings, top_level) {
        left.close(top_level);
        return Err(e);
    }
    Ok(())
}
