//! Index key ranges
//!
//! A range is a pair of optional prefix bounds over the index columns in
//! index order. A `lo` prefix P admits keys whose leading |P| columns are
//! >= P (> when exclusive); `hi` is symmetric. Bound values are expressions
//! so a nested scan can bind them to an outer row.
//!
//! Null is the lowest value, so most null bounds fall out of the ordinary
//! comparison: `lo = (.., null)` inclusive admits everything at that column,
//! exclusive admits only non-null values, and `lo = hi = (.., null)` is an
//! IS NULL match. What has no sensible meaning is rejected when the range
//! is evaluated:
//!
//! - a null in `hi` at a column where `lo` is not also null (`<= null`)
//! - a null in `lo` before its last column where `hi` is not also null

use std::cmp::Ordering;

use crate::row::{Row, Value};
use crate::storage::compare_prefix;

use super::context::Bindings;
use super::errors::{ExecError, ExecResult};
use super::expression::{literal, ExprRef};

/// Prefix of index column values
#[derive(Debug, Clone)]
pub struct IndexBound {
    values: Vec<ExprRef>,
}

impl IndexBound {
    /// Bound from expressions, one per leading index column
    pub fn new(values: Vec<ExprRef>) -> Self {
        Self { values }
    }

    /// Bound from constant values
    pub fn of(values: Vec<Value>) -> Self {
        Self::new(values.into_iter().map(literal).collect())
    }

    /// Number of bound leading columns
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if no column is bound
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn evaluate(&self, bindings: &Bindings) -> ExecResult<Vec<Value>> {
        self.values.iter().map(|e| e.evaluate(None, bindings)).collect()
    }
}

/// Optional lower and upper prefix bounds
#[derive(Debug, Clone, Default)]
pub struct IndexKeyRange {
    lo: Option<IndexBound>,
    lo_inclusive: bool,
    hi: Option<IndexBound>,
    hi_inclusive: bool,
}

impl IndexKeyRange {
    /// Every row of the index
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Both bounds
    pub fn bounded(lo: IndexBound, lo_inclusive: bool, hi: IndexBound, hi_inclusive: bool) -> Self {
        Self {
            lo: Some(lo),
            lo_inclusive,
            hi: Some(hi),
            hi_inclusive,
        }
    }

    /// Lower bound only
    pub fn starting_at(lo: IndexBound, inclusive: bool) -> Self {
        Self {
            lo: Some(lo),
            lo_inclusive: inclusive,
            ..Self::default()
        }
    }

    /// Upper bound only
    pub fn ending_at(hi: IndexBound, inclusive: bool) -> Self {
        Self {
            hi: Some(hi),
            hi_inclusive: inclusive,
            ..Self::default()
        }
    }

    /// Rows whose prefix equals the bound
    pub fn exact(bound: IndexBound) -> Self {
        Self::bounded(bound.clone(), true, bound, true)
    }

    /// Widest bound, for validation against an index's width
    pub fn max_bound_len(&self) -> usize {
        let lo = self.lo.as_ref().map_or(0, IndexBound::len);
        let hi = self.hi.as_ref().map_or(0, IndexBound::len);
        lo.max(hi)
    }

    /// Evaluates the bound expressions and checks the null rules
    pub fn evaluate(&self, bindings: &Bindings) -> ExecResult<ResolvedRange> {
        let lo = self.lo.as_ref().map(|b| b.evaluate(bindings)).transpose()?;
        let hi = self.hi.as_ref().map(|b| b.evaluate(bindings)).transpose()?;

        let empty = Vec::new();
        let lo_values = lo.as_ref().unwrap_or(&empty);
        let hi_values = hi.as_ref().unwrap_or(&empty);
        let null_at = |values: &Vec<Value>, i: usize| values.get(i).map_or(false, Value::is_null);

        for (i, value) in hi_values.iter().enumerate() {
            if value.is_null() && !null_at(lo_values, i) {
                return Err(ExecError::IllegalNullBound(format!(
                    "upper bound column {} is null without a matching null lower bound",
                    i
                )));
            }
        }
        for (i, value) in lo_values.iter().enumerate() {
            let last = i + 1 == lo_values.len();
            if value.is_null() && !last && !null_at(hi_values, i) {
                return Err(ExecError::IllegalNullBound(format!(
                    "lower bound column {} is null but not the last bound column",
                    i
                )));
            }
        }

        Ok(ResolvedRange {
            lo: lo.map(|v| (v, self.lo_inclusive)),
            hi: hi.map(|v| (v, self.hi_inclusive)),
        })
    }
}

/// A range with its bound values computed
#[derive(Debug, Clone, Default)]
pub struct ResolvedRange {
    lo: Option<(Vec<Value>, bool)>,
    hi: Option<(Vec<Value>, bool)>,
}

impl ResolvedRange {
    /// Lower bound values and inclusiveness
    pub fn lo(&self) -> Option<(&[Value], bool)> {
        self.lo.as_ref().map(|(v, inc)| (v.as_slice(), *inc))
    }

    /// Upper bound values and inclusiveness
    pub fn hi(&self) -> Option<(&[Value], bool)> {
        self.hi.as_ref().map(|(v, inc)| (v.as_slice(), *inc))
    }

    /// True if the row is not below the lower bound
    pub fn admits_lo(&self, row: &Row) -> bool {
        match &self.lo {
            None => true,
            Some((bound, inclusive)) => match compare_prefix(row.values(), bound) {
                Ordering::Greater => true,
                Ordering::Equal => *inclusive,
                Ordering::Less => false,
            },
        }
    }

    /// True if the row is not above the upper bound
    pub fn admits_hi(&self, row: &Row) -> bool {
        match &self.hi {
            None => true,
            Some((bound, inclusive)) => match compare_prefix(row.values(), bound) {
                Ordering::Less => true,
                Ordering::Equal => *inclusive,
                Ordering::Greater => false,
            },
        }
    }

    /// True if the row lies inside both bounds
    pub fn admits(&self, row: &Row) -> bool {
        self.admits_lo(row) && self.admits_hi(row)
    }
}
