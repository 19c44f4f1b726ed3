//! Orderings: lists of (expression, direction, collation)

use std::cmp::Ordering as CmpOrdering;
use std::fmt;

use crate::row::{Collation, Row, Value};

use super::context::Bindings;
use super::errors::ExecResult;
use super::expression::{field, ExprRef};

/// One ordering column
#[derive(Debug, Clone)]
pub struct OrderingColumn {
    /// Sort key expression
    pub expr: ExprRef,
    /// Ascending when true
    pub ascending: bool,
    /// String collation; `None` compares values natively
    pub collation: Option<Collation>,
}

/// Ordered list of sort keys
#[derive(Debug, Clone, Default)]
pub struct RowOrdering {
    columns: Vec<OrderingColumn>,
}

impl RowOrdering {
    /// Empty ordering
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordering over the leading index columns with the given directions
    pub fn index_columns(ascending: &[bool]) -> Self {
        ascending
            .iter()
            .enumerate()
            .fold(Self::new(), |ordering, (i, asc)| ordering.append(field(i), *asc))
    }

    /// Appends a column
    pub fn append(mut self, expr: ExprRef, ascending: bool) -> Self {
        self.columns.push(OrderingColumn {
            expr,
            ascending,
            collation: None,
        });
        self
    }

    /// Appends an ascending column
    pub fn asc(self, expr: ExprRef) -> Self {
        self.append(expr, true)
    }

    /// Appends a descending column
    pub fn desc(self, expr: ExprRef) -> Self {
        self.append(expr, false)
    }

    /// Appends a column compared under a collation
    pub fn collated(mut self, expr: ExprRef, ascending: bool, collation: Collation) -> Self {
        self.columns.push(OrderingColumn {
            expr,
            ascending,
            collation: Some(collation),
        });
        self
    }

    /// Columns in order
    pub fn columns(&self) -> &[OrderingColumn] {
        &self.columns
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True if there are no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Evaluates the sort key of a row
    pub fn key(&self, row: &Row, bindings: &Bindings) -> ExecResult<Vec<Value>> {
        self.columns
            .iter()
            .map(|c| c.expr.evaluate(Some(row), bindings))
            .collect()
    }

    /// Compares two evaluated keys under directions and collations
    pub fn compare_keys(&self, left: &[Value], right: &[Value]) -> CmpOrdering {
        for ((column, l), r) in self.columns.iter().zip(left).zip(right) {
            let ord = l.compare_collated(r, column.collation);
            let ord = if column.ascending { ord } else { ord.reverse() };
            if ord != CmpOrdering::Equal {
                return ord;
            }
        }
        CmpOrdering::Equal
    }
}

impl fmt::Display for RowOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, c) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?} {}", c.expr, if c.ascending { "ASC" } else { "DESC" })?;
        }
        write!(f, "]")
    }
}
