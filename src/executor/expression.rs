//! Scalar expression seam
//!
//! The executor never interprets expressions itself. Index bounds, sort
//! keys and orderings hold `ExprRef`s and call `evaluate` with the current
//! row and bindings. The three expressions below cover what the operators
//! need; a planner can plug in its own evaluator through the trait.

use std::fmt;
use std::sync::Arc;

use crate::row::{Row, Value};

use super::context::Bindings;
use super::errors::{ExecError, ExecResult};

/// Opaque scalar expression
pub trait Expression: Send + Sync + fmt::Debug {
    /// Evaluates against an optional current row and the outer bindings
    fn evaluate(&self, row: Option<&Row>, bindings: &Bindings) -> ExecResult<Value>;

    /// Column position if this expression reads a field of the current row
    fn field_position(&self) -> Option<usize> {
        None
    }
}

/// Shared expression handle
pub type ExprRef = Arc<dyn Expression>;

/// Constant value
#[derive(Debug, Clone)]
pub struct Literal(pub Value);

impl Expression for Literal {
    fn evaluate(&self, _row: Option<&Row>, _bindings: &Bindings) -> ExecResult<Value> {
        Ok(self.0.clone())
    }
}

/// Field of the current row
#[derive(Debug, Clone, Copy)]
pub struct FieldExpr(pub usize);

impl Expression for FieldExpr {
    fn evaluate(&self, row: Option<&Row>, _bindings: &Bindings) -> ExecResult<Value> {
        let row = row.ok_or_else(|| ExecError::illegal_state("field expression needs a row"))?;
        row.value(self.0).cloned().ok_or_else(|| {
            ExecError::argument(format!("field {} out of range for {}", self.0, row.row_type()))
        })
    }

    fn field_position(&self) -> Option<usize> {
        Some(self.0)
    }
}

/// Field of a row bound by an enclosing nested-loop map
#[derive(Debug, Clone, Copy)]
pub struct BoundFieldExpr {
    /// Binding position
    pub position: usize,
    /// Field of the bound row
    pub field: usize,
}

impl Expression for BoundFieldExpr {
    fn evaluate(&self, _row: Option<&Row>, bindings: &Bindings) -> ExecResult<Value> {
        let row = bindings.require(self.position)?;
        row.value(self.field).cloned().ok_or_else(|| {
            ExecError::argument(format!(
                "bound field {} out of range for {}",
                self.field,
                row.row_type()
            ))
        })
    }
}

/// Constant expression
pub fn literal(value: impl Into<Value>) -> ExprRef {
    Arc::new(Literal(value.into()))
}

/// Field of the current row
pub fn field(position: usize) -> ExprRef {
    Arc::new(FieldExpr(position))
}

/// Field of a bound outer row
pub fn bound_field(position: usize, field: usize) -> ExprRef {
    Arc::new(BoundFieldExpr { position, field })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{ColumnType, RowType};

    #[test]
    fn test_field_and_literal() {
        let row = Row::new(
            RowType::values(vec![ColumnType::Int, ColumnType::Varchar]),
            vec![Value::Int(4), Value::varchar("x")],
        );
        let bindings = Bindings::new();
        assert_eq!(field(1).evaluate(Some(&row), &bindings).unwrap(), Value::varchar("x"));
        assert_eq!(literal(7).evaluate(None, &bindings).unwrap(), Value::Int(7));
        assert!(field(5).evaluate(Some(&row), &bindings).is_err());
        assert!(field(0).evaluate(None, &bindings).is_err());
        assert_eq!(field(3).field_position(), Some(3));
    }

    #[test]
    fn test_bound_field() {
        let row = Row::new(RowType::values(vec![ColumnType::Int]), vec![Value::Int(9)]);
        let bindings = Bindings::new().with(1, row);
        assert_eq!(bound_field(1, 0).evaluate(None, &bindings).unwrap(), Value::Int(9));
        assert!(bound_field(0, 0).evaluate(None, &bindings).is_err());
    }
}
