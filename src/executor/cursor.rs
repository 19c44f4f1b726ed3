//! Operator and cursor protocol
//!
//! An `Operator` is an immutable plan node; `Operator::cursor` creates an
//! independent execution of it. Cursors are pull-based:
//!
//! 1. **Closed**: initial state, and the state after `close()`
//! 2. **Active**: after `open()`; `next()` produces rows
//! 3. **Exhausted**: `next()` returned `None`; further calls keep returning `None`
//!
//! `open()` on a cursor that is not closed fails, as does `next()` on a
//! closed cursor. `close()` is idempotent.
//!
//! The top-level forms `open_top_level`/`close_top_level` rebind a cursor to
//! a new set of outer bindings. Parents use them whenever they rebind a
//! child; for most operators they are the same as `open`/`close`, but a
//! pipelined nested-loop map only accepts a second open through them.

use std::fmt;
use std::sync::Arc;

use crate::observability::Counter;
use crate::row::{Row, RowType};

use super::context::{Bindings, QueryContext};
use super::errors::{ExecError, ExecResult};

/// Cursor lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Not open
    Closed,
    /// Open and producing rows
    Active,
    /// Open, no more rows
    Exhausted,
}

impl CursorState {
    /// True unless closed
    pub fn is_open(self) -> bool {
        !matches!(self, CursorState::Closed)
    }
}

/// Leading columns of a row that a jump positions on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSelector {
    leading: usize,
}

impl ColumnSelector {
    /// Selects the first `n` columns
    pub fn leading(n: usize) -> Self {
        Self { leading: n }
    }

    /// Selects every column of a row type
    pub fn all(row_type: &RowType) -> Self {
        Self::leading(row_type.column_count())
    }

    /// Number of selected leading columns
    pub fn count(&self) -> usize {
        self.leading
    }
}

/// Pull-based row producer
pub trait Cursor: Send {
    /// Binds the cursor to outer bindings and starts it
    fn open(&mut self, bindings: &Bindings) -> ExecResult<()>;

    /// Next row, or `None` at the end
    fn next(&mut self) -> ExecResult<Option<Row>>;

    /// Repositions to the first row at or after `target` in this cursor's
    /// ordering, comparing only the selected leading columns
    fn jump(&mut self, _target: &Row, _columns: ColumnSelector) -> ExecResult<()> {
        Err(ExecError::illegal_state(format!(
            "{} does not support jump",
            self.name()
        )))
    }

    /// Releases resources; idempotent
    fn close(&mut self);

    /// Opens as the root of a cursor tree or under a fresh parent binding
    fn open_top_level(&mut self, bindings: &Bindings) -> ExecResult<()> {
        self.open(bindings)
    }

    /// Closes the top-level form
    fn close_top_level(&mut self) {
        self.close();
    }

    /// Current lifecycle state
    fn state(&self) -> CursorState;

    /// True if `jump` is implemented
    fn supports_jump(&self) -> bool {
        false
    }

    /// Operator name for messages
    fn name(&self) -> &'static str;
}

/// Owned cursor
pub type BoxedCursor = Box<dyn Cursor>;

/// Plan node
pub trait Operator: Send + Sync + fmt::Debug {
    /// Creates an independent cursor over this operator
    fn cursor(&self, ctx: &QueryContext) -> ExecResult<BoxedCursor>;

    /// Output row type, or `None` if rows of several types are produced
    fn row_type(&self) -> Option<&Arc<RowType>>;

    /// Operator name
    fn name(&self) -> &'static str;
}

/// Shared plan node
pub type OperatorRef = Arc<dyn Operator>;

/// Lifecycle bookkeeping shared by every cursor implementation
#[derive(Debug)]
pub struct CursorLifecycle {
    name: &'static str,
    state: CursorState,
}

impl CursorLifecycle {
    /// Starts closed
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: CursorState::Closed,
        }
    }

    /// Current state
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Moves Closed to Active, counting the open
    pub fn open(&mut self, ctx: &QueryContext) -> ExecResult<()> {
        if self.state.is_open() {
            return Err(ExecError::illegal_state(format!(
                "{} is already open",
                self.name
            )));
        }
        ctx.count(Counter::CursorsOpened, 1);
        self.state = CursorState::Active;
        Ok(())
    }

    /// Ok(true) while rows may follow, Ok(false) once exhausted, error if closed
    pub fn check_next(&self) -> ExecResult<bool> {
        match self.state {
            CursorState::Active => Ok(true),
            CursorState::Exhausted => Ok(false),
            CursorState::Closed => Err(ExecError::illegal_state(format!(
                "next() on closed {}",
                self.name
            ))),
        }
    }

    /// Fails unless open
    pub fn check_open(&self) -> ExecResult<()> {
        if self.state.is_open() {
            Ok(())
        } else {
            Err(ExecError::illegal_state(format!("{} is closed", self.name)))
        }
    }

    /// Records the end of the sequence
    pub fn exhaust(&mut self) {
        if self.state == CursorState::Active {
            self.state = CursorState::Exhausted;
        }
    }

    /// Returns to Active after a jump repositioned an exhausted cursor
    pub fn reactivate(&mut self) {
        if self.state == CursorState::Exhausted {
            self.state = CursorState::Active;
        }
    }

    /// Moves to Closed
    pub fn close(&mut self) {
        self.state = CursorState::Closed;
    }
}

/// Opens and drains a cursor, then closes it
pub fn drain(cursor: &mut dyn Cursor, bindings: &Bindings) -> ExecResult<Vec<Row>> {
    cursor.open_top_level(bindings)?;
    let mut rows = Vec::new();
    loop {
        match cursor.next() {
            Ok(Some(row)) => rows.push(row),
            Ok(None) => break,
            Err(e) => {
                cursor.close_top_level();
                return Err(e);
            }
        }
    }
    cursor.close_top_level();
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_selector() {
        let row_type = RowType::values(vec![crate::row::ColumnType::Int; 3]);
        assert_eq!(ColumnSelector::all(&row_type).count(), 3);
        assert_eq!(ColumnSelector::leading(1).count(), 1);
    }

    #[test]
    fn test_state_is_open() {
        assert!(!CursorState::Closed.is_open());
        assert!(CursorState::Active.is_open());
        assert!(CursorState::Exhausted.is_open());
    }
}
