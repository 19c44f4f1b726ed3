//! Group and values scans

use std::sync::Arc;

use crate::row::{Row, RowType};
use crate::storage::RowStream;

use super::context::{Bindings, QueryContext};
use super::cursor::{BoxedCursor, Cursor, CursorLifecycle, CursorState, Operator};
use super::errors::{ExecError, ExecResult};

/// Every row of the group in hkey order
#[derive(Debug, Default)]
pub struct GroupScan;

impl Operator for GroupScan {
    fn cursor(&self, ctx: &QueryContext) -> ExecResult<BoxedCursor> {
        Ok(Box::new(GroupScanCursor {
            ctx: ctx.clone(),
            lifecycle: CursorLifecycle::new("GroupScan"),
            stream: None,
        }))
    }

    fn row_type(&self) -> Option<&Arc<RowType>> {
        None
    }

    fn name(&self) -> &'static str {
        "GroupScan"
    }
}

struct GroupScanCursor {
    ctx: QueryContext,
    lifecycle: CursorLifecycle,
    stream: Option<Box<dyn RowStream>>,
}

impl Cursor for GroupScanCursor {
    fn open(&mut self, _bindings: &Bindings) -> ExecResult<()> {
        self.lifecycle.open(&self.ctx)?;
        match self.ctx.store().group_stream() {
            Ok(stream) => {
                self.stream = Some(stream);
                Ok(())
            }
            Err(e) => {
                self.lifecycle.close();
                Err(e.into())
            }
        }
    }

    fn next(&mut self) -> ExecResult<Option<Row>> {
        if !self.lifecycle.check_next()? {
            return Ok(None);
        }
        self.ctx.check_interrupt()?;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| ExecError::illegal_state("group stream missing"))?;
        match stream.advance()? {
            Some(row) => Ok(Some(row)),
            None => {
                self.lifecycle.exhaust();
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.stream = None;
        self.lifecycle.close();
    }

    fn state(&self) -> CursorState {
        self.lifecycle.state()
    }

    fn name(&self) -> &'static str {
        "GroupScan"
    }
}

/// A fixed list of rows of one type
#[derive(Debug)]
pub struct ValuesScan {
    row_type: Arc<RowType>,
    rows: Arc<Vec<Row>>,
}

impl ValuesScan {
    /// Every row must have `row_type`
    pub fn new(row_type: Arc<RowType>, rows: Vec<Row>) -> ExecResult<Self> {
        if let Some(row) = rows.iter().find(|r| r.row_type() != &row_type) {
            return Err(ExecError::argument(format!(
                "values scan of {} given a row of {}",
                row_type,
                row.row_type()
            )));
        }
        Ok(Self {
            row_type,
            rows: Arc::new(rows),
        })
    }
}

impl Operator for ValuesScan {
    fn cursor(&self, ctx: &QueryContext) -> ExecResult<BoxedCursor> {
        Ok(Box::new(ValuesScanCursor {
            ctx: ctx.clone(),
            lifecycle: CursorLifecycle::new("ValuesScan"),
            rows: Arc::clone(&self.rows),
            position: 0,
        }))
    }

    fn row_type(&self) -> Option<&Arc<RowType>> {
        Some(&self.row_type)
    }

    fn name(&self) -> &'static str {
        "ValuesScan"
    }
}

struct ValuesScanCursor {
    ctx: QueryContext,
    lifecycle: CursorLifecycle,
    rows: Arc<Vec<Row>>,
    position: usize,
}

impl Cursor for ValuesScanCursor {
    fn open(&mut self, _bindings: &Bindings) -> ExecResult<()> {
        self.lifecycle.open(&self.ctx)?;
        self.position = 0;
        Ok(())
    }

    fn next(&mut self) -> ExecResult<Option<Row>> {
        if !self.lifecycle.check_next()? {
            return Ok(None);
        }
        self.ctx.check_interrupt()?;
        match self.rows.get(self.position) {
            Some(row) => {
                self.position += 1;
                Ok(Some(row.clone()))
            }
            None => {
                self.lifecycle.exhaust();
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.lifecycle.close();
    }

    fn state(&self) -> CursorState {
        self.lifecycle.state()
    }

    fn name(&self) -> &'static str {
        "ValuesScan"
    }
}
