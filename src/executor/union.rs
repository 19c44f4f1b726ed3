//! Ordered union of two inputs

use std::cmp::Ordering;
use std::sync::Arc;

use crate::row::{Row, RowType, Value};

use super::context::{Bindings, QueryContext};
use super::cursor::{BoxedCursor, Cursor, CursorLifecycle, CursorState, Operator, OperatorRef};
use super::errors::{ExecError, ExecResult};
use super::merge::{input_type, open_pair, MergeInput, MergeKey};

/// Merges two identically ordered inputs of one row type
#[derive(Debug)]
pub struct UnionOrdered {
    left: OperatorRef,
    right: OperatorRef,
    row_type: Arc<RowType>,
    key: MergeKey,
    preserve_duplicates: bool,
}

impl UnionOrdered {
    /// Both inputs must produce the same row type, since the merged output
    /// advertises a single one; `key` compares their ordering fields
    pub fn new(
        left: OperatorRef,
        right: OperatorRef,
        key: MergeKey,
        preserve_duplicates: bool,
    ) -> ExecResult<Self> {
        let left_type = input_type(&left, "left")?;
        let right_type = input_type(&right, "right")?;
        if !left_type.same_shape(&right_type) {
            return Err(ExecError::shape(format!(
                "union of {} and {}",
                left_type, right_type
            )));
        }
        if left_type != right_type {
            return Err(ExecError::shape(format!(
                "union inputs produce distinct row types {} and {}",
                left_type, right_type
            )));
        }
        Ok(Self {
            left,
            right,
            row_type: left_type,
            key,
            preserve_duplicates,
        })
    }
}

impl Operator for UnionOrdered {
    fn cursor(&self, ctx: &QueryContext) -> ExecResult<BoxedCursor> {
        Ok(Box::new(UnionCursor {
            ctx: ctx.clone(),
            lifecycle: CursorLifecycle::new("UnionOrdered"),
            key: self.key.clone(),
            preserve_duplicates: self.preserve_duplicates,
            left: MergeInput::new(self.left.cursor(ctx)?),
            right: MergeInput::new(self.right.cursor(ctx)?),
            started: false,
            last: None,
        }))
    }

    fn row_type(&self) -> Option<&Arc<RowType>> {
        Some(&self.row_type)
    }

    fn name(&self) -> &'static str {
        "UnionOrdered"
    }
}

enum Pick {
    Left,
    Right,
    Both,
}

struct UnionCursor {
    ctx: QueryContext,
    lifecycle: CursorLifecycle,
    key: MergeKey,
    preserve_duplicates: bool,
    left: MergeInput,
    right: MergeInput,
    started: bool,
    /// Last emitted row and whether it came from the left
    last: Option<(Row, bool)>,
}

impl UnionCursor {
    fn key_of<'r>(&self, row: &'r Row, from_left: bool) -> &'r [Value] {
        if from_left {
            self.key.left_key(row)
        } else {
            self.key.right_key(row)
        }
    }

    fn repeats_last(&self, row: &Row, from_left: bool) -> bool {
        match &self.last {
            Some((last, last_left)) => {
                self.key
                    .compare_keys(self.key_of(last, *last_left), self.key_of(row, from_left))
                    == Ordering::Equal
            }
            None => false,
        }
    }

    fn open_inputs(&mut self, bindings: &Bindings, top_level: bool) -> ExecResult<()> {
        self.lifecycle.open(&self.ctx)?;
        if let Err(e) = open_pair(&mut self.left, &mut self.right, bindings, top_level) {
            self.lifecycle.close();
            return Err(e);
        }
        self.started = false;
        self.last = None;
        Ok(())
    }

    fn close_inputs(&mut self, top_level: bool) {
        if self.lifecycle.state().is_open() {
            self.left.close(top_level);
            self.right.close(top_level);
        }
        self.last = None;
        self.lifecycle.close();
    }
}

impl Cursor for UnionCursor {
    fn open(&mut self, bindings: &Bindings) -> ExecResult<()> {
        self.open_inputs(bindings, false)
    }

    fn open_top_level(&mut self, bindings: &Bindings) -> ExecResult<()> {
        self.open_inputs(bindings, true)
    }

    fn next(&mut self) -> ExecResult<Option<Row>> {
        if !self.lifecycle.check_next()? {
            return Ok(None);
        }
        if !self.started {
            self.left.advance()?;
            self.right.advance()?;
            self.started = true;
        }
        loop {
            self.ctx.check_interrupt()?;
            let pick = match (&self.left.current, &self.right.current) {
                (None, None) => {
                    self.lifecycle.exhaust();
                    return Ok(None);
                }
                (Some(_), None) => Pick::Left,
                (None, Some(_)) => Pick::Right,
                (Some(l), Some(r)) => match self.key.compare(l, r) {
                    Ordering::Less => Pick::Left,
                    Ordering::Greater => Pick::Right,
                    Ordering::Equal if self.preserve_duplicates => Pick::Left,
                    Ordering::Equal => Pick::Both,
                },
            };
            let (row, from_left) = match pick {
                Pick::Left => (self.left.take()?, true),
                Pick::Right => (self.right.take()?, false),
                Pick::Both => {
                    self.right.take()?;
                    (self.left.take()?, true)
                }
            };
            let row = row.ok_or_else(|| ExecError::illegal_state("merge input lost its row"))?;
            if !self.preserve_duplicates && self.repeats_last(&row, from_left) {
                continue;
            }
            self.last = Some((row.clone(), from_left));
            return Ok(Some(row));
        }
    }

    fn close(&mut self) {
        self.close_inputs(false);
    }

    fn close_top_level(&mut self) {
        self.close_inputs(true);
    }

    fn state(&self) -> CursorState {
        self.lifecycle.state()
    }

    fn name(&self) -> &'static str {
        "UnionOrdered"
    }
}
