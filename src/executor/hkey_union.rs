//! Union of two index streams on the ancestor hkeys they determine
//!
//! Each input row locates a row of a table at or below the output table.
//! Truncating its hkey to the output table's depth gives the ancestor; the
//! operator merges both inputs in hkey order and emits one hkey row per
//! distinct ancestor.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::row::{HKey, Row, RowType, RowTypeKind, TableId};
use crate::schema::GroupSchema;

use super::context::{Bindings, QueryContext};
use super::cursor::{BoxedCursor, Cursor, CursorLifecycle, CursorState, Operator, OperatorRef};
use super::errors::{ExecError, ExecResult};
use super::merge::{input_type, open_pair, MergeInput};

#[derive(Debug)]
pub struct HKeyUnionOrdered {
    left: OperatorRef,
    right: OperatorRef,
    schema: Arc<GroupSchema>,
    output_type: Arc<RowType>,
    depth: usize,
}

impl HKeyUnionOrdered {
    /// Inputs must be index or table rows of `output_table` or its descendants
    pub fn new(
        left: OperatorRef,
        right: OperatorRef,
        schema: Arc<GroupSchema>,
        output_table: TableId,
    ) -> ExecResult<Self> {
        let output_type = schema.hkey_row_type(output_table)?;
        let depth = schema.depth(output_table)?;
        for (input, side) in [(&left, "left"), (&right, "right")] {
            let row_type = input_type(input, side)?;
            let table = row_type.table_id().ok_or_else(|| {
                ExecError::argument(format!("{} input {} is not a group row type", side, row_type))
            })?;
            if !schema.is_ancestor_or_self(output_table, table) {
                return Err(ExecError::argument(format!(
                    "{} input {} does not determine an hkey of {}",
                    side, row_type, output_type
                )));
            }
        }
        Ok(Self {
            left,
            right,
            schema,
            output_type,
            depth,
        })
    }
}

impl Operator for HKeyUnionOrdered {
    fn cursor(&self, ctx: &QueryContext) -> ExecResult<BoxedCursor> {
        Ok(Box::new(HKeyUnionCursor {
            ctx: ctx.clone(),
            lifecycle: CursorLifecycle::new("HKeyUnionOrdered"),
            schema: Arc::clone(&self.schema),
            output_type: Arc::clone(&self.output_type),
            depth: self.depth,
            left: MergeInput::new(self.left.cursor(ctx)?),
            right: MergeInput::new(self.right.cursor(ctx)?),
            left_hkey: None,
            right_hkey: None,
            started: false,
            last: None,
        }))
    }

    fn row_type(&self) -> Option<&Arc<RowType>> {
        Some(&self.output_type)
    }

    fn name(&self) -> &'static str {
        "HKeyUnionOrdered"
    }
}

struct HKeyUnionCursor {
    ctx: QueryContext,
    lifecycle: CursorLifecycle,
    schema: Arc<GroupSchema>,
    output_type: Arc<RowType>,
    depth: usize,
    left: MergeInput,
    right: MergeInput,
    left_hkey: Option<HKey>,
    right_hkey: Option<HKey>,
    started: bool,
    last: Option<HKey>,
}

/// Ancestor hkey determined by an input row
fn ancestor_hkey(schema: &GroupSchema, row: &Row, depth: usize) -> ExecResult<HKey> {
    if let Some(hkey) = row.hkey() {
        return Ok(hkey.truncate(depth));
    }
    match row.row_type().kind() {
        RowTypeKind::Index { index, .. } => {
            Ok(schema.hkey_for_index_row(*index, row.values())?.truncate(depth))
        }
        _ => Err(ExecError::illegal_state(format!(
            "row of {} carries no hkey",
            row.row_type()
        ))),
    }
}

impl HKeyUnionCursor {
    fn pull_left(&mut self) -> ExecResult<()> {
        self.left.advance()?;
        self.left_hkey = match &self.left.current {
            Some(row) => Some(ancestor_hkey(&self.schema, row, self.depth)?),
            None => None,
        };
        Ok(())
    }

    fn pull_right(&mut self) -> ExecResult<()> {
        self.right.advance()?;
        self.right_hkey = match &self.right.current {
            Some(row) => Some(ancestor_hkey(&self.schema, row, self.depth)?),
            None => None,
        };
        Ok(())
    }

    fn open_inputs(&mut self, bindings: &Bindings, top_level: bool) -> ExecResult<()> {
        self.lifecycle.open(&self.ctx)?;
        if let Err(e) = open_pair(&mut self.left, &mut self.right, bindings, top_level) {
            self.lifecycle.close();
            return Err(e);
        }
        self.left_hkey = None;
        self.right_hkey = None;
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

impl Cursor for HKeyUnionCursor {
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
            self.pull_left()?;
            self.pull_right()?;
            self.started = true;
        }
        loop {
            self.ctx.check_interrupt()?;
            let order = match (&self.left_hkey, &self.right_hkey) {
                (None, None) => {
                    self.lifecycle.exhaust();
                    return Ok(None);
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(l), Some(r)) => l.cmp(r),
            };
            let hkey = match order {
                Ordering::Less => {
                    let hkey = self.left_hkey.take();
                    self.pull_left()?;
                    hkey
                }
                Ordering::Greater => {
                    let hkey = self.right_hkey.take();
                    self.pull_right()?;
                    hkey
                }
                Ordering::Equal => {
                    let hkey = self.left_hkey.take();
                    self.pull_left()?;
                    self.pull_right()?;
                    hkey
                }
            };
            let hkey = hkey.ok_or_else(|| ExecError::illegal_state("merge input lost its hkey"))?;
            if self.last.as_ref() == Some(&hkey) {
                continue;
            }
            self.last = Some(hkey.clone());
            return Ok(Some(Row::with_hkey(
                Arc::clone(&self.output_type),
                hkey.key_values(),
                hkey,
            )));
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
        "HKeyUnionOrdered"
    }
}
