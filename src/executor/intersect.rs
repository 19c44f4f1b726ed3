//! Ordered intersection with optional skip-scan
//!
//! The merge advances whichever side has the smaller key. Under
//! `ScanStrategy::Skip`, once a side has lagged for the configured number
//! of sequential advances it is jumped straight to the leader's key. The
//! jump target is the lagging row's leading (non-key) fields followed by
//! the leader's key fields, so it stays inside the lagging scan's range.
//!
//! Jumping needs a lagging cursor that supports `jump` and comparators
//! that agree with index order. Otherwise the merge stays sequential; the
//! output is the same either way.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::observability::{log_event_with_fields, Counter, Event};
use crate::row::{Row, RowType};

use super::context::{Bindings, QueryContext};
use super::cursor::{
    BoxedCursor, ColumnSelector, Cursor, CursorLifecycle, CursorState, Operator, OperatorRef,
};
use super::errors::{ExecError, ExecResult};
use super::merge::{input_type, open_pair, MergeInput, MergeKey};

/// Which input's row a match emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSide {
    Left,
    Right,
}

/// How the lagging side catches up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStrategy {
    Sequential,
    Skip,
}

/// Intersection options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntersectOptions {
    pub output_side: OutputSide,
    pub scan_strategy: ScanStrategy,
}

impl Default for IntersectOptions {
    fn default() -> Self {
        Self {
            output_side: OutputSide::Left,
            scan_strategy: ScanStrategy::Sequential,
        }
    }
}

/// Inner intersection of two identically ordered inputs
#[derive(Debug)]
pub struct IntersectOrdered {
    left: OperatorRef,
    right: OperatorRef,
    left_type: Arc<RowType>,
    right_type: Arc<RowType>,
    key: MergeKey,
    options: IntersectOptions,
}

impl IntersectOrdered {
    pub fn new(
        left: OperatorRef,
        right: OperatorRef,
        key: MergeKey,
        options: IntersectOptions,
    ) -> ExecResult<Self> {
        let left_type = input_type(&left, "left")?;
        let right_type = input_type(&right, "right")?;
        Ok(Self {
            left,
            right,
            left_type,
            right_type,
            key,
            options,
        })
    }
}

impl Operator for IntersectOrdered {
    fn cursor(&self, ctx: &QueryContext) -> ExecResult<BoxedCursor> {
        Ok(Box::new(IntersectCursor {
            ctx: ctx.clone(),
            lifecycle: CursorLifecycle::new("IntersectOrdered"),
            key: self.key.clone(),
            options: self.options,
            left_type: Arc::clone(&self.left_type),
            right_type: Arc::clone(&self.right_type),
            left: MergeInput::new(self.left.cursor(ctx)?),
            right: MergeInput::new(self.right.cursor(ctx)?),
            started: false,
            lag: None,
            degraded_logged: false,
        }))
    }

    fn row_type(&self) -> Option<&Arc<RowType>> {
        match self.options.output_side {
            OutputSide::Left => Some(&self.left_type),
            OutputSide::Right => Some(&self.right_type),
        }
    }

    fn name(&self) -> &'static str {
        "IntersectOrdered"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

struct IntersectCursor {
    ctx: QueryContext,
    lifecycle: CursorLifecycle,
    key: MergeKey,
    options: IntersectOptions,
    left_type: Arc<RowType>,
    right_type: Arc<RowType>,
    left: MergeInput,
    right: MergeInput,
    started: bool,
    /// Side currently lagging and its consecutive sequential advances
    lag: Option<(Side, usize)>,
    degraded_logged: bool,
}

impl IntersectCursor {
    fn can_jump(&mut self, side: Side) -> bool {
        if self.options.scan_strategy != ScanStrategy::Skip {
            return false;
        }
        let cursor = match side {
            Side::Left => &self.left.cursor,
            Side::Right => &self.right.cursor,
        };
        let reason = if !cursor.supports_jump() {
            Some("input does not support jump")
        } else if !self.key.order_compatible() {
            Some("comparator not order compatible")
        } else {
            None
        };
        match reason {
            None => true,
            Some(reason) => {
                if !self.degraded_logged {
                    self.degraded_logged = true;
                    let query_id = self.ctx.query_id().to_string();
                    log_event_with_fields(
                        Event::SkipScanDegraded,
                        &[("query_id", query_id.as_str()), ("reason", reason)],
                    );
                }
                false
            }
        }
    }

    /// Moves the lagging side toward the leader's key
    fn catch_up(&mut self, side: Side) -> ExecResult<()> {
        let steps = match self.lag {
            Some((lagging, steps)) if lagging == side => steps,
            _ => 0,
        };
        let threshold = self.ctx.config().skip_scan_sequential_steps;
        if steps >= threshold && self.can_jump(side) {
            let target = self.jump_target(side)?;
            let input = match side {
                Side::Left => &mut self.left,
                Side::Right => &mut self.right,
            };
            let columns = ColumnSelector::all(target.row_type());
            input.cursor.jump(&target, columns)?;
            input.advance()?;
            self.ctx.count(Counter::SkipScanJumps, 1);
            self.lag = Some((side, 0));
        } else {
            match side {
                Side::Left => self.left.advance()?,
                Side::Right => self.right.advance()?,
            }
            self.lag = Some((side, steps + 1));
        }
        Ok(())
    }

    fn jump_target(&self, side: Side) -> ExecResult<Row> {
        let (lagging, leader) = match (&self.left.current, &self.right.current) {
            (Some(l), Some(r)) => match side {
                Side::Left => (l, r),
                Side::Right => (r, l),
            },
            _ => return Err(ExecError::illegal_state("jump without both rows")),
        };
        let (mut values, key, row_type) = match side {
            Side::Left => (
                self.key.left_prefix(lagging).to_vec(),
                self.key.right_key(leader),
                &self.left_type,
            ),
            Side::Right => (
                self.key.right_prefix(lagging).to_vec(),
                self.key.left_key(leader),
                &self.right_type,
            ),
        };
        values.extend(key.iter().cloned());
        Ok(Row::new(Arc::clone(row_type), values))
    }

    fn open_inputs(&mut self, bindings: &Bindings, top_level: bool) -> ExecResult<()> {
        self.lifecycle.open(&self.ctx)?;
        if let Err(e) = open_pair(&mut self.left, &mut self.right, bindings, top_level) {
            self.lifecycle.close();
            return Err(e);
        }
        self.started = false;
        self.lag = None;
        Ok(())
    }

    fn close_inputs(&mut self, top_level: bool) {
        if self.lifecycle.state().is_open() {
            self.left.close(top_level);
            self.right.close(top_level);
        }
        self.lifecycle.close();
    }
}

impl Cursor for IntersectCursor {
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
            let order = match (&self.left.current, &self.right.current) {
                (Some(l), Some(r)) => self.key.compare(l, r),
                _ => {
                    self.lifecycle.exhaust();
                    return Ok(None);
                }
            };
            match order {
                Ordering::Less => self.catch_up(Side::Left)?,
                Ordering::Greater => self.catch_up(Side::Right)?,
                Ordering::Equal => {
                    self.lag = None;
                    let left = self.left.take()?;
                    let right = self.right.take()?;
                    return Ok(match self.options.output_side {
                        OutputSide::Left => left,
                        OutputSide::Right => right,
                    });
                }
            }
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
        "IntersectOrdered"
    }
}
