//! Nested-loop map
//!
//! For each outer row, binds it at a position and drains the inner operator
//! under that binding. Only inner rows are emitted, outer-major.
//!
//! Pipelined maps open inner cursors for up to `quantum` outer rows ahead
//! of consumption. Each lookahead binding gets its own inner cursor, so the
//! inner subtree never sees two bindings at once. A pipelined map owns that
//! queue between opens, which is why a plain `open()` after the first one
//! is rejected; `close_top_level` resets it.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::observability::Counter;
use crate::row::{Row, RowType};

use super::context::{Bindings, QueryContext};
use super::cursor::{BoxedCursor, Cursor, CursorLifecycle, CursorState, Operator, OperatorRef};
use super::errors::{ExecError, ExecResult};

#[derive(Debug)]
pub struct MapNestedLoops {
    outer: OperatorRef,
    inner: OperatorRef,
    binding: usize,
    pipelined: bool,
    quantum: usize,
}

impl MapNestedLoops {
    pub fn new(
        outer: OperatorRef,
        inner: OperatorRef,
        binding: usize,
        pipelined: bool,
        quantum: usize,
    ) -> ExecResult<Self> {
        if quantum == 0 {
            return Err(ExecError::argument("map lookahead quantum must be positive"));
        }
        Ok(Self {
            outer,
            inner,
            binding,
            pipelined,
            quantum,
        })
    }
}

impl Operator for MapNestedLoops {
    fn cursor(&self, ctx: &QueryContext) -> ExecResult<BoxedCursor> {
        let inner = if self.pipelined {
            Vec::new()
        } else {
            vec![self.inner.cursor(ctx)?]
        };
        Ok(Box::new(MapCursor {
            ctx: ctx.clone(),
            lifecycle: CursorLifecycle::new("MapNestedLoops"),
            inner_op: Arc::clone(&self.inner),
            binding: self.binding,
            pipelined: self.pipelined,
            quantum: if self.pipelined { self.quantum } else { 1 },
            outer: self.outer.cursor(ctx)?,
            outer_top_level: false,
            outer_done: false,
            bindings: Bindings::new(),
            active: VecDeque::new(),
            idle: inner,
            opened_once: false,
        }))
    }

    fn row_type(&self) -> Option<&Arc<RowType>> {
        self.inner.row_type()
    }

    fn name(&self) -> &'static str {
        "MapNestedLoops"
    }
}

struct MapCursor {
    ctx: QueryContext,
    lifecycle: CursorLifecycle,
    inner_op: OperatorRef,
    binding: usize,
    pipelined: bool,
    quantum: usize,
    outer: BoxedCursor,
    outer_top_level: bool,
    outer_done: bool,
    /// Bindings this map was opened with
    bindings: Bindings,
    /// Open inner cursors, oldest outer row first
    active: VecDeque<BoxedCursor>,
    /// Closed inner cursors ready for another binding
    idle: Vec<BoxedCursor>,
    opened_once: bool,
}

impl MapCursor {
    /// Opens inner cursors for outer rows until the lookahead is full
    fn fill(&mut self) -> ExecResult<()> {
        while self.active.len() < self.quantum && !self.outer_done {
            self.ctx.check_interrupt()?;
            let outer_row = match self.outer.next()? {
                Some(row) => row,
                None => {
                    self.outer_done = true;
                    break;
                }
            };
            let mut inner = match self.idle.pop() {
                Some(cursor) => cursor,
                None => self.inner_op.cursor(&self.ctx)?,
            };
            let bound = self.bindings.with(self.binding, outer_row);
            if let Err(e) = inner.open_top_level(&bound) {
                self.idle.push(inner);
                return Err(e);
            }
            self.active.push_back(inner);
            if self.pipelined {
                self.ctx.peak(Counter::InnerCursorsOpenPeak, self.active.len() as u64);
            }
        }
        Ok(())
    }

    fn open_with(&mut self, bindings: &Bindings, top_level: bool) -> ExecResult<()> {
        if self.pipelined && self.opened_once && !top_level {
            return Err(ExecError::illegal_state(
                "pipelined MapNestedLoops can only be reopened at top level",
            ));
        }
        self.lifecycle.open(&self.ctx)?;
        let opened = if top_level {
            self.outer.open_top_level(bindings)
        } else {
            self.outer.open(bindings)
        };
        if let Err(e) = opened {
            self.lifecycle.close();
            return Err(e);
        }
        self.outer_top_level = top_level;
        self.outer_done = false;
        self.bindings = bindings.clone();
        self.opened_once = true;
        Ok(())
    }

    fn stop(&mut self) {
        while let Some(mut inner) = self.active.pop_front() {
            inner.close_top_level();
            self.idle.push(inner);
        }
        if self.lifecycle.state().is_open() {
            if self.outer_top_level {
                self.outer.close_top_level();
            } else {
                self.outer.close();
            }
        }
        self.lifecycle.close();
    }
}

impl Cursor for MapCursor {
    fn open(&mut self, bindings: &Bindings) -> ExecResult<()> {
        self.open_with(bindings, false)
    }

    fn open_top_level(&mut self, bindings: &Bindings) -> ExecResult<()> {
        self.open_with(bindings, true)
    }

    fn next(&mut self) -> ExecResult<Option<Row>> {
        if !self.lifecycle.check_next()? {
            return Ok(None);
        }
        loop {
            self.ctx.check_interrupt()?;
            self.fill()?;
            let front = match self.active.front_mut() {
                Some(inner) => inner,
                None => {
                    self.lifecycle.exhaust();
                    return Ok(None);
                }
            };
            if let Some(row) = front.next()? {
                return Ok(Some(row));
            }
            if let Some(mut done) = self.active.pop_front() {
                done.close_top_level();
                self.idle.push(done);
            }
        }
    }

    fn close(&mut self) {
        self.stop();
    }

    fn close_top_level(&mut self) {
        self.stop();
        self.opened_once = false;
    }

    fn state(&self) -> CursorState {
        self.lifecycle.state()
    }

    fn name(&self) -> &'static str {
        "MapNestedLoops"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::cursor::drain;
    use crate::executor::expression::bound_field;
    use crate::executor::testing::{context, keyed, pairs, tagged_type};
    use crate::observability::ExecutionMetrics;
    use crate::row::Value;

    /// Emits the sum of the bound rows' keys, then the sum plus 100
    #[derive(Debug)]
    struct Echo {
        row_type: Arc<RowType>,
        positions: Vec<usize>,
    }

    impl Operator for Echo {
        fn cursor(&self, ctx: &QueryContext) -> ExecResult<BoxedCursor> {
            Ok(Box::new(EchoCursor {
                ctx: ctx.clone(),
                lifecycle: CursorLifecycle::new("Echo"),
                row_type: Arc::clone(&self.row_type),
                positions: self.positions.clone(),
                rows: VecDeque::new(),
            }))
        }

        fn row_type(&self) -> Option<&Arc<RowType>> {
            Some(&self.row_type)
        }

        fn name(&self) -> &'static str {
            "Echo"
        }
    }

    struct EchoCursor {
        ctx: QueryContext,
        lifecycle: CursorLifecycle,
        row_type: Arc<RowType>,
        positions: Vec<usize>,
        rows: VecDeque<Row>,
    }

    impl Cursor for EchoCursor {
        fn open(&mut self, bindings: &Bindings) -> ExecResult<()> {
            self.lifecycle.open(&self.ctx)?;
            let mut key = 0;
            for position in &self.positions {
                match bound_field(*position, 1).evaluate(None, bindings)? {
                    Value::Int(k) => key += k,
                    other => panic!("unexpected {}", other),
                }
            }
            for k in [key, key + 100] {
                self.rows.push_back(Row::new(
                    Arc::clone(&self.row_type),
                    vec![Value::varchar("e"), Value::Int(k)],
                ));
            }
            Ok(())
        }

        fn next(&mut self) -> ExecResult<Option<Row>> {
            self.lifecycle.check_next()?;
            Ok(self.rows.pop_front())
        }

        fn close(&mut self) {
            self.rows.clear();
            self.lifecycle.close();
        }

        fn state(&self) -> CursorState {
            self.lifecycle.state()
        }

        fn name(&self) -> &'static str {
            "Echo"
        }
    }

    fn echo(position: usize) -> OperatorRef {
        sum_echo(&[position])
    }

    fn sum_echo(positions: &[usize]) -> OperatorRef {
        Arc::new(Echo {
            row_type: tagged_type(),
            positions: positions.to_vec(),
        })
    }

    fn keys_of(rows: &[Row]) -> Vec<i32> {
        pairs(rows).into_iter().map(|(_, k)| k).collect()
    }

    #[test]
    fn test_outer_major_order() {
        let ctx = context();
        for pipelined in [false, true] {
            let outer = keyed(&tagged_type(), "o", &[1, 2, 3]);
            let op = MapNestedLoops::new(outer, echo(0), 0, pipelined, 2).unwrap();
            let mut cursor = op.cursor(&ctx).unwrap();
            let rows = drain(cursor.as_mut(), &Bindings::new()).unwrap();
            assert_eq!(keys_of(&rows), vec![1, 101, 2, 102, 3, 103]);
        }
    }

    #[test]
    fn test_lookahead_bounded_by_quantum() {
        let metrics = Arc::new(ExecutionMetrics::new());
        let ctx = context().with_metrics(metrics.clone());
        let outer = keyed(&tagged_type(), "o", &[1, 2, 3, 4, 5]);
        let op = MapNestedLoops::new(outer, echo(0), 0, true, 3).unwrap();
        let mut cursor = op.cursor(&ctx).unwrap();
        drain(cursor.as_mut(), &Bindings::new()).unwrap();
        assert_eq!(metrics.get(Counter::InnerCursorsOpenPeak), 3);
    }

    #[test]
    fn test_nested_maps() {
        let ctx = context();
        let outer = keyed(&tagged_type(), "o", &[1, 2]);
        let middle: OperatorRef = Arc::new(MapNestedLoops::new(outer, echo(0), 0, true, 2).unwrap());
        let op = MapNestedLoops::new(middle, echo(1), 1, false, 1).unwrap();
        let mut cursor = op.cursor(&ctx).unwrap();
        let rows = drain(cursor.as_mut(), &Bindings::new()).unwrap();
        assert_eq!(
            keys_of(&rows),
            vec![1, 101, 101, 201, 2, 102, 102, 202]
        );
    }

    #[test]
    fn test_three_level_maps_see_outer_bindings() {
        let ctx = context();
        let innermost: OperatorRef =
            Arc::new(MapNestedLoops::new(echo(1), sum_echo(&[0, 1, 2]), 2, true, 3).unwrap());
        let middle: OperatorRef = Arc::new(MapNestedLoops::new(echo(0), innermost, 1, false, 1).unwrap());
        let outer = keyed(&tagged_type(), "o", &[1, 2]);
        let op = MapNestedLoops::new(outer, middle, 0, true, 2).unwrap();

        let mut cursor = op.cursor(&ctx).unwrap();
        let rows = drain(cursor.as_mut(), &Bindings::new()).unwrap();
        assert_eq!(
            keys_of(&rows),
            vec![3, 103, 103, 203, 203, 303, 303, 403, 6, 106, 106, 206, 206, 306, 306, 406]
        );
    }

    #[test]
    fn test_pipelined_reopen_only_at_top_level() {
        let ctx = context();
        let outer = keyed(&tagged_type(), "o", &[1]);
        let op = MapNestedLoops::new(outer, echo(0), 0, true, 2).unwrap();
        let mut cursor = op.cursor(&ctx).unwrap();

        cursor.open(&Bindings::new()).unwrap();
        cursor.close();
        assert!(matches!(
            cursor.open(&Bindings::new()),
            Err(ExecError::IllegalState(_))
        ));
        cursor.open_top_level(&Bindings::new()).unwrap();
        assert_eq!(keys_of(&[cursor.next().unwrap().unwrap()]), vec![1]);
        cursor.close_top_level();
        cursor.open(&Bindings::new()).unwrap();
        cursor.close();
    }

    #[test]
    fn test_zero_quantum_rejected() {
        let outer = keyed(&tagged_type(), "o", &[1]);
        assert!(matches!(
            MapNestedLoops::new(outer, echo(0), 0, true, 0),
            Err(ExecError::Argument(_))
        ));
    }
}
