//! Ordered difference: left rows whose key the right input lacks

use std::cmp::Ordering;
use std::sync::Arc;

use crate::row::{Row, RowType};

use super::context::{Bindings, QueryContext};
use super::cursor::{BoxedCursor, Cursor, CursorLifecycle, CursorState, Operator, OperatorRef};
use super::errors::{ExecError, ExecResult};
use super::merge::{input_type, open_pair, MergeInput, MergeKey};

#[derive(Debug)]
pub struct ExceptOrdered {
    left: OperatorRef,
    right: OperatorRef,
    row_type: Arc<RowType>,
    key: MergeKey,
    remove_duplicates: bool,
}

impl ExceptOrdered {
    /// With `remove_duplicates`, each distinct surviving left key is emitted once
    pub fn new(
        left: OperatorRef,
        right: OperatorRef,
        key: MergeKey,
        remove_duplicates: bool,
    ) -> ExecResult<Self> {
        let row_type = input_type(&left, "left")?;
        input_type(&right, "right")?;
        Ok(Self {
            left,
            right,
            row_type,
            key,
            remove_duplicates,
        })
    }
}

impl Operator for ExceptOrdered {
    fn cursor(&self, ctx: &QueryContext) -> ExecResult<BoxedCursor> {
        Ok(Box::new(ExceptCursor {
            ctx: ctx.clone(),
            lifecycle: CursorLifecycle::new("ExceptOrdered"),
            key: self.key.clone(),
            remove_duplicates: self.remove_duplicates,
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
        "ExceptOrdered"
    }
}

struct ExceptCursor {
    ctx: QueryContext,
    lifecycle: CursorLifecycle,
    key: MergeKey,
    remove_duplicates: bool,
    left: MergeInput,
    right: MergeInput,
    started: bool,
    last: Option<Row>,
}

impl ExceptCursor {
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

impl Cursor for ExceptCursor {
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
            let left = match &self.left.current {
                Some(row) => row,
                None => {
                    self.lifecycle.exhaust();
                    return Ok(None);
                }
            };
            let order = match &self.right.current {
                Some(right) => self.key.compare(left, right),
                None => Ordering::Less,
            };
            match order {
                Ordering::Greater => self.right.advance()?,
                Ordering::Equal => self.left.advance()?,
                Ordering::Less => {
                    let row = self
                        .left
                        .take()?
                        .ok_or_else(|| ExecError::illegal_state("merge input lost its row"))?;
                    if self.remove_duplicates {
                        let repeated = self.last.as_ref().map_or(false, |last| {
                            self.key
                                .compare_keys(self.key.left_key(last), self.key.left_key(&row))
                                == Ordering::Equal
                        });
                        if repeated {
                            continue;
                        }
                        self.last = Some(row.clone());
                    }
                    return Ok(Some(row));
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
        "ExceptOrdered"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::{context, keyed, keys, run, tagged_type};

    fn except(left: &[i32], right: &[i32], ascending: bool, dedup: bool) -> Vec<i32> {
        let ctx = context();
        let row_type = tagged_type();
        let key = MergeKey::new(&row_type, &row_type, 1, 1, vec![ascending], vec![]).unwrap();
        let op: OperatorRef = Arc::new(
            ExceptOrdered::new(
                keyed(&row_type, "l", left),
                keyed(&row_type, "r", right),
                key,
                dedup,
            )
            .unwrap(),
        );
        keys(&run(&ctx, &op))
    }

    #[test]
    fn test_except_ascending() {
        assert_eq!(except(&[1, 2, 2, 3, 5], &[2, 4, 5], true, false), vec![1, 3]);
        assert_eq!(except(&[1, 1, 3, 3, 6], &[3], true, false), vec![1, 1, 6]);
    }

    #[test]
    fn test_except_descending() {
        assert_eq!(except(&[5, 3, 2, 2, 1], &[5, 4, 2], false, false), vec![3, 1]);
    }

    #[test]
    fn test_except_remove_duplicates() {
        assert_eq!(except(&[1, 1, 3, 3, 6], &[3], true, true), vec![1, 6]);
        assert_eq!(except(&[6, 6, 1], &[], false, true), vec![6, 1]);
    }
}
