//! Adjacent-duplicate removal over a sorted input

use std::cmp::Ordering;
use std::sync::Arc;

use crate::row::{Collation, Row, RowType};

use super::context::{Bindings, QueryContext};
use super::cursor::{BoxedCursor, Cursor, CursorLifecycle, CursorState, Operator, OperatorRef};
use super::errors::{ExecError, ExecResult};
use super::merge::input_type;

/// Emits a row only when it differs from the previously emitted one.
///
/// Comparison is per column under the given collations; `None` compares
/// natively. Emitted rows keep their original values.
#[derive(Debug)]
pub struct DistinctPartial {
    input: OperatorRef,
    row_type: Arc<RowType>,
    collations: Vec<Option<Collation>>,
}

impl DistinctPartial {
    pub fn new(input: OperatorRef, collations: Vec<Option<Collation>>) -> ExecResult<Self> {
        let row_type = input_type(&input, "distinct")?;
        if collations.len() != row_type.column_count() {
            return Err(ExecError::argument(format!(
                "{} collations given for {}",
                collations.len(),
                row_type
            )));
        }
        Ok(Self {
            input,
            row_type,
            collations,
        })
    }
}

impl Operator for DistinctPartial {
    fn cursor(&self, ctx: &QueryContext) -> ExecResult<BoxedCursor> {
        Ok(Box::new(DistinctCursor {
            ctx: ctx.clone(),
            lifecycle: CursorLifecycle::new("DistinctPartial"),
            input: self.input.cursor(ctx)?,
            collations: self.collations.clone(),
            top_level: false,
            last: None,
        }))
    }

    fn row_type(&self) -> Option<&Arc<RowType>> {
        Some(&self.row_type)
    }

    fn name(&self) -> &'static str {
        "DistinctPartial"
    }
}

struct DistinctCursor {
    ctx: QueryContext,
    lifecycle: CursorLifecycle,
    input: BoxedCursor,
    collations: Vec<Option<Collation>>,
    top_level: bool,
    last: Option<Row>,
}

impl DistinctCursor {
    fn same_as_last(&self, row: &Row) -> bool {
        let last = match &self.last {
            Some(last) => last,
            None => return false,
        };
        last.values()
            .iter()
            .zip(row.values())
            .zip(&self.collations)
            .all(|((a, b), collation)| a.compare_collated(b, *collation) == Ordering::Equal)
    }

    fn open_with(&mut self, bindings: &Bindings, top_level: bool) -> ExecResult<()> {
        self.lifecycle.open(&self.ctx)?;
        let opened = if top_level {
            self.input.open_top_level(bindings)
        } else {
            self.input.open(bindings)
        };
        if let Err(e) = opened {
            self.lifecycle.close();
            return Err(e);
        }
        self.top_level = top_level;
        self.last = None;
        Ok(())
    }

    fn stop(&mut self) {
        if self.lifecycle.state().is_open() {
            if self.top_level {
                self.input.close_top_level();
            } else {
                self.input.close();
            }
        }
        self.last = None;
        self.lifecycle.close();
    }
}

impl Cursor for DistinctCursor {
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
            let row = match self.input.next()? {
                Some(row) => row,
                None => {
                    self.lifecycle.exhaust();
                    return Ok(None);
                }
            };
            if self.same_as_last(&row) {
                continue;
            }
            self.last = Some(row.clone());
            return Ok(Some(row));
        }
    }

    fn close(&mut self) {
        self.stop();
    }

    fn close_top_level(&mut self) {
        self.stop();
    }

    fn state(&self) -> CursorState {
        self.lifecycle.state()
    }

    fn name(&self) -> &'static str {
        "DistinctPartial"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::{context, pairs, run, tagged, tagged_type};

    fn distinct(rows: &[(&str, i32)], collations: Vec<Option<Collation>>) -> Vec<(String, i32)> {
        let ctx = context();
        let op: OperatorRef =
            Arc::new(DistinctPartial::new(tagged(&tagged_type(), rows), collations).unwrap());
        pairs(&run(&ctx, &op))
    }

    #[test]
    fn test_adjacent_only() {
        let rows = [("a", 1), ("a", 1), ("b", 1), ("a", 1)];
        assert_eq!(
            distinct(&rows, vec![None, None]),
            vec![("a".to_string(), 1), ("b".to_string(), 1), ("a".to_string(), 1)]
        );
    }

    #[test]
    fn test_collation_keeps_original_case() {
        let rows = [("X", 1), ("x", 1), ("y", 1)];
        assert_eq!(
            distinct(&rows, vec![Some(Collation::CaseInsensitive), None]),
            vec![("X".to_string(), 1), ("y".to_string(), 1)]
        );
        assert_eq!(distinct(&rows, vec![None, None]).len(), 3);
    }

    #[test]
    fn test_collation_count_must_match() {
        let input = tagged(&tagged_type(), &[]);
        assert!(matches!(
            DistinctPartial::new(input, vec![None]),
            Err(ExecError::Argument(_))
        ));
    }
}
