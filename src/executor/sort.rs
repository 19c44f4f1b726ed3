//! Full and insertion-limited sorts
//!
//! Both materialize their input on the first `next()`. The general sort is
//! stable. The insertion-limited sort keeps at most `limit` rows in sorted
//! order; a new row goes after every row whose key it ties, so among tied
//! rows the earliest inserted survive.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::observability::Counter;
use crate::row::{Row, RowType, Value};

use super::context::{Bindings, QueryContext};
use super::cursor::{BoxedCursor, Cursor, CursorLifecycle, CursorState, Operator, OperatorRef};
use super::errors::{ExecError, ExecResult};
use super::ordering::RowOrdering;

/// Treatment of rows whose sort keys are equal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOption {
    PreserveDuplicates,
    SuppressDuplicates,
}

#[derive(Debug)]
pub struct SortOperator {
    input: OperatorRef,
    ordering: RowOrdering,
    option: SortOption,
    limit: Option<usize>,
}

impl SortOperator {
    /// Full sort
    pub fn general(input: OperatorRef, ordering: RowOrdering, option: SortOption) -> ExecResult<Self> {
        if ordering.is_empty() {
            return Err(ExecError::argument("sort needs at least one ordering column"));
        }
        Ok(Self {
            input,
            ordering,
            option,
            limit: None,
        })
    }

    /// Keeps only the first `limit` rows of the sorted order
    pub fn insertion_limited(
        input: OperatorRef,
        ordering: RowOrdering,
        option: SortOption,
        limit: usize,
    ) -> ExecResult<Self> {
        if limit == 0 {
            return Err(ExecError::argument("sort limit must be positive"));
        }
        let mut sort = Self::general(input, ordering, option)?;
        sort.limit = Some(limit);
        Ok(sort)
    }
}

impl Operator for SortOperator {
    fn cursor(&self, ctx: &QueryContext) -> ExecResult<BoxedCursor> {
        Ok(Box::new(SortCursor {
            ctx: ctx.clone(),
            lifecycle: CursorLifecycle::new(self.name()),
            input: self.input.cursor(ctx)?,
            ordering: self.ordering.clone(),
            option: self.option,
            limit: self.limit,
            bindings: Bindings::new(),
            top_level: false,
            sorted: None,
        }))
    }

    fn row_type(&self) -> Option<&Arc<RowType>> {
        self.input.row_type()
    }

    fn name(&self) -> &'static str {
        if self.limit.is_some() {
            "SortInsertionLimited"
        } else {
            "Sort"
        }
    }
}

struct SortCursor {
    ctx: QueryContext,
    lifecycle: CursorLifecycle,
    input: BoxedCursor,
    ordering: RowOrdering,
    option: SortOption,
    limit: Option<usize>,
    bindings: Bindings,
    top_level: bool,
    /// Sorted rows, consumed from the front once materialized
    sorted: Option<std::vec::IntoIter<Row>>,
}

impl SortCursor {
    fn materialize(&mut self) -> ExecResult<Vec<Row>> {
        let mut entries: Vec<(Vec<Value>, Row)> = Vec::new();
        while let Some(row) = self.input.next()? {
            self.ctx.check_interrupt()?;
            self.ctx.count(Counter::SortedRows, 1);
            let key = self.ordering.key(&row, &self.bindings)?;
            match self.limit {
                Some(limit) => self.insert_limited(&mut entries, key, row, limit),
                None => entries.push((key, row)),
            }
        }
        if self.limit.is_none() {
            let ordering = &self.ordering;
            entries.sort_by(|a, b| ordering.compare_keys(&a.0, &b.0));
            if self.option == SortOption::SuppressDuplicates {
                entries.dedup_by(|a, b| ordering.compare_keys(&a.0, &b.0) == Ordering::Equal);
            }
        }
        Ok(entries.into_iter().map(|(_, row)| row).collect())
    }

    fn insert_limited(&self, entries: &mut Vec<(Vec<Value>, Row)>, key: Vec<Value>, row: Row, limit: usize) {
        let at = entries
            .partition_point(|(k, _)| self.ordering.compare_keys(k, &key) != Ordering::Greater);
        if self.option == SortOption::SuppressDuplicates
            && at > 0
            && self.ordering.compare_keys(&entries[at - 1].0, &key) == Ordering::Equal
        {
            return;
        }
        if at >= limit {
            return;
        }
        entries.insert(at, (key, row));
        entries.truncate(limit);
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
        self.bindings = bindings.clone();
        self.top_level = top_level;
        self.sorted = None;
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
        self.sorted = None;
        self.lifecycle.close();
    }
}

impl Cursor for SortCursor {
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
        self.ctx.check_interrupt()?;
        if self.sorted.is_none() {
            let rows = self.materialize()?;
            self.sorted = Some(rows.into_iter());
        }
        match self.sorted.as_mut().and_then(Iterator::next) {
            Some(row) => Ok(Some(row)),
            None => {
                self.lifecycle.exhaust();
                Ok(None)
            }
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
        if self.limit.is_some() {
            "SortInsertionLimited"
        } else {
            "Sort"
        }
    }
}
