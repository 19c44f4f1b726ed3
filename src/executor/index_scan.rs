//! Index scan
//!
//! Walks the rows of one index inside an `IndexKeyRange`, in an order given
//! per column. When every column shares one direction the scan is a single
//! pass over a forward or reverse stream. Mixed directions split the index
//! columns into runs of equal direction; each run but the last enumerates
//! distinct value groups by seeking, and the last run streams the rows of
//! the current group.
//!
//! ```text
//! columns:  a ASC | b c DESC | d ASC
//! levels:   0     | 1        | 2 (streams rows)
//! ```

use std::sync::Arc;

use crate::observability::Counter;
use crate::row::{IndexId, Row, RowType, RowTypeKind, Value};
use crate::storage::IndexStream;

use super::context::{Bindings, QueryContext};
use super::cursor::{BoxedCursor, ColumnSelector, Cursor, CursorLifecycle, CursorState, Operator};
use super::errors::{ExecError, ExecResult};
use super::ordering::RowOrdering;
use super::range::{IndexKeyRange, ResolvedRange};

/// Plan node scanning one index
#[derive(Debug)]
pub struct IndexScan {
    row_type: Arc<RowType>,
    index: IndexId,
    range: IndexKeyRange,
    /// Column ranges `[start, end)` of equal direction, with the direction
    runs: Vec<(usize, usize, bool)>,
}

impl IndexScan {
    /// Scan with one direction for every column
    pub fn new(row_type: Arc<RowType>, reverse: bool, range: IndexKeyRange) -> ExecResult<Self> {
        let ordering = RowOrdering::index_columns(&[!reverse]);
        Self::ordered(row_type, range, &ordering)
    }

    /// Scan with per-column directions.
    ///
    /// The ordering must list leading index columns in index order; columns
    /// it does not list inherit the direction of the last listed column.
    pub fn ordered(
        row_type: Arc<RowType>,
        range: IndexKeyRange,
        ordering: &RowOrdering,
    ) -> ExecResult<Self> {
        let index = match row_type.kind() {
            RowTypeKind::Index { index, .. } => *index,
            _ => {
                return Err(ExecError::argument(format!(
                    "index scan needs an index row type, got {}",
                    row_type
                )))
            }
        };
        let width = row_type.column_count();
        if ordering.len() > width {
            return Err(ExecError::argument(format!(
                "ordering has {} columns but {} has {}",
                ordering.len(),
                row_type,
                width
            )));
        }
        if range.max_bound_len() > width {
            return Err(ExecError::argument(format!(
                "range bound has {} columns but {} has {}",
                range.max_bound_len(),
                row_type,
                width
            )));
        }
        for (i, column) in ordering.columns().iter().enumerate() {
            if column.expr.field_position() != Some(i) {
                return Err(ExecError::argument(format!(
                    "index ordering column {} must be field {}",
                    i, i
                )));
            }
        }

        let last = ordering.columns().last().map_or(true, |c| c.ascending);
        let directions: Vec<bool> = (0..width)
            .map(|i| ordering.columns().get(i).map_or(last, |c| c.ascending))
            .collect();
        let mut runs: Vec<(usize, usize, bool)> = Vec::new();
        for (i, ascending) in directions.into_iter().enumerate() {
            match runs.last_mut() {
                Some(run) if run.2 == ascending => run.1 = i + 1,
                _ => runs.push((i, i + 1, ascending)),
            }
        }
        if runs.is_empty() {
            runs.push((0, 0, last));
        }

        Ok(Self {
            row_type,
            index,
            range,
            runs,
        })
    }
}

impl Operator for IndexScan {
    fn cursor(&self, ctx: &QueryContext) -> ExecResult<BoxedCursor> {
        Ok(Box::new(IndexScanCursor {
            ctx: ctx.clone(),
            lifecycle: CursorLifecycle::new("IndexScan"),
            index: self.index,
            range: self.range.clone(),
            runs: self.runs.clone(),
            resolved: ResolvedRange::default(),
            forward: None,
            reverse: None,
            levels: Vec::new(),
            groups: Vec::new(),
            depth: 0,
        }))
    }

    fn row_type(&self) -> Option<&Arc<RowType>> {
        Some(&self.row_type)
    }

    fn name(&self) -> &'static str {
        "IndexScan"
    }
}

/// How a level finds its next group or row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    /// Not entered under the current parent group yet
    Fresh,
    /// Seek past the current group
    Continue,
    /// Stream already positioned by a jump
    Positioned,
}

struct IndexScanCursor {
    ctx: QueryContext,
    lifecycle: CursorLifecycle,
    index: IndexId,
    range: IndexKeyRange,
    runs: Vec<(usize, usize, bool)>,
    resolved: ResolvedRange,
    forward: Option<Box<dyn IndexStream>>,
    reverse: Option<Box<dyn IndexStream>>,
    levels: Vec<Level>,
    /// Current group prefix of each non-last run
    groups: Vec<Vec<Value>>,
    /// Number of runs whose group is fixed
    depth: usize,
}

impl IndexScanCursor {
    fn last_level(&self) -> usize {
        self.runs.len() - 1
    }

    fn stream(&mut self, ascending: bool) -> ExecResult<&mut Box<dyn IndexStream>> {
        let slot = if ascending {
            &mut self.forward
        } else {
            &mut self.reverse
        };
        if slot.is_none() {
            *slot = Some(self.ctx.store().index_stream(self.index, !ascending)?);
        }
        slot.as_mut()
            .ok_or_else(|| ExecError::illegal_state("index stream unavailable"))
    }

    fn seek(&mut self, ascending: bool, key: &[Value], inclusive: bool) -> ExecResult<()> {
        self.ctx.count(Counter::IndexSeeks, 1);
        self.stream(ascending)?.seek(key, inclusive);
        Ok(())
    }

    fn advance(&mut self, ascending: bool) -> ExecResult<Option<Row>> {
        self.ctx.count(Counter::IndexAdvances, 1);
        Ok(self.stream(ascending)?.advance()?)
    }

    /// Positions the first level on the range bound it starts from
    fn seek_start(&mut self, ascending: bool) -> ExecResult<()> {
        let bound = if ascending {
            self.resolved.lo().map(|(k, inc)| (k.to_vec(), inc))
        } else {
            self.resolved.hi().map(|(k, inc)| (k.to_vec(), inc))
        };
        match bound {
            Some((key, inclusive)) => self.seek(ascending, &key, inclusive),
            None => self.seek(ascending, &[], true),
        }
    }

    fn parent_prefix(&self, level: usize) -> Vec<Value> {
        if level == 0 {
            Vec::new()
        } else {
            self.groups[level - 1].clone()
        }
    }

    /// Row has left the range in the direction of travel of level 0
    fn past_end(&self, row: &Row, ascending: bool) -> bool {
        if ascending {
            !self.resolved.admits_hi(row)
        } else {
            !self.resolved.admits_lo(row)
        }
    }

    /// Finds the next group of a non-last level; false when the level is done
    fn next_group(&mut self, level: usize) -> ExecResult<bool> {
        let (_, end, ascending) = self.runs[level];
        let parent = self.parent_prefix(level);
        match self.levels[level] {
            Level::Fresh if level == 0 => self.seek_start(ascending)?,
            Level::Fresh => self.seek(ascending, &parent, true)?,
            Level::Continue => {
                let current = self.groups[level].clone();
                self.seek(ascending, &current, false)?;
            }
            Level::Positioned => {}
        }
        self.levels[level] = Level::Continue;

        let row = match self.advance(ascending)? {
            Some(row) => row,
            None => return Ok(false),
        };
        if row.values()[..parent.len()] != parent[..] {
            return Ok(false);
        }
        if level == 0 && self.past_end(&row, ascending) {
            return Ok(false);
        }
        self.groups[level] = row.values()[..end].to_vec();
        Ok(true)
    }

    /// Next row of the last level within the current group
    fn next_in_group(&mut self) -> ExecResult<Option<Row>> {
        let level = self.last_level();
        let (_, _, ascending) = self.runs[level];
        let parent = self.parent_prefix(level);
        match self.levels[level] {
            Level::Fresh if level == 0 => self.seek_start(ascending)?,
            Level::Fresh => self.seek(ascending, &parent, true)?,
            Level::Continue | Level::Positioned => {}
        }
        self.levels[level] = Level::Continue;

        loop {
            self.ctx.check_interrupt()?;
            let row = match self.advance(ascending)? {
                Some(row) => row,
                None => return Ok(None),
            };
            if row.values()[..parent.len()] != parent[..] {
                return Ok(None);
            }
            if level == 0 {
                if self.past_end(&row, ascending) {
                    return Ok(None);
                }
                if !self.resolved.admits(&row) {
                    continue;
                }
            } else if !self.resolved.admits(&row) {
                continue;
            }
            return Ok(Some(row));
        }
    }

    fn reset_positions(&mut self) {
        let levels = self.runs.len();
        self.levels = vec![Level::Fresh; levels];
        self.groups = vec![Vec::new(); levels - 1];
        self.depth = 0;
    }
}

impl Cursor for IndexScanCursor {
    fn open(&mut self, bindings: &Bindings) -> ExecResult<()> {
        let resolved = self.range.evaluate(bindings)?;
        self.lifecycle.open(&self.ctx)?;
        self.resolved = resolved;
        self.reset_positions();
        Ok(())
    }

    fn next(&mut self) -> ExecResult<Option<Row>> {
        if !self.lifecycle.check_next()? {
            return Ok(None);
        }
        self.ctx.check_interrupt()?;
        let last = self.last_level();
        loop {
            if self.depth == last {
                if let Some(row) = self.next_in_group()? {
                    return Ok(Some(row));
                }
                if last == 0 {
                    self.lifecycle.exhaust();
                    return Ok(None);
                }
                self.depth -= 1;
            } else if self.next_group(self.depth)? {
                self.depth += 1;
                self.levels[self.depth] = Level::Fresh;
            } else if self.depth == 0 {
                self.lifecycle.exhaust();
                return Ok(None);
            } else {
                self.depth -= 1;
            }
        }
    }

    fn jump(&mut self, target: &Row, columns: ColumnSelector) -> ExecResult<()> {
        self.lifecycle.check_open()?;
        self.ctx.check_interrupt()?;
        let n = columns.count();
        if n > target.values().len() {
            return Err(ExecError::argument(format!(
                "jump selects {} columns of a {}-column row",
                n,
                target.values().len()
            )));
        }
        let key = &target.values()[..n];

        let last = self.last_level();
        let mut level = 0;
        while level < last && self.runs[level].1 <= n {
            self.groups[level] = key[..self.runs[level].1].to_vec();
            self.levels[level] = Level::Continue;
            level += 1;
        }
        self.depth = level;
        let (start, _, ascending) = self.runs[level];
        if n == start {
            self.levels[level] = Level::Fresh;
        } else {
            self.seek(ascending, key, true)?;
            self.levels[level] = Level::Positioned;
        }
        self.lifecycle.reactivate();
        Ok(())
    }

    fn close(&mut self) {
        self.forward = None;
        self.reverse = None;
        self.lifecycle.close();
    }

    fn state(&self) -> CursorState {
        self.lifecycle.state()
    }

    fn supports_jump(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "IndexScan"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::executor::cursor::drain;
    use crate::executor::expression::field;
    use crate::executor::range::IndexBound;
    use crate::row::ColumnType;
    use crate::schema::{ColumnDef, GroupSchema};
    use crate::storage::MemoryGroupStore;

    /// t(id, x, y) with an index on (x, y)
    fn setup() -> (QueryContext, Arc<RowType>) {
        let schema = GroupSchema::builder("g")
            .table(
                "t",
                None,
                vec![
                    ColumnDef::new("id", ColumnType::Int),
                    ColumnDef::new("x", ColumnType::Int),
                    ColumnDef::new("y", ColumnType::Int),
                ],
                &["id"],
                &[],
            )
            .index("t_xy", "t", &["x", "y"])
            .build()
            .unwrap();
        let schema = Arc::new(schema);
        let mut store = MemoryGroupStore::new(Arc::clone(&schema));
        let rows = [(1, 1, 1), (2, 1, 2), (3, 2, 1), (4, 2, 2), (5, 3, 1)];
        for (id, x, y) in rows {
            store
                .insert(1, vec![Value::Int(id), Value::Int(x), Value::Int(y)])
                .unwrap();
        }
        let index_type = schema.index_row_type(1).unwrap();
        (
            QueryContext::new(Arc::new(store), EngineConfig::default()),
            index_type,
        )
    }

    fn ids(rows: &[Row]) -> Vec<i32> {
        rows.iter()
            .map(|r| match r.values()[2] {
                Value::Int(id) => id,
                _ => panic!("unexpected id"),
            })
            .collect()
    }

    fn run(ctx: &QueryContext, scan: IndexScan) -> Vec<i32> {
        let mut cursor = scan.cursor(ctx).unwrap();
        ids(&drain(cursor.as_mut(), &Bindings::new()).unwrap())
    }

    #[test]
    fn test_forward_and_reverse() {
        let (ctx, row_type) = setup();
        let forward = IndexScan::new(Arc::clone(&row_type), false, IndexKeyRange::unbounded()).unwrap();
        let reverse = IndexScan::new(row_type, true, IndexKeyRange::unbounded()).unwrap();
        assert_eq!(run(&ctx, forward), vec![1, 2, 3, 4, 5]);
        assert_eq!(run(&ctx, reverse), vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_mixed_directions() {
        let (ctx, row_type) = setup();
        let asc_desc = RowOrdering::new().asc(field(0)).desc(field(1));
        let scan = IndexScan::ordered(Arc::clone(&row_type), IndexKeyRange::unbounded(), &asc_desc).unwrap();
        assert_eq!(run(&ctx, scan), vec![2, 1, 4, 3, 5]);

        let desc_asc = RowOrdering::new().desc(field(0)).asc(field(1));
        let scan = IndexScan::ordered(row_type, IndexKeyRange::unbounded(), &desc_asc).unwrap();
        assert_eq!(run(&ctx, scan), vec![5, 3, 4, 1, 2]);
    }

    #[test]
    fn test_mixed_directions_with_range() {
        let (ctx, row_type) = setup();
        let range = IndexKeyRange::bounded(
            IndexBound::of(vec![Value::Int(1), Value::Int(2)]),
            true,
            IndexBound::of(vec![Value::Int(2), Value::Int(1)]),
            true,
        );
        let ordering = RowOrdering::new().desc(field(0)).asc(field(1));
        let scan = IndexScan::ordered(row_type, range, &ordering).unwrap();
        assert_eq!(run(&ctx, scan), vec![3, 2]);
    }

    #[test]
    fn test_jump_forward() {
        let (ctx, row_type) = setup();
        let scan = IndexScan::new(Arc::clone(&row_type), false, IndexKeyRange::unbounded()).unwrap();
        let mut cursor = scan.cursor(&ctx).unwrap();
        cursor.open(&Bindings::new()).unwrap();
        assert_eq!(ids(&[cursor.next().unwrap().unwrap()]), vec![1]);

        let target = Row::new(row_type, vec![Value::Int(2), Value::Int(2), Value::Int(0)]);
        cursor.jump(&target, ColumnSelector::leading(2)).unwrap();
        assert_eq!(ids(&[cursor.next().unwrap().unwrap()]), vec![4]);
        assert_eq!(ids(&[cursor.next().unwrap().unwrap()]), vec![5]);
        assert!(cursor.next().unwrap().is_none());
        cursor.close();
    }

    #[test]
    fn test_rejects_non_index_type() {
        let row_type = RowType::values(vec![ColumnType::Int]);
        assert!(matches!(
            IndexScan::new(row_type, false, IndexKeyRange::unbounded()),
            Err(ExecError::Argument(_))
        ));
    }

    #[test]
    fn test_illegal_null_bound_fails_at_open() {
        let (ctx, row_type) = setup();
        let range = IndexKeyRange::ending_at(IndexBound::of(vec![Value::Null]), true);
        let scan = IndexScan::new(row_type, false, range).unwrap();
        let mut cursor = scan.cursor(&ctx).unwrap();
        assert!(matches!(
            cursor.open(&Bindings::new()),
            Err(ExecError::IllegalNullBound(_))
        ));
        assert_eq!(cursor.state(), CursorState::Closed);
    }
}
