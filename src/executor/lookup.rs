//! Ancestor, branch and group lookups
//!
//! A lookup takes rows of one input type (table rows, or index rows, which
//! determine their table's hkey) and fetches related group rows by hkey:
//!
//! - ancestors: the rows of requested ancestor tables, root first
//! - branch: the rows of an output table and its descendants under the input
//! - group: ancestors followed by a branch
//!
//! Output for one input row is ancestors, then the input row itself when it
//! is kept, then branch rows. Rows of other types pass through unchanged.
//! Nothing is deduplicated: two inputs under the same parent fetch and emit
//! that parent twice.
//!
//! The default form reads an input operator, expanding up to the lookahead
//! quantum of input rows per refill. The nested form reads one bound row
//! per open, for use as the inner side of a nested-loop map.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::observability::Counter;
use crate::row::{HKey, Row, RowType, RowTypeKind, TableId};
use crate::schema::GroupSchema;

use super::context::{Bindings, QueryContext};
use super::cursor::{BoxedCursor, Cursor, CursorLifecycle, CursorState, Operator, OperatorRef};
use super::errors::{ExecError, ExecResult};

/// Whether a lookup emits its input rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPreservation {
    DiscardInput,
    KeepInput,
}

/// Where a lookup's input rows come from
#[derive(Debug, Clone)]
pub enum LookupSource {
    /// Rows of an input operator
    Input(OperatorRef),
    /// The row bound at a position by an enclosing map
    Binding(usize),
}

/// What to fetch for each input row
#[derive(Debug, Clone, Default)]
pub struct LookupPlan {
    /// Ancestor (or same) tables
    pub ancestors: Vec<TableId>,
    /// Output table of a branch lookup
    pub branch: Option<TableId>,
}

#[derive(Debug)]
struct LookupSpec {
    name: &'static str,
    schema: Arc<GroupSchema>,
    input_type: Arc<RowType>,
    /// (table, hkey depth), root first
    ancestors: Vec<(TableId, usize)>,
    /// Tables a branch lookup emits
    branch_tables: Option<Vec<TableId>>,
    keep_input: bool,
    quantum: usize,
}

/// Hkey lookup operator
#[derive(Debug)]
pub struct LookupOperator {
    source: LookupSource,
    spec: Arc<LookupSpec>,
}

impl LookupOperator {
    /// Validates the plan against the schema
    pub fn new(
        name: &'static str,
        source: LookupSource,
        schema: Arc<GroupSchema>,
        input_type: Arc<RowType>,
        plan: LookupPlan,
        preservation: InputPreservation,
        quantum: usize,
    ) -> ExecResult<Self> {
        if quantum == 0 {
            return Err(ExecError::argument(format!(
                "{} lookahead quantum must be positive",
                name
            )));
        }
        let input_table = input_type.table_id().ok_or_else(|| {
            ExecError::argument(format!("{} input {} is not a group row type", name, input_type))
        })?;
        if plan.ancestors.is_empty() && plan.branch.is_none() {
            return Err(ExecError::argument(format!("{} has nothing to look up", name)));
        }

        let mut ancestors = Vec::with_capacity(plan.ancestors.len());
        for table in &plan.ancestors {
            schema.table(*table)?;
            if !schema.is_ancestor_or_self(*table, input_table) {
                return Err(ExecError::argument(format!(
                    "table {} is not an ancestor of {}",
                    schema.table(*table)?.name,
                    input_type
                )));
            }
            let entry = (*table, schema.depth(*table)?);
            if !ancestors.contains(&entry) {
                ancestors.push(entry);
            }
        }
        ancestors.sort_by_key(|(_, depth)| *depth);

        let branch_tables = match plan.branch {
            Some(output) => {
                schema.table(output)?;
                if !schema.is_ancestor_or_self(input_table, output) {
                    return Err(ExecError::argument(format!(
                        "branch output {} is not {} or one of its descendants",
                        schema.table(output)?.name,
                        input_type
                    )));
                }
                let mut tables = vec![output];
                tables.extend(schema.descendants_of(output));
                Some(tables)
            }
            None => None,
        };

        Ok(Self {
            source,
            spec: Arc::new(LookupSpec {
                name,
                schema,
                input_type,
                ancestors,
                branch_tables,
                keep_input: preservation == InputPreservation::KeepInput,
                quantum,
            }),
        })
    }
}

impl Operator for LookupOperator {
    fn cursor(&self, ctx: &QueryContext) -> ExecResult<BoxedCursor> {
        let input = match &self.source {
            LookupSource::Input(op) => Some(op.cursor(ctx)?),
            LookupSource::Binding(_) => None,
        };
        let binding = match &self.source {
            LookupSource::Binding(position) => Some(*position),
            LookupSource::Input(_) => None,
        };
        Ok(Box::new(LookupCursor {
            ctx: ctx.clone(),
            lifecycle: CursorLifecycle::new(self.spec.name),
            spec: Arc::clone(&self.spec),
            input,
            binding,
            bound: None,
            pending: VecDeque::new(),
            input_done: false,
        }))
    }

    fn row_type(&self) -> Option<&Arc<RowType>> {
        None
    }

    fn name(&self) -> &'static str {
        self.spec.name
    }
}

struct LookupCursor {
    ctx: QueryContext,
    lifecycle: CursorLifecycle,
    spec: Arc<LookupSpec>,
    input: Option<BoxedCursor>,
    binding: Option<usize>,
    /// Bound row not yet expanded
    bound: Option<Row>,
    pending: VecDeque<Row>,
    input_done: bool,
}

impl LookupCursor {
    fn input_hkey(&self, row: &Row) -> ExecResult<HKey> {
        if let Some(hkey) = row.hkey() {
            return Ok(hkey.clone());
        }
        match row.row_type().kind() {
            RowTypeKind::Index { index, .. } => {
                Ok(self.spec.schema.hkey_for_index_row(*index, row.values())?)
            }
            _ => Err(ExecError::illegal_state(format!(
                "{} input row {} has no hkey",
                self.spec.name, row
            ))),
        }
    }

    /// Appends the lookup output for one input row
    fn expand(&mut self, row: Row) -> ExecResult<()> {
        if row.row_type() != &self.spec.input_type {
            self.pending.push_back(row);
            return Ok(());
        }
        let hkey = self.input_hkey(&row)?;
        let store = Arc::clone(self.ctx.store());

        for (_, depth) in &self.spec.ancestors {
            if *depth > hkey.depth() {
                continue;
            }
            self.ctx.count(Counter::AncestorLookups, 1);
            if let Some(ancestor) = store.row_at(&hkey.truncate(*depth))? {
                self.pending.push_back(ancestor);
            }
        }
        if self.spec.keep_input {
            self.pending.push_back(row);
        }
        if let Some(tables) = &self.spec.branch_tables {
            self.ctx.count(Counter::BranchLookups, 1);
            let mut branch = store.branch(&hkey)?;
            while let Some(descendant) = branch.advance()? {
                let wanted = descendant
                    .row_type()
                    .table_id()
                    .map_or(false, |t| tables.contains(&t));
                if wanted {
                    self.pending.push_back(descendant);
                }
            }
        }
        Ok(())
    }

    /// Expands up to a quantum of input rows
    fn refill(&mut self) -> ExecResult<()> {
        if self.binding.is_some() {
            if let Some(row) = self.bound.take() {
                self.expand(row)?;
            }
            self.input_done = true;
            return Ok(());
        }
        for _ in 0..self.spec.quantum {
            let next = match self.input.as_mut() {
                Some(input) => input.next()?,
                None => None,
            };
            match next {
                Some(row) => self.expand(row)?,
                None => {
                    self.input_done = true;
                    break;
                }
            }
        }
        Ok(())
    }

    fn start(&mut self, bindings: &Bindings, top_level: bool) -> ExecResult<()> {
        self.pending.clear();
        self.input_done = false;
        self.bound = None;
        if let Some(position) = self.binding {
            self.bound = Some(bindings.require(position)?.clone());
            if self.spec.quantum > 1 {
                self.refill()?;
            }
        } else if let Some(input) = self.input.as_mut() {
            if top_level {
                input.open_top_level(bindings)?;
            } else {
                input.open(bindings)?;
            }
        }
        Ok(())
    }

    fn open_with(&mut self, bindings: &Bindings, top_level: bool) -> ExecResult<()> {
        self.lifecycle.open(&self.ctx)?;
        if let Err(e) = self.start(bindings, top_level) {
            self.stop(top_level);
            return Err(e);
        }
        Ok(())
    }

    fn stop(&mut self, top_level: bool) {
        if self.lifecycle.state().is_open() {
            if let Some(input) = self.input.as_mut() {
                if top_level {
                    input.close_top_level();
                } else {
                    input.close();
                }
            }
        }
        self.pending.clear();
        self.bound = None;
        self.lifecycle.close();
    }
}

impl Cursor for LookupCursor {
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
            if let Some(row) = self.pending.pop_front() {
                return Ok(Some(row));
            }
            if self.input_done {
                self.lifecycle.exhaust();
                return Ok(None);
            }
            self.refill()?;
        }
    }

    fn close(&mut self) {
        self.stop(false);
    }

    fn close_top_level(&mut self) {
        self.stop(true);
    }

    fn state(&self) -> CursorState {
        self.lifecycle.state()
    }

    fn name(&self) -> &'static str {
        self.spec.name
    }
}
