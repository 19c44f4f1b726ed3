//! CLI command implementations
//!
//! Every command loads a group fixture into a `MemoryGroupStore`, builds a
//! small plan through `executor::api` and prints the rows it produces.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value as JsonValue};

use crate::config::EngineConfig;
use crate::executor::{api, Bindings, IndexBound, IndexKeyRange, InputPreservation, OperatorRef, QueryContext, QueryExecutor};
use crate::observability::{log_event_with_fields, Event};
use crate::row::{RowType, TableId, Value};
use crate::schema::{GroupFixture, GroupSchema};
use crate::storage::{GroupStore, MemoryGroupStore};

use super::args::{Command, CommonArgs};
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Loaded fixture plus configuration
struct Session {
    store: Arc<dyn GroupStore>,
    config: EngineConfig,
}

impl Session {
    fn load(common: &CommonArgs) -> CliResult<Self> {
        let config = match &common.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        config.apply_logging()?;

        let fixture = load_fixture(&common.fixture)?;
        let store = MemoryGroupStore::from_fixture(&fixture)?;
        let rows = store.len().to_string();
        log_event_with_fields(
            Event::FixtureLoaded,
            &[("group", fixture.group.as_str()), ("rows", rows.as_str())],
        );

        Ok(Self {
            store: Arc::new(store),
            config,
        })
    }

    fn schema(&self) -> Arc<GroupSchema> {
        Arc::clone(self.store.schema())
    }

    fn execute(&self, plan: &OperatorRef, with_metrics: bool) -> CliResult<JsonValue> {
        let ctx = QueryContext::new(Arc::clone(&self.store), self.config.clone());
        let result = QueryExecutor::run(plan, &ctx, &Bindings::new())?;

        let mut data = json!({
            "query_id": result.query_id.to_string(),
            "count": result.len(),
            "elapsed_ms": result.elapsed_ms,
            "rows": result.rows_json(),
        });
        if with_metrics {
            if let Some(metrics) = &result.metrics {
                data["metrics"] = serde_json::to_value(metrics)?;
            }
        }
        Ok(data)
    }
}

fn load_fixture(path: &Path) -> CliResult<GroupFixture> {
    Ok(GroupFixture::load(path)?)
}

/// Parse arguments, run the command and print its response
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run a command, writing an ok or error response to stdout
pub fn run_command(cmd: Command) -> CliResult<()> {
    match execute(cmd) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Run a command and return its response data
pub fn execute(cmd: Command) -> CliResult<JsonValue> {
    match cmd {
        Command::Scan {
            common,
            index,
            reverse,
            lo,
            lo_exclusive,
            hi,
            hi_exclusive,
        } => {
            let lo = lo.map(|json| (json, !lo_exclusive));
            let hi = hi.map(|json| (json, !hi_exclusive));
            scan(&common, &index, reverse, lo, hi)
        }
        Command::Group { common } => group(&common),
        Command::Lookup {
            common,
            index,
            ancestors,
            branch,
            keep_input,
            quantum,
        } => lookup(&common, &index, &ancestors, branch.as_deref(), keep_input, quantum),
    }
}

/// Scan an index over an optional range.
///
/// Bounds are JSON arrays of leading key values paired with inclusivity.
pub fn scan(
    common: &CommonArgs,
    index: &str,
    reverse: bool,
    lo: Option<(String, bool)>,
    hi: Option<(String, bool)>,
) -> CliResult<JsonValue> {
    let session = Session::load(common)?;
    let schema = session.schema();
    let index_type = schema.index_row_type(schema.index_by_name(index)?.id)?;

    let lo = lo.map(|(json, inclusive)| parse_bound(&index_type, &json).map(|b| (b, inclusive)));
    let hi = hi.map(|(json, inclusive)| parse_bound(&index_type, &json).map(|b| (b, inclusive)));
    let range = match (lo.transpose()?, hi.transpose()?) {
        (None, None) => IndexKeyRange::unbounded(),
        (Some((lo, lo_inc)), None) => IndexKeyRange::starting_at(lo, lo_inc),
        (None, Some((hi, hi_inc))) => IndexKeyRange::ending_at(hi, hi_inc),
        (Some((lo, lo_inc)), Some((hi, hi_inc))) => IndexKeyRange::bounded(lo, lo_inc, hi, hi_inc),
    };

    let plan = api::index_scan_default(index_type, reverse, range)?;
    session.execute(&plan, common.metrics)
}

/// Dump the whole group in hkey order
pub fn group(common: &CommonArgs) -> CliResult<JsonValue> {
    let session = Session::load(common)?;
    let plan = api::group_scan_default()?;
    session.execute(&plan, common.metrics)
}

/// Scan an index and fetch ancestor and branch rows for every entry
pub fn lookup(
    common: &CommonArgs,
    index: &str,
    ancestors: &[String],
    branch: Option<&str>,
    keep_input: bool,
    quantum: Option<usize>,
) -> CliResult<JsonValue> {
    let session = Session::load(common)?;
    let schema = session.schema();
    let index_type = schema.index_row_type(schema.index_by_name(index)?.id)?;

    let ancestors = ancestors
        .iter()
        .map(|name| table_id(&schema, name))
        .collect::<CliResult<Vec<_>>>()?;
    let branch = branch.map(|name| table_id(&schema, name)).transpose()?;
    let preservation = if keep_input {
        InputPreservation::KeepInput
    } else {
        InputPreservation::DiscardInput
    };
    let quantum = quantum.unwrap_or(session.config.lookahead_quantum);

    let scan = api::index_scan_default(Arc::clone(&index_type), false, IndexKeyRange::unbounded())?;
    let plan = api::group_lookup_default(scan, &schema, index_type, &ancestors, branch, preservation, quantum)?;
    session.execute(&plan, common.metrics)
}

fn table_id(schema: &GroupSchema, name: &str) -> CliResult<TableId> {
    Ok(schema.table_by_name(name)?.id)
}

fn parse_bound(row_type: &RowType, json: &str) -> CliResult<IndexBound> {
    let parsed: JsonValue = serde_json::from_str(json)
        .map_err(|e| CliError::invalid_argument(format!("bound {}: {}", json, e)))?;
    let items = parsed
        .as_array()
        .ok_or_else(|| CliError::invalid_argument(format!("bound {} is not a JSON array", json)))?;
    if items.len() > row_type.column_count() {
        return Err(CliError::invalid_argument(format!(
            "bound {} has more values than {} has columns",
            json, row_type
        )));
    }

    let values = items
        .iter()
        .zip(row_type.columns())
        .map(|(item, column_type)| {
            Value::from_json(item, *column_type).ok_or_else(|| {
                CliError::invalid_argument(format!(
                    "{} is not a {} value",
                    item,
                    column_type.type_name()
                ))
            })
        })
        .collect::<CliResult<Vec<_>>>()?;
    Ok(IndexBound::of(values))
}
