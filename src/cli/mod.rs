//! CLI module for hgroup
//!
//! Provides command-line access to the executor over a JSON group fixture:
//! - scan: index scan with an optional key range
//! - group: full group scan in hkey order
//! - lookup: index scan feeding an ancestor/branch lookup

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, CommonArgs};
pub use commands::{execute, group, lookup, run, run_command, scan};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
