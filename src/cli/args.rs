//! CLI argument definitions using clap
//!
//! Commands:
//! - hgroup scan --fixture <path> --index <name> [--reverse] [--lo <json>] [--hi <json>]
//! - hgroup group --fixture <path>
//! - hgroup lookup --fixture <path> --index <name> [--ancestors <t,..>] [--branch <t>]

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// hgroup - ordered query execution over hierarchical table groups
#[derive(Parser, Debug)]
#[command(name = "hgroup")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Group fixture (schema plus rows)
    #[arg(long)]
    pub fixture: PathBuf,

    /// Engine configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Include execution counters in the output
    #[arg(long)]
    pub metrics: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan an index, optionally over a key range
    Scan {
        #[command(flatten)]
        common: CommonArgs,

        /// Index name
        #[arg(long)]
        index: String,

        /// Scan in descending order
        #[arg(long)]
        reverse: bool,

        /// Lower bound as a JSON array of leading key values
        #[arg(long)]
        lo: Option<String>,

        /// Exclude keys equal to the lower bound
        #[arg(long)]
        lo_exclusive: bool,

        /// Upper bound as a JSON array of leading key values
        #[arg(long)]
        hi: Option<String>,

        /// Exclude keys equal to the upper bound
        #[arg(long)]
        hi_exclusive: bool,
    },

    /// Dump every group row in hkey order
    Group {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Scan an index and look up ancestors and/or a branch per row
    Lookup {
        #[command(flatten)]
        common: CommonArgs,

        /// Index name
        #[arg(long)]
        index: String,

        /// Ancestor tables to fetch, comma separated
        #[arg(long, value_delimiter = ',')]
        ancestors: Vec<String>,

        /// Table whose branch rows to fetch
        #[arg(long)]
        branch: Option<String>,

        /// Emit the index row too
        #[arg(long)]
        keep_input: bool,

        /// Lookahead quantum; defaults to the configured one
        #[arg(long)]
        quantum: Option<usize>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
