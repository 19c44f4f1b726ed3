//! hgroup CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`. The command has
//! already printed its error object; the message also goes to stderr.

use hgroup::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
