//! CLI module for aeroquery
//!
//! Provides command-line interface for:
//! - serve: Load collections and serve the HTTP API
//! - query: One-shot query execution
//! - explain: One-shot explain

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{explain, query, run_command, run_explain, run_query, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_json};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}
