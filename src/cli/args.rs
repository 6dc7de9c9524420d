//! CLI argument definitions using clap
//!
//! Commands:
//! - aeroquery serve --config <path>
//! - aeroquery query --config <path> --bucket <name>
//! - aeroquery explain --config <path> --bucket <name>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aeroquery - cost-based streaming queries over document collections
#[derive(Parser, Debug)]
#[command(name = "aeroquery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load every configured collection and serve the HTTP API
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./aeroquery.json")]
        config: PathBuf,
    },

    /// Run one JSON-AST request from stdin and print the result set
    Query {
        /// Path to configuration file
        #[arg(long, default_value = "./aeroquery.json")]
        config: PathBuf,

        /// Collection to query
        #[arg(long)]
        bucket: String,
    },

    /// Print the candidate plans for one JSON-AST request from stdin
    Explain {
        /// Path to configuration file
        #[arg(long, default_value = "./aeroquery.json")]
        config: PathBuf,

        /// Collection to query
        #[arg(long)]
        bucket: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
