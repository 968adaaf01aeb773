//! CLI argument definitions using clap
//!
//! Commands:
//! - rql compile --tables <dir> [--config <path>]
//! - rql explain --tables <dir> [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// rql - compile RQL query strings into native backend queries
#[derive(Parser, Debug)]
#[command(name = "rql")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile one request per stdin line
    Compile {
        /// Directory of table descriptor files
        #[arg(long)]
        tables: PathBuf,

        /// Path to compiler configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Explain partition-key plans, one request per stdin line
    Explain {
        /// Directory of table descriptor files
        #[arg(long)]
        tables: PathBuf,

        /// Path to compiler configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
