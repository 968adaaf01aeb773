//! CLI module for rql
//!
//! Provides command-line interface for:
//! - compile: compile query strings read from stdin
//! - explain: explain partition-key plans read from stdin

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{compile, explain, run, run_command, Failure, Request, Session};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_lines, write_error, write_response};
