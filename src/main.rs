//! rql CLI entry point
//!
//! Parses arguments and hands off to `cli::run`; errors go to stderr with a
//! non-zero exit code.

use rql::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
