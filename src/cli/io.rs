//! JSON-lines I/O for the CLI
//!
//! - Input: one JSON request object per stdin line
//! - Output: one JSON response object per stdout line
//! - Blank input lines are skipped

use std::io::{self, BufRead, Write};

use serde::Serialize;

use super::errors::{CliError, CliResult};

#[derive(Serialize)]
struct OkResponse<'a, T: Serialize> {
    status: &'static str,
    data: &'a T,
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    status: &'static str,
    code: &'a str,
    message: &'a str,
}

/// Read request lines from a reader, skipping blank ones
pub fn read_lines<R: BufRead>(reader: R) -> impl Iterator<Item = CliResult<String>> {
    reader
        .lines()
        .map(|line| line.map_err(CliError::from))
        .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
}

/// Write a success response line
pub fn write_response<W: Write, T: Serialize>(out: &mut W, data: &T) -> CliResult<()> {
    serde_json::to_writer(
        &mut *out,
        &OkResponse {
            status: "ok",
            data,
        },
    )?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Write an error response line
pub fn write_error<W: Write>(out: &mut W, code: &str, message: &str) -> CliResult<()> {
    serde_json::to_writer(
        &mut *out,
        &ErrorResponse {
            status: "error",
            code,
            message,
        },
    )?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Stdin as a line reader
pub fn stdin_lines() -> impl Iterator<Item = CliResult<String>> {
    read_lines(io::stdin().lock())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_shapes() {
        let mut out = Vec::new();
        write_response(&mut out, &json!({"a": 1})).unwrap();
        write_error(&mut out, "RQL_MALFORMED_QUERY", "bad").unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], r#"{"status":"ok","data":{"a":1}}"#);
        assert_eq!(
            lines[1],
            r#"{"status":"error","code":"RQL_MALFORMED_QUERY","message":"bad"}"#
        );
    }

    #[test]
    fn test_blank_lines_skipped() {
        let input = "a\n\n  \nb\n";
        let lines: Vec<String> = read_lines(input.as_bytes()).map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["a", "b"]);
    }
}
