//! CLI error types
//!
//! These end the process. Errors from a single request line are reported
//! on stdout instead and the loop moves on.

use std::io;

use thiserror::Error;

use crate::errors::RqlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// `--config` file unreadable or invalid
    ConfigError,
    /// Table descriptors could not be loaded
    MetadataError,
    /// stdin/stdout failure
    IoError,
    /// Request line is not a valid request object
    InvalidRequest,
    /// Request names a table that was not loaded
    UnknownTable,
}

impl CliErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "RQL_CLI_CONFIG_ERROR",
            Self::MetadataError => "RQL_CLI_METADATA_ERROR",
            Self::IoError => "RQL_CLI_IO_ERROR",
            Self::InvalidRequest => "RQL_CLI_INVALID_REQUEST",
            Self::UnknownTable => "RQL_CLI_UNKNOWN_TABLE",
        }
    }
}

#[derive(Debug, Error)]
#[error("{}: {message}", .code.code())]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn metadata_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::MetadataError, msg)
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidRequest, msg)
    }

    pub fn unknown_table(table: &str) -> Self {
        Self::new(
            CliErrorCode::UnknownTable,
            format!("Table '{}' is not defined", table),
        )
    }

    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    /// `RQL_CLI_*` code written on error lines
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::new(CliErrorCode::IoError, e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(CliErrorCode::IoError, format!("JSON error: {}", e))
    }
}

impl From<RqlError> for CliError {
    fn from(e: RqlError) -> Self {
        match e {
            RqlError::InvalidMetadata { .. } => Self::metadata_error(e.to_string()),
            other => Self::invalid_request(other.to_string()),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(CliError::unknown_table("x").code_str(), "RQL_CLI_UNKNOWN_TABLE");
        let err: CliError = RqlError::invalid_metadata("t", "no primary").into();
        assert_eq!(err.code(), CliErrorCode::MetadataError);
        assert!(err.to_string().starts_with("RQL_CLI_METADATA_ERROR"));
    }

    #[test]
    fn test_io_error_conversion() {
        let err: CliError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed").into();
        assert_eq!(err.code_str(), "RQL_CLI_IO_ERROR");
        assert_eq!(err.message(), "pipe closed");
    }
}
