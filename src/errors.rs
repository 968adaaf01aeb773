//! # RQL Errors
//!
//! Error taxonomy shared by the parser and every backend compiler.
//!
//! Error codes:
//! - RQL_MALFORMED_QUERY
//! - RQL_UNKNOWN_FIELD
//! - RQL_UNSUPPORTED_OPERATOR
//! - RQL_UNSUPPORTED_SORT
//! - RQL_UNSUPPORTED_BACKEND
//! - RQL_INVALID_METADATA
//!
//! All errors are terminal for the request being compiled.

use thiserror::Error;

/// Result type for parsing and compilation
pub type RqlResult<T> = Result<T, RqlError>;

/// Parse and compile errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RqlError {
    /// Syntax, arity or dequoting error in the query string
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    /// Predicate or order names an attribute the table does not have
    #[error("Unknown field '{field}' on table '{table}'")]
    UnknownField { table: String, field: String },

    /// Operator not allowed for the attribute's role or backend
    #[error("Operator '{operator}' is not supported on field '{field}': {reason}")]
    UnsupportedOperator {
        operator: String,
        field: String,
        reason: String,
    },

    /// No access path can honor the requested order
    #[error("Cannot sort on field '{field}': {reason}")]
    UnsupportedSort { field: String, reason: String },

    /// No compiler registered for a backend
    #[error("No compiler registered for backend '{0}'")]
    UnsupportedBackend(String),

    /// Table metadata violates a structural invariant
    #[error("Invalid metadata for table '{table}': {reason}")]
    InvalidMetadata { table: String, reason: String },
}

impl RqlError {
    /// Create a malformed query error
    pub fn malformed(reason: impl Into<String>) -> Self {
        RqlError::MalformedQuery(reason.into())
    }

    /// Create an unknown field error
    pub fn unknown_field(table: impl Into<String>, field: impl Into<String>) -> Self {
        RqlError::UnknownField {
            table: table.into(),
            field: field.into(),
        }
    }

    /// Create an unsupported operator error
    pub fn unsupported_operator(
        operator: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        RqlError::UnsupportedOperator {
            operator: operator.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported sort error
    pub fn unsupported_sort(field: impl Into<String>, reason: impl Into<String>) -> Self {
        RqlError::UnsupportedSort {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid metadata error
    pub fn invalid_metadata(table: impl Into<String>, reason: impl Into<String>) -> Self {
        RqlError::InvalidMetadata {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            RqlError::MalformedQuery(_) => "RQL_MALFORMED_QUERY",
            RqlError::UnknownField { .. } => "RQL_UNKNOWN_FIELD",
            RqlError::UnsupportedOperator { .. } => "RQL_UNSUPPORTED_OPERATOR",
            RqlError::UnsupportedSort { .. } => "RQL_UNSUPPORTED_SORT",
            RqlError::UnsupportedBackend(_) => "RQL_UNSUPPORTED_BACKEND",
            RqlError::InvalidMetadata { .. } => "RQL_INVALID_METADATA",
        }
    }

    /// Returns the offending field, if the error names one
    pub fn field(&self) -> Option<&str> {
        match self {
            RqlError::UnknownField { field, .. }
            | RqlError::UnsupportedOperator { field, .. }
            | RqlError::UnsupportedSort { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Returns true if the error was caused by the client request
    /// rather than by inconsistent metadata or registry setup
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            RqlError::UnsupportedBackend(_) | RqlError::InvalidMetadata { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(RqlError::malformed("x").code(), "RQL_MALFORMED_QUERY");
        assert_eq!(
            RqlError::unknown_field("t", "f").code(),
            "RQL_UNKNOWN_FIELD"
        );
        assert_eq!(
            RqlError::unsupported_operator("gt", "hk", "range").code(),
            "RQL_UNSUPPORTED_OPERATOR"
        );
        assert_eq!(
            RqlError::unsupported_sort("name", "scan").code(),
            "RQL_UNSUPPORTED_SORT"
        );
    }

    #[test]
    fn test_field_accessor() {
        assert_eq!(RqlError::unknown_field("t", "rank").field(), Some("rank"));
        assert_eq!(RqlError::malformed("bad").field(), None);
    }

    #[test]
    fn test_error_display() {
        let err = RqlError::unsupported_sort("name", "full scans cannot be ordered");
        let display = format!("{}", err);
        assert!(display.contains("name"));
        assert!(display.contains("full scans"));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(RqlError::malformed("x").is_client_error());
        assert!(!RqlError::invalid_metadata("t", "no primary index").is_client_error());
    }
}
