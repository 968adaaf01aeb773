//! SQL dialects and identifier quoting

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::RqlError;

/// SQL flavour a table is served by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    /// Standard SQL, double-quoted identifiers
    Ansi,
    Postgres,
    /// Backtick-quoted identifiers
    MySql,
}

impl SqlDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlDialect::Ansi => "sql",
            SqlDialect::Postgres => "postgres",
            SqlDialect::MySql => "mysql",
        }
    }

    fn quote_char(&self) -> char {
        match self {
            SqlDialect::Ansi | SqlDialect::Postgres => '"',
            SqlDialect::MySql => '`',
        }
    }

    /// Quote one identifier, doubling embedded quote characters
    pub fn quote_ident(&self, ident: &str) -> String {
        let q = self.quote_char();
        let mut out = String::with_capacity(ident.len() + 2);
        out.push(q);
        for c in ident.chars() {
            if c == q {
                out.push(q);
            }
            out.push(c);
        }
        out.push(q);
        out
    }

    /// Qualified column reference such as `"t"."c"`
    pub fn qualify(&self, table: &str, column: &str) -> String {
        format!("{}.{}", self.quote_ident(table), self.quote_ident(column))
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SqlDialect {
    type Err = RqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sql" | "ansi" => Ok(SqlDialect::Ansi),
            "postgres" | "postgresql" | "pg" => Ok(SqlDialect::Postgres),
            "mysql" | "mariadb" => Ok(SqlDialect::MySql),
            _ => Err(RqlError::UnsupportedBackend(s.to_string())),
        }
    }
}
