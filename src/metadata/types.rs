//! Table, column and index metadata.
//!
//! Produced by schema reflection elsewhere; the compilers only read it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::errors::{RqlError, RqlResult};
use crate::model::Literal;
use crate::sql::SqlDialect;

/// Store a table lives in, which picks its compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Backend {
    /// Row store with SQL semantics
    Sql(SqlDialect),
    /// Partition/sort-key wide-column store
    PartitionKey,
    /// Document search engine
    Search,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Sql(dialect) => dialect.as_str(),
            Backend::PartitionKey => "partition_key",
            Backend::Search => "search",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Backend {
    type Err = RqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "partition_key" | "dynamo" | "dynamodb" => Ok(Backend::PartitionKey),
            "search" | "elastic" | "elasticsearch" => Ok(Backend::Search),
            other => SqlDialect::from_str(other)
                .map(Backend::Sql)
                .map_err(|_| RqlError::UnsupportedBackend(s.to_string())),
        }
    }
}

impl TryFrom<String> for Backend {
    type Error = RqlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Backend> for String {
    fn from(backend: Backend) -> Self {
        backend.as_str().to_string()
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Backend type name (informational)
    #[serde(rename = "type", default)]
    pub column_type: String,
    /// Whether the column accepts nulls
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Part of the primary key
    #[serde(default)]
    pub is_key: bool,
}

fn default_nullable() -> bool {
    true
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            nullable: true,
            is_key: false,
        }
    }

    /// Create a non-null key column
    pub fn key(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            nullable: false,
            is_key: true,
            ..Self::new(name, column_type)
        }
    }

    /// Bind a literal compared against this column.
    ///
    /// Numeric types (`N`, `number`, `int`, ...) bind numbers and `BOOL` /
    /// `boolean` binds booleans; any other declared type binds the text as a
    /// string. Without a declared type the literal's own reading is used.
    /// Unquoted `null` is always null.
    pub fn bind(&self, literal: &Literal) -> RqlResult<Value> {
        if literal.is_null() {
            return Ok(Value::Null);
        }
        let text = literal.as_str();
        match self.column_type.to_ascii_lowercase().as_str() {
            "" => Ok(literal.to_json()),
            "n" | "number" | "int" | "integer" | "bigint" | "smallint" | "long" | "decimal"
            | "numeric" | "float" | "double" | "real" => text
                .parse::<i64>()
                .map(Number::from)
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(Number::from_f64))
                .map(Value::Number)
                .ok_or_else(|| self.mismatch(text)),
            "bool" | "boolean" => {
                if text.eq_ignore_ascii_case("true") {
                    Ok(Value::Bool(true))
                } else if text.eq_ignore_ascii_case("false") {
                    Ok(Value::Bool(false))
                } else {
                    Err(self.mismatch(text))
                }
            }
            _ => Ok(Value::String(text.to_string())),
        }
    }

    fn mismatch(&self, text: &str) -> RqlError {
        RqlError::malformed(format!(
            "'{}' is not a valid {} value for column '{}'",
            text, self.column_type, self.name
        ))
    }
}

/// Index role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    #[serde(alias = "PRIMARY")]
    Primary,
    #[serde(alias = "localsecondary")]
    LocalSecondary,
    #[serde(alias = "globalsecondary")]
    GlobalSecondary,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Primary => "primary",
            IndexKind::LocalSecondary => "local_secondary",
            IndexKind::GlobalSecondary => "global_secondary",
        }
    }
}

/// Index definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Index name
    pub name: String,
    /// Index role
    pub kind: IndexKind,
    /// Partition (hash) key attribute
    pub partition_key: String,
    /// Sort (range) key attribute
    #[serde(default)]
    pub sort_key: Option<String>,
    /// Indexed or projected columns
    #[serde(default)]
    pub columns: Vec<String>,
}

impl Index {
    pub fn new(
        name: impl Into<String>,
        kind: IndexKind,
        partition_key: impl Into<String>,
        sort_key: Option<&str>,
    ) -> Self {
        let partition_key = partition_key.into();
        let sort_key = sort_key.map(str::to_string);
        let mut columns = vec![partition_key.clone()];
        columns.extend(sort_key.clone());
        Self {
            name: name.into(),
            kind,
            partition_key,
            sort_key,
            columns,
        }
    }

    /// The table's primary index
    pub fn primary(partition_key: impl Into<String>, sort_key: Option<&str>) -> Self {
        Self::new("primary", IndexKind::Primary, partition_key, sort_key)
    }

    pub fn is_primary(&self) -> bool {
        self.kind == IndexKind::Primary
    }

    /// Returns true if `field` is this index's sort key
    pub fn has_sort_key(&self, field: &str) -> bool {
        self.sort_key
            .as_deref()
            .is_some_and(|sk| sk.eq_ignore_ascii_case(field))
    }
}

/// Table metadata snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table or collection name
    pub name: String,
    /// Store the table lives in
    pub backend: Backend,
    /// Columns
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Indexes
    #[serde(default)]
    pub indexes: Vec<Index>,
}

impl Table {
    pub fn new(name: impl Into<String>, backend: Backend) -> Self {
        Self {
            name: name.into(),
            backend,
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Case-insensitive column lookup
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Bind a literal compared against `field`, typed by its column when
    /// the column is declared
    pub fn bind_value(&self, field: &str, literal: &Literal) -> RqlResult<Value> {
        match self.find_column(field) {
            Some(column) => column.bind(literal),
            None => Ok(literal.to_json()),
        }
    }

    /// The primary index, if declared
    pub fn primary_index(&self) -> Option<&Index> {
        self.indexes.iter().find(|idx| idx.is_primary())
    }

    /// Primary key column names.
    ///
    /// Columns flagged `is_key` win; otherwise the primary index keys.
    pub fn key_columns(&self) -> Vec<&str> {
        let flagged: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| c.is_key)
            .map(|c| c.name.as_str())
            .collect();
        if !flagged.is_empty() {
            return flagged;
        }

        match self.primary_index() {
            Some(idx) => {
                let mut keys = vec![idx.partition_key.as_str()];
                keys.extend(idx.sort_key.as_deref());
                keys
            }
            None => Vec::new(),
        }
    }

    /// Validate structural invariants
    pub fn validate(&self) -> RqlResult<()> {
        if self.name.trim().is_empty() {
            return Err(RqlError::invalid_metadata("<unnamed>", "table name is empty"));
        }

        let primaries = self.indexes.iter().filter(|idx| idx.is_primary()).count();
        if self.backend == Backend::PartitionKey && primaries != 1 {
            return Err(RqlError::invalid_metadata(
                &self.name,
                format!("expected exactly one primary index, found {}", primaries),
            ));
        }
        if primaries > 1 {
            return Err(RqlError::invalid_metadata(
                &self.name,
                "more than one primary index",
            ));
        }

        for idx in &self.indexes {
            if idx.partition_key.trim().is_empty() {
                return Err(RqlError::invalid_metadata(
                    &self.name,
                    format!("index '{}' has no partition key", idx.name),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_backend_parse() {
        assert_eq!("dynamo".parse::<Backend>().unwrap(), Backend::PartitionKey);
        assert_eq!("Elastic".parse::<Backend>().unwrap(), Backend::Search);
        assert_eq!(
            "mysql".parse::<Backend>().unwrap(),
            Backend::Sql(SqlDialect::MySql)
        );
        assert!("redis".parse::<Backend>().is_err());
    }

    #[test]
    fn test_key_columns_fall_back_to_primary_index() {
        let table = Table::new("orders", Backend::PartitionKey)
            .with_index(Index::primary("hk", Some("sk")));
        assert_eq!(table.key_columns(), vec!["hk", "sk"]);

        let sql = Table::new("t", Backend::Sql(SqlDialect::Ansi))
            .with_column(Column::key("id", "BIGINT"))
            .with_column(Column::new("city", "VARCHAR"));
        assert_eq!(sql.key_columns(), vec!["id"]);
    }

    #[test]
    fn test_partition_table_requires_one_primary() {
        let table = Table::new("orders", Backend::PartitionKey);
        assert!(matches!(
            table.validate(),
            Err(RqlError::InvalidMetadata { .. })
        ));

        let table = table.with_index(Index::primary("hk", None));
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_table_json_shape() {
        let json = r#"{
            "name": "orders",
            "backend": "dynamo",
            "indexes": [
                {"name": "primary", "kind": "primary", "partition_key": "hk", "sort_key": "sk"},
                {"name": "by_status", "kind": "globalsecondary", "partition_key": "status"}
            ]
        }"#;
        let table: Table = serde_json::from_str(json).unwrap();
        assert_eq!(table.backend, Backend::PartitionKey);
        assert_eq!(table.indexes[1].kind, IndexKind::GlobalSecondary);
        assert_eq!(table.indexes[1].sort_key, None);
    }

    #[test]
    fn test_find_column_case_insensitive() {
        let table = Table::new("t", Backend::Sql(SqlDialect::Postgres))
            .with_column(Column::new("City", "VARCHAR"));
        assert_eq!(table.find_column("city").map(|c| c.name.as_str()), Some("City"));
        assert!(table.find_column("rank").is_none());
    }

    #[test]
    fn test_bind_by_column_type() {
        let table = Table::new("orders", Backend::PartitionKey)
            .with_column(Column::new("hk", "S"))
            .with_column(Column::new("total", "N"))
            .with_column(Column::new("paid", "BOOL"))
            .with_column(Column::new("note", ""));

        assert_eq!(table.bind_value("hk", &Literal::bare("2024")).unwrap(), json!("2024"));
        assert_eq!(table.bind_value("total", &Literal::quoted("42")).unwrap(), json!(42));
        assert_eq!(table.bind_value("total", &Literal::bare("4.5")).unwrap(), json!(4.5));
        assert_eq!(table.bind_value("PAID", &Literal::bare("TRUE")).unwrap(), json!(true));
        assert_eq!(table.bind_value("hk", &Literal::bare("null")).unwrap(), Value::Null);
        // untyped and unknown columns read the literal itself
        assert_eq!(table.bind_value("note", &Literal::bare("7")).unwrap(), json!(7));
        assert_eq!(table.bind_value("other", &Literal::bare("07")).unwrap(), json!("07"));
    }

    #[test]
    fn test_bind_rejects_mismatched_value() {
        let column = Column::new("total", "N");
        let err = column.bind(&Literal::bare("abc")).unwrap_err();
        assert_eq!(err.code(), "RQL_MALFORMED_QUERY");
        assert!(Column::new("paid", "BOOL").bind(&Literal::bare("yes")).is_err());
    }
}
