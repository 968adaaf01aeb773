//! CLI command implementations
//!
//! Both commands load the table descriptors once, then handle one request
//! per stdin line. A bad request produces an error line and the loop goes
//! on; only setup and I/O failures end the process.

use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::compiler::{CompiledQuery, CompilerRegistry};
use crate::config::RqlConfig;
use crate::errors::RqlError;
use crate::metadata::{Backend, MetadataLoader, Table};
use crate::model::{Conjunction, Predicate, Statement};
use crate::parser::Parser;
use crate::partition::{ExplainPlan, KeyConditionPlan, PartitionPlanner};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{stdin_lines, write_error, write_response};

/// One stdin request line
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    /// Table name
    pub table: String,
    /// Raw query string, e.g. `eq(city,Chandler)&order=-rank`
    #[serde(default)]
    pub query: String,
    /// Comma-delimited entity keys restricting the result
    #[serde(default)]
    pub keys: Option<String>,
}

/// Failure of a single request
#[derive(Debug)]
pub struct Failure {
    pub code: &'static str,
    pub message: String,
}

impl From<RqlError> for Failure {
    fn from(e: RqlError) -> Self {
        Self {
            code: e.code(),
            message: e.to_string(),
        }
    }
}

impl From<CliError> for Failure {
    fn from(e: CliError) -> Self {
        Self {
            code: e.code_str(),
            message: e.message().to_string(),
        }
    }
}

#[derive(Serialize)]
struct ExplainOutput<'a> {
    accepted: bool,
    plan: Option<&'a KeyConditionPlan>,
    explain: String,
}

/// Loaded tables plus configured compilers
pub struct Session {
    config: RqlConfig,
    tables: MetadataLoader,
    registry: CompilerRegistry,
}

impl Session {
    /// Load configuration and table descriptors
    pub fn open(tables_dir: &Path, config_path: Option<&Path>) -> CliResult<Self> {
        let config = match config_path {
            Some(path) => RqlConfig::load(path).map_err(|e| CliError::config_error(e.to_string()))?,
            None => RqlConfig::default(),
        };

        let mut tables = MetadataLoader::new(tables_dir);
        tables
            .load_all()
            .map_err(|e| CliError::metadata_error(e.to_string()))?;

        info!(
            event = "RQL_SESSION_OPENED",
            tables = tables.len(),
            dir = %tables.dir().display()
        );

        Ok(Self::new(config, tables))
    }

    pub fn new(config: RqlConfig, tables: MetadataLoader) -> Self {
        let registry = CompilerRegistry::with_defaults(&config);
        Self {
            config,
            tables,
            registry,
        }
    }

    fn table(&self, name: &str) -> Result<&Table, Failure> {
        self.tables
            .get(name)
            .ok_or_else(|| CliError::unknown_table(name).into())
    }

    /// Parse a request into a statement against its table
    pub fn statement(&self, request: &Request) -> Result<(Statement, &Table), Failure> {
        let table = self.table(&request.table)?;
        let parser = Parser::new(&self.config);
        let mut statement = parser.parse_query_string(table, &request.query)?;

        if let Some(keys) = request.keys.as_deref().filter(|k| !k.trim().is_empty()) {
            let key_predicate = parser.key_predicate(table, keys)?;
            if statement.conjunction == Conjunction::Or {
                let alternatives = std::mem::take(&mut statement.predicates);
                statement.predicates.push(Predicate::Or(alternatives));
                statement.conjunction = Conjunction::And;
            }
            statement.predicates.insert(0, key_predicate);
        }

        Ok((statement, table))
    }

    /// Compile one request line
    pub fn compile_line(&self, line: &str) -> Result<CompiledQuery, Failure> {
        let request = parse_request(line)?;
        let (statement, table) = self.statement(&request)?;
        Ok(self.registry.compile(&statement, table)?)
    }

    /// Explain one request line; planner rejections are explained, not failed
    pub fn explain_line<W: Write>(&self, line: &str, out: &mut W) -> CliResult<()> {
        let result = parse_request(line).and_then(|request| {
            let (statement, table) = self.statement(&request)?;
            if table.backend != Backend::PartitionKey {
                return Err(RqlError::UnsupportedBackend(format!(
                    "explain needs a partition_key table, '{}' is {}",
                    table.name, table.backend
                ))
                .into());
            }
            Ok(PartitionPlanner::new()
                .with_wildcard(self.config.wildcard)
                .plan(&statement, table))
        });

        match result {
            Ok(Ok(plan)) => write_response(
                out,
                &ExplainOutput {
                    accepted: true,
                    plan: Some(&plan),
                    explain: ExplainPlan::from_plan(&plan).to_string(),
                },
            ),
            Ok(Err(rejected)) => write_response(
                out,
                &ExplainOutput {
                    accepted: false,
                    plan: None,
                    explain: ExplainPlan::from_error(&rejected).to_string(),
                },
            ),
            Err(failure) => write_error(out, failure.code, &failure.message),
        }
    }
}

fn parse_request(line: &str) -> Result<Request, Failure> {
    serde_json::from_str(line)
        .map_err(|e| CliError::invalid_request(format!("Invalid request: {}", e)).into())
}

/// Parse arguments, install logging and run the chosen command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    install_tracing(&cli.log);
    run_command(cli.command)
}

fn install_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Dispatch a parsed command
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Compile { tables, config } => compile(&tables, config.as_deref()),
        Command::Explain { tables, config } => explain(&tables, config.as_deref()),
    }
}

/// Compile requests from stdin
pub fn compile(tables: &Path, config: Option<&Path>) -> CliResult<()> {
    let session = Session::open(tables, config)?;
    let mut stdout = io::stdout().lock();

    for line in stdin_lines() {
        let line = line?;
        match session.compile_line(&line) {
            Ok(compiled) => write_response(&mut stdout, &compiled)?,
            Err(failure) => {
                warn!(event = "RQL_REQUEST_FAILED", code = failure.code, message = %failure.message);
                write_error(&mut stdout, failure.code, &failure.message)?
            }
        }
    }

    Ok(())
}

/// Explain partition plans for requests from stdin
pub fn explain(tables: &Path, config: Option<&Path>) -> CliResult<()> {
    let session = Session::open(tables, config)?;
    let mut stdout = io::stdout().lock();

    for line in stdin_lines() {
        session.explain_line(&line?, &mut stdout)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Column, Index};
    use crate::sql::SqlDialect;
    use serde_json::Value;
    use tempfile::TempDir;

    fn session() -> (TempDir, Session) {
        let dir = TempDir::new().unwrap();
        let mut tables = MetadataLoader::new(dir.path());
        tables
            .register(
                Table::new("places", Backend::Sql(SqlDialect::Ansi))
                    .with_column(Column::key("id", "BIGINT"))
                    .with_column(Column::new("city", "VARCHAR")),
            )
            .unwrap();
        tables
            .register(
                Table::new("orders", Backend::PartitionKey)
                    .with_index(Index::primary("hk", Some("sk"))),
            )
            .unwrap();
        (dir, Session::new(RqlConfig::default(), tables))
    }

    #[test]
    fn test_compile_line() {
        let (_dir, session) = session();
        let compiled = session
            .compile_line(r#"{"table": "places", "query": "city=Chandler", "keys": "1,2"}"#)
            .unwrap();
        let sql = compiled.as_sql().unwrap();
        assert_eq!(
            sql.sql,
            "SELECT \"places\".* FROM \"places\" WHERE (\"places\".\"id\" IN (?, ?) AND \"places\".\"city\" = ?) ORDER BY \"places\".\"id\" ASC LIMIT 100"
        );
    }

    #[test]
    fn test_request_failures() {
        let (_dir, session) = session();
        let err = session.compile_line(r#"{"table": "nope"}"#).unwrap_err();
        assert_eq!(err.code, "RQL_CLI_UNKNOWN_TABLE");

        let err = session.compile_line("not json").unwrap_err();
        assert_eq!(err.code, "RQL_CLI_INVALID_REQUEST");

        let err = session
            .compile_line(r#"{"table": "places", "query": "eq(zip,1)"}"#)
            .unwrap_err();
        assert_eq!(err.code, "RQL_UNKNOWN_FIELD");
    }

    #[test]
    fn test_explain_line() {
        let (_dir, session) = session();
        let mut out = Vec::new();
        session
            .explain_line(r#"{"table": "orders", "query": "eq(hk,'42')"}"#, &mut out)
            .unwrap();
        session
            .explain_line(r#"{"table": "orders", "query": "eq(color,red)&order=color"}"#, &mut out)
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["data"]["accepted"], Value::Bool(true));
        assert_eq!(lines[0]["data"]["plan"]["index"], "primary");
        assert_eq!(lines[1]["data"]["accepted"], Value::Bool(false));
        assert!(lines[1]["data"]["explain"]
            .as_str()
            .unwrap()
            .contains("RQL_UNSUPPORTED_SORT"));
    }
}
