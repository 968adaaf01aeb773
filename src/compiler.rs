//! # Compiler Registry
//!
//! Every backend compiler implements `Compiler`. The registry holds one
//! compiler per backend and dispatches on the table's backend; there is no
//! global registration.

use std::collections::HashMap;

use serde::Serialize;
use tracing::trace;

use crate::config::RqlConfig;
use crate::errors::{RqlError, RqlResult};
use crate::metadata::{Backend, Table};
use crate::model::Statement;
use crate::partition::{KeyConditionPlan, PartitionPlanner};
use crate::search::{SearchCompiler, SearchRequest};
use crate::sql::{SqlCompiler, SqlDialect, SqlQuery};

/// Native query produced by a backend compiler
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "query", rename_all = "snake_case")]
pub enum CompiledQuery {
    Sql(SqlQuery),
    KeyCondition(KeyConditionPlan),
    Search(SearchRequest),
}

impl CompiledQuery {
    pub fn as_sql(&self) -> Option<&SqlQuery> {
        match self {
            CompiledQuery::Sql(q) => Some(q),
            _ => None,
        }
    }

    pub fn as_key_condition(&self) -> Option<&KeyConditionPlan> {
        match self {
            CompiledQuery::KeyCondition(plan) => Some(plan),
            _ => None,
        }
    }

    pub fn as_search(&self) -> Option<&SearchRequest> {
        match self {
            CompiledQuery::Search(req) => Some(req),
            _ => None,
        }
    }
}

/// A backend compiler
pub trait Compiler: Send + Sync {
    /// Backend this compiler serves
    fn backend(&self) -> Backend;

    /// Compile a statement against a table of this backend
    fn compile(&self, statement: &Statement, table: &Table) -> RqlResult<CompiledQuery>;
}

impl Compiler for SqlCompiler {
    fn backend(&self) -> Backend {
        Backend::Sql(self.dialect())
    }

    fn compile(&self, statement: &Statement, table: &Table) -> RqlResult<CompiledQuery> {
        SqlCompiler::compile(self, statement, table).map(CompiledQuery::Sql)
    }
}

impl Compiler for PartitionPlanner {
    fn backend(&self) -> Backend {
        Backend::PartitionKey
    }

    fn compile(&self, statement: &Statement, table: &Table) -> RqlResult<CompiledQuery> {
        self.plan(statement, table).map(CompiledQuery::KeyCondition)
    }
}

impl Compiler for SearchCompiler {
    fn backend(&self) -> Backend {
        Backend::Search
    }

    fn compile(&self, statement: &Statement, table: &Table) -> RqlResult<CompiledQuery> {
        SearchCompiler::compile(self, statement, table).map(CompiledQuery::Search)
    }
}

/// Backend → compiler lookup
#[derive(Default)]
pub struct CompilerRegistry {
    compilers: HashMap<Backend, Box<dyn Compiler>>,
}

impl CompilerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in compiler
    pub fn with_defaults(config: &RqlConfig) -> Self {
        let mut registry = Self::new();
        for dialect in [SqlDialect::Ansi, SqlDialect::Postgres, SqlDialect::MySql] {
            registry.register(SqlCompiler::new(dialect).with_wildcard(config.wildcard));
        }
        registry.register(PartitionPlanner::new().with_wildcard(config.wildcard));
        registry.register(SearchCompiler::from_config(config));
        registry
    }

    /// Register a compiler, replacing any previous one for its backend
    pub fn register<C: Compiler + 'static>(&mut self, compiler: C) {
        self.compilers.insert(compiler.backend(), Box::new(compiler));
    }

    pub fn supports(&self, backend: Backend) -> bool {
        self.compilers.contains_key(&backend)
    }

    /// Compile with the compiler registered for the table's backend
    pub fn compile(&self, statement: &Statement, table: &Table) -> RqlResult<CompiledQuery> {
        let compiler = self
            .compilers
            .get(&table.backend)
            .ok_or_else(|| RqlError::UnsupportedBackend(table.backend.to_string()))?;

        trace!(
            event = "RQL_COMPILE_DISPATCH",
            table = %table.name,
            backend = %table.backend
        );

        compiler.compile(statement, table)
    }
}
