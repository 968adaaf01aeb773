//! # SQL Statement Builder
//!
//! Renders a `Statement` as a parameterized `SELECT`. Literal values are
//! never written into the SQL text; each one is pushed onto the parameter
//! list in the order its placeholder is emitted.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::{RqlError, RqlResult};
use crate::metadata::Table;
use crate::model::{Comparison, Conjunction, Literal, Operator, Predicate, Statement};

use super::dialect::SqlDialect;

/// A compiled SQL query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlQuery {
    /// SQL text with `?` placeholders
    pub sql: String,
    /// Bound values, one per placeholder
    pub params: Vec<Value>,
}

impl SqlQuery {
    /// Number of `?` placeholders in the text
    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

/// Compiles statements for one SQL dialect
#[derive(Debug, Clone)]
pub struct SqlCompiler {
    dialect: SqlDialect,
    wildcard: char,
}

/// Per-compilation state
struct Render<'a> {
    table: &'a Table,
    params: Vec<Value>,
}

impl SqlCompiler {
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            wildcard: '*',
        }
    }

    /// Sets the glyph that turns `eq`/`ne` into `LIKE`
    pub fn with_wildcard(mut self, wildcard: char) -> Self {
        self.wildcard = wildcard;
        self
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Compile the full `SELECT`
    pub fn compile(&self, statement: &Statement, table: &Table) -> RqlResult<SqlQuery> {
        let (where_sql, params) = self.compile_where(statement, table)?;

        let mut sql = format!(
            "SELECT {}.* FROM {}",
            self.dialect.quote_ident(&table.name),
            self.dialect.quote_ident(&table.name)
        );

        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        let order_by = self.order_by(statement, table)?;
        if !order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_by.join(", "));
        }

        sql.push_str(&format!(" LIMIT {}", statement.page.max_rows));
        if statement.page.offset > 0 {
            sql.push_str(&format!(" OFFSET {}", statement.page.offset));
        }

        debug!(
            event = "RQL_SQL_COMPILED",
            table = %table.name,
            dialect = %self.dialect,
            params = params.len()
        );

        Ok(SqlQuery { sql, params })
    }

    /// Compile only the filter, without the `WHERE` keyword.
    ///
    /// Returns an empty string when the statement has no predicates.
    pub fn compile_where(
        &self,
        statement: &Statement,
        table: &Table,
    ) -> RqlResult<(String, Vec<Value>)> {
        let mut render = Render {
            table,
            params: Vec::new(),
        };

        let sql = match statement.predicates.as_slice() {
            [] => String::new(),
            [single] => self.predicate(single, &mut render)?,
            many => self.group(statement.conjunction, many, &mut render)?,
        };

        Ok((sql, render.params))
    }

    fn predicate(&self, predicate: &Predicate, render: &mut Render<'_>) -> RqlResult<String> {
        match predicate {
            Predicate::Compare(cmp) => self.comparison(cmp, render),
            Predicate::And(children) => self.group(Conjunction::And, children, render),
            Predicate::Or(children) => self.group(Conjunction::Or, children, render),
        }
    }

    fn group(
        &self,
        conjunction: Conjunction,
        children: &[Predicate],
        render: &mut Render<'_>,
    ) -> RqlResult<String> {
        let joiner = match conjunction {
            Conjunction::And => " AND ",
            Conjunction::Or => " OR ",
        };
        let parts = children
            .iter()
            .map(|child| self.predicate(child, render))
            .collect::<RqlResult<Vec<_>>>()?;
        Ok(format!("({})", parts.join(joiner)))
    }

    fn column(&self, field: &str, table: &Table) -> RqlResult<String> {
        let column = table
            .find_column(field)
            .ok_or_else(|| RqlError::unknown_field(&table.name, field))?;
        Ok(self.dialect.qualify(&table.name, &column.name))
    }

    fn comparison(&self, cmp: &Comparison, render: &mut Render<'_>) -> RqlResult<String> {
        let col = self.column(&cmp.field, render.table)?;

        let sql = match cmp.op {
            Operator::Eq | Operator::Ne => {
                let negate = cmp.op == Operator::Ne;
                let value = first_value(cmp)?;
                if value.is_null() {
                    if negate {
                        format!("{} IS NOT NULL", col)
                    } else {
                        format!("{} IS NULL", col)
                    }
                } else if value.has_wildcard(self.wildcard) {
                    render.params.push(Value::String(
                        value.as_str().replace(self.wildcard, "%"),
                    ));
                    if negate {
                        format!("{} NOT LIKE ?", col)
                    } else {
                        format!("{} LIKE ?", col)
                    }
                } else {
                    render.params.push(value.to_json());
                    if negate {
                        format!("{} <> ?", col)
                    } else {
                        format!("{} = ?", col)
                    }
                }
            }
            Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le => {
                let symbol = match cmp.op {
                    Operator::Gt => ">",
                    Operator::Ge => ">=",
                    Operator::Lt => "<",
                    _ => "<=",
                };
                render.params.push(first_value(cmp)?.to_json());
                format!("{} {} ?", col, symbol)
            }
            Operator::In | Operator::Out => {
                let keyword = if cmp.op == Operator::In { "IN" } else { "NOT IN" };
                let placeholders = vec!["?"; cmp.values.len()].join(", ");
                render
                    .params
                    .extend(cmp.values.iter().map(Literal::to_json));
                format!("{} {} ({})", col, keyword, placeholders)
            }
            Operator::Sw | Operator::Ew | Operator::W => {
                let parts: Vec<String> = cmp
                    .values
                    .iter()
                    .map(|v| {
                        let pattern = match cmp.op {
                            Operator::Sw => format!("{}%", v.as_str()),
                            Operator::Ew => format!("%{}", v.as_str()),
                            _ => format!("%{}%", v.as_str()),
                        };
                        render.params.push(Value::String(pattern));
                        format!("{} LIKE ?", col)
                    })
                    .collect();
                join_values(parts, " OR ")
            }
            Operator::Wo => {
                let parts: Vec<String> = cmp
                    .values
                    .iter()
                    .map(|v| {
                        render
                            .params
                            .push(Value::String(format!("%{}%", v.as_str())));
                        format!("{} NOT LIKE ?", col)
                    })
                    .collect();
                join_values(parts, " AND ")
            }
            Operator::N => format!("{} IS NULL", col),
            Operator::Nn => format!("{} IS NOT NULL", col),
            Operator::Emp => {
                render.params.push(Value::String(String::new()));
                format!("({} IS NULL OR {} = ?)", col, col)
            }
            Operator::Nemp => {
                render.params.push(Value::String(String::new()));
                format!("({} IS NOT NULL AND {} <> ?)", col, col)
            }
            Operator::Search => {
                return Err(RqlError::unsupported_operator(
                    cmp.op.as_str(),
                    &cmp.field,
                    "full-text search is not available on SQL tables",
                ))
            }
        };

        Ok(sql)
    }

    fn order_by(&self, statement: &Statement, table: &Table) -> RqlResult<Vec<String>> {
        let mut parts = Vec::new();
        let mut seen: Vec<String> = Vec::new();

        for order in &statement.order {
            let col = self.column(&order.field, table)?;
            parts.push(format!("{} {}", col, order.direction.as_str()));
            seen.push(order.field.to_ascii_lowercase());
        }

        // primary key last so paging is stable
        for key in table.key_columns() {
            if !seen.contains(&key.to_ascii_lowercase()) {
                parts.push(format!("{} ASC", self.dialect.qualify(&table.name, key)));
            }
        }

        Ok(parts)
    }
}

fn first_value(cmp: &Comparison) -> RqlResult<&Literal> {
    cmp.value()
        .ok_or_else(|| RqlError::malformed(format!("'{}' requires a value", cmp)))
}

fn join_values(parts: Vec<String>, joiner: &str) -> String {
    if parts.len() == 1 {
        parts.into_iter().collect()
    } else {
        format!("({})", parts.join(joiner))
    }
}
