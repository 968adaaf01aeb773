//! # Query Parameter Parser
//!
//! Parses query-string parameters into a `Statement`.
//!
//! Reserved parameters (`order`/`sort`, `pagesize`/`limit`, `offset`,
//! `page`, `marker`/`after`) are pulled out first. Every other parameter
//! becomes a predicate.

use tracing::debug;

use crate::config::RqlConfig;
use crate::errors::{RqlError, RqlResult};
use crate::metadata::Table;
use crate::model::{Conjunction, Literal, Operator, Order, Page, Predicate, Statement, Term};

use super::tokenizer::{dequote, is_call, parse_term, split_args};

/// Parameters owned by the response layer; never predicates
const PASSTHROUGH_PARAMS: &[&str] = &["includes", "excludes", "expands"];

/// Query-string parser
#[derive(Debug, Clone)]
pub struct Parser<'a> {
    config: &'a RqlConfig,
}

impl<'a> Parser<'a> {
    pub fn new(config: &'a RqlConfig) -> Self {
        Self { config }
    }

    /// Parse an ordered list of key/value parameters
    pub fn parse<I, K, V>(&self, table: &Table, params: I) -> RqlResult<Statement>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut statement = Statement::new(&table.name);
        let mut page = Page {
            max_rows: self.config.default_page_size,
            ..Default::default()
        };
        let mut page_number: Option<usize> = None;

        for (key, value) in params {
            let key = key.as_ref().trim();
            let value = value.as_ref().trim();
            if key.is_empty() {
                continue;
            }

            match key.to_ascii_lowercase().as_str() {
                "order" | "sort" => {
                    statement.order.extend(parse_order(value)?);
                }
                "pagesize" | "limit" => {
                    page.max_rows = self.parse_page_size(value)?;
                }
                "offset" => {
                    page.offset = parse_count("offset", value)?;
                }
                "page" => {
                    let n = parse_count("page", value)?;
                    if n == 0 {
                        return Err(RqlError::malformed("page numbers start at 1"));
                    }
                    page_number = Some(n);
                }
                "marker" | "after" => {
                    page.marker = Some(value.to_string());
                }
                lower if PASSTHROUGH_PARAMS.contains(&lower) => {}
                _ => {
                    statement.predicates.push(parse_param(key, value)?);
                }
            }
        }

        if let Some(n) = page_number {
            page.offset = (n - 1).checked_mul(page.max_rows).ok_or_else(|| {
                RqlError::malformed(format!("page {} is out of range", n))
            })?;
        }
        statement.page = page;

        // a lone top-level and/or contributes its children directly
        if statement.predicates.len() == 1 {
            if let Some((conjunction, _)) = statement.predicates[0].as_group() {
                if let Some(Predicate::And(children) | Predicate::Or(children)) =
                    statement.predicates.pop()
                {
                    statement.conjunction = conjunction;
                    statement.predicates = children;
                }
            }
        }

        debug!(
            event = "RQL_PARSED",
            table = %table.name,
            conjunction = statement.conjunction.as_str(),
            predicates = statement.predicates.len(),
            order = statement.order.len(),
            max_rows = statement.page.max_rows,
            offset = statement.page.offset
        );

        Ok(statement)
    }

    /// Parse a raw query string such as `eq(city,Chandler)&order=-rank`
    pub fn parse_query_string(&self, table: &Table, query: &str) -> RqlResult<Statement> {
        let query = query.trim_start_matches('?');
        let mut params = Vec::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = match pair.find('=') {
                // '=' inside a call belongs to the call, not the pair
                Some(pos) if !pair[..pos].contains('(') => (&pair[..pos], &pair[pos + 1..]),
                _ => (pair, ""),
            };
            params.push((percent_decode(key)?, percent_decode(value)?));
        }
        self.parse(table, params)
    }

    /// Build `in(<key>, ...)` from a comma-delimited entity key path segment
    pub fn key_predicate(&self, table: &Table, keys: &str) -> RqlResult<Predicate> {
        let key_columns = table.key_columns();
        let key = match key_columns.as_slice() {
            [key] => *key,
            _ => {
                return Err(RqlError::invalid_metadata(
                    &table.name,
                    format!(
                        "entity keys need exactly one key column, found {}",
                        key_columns.len()
                    ),
                ))
            }
        };

        let values = split_args(keys)?
            .iter()
            .map(|v| dequote(v))
            .collect::<RqlResult<Vec<_>>>()?;
        Predicate::compare(Operator::In, key, values)
    }

    fn parse_page_size(&self, value: &str) -> RqlResult<usize> {
        let size = parse_count("page size", value)?;
        if size == 0 {
            return Err(RqlError::malformed("page size must be > 0"));
        }
        if size > self.config.max_page_size {
            return Err(RqlError::malformed(format!(
                "page size {} exceeds maximum {}",
                size, self.config.max_page_size
            )));
        }
        Ok(size)
    }
}

/// Turn one non-reserved parameter into a predicate
fn parse_param(key: &str, value: &str) -> RqlResult<Predicate> {
    if is_call(key) {
        if !value.is_empty() {
            return Err(RqlError::malformed(format!(
                "unexpected value '{}' after '{}'",
                value, key
            )));
        }
        return term_to_predicate(&parse_term(key)?);
    }

    if value.is_empty() {
        return Err(RqlError::malformed(format!("parameter '{}' has no value", key)));
    }

    let field = dequote(key)?;
    let field = Term::Word(Literal::bare(field.as_str()));

    // city=sw(Chan) reads as sw(city,Chan)
    if is_call(value) {
        if let Term::Call { name, args } = parse_term(value)? {
            if Operator::parse(&name).is_some() {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(field);
                full.extend(args);
                return term_to_predicate(&Term::Call { name, args: full });
            }
        }
    }

    term_to_predicate(&Term::Call {
        name: Operator::Eq.as_str().to_string(),
        args: vec![field, Term::Word(dequote(value)?)],
    })
}

/// Convert a parsed call into a predicate, checking tokens and arity
pub fn term_to_predicate(term: &Term) -> RqlResult<Predicate> {
    let (name, args) = match term {
        Term::Call { name, args } => (name, args),
        Term::Word(lit) => {
            return Err(RqlError::malformed(format!(
                "expected a predicate, found '{}'",
                lit
            )))
        }
    };

    if let Some(conjunction) = Conjunction::parse(name) {
        let children = args
            .iter()
            .map(term_to_predicate)
            .collect::<RqlResult<Vec<_>>>()?;
        return Predicate::group(conjunction, children);
    }

    let op = Operator::parse(name)
        .ok_or_else(|| RqlError::malformed(format!("unknown function '{}'", name)))?;

    let (first, rest) = args
        .split_first()
        .ok_or_else(|| RqlError::malformed(format!("'{}' requires a field", op)))?;
    let field = first
        .as_word()
        .ok_or_else(|| RqlError::malformed(format!("'{}' expects a field name first", op)))?;

    let values = rest
        .iter()
        .map(|arg| {
            arg.as_word().cloned().ok_or_else(|| {
                RqlError::malformed(format!("'{}' does not accept nested call '{}'", op, arg))
            })
        })
        .collect::<RqlResult<Vec<_>>>()?;

    Predicate::compare(op, field.as_str(), values)
}

/// Parse order parameter: `a,-b,+c` or `a.asc,b.desc`
fn parse_order(value: &str) -> RqlResult<Vec<Order>> {
    let mut orders = Vec::new();

    for part in value.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let order = if let Some(field) = part.strip_prefix('-') {
            Order::desc(field.trim())
        } else if let Some(field) = part.strip_prefix('+') {
            Order::asc(field.trim())
        } else {
            match part.rsplit_once('.') {
                Some((field, dir)) if dir.eq_ignore_ascii_case("desc") => Order::desc(field),
                Some((field, dir)) if dir.eq_ignore_ascii_case("asc") => Order::asc(field),
                _ => Order::asc(part),
            }
        };

        if order.field.is_empty() {
            return Err(RqlError::malformed(format!("empty order field in '{}'", value)));
        }
        orders.push(order);
    }

    Ok(orders)
}

fn parse_count(name: &str, value: &str) -> RqlResult<usize> {
    value
        .parse()
        .map_err(|_| RqlError::malformed(format!("invalid {}: {}", name, value)))
}

/// Decode `%XX` escapes; `+` is left alone since it marks ascending order
fn percent_decode(input: &str) -> RqlResult<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input
                .get(i + 1..i + 3)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| RqlError::malformed(format!("bad percent escape in '{}'", input)))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out)
        .map_err(|_| RqlError::malformed(format!("invalid UTF-8 in '{}'", input)))
}
