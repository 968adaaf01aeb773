//! # Nested Document-Search Compiler
//!
//! Compiles predicate trees into the search query DSL.
//!
//! Sibling predicates whose fields sit below the same nested object path
//! are folded into one `nested` query at the position of the first of
//! them. Folding repeats at every depth, so `a.b.c` under `a` becomes a
//! `nested` on `a.b` inside the `nested` on `a`.

use tracing::debug;

use crate::config::RqlConfig;
use crate::errors::{RqlError, RqlResult};
use crate::metadata::Table;
use crate::model::{Comparison, Conjunction, Literal, Operator, Predicate, Statement};

use super::dsl::{BoolQuery, QueryNode, RangeOp, SearchRequest, SortField};

/// A compiled leaf, before it is placed in a parent
enum Clause {
    Positive(QueryNode),
    /// Belongs in a `must_not`
    Negative(QueryNode),
}

impl Clause {
    fn into_node(self) -> QueryNode {
        match self {
            Clause::Positive(node) => node,
            Clause::Negative(node) => QueryNode::must_not(vec![node]),
        }
    }
}

/// Sibling slot after nested folding
enum Slot<'a> {
    Single(&'a Predicate),
    Nested {
        path: String,
        members: Vec<&'a Predicate>,
    },
}

/// Compiles statements into search requests
#[derive(Debug, Clone)]
pub struct SearchCompiler {
    identity_field: String,
    wildcard: char,
}

impl Default for SearchCompiler {
    fn default() -> Self {
        Self {
            identity_field: "id".to_string(),
            wildcard: '*',
        }
    }
}

impl SearchCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &RqlConfig) -> Self {
        Self::default()
            .with_identity_field(&config.identity_field)
            .with_wildcard(config.wildcard)
    }

    /// Field appended as the last sort key
    pub fn with_identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity_field = field.into();
        self
    }

    pub fn with_wildcard(mut self, wildcard: char) -> Self {
        self.wildcard = wildcard;
        self
    }

    /// Compile the full request body
    pub fn compile(&self, statement: &Statement, table: &Table) -> RqlResult<SearchRequest> {
        let query = self.compile_query(statement)?;
        let sort = self.sort(statement);

        debug!(
            event = "RQL_SEARCH_COMPILED",
            table = %table.name,
            predicates = statement.predicates.len(),
            nested = query.nested_paths().len(),
            sort = sort.len()
        );

        Ok(SearchRequest {
            size: statement.page.max_rows,
            query,
            from: statement.page.offset,
            sort,
        })
    }

    /// Compile only the query clause
    pub fn compile_query(&self, statement: &Statement) -> RqlResult<QueryNode> {
        if statement.predicates.is_empty() {
            return Ok(QueryNode::Bool(BoolQuery::default()));
        }
        let members: Vec<&Predicate> = statement.predicates.iter().collect();
        self.compile_siblings(statement.conjunction, &members, "", true)
    }

    /// Compile one predicate tree as if it were the whole query
    pub fn compile_predicate(&self, predicate: &Predicate) -> RqlResult<QueryNode> {
        self.compile_siblings(Conjunction::And, &[predicate], "", true)
    }

    /// Compile predicates that share a parent into a bool of `conjunction`.
    ///
    /// With `bare_single` a lone member compiles without the bool wrapper;
    /// that holds for the statement's own list and a nested query body.
    /// An explicit `and`/`or` group always keeps its bool.
    fn compile_siblings(
        &self,
        conjunction: Conjunction,
        members: &[&Predicate],
        prefix: &str,
        bare_single: bool,
    ) -> RqlResult<QueryNode> {
        let mut slots = fold_nested(members, prefix);

        if bare_single && members.len() == 1 {
            if let Some(slot) = slots.pop() {
                return Ok(self.compile_slot(slot, conjunction, prefix)?.into_node());
            }
        }

        let mut bool_query = BoolQuery::default();
        for slot in slots {
            let clause = self.compile_slot(slot, conjunction, prefix)?;
            match (conjunction, clause) {
                (Conjunction::And, Clause::Positive(node)) => bool_query.filter.push(node),
                (Conjunction::And, Clause::Negative(node)) => bool_query.must_not.push(node),
                (Conjunction::Or, clause) => bool_query.should.push(clause.into_node()),
            }
        }
        Ok(QueryNode::Bool(bool_query))
    }

    fn compile_slot(
        &self,
        slot: Slot<'_>,
        conjunction: Conjunction,
        prefix: &str,
    ) -> RqlResult<Clause> {
        match slot {
            Slot::Single(Predicate::Compare(cmp)) => self.compile_leaf(cmp),
            Slot::Single(group) => {
                let (conj, children) = group
                    .as_group()
                    .ok_or_else(|| RqlError::malformed(format!("unexpected predicate {}", group)))?;
                let members: Vec<&Predicate> = children.iter().collect();
                Ok(Clause::Positive(self.compile_siblings(conj, &members, prefix, false)?))
            }
            Slot::Nested { path, members } => {
                let query = self.compile_siblings(conjunction, &members, &path, true)?;
                Ok(Clause::Positive(QueryNode::Nested {
                    path,
                    query: Box::new(query),
                }))
            }
        }
    }

    fn compile_leaf(&self, cmp: &Comparison) -> RqlResult<Clause> {
        let field = cmp.field.clone();
        let values = || cmp.values.iter().map(|v| v.as_str().to_string());

        let clause = match cmp.op {
            Operator::Eq | Operator::Ne => {
                let value = first_value(cmp)?;
                let node = if value.is_null() {
                    // eq null is "field missing", ne null is "field present"
                    let exists = QueryNode::Exists { field };
                    return Ok(if cmp.op == Operator::Eq {
                        Clause::Negative(exists)
                    } else {
                        Clause::Positive(QueryNode::must(vec![exists]))
                    });
                } else if value.has_wildcard(self.wildcard) {
                    QueryNode::Wildcard {
                        field,
                        pattern: value.as_str().replace(self.wildcard, "*"),
                    }
                } else {
                    QueryNode::Term {
                        field,
                        value: value.as_str().to_string(),
                    }
                };
                if cmp.op == Operator::Eq {
                    Clause::Positive(node)
                } else {
                    Clause::Negative(node)
                }
            }
            Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le => {
                let op = match cmp.op {
                    Operator::Gt => RangeOp::Gt,
                    Operator::Ge => RangeOp::Gte,
                    Operator::Lt => RangeOp::Lt,
                    _ => RangeOp::Lte,
                };
                Clause::Positive(QueryNode::Range {
                    field,
                    op,
                    value: first_value(cmp)?.as_str().to_string(),
                })
            }
            Operator::Sw | Operator::Ew | Operator::W => {
                let wildcards = values()
                    .map(|v| QueryNode::Wildcard {
                        field: field.clone(),
                        pattern: match cmp.op {
                            Operator::Sw => format!("{}*", v),
                            Operator::Ew => format!("*{}", v),
                            _ => format!("*{}*", v),
                        },
                    })
                    .collect();
                Clause::Positive(QueryNode::should(wildcards))
            }
            Operator::Wo => {
                let wildcards = values()
                    .map(|v| QueryNode::Wildcard {
                        field: field.clone(),
                        pattern: format!("*{}*", v),
                    })
                    .collect();
                Clause::Positive(QueryNode::must_not(wildcards))
            }
            Operator::In => Clause::Positive(QueryNode::Terms {
                field,
                values: values().collect(),
            }),
            Operator::Out => Clause::Negative(QueryNode::Terms {
                field,
                values: values().collect(),
            }),
            Operator::N => Clause::Negative(QueryNode::Exists { field }),
            Operator::Nn => Clause::Positive(QueryNode::must(vec![QueryNode::Exists { field }])),
            Operator::Emp => Clause::Positive(QueryNode::should(vec![
                QueryNode::Term {
                    field: field.clone(),
                    value: String::new(),
                },
                QueryNode::must_not(vec![QueryNode::Exists { field }]),
            ])),
            Operator::Nemp => Clause::Positive(QueryNode::must(vec![
                QueryNode::must_not(vec![QueryNode::Term {
                    field: field.clone(),
                    value: String::new(),
                }]),
                QueryNode::must(vec![QueryNode::Exists { field }]),
            ])),
            Operator::Search => Clause::Positive(QueryNode::Fuzzy {
                field,
                value: first_value(cmp)?.as_str().to_string(),
            }),
        };

        Ok(clause)
    }

    fn sort(&self, statement: &Statement) -> Vec<SortField> {
        let mut sort: Vec<SortField> = statement
            .order
            .iter()
            .map(|o| SortField {
                field: o.field.clone(),
                ascending: o.direction.is_ascending(),
            })
            .collect();

        if !sort
            .iter()
            .any(|s| s.field.eq_ignore_ascii_case(&self.identity_field))
        {
            sort.push(SortField {
                field: self.identity_field.clone(),
                ascending: true,
            });
        }
        sort
    }
}

fn first_value(cmp: &Comparison) -> RqlResult<&Literal> {
    cmp.value()
        .ok_or_else(|| RqlError::malformed(format!("'{}' requires a value", cmp)))
}

/// Nested object path directly below `prefix`, if the field has one.
///
/// `players.registerNum` under `""` is in `players`;
/// `a.b.c` under `a` is in `a.b`.
fn nested_path(field: &str, prefix: &str) -> Option<String> {
    let rest = if prefix.is_empty() {
        field
    } else {
        field.strip_prefix(prefix)?.strip_prefix('.')?
    };
    let (segment, _) = rest.split_once('.')?;
    if segment.is_empty() {
        return None;
    }
    Some(if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    })
}

/// Group siblings by nested path, keeping first-appearance order
fn fold_nested<'a>(members: &[&'a Predicate], prefix: &str) -> Vec<Slot<'a>> {
    let mut slots: Vec<Slot<'a>> = Vec::with_capacity(members.len());

    for &pred in members {
        let path = pred
            .as_comparison()
            .and_then(|cmp| nested_path(&cmp.field, prefix));

        match path {
            None => slots.push(Slot::Single(pred)),
            Some(path) => {
                let existing = slots.iter_mut().find_map(|slot| match slot {
                    Slot::Nested { path: p, members } if *p == path => Some(members),
                    _ => None,
                });
                match existing {
                    Some(group) => group.push(pred),
                    None => slots.push(Slot::Nested {
                        path,
                        members: vec![pred],
                    }),
                }
            }
        }
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cmp(op: Operator, field: &str, values: &[&str]) -> Predicate {
        Predicate::compare(op, field, values.iter().map(|v| Literal::bare(*v)).collect()).unwrap()
    }

    fn compile(pred: Predicate) -> serde_json::Value {
        let node = SearchCompiler::new().compile_predicate(&pred).unwrap();
        serde_json::to_value(node).unwrap()
    }

    #[test]
    fn test_nested_path() {
        assert_eq!(nested_path("players.registerNum", ""), Some("players".into()));
        assert_eq!(nested_path("a.b.c", "a"), Some("a.b".into()));
        assert_eq!(nested_path("a.b", "a"), None);
        assert_eq!(nested_path("city", ""), None);
    }

    #[test]
    fn test_term_and_wildcard() {
        assert_eq!(
            compile(cmp(Operator::Eq, "city", &["CHANDLER"])),
            json!({"term": {"city": "CHANDLER"}})
        );
        assert_eq!(
            compile(cmp(Operator::Eq, "address1", &["*GILBERT*"])),
            json!({"wildcard": {"address1": "*GILBERT*"}})
        );
    }

    #[test]
    fn test_negative_leaves() {
        assert_eq!(
            compile(cmp(Operator::Ne, "rank", &["25"])),
            json!({"bool": {"must_not": [{"term": {"rank": "25"}}]}})
        );
        assert_eq!(
            compile(cmp(Operator::N, "state", &[])),
            json!({"bool": {"must_not": [{"exists": {"field": "state"}}]}})
        );
    }

    #[test]
    fn test_or_with_negative_child() {
        let pred = Predicate::Or(vec![
            cmp(Operator::Eq, "id", &["3"]),
            cmp(Operator::Out, "city", &["a", "b"]),
        ]);
        assert_eq!(
            compile(pred),
            json!({"bool": {"should": [
                {"term": {"id": "3"}},
                {"bool": {"must_not": [{"terms": {"city": ["a", "b"]}}]}}
            ]}})
        );
    }

    #[test]
    fn test_deep_nesting() {
        let pred = Predicate::And(vec![
            cmp(Operator::Eq, "a.b.c", &["1"]),
            cmp(Operator::Eq, "a.d", &["2"]),
        ]);
        assert_eq!(
            compile(pred),
            json!({"bool": {"filter": [{"nested": {"path": "a", "query": {"bool": {"filter": [
                {"nested": {"path": "a.b", "query": {"term": {"a.b.c": "1"}}}},
                {"term": {"a.d": "2"}}
            ]}}}}]}})
        );
    }

    #[test]
    fn test_single_member_group_keeps_bool() {
        let pred = Predicate::And(vec![
            Predicate::And(vec![cmp(Operator::Eq, "city", &["Chandler"])]),
            Predicate::Or(vec![cmp(Operator::Ne, "rank", &["1"])]),
        ]);
        assert_eq!(
            compile(pred),
            json!({"bool": {"filter": [
                {"bool": {"filter": [{"term": {"city": "Chandler"}}]}},
                {"bool": {"should": [{"bool": {"must_not": [{"term": {"rank": "1"}}]}}]}}
            ]}})
        );
    }

    #[test]
    fn test_sort_appends_identity() {
        let stmt = Statement::new("places")
            .with_order(crate::model::Order::desc("rank"))
            .with_order(crate::model::Order::asc("ID"));
        assert_eq!(SearchCompiler::new().sort(&stmt).len(), 2);

        let stmt = Statement::new("places").with_order(crate::model::Order::desc("rank"));
        let sort = SearchCompiler::new().with_identity_field("uuid").sort(&stmt);
        assert_eq!(sort[1].field, "uuid");
        assert!(sort[1].ascending);
    }
}
