//! Search query DSL tree.
//!
//! Serialized by hand so key order is stable: bool clauses always come out
//! as `must, filter, must_not, should` and empty clauses are omitted.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Range bound keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl RangeOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeOp::Gt => "gt",
            RangeOp::Gte => "gte",
            RangeOp::Lt => "lt",
            RangeOp::Lte => "lte",
        }
    }
}

/// Compound boolean query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoolQuery {
    pub must: Vec<QueryNode>,
    pub filter: Vec<QueryNode>,
    pub must_not: Vec<QueryNode>,
    pub should: Vec<QueryNode>,
}

impl BoolQuery {
    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
            && self.filter.is_empty()
            && self.must_not.is_empty()
            && self.should.is_empty()
    }
}

/// One node of the query tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    Bool(BoolQuery),
    Term { field: String, value: String },
    Terms { field: String, values: Vec<String> },
    Range { field: String, op: RangeOp, value: String },
    Wildcard { field: String, pattern: String },
    Fuzzy { field: String, value: String },
    Exists { field: String },
    Nested { path: String, query: Box<QueryNode> },
}

impl QueryNode {
    pub fn must(nodes: Vec<QueryNode>) -> Self {
        QueryNode::Bool(BoolQuery {
            must: nodes,
            ..Default::default()
        })
    }

    pub fn must_not(nodes: Vec<QueryNode>) -> Self {
        QueryNode::Bool(BoolQuery {
            must_not: nodes,
            ..Default::default()
        })
    }

    pub fn should(nodes: Vec<QueryNode>) -> Self {
        QueryNode::Bool(BoolQuery {
            should: nodes,
            ..Default::default()
        })
    }

    /// Nested paths used anywhere in the tree, outermost first
    pub fn nested_paths(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_paths(&mut out);
        out
    }

    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            QueryNode::Nested { path, query } => {
                out.push(path);
                query.collect_paths(out);
            }
            QueryNode::Bool(b) => {
                for node in b.must.iter().chain(&b.filter).chain(&b.must_not).chain(&b.should) {
                    node.collect_paths(out);
                }
            }
            _ => {}
        }
    }
}

/// Single-entry map `{key: value}`
struct Entry<'a, V: ?Sized>(&'a str, &'a V);

impl<V: Serialize + ?Sized> Serialize for Entry<'_, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.0, self.1)?;
        map.end()
    }
}

impl Serialize for BoolQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let clauses = [
            ("must", &self.must),
            ("filter", &self.filter),
            ("must_not", &self.must_not),
            ("should", &self.should),
        ];
        let len = clauses.iter().filter(|(_, c)| !c.is_empty()).count();

        let mut map = serializer.serialize_map(Some(len))?;
        for (name, clause) in clauses {
            if !clause.is_empty() {
                map.serialize_entry(name, clause)?;
            }
        }
        map.end()
    }
}

impl Serialize for QueryNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            QueryNode::Bool(b) => map.serialize_entry("bool", b)?,
            QueryNode::Term { field, value } => {
                map.serialize_entry("term", &Entry(field, value))?
            }
            QueryNode::Terms { field, values } => {
                map.serialize_entry("terms", &Entry(field, values))?
            }
            QueryNode::Range { field, op, value } => {
                map.serialize_entry("range", &Entry(field, &Entry(op.as_str(), value)))?
            }
            QueryNode::Wildcard { field, pattern } => {
                map.serialize_entry("wildcard", &Entry(field, pattern))?
            }
            QueryNode::Fuzzy { field, value } => {
                map.serialize_entry("fuzzy", &Entry(field, value))?
            }
            QueryNode::Exists { field } => {
                map.serialize_entry("exists", &Entry("field", field))?
            }
            QueryNode::Nested { path, query } => {
                map.serialize_entry("nested", &NestedBody { path, query })?
            }
        }
        map.end()
    }
}

struct NestedBody<'a> {
    path: &'a str,
    query: &'a QueryNode,
}

impl Serialize for NestedBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("path", self.path)?;
        map.serialize_entry("query", self.query)?;
        map.end()
    }
}

/// One sort entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub ascending: bool,
}

impl SortField {
    /// Missing values sort first ascending and last descending
    pub fn missing(&self) -> &'static str {
        if self.ascending {
            "_first"
        } else {
            "_last"
        }
    }

    pub fn order(&self) -> &'static str {
        if self.ascending {
            "asc"
        } else {
            "desc"
        }
    }
}

struct SortBody<'a>(&'a SortField);

impl Serialize for SortBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("missing", self.0.missing())?;
        map.serialize_entry("order", self.0.order())?;
        map.end()
    }
}

impl Serialize for SortField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Entry(&self.field, &SortBody(self)).serialize(serializer)
    }
}

/// Complete search request body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub size: usize,
    pub query: QueryNode,
    pub from: usize,
    pub sort: Vec<SortField>,
}

impl Serialize for SearchRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("size", &self.size)?;
        map.serialize_entry("query", &self.query)?;
        map.serialize_entry("from", &self.from)?;
        map.serialize_entry("sort", &self.sort)?;
        map.end()
    }
}
