//! Native key-condition and filter expressions.
//!
//! Attribute names and values are always referenced through placeholders
//! (`#name`, `:value`) so reserved words and literal text never reach the
//! expression string.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;

use crate::errors::RqlResult;
use crate::metadata::Table;
use crate::model::{Comparison, Conjunction, Literal, Operator, Predicate};

/// Operators a sort-key condition can express
pub const SORT_KEY_OPERATORS: &[Operator] = &[
    Operator::Eq,
    Operator::Gt,
    Operator::Ge,
    Operator::Lt,
    Operator::Le,
    Operator::Sw,
];

/// Condition on the chosen index's sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKeyCondition {
    pub field: String,
    pub op: Operator,
    /// Bound value; always a string for `sw`
    pub value: Value,
}

/// Key condition for a partition query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCondition {
    /// Partition key attribute
    pub partition_key: String,
    /// Value the partition key must equal
    pub partition_value: Value,
    /// Optional sort-key restriction
    pub sort_key: Option<SortKeyCondition>,
}

impl KeyCondition {
    /// Native expression text, e.g. `#hk = :hk AND begins_with(#sk, :sk)`
    pub fn expression(&self) -> String {
        let mut expr = String::from("#hk = :hk");
        if let Some(sk) = &self.sort_key {
            expr.push_str(" AND ");
            match sk.op {
                Operator::Sw => expr.push_str("begins_with(#sk, :sk)"),
                op => expr.push_str(&format!("#sk {} :sk", comparison_symbol(op))),
            }
        }
        expr
    }

    /// Placeholder → attribute name
    pub fn attribute_names(&self) -> BTreeMap<String, String> {
        let mut names = BTreeMap::new();
        names.insert("#hk".to_string(), self.partition_key.clone());
        if let Some(sk) = &self.sort_key {
            names.insert("#sk".to_string(), sk.field.clone());
        }
        names
    }

    /// Placeholder → bound value
    pub fn attribute_values(&self) -> BTreeMap<String, Value> {
        let mut values = BTreeMap::new();
        values.insert(":hk".to_string(), self.partition_value.clone());
        if let Some(sk) = &self.sort_key {
            values.insert(":sk".to_string(), sk.value.clone());
        }
        values
    }
}

impl fmt::Display for KeyCondition {
    /// Human-readable form: `hk = "42" AND begins_with(sk, "2024")`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {}",
            self.partition_key, self.partition_value
        )?;
        if let Some(sk) = &self.sort_key {
            match sk.op {
                Operator::Sw => write!(
                    f,
                    " AND begins_with({}, {})",
                    sk.field, sk.value
                )?,
                op => write!(
                    f,
                    " AND {} {} {}",
                    sk.field,
                    comparison_symbol(op),
                    sk.value
                )?,
            }
        }
        Ok(())
    }
}

impl Serialize for KeyCondition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("KeyCondition", 4)?;
        s.serialize_field("expression", &self.expression())?;
        s.serialize_field("names", &self.attribute_names())?;
        s.serialize_field("values", &self.attribute_values())?;
        s.serialize_field("display", &self.to_string())?;
        s.end()
    }
}

/// Native filter for predicates the key condition could not absorb
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterExpression {
    pub expression: String,
    pub names: BTreeMap<String, String>,
    pub values: BTreeMap<String, Value>,
}

impl Serialize for FilterExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("FilterExpression", 3)?;
        s.serialize_field("expression", &self.expression)?;
        s.serialize_field("names", &self.names)?;
        s.serialize_field("values", &self.values)?;
        s.end()
    }
}

impl FilterExpression {
    /// Render predicates combined with `conjunction`.
    ///
    /// Values are typed by `table`'s columns. Yields `None` when the list is
    /// empty or any predicate has no native filter form (including values
    /// holding the `wildcard` glyph); the caller then filters the excluded
    /// predicates itself.
    pub fn build(
        predicates: &[Predicate],
        conjunction: Conjunction,
        table: &Table,
        wildcard: char,
    ) -> RqlResult<Option<Self>> {
        if predicates.is_empty() {
            return Ok(None);
        }

        let mut builder = FilterBuilder {
            table,
            wildcard,
            names: BTreeMap::new(),
            values: BTreeMap::new(),
        };
        let mut parts = Vec::with_capacity(predicates.len());
        for predicate in predicates {
            match builder.predicate(predicate)? {
                Some(part) => parts.push(part),
                None => return Ok(None),
            }
        }

        Ok(Some(FilterExpression {
            expression: parts.join(joiner(conjunction)),
            names: builder.names,
            values: builder.values,
        }))
    }
}

struct FilterBuilder<'a> {
    table: &'a Table,
    wildcard: char,
    names: BTreeMap<String, String>,
    values: BTreeMap<String, Value>,
}

impl FilterBuilder<'_> {
    fn name(&mut self, field: &str) -> String {
        if let Some((placeholder, _)) = self.names.iter().find(|(_, f)| f.as_str() == field) {
            return placeholder.clone();
        }
        let placeholder = format!("#f{}", self.names.len());
        self.names.insert(placeholder.clone(), field.to_string());
        placeholder
    }

    fn value(&mut self, value: Value) -> String {
        let placeholder = format!(":v{}", self.values.len());
        self.values.insert(placeholder.clone(), value);
        placeholder
    }

    fn bind(&mut self, cmp: &Comparison, literal: &Literal) -> RqlResult<String> {
        let value = self.table.bind_value(&cmp.field, literal)?;
        Ok(self.value(value))
    }

    fn predicate(&mut self, predicate: &Predicate) -> RqlResult<Option<String>> {
        let (conjunction, children) = match predicate {
            Predicate::Compare(cmp) => return self.comparison(cmp),
            Predicate::And(children) => (Conjunction::And, children),
            Predicate::Or(children) => (Conjunction::Or, children),
        };

        let mut parts = Vec::with_capacity(children.len());
        for child in children {
            match self.predicate(child)? {
                Some(part) => parts.push(part),
                None => return Ok(None),
            }
        }
        Ok(Some(format!("({})", parts.join(joiner(conjunction)))))
    }

    fn comparison(&mut self, cmp: &Comparison) -> RqlResult<Option<String>> {
        let name = self.name(&cmp.field);

        let expr = match cmp.op {
            Operator::Eq | Operator::Ne => {
                let Some(value) = cmp.value() else {
                    return Ok(None);
                };
                if value.has_wildcard(self.wildcard) {
                    return Ok(None);
                }
                match (cmp.op, value.is_null()) {
                    (Operator::Eq, true) => format!("attribute_not_exists({})", name),
                    (_, true) => format!("attribute_exists({})", name),
                    (op, false) => {
                        let v = self.bind(cmp, value)?;
                        format!("{} {} {}", name, comparison_symbol(op), v)
                    }
                }
            }
            Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le => {
                let Some(value) = cmp.value() else {
                    return Ok(None);
                };
                let v = self.bind(cmp, value)?;
                format!("{} {} {}", name, comparison_symbol(cmp.op), v)
            }
            Operator::Sw | Operator::W => {
                let function = if cmp.op == Operator::Sw {
                    "begins_with"
                } else {
                    "contains"
                };
                let parts: Vec<String> = cmp
                    .values
                    .iter()
                    .map(|v| {
                        let v = self.value(Value::String(v.as_str().to_string()));
                        format!("{}({}, {})", function, name, v)
                    })
                    .collect();
                wrap(parts, " OR ")
            }
            Operator::Wo => {
                let parts: Vec<String> = cmp
                    .values
                    .iter()
                    .map(|v| {
                        let v = self.value(Value::String(v.as_str().to_string()));
                        format!("NOT contains({}, {})", name, v)
                    })
                    .collect();
                wrap(parts, " AND ")
            }
            Operator::In | Operator::Out => {
                let list = cmp
                    .values
                    .iter()
                    .map(|v| self.bind(cmp, v))
                    .collect::<RqlResult<Vec<_>>>()?;
                let expr = format!("{} IN ({})", name, list.join(", "));
                if cmp.op == Operator::Out {
                    format!("NOT ({})", expr)
                } else {
                    expr
                }
            }
            Operator::N => format!("attribute_not_exists({})", name),
            Operator::Nn => format!("attribute_exists({})", name),
            Operator::Ew | Operator::Search | Operator::Emp | Operator::Nemp => return Ok(None),
        };

        Ok(Some(expr))
    }
}

fn comparison_symbol(op: Operator) -> &'static str {
    match op {
        Operator::Ne => "<>",
        Operator::Gt => ">",
        Operator::Ge => ">=",
        Operator::Lt => "<",
        Operator::Le => "<=",
        _ => "=",
    }
}

fn joiner(conjunction: Conjunction) -> &'static str {
    match conjunction {
        Conjunction::And => " AND ",
        Conjunction::Or => " OR ",
    }
}

fn wrap(parts: Vec<String>, joiner: &str) -> String {
    if parts.len() == 1 {
        parts.concat()
    } else {
        format!("({})", parts.join(joiner))
    }
}
