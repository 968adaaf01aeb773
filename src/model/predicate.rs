//! Predicate tree
//!
//! Comparisons are leaves; `and`/`or` groups hold child predicates.

use std::fmt;

use crate::errors::{RqlError, RqlResult};

use super::term::Literal;

/// How many values an operator takes after its field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "exactly {}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

/// Comparison and function operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equals
    Eq,
    /// Not equals
    Ne,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Starts with
    Sw,
    /// Ends with
    Ew,
    /// Contains
    W,
    /// Does not contain
    Wo,
    /// Value in list
    In,
    /// Value not in list
    Out,
    /// Is null
    N,
    /// Is not null
    Nn,
    /// Null or empty string
    Emp,
    /// Neither null nor empty string
    Nemp,
    /// Fuzzy text search
    Search,
}

impl Operator {
    /// Parse an operator token (case-insensitive)
    pub fn parse(token: &str) -> Option<Self> {
        let op = match token.to_ascii_lowercase().as_str() {
            "eq" => Operator::Eq,
            "ne" => Operator::Ne,
            "gt" => Operator::Gt,
            "ge" => Operator::Ge,
            "lt" => Operator::Lt,
            "le" => Operator::Le,
            "sw" => Operator::Sw,
            "ew" => Operator::Ew,
            "w" => Operator::W,
            "wo" => Operator::Wo,
            "in" => Operator::In,
            "out" => Operator::Out,
            "n" => Operator::N,
            "nn" => Operator::Nn,
            "emp" => Operator::Emp,
            "nemp" => Operator::Nemp,
            "search" => Operator::Search,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Ge => "ge",
            Operator::Lt => "lt",
            Operator::Le => "le",
            Operator::Sw => "sw",
            Operator::Ew => "ew",
            Operator::W => "w",
            Operator::Wo => "wo",
            Operator::In => "in",
            Operator::Out => "out",
            Operator::N => "n",
            Operator::Nn => "nn",
            Operator::Emp => "emp",
            Operator::Nemp => "nemp",
            Operator::Search => "search",
        }
    }

    /// Number of values accepted after the field
    pub fn arity(&self) -> Arity {
        match self {
            Operator::Eq
            | Operator::Ne
            | Operator::Gt
            | Operator::Ge
            | Operator::Lt
            | Operator::Le
            | Operator::Search => Arity::Exactly(1),
            Operator::Sw
            | Operator::Ew
            | Operator::W
            | Operator::Wo
            | Operator::In
            | Operator::Out => Arity::AtLeast(1),
            Operator::N | Operator::Nn | Operator::Emp | Operator::Nemp => Arity::Exactly(0),
        }
    }

    /// Returns true for the binary relational operators
    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            Operator::Eq | Operator::Ne | Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le
        )
    }

    /// Returns true for the range operators
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Boolean combinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub fn parse(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("and") {
            Some(Conjunction::And)
        } else if token.eq_ignore_ascii_case("or") {
            Some(Conjunction::Or)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Conjunction::And => "and",
            Conjunction::Or => "or",
        }
    }
}

/// A single field comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    /// Operator
    pub op: Operator,
    /// Field name, case preserved
    pub field: String,
    /// Values after the field
    pub values: Vec<Literal>,
}

impl Comparison {
    /// Create a comparison, checking the operator's arity
    pub fn new(op: Operator, field: impl Into<String>, values: Vec<Literal>) -> RqlResult<Self> {
        let field = field.into();
        if field.is_empty() {
            return Err(RqlError::malformed(format!("'{}' requires a field", op)));
        }
        let arity = op.arity();
        if !arity.accepts(values.len()) {
            return Err(RqlError::malformed(format!(
                "'{}({})' takes {} value(s), got {}",
                op,
                field,
                arity,
                values.len()
            )));
        }
        Ok(Self { op, field, values })
    }

    /// First value, if any
    pub fn value(&self) -> Option<&Literal> {
        self.values.first()
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.op, self.field)?;
        for value in &self.values {
            write!(f, ",{}", value)?;
        }
        write!(f, ")")
    }
}

/// A node in the filter tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Compare(Comparison),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Create a comparison predicate
    pub fn compare(op: Operator, field: impl Into<String>, values: Vec<Literal>) -> RqlResult<Self> {
        Comparison::new(op, field, values).map(Predicate::Compare)
    }

    /// Create a combinator; at least one child is required
    pub fn group(conjunction: Conjunction, children: Vec<Predicate>) -> RqlResult<Self> {
        if children.is_empty() {
            return Err(RqlError::malformed(format!(
                "'{}' requires at least one predicate",
                conjunction.as_str()
            )));
        }
        Ok(match conjunction {
            Conjunction::And => Predicate::And(children),
            Conjunction::Or => Predicate::Or(children),
        })
    }

    /// Operator or combinator name
    pub fn token(&self) -> &'static str {
        match self {
            Predicate::Compare(c) => c.op.as_str(),
            Predicate::And(_) => "and",
            Predicate::Or(_) => "or",
        }
    }

    /// The comparison, if this is a leaf
    pub fn as_comparison(&self) -> Option<&Comparison> {
        match self {
            Predicate::Compare(c) => Some(c),
            _ => None,
        }
    }

    /// Combinator and children, if this is a group
    pub fn as_group(&self) -> Option<(Conjunction, &[Predicate])> {
        match self {
            Predicate::Compare(_) => None,
            Predicate::And(children) => Some((Conjunction::And, children)),
            Predicate::Or(children) => Some((Conjunction::Or, children)),
        }
    }

    /// Grouping depth: a comparison is 0, a group is one more than its
    /// deepest child
    pub fn depth(&self) -> usize {
        match self.as_group() {
            None => 0,
            Some((_, children)) => 1 + children.iter().map(Predicate::depth).max().unwrap_or(0),
        }
    }

    /// All comparisons in the subtree, depth first
    pub fn comparisons(&self) -> Vec<&Comparison> {
        let mut out = Vec::new();
        self.collect_comparisons(&mut out);
        out
    }

    fn collect_comparisons<'a>(&'a self, out: &mut Vec<&'a Comparison>) {
        match self {
            Predicate::Compare(c) => out.push(c),
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    child.collect_comparisons(out);
                }
            }
        }
    }
}

impl fmt::Display for Predicate {
    /// Renders the predicate as RQL text
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare(c) => write!(f, "{}", c),
            Predicate::And(children) | Predicate::Or(children) => {
                write!(f, "{}(", self.token())?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<Comparison> for Predicate {
    fn from(c: Comparison) -> Self {
        Predicate::Compare(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(field: &str, value: &str) -> Predicate {
        Predicate::compare(Operator::Eq, field, vec![Literal::bare(value)]).unwrap()
    }

    #[test]
    fn test_operator_tokens_case_insensitive() {
        assert_eq!(Operator::parse("EQ"), Some(Operator::Eq));
        assert_eq!(Operator::parse("Nemp"), Some(Operator::Nemp));
        assert_eq!(Operator::parse("like"), None);
    }

    #[test]
    fn test_arity_enforced() {
        assert!(Predicate::compare(Operator::Eq, "a", vec![]).is_err());
        assert!(Predicate::compare(Operator::N, "a", vec![Literal::bare("x")]).is_err());
        assert!(Predicate::compare(
            Operator::In,
            "a",
            vec![Literal::bare("1"), Literal::bare("2")]
        )
        .is_ok());
    }

    #[test]
    fn test_empty_group_rejected() {
        let result = Predicate::group(Conjunction::And, vec![]);
        assert!(matches!(result, Err(RqlError::MalformedQuery(_))));
    }

    #[test]
    fn test_depth() {
        let leaf = eq("a", "1");
        assert_eq!(leaf.depth(), 0);

        let nested = Predicate::group(
            Conjunction::And,
            vec![
                eq("a", "1"),
                Predicate::group(Conjunction::Or, vec![eq("b", "2"), eq("c", "3")]).unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(nested.depth(), 2);
        assert_eq!(nested.comparisons().len(), 3);
    }

    #[test]
    fn test_display() {
        let pred = Predicate::group(Conjunction::Or, vec![eq("a", "1"), eq("b", "x")]).unwrap();
        assert_eq!(pred.to_string(), "or(eq(a,1),eq(b,x))");
        assert_eq!(pred.token(), "or");
    }
}
