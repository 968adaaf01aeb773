//! Parsed statement: predicates, order and paging for one request.

use super::predicate::{Conjunction, Predicate};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }

    pub fn is_ascending(&self) -> bool {
        matches!(self, Direction::Asc)
    }
}

/// One order-by entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Field to sort by
    pub field: String,
    /// Sort direction
    pub direction: Direction,
}

impl Order {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

/// Paging parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Rows to return
    pub max_rows: usize,
    /// Rows to skip
    pub offset: usize,
    /// Opaque continuation cursor
    pub marker: Option<String>,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            max_rows: 100,
            offset: 0,
            marker: None,
        }
    }
}

/// A parsed request, consumed by exactly one backend compiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Target table name
    pub table: String,
    /// How the top-level predicates combine
    pub conjunction: Conjunction,
    /// Top-level predicates
    pub predicates: Vec<Predicate>,
    /// Requested order
    pub order: Vec<Order>,
    /// Paging
    pub page: Page,
}

impl Statement {
    /// Creates an empty statement for a table
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            conjunction: Conjunction::And,
            predicates: Vec::new(),
            order: Vec::new(),
            page: Page::default(),
        }
    }

    /// Adds a predicate
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Sets the top-level combinator
    pub fn with_conjunction(mut self, conjunction: Conjunction) -> Self {
        self.conjunction = conjunction;
        self
    }

    /// Adds an order entry
    pub fn with_order(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    /// Sets paging
    pub fn with_page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }

    /// Predicates that must all hold.
    ///
    /// Under an AND conjunction these are the top-level predicates with
    /// nested `and` groups flattened; `or` groups stay whole. Under an OR
    /// conjunction nothing is guaranteed to hold.
    pub fn conjuncts(&self) -> Vec<&Predicate> {
        let mut out = Vec::new();
        if self.conjunction == Conjunction::And {
            for pred in &self.predicates {
                flatten_and(pred, &mut out);
            }
        }
        out
    }

    /// Maximum grouping depth of the predicate list, counting the
    /// top-level list as a group when it has more than one entry
    pub fn depth(&self) -> usize {
        let inner = self.predicates.iter().map(Predicate::depth).max().unwrap_or(0);
        if self.predicates.len() > 1 {
            inner + 1
        } else {
            inner
        }
    }
}

fn flatten_and<'a>(pred: &'a Predicate, out: &mut Vec<&'a Predicate>) {
    match pred {
        Predicate::And(children) => {
            for child in children {
                flatten_and(child, out);
            }
        }
        other => out.push(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Literal, Operator};

    fn eq(field: &str, value: &str) -> Predicate {
        Predicate::compare(Operator::Eq, field, vec![Literal::bare(value)]).unwrap()
    }

    #[test]
    fn test_statement_builder() {
        let stmt = Statement::new("users")
            .with_predicate(eq("city", "Chandler"))
            .with_order(Order::desc("rank"));

        assert_eq!(stmt.table, "users");
        assert_eq!(stmt.predicates.len(), 1);
        assert_eq!(stmt.order[0].direction, Direction::Desc);
        assert_eq!(stmt.page.max_rows, 100);
    }

    #[test]
    fn test_conjuncts_flatten_nested_and() {
        let stmt = Statement::new("t")
            .with_predicate(Predicate::And(vec![eq("a", "1"), eq("b", "2")]))
            .with_predicate(Predicate::Or(vec![eq("c", "3"), eq("d", "4")]))
            .with_predicate(eq("e", "5"));

        let conjuncts = stmt.conjuncts();
        assert_eq!(conjuncts.len(), 4);
        assert_eq!(conjuncts[2].token(), "or");
    }

    #[test]
    fn test_conjuncts_empty_under_or() {
        let stmt = Statement::new("t")
            .with_conjunction(Conjunction::Or)
            .with_predicate(eq("a", "1"))
            .with_predicate(eq("b", "2"));

        assert!(stmt.conjuncts().is_empty());
    }

    #[test]
    fn test_statement_depth() {
        let single = Statement::new("t").with_predicate(eq("a", "1"));
        assert_eq!(single.depth(), 0);

        let pair = single.clone().with_predicate(Predicate::Or(vec![eq("b", "2")]));
        assert_eq!(pair.depth(), 2);
    }
}
