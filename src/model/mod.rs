//! Predicate model shared by the parser and every backend compiler.
//!
//! No logic beyond construction, accessors and display. A `Statement` is
//! built once per request and is read-only afterwards.

mod predicate;
mod statement;
mod term;

pub use predicate::{Arity, Comparison, Conjunction, Operator, Predicate};
pub use statement::{Direction, Order, Page, Statement};
pub use term::{Literal, Term};
