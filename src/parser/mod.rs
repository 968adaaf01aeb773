//! # RQL Parser
//!
//! Turns URL query parameters into a backend-neutral `Statement`.
//!
//! Syntax:
//! - `eq(city,CHANDLER)` a call in the key with no value
//! - `city=CHANDLER` shorthand for `eq`
//! - `and(...)` / `or(...)` nest freely
//! - `order`, `pagesize`, `offset`, `page`, `marker` are reserved

mod parser;
mod tokenizer;

pub use parser::{term_to_predicate, Parser};
pub use tokenizer::{dequote, is_call, parse_term, split_args};
