//! # Document-Search Backend
//!
//! Builds search query DSL requests from parsed statements, folding
//! predicates on nested object fields into `nested` queries.

mod compiler;
mod dsl;

pub use compiler::SearchCompiler;
pub use dsl::{BoolQuery, QueryNode, RangeOp, SearchRequest, SortField};
