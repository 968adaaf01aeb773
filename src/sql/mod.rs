//! # SQL Backend
//!
//! Parameterized `SELECT` generation for row stores.
//!
//! Output contract:
//! - identifiers resolved through table metadata and quoted per dialect
//! - one `?` per bound value, values in emission order
//! - grouping mirrors the predicate tree exactly
//! - primary key appended to `ORDER BY` for stable paging

mod compiler;
mod dialect;

pub use compiler::{SqlCompiler, SqlQuery};
pub use dialect::SqlDialect;
