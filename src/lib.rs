//! rql - query-string compiler for relational, partition-key and search stores
//!
//! A request's query parameters are parsed once into a backend-neutral
//! `Statement`, then compiled by the compiler registered for the table's
//! backend:
//! - `sql`: parameterized `SELECT` text
//! - `partition`: index choice, key condition and residual filter
//! - `search`: search DSL with nested-path folding

pub mod cli;
pub mod compiler;
pub mod config;
pub mod errors;
pub mod metadata;
pub mod model;
pub mod parser;
pub mod partition;
pub mod search;
pub mod sql;

pub use compiler::{CompiledQuery, Compiler, CompilerRegistry};
pub use config::RqlConfig;
pub use errors::{RqlError, RqlResult};
pub use metadata::{Backend, Column, Index, IndexKind, MetadataLoader, Table};
pub use model::{Comparison, Conjunction, Direction, Literal, Operator, Order, Page, Predicate, Statement, Term};
pub use parser::Parser;
