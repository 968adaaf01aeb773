//! Table metadata consumed by the compilers
//!
//! The compilers only read a fully-resolved snapshot; nothing here is
//! mutated during compilation.

mod loader;
mod types;

pub use loader::MetadataLoader;
pub use types::{Backend, Column, Index, IndexKind, Table};
