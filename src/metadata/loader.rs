//! Metadata loader for table descriptors stored on disk.
//!
//! Every `*.json` file in the directory holds one table object or an array
//! of them. Malformed files fail the whole load.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::errors::{RqlError, RqlResult};

use super::types::Table;

#[derive(Deserialize)]
#[serde(untagged)]
enum TableFile {
    One(Table),
    Many(Vec<Table>),
}

/// Reads table descriptors and keeps them in an in-memory registry
pub struct MetadataLoader {
    /// Directory containing descriptor files
    dir: PathBuf,
    /// Loaded tables keyed by lower-cased name
    tables: BTreeMap<String, Table>,
}

impl MetadataLoader {
    /// Creates a loader for the given directory
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            tables: BTreeMap::new(),
        }
    }

    /// Returns the descriptor directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Loads every descriptor file in the directory
    pub fn load_all(&mut self) -> RqlResult<()> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            RqlError::invalid_metadata(
                self.dir.display().to_string(),
                format!("Failed to read metadata directory: {}", e),
            )
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                RqlError::invalid_metadata(
                    self.dir.display().to_string(),
                    format!("Failed to read directory entry: {}", e),
                )
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }

        // directory order is platform dependent
        paths.sort();
        for path in paths {
            self.load_file(&path)?;
        }

        Ok(())
    }

    fn load_file(&mut self, path: &Path) -> RqlResult<()> {
        let content = fs::read_to_string(path).map_err(|e| {
            RqlError::invalid_metadata(
                path.display().to_string(),
                format!("Failed to read file: {}", e),
            )
        })?;

        let parsed: TableFile = serde_json::from_str(&content).map_err(|e| {
            RqlError::invalid_metadata(path.display().to_string(), format!("Invalid JSON: {}", e))
        })?;

        let tables = match parsed {
            TableFile::One(table) => vec![table],
            TableFile::Many(tables) => tables,
        };

        for table in tables {
            debug!(
                event = "RQL_TABLE_LOADED",
                table = %table.name,
                backend = %table.backend,
                file = %path.display()
            );
            self.register(table)?;
        }

        Ok(())
    }

    /// Registers a table directly
    pub fn register(&mut self, table: Table) -> RqlResult<()> {
        table.validate()?;

        let key = table.name.to_ascii_lowercase();
        if self.tables.contains_key(&key) {
            return Err(RqlError::invalid_metadata(
                &table.name,
                "table is defined more than once",
            ));
        }
        self.tables.insert(key, table);
        Ok(())
    }

    /// Case-insensitive lookup
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(&name.to_ascii_lowercase())
    }

    /// All tables in name order
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
