//! Compiler Configuration
//!
//! Paging defaults and the identity field used for deterministic ordering.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{RqlError, RqlResult};

/// RQL compiler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RqlConfig {
    /// Rows per page when the request does not say (default: 100)
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Largest page a request may ask for (default: 1000)
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Field appended as the final search sort key (default: "id")
    #[serde(default = "default_identity_field")]
    pub identity_field: String,

    /// Glyph that marks a wildcard in literal values (default: '*')
    #[serde(default = "default_wildcard")]
    pub wildcard: char,
}

fn default_page_size() -> usize {
    100
}

fn default_max_page_size() -> usize {
    1000
}

fn default_identity_field() -> String {
    "id".to_string()
}

fn default_wildcard() -> char {
    '*'
}

impl Default for RqlConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            identity_field: default_identity_field(),
            wildcard: default_wildcard(),
        }
    }
}

impl RqlConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> RqlResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            RqlError::invalid_metadata("<config>", format!("Failed to read config: {}", e))
        })?;
        Self::from_json(&content)
    }

    /// Parse configuration from JSON text
    pub fn from_json(content: &str) -> RqlResult<Self> {
        let config: RqlConfig = serde_json::from_str(content).map_err(|e| {
            RqlError::invalid_metadata("<config>", format!("Invalid config JSON: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> RqlResult<()> {
        if self.default_page_size == 0 {
            return Err(RqlError::invalid_metadata(
                "<config>",
                "default_page_size must be > 0",
            ));
        }
        if self.default_page_size > self.max_page_size {
            return Err(RqlError::invalid_metadata(
                "<config>",
                format!(
                    "default_page_size {} exceeds max_page_size {}",
                    self.default_page_size, self.max_page_size
                ),
            ));
        }
        if self.identity_field.trim().is_empty() {
            return Err(RqlError::invalid_metadata(
                "<config>",
                "identity_field cannot be empty",
            ));
        }
        Ok(())
    }
}
