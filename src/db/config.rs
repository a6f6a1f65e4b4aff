//! Database configuration
//!
//! Loaded from a JSON file; every field is optional.
//!
//! ```json
//! { "page_size": 4096, "sync_on_commit": true }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{DbError, DbResult};
use crate::storage::{is_valid_page_size, DEFAULT_PAGE_SIZE};

/// Settings applied when a database file is created or opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    /// Page size for newly created files. Existing files keep the page size
    /// recorded in their header.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// fsync after writing blocks and after writing the trailer
    #[serde(default = "default_sync_on_commit")]
    pub sync_on_commit: bool,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_sync_on_commit() -> bool {
    true
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            sync_on_commit: default_sync_on_commit(),
        }
    }
}

impl DbConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> DbResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| DbError::Config(format!("Failed to read config: {}", e)))?;

        let config: DbConfig = serde_json::from_str(&content)
            .map_err(|e| DbError::Config(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Checks the page size is a power of two between 512 and 65536
    pub fn validate(&self) -> DbResult<()> {
        if !is_valid_page_size(self.page_size) {
            return Err(DbError::Config(format!(
                "Invalid page_size: {}. Must be a power of two between 512 and 65536.",
                self.page_size
            )));
        }
        Ok(())
    }
}
