//! Load-time configuration
//!
//! A [`Config`] is handed to an engine at construction and never changes
//! afterwards. It can be built in code with the `with_*` setters or read
//! from a JSON document where every field is optional:
//!
//! ```json
//! { "delimiter": ";", "skip_header": true, "cache_size": 5000 }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default LRU cache capacity
pub const DEFAULT_CACHE_SIZE: usize = 1000;

/// Default maximum source size (100 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 << 20;

/// Default maximum number of records to load
pub const DEFAULT_MAX_RECORDS: usize = 1_000_000;

/// Configuration for the lookup engines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Field separator within a record
    pub delimiter: char,
    /// Largest source accepted, in bytes (0 = unlimited)
    pub max_file_size: u64,
    /// Stop loading after this many good records (0 = unlimited)
    pub max_records: usize,
    /// LRU cache capacity (0 = use the default)
    pub cache_size: usize,
    /// Ignore the first line of the source
    pub skip_header: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            delimiter: ',',
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_records: DEFAULT_MAX_RECORDS,
            cache_size: DEFAULT_CACHE_SIZE,
            skip_header: false,
        }
    }
}

impl Config {
    /// Set the field delimiter
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the source size limit in bytes (0 = unlimited)
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Set the record limit (0 = unlimited)
    pub fn with_max_records(mut self, records: usize) -> Self {
        self.max_records = records;
        self
    }

    /// Set the LRU cache capacity
    pub fn with_cache_size(mut self, entries: usize) -> Self {
        self.cache_size = entries;
        self
    }

    /// Skip (or keep) the first line of the source
    pub fn with_skip_header(mut self, skip: bool) -> Self {
        self.skip_header = skip;
        self
    }

    /// Cache capacity after applying the default for 0
    pub fn effective_cache_size(&self) -> usize {
        if self.cache_size == 0 {
            DEFAULT_CACHE_SIZE
        } else {
            self.cache_size
        }
    }

    /// Parse a configuration from JSON; absent fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text).map_err(std::io::Error::other)
    }
}
