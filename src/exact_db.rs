//! Exact-match lookups
//!
//! [`ExactDatabase`] loads `ip,country_code` records into a hash map and
//! answers lookups with a direct probe. It suits small datasets of
//! individual addresses. Keys are independent, so there is no ordering or
//! overlap check; when an address appears twice the later line wins.
//! Malformed lines never abort a load and are available from
//! [`ExactDatabase::parse_errors`].

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::engine::{Dataset, Engine, Loaded};
use crate::error::{LoadError, LookupError, ParseError};
use crate::parser::parse_exact_lines;
use crate::stats::Stats;
use rustc_hash::FxHashMap;
use std::io::BufRead;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Address → country code map
#[derive(Debug, Clone, Default)]
pub struct ExactTable {
    entries: FxHashMap<u32, Arc<str>>,
}

impl ExactTable {
    /// Build from `(ip, code)` pairs; later pairs replace earlier ones
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u32, Arc<str>)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Code mapped to `ip`, if any
    pub fn get(&self, ip: u32) -> Option<&Arc<str>> {
        self.entries.get(&ip)
    }

    /// Number of distinct addresses
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Dataset for ExactTable {
    const KIND: &'static str = "exact";

    fn load(
        reader: Box<dyn BufRead + Send>,
        config: &Config,
        cancel: &CancelToken,
    ) -> Result<Loaded<Self>, LoadError> {
        let outcome = parse_exact_lines(reader, config, cancel)?;
        Ok(Loaded {
            dataset: ExactTable::from_entries(outcome.records),
            errors: outcome.errors,
        })
    }

    fn resolve(&self, ip: u32) -> Option<&Arc<str>> {
        self.get(ip)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Thread-safe exact-match lookup engine with lazy loading and an LRU cache
///
/// Shares its lifecycle with [`RangeDatabase`](crate::RangeDatabase): the
/// source is read on first use, a failed load is sticky until a successful
/// [`reload`](Self::reload), and results (including misses) are cached.
pub struct ExactDatabase {
    engine: Engine<ExactTable>,
}

impl ExactDatabase {
    /// Create an engine for the exact-match file at `path`
    pub fn new(path: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            engine: Engine::new(path.into(), config),
        }
    }

    /// Create an engine with [`Config::default`]
    pub fn with_defaults(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Config::default())
    }

    /// Country code for an address string
    pub fn lookup(&self, ip: &str) -> Result<Arc<str>, LookupError> {
        self.engine.lookup(ip, &CancelToken::none())
    }

    /// Like [`lookup`](Self::lookup); a first-use load observes `cancel`
    pub fn lookup_with_cancel(
        &self,
        ip: &str,
        cancel: &CancelToken,
    ) -> Result<Arc<str>, LookupError> {
        self.engine.lookup(ip, cancel)
    }

    /// Country code for a numeric address
    pub fn lookup_u32(&self, ip: u32) -> Result<Arc<str>, LookupError> {
        self.engine.lookup_u32(ip, &CancelToken::none())
    }

    /// Country code for a parsed address
    pub fn lookup_addr(&self, addr: Ipv4Addr) -> Result<Arc<str>, LookupError> {
        self.lookup_u32(u32::from(addr))
    }

    /// Discard the map and cache and load the source again
    pub fn reload(&self) -> Result<(), LoadError> {
        self.engine.reload(&CancelToken::none())
    }

    /// Like [`reload`](Self::reload), aborting when `cancel` fires
    pub fn reload_with_cancel(&self, cancel: &CancelToken) -> Result<(), LoadError> {
        self.engine.reload(cancel)
    }

    /// Statistics snapshot; `total_ranges` counts distinct addresses
    pub fn stats(&self) -> Stats {
        self.engine.stats()
    }

    /// Lines rejected by the most recent successful load
    pub fn parse_errors(&self) -> Vec<ParseError> {
        self.engine.parse_errors()
    }

    /// Whether a dataset is currently committed
    pub fn is_loaded(&self) -> bool {
        self.engine.is_loaded()
    }

    /// The sticky error of the last failed load, if the engine is failed
    pub fn load_error(&self) -> Option<LoadError> {
        self.engine.load_error()
    }

    /// Number of outcomes currently cached
    pub fn cached_entries(&self) -> usize {
        self.engine.cached_entries()
    }

    /// Source path
    pub fn path(&self) -> &Path {
        self.engine.path()
    }

    /// Configuration in effect
    pub fn config(&self) -> &Config {
        self.engine.config()
    }
}

impl std::fmt::Debug for ExactDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExactDatabase")
            .field("path", &self.path())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_entry_wins() {
        let table = ExactTable::from_entries(vec![
            (1, Arc::from("US")),
            (2, Arc::from("DE")),
            (1, Arc::from("FR")),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1).map(|c| &**c), Some("FR"));
        assert!(table.get(3).is_none());
    }

    #[test]
    fn test_lookup_and_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exact.csv");
        std::fs::write(&path, "8.8.8.8,US\n1.1.1.1\n134744073,US\n9.9.9.9,\n").unwrap();

        let db = ExactDatabase::with_defaults(&path);
        assert_eq!(&*db.lookup("8.8.8.8").unwrap(), "US");
        assert_eq!(&*db.lookup("8.8.8.9").unwrap(), "US");
        assert_eq!(db.lookup("8.8.8.10"), Err(LookupError::NotFound));

        let errors = db.parse_errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line, 2);
        assert_eq!(errors[1].line, 4);
        assert_eq!(db.stats().total_ranges, 2);
    }
}
