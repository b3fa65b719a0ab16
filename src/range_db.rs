//! Range-based lookups
//!
//! [`RangeDatabase`] loads `start_ip,end_ip,country_code` records, sorts
//! them by start address and rejects the whole load if any two ranges
//! overlap. Lookups binary-search the sorted table: the candidate is the
//! last range whose start is at or below the address, and the address
//! matches only if it is also at or below that range's end.
//!
//! This layout suits datasets that partition large parts of the address
//! space, such as the DB-IP "IP to Country" CSV.

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::engine::{Dataset, Engine, Loaded};
use crate::error::{LoadError, LookupError, ParseError, RangeError};
use crate::parser::parse_range_lines;
use crate::range::{validate_sorted_ranges, IpRange};
use crate::stats::Stats;
use rayon::slice::ParallelSliceMut;
use std::io::BufRead;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Sorted, validated, non-overlapping range set
///
/// The table is immutable once built. It is what a [`RangeDatabase`]
/// commits on load, and can also be used on its own when the dataset is
/// already in memory and no caching or reloading is wanted.
#[derive(Debug, Clone, Default)]
pub struct RangeTable {
    ranges: Vec<IpRange>,
}

impl RangeTable {
    /// Sort `ranges` by start address and validate them
    ///
    /// ```rust
    /// use ip2country::{IpRange, RangeTable};
    ///
    /// let table = RangeTable::from_ranges(vec![
    ///     IpRange::new(200, 300, "US"),
    ///     IpRange::new(0, 100, "AU"),
    /// ])?;
    /// assert_eq!(table.find(250).map(|r| &*r.code), Some("US"));
    /// assert!(table.find(150).is_none());
    /// # Ok::<(), ip2country::RangeError>(())
    /// ```
    pub fn from_ranges(mut ranges: Vec<IpRange>) -> Result<Self, RangeError> {
        ranges.par_sort_unstable_by_key(|r| r.start);
        validate_sorted_ranges(&ranges)?;
        Ok(Self { ranges })
    }

    /// The range containing `ip`, if any
    pub fn find(&self, ip: u32) -> Option<&IpRange> {
        // upper bound on start, then step back one
        let idx = self.ranges.partition_point(|r| r.start <= ip);
        let candidate = self.ranges.get(idx.checked_sub(1)?)?;
        candidate.contains(ip).then_some(candidate)
    }

    /// Ranges in ascending order
    pub fn ranges(&self) -> &[IpRange] {
        &self.ranges
    }

    /// Number of ranges
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether the table holds no ranges
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl Dataset for RangeTable {
    const KIND: &'static str = "range";

    fn load(
        reader: Box<dyn BufRead + Send>,
        config: &Config,
        cancel: &CancelToken,
    ) -> Result<Loaded<Self>, LoadError> {
        let outcome = parse_range_lines(reader, config, cancel)?;
        let dataset = RangeTable::from_ranges(outcome.records)?;
        Ok(Loaded {
            dataset,
            errors: outcome.errors,
        })
    }

    fn resolve(&self, ip: u32) -> Option<&Arc<str>> {
        self.find(ip).map(|r| &r.code)
    }

    fn len(&self) -> usize {
        self.ranges.len()
    }
}

/// Thread-safe range lookup engine with lazy loading and an LRU cache
///
/// Nothing is read from disk until the first lookup (or an explicit
/// [`reload`](Self::reload)). Share one instance across threads with an
/// `Arc`.
///
/// # Example
///
/// ```rust,no_run
/// use ip2country::{Config, RangeDatabase};
///
/// let db = RangeDatabase::new("dbip-country-lite.csv", Config::default());
/// match db.lookup("8.8.8.8") {
///     Ok(code) => println!("8.8.8.8 is in {}", code),
///     Err(e) if e.is_not_found() => println!("unknown"),
///     Err(e) => return Err(e.into()),
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct RangeDatabase {
    engine: Engine<RangeTable>,
}

impl RangeDatabase {
    /// Create an engine for the range file at `path`
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
    ///
    /// Loads the dataset on first use. Fails with [`LookupError::Init`]
    /// while the dataset is unavailable, [`LookupError::InvalidIp`] for a
    /// malformed address and [`LookupError::NotFound`] for an address in
    /// no range.
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

    /// Discard the dataset and cache and load the source again
    ///
    /// On failure the engine holds no dataset and every lookup returns the
    /// error until a later reload succeeds.
    pub fn reload(&self) -> Result<(), LoadError> {
        self.engine.reload(&CancelToken::none())
    }

    /// Like [`reload`](Self::reload), aborting when `cancel` fires
    pub fn reload_with_cancel(&self, cancel: &CancelToken) -> Result<(), LoadError> {
        self.engine.reload(cancel)
    }

    /// Statistics snapshot
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

impl std::fmt::Debug for RangeDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeDatabase")
            .field("path", &self.path())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
