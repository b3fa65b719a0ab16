//! ip2country - Fast IPv4 to Country Code Lookups
//!
//! ip2country resolves IPv4 addresses to country codes from a bulk-loaded
//! text dataset. Two engines are provided:
//!
//! - [`RangeDatabase`]: `start_ip,end_ip,country_code` records, sorted and
//!   checked for overlaps, searched with a binary search. Suited to
//!   datasets covering the whole address space, such as the free DB-IP
//!   "IP to Country" CSV.
//! - [`ExactDatabase`]: `ip,country_code` records in a hash map, for small
//!   sets of individual addresses.
//!
//! # Quick Start
//!
//! ```rust
//! use ip2country::{Config, RangeDatabase};
//! # let dir = tempfile::tempdir()?;
//! # let path = dir.path().join("ranges.csv");
//! # std::fs::write(&path, "1.0.0.0,1.0.0.255,AU\n1.0.1.0,1.0.3.255,CN\n8.8.8.0,8.8.8.255,US\n")?;
//!
//! let db = RangeDatabase::new(&path, Config::default());
//!
//! // The dataset is loaded on the first lookup
//! assert_eq!(&*db.lookup("1.0.1.15")?, "CN");
//! assert_eq!(&*db.lookup("8.8.8.8")?, "US");
//! assert!(db.lookup("9.9.9.9").unwrap_err().is_not_found());
//!
//! // Swap in a new dataset without stopping readers
//! db.reload()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Key Features
//!
//! - **Lazy loading**: the source is read once, on first use, by exactly
//!   one thread even under concurrent first lookups
//! - **Atomic reload**: readers see either the old or the new dataset,
//!   never a mix
//! - **Result cache**: an LRU cache of positive and negative outcomes
//! - **Sticky failures**: a failed load is reported by every lookup until
//!   a reload succeeds
//! - **Cancellation**: loads check a [`CancelToken`] at every record
//! - **Flexible input**: dotted-decimal or integer addresses, custom
//!   delimiter, optional header, gzip-compressed sources
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐   records   ┌──────────────────────────────┐
//! │ parser        │────────────▶│ engine (RwLock)              │
//! │ line scanner  │             │  ├─ RangeTable / ExactTable  │
//! │ record errors │             │  ├─ stats, parse errors      │
//! └───────────────┘             │  └─ LookupCache (Mutex, LRU) │
//!         ▲                     └──────────────────────────────┘
//!   file_reader                        ▲ lookup / reload / stats
//!   (size limit, gzip)                 │
//!                                CountryLookup
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// LRU cache of lookup outcomes
pub mod cache;
pub mod cancel;
pub mod config;
mod engine;
/// Error types for loads and lookups
pub mod error;
pub mod exact_db;
pub mod file_reader;
pub mod ip;
pub mod lookup;
pub mod parser;
pub mod range;
pub mod range_db;
/// Statistics snapshots
pub mod stats;

// Re-exports for Rust consumers

pub use crate::cache::{CacheEntry, LookupCache};
pub use crate::cancel::CancelToken;
pub use crate::config::Config;
pub use crate::error::{
    IpParseError, LoadError, LookupError, ParseError, RangeError, RecordError,
};
pub use crate::exact_db::{ExactDatabase, ExactTable};
pub use crate::ip::{format_ipv4, parse_ipv4};
pub use crate::lookup::CountryLookup;
pub use crate::parser::{parse_ranges_file, ParseOutcome};
pub use crate::range::{validate_ranges, validate_sorted_ranges, IpRange};
pub use crate::range_db::{RangeDatabase, RangeTable};
pub use crate::stats::Stats;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
