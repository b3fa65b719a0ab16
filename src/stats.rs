//! Point-in-time engine statistics

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Snapshot of an engine's load and cache statistics
///
/// Load fields describe the most recent successful load; they are reset
/// when a load or reload fails. Cache counters are read from the cache
/// when the snapshot is taken and restart from zero on every reload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// When the current dataset was committed
    pub last_update: Option<SystemTime>,
    /// How long the current dataset took to load
    pub load_time: Duration,
    /// Size of the source on disk in bytes
    pub file_size: u64,
    /// Lookups answered from the cache
    pub cache_hits: u64,
    /// Lookups that had to consult the dataset
    pub cache_misses: u64,
    /// Ranges (or exact entries) currently loaded
    pub total_ranges: usize,
}

impl Stats {
    /// Fraction of cache probes that hit (0.0 when nothing was probed)
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    /// Seconds since the Unix epoch of the last update, if any
    pub fn last_update_unix(&self) -> Option<u64> {
        self.last_update
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let mut stats = Stats::default();
        assert_eq!(stats.cache_hit_rate(), 0.0);
        stats.cache_hits = 3;
        stats.cache_misses = 1;
        assert!((stats.cache_hit_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_last_update_unix() {
        let mut stats = Stats::default();
        assert_eq!(stats.last_update_unix(), None);
        stats.last_update = Some(SystemTime::UNIX_EPOCH + Duration::from_secs(90));
        assert_eq!(stats.last_update_unix(), Some(90));
    }
}
