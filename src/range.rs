//! IPv4 ranges and range-set validation
//!
//! A range dataset is only usable when its ranges are individually valid
//! and pairwise disjoint. [`validate_sorted_ranges`] is what the range
//! engine runs before committing a load; [`validate_ranges`] is the same
//! check for callers holding an unsorted set.

use crate::error::{RangeError, RecordError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Inclusive block of IPv4 addresses mapped to one country code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpRange {
    /// First address in the block
    pub start: u32,
    /// Last address in the block
    pub end: u32,
    /// Country code, e.g. `US`
    pub code: Arc<str>,
}

impl IpRange {
    /// Create a range (not validated)
    pub fn new(start: u32, end: u32, code: impl Into<Arc<str>>) -> Self {
        Self {
            start,
            end,
            code: code.into(),
        }
    }

    /// Whether `ip` falls inside the range
    #[inline]
    pub fn contains(&self, ip: u32) -> bool {
        ip >= self.start && ip <= self.end
    }

    /// Number of addresses covered (0 for an inverted range)
    pub fn len(&self) -> u64 {
        if self.start > self.end {
            0
        } else {
            u64::from(self.end - self.start) + 1
        }
    }

    /// Whether the range covers no addresses
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check `start <= end` and a non-empty code
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.start > self.end {
            return Err(RecordError::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }
        if self.code.is_empty() {
            return Err(RecordError::EmptyCode);
        }
        Ok(())
    }
}

/// Validate ranges already sorted ascending by `start`
///
/// Returns the first violation in index order: for each range, a malformed
/// range is reported before its overlap with the previous one.
pub fn validate_sorted_ranges(ranges: &[IpRange]) -> Result<(), RangeError> {
    for (index, current) in ranges.iter().enumerate() {
        current
            .validate()
            .map_err(|cause| RangeError::Invalid { index, cause })?;

        if let Some(previous) = index.checked_sub(1).map(|i| &ranges[i]) {
            if previous.end >= current.start {
                return Err(RangeError::Overlap {
                    first: (previous.start, previous.end),
                    second: (current.start, current.end),
                });
            }
        }
    }

    Ok(())
}

/// Validate an arbitrary set of ranges
///
/// Sorts a copy by `start` and runs [`validate_sorted_ranges`] on it; the
/// input is left untouched. Indices in the error refer to sorted order.
///
/// ```rust
/// use ip2country::range::{validate_ranges, IpRange};
///
/// let ranges = vec![IpRange::new(50, 150, "DE"), IpRange::new(0, 100, "FR")];
/// assert!(validate_ranges(&ranges).is_err());
/// ```
pub fn validate_ranges(ranges: &[IpRange]) -> Result<(), RangeError> {
    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(|r| r.start);
    validate_sorted_ranges(&sorted)
}
