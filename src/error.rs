//! Error types for the ip2country library
use std::fmt;

/// Result type alias for lookups
pub type Result<T> = std::result::Result<T, LookupError>;

/// Error returned when an address string cannot be turned into an IPv4 number
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpParseError {
    /// Input was empty
    Empty,
    /// Input parsed as an IPv6 address
    NotIpv4(String),
    /// Input is neither dotted-decimal nor a 32-bit decimal integer
    InvalidFormat(String),
}

impl fmt::Display for IpParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpParseError::Empty => write!(f, "empty IP address"),
            IpParseError::NotIpv4(s) => write!(f, "not an IPv4 address: {}", s),
            IpParseError::InvalidFormat(s) => write!(f, "invalid IP format: {}", s),
        }
    }
}

impl std::error::Error for IpParseError {}

/// Why a single record (line) of the dataset was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Line did not split into the expected number of fields
    FieldCount {
        /// Fields the record format requires
        expected: usize,
        /// Fields actually present
        found: usize,
    },
    /// First address of a range record is malformed
    InvalidStartIp(String, IpParseError),
    /// Last address of a range record is malformed
    InvalidEndIp(String, IpParseError),
    /// Address of an exact record is malformed
    InvalidIp(String, IpParseError),
    /// Country code field is empty
    EmptyCode,
    /// Range whose start lies after its end
    InvalidRange {
        /// First address
        start: u32,
        /// Last address
        end: u32,
    },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::FieldCount { expected, found } => write!(
                f,
                "incorrect number of fields: expected {}, got {}",
                expected, found
            ),
            RecordError::InvalidStartIp(raw, e) => write!(f, "invalid start IP {:?}: {}", raw, e),
            RecordError::InvalidEndIp(raw, e) => write!(f, "invalid end IP {:?}: {}", raw, e),
            RecordError::InvalidIp(raw, e) => write!(f, "invalid IP {:?}: {}", raw, e),
            RecordError::EmptyCode => write!(f, "country code cannot be empty"),
            RecordError::InvalidRange { start, end } => {
                write!(f, "invalid range: start IP {} > end IP {}", start, end)
            }
        }
    }
}

impl std::error::Error for RecordError {}

/// A rejected line of the source dataset
///
/// Parse errors never abort a load; they are collected and can be
/// inspected after the dataset is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based line number within the source
    pub line: usize,
    /// Trimmed content of the offending line
    pub content: String,
    /// What was wrong with it
    pub cause: RecordError,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}: {} (content: {:?})",
            self.line, self.cause, self.content
        )
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Structural problem with a set of ranges
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// A single range is malformed
    Invalid {
        /// Position within the sorted set
        index: usize,
        /// The underlying problem
        cause: RecordError,
    },
    /// Two adjacent ranges share at least one address
    Overlap {
        /// Bounds of the earlier range
        first: (u32, u32),
        /// Bounds of the later range
        second: (u32, u32),
    },
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeError::Invalid { index, cause } => {
                write!(f, "invalid range at index {} (after sorting): {}", index, cause)
            }
            RangeError::Overlap { first, second } => write!(
                f,
                "overlapping ranges: [{}-{}] and [{}-{}]",
                first.0, first.1, second.0, second.1
            ),
        }
    }
}

impl std::error::Error for RangeError {}

/// Failure while loading a dataset
///
/// Once an engine fails to load, this error is returned by every lookup
/// until a reload succeeds, so it is cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Source could not be opened or inspected
    Io(String),
    /// Source exceeds the configured size limit
    FileTooLarge {
        /// Size of the source in bytes
        size: u64,
        /// Configured limit in bytes
        limit: u64,
    },
    /// Reading the source failed part way through
    Scan(String),
    /// The committed range set failed structural validation
    Validation(RangeError),
    /// Load was cancelled through its token
    Cancelled,
    /// Load ran past its token's deadline
    DeadlineExceeded,
}

impl LoadError {
    /// Whether this load was aborted by its cancellation token
    pub fn is_cancellation(&self) -> bool {
        matches!(self, LoadError::Cancelled | LoadError::DeadlineExceeded)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(msg) => write!(f, "I/O error: {}", msg),
            LoadError::FileTooLarge { size, limit } => {
                write!(f, "file size {} exceeds limit {}", size, limit)
            }
            LoadError::Scan(msg) => write!(f, "scanner error: {}", msg),
            LoadError::Validation(err) => write!(f, "range validation failed: {}", err),
            LoadError::Cancelled => write!(f, "load cancelled"),
            LoadError::DeadlineExceeded => write!(f, "load deadline exceeded"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RangeError> for LoadError {
    fn from(err: RangeError) -> Self {
        LoadError::Validation(err)
    }
}

/// Error returned by a lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The address maps to no range or entry
    NotFound,
    /// The query string is not a usable IPv4 address
    InvalidIp(IpParseError),
    /// The dataset failed to load; repeated until a successful reload
    Init(LoadError),
}

impl LookupError {
    /// Whether this is the ordinary "no country for this address" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound)
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::NotFound => write!(f, "country not found for IP"),
            LookupError::InvalidIp(err) => write!(f, "invalid IP: {}", err),
            LookupError::Init(err) => write!(f, "initialization failed: {}", err),
        }
    }
}

impl std::error::Error for LookupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LookupError::NotFound => None,
            LookupError::InvalidIp(err) => Some(err),
            LookupError::Init(err) => Some(err),
        }
    }
}

impl From<IpParseError> for LookupError {
    fn from(err: IpParseError) -> Self {
        LookupError::InvalidIp(err)
    }
}

impl From<LoadError> for LookupError {
    fn from(err: LoadError) -> Self {
        LookupError::Init(err)
    }
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        LoadError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError {
            line: 7,
            content: "1.2.3.4,US".to_string(),
            cause: RecordError::FieldCount {
                expected: 3,
                found: 2,
            },
        };
        assert_eq!(
            err.to_string(),
            "line 7: incorrect number of fields: expected 3, got 2 (content: \"1.2.3.4,US\")"
        );
    }

    #[test]
    fn test_overlap_display_names_both_ranges() {
        let err = LoadError::from(RangeError::Overlap {
            first: (0, 100),
            second: (50, 150),
        });
        let msg = err.to_string();
        assert!(msg.contains("[0-100]"));
        assert!(msg.contains("[50-150]"));
    }

    #[test]
    fn test_lookup_error_kinds() {
        assert!(LookupError::NotFound.is_not_found());
        assert!(!LookupError::Init(LoadError::Cancelled).is_not_found());
        assert!(LoadError::DeadlineExceeded.is_cancellation());
        assert!(!LoadError::Scan("eof".into()).is_cancellation());
    }
}
