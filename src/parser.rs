//! Streaming dataset parser
//!
//! Two line formats are understood, both using the configured delimiter:
//!
//! ```text
//! start_ip,end_ip,country_code     range records
//! ip,country_code                  exact records
//! ```
//!
//! Each address field may be dotted-decimal or a 32-bit decimal integer.
//! Fields are trimmed of surrounding whitespace. Blank lines are skipped,
//! as is the first line when `skip_header` is set. A malformed line is
//! recorded as a [`ParseError`] and skipped; it never aborts the parse.
//!
//! Country codes are interned while parsing, so a dataset with millions of
//! `US` rows keeps a single `US` allocation.

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::{LoadError, ParseError, RecordError};
use crate::file_reader;
use crate::ip::parse_ipv4;
use crate::range::IpRange;
use rustc_hash::FxHashSet;
use std::io::{self, BufRead};
use std::path::Path;
use std::sync::Arc;

/// Everything a parse produced
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome<T> {
    /// Successfully parsed records, in source order
    pub records: Vec<T>,
    /// Rejected lines
    pub errors: Vec<ParseError>,
    /// Number of lines read (including skipped ones)
    pub lines: usize,
    /// Size of the source on disk, when parsed from a file
    pub source_size: u64,
}

/// Line splitter over a buffered reader
///
/// Uses memchr to find line ends and reuses the caller's buffer, so no
/// allocation happens per line once the buffer has grown. Every line is
/// returned, including empty ones, so line numbers match the source.
/// A trailing `\r` is stripped.
pub struct LineScanner<R: BufRead> {
    reader: R,
    line: usize,
    eof: bool,
}

impl<R: BufRead> LineScanner<R> {
    /// Wrap a reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            eof: false,
        }
    }

    /// 1-based number of the line most recently returned
    pub fn line_number(&self) -> usize {
        self.line
    }

    /// Read the next line into `buf`, without its terminator
    ///
    /// Returns `Ok(false)` at end of input.
    pub fn next_line(&mut self, buf: &mut Vec<u8>) -> io::Result<bool> {
        buf.clear();
        if self.eof {
            return Ok(false);
        }

        loop {
            let available = self.reader.fill_buf()?;

            if available.is_empty() {
                self.eof = true;
                if buf.is_empty() {
                    return Ok(false);
                }
                break;
            }

            if let Some(newline_pos) = memchr::memchr(b'\n', available) {
                buf.extend_from_slice(&available[..newline_pos]);
                self.reader.consume(newline_pos + 1);
                break;
            }

            buf.extend_from_slice(available);
            let consumed = available.len();
            self.reader.consume(consumed);
        }

        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        self.line += 1;
        Ok(true)
    }
}

/// Deduplicates country code allocations within one load
#[derive(Debug, Default)]
pub struct CodeInterner {
    codes: FxHashSet<Arc<str>>,
}

impl CodeInterner {
    /// Create an empty interner
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle for `code`
    pub fn intern(&mut self, code: &str) -> Arc<str> {
        if let Some(existing) = self.codes.get(code) {
            return Arc::clone(existing);
        }
        let code: Arc<str> = Arc::from(code);
        self.codes.insert(Arc::clone(&code));
        code
    }

    /// Number of distinct codes seen
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether no code has been interned
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Split `line` into exactly `N` trimmed fields
fn split_fields<const N: usize>(line: &str, delimiter: char) -> Result<[&str; N], RecordError> {
    let mut fields = [""; N];
    let mut found = 0;
    for field in line.split(delimiter) {
        if found < N {
            fields[found] = field.trim();
        }
        found += 1;
    }
    if found != N {
        return Err(RecordError::FieldCount { expected: N, found });
    }
    Ok(fields)
}

fn range_record(
    line: &str,
    delimiter: char,
    interner: &mut CodeInterner,
) -> Result<IpRange, RecordError> {
    let [start, end, code] = split_fields::<3>(line, delimiter)?;

    let start_ip =
        parse_ipv4(start).map_err(|e| RecordError::InvalidStartIp(start.to_string(), e))?;
    let end_ip = parse_ipv4(end).map_err(|e| RecordError::InvalidEndIp(end.to_string(), e))?;

    if start_ip > end_ip {
        return Err(RecordError::InvalidRange {
            start: start_ip,
            end: end_ip,
        });
    }
    if code.is_empty() {
        return Err(RecordError::EmptyCode);
    }

    Ok(IpRange {
        start: start_ip,
        end: end_ip,
        code: interner.intern(code),
    })
}

fn exact_record(
    line: &str,
    delimiter: char,
    interner: &mut CodeInterner,
) -> Result<(u32, Arc<str>), RecordError> {
    let [ip, code] = split_fields::<2>(line, delimiter)?;

    let ip_num = parse_ipv4(ip).map_err(|e| RecordError::InvalidIp(ip.to_string(), e))?;
    if code.is_empty() {
        return Err(RecordError::EmptyCode);
    }

    Ok((ip_num, interner.intern(code)))
}

/// Parse one `start_ip<d>end_ip<d>code` line
///
/// ```rust
/// use ip2country::parser::parse_range_record;
///
/// let range = parse_range_record("1.0.0.0, 1.0.0.255, AU", ',').unwrap();
/// assert_eq!((range.start, range.end, &*range.code), (16777216, 16777471, "AU"));
/// ```
pub fn parse_range_record(line: &str, delimiter: char) -> Result<IpRange, RecordError> {
    range_record(line, delimiter, &mut CodeInterner::new())
}

/// Parse one `ip<d>code` line
pub fn parse_exact_record(line: &str, delimiter: char) -> Result<(u32, Arc<str>), RecordError> {
    exact_record(line, delimiter, &mut CodeInterner::new())
}

/// Drive a line parser over a reader
///
/// `parse_line` receives each trimmed, non-blank, non-header line. The
/// token is checked before every line; a fired token aborts with its error
/// and discards everything parsed so far. Parsing stops once
/// `config.max_records` records were accepted (0 = no limit).
pub fn parse_records<R, T, F>(
    reader: R,
    config: &Config,
    cancel: &CancelToken,
    mut parse_line: F,
) -> Result<ParseOutcome<T>, LoadError>
where
    R: BufRead,
    F: FnMut(&str) -> Result<T, RecordError>,
{
    let mut scanner = LineScanner::new(reader);
    let mut buf = Vec::with_capacity(256);
    let mut outcome = ParseOutcome {
        records: Vec::new(),
        errors: Vec::new(),
        lines: 0,
        source_size: 0,
    };

    loop {
        cancel.check()?;

        let more = scanner
            .next_line(&mut buf)
            .map_err(|e| LoadError::Scan(e.to_string()))?;
        if !more {
            break;
        }

        let line_num = scanner.line_number();
        let text = String::from_utf8_lossy(&buf);
        let line = text.trim();
        if line.is_empty() || (config.skip_header && line_num == 1) {
            continue;
        }

        match parse_line(line) {
            Ok(record) => {
                outcome.records.push(record);
                if config.max_records > 0 && outcome.records.len() >= config.max_records {
                    break;
                }
            }
            Err(cause) => outcome.errors.push(ParseError {
                line: line_num,
                content: line.to_string(),
                cause,
            }),
        }
    }

    outcome.lines = scanner.line_number();
    Ok(outcome)
}

/// Parse range records from a reader
pub fn parse_range_lines<R: BufRead>(
    reader: R,
    config: &Config,
    cancel: &CancelToken,
) -> Result<ParseOutcome<IpRange>, LoadError> {
    let mut interner = CodeInterner::new();
    parse_records(reader, config, cancel, |line| {
        range_record(line, config.delimiter, &mut interner)
    })
}

/// Parse exact records from a reader
pub fn parse_exact_lines<R: BufRead>(
    reader: R,
    config: &Config,
    cancel: &CancelToken,
) -> Result<ParseOutcome<(u32, Arc<str>)>, LoadError> {
    let mut interner = CodeInterner::new();
    parse_records(reader, config, cancel, |line| {
        exact_record(line, config.delimiter, &mut interner)
    })
}

/// Parse a range file without building a lookup engine
///
/// Applies the size limit and every parsing rule a [`RangeDatabase`]
/// load would, but performs no sorting or overlap validation. Useful for
/// inspecting a dataset before deploying it.
///
/// [`RangeDatabase`]: crate::RangeDatabase
pub fn parse_ranges_file<P: AsRef<Path>>(
    path: P,
    config: &Config,
) -> Result<ParseOutcome<IpRange>, LoadError> {
    let source = file_reader::open_source(path, config.max_file_size)?;
    let mut outcome = parse_range_lines(source.reader, config, &CancelToken::none())?;
    outcome.source_size = source.size;
    Ok(outcome)
}
