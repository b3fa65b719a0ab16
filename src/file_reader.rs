//! Dataset source opening with size limits and automatic gzip decompression
//!
//! Files ending in `.gz` (case-insensitive) are decompressed on the fly.
//! The size limit applies to the bytes on disk, so a compressed source is
//! checked against its compressed size.
//!
//! # Example
//!
//! ```rust,no_run
//! use ip2country::file_reader;
//! use std::io::BufRead;
//!
//! let source = file_reader::open_source("ranges.csv.gz", 100 << 20)?;
//! println!("{} bytes on disk", source.size);
//! for line in source.reader.lines() {
//!     println!("{}", line?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::LoadError;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Buffer size for source reading (128KB)
const BUFFER_SIZE: usize = 128 * 1024;

/// An opened, size-checked dataset source
pub struct Source {
    /// Buffered reader over the (decompressed) contents
    pub reader: Box<dyn BufRead + Send>,
    /// Size of the file on disk in bytes
    pub size: u64,
}

/// Open a dataset source and enforce the byte limit
///
/// `max_file_size` of 0 disables the limit.
///
/// # Errors
///
/// - [`LoadError::Io`] if the file cannot be opened or stat'ed
/// - [`LoadError::FileTooLarge`] if it exceeds `max_file_size`
pub fn open_source<P: AsRef<Path>>(path: P, max_file_size: u64) -> Result<Source, LoadError> {
    let path = path.as_ref();

    let file = File::open(path)
        .map_err(|e| LoadError::Io(format!("failed to open {}: {}", path.display(), e)))?;
    let size = file
        .metadata()
        .map_err(|e| LoadError::Io(format!("failed to get file stats: {}", e)))?
        .len();

    if max_file_size > 0 && size > max_file_size {
        return Err(LoadError::FileTooLarge {
            size,
            limit: max_file_size,
        });
    }

    Ok(Source {
        reader: from_file(file, is_gzip_path(path)),
        size,
    })
}

/// Wrap an already-opened file, decompressing when `is_gzip` is set
pub fn from_file(file: File, is_gzip: bool) -> Box<dyn BufRead + Send> {
    if is_gzip {
        let decoder = GzDecoder::new(file);
        Box::new(BufReader::with_capacity(BUFFER_SIZE, decoder))
    } else {
        Box::new(BufReader::with_capacity(BUFFER_SIZE, file))
    }
}

fn is_gzip_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}
