//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The three-range dataset used throughout the tests
pub const SAMPLE_RANGES: &str = "\
1.0.0.0,1.0.0.255,AU
1.0.1.0,1.0.3.255,CN
8.8.8.0,8.8.8.255,US
";

/// Write `contents` to `name` inside `dir`
pub fn write_dataset(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// Write `contents` gzip-compressed to `name` inside `dir`
pub fn write_gzip_dataset(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let path = dir.path().join(name);
    let file = std::fs::File::create(&path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(contents.as_bytes()).unwrap();
    encoder.finish().unwrap();
    path
}

/// Atomically replace a dataset's contents
pub fn replace_dataset(path: &Path, contents: &str) {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents).unwrap();
    std::fs::rename(&tmp, path).unwrap();
}
