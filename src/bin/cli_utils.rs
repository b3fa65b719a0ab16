use anyhow::{Context, Result};
use clap::Args;
use ip2country::{Config, CountryLookup, ExactDatabase, RangeDatabase};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Dataset loading options shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct LoadArgs {
    /// Dataset holds single addresses (ip,country_code) instead of ranges
    #[arg(long)]
    pub exact: bool,

    /// Field delimiter (default: ',')
    #[arg(long, value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Ignore the first line of the dataset
    #[arg(long)]
    pub skip_header: bool,

    /// LRU cache capacity (default: 1000)
    #[arg(long, value_name = "ENTRIES")]
    pub cache_size: Option<usize>,

    /// Refuse datasets larger than this many bytes (0 = unlimited)
    #[arg(long, value_name = "BYTES")]
    pub max_file_size: Option<u64>,

    /// Stop after this many records (0 = unlimited)
    #[arg(long, value_name = "COUNT")]
    pub max_records: Option<usize>,

    /// JSON file with base settings; flags given on the command line win
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl LoadArgs {
    /// Resolve the effective configuration
    pub fn to_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(delimiter) = self.delimiter {
            config = config.with_delimiter(delimiter);
        }
        if self.skip_header {
            config = config.with_skip_header(true);
        }
        if let Some(size) = self.cache_size {
            config = config.with_cache_size(size);
        }
        if let Some(bytes) = self.max_file_size {
            config = config.with_max_file_size(bytes);
        }
        if let Some(count) = self.max_records {
            config = config.with_max_records(count);
        }
        Ok(config)
    }

    /// Build the engine selected by `--exact` for `data`
    pub fn open(&self, data: &Path) -> Result<Arc<dyn CountryLookup + Send + Sync>> {
        let config = self.to_config()?;
        let engine: Arc<dyn CountryLookup + Send + Sync> = if self.exact {
            Arc::new(ExactDatabase::new(data, config))
        } else {
            Arc::new(RangeDatabase::new(data, config))
        };
        Ok(engine)
    }

    pub fn mode(&self) -> &'static str {
        if self.exact {
            "exact"
        } else {
            "range"
        }
    }
}

pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

pub fn format_qps(qps: f64) -> String {
    if qps >= 1_000_000.0 {
        format!("{:.2}M", qps / 1_000_000.0)
    } else if qps >= 1_000.0 {
        format!("{:.2}K", qps / 1_000.0)
    } else {
        format!("{:.2}", qps)
    }
}
