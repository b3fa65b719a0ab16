use anyhow::{Context, Result};
use serde_json::json;
use std::path::PathBuf;

use crate::cli_utils::LoadArgs;

pub fn cmd_stats(data: PathBuf, load: LoadArgs) -> Result<()> {
    let db = load.open(&data)?;

    // Loading is lazy; force it so the snapshot describes the dataset
    db.reload()
        .with_context(|| format!("Failed to load dataset: {}", data.display()))?;

    let stats = db.stats();
    let output = json!({
        "dataset": data.display().to_string(),
        "mode": load.mode(),
        "last_update": stats.last_update_unix(),
        "load_time_ms": stats.load_time.as_secs_f64() * 1000.0,
        "file_size": stats.file_size,
        "total_ranges": stats.total_ranges,
        "cache_hits": stats.cache_hits,
        "cache_misses": stats.cache_misses,
        "cache_hit_rate": stats.cache_hit_rate(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
