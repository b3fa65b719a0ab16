use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use ip2country::format_ipv4;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use crate::cli_utils::{format_number, format_qps, LoadArgs};

/// Deterministic spread of the address space: the k-th distinct query
fn query_address(k: usize) -> u32 {
    (k as u32).wrapping_mul(0x9E37_79B1)
}

/// Build `count` query strings drawn from `unique` distinct addresses
fn build_queries(count: usize, repeat_rate: usize) -> Vec<String> {
    let unique = if repeat_rate >= 100 {
        1
    } else if repeat_rate == 0 {
        count
    } else {
        (count * (100 - repeat_rate) / 100).max(1)
    };

    (0..count)
        .map(|i| format_ipv4(query_address(i % unique)))
        .collect()
}

pub fn cmd_bench(
    data: PathBuf,
    threads: Option<usize>,
    queries: usize,
    repeat_rate: usize,
    batch_size: usize,
    load: LoadArgs,
) -> Result<()> {
    let threads = match threads {
        Some(0) | None => thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
        Some(n) => n,
    };
    let batch_size = batch_size.max(1);

    println!("--- Phase 1: Load Dataset ---");
    let db = load.open(&data)?;
    let load_start = Instant::now();
    db.reload()
        .with_context(|| format!("Failed to load dataset: {}", data.display()))?;
    let load_time = load_start.elapsed();
    let stats = db.stats();
    println!("  Mode:        {}", load.mode());
    println!("  Entries:     {}", format_number(stats.total_ranges));
    println!("  Load time:   {:.2}ms", load_time.as_secs_f64() * 1000.0);
    println!();

    println!("--- Phase 2: Generate Queries ---");
    let query_set = build_queries(queries, repeat_rate);
    println!("  Queries:     {}", format_number(query_set.len()));
    println!("  Repeat rate: {}%", repeat_rate.min(100));
    println!();

    println!("--- Phase 3: Concurrent Lookups ---");
    let found = AtomicUsize::new(0);
    let (tx, rx) = bounded::<Range<usize>>(threads * 4);

    let bench_start = Instant::now();
    thread::scope(|s| {
        for _ in 0..threads {
            let rx = rx.clone();
            let db = &db;
            let query_set = &query_set;
            let found = &found;
            s.spawn(move || {
                let mut local_found = 0;
                for batch in rx.iter() {
                    for ip in &query_set[batch] {
                        if db.lookup(ip).is_ok() {
                            local_found += 1;
                        }
                    }
                }
                found.fetch_add(local_found, Ordering::Relaxed);
            });
        }
        drop(rx);

        let mut start = 0;
        while start < query_set.len() {
            let end = (start + batch_size).min(query_set.len());
            if tx.send(start..end).is_err() {
                break;
            }
            start = end;
        }
        drop(tx);
    });
    let bench_time = bench_start.elapsed();

    let stats = db.stats();
    let qps = query_set.len() as f64 / bench_time.as_secs_f64().max(f64::EPSILON);

    println!("  Threads:     {}", threads);
    println!("  Total time:  {:.2}s", bench_time.as_secs_f64());
    println!("  QPS:         {} queries/sec", format_qps(qps));
    println!(
        "  Found:       {}/{}",
        format_number(found.load(Ordering::Relaxed)),
        format_number(query_set.len())
    );
    println!(
        "  Cache:       {} hits, {} misses ({:.1}% hit rate)",
        format_number(stats.cache_hits as usize),
        format_number(stats.cache_misses as usize),
        stats.cache_hit_rate() * 100.0
    );
    println!();
    println!("✓ Benchmark complete");

    Ok(())
}
