use anyhow::{Context, Result};
use crossbeam_channel::{select, tick, unbounded};
use ip2country::{CountryLookup, LookupError};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::cli_utils::LoadArgs;

/// Resolve addresses from stdin until EOF or Ctrl+C, reloading the dataset
/// whenever its file changes
pub fn cmd_watch(data: PathBuf, debounce_ms: u64, load: LoadArgs) -> Result<()> {
    let db = load.open(&data)?;
    db.reload()
        .with_context(|| format!("Failed to load dataset: {}", data.display()))?;
    eprintln!(
        "[INFO] Loaded {} ({} entries)",
        data.display(),
        db.stats().total_ranges
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        eprintln!("\n[INFO] Shutting down...");
        shutdown_clone.store(true, Ordering::Relaxed);
    })
    .context("Failed to set Ctrl+C handler")?;

    // Watch the parent directory so replace-by-rename updates are seen too
    let file_name = data
        .file_name()
        .map(OsString::from)
        .context("Dataset path has no file name")?;
    let watch_dir = match data.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let (event_tx, event_rx) = unbounded::<notify::Result<Event>>();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            let _ = event_tx.send(res);
        },
        Config::default(),
    )
    .context("Failed to create file watcher")?;
    watcher
        .watch(&watch_dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", watch_dir.display()))?;

    let (line_tx, line_rx) = unbounded::<String>();
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("Failed to spawn stdin reader")?;

    eprintln!("[INFO] Reading addresses from stdin (Ctrl+C to stop)...");

    let debounce = Duration::from_millis(debounce_ms);
    let ticker = tick(Duration::from_millis(100));
    let mut pending_reload: Option<Instant> = None;
    let mut out = io::stdout().lock();

    while !shutdown.load(Ordering::Relaxed) {
        select! {
            recv(line_rx) -> msg => match msg {
                Ok(line) => resolve_line(db.as_ref(), line.trim(), &mut out)?,
                // stdin closed
                Err(_) => break,
            },
            recv(event_rx) -> msg => match msg {
                Ok(Ok(event)) => {
                    if touches(&event, &file_name) {
                        pending_reload = Some(Instant::now() + debounce);
                    }
                }
                Ok(Err(e)) => eprintln!("[WARN] File watcher error: {}", e),
                Err(_) => break,
            },
            recv(ticker) -> _ => {}
        }

        if pending_reload.is_some_and(|at| Instant::now() >= at) {
            pending_reload = None;
            reload(db.as_ref(), &data);
        }
    }

    Ok(())
}

fn touches(event: &Event, file_name: &OsString) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

fn reload(db: &(dyn CountryLookup + Send + Sync), data: &Path) {
    match db.reload() {
        Ok(()) => eprintln!(
            "[INFO] Reloaded {} ({} entries)",
            data.display(),
            db.stats().total_ranges
        ),
        // The engine keeps reporting this error until the file is fixed
        Err(e) => eprintln!("[WARN] Reload of {} failed: {}", data.display(), e),
    }
}

fn resolve_line<W: Write>(
    db: &(dyn CountryLookup + Send + Sync),
    ip: &str,
    out: &mut W,
) -> Result<()> {
    if ip.is_empty() {
        return Ok(());
    }
    match db.lookup(ip) {
        Ok(code) => writeln!(out, "{}\t{}", ip, code)?,
        Err(LookupError::NotFound) => writeln!(out, "{}\t-", ip)?,
        Err(e) => {
            writeln!(out, "{}\t-", ip)?;
            eprintln!("[WARN] {}: {}", ip, e);
        }
    }
    out.flush()?;
    Ok(())
}
