//! Lifecycle shared by the range and exact engines
//!
//! An engine starts out uninitialized and loads its source on first use.
//! Initialization is double-checked: a lock-free read of an atomic status
//! keeps steady-state lookups off the write lock, and the status is read a
//! second time under the write lock so that exactly one thread performs
//! the load while the others wait for it.
//!
//! ```text
//!   Uninitialized ──load ok──▶ Ready
//!         │                      │
//!         └──load err──▶ Failed ◀┘ (reload err)
//!                          │
//!          reload ok ──────┘──▶ Ready
//! ```
//!
//! The dataset, load statistics and parse errors live behind one `RwLock`.
//! Lookups hold the read lock for the whole cache probe, search and cache
//! fill, so a reload (which clears the cache under the write lock) can never
//! interleave with them. The cache's own mutex is only ever taken while the
//! read lock is held.

use crate::cache::{CacheEntry, LookupCache};
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::{LoadError, LookupError, ParseError};
use crate::file_reader;
use crate::ip::parse_ipv4;
use crate::stats::Stats;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Instant, SystemTime};

const UNINITIALIZED: u8 = 0;
const READY: u8 = 1;
const FAILED: u8 = 2;

/// A dataset a lookup engine can load and search
pub(crate) trait Dataset: Send + Sync + Sized {
    /// Short name used in log events
    const KIND: &'static str;

    /// Parse and commit-check a dataset from an opened source
    fn load(
        reader: Box<dyn BufRead + Send>,
        config: &Config,
        cancel: &CancelToken,
    ) -> Result<Loaded<Self>, LoadError>;

    /// Country code for `ip`, if mapped
    fn resolve(&self, ip: u32) -> Option<&Arc<str>>;

    /// Number of ranges or entries
    fn len(&self) -> usize;
}

/// A freshly loaded dataset and the lines it rejected
pub(crate) struct Loaded<D> {
    pub dataset: D,
    pub errors: Vec<ParseError>,
}

enum Phase<D> {
    Uninitialized,
    Ready(D),
    Failed(LoadError),
}

struct State<D> {
    phase: Phase<D>,
    stats: Stats,
    parse_errors: Vec<ParseError>,
}

impl<D> State<D> {
    fn reset(&mut self) {
        self.phase = Phase::Uninitialized;
        self.stats = Stats::default();
        self.parse_errors = Vec::new();
    }
}

/// Lazily loaded, reloadable, cached lookup engine
pub(crate) struct Engine<D> {
    path: PathBuf,
    config: Config,
    status: AtomicU8,
    state: RwLock<State<D>>,
    cache: LookupCache,
}

impl<D: Dataset> Engine<D> {
    pub fn new(path: PathBuf, config: Config) -> Self {
        let cache = LookupCache::new(config.effective_cache_size());
        Self {
            path,
            config,
            status: AtomicU8::new(UNINITIALIZED),
            state: RwLock::new(State {
                phase: Phase::Uninitialized,
                stats: Stats::default(),
                parse_errors: Vec::new(),
            }),
            cache,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // The guarded state is only ever replaced wholesale, so a panic while
    // holding the lock cannot leave it half-written.
    fn read_state(&self) -> RwLockReadGuard<'_, State<D>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State<D>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the dataset unless some thread already tried
    fn ensure_initialized(&self, cancel: &CancelToken) {
        if self.status.load(Ordering::Acquire) != UNINITIALIZED {
            return;
        }

        let mut state = self.write_state();
        if self.status.load(Ordering::Acquire) != UNINITIALIZED {
            return;
        }

        // The outcome is recorded in `state`; callers read it from there
        let _ = self.initialize_locked(&mut state, cancel);
    }

    /// Run the load pipeline and commit its outcome; write lock held
    fn initialize_locked(
        &self,
        state: &mut State<D>,
        cancel: &CancelToken,
    ) -> Result<(), LoadError> {
        let start = Instant::now();

        let result = file_reader::open_source(&self.path, self.config.max_file_size)
            .and_then(|source| {
                let size = source.size;
                D::load(source.reader, &self.config, cancel).map(|loaded| (loaded, size))
            });

        match result {
            Ok((loaded, file_size)) => {
                let load_time = start.elapsed();
                let total = loaded.dataset.len();

                if !loaded.errors.is_empty() {
                    tracing::warn!(
                        kind = D::KIND,
                        path = %self.path.display(),
                        rejected = loaded.errors.len(),
                        "dataset contains malformed lines"
                    );
                }
                tracing::info!(
                    kind = D::KIND,
                    path = %self.path.display(),
                    entries = total,
                    bytes = file_size,
                    elapsed_ms = load_time.as_millis() as u64,
                    "dataset loaded"
                );

                state.stats = Stats {
                    last_update: Some(SystemTime::now()),
                    load_time,
                    file_size,
                    total_ranges: total,
                    ..Stats::default()
                };
                state.parse_errors = loaded.errors;
                state.phase = Phase::Ready(loaded.dataset);
                self.status.store(READY, Ordering::Release);
                Ok(())
            }
            Err(err) => {
                tracing::error!(
                    kind = D::KIND,
                    path = %self.path.display(),
                    error = %err,
                    "dataset load failed"
                );

                state.reset();
                state.phase = Phase::Failed(err.clone());
                self.status.store(FAILED, Ordering::Release);
                Err(err)
            }
        }
    }

    /// Run `f` against the committed dataset, loading it first if needed
    fn with_dataset<R>(
        &self,
        cancel: &CancelToken,
        f: impl FnOnce(&D) -> Result<R, LookupError>,
    ) -> Result<R, LookupError> {
        loop {
            self.ensure_initialized(cancel);

            let state = self.read_state();
            match &state.phase {
                Phase::Ready(dataset) => return f(dataset),
                Phase::Failed(err) => return Err(LookupError::Init(err.clone())),
                // Reload resets and loads under one write-lock hold, so a
                // reader never observes this; go around and initialize
                Phase::Uninitialized => continue,
            }
        }
    }

    /// Cache-first resolution; read lock held by the caller
    fn resolve_cached(&self, dataset: &D, ip: u32) -> Result<Arc<str>, LookupError> {
        if let Some(entry) = self.cache.get(ip) {
            return match entry {
                CacheEntry::Found(code) => Ok(code),
                CacheEntry::Missing => Err(LookupError::NotFound),
            };
        }

        let code = dataset.resolve(ip).cloned();
        self.cache.put(ip, CacheEntry::from(code.clone()));
        code.ok_or(LookupError::NotFound)
    }

    pub fn lookup(&self, ip: &str, cancel: &CancelToken) -> Result<Arc<str>, LookupError> {
        self.with_dataset(cancel, |dataset| {
            let ip = parse_ipv4(ip)?;
            self.resolve_cached(dataset, ip)
        })
    }

    pub fn lookup_u32(&self, ip: u32, cancel: &CancelToken) -> Result<Arc<str>, LookupError> {
        self.with_dataset(cancel, |dataset| self.resolve_cached(dataset, ip))
    }

    /// Drop dataset and cache, then load again under one write-lock hold
    pub fn reload(&self, cancel: &CancelToken) -> Result<(), LoadError> {
        let mut state = self.write_state();

        self.status.store(UNINITIALIZED, Ordering::Release);
        state.reset();
        self.cache.clear();

        tracing::debug!(kind = D::KIND, path = %self.path.display(), "reloading dataset");
        self.initialize_locked(&mut state, cancel)
    }

    /// Load stats and cache counters read under one shared-lock hold
    pub fn stats(&self) -> Stats {
        let state = self.read_state();
        let mut stats = state.stats.clone();
        let (hits, misses) = self.cache.stats();
        drop(state);
        stats.cache_hits = hits;
        stats.cache_misses = misses;
        stats
    }

    pub fn parse_errors(&self) -> Vec<ParseError> {
        self.read_state().parse_errors.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.status.load(Ordering::Acquire) == READY
    }

    pub fn load_error(&self) -> Option<LoadError> {
        match &self.read_state().phase {
            Phase::Failed(err) => Some(err.clone()),
            _ => None,
        }
    }

    /// Number of cached outcomes
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    static LOADS: AtomicUsize = AtomicUsize::new(0);

    /// Maps every address to the number of lines in the source
    struct LineCount(Arc<str>);

    impl Dataset for LineCount {
        const KIND: &'static str = "test";

        fn load(
            reader: Box<dyn BufRead + Send>,
            _config: &Config,
            cancel: &CancelToken,
        ) -> Result<Loaded<Self>, LoadError> {
            cancel.check()?;
            thread::sleep(std::time::Duration::from_millis(20));
            let count = reader.lines().count();
            // only the three-line fixture is counted; other tests run in parallel
            if count == 3 {
                LOADS.fetch_add(1, Ordering::SeqCst);
            }
            Ok(Loaded {
                dataset: LineCount(Arc::from(count.to_string())),
                errors: Vec::new(),
            })
        }

        fn resolve(&self, ip: u32) -> Option<&Arc<str>> {
            (ip != 0).then_some(&self.0)
        }

        fn len(&self) -> usize {
            1
        }
    }

    #[test]
    fn test_concurrent_first_use_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, "a\nb\nc\n").unwrap();

        let engine = Arc::new(Engine::<LineCount>::new(path, Config::default()));
        let before = LOADS.load(Ordering::SeqCst);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || engine.lookup("1.2.3.4", &CancelToken::none()))
            })
            .collect();
        for handle in handles {
            assert_eq!(&*handle.join().unwrap().unwrap(), "3");
        }

        assert_eq!(LOADS.load(Ordering::SeqCst) - before, 1);
        assert!(engine.is_loaded());
    }

    #[test]
    fn test_missing_source_is_sticky() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::<LineCount>::new(dir.path().join("absent"), Config::default());

        let first = engine.lookup("1.2.3.4", &CancelToken::none()).unwrap_err();
        let second = engine.lookup("1.2.3.4", &CancelToken::none()).unwrap_err();
        assert!(matches!(first, LookupError::Init(LoadError::Io(_))));
        assert_eq!(first, second);
        assert!(engine.load_error().is_some());
        assert!(!engine.is_loaded());
    }

    #[test]
    fn test_reload_recovers_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        let engine = Engine::<LineCount>::new(path.clone(), Config::default());

        assert!(engine.lookup("1.2.3.4", &CancelToken::none()).is_err());

        std::fs::write(&path, "a\n").unwrap();
        engine.reload(&CancelToken::none()).unwrap();
        assert_eq!(&*engine.lookup("1.2.3.4", &CancelToken::none()).unwrap(), "1");
        assert!(engine.load_error().is_none());
    }

    #[test]
    fn test_cancelled_first_load_leaves_failed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, "a\n").unwrap();
        let engine = Engine::<LineCount>::new(path, Config::default());

        let token = CancelToken::new();
        token.cancel();
        assert_eq!(
            engine.lookup("1.2.3.4", &token),
            Err(LookupError::Init(LoadError::Cancelled))
        );
        // sticky even for callers without a token
        assert_eq!(
            engine.lookup("1.2.3.4", &CancelToken::none()),
            Err(LookupError::Init(LoadError::Cancelled))
        );
        assert_eq!(engine.stats().total_ranges, 0);
    }

    #[test]
    fn test_stats_never_mix_load_and_counters_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, "a\n").unwrap();
        let engine = Arc::new(Engine::<LineCount>::new(path, Config::default()));

        for _ in 0..5 {
            engine.lookup("1.2.3.4", &CancelToken::none()).unwrap();
        }
        let before = engine.stats();
        assert_eq!((before.cache_hits, before.cache_misses), (4, 1));

        let reloader = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.reload(&CancelToken::none()))
        };
        while !reloader.is_finished() {
            let snapshot = engine.stats();
            let counters = (snapshot.cache_hits, snapshot.cache_misses);
            if snapshot.last_update == before.last_update {
                assert_eq!(counters, (4, 1));
            } else {
                assert_eq!(counters, (0, 0));
            }
        }
        reloader.join().unwrap().unwrap();

        let after = engine.stats();
        assert_ne!(after.last_update, before.last_update);
        assert_eq!((after.cache_hits, after.cache_misses), (0, 0));
    }

    #[test]
    fn test_invalid_ip_does_not_poison() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, "a\n").unwrap();
        let engine = Engine::<LineCount>::new(path, Config::default());

        assert!(matches!(
            engine.lookup("not-an-ip", &CancelToken::none()),
            Err(LookupError::InvalidIp(_))
        ));
        assert!(engine.lookup("1.2.3.4", &CancelToken::none()).is_ok());
        assert_eq!(
            engine.lookup("0.0.0.0", &CancelToken::none()),
            Err(LookupError::NotFound)
        );
    }
}
