//! Lookups racing reloads and first-use initialisation

mod common;

use common::{replace_dataset, write_dataset};
use ip2country::{Config, LookupError, RangeDatabase};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

const PROBES: [&str; 4] = ["10.0.0.1", "20.0.0.1", "30.0.0.1", "40.0.0.1"];

/// Dataset A maps 10/8 and 20/8; dataset B maps 30/8 and 40/8
const DATASET_A: &str = "10.0.0.0,10.255.255.255,AA\n20.0.0.0,20.255.255.255,AA\n";
const DATASET_B: &str = "30.0.0.0,30.255.255.255,BB\n40.0.0.0,40.255.255.255,BB\n";

/// Answer for every probe
fn observe(db: &RangeDatabase) -> Vec<Option<String>> {
    PROBES
        .iter()
        .map(|ip| match db.lookup(ip) {
            Ok(code) => Some(code.to_string()),
            Err(LookupError::NotFound) => None,
            Err(e) => panic!("unexpected error for {}: {}", ip, e),
        })
        .collect()
}

#[test]
fn test_reload_is_atomic_for_readers() {
    let dir = TempDir::new().unwrap();
    let path = write_dataset(&dir, "ranges.csv", DATASET_A);
    let db = Arc::new(RangeDatabase::new(&path, Config::default().with_cache_size(2)));
    db.lookup("10.0.0.1").unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let db = Arc::clone(&db);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut checks = 0usize;
                while !stop.load(Ordering::Relaxed) {
                    for ip in PROBES {
                        match db.lookup(ip) {
                            // A hit must belong to the dataset that maps this probe
                            Ok(code) => match ip {
                                "10.0.0.1" | "20.0.0.1" => assert_eq!(&*code, "AA"),
                                _ => assert_eq!(&*code, "BB"),
                            },
                            Err(LookupError::NotFound) => {}
                            Err(e) => panic!("unexpected error for {}: {}", ip, e),
                        }
                    }
                    checks += 1;
                }
                checks
            })
        })
        .collect();

    for round in 0..50 {
        let contents = if round % 2 == 0 { DATASET_B } else { DATASET_A };
        replace_dataset(&path, contents);
        db.reload().unwrap();

        // Between reloads every answer comes from exactly one dataset
        let seen = observe(&db);
        let expected_a = vec![Some("AA".to_string()), Some("AA".to_string()), None, None];
        let expected_b = vec![None, None, Some("BB".to_string()), Some("BB".to_string())];
        if round % 2 == 0 {
            assert_eq!(seen, expected_b);
        } else {
            assert_eq!(seen, expected_a);
        }
    }

    stop.store(true, Ordering::Relaxed);
    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
}

#[test]
fn test_concurrent_first_use() {
    let dir = TempDir::new().unwrap();
    let path = write_dataset(&dir, "ranges.csv", DATASET_A);
    let db = Arc::new(RangeDatabase::with_defaults(&path));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                let ip = if i % 2 == 0 { "10.1.2.3" } else { "20.3.2.1" };
                db.lookup(ip).map(|code| code.to_string())
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), "AA");
    }
    assert_eq!(db.stats().total_ranges, 2);
}

#[test]
fn test_concurrent_failed_first_use_is_consistent() {
    let dir = TempDir::new().unwrap();
    let path = write_dataset(&dir, "ranges.csv", "0,100,AA\n50,150,BB\n");
    let db = Arc::new(RangeDatabase::with_defaults(&path));

    let errors: Vec<_> = (0..8)
        .map(|_| {
            let db = Arc::clone(&db);
            thread::spawn(move || db.lookup("60").unwrap_err())
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect();

    assert!(errors.iter().all(|e| e == &errors[0]));
    assert!(matches!(errors[0], LookupError::Init(_)));
}
