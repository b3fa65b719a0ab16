use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ip2country::parser::parse_range_lines;
use ip2country::{format_ipv4, CancelToken, Config, ExactTable, IpRange, RangeTable};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

/// `count` disjoint ranges of random width spread across the address space
fn generate_ranges(count: usize, rng: &mut StdRng) -> Vec<IpRange> {
    let stride = u32::MAX / count as u32;
    let codes: Vec<Arc<str>> = (0..250).map(|i| Arc::from(format!("C{}", i))).collect();
    (0..count as u32)
        .map(|i| {
            let start = i * stride;
            let width = rng.random_range(0..stride);
            IpRange::new(start, start + width, Arc::clone(&codes[i as usize % codes.len()]))
        })
        .collect()
}

fn bench_range_find(c: &mut Criterion) {
    let mut group = c.benchmark_group("range_find");
    group.measurement_time(Duration::from_secs(5));

    let mut rng = StdRng::seed_from_u64(42);
    for size in [1_000, 100_000, 500_000] {
        let table = RangeTable::from_ranges(generate_ranges(size, &mut rng)).unwrap();
        let probes: Vec<u32> = (0..10_000).map(|_| rng.random()).collect();

        group.throughput(Throughput::Elements(probes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &probes, |b, probes| {
            b.iter(|| {
                for &ip in probes {
                    black_box(table.find(black_box(ip)));
                }
            });
        });
    }

    group.finish();
}

fn bench_exact_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("exact_get");

    let mut rng = StdRng::seed_from_u64(7);
    let code: Arc<str> = Arc::from("US");
    let keys: Vec<u32> = (0..100_000).map(|_| rng.random()).collect();
    let table = ExactTable::from_entries(keys.iter().map(|&k| (k, Arc::clone(&code))));

    let hits: Vec<u32> = keys.iter().step_by(10).copied().collect();
    let misses: Vec<u32> = (0..hits.len()).map(|_| rng.random()).collect();

    group.throughput(Throughput::Elements(hits.len() as u64));
    group.bench_function("hit", |b| {
        b.iter(|| {
            for &ip in &hits {
                black_box(table.get(black_box(ip)));
            }
        });
    });
    group.bench_function("miss", |b| {
        b.iter(|| {
            for &ip in &misses {
                black_box(table.get(black_box(ip)));
            }
        });
    });

    group.finish();
}

/// Full load path: scan, parse, intern, sort, validate
fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    let mut rng = StdRng::seed_from_u64(1);
    for size in [10_000, 100_000] {
        let mut ranges = generate_ranges(size, &mut rng);
        // Reverse so the sort has work to do
        ranges.reverse();
        let text: String = ranges
            .iter()
            .map(|r| format!("{},{},{}\n", format_ipv4(r.start), format_ipv4(r.end), r.code))
            .collect();

        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            let config = Config::default().with_max_records(0);
            b.iter(|| {
                let outcome =
                    parse_range_lines(Cursor::new(text.as_bytes()), &config, &CancelToken::none())
                        .unwrap();
                black_box(RangeTable::from_ranges(outcome.records).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_range_find, bench_exact_get, bench_load);
criterion_main!(benches);
