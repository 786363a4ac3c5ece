//! Performance benchmark suite for graphvault
//!
//! Benchmarks measure three representative workloads:
//! - B1: Snapshot diff between two large graphs
//! - B2: Batched content fingerprinting
//! - B3: Store and load of a snapshot through the version store
//!
//! Run with: cargo bench --bench perf_suite


use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use graphvault::{compare, ChangeDetector, VersionStore};
use harness::{mutate_graph, setup_file_contents, setup_repo_graph};
use tempfile::TempDir;

/// B1: Snapshot Diff
///
/// Two graphs of equal size where a tenth of the nodes changed and every
/// relationship id was regenerated.
fn benchmark_b1_snapshot_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("B1_Snapshot_Diff");

    for files in [100usize, 1_000] {
        let before = setup_repo_graph(files, 10);
        let after = mutate_graph(&before, 10);
        let elements = (before.node_count() + before.relationship_count()) as u64;
        group.throughput(Throughput::Elements(elements));

        group.bench_with_input(BenchmarkId::from_parameter(files), &files, |b, _| {
            b.iter(|| black_box(compare(black_box(&before), black_box(&after))))
        });
    }

    group.finish();
}

/// B2: Fingerprinting
///
/// Same input hashed with a small and the default batch size.
fn benchmark_b2_fingerprinting(c: &mut Criterion) {
    let mut group = c.benchmark_group("B2_Fingerprinting");

    let files = setup_file_contents(2_000, 4 * 1024);
    let bytes: usize = files.values().map(String::len).sum();
    group.throughput(Throughput::Bytes(bytes as u64));

    for batch_size in [10usize, 100] {
        let detector = ChangeDetector::new(batch_size);
        group.bench_with_input(BenchmarkId::new("batch", batch_size), &batch_size, |b, _| {
            b.iter(|| black_box(detector.hash_all(black_box(&files))))
        });
    }

    group.finish();
}

/// B3: Version Store Round Trip
fn benchmark_b3_store_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("B3_Store_Load");
    group.sample_size(20);

    let temp_dir = TempDir::new().unwrap();
    let store = VersionStore::open(temp_dir.path()).unwrap();
    let graph = setup_repo_graph(500, 10);

    group.bench_function("store", |b| {
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            let sha = format!("{:07x}", n);
            black_box(store.store("bench", "repo", &sha, "", Utc::now(), &graph).unwrap())
        })
    });

    store.store("bench", "repo", "fffffff", "", Utc::now(), &graph).unwrap();
    group.bench_function("load", |b| {
        b.iter(|| black_box(store.load("bench", "repo", "fffffff").unwrap()))
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_b1_snapshot_diff,
    benchmark_b2_fingerprinting,
    benchmark_b3_store_load
);
criterion_main!(benches);
