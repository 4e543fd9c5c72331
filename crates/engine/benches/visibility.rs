//! Performance benchmarks for listing decisions.
//!
//! These benchmarks measure the hot paths of a tree refresh:
//! - Path normalization
//! - Access checks along deep ancestor chains, with and without the memo
//! - Full per-entry status over a wide directory

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use engine::{
    AccessCache, Engine, MemoryListing, MemoryPersistence, PathNormalizer, PathStyle,
};

const WIDTH: usize = 500;

fn wide_engine() -> Engine<MemoryListing, MemoryPersistence> {
    let mut listing = MemoryListing::new();
    for i in 0..WIDTH {
        listing.add_file(format!("/vault/dir/file_{i}.txt"));
    }
    listing.add_file("/vault/key.txt");

    let mut engine = Engine::new("/vault", PathStyle::Posix, listing, MemoryPersistence::new());
    engine.set_permanent_lock("key.txt", "pw");
    let rules: String = (0..50)
        .map(|i| format!("IF key.txt IS UNLOCKED, SHOW file_{i}.txt IN dir.\n"))
        .collect();
    engine.reload_rules(&rules);
    engine
}

/// Benchmark path normalization.
fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    let posix = PathNormalizer::new(PathStyle::Posix, "/vault");
    let windows = PathNormalizer::new(PathStyle::Windows, "C:\\Vault");

    group.bench_function("posix_relative", |b| {
        b.iter(|| posix.normalize(black_box("a/./b/../c/d.txt")));
    });
    group.bench_function("windows_mixed", |b| {
        b.iter(|| windows.normalize_str(black_box("c:/VAULT\\a\\..\\B/d.TXT")));
    });

    group.finish();
}

/// Benchmark access checks on a deep chain.
fn bench_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("access");

    let mut listing = MemoryListing::new();
    let deep: String = (0..32).map(|i| format!("/d{i}")).collect();
    listing.add_file(format!("/vault{deep}/leaf.txt"));
    let mut engine = Engine::new("/vault", PathStyle::Posix, listing, MemoryPersistence::new());
    engine.set_permanent_lock("d0", "pw");
    let leaf = format!("/vault{deep}/leaf.txt");

    group.bench_function("deep_chain_uncached", |b| {
        b.iter(|| engine.is_accessible(black_box(&leaf)));
    });

    group.finish();
}

/// Benchmark a full refresh of a wide directory.
fn bench_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("refresh");
    let engine = wide_engine();
    group.throughput(Throughput::Elements(WIDTH as u64));

    group.bench_function("visible_children_500", |b| {
        b.iter(|| {
            let mut cache = AccessCache::new();
            engine
                .visible_children(black_box("/vault/dir"), &mut cache)
                .map(|children| children.len())
        });
    });

    group.bench_function("entry_status_no_cache_reuse", |b| {
        let entries = engine.list_children("/vault/dir").unwrap_or_default();
        b.iter(|| {
            for entry in &entries {
                let mut cache = AccessCache::new();
                black_box(engine.entry_status(entry, &mut cache));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_normalize, bench_access, bench_refresh);
criterion_main!(benches);
