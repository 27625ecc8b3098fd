use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flatdoc::cache::policy::RandomPolicy;
use flatdoc::schema::{Attribute, Schema};
use flatdoc::{Cache, Config, StorageEngine};

fn bench_cache_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_store");
    for size in [16usize, 256, 4096] {
        group.bench_with_input(BenchmarkId::new("lru", size), &size, |b, &size| {
            let mut cache = Cache::lru(size).unwrap();
            let mut key = 0u64;
            b.iter(|| {
                cache.store(black_box(key), key);
                key = key.wrapping_add(1);
            });
        });
        group.bench_with_input(BenchmarkId::new("random", size), &size, |b, &size| {
            let mut cache = Cache::new(size, Box::new(RandomPolicy::with_seed(1))).unwrap();
            let mut key = 0u64;
            b.iter(|| {
                cache.store(black_box(key), key);
                key = key.wrapping_add(1);
            });
        });
    }
    group.finish();
}

fn bench_cache_hit(c: &mut Criterion) {
    let mut cache = Cache::lru(1024).unwrap();
    for key in 0..1024u64 {
        cache.store(key, key);
    }
    let mut key = 0u64;
    c.bench_function("cache_hit_lru_1024", |b| {
        b.iter(|| {
            black_box(cache.retrieve(&(key % 1024)));
            key = key.wrapping_add(7);
        });
    });
}

fn bench_indexed_filter(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let engine = StorageEngine::new(Config::with_data_root(dir.path()));
    let ty = engine
        .register(
            Schema::builder("bench")
                .attribute("bucket", Attribute::integer().indexed())
                .build()
                .unwrap(),
        )
        .unwrap();
    for i in 0..200i64 {
        ty.create().unwrap().set("bucket", i % 10).unwrap();
    }

    c.bench_function("filter_indexed_eq", |b| {
        b.iter(|| ty.filter("bucket", black_box(3), "==").unwrap().len());
    });
}

criterion_group!(benches, bench_cache_store, bench_cache_hit, bench_indexed_filter);
criterion_main!(benches);
