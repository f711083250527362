//! Criterion benchmarks for the retrieval cache.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use attest::domain::models::SearchResult;
use attest::services::cache::RetrievalCache;

fn sample_results(n: usize) -> Vec<SearchResult> {
    (0..n)
        .map(|i| {
            SearchResult::semantic(
                format!("doc-{i}"),
                format!("chunk content for document {i}"),
                1.0 - i as f32 * 0.01,
                json!({"document_type": "access_review", "company": "Acme"}),
            )
        })
        .collect()
}

fn bench_cache_set_get(c: &mut Criterion) {
    let cache = RetrievalCache::new(1000, Duration::from_secs(300));
    let results = sample_results(10);

    c.bench_function("cache_set", |b| {
        let mut i = 0u64;
        b.iter(|| {
            cache.set(&format!("query {i}"), 5, None, results.clone(), None);
            i += 1;
        });
    });

    cache.set("hot query", 5, None, results, None);
    c.bench_function("cache_get_hit", |b| {
        b.iter(|| black_box(cache.get("hot query", 5, None)));
    });

    c.bench_function("cache_get_miss", |b| {
        b.iter(|| black_box(cache.get("absent query", 5, None)));
    });
}

fn bench_cache_eviction_pressure(c: &mut Criterion) {
    c.bench_function("cache_set_under_eviction", |b| {
        let cache = RetrievalCache::new(64, Duration::from_secs(300));
        let results = sample_results(5);
        let mut i = 0u64;
        b.iter(|| {
            cache.set(&format!("query {i}"), 5, None, results.clone(), None);
            i += 1;
        });
    });
}

criterion_group!(benches, bench_cache_set_get, bench_cache_eviction_pressure);
criterion_main!(benches);
