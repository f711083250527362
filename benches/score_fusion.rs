//! Criterion benchmarks for score fusion.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use attest::domain::models::SearchResult;
use attest::services::fusion;

fn channel(prefix: &str, n: usize, keyword: bool) -> Vec<SearchResult> {
    (0..n)
        .map(|i| {
            let id = format!("{prefix}-{}", i % (n / 2 + 1));
            let score = 1.0 - i as f32 / n as f32;
            if keyword {
                SearchResult::keyword(id.clone(), format!("content {id}"), score, json!({}))
            } else {
                SearchResult::semantic(id.clone(), format!("content {id}"), score, json!({}))
            }
        })
        .collect()
}

fn bench_fuse(c: &mut Criterion) {
    for size in [16usize, 128, 512] {
        let semantic = channel("doc", size, false);
        let keyword = channel("doc", size, true);
        c.bench_function(&format!("fuse_{size}_per_channel"), |b| {
            b.iter(|| {
                black_box(fusion::fuse(
                    semantic.clone(),
                    keyword.clone(),
                    0.7,
                    0.3,
                ))
            });
        });
    }
}

criterion_group!(benches, bench_fuse);
criterion_main!(benches);
