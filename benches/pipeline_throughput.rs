//! Pipeline throughput benchmark
//!
//! Measures correlation of raw entries and window aggregation over the
//! resulting requests for batch sizes typical of a stress ramp.
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench pipeline_throughput
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use loadscope::analysis::LoadAnalyzer;
use loadscope::classifier::ClassifierTables;
use loadscope::config::AnalysisConfig;
use loadscope::correlator::correlate;
use loadscope::window::aggregate;
use serde_json::{json, Value};

const URLS: [&str; 4] = ["/frontend/cart", "/api/login", "/product/17", "/checkout"];

/// Interleaved request pairs: `n` requests, 8 in flight at a time
fn synthetic_batch(n: usize) -> Vec<Value> {
    let mut entries = Vec::with_capacity(n * 2);
    for chunk in (0..n).collect::<Vec<_>>().chunks(8) {
        for &i in chunk {
            let ms = i as u64 * 10;
            entries.push(json!({"__logentry__": {
                "timestamp": {"__datetime__": format!("2024-05-01T12:{:02}:{:02}.{:03}", ms / 60_000, (ms / 1_000) % 60, ms % 1_000)},
                "data": {"timestamp": ms, "event": {"contextId": format!("ctx-{i}"), "type": "before", "url": URLS[i % URLS.len()]}}
            }}));
        }
        for &i in chunk {
            let ms = i as u64 * 10 + 35;
            entries.push(json!({"__logentry__": {
                "data": {"timestamp": ms, "event": {"contextId": format!("ctx-{i}"), "type": "after"}}
            }}));
        }
    }
    entries
}

fn bench_correlate(c: &mut Criterion) {
    let tables = ClassifierTables::embedded().expect("embedded tables");
    let mut group = c.benchmark_group("correlate");

    for n in [1_000, 10_000, 50_000] {
        let batch = synthetic_batch(n);
        group.throughput(Throughput::Elements(batch.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &batch, |b, batch| {
            b.iter(|| correlate(black_box(batch), &tables));
        });
    }
    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let tables = ClassifierTables::embedded().expect("embedded tables");
    let mut group = c.benchmark_group("aggregate");

    for n in [1_000, 10_000, 50_000] {
        let requests = correlate(&synthetic_batch(n), &tables).requests;
        group.throughput(Throughput::Elements(requests.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &requests, |b, requests| {
            b.iter(|| aggregate(black_box(requests), 5));
        });
    }
    group.finish();
}

fn bench_full_analysis(c: &mut Criterion) {
    let analyzer = LoadAnalyzer::new(
        AnalysisConfig::default(),
        ClassifierTables::embedded().expect("embedded tables"),
    );
    let batch = synthetic_batch(20_000);

    c.bench_function("analyze_20k", |b| {
        b.iter(|| analyzer.analyze(black_box(&batch)));
    });
}

criterion_group!(benches, bench_correlate, bench_aggregate, bench_full_analysis);
criterion_main!(benches);
