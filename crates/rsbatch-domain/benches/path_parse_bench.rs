//! Performance benchmarks for path template parsing and resolution.
//!
//! Run with: cargo bench -p rsbatch-domain
//!
//! These benchmarks measure:
//! - Tokenizer throughput for literal-only and reference-heavy paths
//! - Whole-batch parsing at typical batch sizes
//! - Reference substitution against a populated results store

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;

use rsbatch_domain::reference::resolve_path;
use rsbatch_domain::{parse_batch, parse_path, BatchAggregate};

/// Generate a literal path with `n` segments
fn literal_path(n: usize) -> String {
    (0..n).map(|i| format!("/segment{i}")).collect()
}

/// Generate a path alternating literals and references to item 0
fn reference_path(n: usize) -> String {
    (0..n)
        .map(|i| {
            if i % 2 == 0 {
                format!("/segment{i}")
            } else {
                "/$0.project.id".to_string()
            }
        })
        .collect()
}

fn bench_parse_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_path");

    for segments in [2, 8, 32] {
        let literal = literal_path(segments);
        let reference = reference_path(segments);

        group.bench_with_input(BenchmarkId::new("literal", segments), &literal, |b, path| {
            b.iter(|| parse_path(black_box(path), 1))
        });
        group.bench_with_input(
            BenchmarkId::new("reference", segments),
            &reference,
            |b, path| b.iter(|| parse_path(black_box(path), 1)),
        );
    }

    group.finish();
}

fn bench_parse_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_batch");

    for size in [10, 50] {
        let paths: Vec<String> = (0..size)
            .map(|i| {
                if i == 0 {
                    "/projects".to_string()
                } else {
                    format!("/projects/$0.id/tasks/{i}")
                }
            })
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &paths, |b, paths| {
            b.iter(|| parse_batch(paths.iter().map(String::as_str)))
        });
    }

    group.finish();
}

fn bench_resolve_path(c: &mut Criterion) {
    let mut aggregate = BatchAggregate::new(2);
    aggregate
        .record_response(0, 200, json!({"project": {"id": "p_12345"}}))
        .unwrap();
    let store = aggregate.store().clone();
    let parsed = parse_path(&reference_path(8), 1).unwrap();

    c.bench_function("resolve_path/8_segments", |b| {
        b.iter(|| resolve_path(black_box(&parsed), black_box(&store)))
    });
}

criterion_group!(benches, bench_parse_path, bench_parse_batch, bench_resolve_path);
criterion_main!(benches);
