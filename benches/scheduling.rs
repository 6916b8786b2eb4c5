//! Scheduling Benchmarks
//!
//! Measures graph construction and leveling on common batch shapes, plus
//! end-to-end execution overhead with an instant executor.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::json;
use std::time::Duration;
use strata::scheduler::{DependencyGraph, level};
use strata::{Scheduler, executor_fn};
use strata_workspace::fixtures::{chain, layered, wide};

/// Benchmark graph build + leveling
fn bench_planning(c: &mut Criterion) {
    let mut group = c.benchmark_group("planning");
    group.measurement_time(Duration::from_secs(5));

    for size in [16usize, 256, 4096] {
        let shapes = [
            ("chain", chain(size)),
            ("wide", wide(size)),
            ("layered", layered(16, size / 16)),
        ];
        group.throughput(Throughput::Elements(size as u64));

        for (name, batch) in shapes {
            group.bench_with_input(BenchmarkId::new(name, size), &batch, |b, batch| {
                b.iter(|| {
                    let graph = DependencyGraph::build(std::hint::black_box(batch))
                        .expect("valid batch");
                    std::hint::black_box(level(&graph).expect("acyclic batch"))
                })
            });
        }
    }

    group.finish();
}

/// Benchmark scheduler overhead around a no-op executor
fn bench_execution(c: &mut Criterion) {
    let mut group = c.benchmark_group("execution");
    group.measurement_time(Duration::from_secs(5));

    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let scheduler = Scheduler::default();

    for size in [16usize, 256] {
        let batch = layered(16, size / 16);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("layered", size), &batch, |b, batch| {
            b.to_async(&runtime).iter(|| async {
                let executor = executor_fn(|_request, _cancel| async { Ok(json!(null)) });
                std::hint::black_box(scheduler.execute(batch, executor).await.expect("valid batch"))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_planning, bench_execution);
criterion_main!(benches);
