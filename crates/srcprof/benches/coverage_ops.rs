//! Coverage Operations Benchmarks
//!
//! Benchmarks for block extraction, counter recording, snapshot merging
//! and report aggregation.
//!
//! Run with: `cargo bench --bench coverage_ops`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use srcprof::coverage::{instrument_source, CounterRuntime, CountsSnapshot, ReportAggregator};
use srcprof::InstrumentConfig;
use std::path::Path;

fn synthetic_class(methods: usize) -> String {
    let mut source = String::from("package bench;\n\nclass Load {\n");
    for i in 0..methods {
        source.push_str(&format!(
            "    int m{i}(int x) {{\n        \
             if (x > {i}) {{\n            x -= {i};\n        }} else x++;\n        \
             for (int j = 0; j < x; j++) {{ x = x > 3 ? x / 2 : x; }}\n        \
             list.forEach(e -> use(e));\n        \
             return x;\n    }}\n"
        ));
    }
    source.push_str("}\n");
    source
}

fn bench_instrumentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("instrumentation");
    let config = InstrumentConfig::default();

    for methods in [10, 100, 500] {
        let source = synthetic_class(methods);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{methods}_methods")),
            &source,
            |bench, source| {
                bench.iter(|| {
                    let unit =
                        instrument_source(Path::new("bench/Load.java"), black_box(source), &config);
                    black_box(unit)
                });
            },
        );
    }

    group.finish();
}

fn bench_counter_hits(c: &mut Criterion) {
    let mut group = c.benchmark_group("counter_hits");
    let output = std::env::temp_dir().join("srcprof-bench.counts");
    let runtime = CounterRuntime::new(4096, output);

    for hits in [1_000usize, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(hits), &hits, |bench, &n| {
            bench.iter(|| {
                for i in 0..n {
                    runtime.hit(black_box(i % 4096));
                }
            });
        });
    }

    group.finish();
}

fn bench_snapshot_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_merge");

    for len in [1_000usize, 100_000] {
        let base = CountsSnapshot::new((0..len as u64).collect());
        let other = CountsSnapshot::new((0..len as u64).rev().collect());
        group.bench_with_input(
            BenchmarkId::from_parameter(len),
            &(base, other),
            |bench, (base, other)| {
                bench.iter(|| {
                    let mut merged = base.clone();
                    merged.merge(black_box(other)).ok();
                    black_box(merged)
                });
            },
        );
    }

    group.finish();
}

fn bench_report_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("report_aggregation");
    let config = InstrumentConfig::default();

    for methods in [10, 200] {
        let source = synthetic_class(methods);
        let Ok(unit) = instrument_source(Path::new("bench/Load.java"), &source, &config) else {
            continue;
        };
        let metadata = unit.into_metadata(&config);
        let counts = CountsSnapshot::new((0..metadata.len() as u64).map(|i| i % 3).collect());
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{methods}_methods")),
            &counts,
            |bench, counts| {
                bench.iter(|| {
                    let mut aggregator = ReportAggregator::new(&metadata);
                    aggregator.add_snapshot(black_box(counts)).ok();
                    black_box(aggregator.report())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_instrumentation,
    bench_counter_hits,
    bench_snapshot_merge,
    bench_report_aggregation
);
criterion_main!(benches);
