//! Criterion benchmarks for rust_scoped_logger

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rust_scoped_logger::core::{CollectingReporter, LevelFilter, ManualClock};
use rust_scoped_logger::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;

// ============================================================================
// Formatting Benchmarks
// ============================================================================

fn bench_formatting(c: &mut Criterion) {
    let mut group = c.benchmark_group("formatting");
    group.throughput(Throughput::Elements(1));

    let formatter = OneLineFormatter::new();
    let record = Record::new(LogLevel::Info, "bench.format", "Request handled in 12ms");
    let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "upstream timed out");
    let with_error = Record::new(LogLevel::Error, "bench.format", "Request failed").with_error(&err);

    group.bench_function("one_line", |b| {
        b.iter(|| black_box(formatter.format(black_box(&record))));
    });

    group.bench_function("one_line_with_error", |b| {
        b.iter(|| black_box(formatter.format(black_box(&with_error))));
    });

    group.finish();
}

// ============================================================================
// Logger Hierarchy Benchmarks
// ============================================================================

fn bench_hierarchy(c: &mut Criterion) {
    let mut group = c.benchmark_group("hierarchy");
    group.throughput(Throughput::Elements(1));

    let registry = ScopeRegistry::builder()
        .inline_config(".level = WARNING\n")
        .reporter(CollectingReporter::new())
        .build()
        .unwrap();
    let ctx = ExecutionContext::new("bench");
    let deep = registry.get_logger(&ctx, "a.b.c.d.e.f").unwrap();

    group.bench_function("disabled_level_check", |b| {
        b.iter(|| black_box(deep.is_enabled(black_box(LogLevel::Debug))));
    });

    group.bench_function("get_logger_existing", |b| {
        b.iter(|| black_box(registry.get_logger(&ctx, black_box("a.b.c.d.e.f"))));
    });

    group.finish();
}

// ============================================================================
// Sink Benchmarks
// ============================================================================

fn bench_file_sink(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_sink");
    group.throughput(Throughput::Elements(1));

    let temp_dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
    let record = Record::new(LogLevel::Info, "bench.file", "Benchmark message");

    let unbuffered = RotatingFileSink::new(
        FileSinkConfig::new()
            .with_directory(temp_dir.path())
            .with_prefix("unbuffered."),
    )
    .with_clock(clock.clone());
    group.bench_function("unbuffered", |b| {
        b.iter(|| unbuffered.publish(black_box(&record)));
    });

    let buffered = RotatingFileSink::new(
        FileSinkConfig::new()
            .with_directory(temp_dir.path())
            .with_prefix("buffered.")
            .with_buffer_size(64 * 1024),
    )
    .with_clock(clock);
    group.bench_function("buffered", |b| {
        b.iter(|| buffered.publish(black_box(&record)));
    });

    group.finish();
    unbuffered.close();
    buffered.close();
}

fn bench_async_sink(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_sink");
    group.throughput(Throughput::Elements(1));

    let temp_dir = TempDir::new().unwrap();
    let record = Record::new(LogLevel::Info, "bench.async", "Benchmark message");

    for policy in [OverflowPolicy::DropNewest, OverflowPolicy::DropCurrent] {
        let queue = rust_scoped_logger::core::AsyncQueue::new(10_000, policy).unwrap();
        let file = RotatingFileSink::new(
            FileSinkConfig::new()
                .with_directory(temp_dir.path())
                .with_prefix(format!("async-{}.", policy.code()))
                .with_buffer_size(64 * 1024),
        );
        let options = SinkOptions::new().with_level(LevelFilter::All);
        let sink = AsyncSink::with_options(Arc::new(file), queue, options).unwrap();

        group.bench_function(policy.to_string(), |b| {
            b.iter(|| sink.publish(black_box(&record)));
        });
        sink.close();
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_formatting,
    bench_hierarchy,
    bench_file_sink,
    bench_async_sink
);
criterion_main!(benches);
