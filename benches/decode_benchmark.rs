//! Decode benchmarks.
//!
//! Measures quote decoding throughput for:
//! - Full scans at several file sizes
//! - Selective filters with and without row-group pruning
//! - Parallel vs sequential row-group decoding

use std::path::{Path, PathBuf};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;
use tickscan::{
    parse_filters, write_records, ColumnarReader, ExportedVec, InstrumentContext, QuoteTick,
    ReaderConfig, WriterConfig,
};

/// Write a quote file with the given number of rows
fn generate_quote_file(dir: &Path, num_rows: u64) -> PathBuf {
    let path = dir.join("quotes.parquet");
    let ctx = InstrumentContext::new(1, 5, 0);
    let quotes: Vec<QuoteTick> = (0..num_rows)
        .map(|i| {
            let mid = 1.1 + (i % 1000) as f64 * 0.00001;
            QuoteTick::from_f64(&ctx, mid - 0.00002, mid + 0.00002, 1e6, 1e6, i, i)
                .expect("quote")
        })
        .collect();
    let config = WriterConfig::new().with_max_row_group_size(64 * 1024);
    write_records(&path, &quotes, &config).expect("write quotes");
    path
}

fn reader(config: ReaderConfig) -> ColumnarReader {
    ColumnarReader::new(config).expect("create reader")
}

/// Benchmark full-file decode at several sizes
fn bench_full_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_scan");
    group.sample_size(20);

    for size in &[10_000u64, 100_000, 1_000_000] {
        let temp_dir = TempDir::new().expect("create temp dir");
        let path = generate_quote_file(temp_dir.path(), *size);
        let reader = reader(ReaderConfig::default());

        group.throughput(Throughput::Elements(*size));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let quotes: Vec<QuoteTick> = reader.decode(&path, &[]).expect("decode");
                black_box(ExportedVec::export(quotes))
            });
        });
    }

    group.finish();
}

/// Benchmark a narrow time-range filter with and without pruning
fn bench_selective_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("selective_filter");
    group.sample_size(20);

    let temp_dir = TempDir::new().expect("create temp dir");
    let path = generate_quote_file(temp_dir.path(), 1_000_000);
    let filters = parse_filters("ts_event BETWEEN 500000 AND 510000").expect("parse filters");

    for prune in [true, false] {
        let reader = reader(ReaderConfig::new().with_prune_row_groups(prune));
        let label = if prune { "pruned" } else { "unpruned" };
        group.bench_function(label, |b| {
            b.iter(|| {
                let quotes: Vec<QuoteTick> = reader.decode(&path, &filters).expect("decode");
                black_box(quotes.len())
            });
        });
    }

    group.finish();
}

/// Compare parallel and sequential row-group decoding
fn bench_parallel_vs_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_vs_sequential");
    group.sample_size(10);

    let temp_dir = TempDir::new().expect("create temp dir");
    let path = generate_quote_file(temp_dir.path(), 1_000_000);
    group.throughput(Throughput::Elements(1_000_000));

    for parallel in [true, false] {
        let reader = reader(ReaderConfig::new().with_parallel(parallel));
        let label = if parallel { "parallel" } else { "sequential" };
        group.bench_function(label, |b| {
            b.iter(|| {
                let quotes: Vec<QuoteTick> = reader.decode(&path, &[]).expect("decode");
                black_box(quotes.len())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_full_scan,
    bench_selective_filter,
    bench_parallel_vs_sequential
);
criterion_main!(benches);
