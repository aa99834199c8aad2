//! Criterion benchmarks for the dataset hot paths.
//!
//! Benchmarks:
//! 1. Merge of a two-year, 300-pair dataset with one day of new rows
//! 2. CSV encode of the merged dataset
//! 3. CSV decode of the merged dataset

use chrono::NaiveDate;
use closefeed_core::data::dataset::{decode_csv, encode_csv, merge_records};
use closefeed_core::domain::PriceRecord;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_records(pairs: usize, days: i64) -> Vec<PriceRecord> {
    let base_date = NaiveDate::from_ymd_opt(2022, 6, 1).unwrap();
    (0..pairs)
        .flat_map(|p| {
            (0..days).map(move |d| PriceRecord {
                pair: format!("P{p:04}USD"),
                date: base_date + chrono::Duration::days(d),
                close: 100.0 + (d as f64 * 0.1).sin() * 10.0 + p as f64,
            })
        })
        .collect()
}

/// The rows one incremental run typically brings back: last day refetched plus today.
fn make_increment(pairs: usize, days: i64) -> Vec<PriceRecord> {
    let base_date = NaiveDate::from_ymd_opt(2022, 6, 1).unwrap();
    (0..pairs)
        .flat_map(|p| {
            [days - 1, days].into_iter().map(move |d| PriceRecord {
                pair: format!("P{p:04}USD"),
                date: base_date + chrono::Duration::days(d),
                close: 1.0 + p as f64,
            })
        })
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_records");
    for pairs in [30usize, 300] {
        let existing = make_records(pairs, 730);
        let increment = make_increment(pairs, 730);
        group.bench_with_input(BenchmarkId::from_parameter(pairs), &pairs, |b, _| {
            b.iter(|| merge_records(black_box(existing.clone()), black_box(increment.clone())))
        });
    }
    group.finish();
}

fn bench_csv(c: &mut Criterion) {
    let records = merge_records(make_records(300, 730), Vec::new());
    let bytes = encode_csv(&records).unwrap();

    c.bench_function("encode_csv_300x730", |b| {
        b.iter(|| encode_csv(black_box(&records)).unwrap())
    });
    c.bench_function("decode_csv_300x730", |b| {
        b.iter(|| decode_csv(black_box(&bytes)).unwrap())
    });
}

criterion_group!(benches, bench_merge, bench_csv);
criterion_main!(benches);
