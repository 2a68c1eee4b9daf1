//! Benchmarks for frame assembly
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use pipeframe::frame::{build_frames, FrameOptions, OutputFormat, RawResponse};
use serde_json::json;

/// `hosts` series of `rows / hosts` points each, two value columns
fn create_response(rows: usize, hosts: usize) -> RawResponse {
    let data: Vec<serde_json::Value> = (0..rows)
        .map(|i| {
            json!({
                "t": format!("2024-01-{:02} {:02}:{:02}:00", 1 + (i / hosts) / 1440, ((i / hosts) / 60) % 24, (i / hosts) % 60),
                "host": format!("host-{}", i % hosts),
                "cpu": (i % 100) as f64 / 100.0,
                "requests": i as u64,
            })
        })
        .collect();

    serde_json::from_value(json!({
        "meta": [
            {"name": "t", "type": "DateTime"},
            {"name": "host", "type": "LowCardinality(String)"},
            {"name": "cpu", "type": "Nullable(Float64)"},
            {"name": "requests", "type": "UInt64"}
        ],
        "data": data,
        "rows": rows,
    }))
    .unwrap()
}

fn bench_timeseries(c: &mut Criterion) {
    let mut group = c.benchmark_group("timeseries");

    for size in [100, 1000, 10000] {
        let response = create_response(size, 1);
        let options = FrameOptions::new(OutputFormat::TimeSeries);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("per_metric_{}", size), |b| {
            b.iter(|| build_frames(black_box(&response), &options).unwrap())
        });
    }

    group.finish();
}

fn bench_wide(c: &mut Criterion) {
    let mut group = c.benchmark_group("wide");

    for size in [100, 1000, 10000] {
        let response = create_response(size, 10);
        let options = FrameOptions::new(OutputFormat::Wide).time_key("t");

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("pivot_{}", size), |b| {
            b.iter(|| build_frames(black_box(&response), &options).unwrap())
        });
    }

    group.finish();
}

fn bench_table(c: &mut Criterion) {
    let response = create_response(1000, 4);
    let options = FrameOptions::new(OutputFormat::Table);

    c.bench_function("table_1000", |b| {
        b.iter(|| build_frames(black_box(&response), &options).unwrap())
    });
}

criterion_group!(benches, bench_timeseries, bench_wide, bench_table);
criterion_main!(benches);
