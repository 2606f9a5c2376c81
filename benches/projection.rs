//! Projected vs full read benchmarks
//!
//! ## Benchmark Groups
//!
//! - `read_full/*`: every column, per output target
//! - `read_projected/*`: one or two narrow columns out of a wide record
//! - `append`: encoding and appending one record
//!
//! The projected reads copy a few bytes per record and decode only those;
//! the gap against `read_full` is the cost of decoding unwanted fields.
//!
//! ## Running
//!
//! ```bash
//! cargo bench --bench projection
//! cargo bench --bench projection -- "read_projected"  # specific group
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use recstore::{
    Database, DbMode, FieldDescriptor, OpenMode, ReadRequest, ReadTarget, Table, TableHeader,
    Value,
};
use tempfile::TempDir;

// =============================================================================
// Constants and Configuration
// =============================================================================

const RECORDS: u64 = 10_000;

const TARGETS: [ReadTarget; 5] = [
    ReadTarget::Raw,
    ReadTarget::Tuple,
    ReadTarget::Mapping,
    ReadTarget::Frame,
    ReadTarget::Array,
];

fn header() -> TableHeader {
    TableHeader::new(vec![
        FieldDescriptor::new("timestamp", "d", 8),
        FieldDescriptor::new("ok", "?", 1),
        FieldDescriptor::new("spectrum", "64f", 256),
        FieldDescriptor::new("board", "8s", 8),
        FieldDescriptor::new("seq", "Q", 8),
    ])
}

fn row(i: u64) -> Vec<Value> {
    vec![
        Value::Float(i as f64),
        Value::Bool(i % 2 == 0),
        Value::Array((0..64).map(|k| Value::Float(k as f64)).collect()),
        Value::from("board01"),
        Value::UInt(i),
    ]
}

fn populated() -> (TempDir, Table) {
    let tmp = TempDir::new().unwrap();
    let db = Database::open(tmp.path(), DbMode::Write).unwrap();
    db.create_table("bench", &header()).unwrap();
    let mut table = db.open_table("bench", OpenMode::Append).unwrap();
    for i in 0..RECORDS {
        table.append(&row(i)).unwrap();
    }
    table.close().unwrap();
    let table = db.open_table("bench", OpenMode::Read).unwrap();
    (tmp, table)
}

// =============================================================================
// Benchmarks
// =============================================================================

fn read_full(c: &mut Criterion) {
    let (_tmp, table) = populated();
    let mut group = c.benchmark_group("read_full");
    group.throughput(Throughput::Elements(RECORDS));
    for target in TARGETS {
        let request = ReadRequest::new().target(target);
        group.bench_with_input(BenchmarkId::from_parameter(target), &request, |b, req| {
            b.iter(|| black_box(table.read(req).unwrap()))
        });
    }
    group.finish();
}

fn read_projected(c: &mut Criterion) {
    let (_tmp, table) = populated();
    let mut group = c.benchmark_group("read_projected");
    group.throughput(Throughput::Elements(RECORDS));
    for target in TARGETS {
        let request = ReadRequest::new()
            .columns(["timestamp", "seq"])
            .target(target);
        group.bench_with_input(BenchmarkId::from_parameter(target), &request, |b, req| {
            b.iter(|| black_box(table.read(req).unwrap()))
        });
    }
    group.finish();
}

fn append(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let db = Database::open(tmp.path(), DbMode::Write).unwrap();
    db.create_table("bench", &header()).unwrap();
    let mut table = db.open_table("bench", OpenMode::Append).unwrap();
    let values = row(1);
    c.bench_function("append", |b| {
        b.iter(|| table.append(black_box(&values)).unwrap())
    });
}

criterion_group!(benches, read_full, read_projected, append);
criterion_main!(benches);
