//! Performance benchmarks for FastMAF
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fast_maf::core::LineIterator;
use fast_maf::formats::{split_fields, MafRecord, RecordLayout, Validator};
use fast_maf::{MafReader, ReaderOptions, SchemaRegistry};
use std::io::Cursor;
use std::sync::Arc;

const ROW: &str = "TP53\t7157\tBCM\tGRCh37\t17\t7577120\t7577120\t+\tMissense_Mutation\tSNP\t\
G\tG\tA\t\t\tTCGA-A1-A0SK-01A\tTCGA-A1-A0SK-10A\t\t\t\t\t\t\tVerified\tValid\tSomatic\t\t\
WXS\t\t\t\tIllumina HiSeq\t\t";

/// Generate a MAF file with `rows` identical data lines
fn maf_text(rows: usize) -> String {
    let schema = SchemaRegistry::embedded().load("2.4.1").unwrap();
    let header: Vec<&str> = schema.headers().collect();
    let mut text = format!("#version 2.4.1\n{}\n", header.join("\t"));
    for _ in 0..rows {
        text.push_str(ROW);
        text.push('\n');
    }
    text
}

/// Benchmark schema parsing from the embedded resource
fn bench_schema_loading(c: &mut Criterion) {
    c.bench_function("schema_load_embedded", |b| {
        b.iter(|| {
            let registry = SchemaRegistry::embedded();
            black_box(registry.load(black_box("2.4.1")).unwrap())
        })
    });
}

/// Benchmark single row parsing
fn bench_record_parsing(c: &mut Criterion) {
    let schema = SchemaRegistry::embedded().load("2.4.1").unwrap();
    let layout = Arc::new(RecordLayout::new(&schema, &[]));

    c.bench_function("record_parse", |b| {
        b.iter(|| {
            let record = MafRecord::parse(black_box(ROW), 3, &layout).unwrap();
            black_box(record)
        })
    });
}

/// Benchmark single row validation
fn bench_row_validation(c: &mut Criterion) {
    let schema = SchemaRegistry::embedded().load("2.4.1").unwrap();
    let validator = Validator::new(&schema, false);
    let fields = split_fields(ROW);

    c.bench_function("row_validate", |b| {
        b.iter(|| {
            let mut issues = Vec::new();
            validator.check_row(black_box(&fields), 0, &mut issues);
            black_box(issues)
        })
    });
}

/// Benchmark whole-file iteration and validation
fn bench_file_scan(c: &mut Criterion) {
    let schema = SchemaRegistry::embedded().load("2.4.1").unwrap();
    let mut group = c.benchmark_group("file_scan");

    for rows in [100usize, 1000, 10000].iter() {
        let text = maf_text(*rows);
        group.throughput(Throughput::Elements(*rows as u64));

        group.bench_with_input(BenchmarkId::new("iterate", rows), &text, |b, text| {
            b.iter(|| {
                let reader = MafReader::from_reader(
                    Cursor::new(text.as_bytes()),
                    ReaderOptions::default(),
                )
                .unwrap();
                black_box(reader.filter_map(|r| r.ok()).count())
            })
        });

        group.bench_with_input(BenchmarkId::new("validate", rows), &text, |b, text| {
            let validator = Validator::new(&schema, false);
            b.iter(|| {
                let mut lines = LineIterator::new(Cursor::new(text.as_bytes()));
                black_box(validator.validate_lines(&mut lines).unwrap())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_schema_loading,
    bench_record_parsing,
    bench_row_validation,
    bench_file_scan,
);

criterion_main!(benches);
