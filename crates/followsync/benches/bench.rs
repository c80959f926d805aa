use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use followsync::{
    DEFAULT_CHUNK_CAPACITY, RelationKind, Request, decode_identifier, encode_identifier,
    length_wrap, pack_chunks, split_records,
};

// Longest list a single request can produce.
const TOTAL_NAMES: usize = 2_000;

fn names() -> Vec<String> {
    (0..TOTAL_NAMES)
        .map(|i| format!("scratcher_{i:05}-x"))
        .collect()
}

fn records(names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|name| length_wrap(&encode_identifier(name)))
        .collect()
}

fn bench_identifier_codec(c: &mut Criterion) {
    let names = names();
    let encoded: Vec<String> = names.iter().map(|n| encode_identifier(n)).collect();

    let mut group = c.benchmark_group("identifier");
    group.throughput(Throughput::Elements(TOTAL_NAMES as u64));
    group.bench_function(format!("encode/{TOTAL_NAMES}"), |b| {
        b.iter(|| {
            for name in &names {
                black_box(encode_identifier(black_box(name)));
            }
        });
    });
    group.bench_function(format!("decode/{TOTAL_NAMES}"), |b| {
        b.iter(|| {
            for digits in &encoded {
                black_box(decode_identifier(black_box(digits)));
            }
        });
    });
    group.finish();
}

fn bench_chunking(c: &mut Criterion) {
    let records = records(&names());
    let chunks = pack_chunks("123456789", &records, DEFAULT_CHUNK_CAPACITY);

    let mut group = c.benchmark_group("chunks");
    group.throughput(Throughput::Elements(TOTAL_NAMES as u64));
    group.bench_function(format!("pack/{TOTAL_NAMES}"), |b| {
        b.iter(|| {
            black_box(pack_chunks(
                black_box("123456789"),
                &records,
                DEFAULT_CHUNK_CAPACITY,
            ))
        });
    });
    group.bench_function(format!("split/{TOTAL_NAMES}"), |b| {
        b.iter(|| {
            for chunk in &chunks {
                black_box(split_records(black_box(chunk), "123456789"));
            }
        });
    });
    group.finish();
}

fn bench_request_parse(c: &mut Criterion) {
    let frame = Request {
        kind: RelationKind::Mutual,
        identifier: "griffpatch".into(),
        correlation_id: "987654321".into(),
        range_start: 1,
        range_end: 40,
    }
    .to_frame()
    .expect("correlation id fits a simple wrap");

    c.bench_function("request/parse", |b| {
        b.iter(|| black_box(Request::parse(black_box(&frame))))
    });
}

criterion_group!(
    benches,
    bench_identifier_codec,
    bench_chunking,
    bench_request_parse
);
criterion_main!(benches);
