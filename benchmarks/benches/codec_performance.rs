use criterion::{black_box, criterion_group, criterion_main, Criterion};
use leadwatch_core::codec::{decode_record, LeaderRecordCodec, LengthPrefixedCodec};
use leadwatch_core::LeaderInformation;
use uuid::Uuid;

fn create_leader() -> LeaderInformation {
    LeaderInformation::known(Uuid::new_v4(), "10.0.0.7:6123")
}

fn create_long_leader() -> LeaderInformation {
    let address: String = (0..64).map(|i| format!("host-{}.", i)).collect();
    LeaderInformation::known(Uuid::new_v4(), address)
}

fn benchmark_codec(c: &mut Criterion) {
    let codec = LengthPrefixedCodec;
    let leader = create_leader();
    let long_leader = create_long_leader();

    c.bench_function("length_prefixed_encode", |b| {
        b.iter(|| codec.encode(black_box(&leader)))
    });

    c.bench_function("json_encode", |b| {
        b.iter(|| serde_json::to_vec(black_box(&leader)).unwrap())
    });

    let encoded = codec.encode(&leader);
    let json_encoded = serde_json::to_vec(&leader).unwrap();

    c.bench_function("length_prefixed_decode", |b| {
        b.iter(|| codec.decode(black_box(&encoded)).unwrap())
    });

    c.bench_function("json_decode", |b| {
        b.iter(|| {
            let _: LeaderInformation = serde_json::from_slice(black_box(&json_encoded)).unwrap();
        })
    });

    let long_encoded = codec.encode(&long_leader);
    c.bench_function("length_prefixed_decode_long_address", |b| {
        b.iter(|| codec.decode(black_box(&long_encoded)).unwrap())
    });

    c.bench_function("decode_absent_record", |b| {
        b.iter(|| decode_record(&codec, black_box(None)).unwrap())
    });

    let malformed = [0u8, 0, 0, 200, b'x'];
    c.bench_function("decode_malformed_record", |b| {
        b.iter(|| codec.decode(black_box(&malformed[..])).is_err())
    });

    // Print record sizes for comparison
    println!("\nRecord size comparison:");
    println!("Length-prefixed: {} bytes", encoded.len());
    println!("JSON: {} bytes", json_encoded.len());
    println!("Long address, length-prefixed: {} bytes", long_encoded.len());
}

criterion_group!(benches, benchmark_codec);
criterion_main!(benches);
