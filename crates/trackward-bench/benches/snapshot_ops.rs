//! Criterion micro-benchmarks for saving, encoding and hashing state.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use trackward_bench::{drive, stress_profile};
use trackward_engine::Dispatcher;
use trackward_snapshot::{from_bytes, to_bytes, world_hash};

/// The stress profile after 50 driven ticks, so trains are spread out.
fn running_dispatcher() -> Dispatcher {
    let mut dispatcher = stress_profile(42).unwrap();
    let mut result = dispatcher.step(&[], Vec::new()).unwrap();
    for _ in 0..50 {
        let motions = drive(&result);
        result = dispatcher.step(&motions, Vec::new()).unwrap();
    }
    dispatcher
}

fn bench_save(c: &mut Criterion) {
    let dispatcher = running_dispatcher();
    c.bench_function("save_120_trains", |b| {
        b.iter(|| black_box(dispatcher.save()));
    });
}

fn bench_encode(c: &mut Criterion) {
    let record = running_dispatcher().save();
    c.bench_function("encode_120_trains", |b| {
        b.iter(|| black_box(to_bytes(&record).unwrap()));
    });
}

fn bench_decode(c: &mut Criterion) {
    let bytes = to_bytes(&running_dispatcher().save()).unwrap();
    c.bench_function("decode_120_trains", |b| {
        b.iter(|| black_box(from_bytes(&bytes).unwrap()));
    });
}

fn bench_hash(c: &mut Criterion) {
    let record = running_dispatcher().save();
    c.bench_function("world_hash_120_trains", |b| {
        b.iter(|| black_box(world_hash(&record)));
    });
}

criterion_group!(benches, bench_save, bench_encode, bench_decode, bench_hash);
criterion_main!(benches);
