//! Criterion benchmarks for dispatcher ticks on the line profiles.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use trackward_bench::{drive, reference_profile, stress_profile};
use trackward_engine::Dispatcher;

fn bench_profile(c: &mut Criterion, name: &str, mut dispatcher: Dispatcher) {
    // Warm up: the first tick activates every train and sets up routes.
    let mut result = dispatcher.step(&[], Vec::new()).unwrap();
    c.bench_function(name, |b| {
        b.iter(|| {
            let motions = drive(&result);
            result = dispatcher.step(&motions, Vec::new()).unwrap();
            black_box(&result);
        });
    });
}

fn bench_tick_12_trains(c: &mut Criterion) {
    bench_profile(c, "tick_12_trains", reference_profile(42).unwrap());
}

fn bench_tick_120_trains(c: &mut Criterion) {
    bench_profile(c, "tick_120_trains", stress_profile(42).unwrap());
}

fn bench_idle_tick_120_trains(c: &mut Criterion) {
    let mut dispatcher = stress_profile(42).unwrap();
    dispatcher.step(&[], Vec::new()).unwrap();
    c.bench_function("idle_tick_120_trains", |b| {
        b.iter(|| {
            let result = dispatcher.step(&[], Vec::new()).unwrap();
            black_box(&result);
        });
    });
}

fn bench_300_ticks_12_trains(c: &mut Criterion) {
    c.bench_function("300_ticks_12_trains", |b| {
        b.iter(|| {
            let mut dispatcher = reference_profile(42).unwrap();
            let mut result = dispatcher.step(&[], Vec::new()).unwrap();
            for _ in 0..300 {
                let motions = drive(&result);
                result = dispatcher.step(&motions, Vec::new()).unwrap();
            }
            black_box(&result);
        });
    });
}

criterion_group!(
    benches,
    bench_tick_12_trains,
    bench_tick_120_trains,
    bench_idle_tick_120_trains,
    bench_300_ticks_12_trains
);
criterion_main!(benches);
