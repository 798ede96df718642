//! Trackward quickstart: two trains meet at a passing loop.
//!
//! Demonstrates:
//!   1. Building a network with two junctions and a loop
//!   2. Giving one train a main route plus a loop alternative
//!   3. Stepping the dispatcher with motions from a toy physics model
//!   4. Saving the dynamic state and hashing it
//!
//! Run with:
//!   RUST_LOG=trackward_engine=debug cargo run --example quickstart

use trackward_core::{Direction, TrainClass, TrainId};
use trackward_engine::{Dispatcher, DispatcherConfig, StepResult, TrainMotion, TrainPosition, TrainSpec};
use trackward_route::{AlternativeKind, TrainPath};
use trackward_snapshot::world_hash;
use trackward_test_utils::{passing_loop, route};
use tracing_subscriber::EnvFilter;

// ─── Physics parameters ─────────────────────────────────────────

const DT: f64 = 1.0;
const STOP_MARGIN_M: f64 = 5.0;
const TICKS: u64 = 90;

// ─── Toy physics: run at the allowed speed, stop short ──────────

fn physics(result: &StepResult) -> Vec<TrainMotion> {
    result
        .outputs
        .iter()
        .map(|out| {
            let reach = (out.distance_to_stop_m - STOP_MARGIN_M).max(0.0);
            let distance_m = (out.allowed_speed_mps * DT).min(reach);
            TrainMotion {
                train: out.train,
                distance_m,
                speed_mps: distance_m / DT,
            }
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Trackward Quickstart ===\n");

    // ─── Network ────────────────────────────────────────────────

    let f = passing_loop();
    println!(
        "Network: {} sections, loop between junctions {:?} and {:?}",
        f.net.section_count(),
        f.j1,
        f.j2
    );

    // ─── Paths ──────────────────────────────────────────────────

    let mut east = TrainPath::single(route(
        &f.net,
        &[f.w0, f.j1, f.m1, f.j2, f.e0],
        Direction::Ahead,
    ))?;
    east.add_alternative(
        AlternativeKind::PathBased { subpath: 0 },
        route(&f.net, &[f.j1, f.l1, f.j2], Direction::Ahead),
    )?;
    let west = TrainPath::single(route(
        &f.net,
        &[f.e0, f.j2, f.m1, f.j1, f.w0],
        Direction::Reverse,
    ))?;

    let (w0, e0) = (f.w0, f.e0);
    let mut dispatcher = Dispatcher::new(f.net, DispatcherConfig::default())?;
    dispatcher.add_train(TrainSpec {
        id: TrainId(1),
        class: TrainClass::Passenger,
        length_m: 100.0,
        max_speed_mps: 25.0,
        path: Some(east),
        front: TrainPosition::new(w0, 400.0, Direction::Ahead),
    })?;
    dispatcher.add_train(TrainSpec {
        id: TrainId(2),
        class: TrainClass::Freight,
        length_m: 120.0,
        max_speed_mps: 18.0,
        path: Some(west),
        front: TrainPosition::new(e0, 400.0, Direction::Reverse),
    })?;

    // ─── Run ────────────────────────────────────────────────────

    let mut result = dispatcher.step(&[], Vec::new())?;
    for _ in 0..TICKS {
        let motions = physics(&result);
        result = dispatcher.step(&motions, Vec::new())?;
        if dispatcher.current_tick().0 % 10 == 0 {
            for out in &result.outputs {
                println!(
                    "  tick {:>3}  train {:?}  {:?}  {:>5.1} m/s  stop in {:>6.1} m ({:?})",
                    dispatcher.current_tick().0,
                    out.train,
                    out.mode,
                    out.allowed_speed_mps,
                    out.distance_to_stop_m,
                    out.end_authority.kind,
                );
            }
        }
        for event in &result.brake_events {
            println!("  brake event: {event:?}");
        }
    }

    // ─── Save ───────────────────────────────────────────────────

    let record = dispatcher.save();
    println!(
        "\nSaved at tick {}, state hash {:#018x}",
        dispatcher.current_tick().0,
        world_hash(&record)
    );
    println!("Last tick took {} us", dispatcher.last_metrics().total_us);

    Ok(())
}
