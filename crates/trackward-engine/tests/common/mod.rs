//! Shared helpers for dispatcher integration tests.

#![allow(dead_code)]

use trackward_core::{Direction, SectionId, TrainClass, TrainId};
use trackward_engine::{Dispatcher, DispatcherConfig, StepResult, TrainMotion, TrainOutput, TrainPosition, TrainSpec};
use trackward_network::TrackNetwork;
use trackward_route::{AlternativeKind, TrainPath};
use trackward_test_utils::{passing_loop, route, PassingLoop};

pub fn spec(id: u32, front: TrainPosition, length_m: f64, path: Option<TrainPath>) -> TrainSpec {
    TrainSpec {
        id: TrainId(id),
        class: TrainClass::Passenger,
        length_m,
        max_speed_mps: 30.0,
        path,
        front,
    }
}

pub fn at(section: SectionId, offset_m: f64, direction: Direction) -> TrainPosition {
    TrainPosition::new(section, offset_m, direction)
}

pub fn dispatcher(net: TrackNetwork) -> Dispatcher {
    Dispatcher::new(net, DispatcherConfig::default()).expect("default config is valid")
}

/// One step with no motion and no commands.
pub fn idle(d: &mut Dispatcher) -> StepResult {
    d.step(&[], Vec::new()).expect("idle step")
}

pub fn moved(train: u32, distance_m: f64, speed_mps: f64) -> TrainMotion {
    TrainMotion {
        train: TrainId(train),
        distance_m,
        speed_mps,
    }
}

pub fn output(result: &StepResult, train: u32) -> TrainOutput {
    *result
        .outputs
        .iter()
        .find(|o| o.train == TrainId(train))
        .expect("train has an output")
}

/// Two opposing trains on the passing loop; the eastbound one may take
/// the loop.
pub fn loop_dispatcher() -> Dispatcher {
    let f = passing_loop();
    let mut east = TrainPath::single(route(
        &f.net,
        &[f.w0, f.j1, f.m1, f.j2, f.e0],
        Direction::Ahead,
    ))
    .unwrap();
    east.add_alternative(
        AlternativeKind::PathBased { subpath: 0 },
        route(&f.net, &[f.j1, f.l1, f.j2], Direction::Ahead),
    )
    .unwrap();
    let west = TrainPath::single(route(
        &f.net,
        &[f.e0, f.j2, f.m1, f.j1, f.w0],
        Direction::Reverse,
    ))
    .unwrap();
    let PassingLoop { net, w0, e0, .. } = f;
    let mut d = dispatcher(net);
    d.add_train(spec(1, at(w0, 400.0, Direction::Ahead), 100.0, Some(east)))
        .unwrap();
    d.add_train(spec(2, at(e0, 400.0, Direction::Reverse), 100.0, Some(west)))
        .unwrap();
    d
}

/// Reserved sections whose holder neither occupies them nor has them on
/// one of its routes.
pub fn stray_reservations(d: &Dispatcher) -> Vec<SectionId> {
    d.network()
        .states()
        .iter()
        .enumerate()
        .filter_map(|(i, state)| {
            let section = SectionId(i as u32);
            let holder = state.reserved_by()?;
            let owned = d.train(holder).is_some_and(|t| {
                t.occupied().contains(&section)
                    || t.control().routes().iter().any(|r| r.contains(section))
            });
            (!owned).then_some(section)
        })
        .collect()
}
