//! Benchmark profiles for the trackward dispatcher.
//!
//! Provides seeded network and train layouts for criterion benchmarks.

#![forbid(unsafe_code)]

use std::error::Error;

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use trackward_core::{Direction, SectionId, SpeedLimit, TrainClass, TrainId};
use trackward_engine::{
    Dispatcher, DispatcherConfig, StepResult, TrainMotion, TrainPosition, TrainSpec,
};
use trackward_network::{AspectSpeeds, NetworkBuilder, SectionKind, SignalSpeed, TrackNetwork};
use trackward_route::{Route, TrainPath};

/// Seconds of travel each benchmark step represents.
pub const STEP_S: f64 = 1.0;

/// Metres kept in hand short of the end of authority by [`drive`].
const STOP_MARGIN_M: f64 = 5.0;

/// Sections between successive block signals.
const BLOCK_LEN: usize = 3;

/// Build a long single line with block signals and evenly spread trains.
///
/// Section lengths, train lengths and classes are drawn from a ChaCha8
/// stream seeded with `seed`, so a profile is reproducible.
pub fn reference_profile(seed: u64) -> Result<Dispatcher, Box<dyn Error>> {
    line_profile(seed, 120, 12)
}

/// Like [`reference_profile`] with ten times the sections and trains.
pub fn stress_profile(seed: u64) -> Result<Dispatcher, Box<dyn Error>> {
    line_profile(seed, 1200, 120)
}

fn line_profile(seed: u64, sections: usize, trains: usize) -> Result<Dispatcher, Box<dyn Error>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (net, ids) = signalled_line(&mut rng, sections)?;
    let spacing = (sections / trains.max(1)).max(1);

    let mut specs = Vec::with_capacity(trains);
    for (n, start) in (0..trains).map(|n| (n, n * spacing)) {
        let Some(&front_section) = ids.get(start) else {
            break;
        };
        let route = Route::from_sections(&net, ids[start..].iter().map(|&s| (s, Direction::Ahead)))?;
        let class = if rng.next_u32() % 4 == 0 {
            TrainClass::Freight
        } else {
            TrainClass::Passenger
        };
        specs.push(TrainSpec {
            id: TrainId(n as u32 + 1),
            class,
            length_m: 60.0 + (rng.next_u32() % 180) as f64,
            max_speed_mps: 20.0 + (rng.next_u32() % 20) as f64,
            path: Some(TrainPath::single(route)?),
            front: TrainPosition::new(front_section, net.length_m(front_section) - 10.0, Direction::Ahead),
        });
    }

    let mut dispatcher = Dispatcher::new(net, DispatcherConfig::default())?;
    for spec in specs {
        dispatcher.add_train(spec)?;
    }
    Ok(dispatcher)
}

fn signalled_line(
    rng: &mut ChaCha8Rng,
    count: usize,
) -> Result<(TrackNetwork, Vec<SectionId>), Box<dyn Error>> {
    let speeds = AspectSpeeds {
        restricting: SignalSpeed::Limit(SpeedLimit::uniform(8.0)),
        approach: SignalSpeed::Limit(SpeedLimit::uniform(20.0)),
        clear: SignalSpeed::Reset,
    };
    let mut b = NetworkBuilder::new();
    let last = count.saturating_sub(1);
    let ids: Vec<SectionId> = (0..count)
        .map(|i| {
            let kind = if i == 0 || i == last {
                SectionKind::EndOfTrack
            } else {
                SectionKind::Normal
            };
            b.add_section(kind, 300.0 + (rng.next_u32() % 500) as f64)
        })
        .collect();
    for pair in ids.windows(2) {
        b.connect(pair[0], Direction::Ahead, pair[1], Direction::Ahead);
    }
    for &id in ids.iter().skip(BLOCK_LEN - 1).step_by(BLOCK_LEN) {
        b.add_end_signal(id, Direction::Ahead, speeds);
    }
    Ok((b.build()?, ids))
}

/// Motions that move every train at its allowed speed for one step,
/// stopping short of its end of authority.
pub fn drive(result: &StepResult) -> Vec<TrainMotion> {
    result
        .outputs
        .iter()
        .map(|out| {
            let reach = (out.distance_to_stop_m - STOP_MARGIN_M).max(0.0);
            let distance_m = (out.allowed_speed_mps * STEP_S).min(reach);
            TrainMotion {
                train: out.train,
                distance_m,
                speed_mps: distance_m / STEP_S,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_profile_builds() {
        let d = reference_profile(42).unwrap();
        assert_eq!(d.trains().count(), 12);
        assert_eq!(d.network().section_count(), 120);
    }

    #[test]
    fn profiles_are_deterministic() {
        let a = reference_profile(7).unwrap();
        let b = reference_profile(7).unwrap();
        let lengths = |d: &Dispatcher| -> Vec<f64> {
            d.network().sections().iter().map(|s| s.length_m()).collect()
        };
        assert_eq!(lengths(&a), lengths(&b));
    }

    #[test]
    fn driving_never_trips_a_train() {
        let mut d = reference_profile(42).unwrap();
        let mut result = d.step(&[], Vec::new()).unwrap();
        for _ in 0..200 {
            let motions = drive(&result);
            result = d.step(&motions, Vec::new()).unwrap();
            assert!(result.brake_events.is_empty());
        }
        assert!(d.trains().all(|t| t.mode().is_auto()));
    }
}
