//! Manual and explorer control.
//!
//! A driver-controlled train has no path. Every tick two temporary
//! routes are scanned along the current switch alignment, one ahead of
//! the front and one behind the rear, and reserved as far as they are
//! free. Each route covers at least the minimum manual lookahead and
//! never more than the maximum manual route length. Manual trains stop
//! at signals that do not admit them; explorer trains ignore signals
//! altogether.
//!
//! The driver commands that act on the track ahead live here too.

use tracing::{debug, info, warn};
use trackward_core::{CommandRejection, Direction, OutOfControlCause, TrainId};
use trackward_network::TrackNetwork;
use trackward_route::{build_temp_route, Route, ScanEnd, ScanLimits, TempRoute};

use crate::authority::{EndAuthority, EndAuthorityType};
use crate::control::{ControlMode, ControlState, ManualControl};
use crate::position::TrainPosition;
use crate::reservation::{Availability, ReservationManager};
use crate::signaling::{next_signal, signals_in, RouteSignal};
use crate::train::{TickContext, Train};

const MAX_SCAN_SECTIONS: usize = 256;

fn scan(net: &TrackNetwork, train: TrainId, start: &TrainPosition, length_m: f64) -> Option<TempRoute> {
    let limits = ScanLimits {
        min_length_m: length_m,
        stop_at_signals: false,
        max_sections: MAX_SCAN_SECTIONS,
    };
    let free = |section, _| {
        let state = net.state(section);
        state.occupied_by_other(train).is_none() && !state.is_reserved_by_other(train)
    };
    match build_temp_route(net, start.section, start.offset_m, start.direction, limits, free) {
        Ok(scan) => Some(scan),
        Err(e) => {
            warn!(%train, error = %e, "route scan failed");
            None
        }
    }
}

/// Drop elements from the far end while the route reaches beyond
/// `max_m`. The start element always stays.
fn cap_length(net: &TrackNetwork, route: &mut Route, offset_m: f64, max_m: f64) -> bool {
    let mut cut = false;
    while route.len() > 1 && route.distance_to_end_of(net, 0, offset_m, route.len() - 1) > max_m {
        route.truncate(route.len() - 1);
        cut = true;
    }
    cut
}

/// Reserve `route` from its start. The route is cut back to what was
/// reserved; returns the last index held and the refusal, if any.
fn reserve(net: &mut TrackNetwork, route: &mut Route, train: TrainId) -> (usize, Option<Availability>) {
    if route.is_empty() {
        return (0, None);
    }
    let outcome = ReservationManager::new(net).reserve_route(route, 0, route.len() - 1, train);
    match outcome.conflict {
        None => (route.len() - 1, None),
        Some(conflict) => {
            let last = outcome.last_reserved.unwrap_or(0);
            route.truncate(last + 1);
            (last, Some(conflict.availability))
        }
    }
}

fn authority(
    net: &TrackNetwork,
    train: TrainId,
    route: &Route,
    offset_m: f64,
    respect_signals: bool,
    end: ScanEnd,
    refused: Option<Availability>,
) -> EndAuthority {
    if route.is_empty() {
        return EndAuthority::new(EndAuthorityType::NoPathReserved, 0.0);
    }
    if respect_signals {
        for i in 0..route.len() {
            for sig in signals_in(net, route, i) {
                if i == 0 && sig.offset_m < offset_m {
                    continue;
                }
                if !net.signal_state(sig.signal).admits(train) {
                    let d = route.distance(net, (0, offset_m), (i, sig.offset_m));
                    return EndAuthority::new(EndAuthorityType::Signal, d);
                }
            }
        }
    }
    let d = route.distance_to_end_of(net, 0, offset_m, route.len() - 1);
    let kind = match refused {
        Some(_) => EndAuthorityType::TrainAhead,
        None => match end {
            ScanEnd::LengthReached | ScanEnd::MaxSections => EndAuthorityType::MaxDistance,
            ScanEnd::EndOfTrack => EndAuthorityType::EndOfTrack,
            ScanEnd::Unavailable(_) => EndAuthorityType::TrainAhead,
            ScanEnd::Loop(_) => EndAuthorityType::Loop,
            ScanEnd::Signal(_) => EndAuthorityType::Signal,
        },
    };
    EndAuthority::new(kind, d)
}

pub(crate) fn update(train: &mut Train, ctx: &mut TickContext<'_>) -> Result<(), OutOfControlCause> {
    let id = train.id;
    let respect_signals = train.control.mode() != ControlMode::Explorer;
    let Some(old) = train.control.manual().cloned() else {
        return Ok(());
    };

    // Speed effects of items passed on the old forward route.
    let old_front = old.routes[0].index_of(train.front.section, 0);
    match old_front {
        Some(index) => {
            train
                .lookahead
                .refresh(ctx.net, &old.routes[0], (index, train.front.offset_m));
            let passed = train.lookahead.pop_passed();
            train.apply_passed(ctx.net, &passed);
        }
        None => train.lookahead.clear(),
    }

    let ends = [train.front, train.rear.reversed(ctx.net)];
    let (min_m, max_m) = (ctx.config.manual_min_lookahead_m, ctx.config.manual_max_route_m);
    let mut next = ManualControl::default();
    for (k, start) in ends.iter().enumerate() {
        let Some(found) = scan(ctx.net, id, start, min_m) else {
            continue;
        };
        let mut route = found.route;
        let end = if cap_length(ctx.net, &mut route, start.offset_m, max_m) {
            ScanEnd::LengthReached
        } else {
            found.end
        };
        let (last, refused) = reserve(ctx.net, &mut route, id);
        if refused == Some(Availability::Misaligned) {
            warn!(train = %id, "switch under train set against manual route");
            return Err(OutOfControlCause::MisalignedSwitch);
        }
        next.authority[k] = authority(ctx.net, id, &route, start.offset_m, respect_signals, end, refused);
        next.last_reserved[k] = last;
        next.routes[k] = route;
    }

    // Release what the new routes no longer cover, farthest first.
    for old_route in &old.routes {
        for e in old_route.iter().rev() {
            if next.routes.iter().any(|r| r.contains(e.section)) {
                continue;
            }
            let state = ctx.net.state_mut(e.section);
            if !state.is_occupied_by(id) && state.release(id) {
                debug!(train = %id, section = %e.section, "released behind driver");
            }
        }
    }

    train.front.route_index = 0;
    train.lookahead.rebase(&old.routes[0], &next.routes[0]);
    let passed = train.lookahead.update(
        ctx.net,
        &next.routes[0],
        (0, train.front.offset_m),
        ctx.config.signal_lookahead_m,
    );
    train.apply_passed(ctx.net, &passed);

    if let Some(m) = train.control.manual_mut() {
        *m = next;
    }
    Ok(())
}

// ── Driver commands ────────────────────────────────────────────────

/// The route a command aimed `direction` refers to, with the position to
/// search from.
fn command_route(train: &Train, net: &TrackNetwork, direction: Direction) -> Result<(Route, usize, f64), CommandRejection> {
    match &train.control {
        ControlState::AutoSignal(a) | ControlState::AutoNode(a) if direction == Direction::Ahead => {
            Ok((a.route.clone(), train.front.route_index, train.front.offset_m))
        }
        ControlState::Manual(m) | ControlState::Explorer(m) => {
            let offset = match direction {
                Direction::Ahead => train.front.offset_m,
                Direction::Reverse => train.rear.reversed(net).offset_m,
            };
            Ok((m.route(direction).clone(), 0, offset))
        }
        _ => Err(CommandRejection::InvalidInMode),
    }
}

/// Throw the first facing switch ahead in `direction`.
pub(crate) fn set_switch(train: &Train, net: &mut TrackNetwork, direction: Direction) -> Result<(), CommandRejection> {
    let Some(m) = train.control.manual() else {
        return Err(CommandRejection::NotInManualControl);
    };
    let e = *m
        .route(direction)
        .iter()
        .skip(1)
        .find(|e| net.section(e.section).is_facing_switch(e.direction))
        .ok_or(CommandRejection::NoSwitchFound)?;
    let state = net.state(e.section);
    if state.is_occupied() {
        return Err(CommandRejection::SwitchOccupied { section: e.section });
    }
    if let Some(by) = state.reserved_by().filter(|&t| t != train.id) {
        return Err(CommandRejection::SwitchReserved {
            section: e.section,
            by,
        });
    }
    let legs = net.section(e.section).pins(e.direction).len().max(1) as u8;
    let leg = (state.alignment() + 1) % legs;
    net.set_alignment(e.section, leg)
        .map_err(|_| CommandRejection::NoSwitchFound)?;
    info!(train = %train.id, section = %e.section, leg, "switch thrown by driver");
    Ok(())
}

fn target_signal(train: &Train, net: &TrackNetwork, direction: Direction) -> Result<RouteSignal, CommandRejection> {
    let (route, index, offset) = command_route(train, net, direction)?;
    next_signal(net, &route, index, offset).ok_or(CommandRejection::NoSignalFound)
}

/// Let the train pass the next signal in `direction` at stop.
pub(crate) fn request_permission(
    train: &Train,
    net: &mut TrackNetwork,
    direction: Direction,
) -> Result<(), CommandRejection> {
    let sig = target_signal(train, net, direction)?;
    let state = net.signal_state_mut(sig.signal);
    if let Some(other) = state.enabled_for.filter(|&t| t != train.id) {
        return Err(CommandRejection::SignalEnabledForOtherTrain {
            signal: sig.signal,
            train: other,
        });
    }
    state.permission_for = Some(train.id);
    info!(train = %train.id, signal = %sig.signal, "permission to pass granted");
    Ok(())
}

/// Return the next signal cleared for the train to stop and release the
/// track beyond it.
pub(crate) fn reset_signal(
    train: &mut Train,
    net: &mut TrackNetwork,
    direction: Direction,
) -> Result<(), CommandRejection> {
    let (route, index, offset) = command_route(train, net, direction)?;
    let sig = next_signal(net, &route, index, offset).ok_or(CommandRejection::NoSignalFound)?;
    let state = net.signal_state_mut(sig.signal);
    if state.enabled_for != Some(train.id) && state.permission_for != Some(train.id) {
        return Err(CommandRejection::SignalNotEnabled { signal: sig.signal });
    }
    state.reset();
    ReservationManager::new(net).release_from(&route, sig.index + 1, train.id);
    match &mut train.control {
        ControlState::AutoSignal(a) | ControlState::AutoNode(a) => {
            a.last_reserved = a.last_reserved.min(sig.index);
        }
        ControlState::Manual(m) | ControlState::Explorer(m) => {
            let k = direction.index();
            m.last_reserved[k] = m.last_reserved[k].min(sig.index);
        }
        _ => {}
    }
    info!(train = %train.id, signal = %sig.signal, "signal reset by driver");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brake::BrakeEvent;
    use crate::config::ControlConfig;
    use crate::outbox::Outbox;
    use crate::train::TrainSpec;
    use trackward_core::TrainClass;
    use trackward_network::Aspect;
    use trackward_test_utils::{passing_loop, signalled_line, straight_line};

    fn driver(net: &TrackNetwork, front: TrainPosition, mode: ControlMode) -> Train {
        let mut t = Train::new(
            TrainSpec {
                id: TrainId(1),
                class: TrainClass::Passenger,
                length_m: 40.0,
                max_speed_mps: 20.0,
                path: None,
                front,
            },
            net,
        )
        .expect("train");
        t.control = match mode {
            ControlMode::Explorer => ControlState::Explorer(ManualControl::default()),
            _ => ControlState::Manual(ManualControl::default()),
        };
        t
    }

    fn tick(t: &mut Train, net: &mut TrackNetwork, config: &ControlConfig) {
        let mut outbox = Outbox::new();
        let mut brakes: Vec<BrakeEvent> = Vec::new();
        let mut ctx = TickContext {
            net,
            config,
            outbox: &mut outbox,
            brakes: &mut brakes,
        };
        update(t, &mut ctx).expect("no violation");
    }

    #[test]
    fn routes_reach_end_of_track_both_ways() {
        let (mut net, ids) = straight_line(&[100.0, 100.0, 100.0]);
        let mut t = driver(&net, TrainPosition::new(ids[1], 50.0, Direction::Ahead), ControlMode::Manual);
        tick(&mut t, &mut net, &ControlConfig::default());
        let m = t.control().manual().expect("manual");
        assert_eq!(m.routes[0].len(), 2);
        assert_eq!(m.authority[0].kind, EndAuthorityType::EndOfTrack);
        assert_eq!(m.authority[0].distance_m, 150.0);
        assert_eq!(m.authority[1].kind, EndAuthorityType::EndOfTrack);
        assert_eq!(net.state(ids[2]).reserved_by(), Some(TrainId(1)));
        assert_eq!(net.state(ids[0]).reserved_by(), Some(TrainId(1)));
    }

    #[test]
    fn scan_stops_once_minimum_is_covered() {
        let (mut net, ids) = straight_line(&[100.0; 8]);
        let config = ControlConfig {
            manual_min_lookahead_m: 250.0,
            manual_max_route_m: 400.0,
            ..ControlConfig::default()
        };
        let mut t = driver(&net, TrainPosition::new(ids[1], 50.0, Direction::Ahead), ControlMode::Manual);
        tick(&mut t, &mut net, &config);
        let m = t.control().manual().expect("manual");
        assert_eq!(m.authority[0].kind, EndAuthorityType::MaxDistance);
        assert_eq!(m.authority[0].distance_m, 250.0);
        assert_eq!(net.state(ids[3]).reserved_by(), Some(TrainId(1)));
        assert_eq!(net.state(ids[4]).reserved_by(), None);
    }

    #[test]
    fn route_past_maximum_is_cut_back_and_released() {
        let (mut net, ids) = straight_line(&[100.0, 600.0, 100.0]);
        let mut t = driver(&net, TrainPosition::new(ids[0], 50.0, Direction::Ahead), ControlMode::Manual);
        tick(&mut t, &mut net, &ControlConfig::default());
        assert_eq!(net.state(ids[1]).reserved_by(), Some(TrainId(1)));

        let capped = ControlConfig {
            manual_min_lookahead_m: 250.0,
            manual_max_route_m: 400.0,
            ..ControlConfig::default()
        };
        tick(&mut t, &mut net, &capped);
        let m = t.control().manual().expect("manual");
        assert_eq!(m.routes[0].len(), 1);
        assert_eq!(m.authority[0].kind, EndAuthorityType::MaxDistance);
        assert_eq!(m.authority[0].distance_m, 50.0);
        assert_eq!(net.state(ids[1]).reserved_by(), None);
    }

    #[test]
    fn manual_stops_at_signal_explorer_does_not() {
        let mut f = signalled_line();
        let front = TrainPosition::new(f.sections[0], 100.0, Direction::Ahead);
        let config = ControlConfig::default();

        let mut manual = driver(&f.net, front, ControlMode::Manual);
        tick(&mut manual, &mut f.net, &config);
        let a = manual.control().manual().expect("manual").authority[0];
        assert_eq!(a.kind, EndAuthorityType::Signal);
        assert_eq!(a.distance_m, 100.0);

        let mut explorer = driver(&f.net, front, ControlMode::Explorer);
        tick(&mut explorer, &mut f.net, &config);
        let a = explorer.control().manual().expect("explorer").authority[0];
        assert_ne!(a.kind, EndAuthorityType::Signal);
    }

    #[test]
    fn permission_lets_manual_train_pass() {
        let mut f = signalled_line();
        let front = TrainPosition::new(f.sections[0], 100.0, Direction::Ahead);
        let config = ControlConfig {
            manual_min_lookahead_m: 600.0,
            ..ControlConfig::default()
        };
        let mut t = driver(&f.net, front, ControlMode::Manual);
        tick(&mut t, &mut f.net, &config);
        request_permission(&t, &mut f.net, Direction::Ahead).expect("granted");
        assert_eq!(f.net.signal_state(f.signals[0]).permission_for, Some(TrainId(1)));
        assert_eq!(f.net.signal_state(f.signals[0]).aspect, Aspect::Stop);
        tick(&mut t, &mut f.net, &config);
        let a = t.control().manual().expect("manual").authority[0];
        assert_eq!(a.kind, EndAuthorityType::Signal);
        assert!(a.distance_m > 100.0);
    }

    #[test]
    fn permission_refused_for_signal_cleared_for_other() {
        let mut f = signalled_line();
        f.net.signal_state_mut(f.signals[0]).enabled_for = Some(TrainId(7));
        let front = TrainPosition::new(f.sections[0], 100.0, Direction::Ahead);
        let mut t = driver(&f.net, front, ControlMode::Manual);
        tick(&mut t, &mut f.net, &ControlConfig::default());
        match request_permission(&t, &mut f.net, Direction::Ahead) {
            Err(CommandRejection::SignalEnabledForOtherTrain { train, .. }) => {
                assert_eq!(train, TrainId(7));
            }
            other => panic!("expected SignalEnabledForOtherTrain, got {other:?}"),
        }
    }

    #[test]
    fn set_switch_toggles_facing_switch() {
        let mut f = passing_loop();
        let front = TrainPosition::new(f.w0, 400.0, Direction::Ahead);
        let mut t = driver(&f.net, front, ControlMode::Manual);
        tick(&mut t, &mut f.net, &ControlConfig::default());
        assert_eq!(f.net.state(f.j1).alignment(), 0);
        // The driver's own reservation does not block the switch.
        set_switch(&t, &mut f.net, Direction::Ahead).expect("thrown");
        assert_eq!(f.net.state(f.j1).alignment(), 1);
    }

    #[test]
    fn own_switch_set_against_route_is_a_violation() {
        let mut f = passing_loop();
        f.net.set_alignment(f.j1, 1).expect("loop leg");
        let front = TrainPosition::new(f.m1, 390.0, Direction::Reverse);
        let mut t = driver(&f.net, front, ControlMode::Manual);
        f.net.state_mut(f.j1).set_occupied(TrainId(1), Direction::Reverse);
        let config = ControlConfig::default();
        let mut outbox = Outbox::new();
        let mut brakes: Vec<BrakeEvent> = Vec::new();
        let mut ctx = TickContext {
            net: &mut f.net,
            config: &config,
            outbox: &mut outbox,
            brakes: &mut brakes,
        };
        match update(&mut t, &mut ctx) {
            Err(OutOfControlCause::MisalignedSwitch) => {}
            other => panic!("expected MisalignedSwitch, got {other:?}"),
        }
    }

    #[test]
    fn set_switch_needs_manual_control() {
        let (net, ids) = straight_line(&[100.0]);
        let mut t = driver(&net, TrainPosition::new(ids[0], 50.0, Direction::Ahead), ControlMode::Manual);
        t.control = ControlState::Undefined;
        let mut net = net;
        assert_eq!(
            set_switch(&t, &mut net, Direction::Ahead),
            Err(CommandRejection::NotInManualControl)
        );
    }

    #[test]
    fn reset_requires_signal_enabled_for_train() {
        let mut f = signalled_line();
        let front = TrainPosition::new(f.sections[0], 100.0, Direction::Ahead);
        let mut t = driver(&f.net, front, ControlMode::Manual);
        tick(&mut t, &mut f.net, &ControlConfig::default());
        match reset_signal(&mut t, &mut f.net, Direction::Ahead) {
            Err(CommandRejection::SignalNotEnabled { signal }) => assert_eq!(signal, f.signals[0]),
            other => panic!("expected SignalNotEnabled, got {other:?}"),
        }
    }
}
