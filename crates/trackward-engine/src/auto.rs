//! Automatic control: following the path under node or signal control.
//!
//! Each tick the reservation is extended from the front along the route
//! until something stops it: a signal that will not clear, another
//! train, the end of the route or the node lookahead distance. The
//! first such obstacle is the train's end of authority.

use tracing::{info, warn};
use trackward_core::{OutOfControlCause, RoutingFault, TrainId};
use trackward_network::{Aspect, TrackNetwork};
use trackward_route::Route;

use crate::authority::{EndAuthority, EndAuthorityType};
use crate::control::{transition, AutoControl, ControlEvent, ControlMode, ControlState};
use crate::deadlock::{self, TrapOutcome, TrapSite};
use crate::position::TrainPosition;
use crate::reservation::{Availability, ReservationManager};
use crate::signaling::{request_clear, signals_in, ClearOutcome};
use crate::train::{TickContext, Train};

fn locate(route: &Route, pos: &TrainPosition, hint: usize) -> Option<usize> {
    route
        .index_of(pos.section, hint)
        .filter(|&i| route.get(i).is_some_and(|e| e.direction == pos.direction))
}

/// Put `train` under automatic control on its active subpath.
pub(crate) fn install(train: &mut Train, signal: bool) -> Result<(), RoutingFault> {
    let path = train.path.as_ref().ok_or(RoutingFault::NoPathFound {
        from: train.front.section,
    })?;
    let route = path
        .subpath(train.subpath)
        .map_err(|_| RoutingFault::RouteExhausted {
            subpath: train.subpath,
        })?
        .clone();
    let front_index = locate(&route, &train.front, 0).ok_or(RoutingFault::OffPath {
        section: train.front.section,
    })?;
    train.front.route_index = front_index;
    train.rear.route_index = route.index_of(train.rear.section, front_index).unwrap_or(0);
    let auto = AutoControl {
        route,
        last_reserved: front_index,
        authority: EndAuthority::new(EndAuthorityType::NoPathReserved, 0.0),
    };
    train.control = if signal {
        ControlState::AutoSignal(auto)
    } else {
        ControlState::AutoNode(auto)
    };
    train.lookahead.clear();
    Ok(())
}

pub(crate) fn update(train: &mut Train, ctx: &mut TickContext<'_>) -> Result<(), OutOfControlCause> {
    let id = train.id;
    let (front_index, rear_index) = {
        let Some(auto) = train.control.auto() else {
            return Ok(());
        };
        let Some(f) = locate(&auto.route, &train.front, train.front.route_index) else {
            warn!(train = %id, section = %train.front.section, "front left its route");
            return Err(OutOfControlCause::OutOfPath);
        };
        (f, auto.route.index_of(train.rear.section, f))
    };
    train.front.route_index = front_index;
    if let Some(r) = rear_index {
        train.rear.route_index = r;
    }

    if at_route_end(train, ctx) {
        if !reverse(train, ctx)? {
            let remaining = train
                .control
                .auto()
                .map_or(0.0, |a| a.route.remaining_length(ctx.net, front_index, train.front.offset_m));
            if let Some(auto) = train.control.auto_mut() {
                auto.authority = EndAuthority::new(EndAuthorityType::EndOfPath, remaining);
            }
            return Ok(());
        }
    }

    // Speed effects of items passed since the last tick.
    if let Some(auto) = train.control.auto() {
        let front = (train.front.route_index, train.front.offset_m);
        train.lookahead.refresh(ctx.net, &auto.route, front);
        let passed = train.lookahead.pop_passed();
        train.apply_passed(ctx.net, &passed);
    }

    let signal_control = extend(train, ctx)?;

    if let Some(auto) = train.control.auto() {
        let front = (train.front.route_index, train.front.offset_m);
        let passed = train
            .lookahead
            .update(ctx.net, &auto.route, front, ctx.config.signal_lookahead_m);
        train.apply_passed(ctx.net, &passed);
    }

    let current = train.control.mode();
    let event = if signal_control {
        ControlEvent::SignalCleared
    } else {
        ControlEvent::SignalUnavailable
    };
    if let Ok(mode) = transition(&train.control, event) {
        if mode != current {
            info!(train = %id, from = %current, to = %mode, "control mode changed");
            train.control.set_auto_mode(mode == ControlMode::AutoSignal);
        }
    }
    Ok(())
}

fn at_route_end(train: &Train, ctx: &TickContext<'_>) -> bool {
    let Some(auto) = train.control.auto() else {
        return false;
    };
    let index = train.front.route_index;
    index + 1 == auto.route.len()
        && train.at_standstill(ctx.config)
        && auto.route.remaining_length(ctx.net, index, train.front.offset_m)
            <= ctx.config.authority_tolerance_m
}

/// Turn round onto the next subpath. `Ok(false)` when there is none.
fn reverse(train: &mut Train, ctx: &mut TickContext<'_>) -> Result<bool, OutOfControlCause> {
    let next = train.subpath + 1;
    let has_next = train.path.as_ref().is_some_and(|p| next < p.subpath_count());
    if !has_next {
        return Ok(false);
    }
    train.break_down(ctx.net);
    train.reverse_ends(ctx.net);
    train.subpath = next;
    if let Err(fault) = install(train, false) {
        warn!(train = %train.id, %fault, "cannot reverse onto next subpath");
        return Err(OutOfControlCause::OutOfPath);
    }
    info!(train = %train.id, subpath = next, "reversed onto next subpath");
    Ok(true)
}

/// Authority after reservation stopped beyond element `at`.
fn stop_short(
    ctx: &mut TickContext<'_>,
    auto: &mut AutoControl,
    train: TrainId,
    front: (usize, f64),
    at: usize,
    kind: EndAuthorityType,
) -> EndAuthority {
    let last = ReservationManager::new(ctx.net).roll_back_switches(&auto.route, at, front.0, train);
    auto.last_reserved = last;
    let d = auto.route.distance_to_end_of(ctx.net, front.0, front.1, last);
    EndAuthority::new(kind, d)
}

/// Extend the reservation and settle the authority. Returns whether the
/// train ran under a signal cleared for it, or the cause when the train
/// stands on a switch set against its own route.
fn extend(train: &mut Train, ctx: &mut TickContext<'_>) -> Result<bool, OutOfControlCause> {
    let id = train.id;
    let config = ctx.config;
    let Train {
        control,
        path,
        front,
        subpath,
        blocked_s,
        deadlock_wait_s,
        lookahead,
        ..
    } = train;
    let Some(auto) = control.auto_mut() else {
        return Ok(false);
    };
    let front_index = front.route_index;
    let front_at = (front_index, front.offset_m);
    auto.last_reserved = auto.last_reserved.max(front_index);

    let mut signal_control = false;
    let mut trap_resolved = false;
    let mut i = front_index;
    let authority = 'scan: loop {
        for sig in signals_in(ctx.net, &auto.route, i) {
            if i == front_index && sig.offset_m < front.offset_m {
                continue;
            }
            let d = auto.route.distance(ctx.net, front_at, (i, sig.offset_m));
            let state = ctx.net.signal_state(sig.signal);
            if state.permission_for == Some(id) {
                continue;
            }
            match state.enabled_for {
                // A partial run is asked again until it clears.
                Some(t)
                    if t == id
                        && state.aspect == Aspect::Restricting
                        && d <= config.signal_request_m => {}
                Some(t) if t == id && state.aspect != Aspect::Stop => {
                    signal_control = true;
                    continue;
                }
                Some(t) if t == id && state.is_held() => {
                    signal_control = false;
                    break 'scan EndAuthority::new(EndAuthorityType::Signal, d);
                }
                Some(t) if t != id => {
                    signal_control = false;
                    break 'scan EndAuthority::new(EndAuthorityType::Signal, d);
                }
                _ => {}
            }
            if d > config.signal_request_m {
                break 'scan EndAuthority::new(EndAuthorityType::Signal, d);
            }
            let (outcome, held_to) = request_clear(ctx.net, sig.signal, &auto.route, i, id);
            match outcome {
                ClearOutcome::Cleared => {
                    auto.last_reserved = auto.last_reserved.max(held_to);
                    signal_control = true;
                }
                ClearOutcome::Held => {
                    auto.last_reserved = auto.last_reserved.max(held_to);
                    signal_control = false;
                    break 'scan EndAuthority::new(EndAuthorityType::Signal, d);
                }
                ClearOutcome::Partial => {
                    auto.last_reserved = auto.last_reserved.max(held_to);
                    signal_control = false;
                }
                ClearOutcome::Blocked => {
                    signal_control = false;
                    break 'scan EndAuthority::new(EndAuthorityType::TrainAhead, d);
                }
            }
        }

        let Some(here) = auto.route.get(i).copied() else {
            break 'scan EndAuthority::new(EndAuthorityType::NoPathReserved, 0.0);
        };
        let end_d = auto.route.distance_to_end_of(ctx.net, front_index, front.offset_m, i);
        let next = i + 1;
        let Some(next_el) = auto.route.get(next).copied() else {
            let kind = if ctx.net.next_pin(here.section, here.direction).is_none() {
                EndAuthorityType::EndOfTrack
            } else {
                EndAuthorityType::EndOfPath
            };
            break 'scan EndAuthority::new(kind, end_d);
        };
        let ours = ctx.net.state(next_el.section).reserved_by() == Some(id);
        if ours {
            i = next;
            continue;
        }
        if end_d >= config.node_lookahead_m {
            break 'scan EndAuthority::new(EndAuthorityType::MaxDistance, end_d);
        }

        if !trap_resolved {
            let trap = ctx.net.state(next_el.section).traps_for(id).first().copied();
            if let Some(trap) = trap {
                let site = TrapSite {
                    train: id,
                    route: &mut auto.route,
                    path: path.as_mut(),
                    subpath: *subpath,
                    front_index,
                    next,
                    waited_s: &mut *deadlock_wait_s,
                };
                match deadlock::resolve(ctx, site, trap) {
                    TrapOutcome::Rerouted => {
                        trap_resolved = true;
                        lookahead.clear();
                        continue;
                    }
                    TrapOutcome::EnterRun { end } => {
                        let run = ReservationManager::new(ctx.net).reserve_route(&auto.route, next, end, id);
                        if run.conflict.is_some_and(|c| c.availability == Availability::Misaligned) {
                            warn!(train = %id, "switch under train set against deadlock run");
                            return Err(OutOfControlCause::MisalignedSwitch);
                        }
                        match (run.conflict, run.last_reserved) {
                            (None, Some(last)) => {
                                *deadlock_wait_s = 0.0;
                                auto.last_reserved = auto.last_reserved.max(last);
                                i = last;
                                continue;
                            }
                            _ => {
                                signal_control = false;
                                let at = run.last_reserved.unwrap_or(i);
                                break 'scan stop_short(ctx, auto, id, front_at, at, EndAuthorityType::TrainAhead);
                            }
                        }
                    }
                    TrapOutcome::Wait => {
                        signal_control = false;
                        break 'scan stop_short(ctx, auto, id, front_at, i, EndAuthorityType::TrainAhead);
                    }
                }
            }
        }
        trap_resolved = false;

        match ReservationManager::new(ctx.net).reserve_element(&next_el, id) {
            Ok(()) => {
                *blocked_s = 0.0;
                *deadlock_wait_s = 0.0;
                auto.last_reserved = auto.last_reserved.max(next);
                i = next;
            }
            Err(conflict) if conflict.availability == Availability::Misaligned => {
                warn!(train = %id, section = %next_el.section, "switch under train set against route");
                return Err(OutOfControlCause::MisalignedSwitch);
            }
            Err(_) => {
                *blocked_s += config.tick_seconds;
                if *blocked_s >= config.wait_before_claim_s {
                    ReservationManager::new(ctx.net).pre_reserve(next_el.section, id);
                }
                signal_control = false;
                break 'scan stop_short(ctx, auto, id, front_at, i, EndAuthorityType::TrainAhead);
            }
        }
    };
    auto.authority = authority;
    Ok(signal_control)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brake::BrakeEvent;
    use crate::config::ControlConfig;
    use crate::outbox::Outbox;
    use crate::train::TrainSpec;
    use trackward_core::{Direction, TrainClass};
    use trackward_route::TrainPath;
    use trackward_test_utils::{passing_loop, route, signalled_line, straight_line};

    fn train_on(net: &TrackNetwork, ids: &[trackward_core::SectionId], offset: f64) -> Train {
        let path = TrainPath::single(route(net, ids, Direction::Ahead)).expect("path");
        Train::new(
            TrainSpec {
                id: TrainId(1),
                class: TrainClass::Passenger,
                length_m: 50.0,
                max_speed_mps: 30.0,
                path: Some(path),
                front: TrainPosition::new(ids[0], offset, Direction::Ahead),
            },
            net,
        )
        .expect("train")
    }

    #[test]
    fn install_locates_front_on_route() {
        let (net, ids) = straight_line(&[100.0, 100.0, 100.0]);
        let mut t = train_on(&net, &ids, 80.0);
        install(&mut t, false).expect("on path");
        assert_eq!(t.mode(), ControlMode::AutoNode);
        assert_eq!(t.front().route_index, 0);
    }

    #[test]
    fn install_without_path_fails() {
        let (net, ids) = straight_line(&[100.0]);
        let mut t = train_on(&net, &ids, 80.0);
        t.path = None;
        match install(&mut t, false) {
            Err(RoutingFault::NoPathFound { .. }) => {}
            other => panic!("expected NoPathFound, got {other:?}"),
        }
    }

    #[test]
    fn extension_stops_at_node_lookahead() {
        let (mut net, ids) = straight_line(&[400.0, 400.0, 400.0, 400.0, 400.0]);
        let mut t = train_on(&net, &ids, 100.0);
        install(&mut t, false).expect("on path");
        let config = ControlConfig {
            node_lookahead_m: 500.0,
            ..ControlConfig::default()
        };
        let mut outbox = Outbox::new();
        let mut brakes: Vec<BrakeEvent> = Vec::new();
        let mut ctx = TickContext {
            net: &mut net,
            config: &config,
            outbox: &mut outbox,
            brakes: &mut brakes,
        };
        update(&mut t, &mut ctx).expect("no violation");
        let auto = t.control().auto().expect("auto");
        assert_eq!(auto.last_reserved, 1);
        assert_eq!(auto.authority.kind, EndAuthorityType::MaxDistance);
        assert_eq!(auto.authority.distance_m, 700.0);
        assert_eq!(net.state(ids[1]).reserved_by(), Some(TrainId(1)));
        assert_eq!(net.state(ids[2]).reserved_by(), None);
    }

    #[test]
    fn train_ahead_limits_authority() {
        let (mut net, ids) = straight_line(&[200.0, 200.0, 200.0]);
        ReservationManager::new(&mut net).set_occupied(ids[2], TrainId(9), Direction::Reverse);
        let mut t = train_on(&net, &ids, 150.0);
        install(&mut t, false).expect("on path");
        let config = ControlConfig::default();
        let mut outbox = Outbox::new();
        let mut brakes = Vec::new();
        let mut ctx = TickContext {
            net: &mut net,
            config: &config,
            outbox: &mut outbox,
            brakes: &mut brakes,
        };
        update(&mut t, &mut ctx).expect("no violation");
        let auto = t.control().auto().expect("auto");
        assert_eq!(auto.authority.kind, EndAuthorityType::TrainAhead);
        assert_eq!(auto.authority.distance_m, 250.0);
        assert_eq!(t.mode(), ControlMode::AutoNode);
    }

    #[test]
    fn own_switch_set_against_route_is_a_violation() {
        let mut f = passing_loop();
        let ids = [f.w0, f.j1, f.l1, f.j2, f.e0];
        let mut t = train_on(&f.net, &ids, 400.0);
        install(&mut t, false).expect("on path");
        // Still standing on j1, which is set for m1.
        f.net.state_mut(f.j1).set_occupied(TrainId(1), Direction::Ahead);
        let config = ControlConfig::default();
        let mut outbox = Outbox::new();
        let mut brakes = Vec::new();
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
        assert_eq!(f.net.state(f.j1).alignment(), 0);
    }

    #[test]
    fn restricting_signal_is_asked_again() {
        let mut f = signalled_line();
        ReservationManager::new(&mut f.net).set_occupied(f.sections[2], TrainId(9), Direction::Reverse);
        let mut t = train_on(&f.net, &f.sections, 150.0);
        install(&mut t, false).expect("on path");
        let config = ControlConfig::default();
        let mut outbox = Outbox::new();
        let mut brakes = Vec::new();
        {
            let mut ctx = TickContext {
                net: &mut f.net,
                config: &config,
                outbox: &mut outbox,
                brakes: &mut brakes,
            };
            update(&mut t, &mut ctx).expect("no violation");
        }
        assert_eq!(f.net.signal_state(f.signals[0]).aspect, Aspect::Restricting);

        ReservationManager::new(&mut f.net).clear_occupied(f.sections[2], TrainId(9));
        let mut ctx = TickContext {
            net: &mut f.net,
            config: &config,
            outbox: &mut outbox,
            brakes: &mut brakes,
        };
        update(&mut t, &mut ctx).expect("no violation");
        let state = f.net.signal_state(f.signals[0]);
        assert_eq!(state.aspect, Aspect::Approach);
        assert_eq!(state.governed.as_slice(), &f.sections[1..=2]);
        assert_eq!(state.next_signal, Some(f.signals[1]));
    }
}
