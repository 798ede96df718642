//! Signal clearing and aspect propagation.

use smallvec::SmallVec;
use tracing::debug;
use trackward_core::{SectionId, SignalId, TrainId};
use trackward_network::{Aspect, TrackNetwork, TrackObject};
use trackward_route::Route;

use crate::reservation::ReservationManager;

/// Result of asking a signal to clear for a train.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearOutcome {
    /// The whole governed run is reserved and the signal shows a proceed
    /// aspect.
    Cleared,
    /// The run is reserved but the host holds the signal at stop.
    Held,
    /// Only part of the run could be reserved; the signal shows
    /// restricting.
    Partial,
    /// Nothing beyond the signal could be reserved; the signal stays at
    /// stop.
    Blocked,
}

/// A signal found along a route.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteSignal {
    /// The signal.
    pub signal: SignalId,
    /// Route index of its section.
    pub index: usize,
    /// Offset within that section.
    pub offset_m: f64,
}

/// Signals facing the travel direction of element `index`, nearest first.
pub fn signals_in(net: &TrackNetwork, route: &Route, index: usize) -> SmallVec<[RouteSignal; 2]> {
    let Some(e) = route.get(index) else {
        return SmallVec::new();
    };
    net.section(e.section)
        .items(e.direction)
        .iter()
        .filter_map(|item| match item.object {
            TrackObject::Signal(signal) => Some(RouteSignal {
                signal,
                index,
                offset_m: item.offset_m,
            }),
            TrackObject::SpeedPost(_) => None,
        })
        .collect()
}

/// First signal at or beyond `(from_index, offset_m)` on `route`.
pub fn next_signal(
    net: &TrackNetwork,
    route: &Route,
    from_index: usize,
    offset_m: f64,
) -> Option<RouteSignal> {
    (from_index..route.len()).find_map(|i| {
        signals_in(net, route, i)
            .into_iter()
            .find(|s| i > from_index || s.offset_m >= offset_m)
    })
}

/// Ask `signal`, standing on element `index` of `route`, to clear for
/// `train`.
///
/// The governed run starts after the signal's section and ends with the
/// section holding the next signal facing the same way, or at the end of
/// the route. Returns the outcome and the last route index held.
pub fn request_clear(
    net: &mut TrackNetwork,
    signal: SignalId,
    route: &Route,
    index: usize,
    train: TrainId,
) -> (ClearOutcome, usize) {
    let next = next_signal(net, route, index + 1, 0.0);
    let end = next.map(|s| s.index).unwrap_or(route.len().saturating_sub(1));
    if end <= index {
        // Nothing beyond the signal: the route ends at it.
        return finish(net, signal, train, SmallVec::new(), None, true, index);
    }

    let mut rm = ReservationManager::new(net);
    let outcome = rm.reserve_route(route, index + 1, end, train);
    let held_to = outcome.last_reserved.unwrap_or(index);
    let governed: SmallVec<[SectionId; 4]> = route.elements()[index + 1..=held_to]
        .iter()
        .map(|e| e.section)
        .collect();
    if governed.is_empty() {
        let state = net.signal_state_mut(signal);
        if state.enabled_for == Some(train) {
            state.reset();
        }
        debug!(%train, %signal, "signal blocked");
        return (ClearOutcome::Blocked, index);
    }
    let complete = outcome.conflict.is_none();
    finish(
        net,
        signal,
        train,
        governed,
        next.filter(|_| complete).map(|s| s.signal),
        complete,
        held_to,
    )
}

fn finish(
    net: &mut TrackNetwork,
    signal: SignalId,
    train: TrainId,
    governed: SmallVec<[SectionId; 4]>,
    next: Option<SignalId>,
    complete: bool,
    held_to: usize,
) -> (ClearOutcome, usize) {
    let next_aspect = next.map(|n| net.signal_state(n).aspect);
    let state = net.signal_state_mut(signal);
    state.enabled_for = Some(train);
    state.governed = governed;
    state.next_signal = next;
    let outcome = if state.is_held() {
        state.aspect = Aspect::Stop;
        ClearOutcome::Held
    } else if complete {
        state.aspect = match next_aspect {
            Some(a) if a != Aspect::Stop => Aspect::Clear,
            _ => Aspect::Approach,
        };
        ClearOutcome::Cleared
    } else {
        state.aspect = Aspect::Restricting;
        ClearOutcome::Partial
    };
    debug!(%train, %signal, aspect = ?state.aspect, "signal request");
    (outcome, held_to)
}

/// Re-derive proceed aspects from the next signal, and drop held signals
/// to stop. Signals are visited in id order.
pub fn refresh_aspects(net: &mut TrackNetwork) {
    for id in 0..net.signal_count() {
        let signal = SignalId(id as u32);
        let state = net.signal_state(signal);
        if state.enabled_for.is_none() {
            continue;
        }
        let aspect = if state.is_held() {
            Aspect::Stop
        } else if matches!(state.aspect, Aspect::Approach | Aspect::Clear) {
            match state.next_signal.map(|n| net.signal_state(n).aspect) {
                Some(a) if a != Aspect::Stop => Aspect::Clear,
                _ => Aspect::Approach,
            }
        } else {
            state.aspect
        };
        net.signal_state_mut(signal).aspect = aspect;
    }
}
