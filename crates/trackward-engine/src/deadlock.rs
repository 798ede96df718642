//! Deadlock traps and their resolution.
//!
//! Two automatic trains whose remaining routes cover the same stretch in
//! opposite directions will meet head on unless one of them gives way.
//! Each such stretch is recorded as a trap on the section where either
//! train would enter it. A train about to enter a trapped section first
//! looks for an alternative path around the stretch, then for a clear
//! run through it, and otherwise waits.

use indexmap::IndexMap;
use tracing::{debug, info, warn};
use trackward_core::{SectionId, TrainId};
use trackward_network::{DeadlockTrap, TrackNetwork};
use trackward_route::{Route, RouteElement, TrainPath};

use crate::outbox::Intent;
use crate::reservation::ReservationManager;
use crate::train::{TickContext, Train};

/// A stretch two routes traverse in opposite directions.
///
/// Indices are inclusive and refer to the slices passed to
/// [`find_runs`]. The first route enters at `a_start` and leaves at
/// `a_end`; the second enters at `b_start` and leaves at `b_end`, so
/// `a[a_start]` and `b[b_end]` are the same section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContestedRun {
    /// Entry index on the first route.
    pub a_start: usize,
    /// Exit index on the first route.
    pub a_end: usize,
    /// Entry index on the second route.
    pub b_start: usize,
    /// Exit index on the second route.
    pub b_end: usize,
}

fn opposite(x: &RouteElement, y: &RouteElement) -> bool {
    x.section == y.section && x.direction != y.direction
}

/// Maximal runs of sections `a` and `b` share in opposite directions.
pub fn find_runs(a: &[RouteElement], b: &[RouteElement]) -> Vec<ContestedRun> {
    let mut runs = Vec::new();
    for i in 0..a.len() {
        for j in 0..b.len() {
            if !opposite(&a[i], &b[j]) {
                continue;
            }
            // Not the start of a run if the previous element also matches.
            if i > 0 && j + 1 < b.len() && opposite(&a[i - 1], &b[j + 1]) {
                continue;
            }
            let mut k = 0;
            while i + k + 1 < a.len() && j > k && opposite(&a[i + k + 1], &b[j - k - 1]) {
                k += 1;
            }
            runs.push(ContestedRun {
                a_start: i,
                a_end: i + k,
                b_start: j - k,
                b_end: j,
            });
        }
    }
    runs
}

/// Whether a run on `a` can deadlock two trains.
///
/// Runs made only of switches are crossing points, and a run that does
/// not start and end on a switch has no way round it.
pub fn is_trap(net: &TrackNetwork, a: &[RouteElement], run: &ContestedRun) -> bool {
    let sections = &a[run.a_start..=run.a_end];
    let switchable = |e: &RouteElement| net.section(e.section).is_switchable();
    if sections.iter().all(switchable) {
        return false;
    }
    match (sections.first(), sections.last()) {
        (Some(first), Some(last)) => switchable(first) && switchable(last),
        _ => false,
    }
}

fn remaining(train: &Train) -> Option<Vec<RouteElement>> {
    let auto = train.control.auto()?;
    let from = (train.front.route_index + 1).min(auto.route.len());
    Some(
        auto.route.elements()[from..]
            .iter()
            .filter(|e| !train.occupied.contains(&e.section))
            .copied()
            .collect(),
    )
}

/// Clear every trap and recompute them for each pair of automatic
/// trains. Returns the number of traps recorded.
pub(crate) fn refresh_traps(net: &mut TrackNetwork, trains: &IndexMap<TrainId, Train>) -> usize {
    for id in 0..net.section_count() {
        net.state_mut(SectionId(id as u32)).clear_traps();
    }
    let routes: Vec<(TrainId, Vec<RouteElement>)> = trains
        .values()
        .filter_map(|t| remaining(t).map(|r| (t.id, r)))
        .collect();

    let mut count = 0;
    for (i, (a_id, a)) in routes.iter().enumerate() {
        for (b_id, b) in routes.iter().skip(i + 1) {
            for run in find_runs(a, b) {
                if !is_trap(net, a, &run) {
                    continue;
                }
                let (a_entry, a_far) = (a[run.a_start].section, a[run.a_end].section);
                let (b_entry, b_far) = (b[run.b_start].section, b[run.b_end].section);
                net.state_mut(a_entry).add_trap(
                    *a_id,
                    DeadlockTrap {
                        awaited_train: *b_id,
                        awaited_section: a_far,
                    },
                );
                net.state_mut(b_entry).add_trap(
                    *b_id,
                    DeadlockTrap {
                        awaited_train: *a_id,
                        awaited_section: b_far,
                    },
                );
                debug!(train = %a_id, other = %b_id, entry = %a_entry, "deadlock trap");
                count += 2;
            }
        }
    }
    count
}

// ── Resolution ─────────────────────────────────────────────────────

/// What a trapped train should do about the stretch ahead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TrapOutcome {
    /// The route was spliced onto an alternative; reserve on.
    Rerouted,
    /// The whole stretch up to route index `end` is free; take it at once.
    EnterRun {
        /// Last route index of the stretch.
        end: usize,
    },
    /// Give way for now.
    Wait,
}

/// The trapped train's side of a resolution.
pub(crate) struct TrapSite<'a> {
    pub train: TrainId,
    pub route: &'a mut Route,
    pub path: Option<&'a mut TrainPath>,
    pub subpath: usize,
    pub front_index: usize,
    /// Route index of the trapped section.
    pub next: usize,
    pub waited_s: &'a mut f64,
}

pub(crate) fn resolve(
    ctx: &mut TickContext<'_>,
    site: TrapSite<'_>,
    trap: DeadlockTrap,
) -> TrapOutcome {
    let TrapSite {
        train,
        route,
        path,
        subpath,
        front_index,
        next,
        waited_s,
    } = site;
    let end = route
        .index_of(trap.awaited_section, next)
        .filter(|&e| e >= next)
        .unwrap_or(next);
    let contested: Vec<SectionId> = route.elements()[next..=end]
        .iter()
        .map(|e| e.section)
        .collect();

    if let Some(path) = path {
        if reroute(ctx, train, route, path, subpath, front_index, next, &contested) {
            return TrapOutcome::Rerouted;
        }
    }

    let rm = ReservationManager::new(ctx.net);
    if (next..=end).all(|k| rm.is_available(route, k, train)) {
        return TrapOutcome::EnterRun { end };
    }

    *waited_s += ctx.config.tick_seconds;
    if *waited_s >= ctx.config.deadlock_wait_s {
        if let Some(e) = route.get(next) {
            ReservationManager::new(ctx.net).pre_reserve(e.section, train);
        }
    }
    debug!(%train, awaited = %trap.awaited_train, "giving way");
    TrapOutcome::Wait
}

#[allow(clippy::too_many_arguments)]
fn reroute(
    ctx: &mut TickContext<'_>,
    train: TrainId,
    route: &mut Route,
    path: &mut TrainPath,
    subpath: usize,
    front_index: usize,
    next: usize,
    contested: &[SectionId],
) -> bool {
    let chosen = {
        let rm = ReservationManager::new(ctx.net);
        path.candidates(subpath, contested).find_map(|alt| {
            let start = route.index_of(alt.start()?, next)?;
            if start <= front_index {
                return None;
            }
            let end = route.index_of(alt.end()?, start).filter(|&e| e >= start)?;
            let avoids = contested.iter().any(|c| !alt.route.contains(*c));
            let free = alt
                .route
                .iter()
                .all(|e| rm.section_availability(e.section, e.leg, train).is_available());
            (avoids && free).then(|| (start, end, alt.id, alt.route.clone()))
        })
    };
    let Some((start, end, alt_id, detour)) = chosen else {
        return false;
    };

    let removed = match route.splice(ctx.net, start, end, &detour) {
        Ok(removed) => removed,
        Err(e) => {
            warn!(%train, alternative = %alt_id, error = %e, "alternative does not fit route");
            return false;
        }
    };
    if let Ok(sub) = path.subpath_mut(subpath) {
        let span = detour.first().zip(detour.last()).and_then(|(f, l)| {
            let s = sub.index_of(f.section, start)?;
            Some((s, sub.index_of(l.section, s)?))
        });
        if let Some((s, e)) = span {
            if let Err(err) = sub.splice(ctx.net, s, e, &detour) {
                warn!(%train, error = %err, "path not updated after reroute");
            }
        }
    }

    for e in removed.iter().rev() {
        let state = ctx.net.state_mut(e.section);
        if !state.is_occupied_by(train) {
            state.release(train);
        }
    }
    relocate_stops(ctx.net, train, path, subpath, &removed, &detour);
    ctx.outbox.push(Intent::RefreshDeadlocks);
    info!(%train, alternative = %alt_id, "rerouted around opposing train");
    true
}

/// Move stops that fell off the route to another platform of the same
/// station on the detour; drop them when there is none.
fn relocate_stops(
    net: &TrackNetwork,
    train: TrainId,
    path: &mut TrainPath,
    subpath: usize,
    removed: &[RouteElement],
    detour: &Route,
) {
    path.stops_mut().retain_mut(|stop| {
        if stop.subpath != subpath || !removed.iter().any(|e| e.section == stop.section) {
            return true;
        }
        match net
            .station_platforms(stop.station)
            .find(|p| detour.contains(p.section))
        {
            Some(p) => {
                stop.platform = p.id;
                stop.section = p.section;
                true
            }
            None => {
                warn!(%train, station = %stop.station, "stop dropped after reroute");
                false
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackward_core::Direction;
    use trackward_test_utils::{passing_loop, route, straight_line};

    #[test]
    fn opposing_routes_share_one_run() {
        let f = passing_loop();
        let a = route(&f.net, &[f.j1, f.m1, f.j2, f.e0], Direction::Ahead);
        let b = route(&f.net, &[f.j2, f.m1, f.j1, f.w0], Direction::Reverse);
        let runs = find_runs(a.elements(), b.elements());
        assert_eq!(
            runs,
            vec![ContestedRun {
                a_start: 0,
                a_end: 2,
                b_start: 0,
                b_end: 2,
            }]
        );
        assert!(is_trap(&f.net, a.elements(), &runs[0]));
    }

    #[test]
    fn same_direction_is_not_contested() {
        let (net, ids) = straight_line(&[100.0, 100.0, 100.0]);
        let a = route(&net, &ids, Direction::Ahead);
        assert!(find_runs(a.elements(), a.elements()).is_empty());
    }

    #[test]
    fn plain_single_track_is_not_a_trap() {
        let (net, ids) = straight_line(&[100.0, 100.0, 100.0]);
        let a = route(&net, &ids[1..2], Direction::Ahead);
        let b = route(&net, &ids[1..2], Direction::Reverse);
        let runs = find_runs(a.elements(), b.elements());
        assert_eq!(runs.len(), 1);
        assert!(!is_trap(&net, a.elements(), &runs[0]));
    }

    #[test]
    fn switches_alone_are_not_a_trap() {
        let f = passing_loop();
        let a = route(&f.net, &[f.j1, f.l1, f.j2], Direction::Ahead);
        let b = route(&f.net, &[f.j2, f.m1, f.j1], Direction::Reverse);
        let runs = find_runs(a.elements(), b.elements());
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|r| !is_trap(&f.net, a.elements(), r)));
    }
}
