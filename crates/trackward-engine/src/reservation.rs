//! Section reservation protocol.
//!
//! [`ReservationManager`] is a short-lived view over the network's dynamic
//! section state. It is the only place reservations, claims and switch
//! alignment change on behalf of a train, so the at-most-one-holder rule
//! is enforced here and nowhere else.
//!
//! # Availability order
//!
//! A section requested by train `T` is checked in this order:
//!
//! 1. reserved by another train: [`Availability::ReservedBy`]
//! 2. occupied by another train: [`Availability::OccupiedBy`]
//! 3. switch set against the route while occupied: [`Availability::Misaligned`]
//! 4. another train heads the claim list: [`Availability::ClaimedBy`]
//! 5. otherwise [`Availability::Available`]

use std::fmt;

use tracing::debug;
use trackward_core::{Direction, SectionId, TrainId};
use trackward_network::{Reservation, TrackNetwork};
use trackward_route::{Route, RouteElement};

/// Whether a train may reserve a section right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Availability {
    /// Free for this train.
    Available,
    /// Reserved by another train.
    ReservedBy(TrainId),
    /// Occupied by another train.
    OccupiedBy(TrainId),
    /// Another train claimed it first.
    ClaimedBy(TrainId),
    /// The switch is set against the route and cannot be thrown.
    Misaligned,
}

impl Availability {
    /// Whether the section can be reserved.
    #[inline]
    pub fn is_available(self) -> bool {
        self == Self::Available
    }

    /// The train standing in the way, if any.
    pub fn holder(self) -> Option<TrainId> {
        match self {
            Self::ReservedBy(t) | Self::OccupiedBy(t) | Self::ClaimedBy(t) => Some(t),
            Self::Available | Self::Misaligned => None,
        }
    }
}

/// A refused reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReserveConflict {
    /// The section that could not be reserved.
    pub section: SectionId,
    /// Why.
    pub availability: Availability,
}

impl fmt::Display for ReserveConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.availability {
            Availability::ReservedBy(t) => write!(f, "section {} reserved by train {t}", self.section),
            Availability::OccupiedBy(t) => write!(f, "section {} occupied by train {t}", self.section),
            Availability::ClaimedBy(t) => write!(f, "section {} claimed by train {t}", self.section),
            Availability::Misaligned => write!(f, "switch {} is set against the route", self.section),
            Availability::Available => write!(f, "section {} is available", self.section),
        }
    }
}

impl std::error::Error for ReserveConflict {}

/// Outcome of [`ReservationManager::reserve_route`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteReservation {
    /// Index of the last element held after the call, if any in the range.
    pub last_reserved: Option<usize>,
    /// The first refusal, if the range was not completed.
    pub conflict: Option<ReserveConflict>,
}

/// Another train found ahead on a route.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainAhead {
    /// The train.
    pub train: TrainId,
    /// Distance from the start position to the entry of its section.
    pub distance_m: f64,
}

/// Mutable view over the network used to reserve and release sections.
pub struct ReservationManager<'n> {
    net: &'n mut TrackNetwork,
}

impl<'n> ReservationManager<'n> {
    /// Wrap `net`.
    pub fn new(net: &'n mut TrackNetwork) -> Self {
        Self { net }
    }

    /// The underlying network.
    pub fn network(&self) -> &TrackNetwork {
        self.net
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Availability of `section` for `train` needing switch `leg`.
    pub fn section_availability(
        &self,
        section: SectionId,
        leg: Option<u8>,
        train: TrainId,
    ) -> Availability {
        let state = self.net.state(section);
        if let Some(r) = state.reservation() {
            if r.train != train {
                return Availability::ReservedBy(r.train);
            }
        }
        if let Some(other) = state.occupied_by_other(train) {
            return Availability::OccupiedBy(other);
        }
        if state.is_occupied() && !self.net.is_aligned(section, leg) {
            return Availability::Misaligned;
        }
        if let Some(head) = state.head_claim() {
            if head != train {
                return Availability::ClaimedBy(head);
            }
        }
        Availability::Available
    }

    /// Availability of element `index` of `route` for `train`.
    pub fn availability(&self, route: &Route, index: usize, train: TrainId) -> Availability {
        match route.get(index) {
            Some(e) => self.section_availability(e.section, e.leg, train),
            None => Availability::Misaligned,
        }
    }

    /// Boolean form of [`availability`](Self::availability).
    pub fn is_available(&self, route: &Route, index: usize, train: TrainId) -> bool {
        self.availability(route, index, train).is_available()
    }

    /// First train found on `route` from `(from_index, offset_m)` within
    /// `max_m`. Sections held by `train` itself are skipped.
    pub fn test_train_ahead(
        &self,
        route: &Route,
        from_index: usize,
        offset_m: f64,
        train: TrainId,
        max_m: f64,
    ) -> Option<TrainAhead> {
        let mut covered = -offset_m;
        for e in route.elements().iter().skip(from_index) {
            if covered > max_m {
                return None;
            }
            let state = self.net.state(e.section);
            let other = state
                .occupied_by_other(train)
                .or_else(|| state.reserved_by().filter(|&t| t != train));
            if let Some(t) = other {
                return Some(TrainAhead {
                    train: t,
                    distance_m: covered.max(0.0),
                });
            }
            covered += self.net.length_m(e.section);
        }
        None
    }

    // ── Reservation ────────────────────────────────────────────────

    /// Reserve `section` for `train` travelling `direction`, aligning the
    /// switch to `leg` when given.
    pub fn reserve(
        &mut self,
        section: SectionId,
        leg: Option<u8>,
        train: TrainId,
        direction: Direction,
    ) -> Result<(), ReserveConflict> {
        let availability = self.section_availability(section, leg, train);
        if !availability.is_available() {
            return Err(ReserveConflict {
                section,
                availability,
            });
        }
        let state = self.net.state_mut(section);
        state.set_reservation(Reservation { train, direction });
        state.remove_claim(train);
        if let Some(leg) = leg {
            if state.alignment() != leg && !state.is_occupied() {
                state.set_alignment(leg);
                debug!(%train, %section, leg, "switch aligned");
            }
        }
        Ok(())
    }

    /// Reserve one route element.
    pub fn reserve_element(
        &mut self,
        element: &RouteElement,
        train: TrainId,
    ) -> Result<(), ReserveConflict> {
        self.reserve(element.section, element.leg, train, element.direction)
    }

    /// Reserve elements `from..=to` in order, stopping at the first refusal.
    ///
    /// A refusal never leaves a switch as the last element held: trailing
    /// switches are released again so authority does not end inside a
    /// junction.
    pub fn reserve_route(
        &mut self,
        route: &Route,
        from: usize,
        to: usize,
        train: TrainId,
    ) -> RouteReservation {
        let mut last = None;
        let to = to.min(route.len().saturating_sub(1));
        for (i, e) in route.elements().iter().enumerate().take(to + 1).skip(from) {
            match self.reserve_element(e, train) {
                Ok(()) => last = Some(i),
                Err(conflict) => {
                    debug!(%train, %conflict, "route reservation stopped");
                    let floor = from.saturating_sub(1);
                    let last = last.map(|l| self.roll_back_switches(route, l, floor, train));
                    return RouteReservation {
                        last_reserved: last.filter(|&l| l >= from),
                        conflict: Some(conflict),
                    };
                }
            }
        }
        RouteReservation {
            last_reserved: last,
            conflict: None,
        }
    }

    /// Release trailing unoccupied switches from `last` back towards
    /// `floor` (exclusive). Returns the new last held index.
    pub fn roll_back_switches(
        &mut self,
        route: &Route,
        last: usize,
        floor: usize,
        train: TrainId,
    ) -> usize {
        let mut last = last;
        while last > floor {
            let Some(e) = route.get(last) else { break };
            let state = self.net.state(e.section);
            if !self.net.section(e.section).is_switchable() || state.is_occupied() {
                break;
            }
            self.net.state_mut(e.section).release(train);
            debug!(%train, section = %e.section, "trailing switch released");
            last -= 1;
        }
        last
    }

    /// Release elements from `index` to the end of `route`, farthest first.
    /// Occupied sections are kept.
    pub fn release_from(&mut self, route: &Route, index: usize, train: TrainId) {
        for e in route.elements().iter().skip(index).rev() {
            let state = self.net.state_mut(e.section);
            if !state.is_occupied_by(train) && state.release(train) {
                debug!(%train, section = %e.section, "released");
            }
        }
    }

    /// Append an advisory claim.
    pub fn pre_reserve(&mut self, section: SectionId, train: TrainId) {
        let state = self.net.state_mut(section);
        if !state.claims().contains(&train) {
            debug!(%train, %section, "section claimed");
        }
        state.add_claim(train);
    }

    // ── Occupancy ──────────────────────────────────────────────────

    /// Mark `section` occupied by `train`. An unreserved section is
    /// reserved for the occupant.
    pub fn set_occupied(&mut self, section: SectionId, train: TrainId, direction: Direction) {
        let state = self.net.state_mut(section);
        state.set_occupied(train, direction);
        if state.reservation().is_none() {
            state.set_reservation(Reservation { train, direction });
        }
        state.remove_claim(train);
    }

    /// Clear `train` from `section` and drop its reservation there.
    pub fn clear_occupied(&mut self, section: SectionId, train: TrainId) {
        let state = self.net.state_mut(section);
        state.clear_occupied(train);
        state.release(train);
    }

    // ── Teardown ───────────────────────────────────────────────────

    /// Release everything `train` holds except the sections it occupies,
    /// and reset the signals cleared or permitted for it.
    pub fn break_down(&mut self, train: TrainId, routes: &[&Route]) {
        for route in routes {
            self.release_from(route, 0, train);
        }
        for id in 0..self.net.section_count() {
            let section = SectionId(id as u32);
            let state = self.net.state_mut(section);
            state.remove_claim(train);
            if !state.is_occupied_by(train) {
                state.release(train);
            }
        }
        self.reset_signals_for(train);
    }

    /// Remove every trace of `train` from the network.
    pub fn remove_train(&mut self, train: TrainId) {
        for id in 0..self.net.section_count() {
            self.net.state_mut(SectionId(id as u32)).remove_train(train);
        }
        self.reset_signals_for(train);
    }

    fn reset_signals_for(&mut self, train: TrainId) {
        for id in 0..self.net.signal_count() {
            let state = self.net.signal_state_mut(trackward_core::SignalId(id as u32));
            if state.enabled_for == Some(train) {
                state.reset();
            } else if state.permission_for == Some(train) {
                state.permission_for = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackward_test_utils::{passing_loop, route, straight_line};

    const A: TrainId = TrainId(1);
    const B: TrainId = TrainId(2);

    #[test]
    fn reserve_then_conflict() {
        let (mut net, ids) = straight_line(&[100.0, 100.0, 100.0]);
        let mut rm = ReservationManager::new(&mut net);
        assert_eq!(rm.reserve(ids[1], None, A, Direction::Ahead), Ok(()));
        // Re-reserving by the holder is fine.
        assert_eq!(rm.reserve(ids[1], None, A, Direction::Ahead), Ok(()));
        match rm.reserve(ids[1], None, B, Direction::Reverse) {
            Err(ReserveConflict {
                availability: Availability::ReservedBy(t),
                ..
            }) => assert_eq!(t, A),
            other => panic!("expected ReservedBy, got {other:?}"),
        }
    }

    #[test]
    fn head_claim_wins_when_section_frees() {
        let (mut net, ids) = straight_line(&[100.0, 100.0]);
        let mut rm = ReservationManager::new(&mut net);
        rm.pre_reserve(ids[1], B);
        rm.pre_reserve(ids[1], A);
        assert_eq!(
            rm.section_availability(ids[1], None, A),
            Availability::ClaimedBy(B)
        );
        assert!(rm.reserve(ids[1], None, B, Direction::Ahead).is_ok());
        // B's claim is withdrawn once it holds the section.
        assert_eq!(net.state(ids[1]).claims(), &[A]);
    }

    #[test]
    fn occupied_by_other_is_reported() {
        let (mut net, ids) = straight_line(&[100.0, 100.0]);
        let mut rm = ReservationManager::new(&mut net);
        rm.set_occupied(ids[0], B, Direction::Ahead);
        rm.net.state_mut(ids[0]).release(B);
        assert_eq!(
            rm.section_availability(ids[0], None, A),
            Availability::OccupiedBy(B)
        );
    }

    #[test]
    fn reserving_a_switch_aligns_it() {
        let mut f = passing_loop();
        let r = route(&f.net, &[f.w0, f.j1, f.l1, f.j2, f.e0], Direction::Ahead);
        let leg = r.get(1).and_then(|e| e.leg);
        assert_eq!(leg, Some(1));
        let mut rm = ReservationManager::new(&mut f.net);
        let out = rm.reserve_route(&r, 0, 2, A);
        assert_eq!(out.last_reserved, Some(2));
        assert_eq!(f.net.state(f.j1).alignment(), 1);
    }

    #[test]
    fn failed_route_never_ends_on_a_switch() {
        let mut f = passing_loop();
        let r = route(&f.net, &[f.w0, f.j1, f.m1, f.j2, f.e0], Direction::Ahead);
        {
            let mut rm = ReservationManager::new(&mut f.net);
            rm.set_occupied(f.m1, B, Direction::Reverse);
        }
        let mut rm = ReservationManager::new(&mut f.net);
        let out = rm.reserve_route(&r, 0, 4, A);
        assert_eq!(out.last_reserved, Some(0));
        assert_eq!(
            out.conflict.map(|c| c.availability),
            Some(Availability::ReservedBy(B))
        );
        assert_eq!(f.net.state(f.j1).reserved_by(), None);
    }

    #[test]
    fn release_skips_occupied_sections() {
        let (mut net, ids) = straight_line(&[100.0, 100.0, 100.0]);
        let r = route(&net, &ids, Direction::Ahead);
        let mut rm = ReservationManager::new(&mut net);
        rm.set_occupied(ids[0], A, Direction::Ahead);
        rm.reserve_route(&r, 1, 2, A);
        rm.release_from(&r, 0, A);
        assert_eq!(net.state(ids[0]).reserved_by(), Some(A));
        assert_eq!(net.state(ids[1]).reserved_by(), None);
        assert_eq!(net.state(ids[2]).reserved_by(), None);
    }

    #[test]
    fn train_ahead_distance() {
        let (mut net, ids) = straight_line(&[100.0, 100.0, 100.0]);
        let r = route(&net, &ids, Direction::Ahead);
        let mut rm = ReservationManager::new(&mut net);
        rm.set_occupied(ids[2], B, Direction::Reverse);
        let ahead = rm.test_train_ahead(&r, 0, 40.0, A, 1000.0);
        assert_eq!(
            ahead,
            Some(TrainAhead {
                train: B,
                distance_m: 160.0
            })
        );
        assert_eq!(rm.test_train_ahead(&r, 0, 40.0, A, 50.0), None);
    }

    #[test]
    fn remove_train_clears_everything() {
        let (mut net, ids) = straight_line(&[100.0, 100.0]);
        let mut rm = ReservationManager::new(&mut net);
        rm.set_occupied(ids[0], A, Direction::Ahead);
        rm.pre_reserve(ids[1], A);
        rm.remove_train(A);
        assert!(net.state(ids[0]).is_idle());
        assert!(net.state(ids[1]).is_idle());
    }
}
