//! Dynamic per-section state.
//!
//! This is the only state trains share. Every field is private; the
//! mutators keep the single-holder reservation and ordered-claim
//! invariants.

use indexmap::IndexMap;
use smallvec::SmallVec;
use trackward_core::{Direction, SectionId, TrainId};

/// An exclusive hold on a section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Reservation {
    /// The holder.
    pub train: TrainId,
    /// Direction the holder intends to traverse the section.
    pub direction: Direction,
}

/// A train the trap owner must let through before entering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeadlockTrap {
    /// The opposing train.
    pub awaited_train: TrainId,
    /// Far end of the contested run, in the trapped train's route order.
    pub awaited_section: SectionId,
}

/// Occupancy, reservation, claims, traps and switch alignment of one section.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SectionState {
    occupancy: SmallVec<[(TrainId, Direction); 2]>,
    reservation: Option<Reservation>,
    claims: SmallVec<[TrainId; 2]>,
    traps: IndexMap<TrainId, SmallVec<[DeadlockTrap; 2]>>,
    alignment: u8,
}

impl SectionState {
    /// Rebuild a state from its parts, as stored in a snapshot.
    pub fn from_parts(
        occupancy: impl IntoIterator<Item = (TrainId, Direction)>,
        reservation: Option<Reservation>,
        claims: impl IntoIterator<Item = TrainId>,
        traps: impl IntoIterator<Item = (TrainId, DeadlockTrap)>,
        alignment: u8,
    ) -> Self {
        let mut state = Self {
            occupancy: occupancy.into_iter().collect(),
            reservation,
            claims: SmallVec::new(),
            traps: IndexMap::new(),
            alignment,
        };
        for c in claims {
            state.add_claim(c);
        }
        for (train, trap) in traps {
            state.add_trap(train, trap);
        }
        state
    }

    // ── Occupancy ──────────────────────────────────────────────────

    /// Trains physically on the section, in arrival order.
    pub fn occupancy(&self) -> &[(TrainId, Direction)] {
        &self.occupancy
    }

    /// Whether any train is on the section.
    #[inline]
    pub fn is_occupied(&self) -> bool {
        !self.occupancy.is_empty()
    }

    /// Whether `train` is on the section.
    pub fn is_occupied_by(&self, train: TrainId) -> bool {
        self.occupancy.iter().any(|(t, _)| *t == train)
    }

    /// The first train other than `train` on the section.
    pub fn occupied_by_other(&self, train: TrainId) -> Option<TrainId> {
        self.occupancy
            .iter()
            .map(|(t, _)| *t)
            .find(|t| *t != train)
    }

    /// Mark `train` as present. Updates the direction if already present.
    pub fn set_occupied(&mut self, train: TrainId, direction: Direction) {
        match self.occupancy.iter_mut().find(|(t, _)| *t == train) {
            Some(entry) => entry.1 = direction,
            None => self.occupancy.push((train, direction)),
        }
    }

    /// Remove `train` from the occupancy set. Returns whether it was present.
    pub fn clear_occupied(&mut self, train: TrainId) -> bool {
        let before = self.occupancy.len();
        self.occupancy.retain(|(t, _)| *t != train);
        self.occupancy.len() != before
    }

    // ── Reservation ────────────────────────────────────────────────

    /// The current reservation, if any.
    #[inline]
    pub fn reservation(&self) -> Option<Reservation> {
        self.reservation
    }

    /// The holder of the reservation, if any.
    #[inline]
    pub fn reserved_by(&self) -> Option<TrainId> {
        self.reservation.map(|r| r.train)
    }

    /// Whether the section is reserved by someone other than `train`.
    pub fn is_reserved_by_other(&self, train: TrainId) -> bool {
        matches!(self.reservation, Some(r) if r.train != train)
    }

    /// Install a reservation, replacing any previous one.
    ///
    /// Callers check availability first; this does not arbitrate.
    pub fn set_reservation(&mut self, reservation: Reservation) {
        self.reservation = Some(reservation);
    }

    /// Drop the reservation if `train` holds it. Returns whether it did.
    pub fn release(&mut self, train: TrainId) -> bool {
        if self.reserved_by() == Some(train) {
            self.reservation = None;
            true
        } else {
            false
        }
    }

    // ── Claims ─────────────────────────────────────────────────────

    /// Claimants in claim order.
    pub fn claims(&self) -> &[TrainId] {
        &self.claims
    }

    /// The earliest claimant.
    #[inline]
    pub fn head_claim(&self) -> Option<TrainId> {
        self.claims.first().copied()
    }

    /// Whether a train other than `train` heads the claim list.
    pub fn is_claimed_by_other(&self, train: TrainId) -> bool {
        matches!(self.head_claim(), Some(t) if t != train)
    }

    /// Append a claim. A train appears at most once.
    pub fn add_claim(&mut self, train: TrainId) {
        if !self.claims.contains(&train) {
            self.claims.push(train);
        }
    }

    /// Withdraw `train`'s claim, keeping the order of the others.
    pub fn remove_claim(&mut self, train: TrainId) {
        self.claims.retain(|t| *t != train);
    }

    // ── Deadlock traps ─────────────────────────────────────────────

    /// All traps on this section, by trapped train.
    pub fn traps(&self) -> &IndexMap<TrainId, SmallVec<[DeadlockTrap; 2]>> {
        &self.traps
    }

    /// Traps recorded for `train`.
    pub fn traps_for(&self, train: TrainId) -> &[DeadlockTrap] {
        self.traps.get(&train).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Whether any trap is recorded for `train`.
    pub fn is_trapped(&self, train: TrainId) -> bool {
        self.traps.get(&train).is_some_and(|v| !v.is_empty())
    }

    /// Record a trap for `train`. Duplicates are ignored.
    pub fn add_trap(&mut self, train: TrainId, trap: DeadlockTrap) {
        let entry = self.traps.entry(train).or_default();
        if !entry.contains(&trap) {
            entry.push(trap);
        }
    }

    /// Drop every trap for `train` and every trap awaiting `train`.
    pub fn remove_traps_involving(&mut self, train: TrainId) {
        self.traps.shift_remove(&train);
        for traps in self.traps.values_mut() {
            traps.retain(|t| t.awaited_train != train);
        }
        self.traps.retain(|_, v| !v.is_empty());
    }

    /// Drop all traps.
    pub fn clear_traps(&mut self) {
        self.traps.clear();
    }

    // ── Alignment ──────────────────────────────────────────────────

    /// Selected switch leg. Always 0 on plain sections.
    #[inline]
    pub fn alignment(&self) -> u8 {
        self.alignment
    }

    /// Select a leg. Range checks are the network's job.
    pub fn set_alignment(&mut self, leg: u8) {
        self.alignment = leg;
    }

    // ── Whole-train ────────────────────────────────────────────────

    /// Remove every trace of `train` from this section.
    pub fn remove_train(&mut self, train: TrainId) {
        self.clear_occupied(train);
        self.release(train);
        self.remove_claim(train);
        self.remove_traps_involving(train);
    }

    /// No occupancy, reservation, claim or trap.
    pub fn is_idle(&self) -> bool {
        self.occupancy.is_empty()
            && self.reservation.is_none()
            && self.claims.is_empty()
            && self.traps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: TrainId = TrainId(1);
    const B: TrainId = TrainId(2);

    #[test]
    fn occupancy_is_a_set() {
        let mut s = SectionState::default();
        s.set_occupied(A, Direction::Ahead);
        s.set_occupied(A, Direction::Reverse);
        assert_eq!(s.occupancy(), &[(A, Direction::Reverse)]);
        assert!(s.clear_occupied(A));
        assert!(!s.clear_occupied(A));
    }

    #[test]
    fn release_only_by_holder() {
        let mut s = SectionState::default();
        s.set_reservation(Reservation {
            train: A,
            direction: Direction::Ahead,
        });
        assert!(s.is_reserved_by_other(B));
        assert!(!s.release(B));
        assert!(s.release(A));
        assert_eq!(s.reserved_by(), None);
    }

    #[test]
    fn claims_keep_first_come_order() {
        let mut s = SectionState::default();
        s.add_claim(B);
        s.add_claim(A);
        s.add_claim(B);
        assert_eq!(s.claims(), &[B, A]);
        assert!(s.is_claimed_by_other(A));
        s.remove_claim(B);
        assert_eq!(s.head_claim(), Some(A));
    }

    #[test]
    fn removing_train_drops_traps_both_ways() {
        let mut s = SectionState::default();
        let trap_on_a = DeadlockTrap {
            awaited_train: B,
            awaited_section: SectionId(5),
        };
        let trap_on_b = DeadlockTrap {
            awaited_train: A,
            awaited_section: SectionId(1),
        };
        s.add_trap(A, trap_on_a);
        s.add_trap(A, trap_on_a);
        s.add_trap(B, trap_on_b);
        assert_eq!(s.traps_for(A).len(), 1);
        s.remove_train(A);
        assert!(s.traps().is_empty());
        assert!(s.is_idle());
    }
}
