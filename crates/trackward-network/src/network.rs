//! The built track network.

use trackward_core::{Direction, PlatformId, SectionId, SignalId, SpeedPostId, StationId};

use crate::error::NetworkError;
use crate::platform::Platform;
use crate::section::{Pin, Section};
use crate::signal::{Signal, SignalHold, SignalState};
use crate::speedpost::SpeedPost;
use crate::state::SectionState;

/// Arena of sections, signals, speed posts and platforms, plus the dynamic
/// state of every section and signal.
///
/// Topology is immutable after [`NetworkBuilder::build`](crate::NetworkBuilder::build).
/// Lookups by id panic if the id was not issued by the builder that
/// produced this network, the same contract as slice indexing; use the
/// `get_*` forms for ids from untrusted input.
#[derive(Clone, Debug)]
pub struct TrackNetwork {
    pub(crate) sections: Vec<Section>,
    pub(crate) states: Vec<SectionState>,
    pub(crate) signals: Vec<Signal>,
    pub(crate) signal_states: Vec<SignalState>,
    pub(crate) speed_posts: Vec<SpeedPost>,
    pub(crate) platforms: Vec<Platform>,
}

impl TrackNetwork {
    // ── Sections ───────────────────────────────────────────────────

    /// Number of sections.
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// All sections in id order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// The section with id `id`.
    #[inline]
    pub fn section(&self, id: SectionId) -> &Section {
        &self.sections[id.index()]
    }

    /// The section with id `id`, or `None` if it does not exist.
    pub fn get_section(&self, id: SectionId) -> Option<&Section> {
        self.sections.get(id.index())
    }

    /// Whether `id` names a section of this network.
    #[inline]
    pub fn contains(&self, id: SectionId) -> bool {
        id.index() < self.sections.len()
    }

    /// Length of section `id` in metres.
    #[inline]
    pub fn length_m(&self, id: SectionId) -> f64 {
        self.sections[id.index()].length_m
    }

    /// Dynamic state of section `id`.
    #[inline]
    pub fn state(&self, id: SectionId) -> &SectionState {
        &self.states[id.index()]
    }

    /// Mutable dynamic state of section `id`.
    #[inline]
    pub fn state_mut(&mut self, id: SectionId) -> &mut SectionState {
        &mut self.states[id.index()]
    }

    /// Dynamic state of every section, in id order.
    pub fn states(&self) -> &[SectionState] {
        &self.states
    }

    // ── Topology ───────────────────────────────────────────────────

    /// The pin a train leaving `section` travelling `direction` follows,
    /// given the current switch alignment. `None` at an open end.
    pub fn next_pin(&self, section: SectionId, direction: Direction) -> Option<Pin> {
        let pins = self.section(section).pins(direction);
        match pins.len() {
            0 => None,
            1 => Some(pins[0]),
            _ => pins
                .get(self.state(section).alignment() as usize)
                .copied(),
        }
    }

    /// The leg a train entering `section` travelling `direction` from
    /// `from` uses, when it enters through a two-legged end.
    pub fn entry_leg(&self, section: SectionId, direction: Direction, from: SectionId) -> Option<u8> {
        let s = self.section(section);
        let back = direction.reverse();
        if s.is_facing_switch(back) {
            s.leg_to(back, from)
        } else {
            None
        }
    }

    /// The leg a train leaving `section` travelling `direction` towards
    /// `to` uses, when it leaves through a two-legged end.
    pub fn exit_leg(&self, section: SectionId, direction: Direction, to: SectionId) -> Option<u8> {
        let s = self.section(section);
        if s.is_facing_switch(direction) {
            s.leg_to(direction, to)
        } else {
            None
        }
    }

    /// The alignment a switchable section needs for a traversal from
    /// `from` to `to`. The exit leg wins when both ends switch.
    pub fn required_leg(
        &self,
        section: SectionId,
        direction: Direction,
        from: Option<SectionId>,
        to: Option<SectionId>,
    ) -> Option<u8> {
        if !self.section(section).is_switchable() {
            return None;
        }
        to.and_then(|t| self.exit_leg(section, direction, t))
            .or_else(|| from.and_then(|f| self.entry_leg(section, direction, f)))
    }

    /// Whether the switch in `section` is set for `leg`.
    /// A traversal without a leg requirement is always aligned.
    pub fn is_aligned(&self, section: SectionId, leg: Option<u8>) -> bool {
        leg.is_none_or(|l| self.state(section).alignment() == l)
    }

    /// Throw the switch in `section` to `leg`.
    ///
    /// Occupancy and reservation are the caller's concern; this only
    /// checks that the section can switch and that the leg exists.
    pub fn set_alignment(&mut self, section: SectionId, leg: u8) -> Result<(), NetworkError> {
        let s = self
            .get_section(section)
            .ok_or(NetworkError::UnknownSection { section })?;
        let legs = s.pins[0].len().max(s.pins[1].len());
        if !s.is_switchable() || leg as usize >= legs {
            return Err(NetworkError::InvalidAlignment { section, leg });
        }
        self.state_mut(section).set_alignment(leg);
        Ok(())
    }

    // ── Signals ────────────────────────────────────────────────────

    /// Number of signals.
    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// All signals in id order.
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// The signal with id `id`.
    #[inline]
    pub fn signal(&self, id: SignalId) -> &Signal {
        &self.signals[id.index()]
    }

    /// Dynamic state of signal `id`.
    #[inline]
    pub fn signal_state(&self, id: SignalId) -> &SignalState {
        &self.signal_states[id.index()]
    }

    /// Mutable dynamic state of signal `id`.
    #[inline]
    pub fn signal_state_mut(&mut self, id: SignalId) -> &mut SignalState {
        &mut self.signal_states[id.index()]
    }

    /// Dynamic state of every signal, in id order.
    pub fn signal_states(&self) -> &[SignalState] {
        &self.signal_states
    }

    /// Set or lift a host hold on `signal`.
    ///
    /// Holding a cleared signal drops it to stop immediately; the train
    /// keeps its reservations and sees the stop on its next lookahead pass.
    pub fn set_signal_hold(&mut self, signal: SignalId, hold: SignalHold) -> Result<(), NetworkError> {
        let state = self
            .signal_states
            .get_mut(signal.index())
            .ok_or(NetworkError::UnknownSignal { signal })?;
        state.hold = hold;
        if hold == SignalHold::Stop {
            state.aspect = crate::Aspect::Stop;
        }
        Ok(())
    }

    // ── Speed posts and platforms ──────────────────────────────────

    /// Number of speed posts.
    pub fn speed_post_count(&self) -> usize {
        self.speed_posts.len()
    }

    /// The speed post with id `id`.
    #[inline]
    pub fn speed_post(&self, id: SpeedPostId) -> &SpeedPost {
        &self.speed_posts[id.index()]
    }

    /// All platforms in id order.
    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    /// The platform with id `id`.
    #[inline]
    pub fn platform(&self, id: PlatformId) -> &Platform {
        &self.platforms[id.index()]
    }

    /// Platforms belonging to `station`.
    pub fn station_platforms(&self, station: StationId) -> impl Iterator<Item = &Platform> + '_ {
        self.platforms.iter().filter(move |p| p.station == station)
    }
}

#[cfg(test)]
mod tests {
    use crate::{NetworkBuilder, SectionKind};

    use super::*;

    /// 0 → J1 → {2 | 3}
    fn fork() -> (TrackNetwork, [SectionId; 4]) {
        let mut b = NetworkBuilder::new();
        let a = b.add_section(SectionKind::Normal, 100.0);
        let j = b.add_section(SectionKind::Junction, 20.0);
        let m = b.add_section(SectionKind::Normal, 100.0);
        let l = b.add_section(SectionKind::Normal, 100.0);
        b.connect(a, Direction::Ahead, j, Direction::Ahead);
        b.connect(j, Direction::Ahead, m, Direction::Ahead);
        b.connect(j, Direction::Ahead, l, Direction::Ahead);
        (b.build().expect("valid fork"), [a, j, m, l])
    }

    #[test]
    fn next_pin_follows_alignment() {
        let (mut net, [_, j, m, l]) = fork();
        assert_eq!(net.next_pin(j, Direction::Ahead).map(|p| p.section), Some(m));
        net.set_alignment(j, 1).expect("leg 1 exists");
        assert_eq!(net.next_pin(j, Direction::Ahead).map(|p| p.section), Some(l));
    }

    #[test]
    fn legs_for_facing_and_trailing_moves() {
        let (net, [a, j, m, l]) = fork();
        assert_eq!(net.exit_leg(j, Direction::Ahead, l), Some(1));
        assert_eq!(net.entry_leg(j, Direction::Reverse, l), Some(1));
        assert_eq!(net.entry_leg(j, Direction::Ahead, a), None);
        assert_eq!(net.required_leg(j, Direction::Ahead, Some(a), Some(m)), Some(0));
        assert_eq!(net.required_leg(a, Direction::Ahead, None, Some(j)), None);
    }

    #[test]
    fn alignment_rejected_on_plain_section() {
        let (mut net, [a, j, ..]) = fork();
        match net.set_alignment(a, 1) {
            Err(NetworkError::InvalidAlignment { section, leg: 1 }) => assert_eq!(section, a),
            other => panic!("expected InvalidAlignment, got {other:?}"),
        }
        assert!(net.set_alignment(j, 2).is_err());
    }

    #[test]
    fn hold_drops_aspect_to_stop() {
        let mut b = NetworkBuilder::new();
        let a = b.add_section(SectionKind::Normal, 100.0);
        let sig = b.add_end_signal(a, Direction::Ahead, Default::default());
        let mut net = b.build().expect("valid");
        net.signal_state_mut(sig).aspect = crate::Aspect::Clear;
        net.set_signal_hold(sig, SignalHold::Stop).expect("known signal");
        assert_eq!(net.signal_state(sig).aspect, crate::Aspect::Stop);
        assert!(net.set_signal_hold(SignalId(9), SignalHold::None).is_err());
    }
}
