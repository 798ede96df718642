//! Trains and their per-tick update.
//!
//! A [`Train`] owns its path, position, control state, speed limits and
//! lookahead. Everything it shares with other trains lives in the
//! network's section and signal state; effects on other trains are
//! queued in the [`Outbox`](crate::outbox::Outbox).

use std::fmt;

use smallvec::SmallVec;
use tracing::{debug, info, warn};
use trackward_core::{
    CommandPayload, CommandRejection, OutOfControlCause, SectionId, SignalId,
    TrainClass, TrainId,
};
use trackward_network::{SpeedPostKind, TrackNetwork, TrackObject};
use trackward_route::TrainPath;

use crate::brake::BrakeEvent;
use crate::config::ControlConfig;
use crate::control::{
    transition, ControlEvent, ControlMode, ControlState, ManualControl, TransitionRejected,
};
use crate::lookahead::{ItemKind, Lookahead, LookaheadItem};
use crate::outbox::{Intent, Outbox};
use crate::output::TrainMotion;
use crate::position::{occupied_sections, rear_from_front, Movement, Segment, TrainPosition};
use crate::reservation::ReservationManager;
use crate::speed::{LimitTarget, SpeedState};
use crate::{auto, manual};

// ── Construction ───────────────────────────────────────────────────

/// Everything needed to put a train on the network.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainSpec {
    /// Unique id.
    pub id: TrainId,
    /// Passenger or freight; selects the speed limit column.
    pub class: TrainClass,
    /// Length from front to rear.
    pub length_m: f64,
    /// The train's own top speed.
    pub max_speed_mps: f64,
    /// Path to follow under automatic control. Without one the train
    /// starts in explorer mode.
    pub path: Option<TrainPath>,
    /// Where the front stands, facing its travel direction.
    pub front: TrainPosition,
}

/// Why a train could not be added.
#[derive(Clone, Debug, PartialEq)]
pub enum AddTrainError {
    /// A train with this id already exists.
    Duplicate {
        /// The id.
        train: TrainId,
    },
    /// Length is not a positive finite number.
    InvalidLength {
        /// The train.
        train: TrainId,
        /// The rejected value.
        length_m: f64,
    },
    /// Top speed is not a positive finite number.
    InvalidSpeed {
        /// The train.
        train: TrainId,
        /// The rejected value.
        max_speed_mps: f64,
    },
    /// The track behind the front is shorter than the train.
    DoesNotFit {
        /// The train.
        train: TrainId,
        /// Its length.
        length_m: f64,
    },
    /// The front stands on a section the network does not have.
    UnknownSection {
        /// The section.
        section: SectionId,
    },
    /// The train would stand on a section another train occupies.
    Occupied {
        /// The section.
        section: SectionId,
        /// The occupant.
        by: TrainId,
    },
}

impl fmt::Display for AddTrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate { train } => write!(f, "train {train} already exists"),
            Self::InvalidLength { train, length_m } => {
                write!(f, "train {train}: invalid length {length_m}")
            }
            Self::InvalidSpeed {
                train,
                max_speed_mps,
            } => write!(f, "train {train}: invalid top speed {max_speed_mps}"),
            Self::DoesNotFit { train, length_m } => {
                write!(f, "train {train}: {length_m} m does not fit behind its front")
            }
            Self::UnknownSection { section } => write!(f, "unknown section {section}"),
            Self::Occupied { section, by } => {
                write!(f, "section {section} is occupied by train {by}")
            }
        }
    }
}

impl std::error::Error for AddTrainError {}

// ── Train ──────────────────────────────────────────────────────────

/// A train under control.
#[derive(Clone, Debug, PartialEq)]
pub struct Train {
    pub(crate) id: TrainId,
    pub(crate) class: TrainClass,
    pub(crate) length_m: f64,
    pub(crate) max_speed_mps: f64,
    pub(crate) speed_mps: f64,
    pub(crate) path: Option<TrainPath>,
    pub(crate) subpath: usize,
    pub(crate) front: TrainPosition,
    pub(crate) rear: TrainPosition,
    pub(crate) occupied: SmallVec<[SectionId; 4]>,
    pub(crate) control: ControlState,
    pub(crate) speed: SpeedState,
    pub(crate) lookahead: Lookahead,
    pub(crate) blocked_s: f64,
    pub(crate) deadlock_wait_s: f64,
    pub(crate) brake_applied: bool,
}

/// Shared state a train may touch during its update.
pub(crate) struct TickContext<'a> {
    pub net: &'a mut TrackNetwork,
    pub config: &'a ControlConfig,
    pub outbox: &'a mut Outbox,
    pub brakes: &'a mut Vec<BrakeEvent>,
}

impl Train {
    pub(crate) fn new(spec: TrainSpec, net: &TrackNetwork) -> Result<Self, AddTrainError> {
        let id = spec.id;
        if !(spec.length_m.is_finite() && spec.length_m > 0.0) {
            return Err(AddTrainError::InvalidLength {
                train: id,
                length_m: spec.length_m,
            });
        }
        if !(spec.max_speed_mps.is_finite() && spec.max_speed_mps > 0.0) {
            return Err(AddTrainError::InvalidSpeed {
                train: id,
                max_speed_mps: spec.max_speed_mps,
            });
        }
        if !net.contains(spec.front.section) {
            return Err(AddTrainError::UnknownSection {
                section: spec.front.section,
            });
        }
        let mut front = spec.front;
        front.offset_m = front.offset_m.clamp(0.0, net.length_m(front.section));
        front.route_index = 0;
        let rear = rear_from_front(net, &front, spec.length_m).ok_or(AddTrainError::DoesNotFit {
            train: id,
            length_m: spec.length_m,
        })?;
        let occupied = occupied_sections(net, &rear, &front);
        Ok(Self {
            id,
            class: spec.class,
            length_m: spec.length_m,
            max_speed_mps: spec.max_speed_mps,
            speed_mps: 0.0,
            path: spec.path,
            subpath: 0,
            front,
            rear,
            occupied,
            control: ControlState::Undefined,
            speed: SpeedState::new(),
            lookahead: Lookahead::new(),
            blocked_s: 0.0,
            deadlock_wait_s: 0.0,
            brake_applied: false,
        })
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// The train's id.
    pub fn id(&self) -> TrainId {
        self.id
    }

    /// Passenger or freight.
    pub fn class(&self) -> TrainClass {
        self.class
    }

    /// Length from front to rear.
    pub fn length_m(&self) -> f64 {
        self.length_m
    }

    /// Current control mode.
    pub fn mode(&self) -> ControlMode {
        self.control.mode()
    }

    /// Full control state, including routes and authority.
    pub fn control(&self) -> &ControlState {
        &self.control
    }

    /// Front end.
    pub fn front(&self) -> &TrainPosition {
        &self.front
    }

    /// Rear end, facing the same way as the front.
    pub fn rear(&self) -> &TrainPosition {
        &self.rear
    }

    /// Last reported speed.
    pub fn speed_mps(&self) -> f64 {
        self.speed_mps
    }

    /// The planned path, if any.
    pub fn path(&self) -> Option<&TrainPath> {
        self.path.as_ref()
    }

    /// Index of the active subpath.
    pub fn subpath(&self) -> usize {
        self.subpath
    }

    /// Sections under the train, rear first.
    pub fn occupied(&self) -> &[SectionId] {
        &self.occupied
    }

    /// Signals and speed posts ahead.
    pub fn lookahead(&self) -> &Lookahead {
        &self.lookahead
    }

    /// Speed limits in force and pending.
    pub fn speed_state(&self) -> &SpeedState {
        &self.speed
    }

    /// Whether an emergency brake request is outstanding.
    pub fn is_braking(&self) -> bool {
        self.brake_applied
    }

    pub(crate) fn at_standstill(&self, config: &ControlConfig) -> bool {
        self.speed_mps.abs() <= config.standstill_speed_mps
    }

    // ── Update ─────────────────────────────────────────────────────

    pub(crate) fn update(&mut self, motion: Option<&TrainMotion>, ctx: &mut TickContext<'_>) {
        if self.control.mode() == ControlMode::Undefined {
            self.activate(ctx);
        }
        let distance = match motion {
            Some(m) => {
                self.speed_mps = m.speed_mps.abs();
                m.distance_m
            }
            None => 0.0,
        };
        let violation = self.apply_motion(distance, ctx);
        self.speed.travel(distance);
        if let Some(cause) = violation {
            self.enter_out_of_control(cause, ctx);
            return;
        }
        match self.control.mode() {
            ControlMode::AutoSignal | ControlMode::AutoNode => {
                if let Err(cause) = auto::update(self, ctx) {
                    self.enter_out_of_control(cause, ctx);
                }
            }
            ControlMode::Manual | ControlMode::Explorer => {
                if let Err(cause) = manual::update(self, ctx) {
                    self.enter_out_of_control(cause, ctx);
                }
            }
            _ => {}
        }
    }

    pub(crate) fn activate(&mut self, ctx: &mut TickContext<'_>) {
        let event = ControlEvent::Activate {
            has_path: self.path.is_some(),
        };
        if let Ok(mode) = transition(&self.control, event) {
            self.enter_mode(mode, ctx);
        }
    }

    /// Tear down the current mode and set up `mode`.
    pub(crate) fn enter_mode(&mut self, mode: ControlMode, ctx: &mut TickContext<'_>) {
        let from = self.control.mode();
        let previous = self.control.resumable();
        self.break_down(ctx.net);
        self.lookahead.clear();
        self.blocked_s = 0.0;
        self.deadlock_wait_s = 0.0;
        match mode {
            ControlMode::AutoSignal | ControlMode::AutoNode => {
                if let Err(fault) = auto::install(self, mode == ControlMode::AutoSignal) {
                    let fallback = if from == ControlMode::Undefined {
                        ControlMode::Explorer
                    } else {
                        ControlMode::Manual
                    };
                    warn!(train = %self.id, %fault, %fallback, "cannot follow path");
                    self.control = manual_state(fallback);
                }
            }
            ControlMode::Manual | ControlMode::Explorer => self.control = manual_state(mode),
            ControlMode::TurnTable => {
                self.control = match previous {
                    Some(previous) => ControlState::TurnTable { previous },
                    None => ControlState::Undefined,
                }
            }
            ControlMode::OutOfControl | ControlMode::Undefined => {
                self.control = ControlState::Undefined;
            }
        }
        info!(train = %self.id, %from, to = %self.control.mode(), "control mode changed");
        ctx.outbox.push(Intent::RefreshDeadlocks);
    }

    pub(crate) fn break_down(&self, net: &mut TrackNetwork) {
        let routes = self.control.routes();
        ReservationManager::new(net).break_down(self.id, &routes);
    }

    pub(crate) fn enter_out_of_control(&mut self, cause: OutOfControlCause, ctx: &mut TickContext<'_>) {
        if transition(&self.control, ControlEvent::Violation(cause)).is_err() {
            return;
        }
        let Some(previous) = self.control.resumable() else {
            return;
        };
        self.break_down(ctx.net);
        self.control = ControlState::OutOfControl { cause, previous };
        self.lookahead.clear();
        warn!(train = %self.id, %cause, "train out of control");
        if !self.brake_applied {
            ctx.brakes.push(BrakeEvent::EmergencyRequested {
                train: self.id,
                cause,
            });
            self.brake_applied = true;
        }
        ctx.outbox.push(Intent::RefreshDeadlocks);
    }

    /// Swap the ends so the train faces the other way.
    pub(crate) fn reverse_ends(&mut self, net: &TrackNetwork) {
        let front = self.rear.reversed(net);
        let rear = self.front.reversed(net);
        self.front = front;
        self.rear = rear;
        self.occupied.reverse();
    }

    // ── Motion ─────────────────────────────────────────────────────

    fn apply_motion(&mut self, distance_m: f64, ctx: &mut TickContext<'_>) -> Option<OutOfControlCause> {
        if distance_m == 0.0 {
            return None;
        }
        let mode = self.control.mode();
        let guarded = matches!(
            mode,
            ControlMode::AutoSignal | ControlMode::AutoNode | ControlMode::Manual | ControlMode::Explorer
        );
        let mut violation = None;
        if distance_m > 0.0 {
            let movement = self.front.advance(ctx.net, distance_m);
            self.rear.advance(ctx.net, movement.distance_m());
            if guarded {
                let enforce_signals = mode != ControlMode::Explorer;
                if self.pass_signals(ctx.net, &movement, enforce_signals) {
                    violation = Some(OutOfControlCause::PassedAtDanger);
                }
                if movement.blocked {
                    violation = violation.or(Some(OutOfControlCause::OutOfAuthority));
                }
                for (from, seg) in movement.entered() {
                    let v = self.enter_section(ctx, from, seg, mode.is_auto(), false);
                    violation = violation.or(v);
                }
            }
        } else {
            let movement = self.rear.retreat(ctx.net, -distance_m);
            self.front.retreat(ctx.net, movement.distance_m());
            if guarded {
                if self.pass_signals(ctx.net, &movement, mode != ControlMode::Explorer) {
                    violation = Some(OutOfControlCause::RearPassedAtDanger);
                }
                if movement.blocked {
                    violation = violation.or(Some(OutOfControlCause::SlippedToEndOfTrack));
                }
                for (from, seg) in movement.entered() {
                    let v = self.enter_section(ctx, from, seg, false, true);
                    violation = violation.or(v);
                }
            }
        }
        self.update_occupancy(ctx);
        violation
    }

    /// Reset signals passed that were cleared or permitted for this train.
    /// Returns whether one of them did not admit it.
    fn pass_signals(&self, net: &mut TrackNetwork, movement: &Movement, enforce: bool) -> bool {
        let passed: SmallVec<[SignalId; 4]> = movement
            .segments
            .iter()
            .flat_map(|seg| {
                net.section(seg.section)
                    .items(seg.direction)
                    .iter()
                    .filter(move |i| seg.passes(i.offset_m))
                    .filter_map(|i| match i.object {
                        TrackObject::Signal(s) => Some(s),
                        TrackObject::SpeedPost(_) => None,
                    })
            })
            .collect();
        let mut violated = false;
        for signal in passed {
            let state = net.signal_state_mut(signal);
            if enforce && !state.admits(self.id) {
                warn!(train = %self.id, %signal, "signal passed at stop");
                violated = true;
            }
            if state.enabled_for == Some(self.id) || state.permission_for == Some(self.id) {
                state.reset();
            }
        }
        violated
    }

    /// Check an end entering `seg.section` from `from`.
    fn enter_section(
        &self,
        ctx: &mut TickContext<'_>,
        from: SectionId,
        seg: &Segment,
        auto: bool,
        rear: bool,
    ) -> Option<OutOfControlCause> {
        let section = seg.section;
        let state = ctx.net.state(section);
        let holder = state
            .occupied_by_other(self.id)
            .or_else(|| state.reserved_by().filter(|&t| t != self.id));

        if let Some(leg) = ctx.net.entry_leg(section, seg.direction, from) {
            if state.alignment() != leg {
                if holder.is_some() {
                    warn!(train = %self.id, %section, "entered misaligned switch");
                    return Some(OutOfControlCause::MisalignedSwitch);
                }
                if let Err(e) = ctx.net.set_alignment(section, leg) {
                    warn!(train = %self.id, %section, error = %e, "switch not trailed");
                    return Some(OutOfControlCause::MisalignedSwitch);
                }
                debug!(train = %self.id, %section, leg, "switch trailed");
            }
        }

        if let Some(other) = holder {
            ctx.outbox.push(Intent::SwitchToNodeControl {
                train: other,
                section,
            });
            if rear {
                ctx.outbox.push(Intent::StopTrain { train: other });
                return Some(OutOfControlCause::SlippedIntoPath);
            }
            return Some(OutOfControlCause::OutOfAuthority);
        }
        if auto && ctx.net.state(section).reserved_by() != Some(self.id) {
            return Some(OutOfControlCause::OutOfAuthority);
        }
        None
    }

    fn update_occupancy(&mut self, ctx: &mut TickContext<'_>) {
        let now = occupied_sections(ctx.net, &self.rear, &self.front);
        let mut rm = ReservationManager::new(ctx.net);
        for s in self.occupied.iter().filter(|s| !now.contains(s)) {
            rm.clear_occupied(*s, self.id);
        }
        for s in now.iter().filter(|s| !self.occupied.contains(s)) {
            rm.set_occupied(*s, self.id, self.front.direction);
            ctx.outbox.push(Intent::RefreshDeadlocks);
        }
        self.occupied = now;
    }

    /// Feed items the front has passed into the speed limits.
    pub(crate) fn apply_passed(&mut self, net: &TrackNetwork, passed: &[LookaheadItem]) {
        for item in passed {
            let target = match item.kind {
                ItemKind::Signal(_) => LimitTarget::Signal,
                ItemKind::SpeedPost(p) => match net.speed_post(p).kind {
                    SpeedPostKind::Permanent => LimitTarget::Standing,
                    SpeedPostKind::Temporary => LimitTarget::Temporary,
                },
            };
            self.speed
                .pass(self.class, target, item.speed(net), -item.distance_m, self.length_m);
        }
    }

    /// Drop from signal to node control after another train entered
    /// `section`; signals governing that section are returned to stop.
    pub(crate) fn drop_to_node_control(&mut self, net: &mut TrackNetwork, section: SectionId) {
        if self.control.mode() != ControlMode::AutoSignal {
            return;
        }
        for i in 0..net.signal_count() {
            let state = net.signal_state_mut(SignalId(i as u32));
            if state.enabled_for == Some(self.id) && state.governed.contains(&section) {
                state.reset();
            }
        }
        self.control.set_auto_mode(false);
        info!(train = %self.id, %section, "dropped to node control");
    }

    // ── Commands ───────────────────────────────────────────────────

    pub(crate) fn apply_command(
        &mut self,
        payload: CommandPayload,
        ctx: &mut TickContext<'_>,
    ) -> Result<(), CommandRejection> {
        match payload {
            CommandPayload::ToggleManual => {
                let event = self.toggle_event(ctx.config);
                let mode = transition(&self.control, event).map_err(rejection)?;
                if let ControlEvent::ToggleManual {
                    direction_matches: false,
                    ..
                } = event
                {
                    if mode.is_auto() {
                        self.reverse_ends(ctx.net);
                    }
                }
                self.enter_mode(mode, ctx);
                Ok(())
            }
            CommandPayload::SetSwitch { direction } => manual::set_switch(self, ctx.net, direction),
            CommandPayload::RequestSignalPermission { direction } => {
                manual::request_permission(self, ctx.net, direction)
            }
            CommandPayload::ResetSignal { direction } => manual::reset_signal(self, ctx.net, direction),
            CommandPayload::ResetOutOfControl => {
                let event = ControlEvent::ResetOutOfControl {
                    standstill: self.at_standstill(ctx.config),
                };
                let mode = transition(&self.control, event).map_err(rejection)?;
                self.enter_mode(mode, ctx);
                if self.brake_applied {
                    ctx.brakes.push(BrakeEvent::Released { train: self.id });
                    self.brake_applied = false;
                }
                Ok(())
            }
            CommandPayload::Turntable { engage } => {
                let event = if engage {
                    ControlEvent::TurntableEngaged
                } else {
                    ControlEvent::TurntableReleased
                };
                let mode = transition(&self.control, event).map_err(rejection)?;
                self.enter_mode(mode, ctx);
                Ok(())
            }
        }
    }

    fn toggle_event(&self, config: &ControlConfig) -> ControlEvent {
        let route = self.path.as_ref().and_then(|p| p.subpath(self.subpath).ok());
        let on_path = |pos: &TrainPosition| route.is_some_and(|r| r.contains(pos.section));
        let direction_matches = route.is_some_and(|r| {
            r.iter()
                .find(|e| e.section == self.front.section)
                .is_some_and(|e| e.direction == self.front.direction)
        });
        ControlEvent::ToggleManual {
            has_path: route.is_some(),
            rear_on_path: on_path(&self.rear) && on_path(&self.front),
            direction_matches,
            standstill: self.at_standstill(config),
        }
    }
}

fn manual_state(mode: ControlMode) -> ControlState {
    match mode {
        ControlMode::Explorer => ControlState::Explorer(ManualControl::default()),
        _ => ControlState::Manual(ManualControl::default()),
    }
}

fn rejection(r: TransitionRejected) -> CommandRejection {
    match r {
        TransitionRejected::Command(r) => r,
        TransitionRejected::NotApplicable => CommandRejection::InvalidInMode,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackward_core::Direction;
    use trackward_test_utils::straight_line;

    fn spec(id: u32, section: SectionId, offset: f64) -> TrainSpec {
        TrainSpec {
            id: TrainId(id),
            class: TrainClass::Passenger,
            length_m: 60.0,
            max_speed_mps: 30.0,
            path: None,
            front: TrainPosition::new(section, offset, Direction::Ahead),
        }
    }

    #[test]
    fn new_train_spans_sections_behind_front() {
        let (net, ids) = straight_line(&[100.0, 100.0]);
        let t = Train::new(spec(1, ids[1], 20.0), &net).expect("valid");
        assert_eq!(t.occupied(), &[ids[0], ids[1]]);
        assert_eq!(t.rear().section, ids[0]);
        assert_eq!(t.rear().offset_m, 60.0);
        assert_eq!(t.mode(), ControlMode::Undefined);
    }

    #[test]
    fn invalid_dimensions_are_refused() {
        let (net, ids) = straight_line(&[100.0]);
        let mut s = spec(1, ids[0], 80.0);
        s.length_m = 0.0;
        match Train::new(s, &net) {
            Err(AddTrainError::InvalidLength { .. }) => {}
            other => panic!("expected InvalidLength, got {other:?}"),
        }
        let mut s = spec(1, ids[0], 80.0);
        s.max_speed_mps = f64::NAN;
        match Train::new(s, &net) {
            Err(AddTrainError::InvalidSpeed { .. }) => {}
            other => panic!("expected InvalidSpeed, got {other:?}"),
        }
    }

    #[test]
    fn reversing_swaps_ends() {
        let (net, ids) = straight_line(&[100.0, 100.0]);
        let mut t = Train::new(spec(1, ids[1], 20.0), &net).expect("valid");
        t.reverse_ends(&net);
        assert_eq!(t.front().section, ids[0]);
        assert_eq!(t.front().direction, Direction::Reverse);
        assert_eq!(t.front().offset_m, 40.0);
        assert_eq!(t.rear().section, ids[1]);
        assert_eq!(t.rear().offset_m, 80.0);
    }

    #[test]
    fn train_longer_than_the_track_behind_is_refused() {
        let (net, ids) = straight_line(&[100.0, 100.0]);
        match Train::new(spec(1, ids[0], 30.0), &net) {
            Err(AddTrainError::DoesNotFit { train, .. }) => assert_eq!(train, TrainId(1)),
            other => panic!("expected DoesNotFit, got {other:?}"),
        }
    }

    #[test]
    fn overrun_at_buffer_keeps_train_length() {
        let (mut net, ids) = straight_line(&[100.0, 100.0]);
        let mut t = Train::new(spec(1, ids[1], 10.0), &net).expect("valid");
        let config = ControlConfig::default();
        let mut outbox = Outbox::new();
        let mut brakes = Vec::new();
        let mut ctx = TickContext {
            net: &mut net,
            config: &config,
            outbox: &mut outbox,
            brakes: &mut brakes,
        };
        t.activate(&mut ctx);
        assert_eq!(t.mode(), ControlMode::Explorer);
        let motion = TrainMotion {
            train: TrainId(1),
            distance_m: 200.0,
            speed_mps: 20.0,
        };
        t.update(Some(&motion), &mut ctx);
        assert_eq!(t.front().section, ids[1]);
        assert_eq!(t.front().offset_m, 100.0);
        assert_eq!(t.rear().section, ids[1]);
        assert!((t.rear().offset_m - 40.0).abs() < 1e-9);
        assert_eq!(t.occupied(), &[ids[1]]);
        assert_eq!(t.mode(), ControlMode::OutOfControl);
    }
}
