//! Flattening engine state into snapshot records and back.
//!
//! Static topology is not stored: a record is restored over the same
//! [`TrackNetwork`] it was taken from, and route linkage is recomputed
//! from it.

use std::collections::VecDeque;
use std::fmt;

use indexmap::IndexMap;
use trackward_core::{SectionId, SignalId, SpeedPostId, TrainId};
use trackward_network::{
    Aspect, DeadlockTrap, Reservation, SectionState, SignalHold, SignalState, TrackNetwork,
};
use trackward_route::{AlternativeKind, Route, RouteElement, RouteError, StationStop, TrainPath};
use trackward_snapshot::{
    AlternativeRecord, AuthorityRecord, ControlRecord, ElementRecord, ItemRecord, LookaheadRecord,
    PathRecord, PendingRecord, PositionRecord, SectionRecord, SignalRecord, SpeedRecord,
    StopRecord, TrainRecord, TrapRecord, WorldRecord,
};

use crate::authority::{EndAuthority, EndAuthorityType};
use crate::config::{ConfigError, DispatcherConfig};
use crate::control::{AutoControl, ControlMode, ControlState, ManualControl, ResumableMode};
use crate::lookahead::{ItemKind, Lookahead, LookaheadItem};
use crate::position::{occupied_sections, TrainPosition};
use crate::speed::{LastPassed, LimitTarget, PendingActivation, SpeedState};
use crate::tick::TickEngine;
use crate::train::Train;

// ── RestoreError ────────────────────────────────────────────────

/// Errors from rebuilding a dispatcher out of a [`WorldRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreError {
    /// The configuration is invalid.
    Config(ConfigError),
    /// The record was taken from a network with a different section count.
    SectionCountMismatch {
        /// Sections in the network.
        expected: usize,
        /// Sections in the record.
        found: usize,
    },
    /// The record was taken from a network with a different signal count.
    SignalCountMismatch {
        /// Signals in the network.
        expected: usize,
        /// Signals in the record.
        found: usize,
    },
    /// A train end lies on a section the network does not have.
    UnknownSection {
        /// The section id.
        section: SectionId,
    },
    /// A record names a signal the network does not have.
    UnknownSignal {
        /// The signal id.
        signal: SignalId,
    },
    /// A lookahead item names a speed post the network does not have.
    UnknownSpeedPost {
        /// The speed post id.
        post: SpeedPostId,
    },
    /// Section or signal state names a train the record does not hold.
    UnknownTrain {
        /// The train id.
        train: TrainId,
    },
    /// A stored route no longer fits the network.
    Route(RouteError),
    /// A numeric tag has no meaning.
    InvalidTag {
        /// Which field carried it.
        field: &'static str,
        /// The tag value.
        tag: u8,
    },
}

impl fmt::Display for RestoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::SectionCountMismatch { expected, found } => {
                write!(f, "record has {found} sections, network has {expected}")
            }
            Self::SignalCountMismatch { expected, found } => {
                write!(f, "record has {found} signals, network has {expected}")
            }
            Self::UnknownSection { section } => write!(f, "unknown section {section}"),
            Self::UnknownSignal { signal } => write!(f, "unknown signal {signal}"),
            Self::UnknownSpeedPost { post } => write!(f, "unknown speed post {post}"),
            Self::UnknownTrain { train } => write!(f, "state refers to unknown train {train}"),
            Self::Route(e) => write!(f, "stored route: {e}"),
            Self::InvalidTag { field, tag } => write!(f, "invalid {field} tag {tag}"),
        }
    }
}

impl std::error::Error for RestoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Route(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for RestoreError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<RouteError> for RestoreError {
    fn from(e: RouteError) -> Self {
        Self::Route(e)
    }
}

fn invalid(field: &'static str, tag: u8) -> RestoreError {
    RestoreError::InvalidTag { field, tag }
}

fn check_section(net: &TrackNetwork, section: SectionId) -> Result<(), RestoreError> {
    if net.contains(section) {
        Ok(())
    } else {
        Err(RestoreError::UnknownSection { section })
    }
}

fn check_signal(net: &TrackNetwork, signal: SignalId) -> Result<(), RestoreError> {
    if signal.index() < net.signal_count() {
        Ok(())
    } else {
        Err(RestoreError::UnknownSignal { signal })
    }
}

fn check_train(trains: &IndexMap<TrainId, Train>, train: TrainId) -> Result<(), RestoreError> {
    if trains.contains_key(&train) {
        Ok(())
    } else {
        Err(RestoreError::UnknownTrain { train })
    }
}

/// Every id a section record names must exist.
fn check_section_record(
    net: &TrackNetwork,
    trains: &IndexMap<TrainId, Train>,
    sr: &SectionRecord,
) -> Result<(), RestoreError> {
    for &(train, _) in &sr.occupancy {
        check_train(trains, train)?;
    }
    if let Some((train, _)) = sr.reservation {
        check_train(trains, train)?;
    }
    for &train in &sr.claims {
        check_train(trains, train)?;
    }
    for t in &sr.traps {
        check_train(trains, t.train)?;
        check_train(trains, t.awaited_train)?;
        check_section(net, t.awaited_section)?;
    }
    Ok(())
}

fn check_signal_record(
    net: &TrackNetwork,
    trains: &IndexMap<TrainId, Train>,
    sr: &SignalRecord,
) -> Result<(), RestoreError> {
    for train in sr.enabled_for.into_iter().chain(sr.permission_for) {
        check_train(trains, train)?;
    }
    for &section in &sr.governed {
        check_section(net, section)?;
    }
    if let Some(next) = sr.next_signal {
        check_signal(net, next)?;
    }
    Ok(())
}

// ── Save ────────────────────────────────────────────────────────

/// Capture the dynamic state of `engine`.
pub fn save(engine: &TickEngine) -> WorldRecord {
    let net = engine.network();
    WorldRecord {
        tick: engine.current_tick(),
        traps_dirty: engine.traps_dirty,
        trains: engine.trains().map(save_train).collect(),
        sections: net.states().iter().map(save_section).collect(),
        signals: net.signal_states().iter().map(save_signal).collect(),
    }
}

fn save_section(state: &SectionState) -> SectionRecord {
    SectionRecord {
        occupancy: state.occupancy().to_vec(),
        reservation: state.reservation().map(|r| (r.train, r.direction)),
        claims: state.claims().to_vec(),
        traps: state
            .traps()
            .iter()
            .flat_map(|(&train, traps)| {
                traps.iter().map(move |t| TrapRecord {
                    train,
                    awaited_train: t.awaited_train,
                    awaited_section: t.awaited_section,
                })
            })
            .collect(),
        alignment: state.alignment(),
    }
}

fn save_signal(state: &SignalState) -> SignalRecord {
    SignalRecord {
        aspect: state.aspect.tag(),
        enabled_for: state.enabled_for,
        held: state.is_held(),
        permission_for: state.permission_for,
        governed: state.governed.to_vec(),
        next_signal: state.next_signal,
    }
}

fn save_route(route: &Route) -> Vec<ElementRecord> {
    route
        .iter()
        .map(|e| ElementRecord {
            section: e.section,
            direction: e.direction,
        })
        .collect()
}

fn save_position(pos: &TrainPosition) -> PositionRecord {
    PositionRecord {
        section: pos.section,
        offset_m: pos.offset_m,
        direction: pos.direction,
        route_index: pos.route_index as u32,
    }
}

fn save_authority(a: &EndAuthority) -> AuthorityRecord {
    AuthorityRecord {
        kind: a.kind.tag(),
        distance_m: a.distance_m,
    }
}

fn save_control(state: &ControlState) -> ControlRecord {
    let mut record = ControlRecord {
        mode: state.mode().tag(),
        ..ControlRecord::default()
    };
    match state {
        ControlState::AutoSignal(auto) | ControlState::AutoNode(auto) => {
            record.routes[0] = save_route(&auto.route);
            record.last_reserved[0] = auto.last_reserved as u32;
            record.authority[0] = save_authority(&auto.authority);
        }
        ControlState::Manual(manual) | ControlState::Explorer(manual) => {
            for i in 0..2 {
                record.routes[i] = save_route(&manual.routes[i]);
                record.last_reserved[i] = manual.last_reserved[i] as u32;
                record.authority[i] = save_authority(&manual.authority[i]);
            }
        }
        ControlState::OutOfControl { cause, previous } => {
            record.cause = Some(*cause);
            record.previous = previous.tag();
        }
        ControlState::TurnTable { previous } => record.previous = previous.tag(),
        ControlState::Undefined => {}
    }
    record
}

fn save_speed(speed: &SpeedState) -> SpeedRecord {
    SpeedRecord {
        signal: speed.signal,
        standing: speed.standing,
        previous_standing: speed.previous_standing,
        temporary: speed.temporary,
        previous_temporary: speed.previous_temporary,
        last_passed: speed.last_passed.tag(),
        pending: speed
            .pending
            .iter()
            .map(|p| PendingRecord {
                target: p.target.tag(),
                reset: p.reset,
                limit: p.limit,
                remaining_m: p.remaining_m,
            })
            .collect(),
    }
}

fn save_lookahead(lookahead: &Lookahead) -> LookaheadRecord {
    LookaheadRecord {
        items: lookahead
            .items()
            .map(|item| {
                let (kind, object) = match item.kind {
                    ItemKind::Signal(s) => (0, s.0),
                    ItemKind::SpeedPost(p) => (1, p.0),
                };
                ItemRecord {
                    kind,
                    object,
                    route_index: item.route_index as u32,
                    offset_m: item.offset_m,
                    distance_m: item.distance_m,
                    gap_m: item.gap_m,
                    aspect: item.aspect.tag(),
                }
            })
            .collect(),
        scanned: lookahead.scanned().map(|(i, off)| (i as u32, off)),
    }
}

fn save_path(path: &TrainPath) -> PathRecord {
    PathRecord {
        subpaths: path.subpaths().iter().map(save_route).collect(),
        alternatives: path
            .alternatives()
            .iter()
            .map(|alt| {
                let (kind, key) = match alt.kind {
                    AlternativeKind::PathBased { subpath } => (0, subpath as u32),
                    AlternativeKind::LocationBased { contested } => (1, contested.0),
                };
                AlternativeRecord {
                    kind,
                    key,
                    route: save_route(&alt.route),
                }
            })
            .collect(),
        stops: path
            .stops()
            .iter()
            .map(|s| StopRecord {
                subpath: s.subpath as u32,
                station: s.station,
                platform: s.platform,
                section: s.section,
            })
            .collect(),
    }
}

fn save_train(train: &Train) -> TrainRecord {
    TrainRecord {
        id: train.id,
        class: train.class,
        length_m: train.length_m,
        max_speed_mps: train.max_speed_mps,
        speed_mps: train.speed_mps,
        subpath: train.subpath as u32,
        path: train.path.as_ref().map(save_path),
        front: save_position(&train.front),
        rear: save_position(&train.rear),
        control: save_control(&train.control),
        speed: save_speed(&train.speed),
        lookahead: save_lookahead(&train.lookahead),
        blocked_s: train.blocked_s,
        deadlock_wait_s: train.deadlock_wait_s,
        brake_applied: train.brake_applied,
    }
}

// ── Restore ─────────────────────────────────────────────────────

/// Rebuild an engine over `network` from a saved record.
///
/// The network's dynamic state is overwritten. Commands that were queued
/// when the record was taken are not part of it.
pub fn restore(
    mut network: TrackNetwork,
    config: DispatcherConfig,
    record: &WorldRecord,
) -> Result<TickEngine, RestoreError> {
    config.validate()?;
    if record.sections.len() != network.section_count() {
        return Err(RestoreError::SectionCountMismatch {
            expected: network.section_count(),
            found: record.sections.len(),
        });
    }
    if record.signals.len() != network.signal_count() {
        return Err(RestoreError::SignalCountMismatch {
            expected: network.signal_count(),
            found: record.signals.len(),
        });
    }

    let mut trains = IndexMap::with_capacity(record.trains.len());
    for tr in &record.trains {
        let train = restore_train(&network, tr)?;
        trains.insert(train.id, train);
    }

    for sr in &record.sections {
        check_section_record(&network, &trains, sr)?;
    }
    for sr in &record.signals {
        check_signal_record(&network, &trains, sr)?;
    }

    for (i, sr) in record.sections.iter().enumerate() {
        *network.state_mut(SectionId(i as u32)) = SectionState::from_parts(
            sr.occupancy.iter().copied(),
            sr.reservation
                .map(|(train, direction)| Reservation { train, direction }),
            sr.claims.iter().copied(),
            sr.traps.iter().map(|t| {
                (
                    t.train,
                    DeadlockTrap {
                        awaited_train: t.awaited_train,
                        awaited_section: t.awaited_section,
                    },
                )
            }),
            sr.alignment,
        );
    }
    for (i, sr) in record.signals.iter().enumerate() {
        *network.signal_state_mut(SignalId(i as u32)) = SignalState {
            aspect: Aspect::from_tag(sr.aspect).ok_or(invalid("aspect", sr.aspect))?,
            enabled_for: sr.enabled_for,
            hold: if sr.held { SignalHold::Stop } else { SignalHold::None },
            permission_for: sr.permission_for,
            governed: sr.governed.iter().copied().collect(),
            next_signal: sr.next_signal,
        };
    }

    Ok(TickEngine::from_parts(
        network,
        config,
        trains,
        record.tick,
        record.traps_dirty,
    )?)
}

/// An empty record is an empty route; manual routes may be empty.
fn restore_route(net: &TrackNetwork, elements: &[ElementRecord]) -> Result<Route, RestoreError> {
    if elements.is_empty() {
        return Ok(Route::new());
    }
    let elements: Vec<RouteElement> = elements
        .iter()
        .map(|e| RouteElement::new(e.section, e.direction))
        .collect();
    Ok(Route::from_elements(net, &elements)?)
}

fn restore_position(net: &TrackNetwork, p: &PositionRecord) -> Result<TrainPosition, RestoreError> {
    check_section(net, p.section)?;
    Ok(TrainPosition {
        section: p.section,
        offset_m: p.offset_m,
        direction: p.direction,
        route_index: p.route_index as usize,
    })
}

fn restore_authority(a: &AuthorityRecord) -> Result<EndAuthority, RestoreError> {
    let kind = EndAuthorityType::from_tag(a.kind).ok_or(invalid("authority", a.kind))?;
    Ok(EndAuthority::new(kind, a.distance_m))
}

fn restore_control(net: &TrackNetwork, c: &ControlRecord) -> Result<ControlState, RestoreError> {
    let mode = ControlMode::from_tag(c.mode).ok_or(invalid("mode", c.mode))?;
    let previous = || ResumableMode::from_tag(c.previous).ok_or(invalid("previous mode", c.previous));
    let auto = || -> Result<AutoControl, RestoreError> {
        Ok(AutoControl {
            route: restore_route(net, &c.routes[0])?,
            last_reserved: c.last_reserved[0] as usize,
            authority: restore_authority(&c.authority[0])?,
        })
    };
    let manual = || -> Result<ManualControl, RestoreError> {
        Ok(ManualControl {
            routes: [restore_route(net, &c.routes[0])?, restore_route(net, &c.routes[1])?],
            last_reserved: [c.last_reserved[0] as usize, c.last_reserved[1] as usize],
            authority: [
                restore_authority(&c.authority[0])?,
                restore_authority(&c.authority[1])?,
            ],
        })
    };
    Ok(match mode {
        ControlMode::AutoSignal => ControlState::AutoSignal(auto()?),
        ControlMode::AutoNode => ControlState::AutoNode(auto()?),
        ControlMode::Manual => ControlState::Manual(manual()?),
        ControlMode::Explorer => ControlState::Explorer(manual()?),
        ControlMode::OutOfControl => ControlState::OutOfControl {
            cause: c.cause.ok_or(invalid("cause", 0))?,
            previous: previous()?,
        },
        ControlMode::TurnTable => ControlState::TurnTable {
            previous: previous()?,
        },
        ControlMode::Undefined => ControlState::Undefined,
    })
}

fn restore_speed(s: &SpeedRecord) -> Result<SpeedState, RestoreError> {
    let mut pending = VecDeque::with_capacity(s.pending.len());
    for p in &s.pending {
        pending.push_back(PendingActivation {
            target: LimitTarget::from_tag(p.target).ok_or(invalid("limit target", p.target))?,
            reset: p.reset,
            limit: p.limit,
            remaining_m: p.remaining_m,
        });
    }
    Ok(SpeedState {
        signal: s.signal,
        standing: s.standing,
        previous_standing: s.previous_standing,
        temporary: s.temporary,
        previous_temporary: s.previous_temporary,
        last_passed: LastPassed::from_tag(s.last_passed)
            .ok_or(invalid("last passed", s.last_passed))?,
        pending,
    })
}

fn restore_lookahead(net: &TrackNetwork, l: &LookaheadRecord) -> Result<Lookahead, RestoreError> {
    let mut items = Vec::with_capacity(l.items.len());
    for it in &l.items {
        let kind = match it.kind {
            0 => {
                let signal = SignalId(it.object);
                check_signal(net, signal)?;
                ItemKind::Signal(signal)
            }
            1 => {
                let post = SpeedPostId(it.object);
                if post.index() >= net.speed_post_count() {
                    return Err(RestoreError::UnknownSpeedPost { post });
                }
                ItemKind::SpeedPost(post)
            }
            other => return Err(invalid("lookahead item", other)),
        };
        items.push(LookaheadItem {
            kind,
            route_index: it.route_index as usize,
            offset_m: it.offset_m,
            distance_m: it.distance_m,
            gap_m: it.gap_m,
            aspect: Aspect::from_tag(it.aspect).ok_or(invalid("aspect", it.aspect))?,
        });
    }
    Ok(Lookahead::from_parts(
        items,
        l.scanned.map(|(i, off)| (i as usize, off)),
    ))
}

fn restore_path(net: &TrackNetwork, p: &PathRecord) -> Result<TrainPath, RestoreError> {
    let subpaths = p
        .subpaths
        .iter()
        .map(|r| restore_route(net, r))
        .collect::<Result<Vec<_>, _>>()?;
    let mut path = TrainPath::new(subpaths)?;
    for alt in &p.alternatives {
        let kind = match alt.kind {
            0 => AlternativeKind::PathBased {
                subpath: alt.key as usize,
            },
            1 => {
                let contested = SectionId(alt.key);
                check_section(net, contested)?;
                AlternativeKind::LocationBased { contested }
            }
            other => return Err(invalid("alternative", other)),
        };
        path.add_alternative(kind, restore_route(net, &alt.route)?)?;
    }
    for s in &p.stops {
        check_section(net, s.section)?;
    }
    path.stops_mut().extend(p.stops.iter().map(|s| StationStop {
        subpath: s.subpath as usize,
        station: s.station,
        platform: s.platform,
        section: s.section,
    }));
    Ok(path)
}

fn restore_train(net: &TrackNetwork, t: &TrainRecord) -> Result<Train, RestoreError> {
    let front = restore_position(net, &t.front)?;
    let rear = restore_position(net, &t.rear)?;
    let path = t.path.as_ref().map(|p| restore_path(net, p)).transpose()?;
    Ok(Train {
        id: t.id,
        class: t.class,
        length_m: t.length_m,
        max_speed_mps: t.max_speed_mps,
        speed_mps: t.speed_mps,
        path,
        subpath: t.subpath as usize,
        front,
        rear,
        occupied: occupied_sections(net, &rear, &front),
        control: restore_control(net, &t.control)?,
        speed: restore_speed(&t.speed)?,
        lookahead: restore_lookahead(net, &t.lookahead)?,
        blocked_s: t.blocked_s,
        deadlock_wait_s: t.deadlock_wait_s,
        brake_applied: t.brake_applied,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackward_core::{Direction, TickId, TrainClass};
    use trackward_snapshot::world_hash;
    use trackward_test_utils::{route, straight_line};

    use crate::output::TrainMotion;
    use crate::train::TrainSpec;

    fn running_engine() -> TickEngine {
        let (net, ids) = straight_line(&[400.0, 400.0, 400.0, 400.0]);
        let r = route(&net, &ids, Direction::Ahead);
        let mut engine = TickEngine::new(net, DispatcherConfig::default()).unwrap();
        engine
            .add_train(TrainSpec {
                id: TrainId(1),
                class: TrainClass::Freight,
                length_m: 120.0,
                max_speed_mps: 20.0,
                path: Some(TrainPath::single(r).unwrap()),
                front: TrainPosition::new(ids[0], 200.0, Direction::Ahead),
            })
            .unwrap();
        engine
            .add_train(TrainSpec {
                id: TrainId(2),
                class: TrainClass::Passenger,
                length_m: 60.0,
                max_speed_mps: 30.0,
                path: None,
                front: TrainPosition::new(ids[3], 300.0, Direction::Ahead),
            })
            .unwrap();
        engine.execute_tick(&[]).unwrap();
        engine
            .execute_tick(&[TrainMotion {
                train: TrainId(1),
                distance_m: 50.0,
                speed_mps: 10.0,
            }])
            .unwrap();
        engine
    }

    #[test]
    fn restore_reproduces_saved_state() {
        let engine = running_engine();
        let record = save(&engine);
        assert_eq!(record.tick, TickId(2));
        let net = engine.network().clone();
        let restored = restore(net, DispatcherConfig::default(), &record).unwrap();
        let again = save(&restored);
        assert_eq!(record, again);
        assert_eq!(world_hash(&record), world_hash(&again));
    }

    #[test]
    fn restored_engine_steps_like_the_original() {
        let mut original = running_engine();
        let record = save(&original);
        let net = original.network().clone();
        let mut restored = restore(net, DispatcherConfig::default(), &record).unwrap();
        let motion = [TrainMotion {
            train: TrainId(1),
            distance_m: 80.0,
            speed_mps: 12.0,
        }];
        original.execute_tick(&motion).unwrap();
        restored.execute_tick(&motion).unwrap();
        assert_eq!(world_hash(&save(&original)), world_hash(&save(&restored)));
    }

    #[test]
    fn section_count_mismatch_is_refused() {
        let engine = running_engine();
        let record = save(&engine);
        let (other, _) = straight_line(&[100.0]);
        match restore(other, DispatcherConfig::default(), &record) {
            Err(RestoreError::SectionCountMismatch { expected, found }) => {
                assert_eq!(expected, 1);
                assert_eq!(found, 4);
            }
            other => panic!("expected SectionCountMismatch, got {other:?}"),
        }
    }

    #[test]
    fn bad_mode_tag_is_refused() {
        let engine = running_engine();
        let mut record = save(&engine);
        record.trains[0].control.mode = 42;
        let net = engine.network().clone();
        match restore(net, DispatcherConfig::default(), &record) {
            Err(RestoreError::InvalidTag { field, tag }) => {
                assert_eq!(field, "mode");
                assert_eq!(tag, 42);
            }
            other => panic!("expected InvalidTag, got {other:?}"),
        }
    }

    #[test]
    fn lookahead_signal_outside_network_is_refused() {
        let engine = running_engine();
        let mut record = save(&engine);
        record.trains[0].lookahead.items.push(ItemRecord {
            kind: 0,
            object: 7,
            route_index: 0,
            offset_m: 0.0,
            distance_m: 0.0,
            gap_m: 0.0,
            aspect: 0,
        });
        let net = engine.network().clone();
        match restore(net, DispatcherConfig::default(), &record) {
            Err(RestoreError::UnknownSignal { signal }) => assert_eq!(signal, SignalId(7)),
            other => panic!("expected UnknownSignal, got {other:?}"),
        }
    }

    #[test]
    fn reservation_by_absent_train_is_refused() {
        let engine = running_engine();
        let mut record = save(&engine);
        record.sections[2].reservation = Some((TrainId(9), Direction::Ahead));
        let net = engine.network().clone();
        match restore(net, DispatcherConfig::default(), &record) {
            Err(RestoreError::UnknownTrain { train }) => assert_eq!(train, TrainId(9)),
            other => panic!("expected UnknownTrain, got {other:?}"),
        }
    }

    #[test]
    fn trap_awaiting_unknown_section_is_refused() {
        let engine = running_engine();
        let mut record = save(&engine);
        record.sections[0].traps.push(TrapRecord {
            train: TrainId(1),
            awaited_train: TrainId(2),
            awaited_section: SectionId(99),
        });
        let net = engine.network().clone();
        match restore(net, DispatcherConfig::default(), &record) {
            Err(RestoreError::UnknownSection { section }) => assert_eq!(section, SectionId(99)),
            other => panic!("expected UnknownSection, got {other:?}"),
        }
    }
}
