//! Flat record types.
//!
//! Records mirror engine state one to one but use only core types and
//! numeric tags, so this crate does not depend on the engine. Tags are
//! assigned by the engine's `tag()` methods.

use trackward_core::{
    Direction, OutOfControlCause, PlatformId, SectionId, SignalId, SpeedLimit, StationId, TickId,
    TrainClass, TrainId,
};

/// The whole dispatcher state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorldRecord {
    /// Last completed tick.
    pub tick: TickId,
    /// Deadlock traps must be recomputed before the next train pass.
    pub traps_dirty: bool,
    /// Trains in dispatcher order.
    pub trains: Vec<TrainRecord>,
    /// Dynamic section state, in section id order.
    pub sections: Vec<SectionRecord>,
    /// Dynamic signal state, in signal id order.
    pub signals: Vec<SignalRecord>,
}

// ── Network state ──────────────────────────────────────────────────

/// A deadlock trap stored on a section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrapRecord {
    /// The trapped train.
    pub train: TrainId,
    /// The train it must let through.
    pub awaited_train: TrainId,
    /// Far end of the contested run.
    pub awaited_section: SectionId,
}

/// Dynamic state of one section.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SectionRecord {
    /// Trains on the section, in arrival order.
    pub occupancy: Vec<(TrainId, Direction)>,
    /// Reservation holder and direction.
    pub reservation: Option<(TrainId, Direction)>,
    /// Claimants in claim order.
    pub claims: Vec<TrainId>,
    /// Deadlock traps.
    pub traps: Vec<TrapRecord>,
    /// Selected switch leg.
    pub alignment: u8,
}

/// Dynamic state of one signal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SignalRecord {
    /// Aspect tag.
    pub aspect: u8,
    /// Train the signal is cleared for.
    pub enabled_for: Option<TrainId>,
    /// Held at stop by the host.
    pub held: bool,
    /// Train with permission to pass at stop.
    pub permission_for: Option<TrainId>,
    /// Protected sections.
    pub governed: Vec<SectionId>,
    /// Next signal along the governed route.
    pub next_signal: Option<SignalId>,
}

// ── Routes and positions ───────────────────────────────────────────

/// One route element. Linkage is recomputed on restore.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElementRecord {
    /// The section.
    pub section: SectionId,
    /// Travel direction through it.
    pub direction: Direction,
}

/// A train end position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionRecord {
    /// Section the end is on.
    pub section: SectionId,
    /// Offset from the entry end.
    pub offset_m: f64,
    /// Travel direction.
    pub direction: Direction,
    /// Index into the active route.
    pub route_index: u32,
}

/// An end of authority.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AuthorityRecord {
    /// Authority type tag.
    pub kind: u8,
    /// Distance from the train end, in metres.
    pub distance_m: f64,
}

/// Control mode and the data that goes with it.
///
/// Automatic modes use slot 0 of `routes`, `last_reserved` and
/// `authority`; manual modes use slot 0 for the forward and slot 1 for
/// the rearward direction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ControlRecord {
    /// Mode tag.
    pub mode: u8,
    /// Resumable mode tag for OutOfControl and TurnTable.
    pub previous: u8,
    /// Cause, when out of control.
    pub cause: Option<OutOfControlCause>,
    /// Directional routes.
    pub routes: [Vec<ElementRecord>; 2],
    /// Last reserved route index per direction.
    pub last_reserved: [u32; 2],
    /// End of authority per direction.
    pub authority: [AuthorityRecord; 2],
}

// ── Speed and lookahead ────────────────────────────────────────────

/// A speed change waiting for the train to clear the item that caused it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingRecord {
    /// Which limit is changed (tag).
    pub target: u8,
    /// Whether the change reverts to the previous limit.
    pub reset: bool,
    /// The new limit; ignored when `reset`.
    pub limit: SpeedLimit,
    /// Distance still to travel before the change applies.
    pub remaining_m: f64,
}

/// Speed limits in force.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpeedRecord {
    /// Limit conveyed by the last signal.
    pub signal: Option<SpeedLimit>,
    /// Standing line speed.
    pub standing: Option<SpeedLimit>,
    /// Standing limit before the current one.
    pub previous_standing: Option<SpeedLimit>,
    /// Temporary restriction.
    pub temporary: Option<SpeedLimit>,
    /// Temporary restriction before the current one.
    pub previous_temporary: Option<SpeedLimit>,
    /// Which of signal and standing limits was passed last (tag).
    pub last_passed: u8,
    /// Queued increases.
    pub pending: Vec<PendingRecord>,
}

/// One lookahead item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemRecord {
    /// 0 for a signal, 1 for a speed post.
    pub kind: u8,
    /// Signal or speed post id.
    pub object: u32,
    /// Route element holding the item.
    pub route_index: u32,
    /// Offset within that element.
    pub offset_m: f64,
    /// Distance from the train front.
    pub distance_m: f64,
    /// Distance from the previous item.
    pub gap_m: f64,
    /// Last observed aspect tag.
    pub aspect: u8,
}

/// The lookahead deque.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LookaheadRecord {
    /// Items, nearest first.
    pub items: Vec<ItemRecord>,
    /// Route position scanned up to.
    pub scanned: Option<(u32, f64)>,
}

// ── Paths and trains ───────────────────────────────────────────────

/// A detour attached to a path.
#[derive(Clone, Debug, PartialEq)]
pub struct AlternativeRecord {
    /// 0 for path-based, 1 for location-based.
    pub kind: u8,
    /// Subpath index or contested section id, per `kind`.
    pub key: u32,
    /// Detour route.
    pub route: Vec<ElementRecord>,
}

/// A scheduled station stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StopRecord {
    /// Subpath index.
    pub subpath: u32,
    /// Station.
    pub station: StationId,
    /// Planned platform.
    pub platform: PlatformId,
    /// Section of the platform.
    pub section: SectionId,
}

/// A train path.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathRecord {
    /// Subpath routes.
    pub subpaths: Vec<Vec<ElementRecord>>,
    /// Detours.
    pub alternatives: Vec<AlternativeRecord>,
    /// Station stops.
    pub stops: Vec<StopRecord>,
}

/// One train.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainRecord {
    /// Train id.
    pub id: TrainId,
    /// Service class.
    pub class: TrainClass,
    /// Length in metres.
    pub length_m: f64,
    /// Maximum speed in m/s.
    pub max_speed_mps: f64,
    /// Last reported speed.
    pub speed_mps: f64,
    /// Active subpath.
    pub subpath: u32,
    /// Path, if the train has one.
    pub path: Option<PathRecord>,
    /// Front end.
    pub front: PositionRecord,
    /// Rear end.
    pub rear: PositionRecord,
    /// Control state.
    pub control: ControlRecord,
    /// Speed limits.
    pub speed: SpeedRecord,
    /// Lookahead.
    pub lookahead: LookaheadRecord,
    /// Time blocked by another train.
    pub blocked_s: f64,
    /// Time waiting at a deadlock trap.
    pub deadlock_wait_s: f64,
    /// Emergency brake currently requested.
    pub brake_applied: bool,
}
