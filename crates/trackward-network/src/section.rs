//! Static section topology.

use smallvec::SmallVec;
use trackward_core::{Direction, PlatformId, SectionId, SignalId, SpeedPostId};

/// What kind of track a section is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SectionKind {
    /// Plain track with at most one neighbour per end.
    Normal,
    /// A switch with two legs at one end.
    Junction,
    /// Two switches sharing one section; may have two legs at either end.
    Crossover,
    /// A buffer stop. At least one end is unlinked.
    EndOfTrack,
}

impl SectionKind {
    /// Whether the section carries a switch alignment.
    #[inline]
    pub fn is_switchable(self) -> bool {
        matches!(self, Self::Junction | Self::Crossover)
    }

    /// Stable numeric tag used by the persistence codec.
    pub fn tag(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Junction => 1,
            Self::Crossover => 2,
            Self::EndOfTrack => 3,
        }
    }
}

/// A link from one section end into a neighbouring section.
///
/// `direction` is the travel direction the train has inside `section`
/// after crossing the link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pin {
    /// The section entered.
    pub section: SectionId,
    /// Travel direction within the entered section.
    pub direction: Direction,
}

/// A lineside object placed on a section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackObject {
    /// A signal.
    Signal(SignalId),
    /// A speed post or limit-reset board.
    SpeedPost(SpeedPostId),
}

/// A signal or speed post as seen by a train travelling through a section.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SectionItem {
    /// The object.
    pub object: TrackObject,
    /// Distance from the entry end, in the direction the object faces.
    pub offset_m: f64,
}

/// One track circuit section.
///
/// Everything here is fixed once the network is built. The dynamic half
/// lives in [`SectionState`](crate::SectionState).
#[derive(Clone, Debug)]
pub struct Section {
    pub(crate) id: SectionId,
    pub(crate) kind: SectionKind,
    pub(crate) length_m: f64,
    pub(crate) pins: [SmallVec<[Pin; 2]>; 2],
    pub(crate) end_signals: [Option<SignalId>; 2],
    pub(crate) items: [Vec<SectionItem>; 2],
    pub(crate) platforms: SmallVec<[PlatformId; 2]>,
}

impl Section {
    /// This section's id.
    #[inline]
    pub fn id(&self) -> SectionId {
        self.id
    }

    /// The section kind.
    #[inline]
    pub fn kind(&self) -> SectionKind {
        self.kind
    }

    /// Length in metres.
    #[inline]
    pub fn length_m(&self) -> f64 {
        self.length_m
    }

    /// Whether the section carries a switch alignment.
    #[inline]
    pub fn is_switchable(&self) -> bool {
        self.kind.is_switchable()
    }

    /// Sections reachable when leaving this one travelling `direction`.
    pub fn pins(&self, direction: Direction) -> &[Pin] {
        &self.pins[direction.index()]
    }

    /// The signal at the exit end for travel in `direction`, if any.
    pub fn end_signal(&self, direction: Direction) -> Option<SignalId> {
        self.end_signals[direction.index()]
    }

    /// Items facing `direction`, nearest to the entry end first.
    pub fn items(&self, direction: Direction) -> &[SectionItem] {
        &self.items[direction.index()]
    }

    /// Platforms located on this section.
    pub fn platforms(&self) -> &[PlatformId] {
        &self.platforms
    }

    /// Whether the exit end for `direction` has two legs.
    #[inline]
    pub fn is_facing_switch(&self, direction: Direction) -> bool {
        self.pins[direction.index()].len() == 2
    }

    /// Leg index of `target` among the pins leaving in `direction`.
    ///
    /// Returns `None` if `target` is not a neighbour at that end.
    pub fn leg_to(&self, direction: Direction, target: SectionId) -> Option<u8> {
        self.pins[direction.index()]
            .iter()
            .position(|p| p.section == target)
            .map(|i| i as u8)
    }
}
