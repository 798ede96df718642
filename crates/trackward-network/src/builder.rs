//! Network construction and topology validation.

use smallvec::SmallVec;
use trackward_core::{Direction, PlatformId, SectionId, SignalId, SpeedLimit, SpeedPostId, StationId};

use crate::error::NetworkError;
use crate::network::TrackNetwork;
use crate::platform::Platform;
use crate::section::{Pin, Section, SectionItem, SectionKind, TrackObject};
use crate::signal::{AspectSpeeds, Signal, SignalState};
use crate::speedpost::{SpeedPost, SpeedPostKind};
use crate::state::SectionState;

/// Incremental builder for a [`TrackNetwork`].
///
/// `add_*` methods hand out ids immediately; all validation happens in
/// [`build`](Self::build), which reports the first problem found.
///
/// # Examples
///
/// ```
/// use trackward_core::Direction;
/// use trackward_network::{NetworkBuilder, SectionKind};
///
/// let mut b = NetworkBuilder::new();
/// let a = b.add_section(SectionKind::EndOfTrack, 200.0);
/// let c = b.add_section(SectionKind::EndOfTrack, 200.0);
/// b.connect(a, Direction::Ahead, c, Direction::Ahead);
/// let net = b.build().unwrap();
/// assert_eq!(net.next_pin(a, Direction::Ahead).unwrap().section, c);
/// assert_eq!(net.next_pin(c, Direction::Reverse).unwrap().section, a);
/// ```
#[derive(Clone, Debug, Default)]
pub struct NetworkBuilder {
    sections: Vec<(SectionKind, f64)>,
    links: Vec<(SectionId, Direction, SectionId, Direction)>,
    signals: Vec<Signal>,
    speed_posts: Vec<SpeedPost>,
    platforms: Vec<Platform>,
    alignments: Vec<(SectionId, u8)>,
}

impl NetworkBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section and return its id.
    pub fn add_section(&mut self, kind: SectionKind, length_m: f64) -> SectionId {
        let id = SectionId(self.sections.len() as u32);
        self.sections.push((kind, length_m));
        id
    }

    /// Link the exit of `from` (travelling `leaving`) to `to`, entered
    /// travelling `entering`. The reciprocal link is added as well.
    ///
    /// Linking the same end twice to two sections makes it a switch leg;
    /// leg order is link order.
    pub fn connect(
        &mut self,
        from: SectionId,
        leaving: Direction,
        to: SectionId,
        entering: Direction,
    ) -> &mut Self {
        self.links.push((from, leaving, to, entering));
        self
    }

    /// Place a signal facing `direction` at `offset_m` from the entry end.
    pub fn add_signal(
        &mut self,
        section: SectionId,
        direction: Direction,
        offset_m: f64,
        speeds: AspectSpeeds,
    ) -> SignalId {
        let id = SignalId(self.signals.len() as u32);
        self.signals.push(Signal {
            id,
            section,
            direction,
            offset_m,
            speeds,
        });
        id
    }

    /// Place a signal at the exit end of `section` for travel in `direction`.
    pub fn add_end_signal(
        &mut self,
        section: SectionId,
        direction: Direction,
        speeds: AspectSpeeds,
    ) -> SignalId {
        let offset = self
            .sections
            .get(section.index())
            .map(|(_, len)| *len)
            .unwrap_or(f64::NAN);
        self.add_signal(section, direction, offset, speeds)
    }

    /// Place a speed post imposing `limit`.
    pub fn add_speed_post(
        &mut self,
        section: SectionId,
        direction: Direction,
        offset_m: f64,
        kind: SpeedPostKind,
        limit: SpeedLimit,
    ) -> SpeedPostId {
        self.push_post(section, direction, offset_m, kind, limit, false)
    }

    /// Place a board that reverts the `kind` limit to its previous value.
    pub fn add_speed_reset(
        &mut self,
        section: SectionId,
        direction: Direction,
        offset_m: f64,
        kind: SpeedPostKind,
    ) -> SpeedPostId {
        self.push_post(section, direction, offset_m, kind, SpeedLimit::uniform(1.0), true)
    }

    fn push_post(
        &mut self,
        section: SectionId,
        direction: Direction,
        offset_m: f64,
        kind: SpeedPostKind,
        limit: SpeedLimit,
        reset: bool,
    ) -> SpeedPostId {
        let id = SpeedPostId(self.speed_posts.len() as u32);
        self.speed_posts.push(SpeedPost {
            id,
            section,
            direction,
            offset_m,
            kind,
            limit,
            reset,
        });
        id
    }

    /// Add a platform of `station` on `section`.
    pub fn add_platform(
        &mut self,
        station: StationId,
        name: impl Into<String>,
        section: SectionId,
    ) -> PlatformId {
        let id = PlatformId(self.platforms.len() as u32);
        self.platforms.push(Platform {
            id,
            station,
            name: name.into(),
            section,
        });
        id
    }

    /// Initial switch alignment for `section`.
    pub fn set_alignment(&mut self, section: SectionId, leg: u8) -> &mut Self {
        self.alignments.push((section, leg));
        self
    }

    /// Validate and freeze the topology.
    pub fn build(self) -> Result<TrackNetwork, NetworkError> {
        if self.sections.is_empty() {
            return Err(NetworkError::EmptyNetwork);
        }
        let mut sections: Vec<Section> = Vec::with_capacity(self.sections.len());
        for (i, (kind, length_m)) in self.sections.iter().enumerate() {
            let id = SectionId(i as u32);
            if !length_m.is_finite() || *length_m <= 0.0 {
                return Err(NetworkError::InvalidLength {
                    section: id,
                    length_m: *length_m,
                });
            }
            sections.push(Section {
                id,
                kind: *kind,
                length_m: *length_m,
                pins: [SmallVec::new(), SmallVec::new()],
                end_signals: [None, None],
                items: [Vec::new(), Vec::new()],
                platforms: SmallVec::new(),
            });
        }
        let count = sections.len();
        let known = |s: SectionId| -> Result<(), NetworkError> {
            if s.index() < count {
                Ok(())
            } else {
                Err(NetworkError::UnknownSection { section: s })
            }
        };

        // ── Links ──────────────────────────────────────────────────
        let mut pins: Vec<[SmallVec<[Pin; 2]>; 2]> =
            vec![[SmallVec::new(), SmallVec::new()]; sections.len()];
        for &(from, leaving, to, entering) in &self.links {
            known(from)?;
            known(to)?;
            if from == to {
                return Err(NetworkError::SelfLink { section: from });
            }
            push_unique(
                &mut pins[from.index()][leaving.index()],
                Pin {
                    section: to,
                    direction: entering,
                },
            );
            push_unique(
                &mut pins[to.index()][entering.reverse().index()],
                Pin {
                    section: from,
                    direction: leaving.reverse(),
                },
            );
        }
        for (section, p) in sections.iter_mut().zip(pins) {
            for d in Direction::ALL {
                let n = p[d.index()].len();
                if n > 2 {
                    return Err(NetworkError::TooManyPins {
                        section: section.id,
                        direction: d,
                    });
                }
                if n == 2 && !section.is_switchable() {
                    return Err(NetworkError::SwitchableEndOnPlainSection {
                        section: section.id,
                        direction: d,
                    });
                }
            }
            if section.kind == SectionKind::EndOfTrack && !p[0].is_empty() && !p[1].is_empty() {
                return Err(NetworkError::EndOfTrackLinkedBothEnds {
                    section: section.id,
                });
            }
            section.pins = p;
        }

        // ── Items ──────────────────────────────────────────────────
        for signal in &self.signals {
            known(signal.section)?;
            let s = &mut sections[signal.section.index()];
            check_offset(s, signal.offset_m)?;
            if signal.offset_m >= s.length_m {
                s.end_signals[signal.direction.index()] = Some(signal.id);
            }
            s.items[signal.direction.index()].push(SectionItem {
                object: TrackObject::Signal(signal.id),
                offset_m: signal.offset_m,
            });
        }
        for post in &self.speed_posts {
            known(post.section)?;
            if !post.reset && !post.limit.is_valid() {
                return Err(NetworkError::InvalidSpeedLimit { post: post.id });
            }
            let s = &mut sections[post.section.index()];
            check_offset(s, post.offset_m)?;
            s.items[post.direction.index()].push(SectionItem {
                object: TrackObject::SpeedPost(post.id),
                offset_m: post.offset_m,
            });
        }
        for s in &mut sections {
            for items in &mut s.items {
                items.sort_by(|a, b| a.offset_m.total_cmp(&b.offset_m));
            }
        }
        for platform in &self.platforms {
            known(platform.section)?;
            sections[platform.section.index()].platforms.push(platform.id);
        }

        let mut network = TrackNetwork {
            states: vec![SectionState::default(); sections.len()],
            sections,
            signal_states: vec![SignalState::default(); self.signals.len()],
            signals: self.signals,
            speed_posts: self.speed_posts,
            platforms: self.platforms,
        };
        for (section, leg) in self.alignments {
            network.set_alignment(section, leg)?;
        }
        Ok(network)
    }
}

fn push_unique(pins: &mut SmallVec<[Pin; 2]>, pin: Pin) {
    if !pins.contains(&pin) {
        pins.push(pin);
    }
}

fn check_offset(section: &Section, offset_m: f64) -> Result<(), NetworkError> {
    if offset_m.is_finite() && (0.0..=section.length_m).contains(&offset_m) {
        Ok(())
    } else {
        Err(NetworkError::ItemOutOfRange {
            section: section.id,
            offset_m,
        })
    }
}
