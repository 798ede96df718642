//! Signals and their dynamic state.
//!
//! A [`Signal`] is placed on a section facing one travel direction. Its
//! [`SignalState`] records which train it is cleared for, the sections it
//! protects, and whether the host is holding it at stop.

use smallvec::SmallVec;
use trackward_core::{Direction, SectionId, SignalId, SpeedLimit, TrainId};

/// Displayed aspect, most restrictive first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Aspect {
    /// Do not pass.
    #[default]
    Stop,
    /// Proceed at restricted speed; the line ahead may be occupied.
    Restricting,
    /// Proceed, prepared to stop at the next signal.
    Approach,
    /// Proceed.
    Clear,
}

impl Aspect {
    /// Stable numeric tag used by the persistence codec.
    pub fn tag(self) -> u8 {
        match self {
            Self::Stop => 0,
            Self::Restricting => 1,
            Self::Approach => 2,
            Self::Clear => 3,
        }
    }

    /// Inverse of [`tag`](Self::tag).
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => Self::Stop,
            1 => Self::Restricting,
            2 => Self::Approach,
            3 => Self::Clear,
            _ => return None,
        })
    }
}

/// Speed conveyed by a signal aspect.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum SignalSpeed {
    /// The aspect says nothing about speed.
    #[default]
    Unchanged,
    /// The aspect imposes a limit.
    Limit(SpeedLimit),
    /// The aspect lifts any signal-imposed limit.
    Reset,
}

/// Conveyed speed for each proceed aspect.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AspectSpeeds {
    /// Speed conveyed by [`Aspect::Restricting`].
    pub restricting: SignalSpeed,
    /// Speed conveyed by [`Aspect::Approach`].
    pub approach: SignalSpeed,
    /// Speed conveyed by [`Aspect::Clear`].
    pub clear: SignalSpeed,
}

impl AspectSpeeds {
    /// The speed conveyed when showing `aspect`. Stop conveys nothing.
    pub fn for_aspect(&self, aspect: Aspect) -> SignalSpeed {
        match aspect {
            Aspect::Stop => SignalSpeed::Unchanged,
            Aspect::Restricting => self.restricting,
            Aspect::Approach => self.approach,
            Aspect::Clear => self.clear,
        }
    }
}

/// A signal placed on the network.
#[derive(Clone, Debug, PartialEq)]
pub struct Signal {
    /// This signal's id.
    pub id: SignalId,
    /// Section the signal stands on.
    pub section: SectionId,
    /// Travel direction the signal faces.
    pub direction: Direction,
    /// Distance from the entry end of `section` in `direction`.
    pub offset_m: f64,
    /// Speeds conveyed per aspect.
    pub speeds: AspectSpeeds,
}

/// Host-imposed hold on a signal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SignalHold {
    /// No hold; the signal clears normally.
    #[default]
    None,
    /// The signal stays at stop regardless of the route ahead.
    Stop,
}

/// Dynamic state of a signal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SignalState {
    /// Current aspect.
    pub aspect: Aspect,
    /// Train the signal has been cleared (or requested) for.
    pub enabled_for: Option<TrainId>,
    /// Host hold.
    pub hold: SignalHold,
    /// Train granted permission to pass at stop.
    pub permission_for: Option<TrainId>,
    /// Sections reserved under this signal's protection, in route order.
    pub governed: SmallVec<[SectionId; 4]>,
    /// Next signal along the governed route, if it was reached.
    pub next_signal: Option<SignalId>,
}

impl SignalState {
    /// Whether the signal may be passed by `train` right now.
    pub fn admits(&self, train: TrainId) -> bool {
        self.permission_for == Some(train)
            || (self.aspect != Aspect::Stop && self.enabled_for == Some(train))
    }

    /// Whether the signal is held at stop by the host.
    #[inline]
    pub fn is_held(&self) -> bool {
        self.hold == SignalHold::Stop
    }

    /// Return the signal to stop and forget its train.
    ///
    /// The hold survives a reset.
    pub fn reset(&mut self) {
        self.aspect = Aspect::Stop;
        self.enabled_for = None;
        self.permission_for = None;
        self.governed.clear();
        self.next_signal = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_signal_admits_only_with_permission() {
        let mut s = SignalState {
            enabled_for: Some(TrainId(1)),
            ..SignalState::default()
        };
        assert!(!s.admits(TrainId(1)));
        s.permission_for = Some(TrainId(1));
        assert!(s.admits(TrainId(1)));
        assert!(!s.admits(TrainId(2)));
    }

    #[test]
    fn cleared_signal_admits_its_train() {
        let s = SignalState {
            aspect: Aspect::Clear,
            enabled_for: Some(TrainId(4)),
            ..SignalState::default()
        };
        assert!(s.admits(TrainId(4)));
        assert!(!s.admits(TrainId(5)));
    }

    #[test]
    fn reset_keeps_hold() {
        let mut s = SignalState {
            aspect: Aspect::Approach,
            enabled_for: Some(TrainId(1)),
            hold: SignalHold::Stop,
            ..SignalState::default()
        };
        s.governed.push(SectionId(3));
        s.reset();
        assert_eq!(s.aspect, Aspect::Stop);
        assert_eq!(s.enabled_for, None);
        assert!(s.governed.is_empty());
        assert!(s.is_held());
    }

    #[test]
    fn stop_conveys_no_speed() {
        let speeds = AspectSpeeds {
            restricting: SignalSpeed::Limit(SpeedLimit::uniform(5.0)),
            approach: SignalSpeed::Reset,
            clear: SignalSpeed::Unchanged,
        };
        assert_eq!(speeds.for_aspect(Aspect::Stop), SignalSpeed::Unchanged);
        assert_eq!(
            speeds.for_aspect(Aspect::Restricting),
            SignalSpeed::Limit(SpeedLimit::uniform(5.0))
        );
    }
}
