//! Fault taxonomy for the movement-authority engine.
//!
//! Organised by how the fault is handled:
//!
//! - [`RoutingFault`]: recoverable by rebuilding the route.
//! - [`OutOfControlCause`]: authority violations. Always fatal for the
//!   current mode: the train enters OutOfControl and the emergency brake is
//!   requested.
//! - [`CommandRejection`]: an interactive command was refused. Reported to
//!   the caller, never fatal.
//!
//! Resource contention (a section held by another train, a deadlock wait)
//! is resolved inside the engine and has no error type.

use std::error::Error;
use std::fmt;

use crate::id::{SectionId, SignalId, TrainId};

/// A route could not be built or followed. Cleared by rebuilding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoutingFault {
    /// No section could be reached from the start position.
    NoPathFound {
        /// Section the scan started from.
        from: SectionId,
    },
    /// The train occupies a section that is not part of its route.
    OffPath {
        /// The section the train was found on.
        section: SectionId,
    },
    /// The active subpath ran out before the train reached its end.
    RouteExhausted {
        /// Index of the exhausted subpath.
        subpath: usize,
    },
}

impl fmt::Display for RoutingFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPathFound { from } => write!(f, "no path found from section {from}"),
            Self::OffPath { section } => write!(f, "train is off its path at section {section}"),
            Self::RouteExhausted { subpath } => write!(f, "route exhausted in subpath {subpath}"),
        }
    }
}

impl Error for RoutingFault {}

/// Why a train was forced into OutOfControl.
///
/// Only [`PassedAtDanger`](Self::PassedAtDanger),
/// [`RearPassedAtDanger`](Self::RearPassedAtDanger) and
/// [`MisalignedSwitch`](Self::MisalignedSwitch) allow a return to the
/// previous mode; every other cause requires re-synchronisation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutOfControlCause {
    /// The front passed a stop-aspect signal without permission.
    PassedAtDanger,
    /// The rear slid backward past a stop-aspect signal.
    RearPassedAtDanger,
    /// The train ran through a switch set against it.
    MisalignedSwitch,
    /// The train moved beyond its end of authority.
    OutOfAuthority,
    /// The train is on a section outside its route.
    OutOfPath,
    /// The train slid backward into a section held by another train.
    SlippedIntoPath,
    /// The train slid backward off the end of the track.
    SlippedToEndOfTrack,
}

impl OutOfControlCause {
    /// Whether the train may return to its previous mode once stopped.
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            Self::PassedAtDanger | Self::RearPassedAtDanger | Self::MisalignedSwitch
        )
    }

    /// Stable numeric tag used by the persistence codec.
    pub fn tag(self) -> u8 {
        match self {
            Self::PassedAtDanger => 0,
            Self::RearPassedAtDanger => 1,
            Self::MisalignedSwitch => 2,
            Self::OutOfAuthority => 3,
            Self::OutOfPath => 4,
            Self::SlippedIntoPath => 5,
            Self::SlippedToEndOfTrack => 6,
        }
    }

    /// Inverse of [`tag`](Self::tag).
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => Self::PassedAtDanger,
            1 => Self::RearPassedAtDanger,
            2 => Self::MisalignedSwitch,
            3 => Self::OutOfAuthority,
            4 => Self::OutOfPath,
            5 => Self::SlippedIntoPath,
            6 => Self::SlippedToEndOfTrack,
            _ => return None,
        })
    }
}

impl fmt::Display for OutOfControlCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PassedAtDanger => write!(f, "signal passed at danger"),
            Self::RearPassedAtDanger => write!(f, "rear of train passed signal at danger"),
            Self::MisalignedSwitch => write!(f, "train ran through a misaligned switch"),
            Self::OutOfAuthority => write!(f, "train passed its end of authority"),
            Self::OutOfPath => write!(f, "train left its path"),
            Self::SlippedIntoPath => write!(f, "train slipped into the path of another train"),
            Self::SlippedToEndOfTrack => write!(f, "train slipped off the end of the track"),
        }
    }
}

/// Why an interactive command was refused.
///
/// The `Display` text is the user-facing reason.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandRejection {
    /// The command names a train the dispatcher does not know.
    UnknownTrain,
    /// The rear of the train is not on its original path.
    RearOffPath,
    /// Train direction differs from path direction while moving.
    DirectionMismatch,
    /// The train has no path to resume automatic control on.
    NoPathToResume,
    /// The command only applies to trains under manual or explorer control.
    NotInManualControl,
    /// No switch was found ahead in the requested direction.
    NoSwitchFound,
    /// The switch is occupied.
    SwitchOccupied {
        /// The occupied switch section.
        section: SectionId,
    },
    /// The switch is reserved by another train.
    SwitchReserved {
        /// The reserved switch section.
        section: SectionId,
        /// The holder of the reservation.
        by: TrainId,
    },
    /// No signal was found ahead in the requested direction.
    NoSignalFound,
    /// The signal is already enabled for another train.
    SignalEnabledForOtherTrain {
        /// The signal concerned.
        signal: SignalId,
        /// The train it is enabled for.
        train: TrainId,
    },
    /// The signal ahead is not enabled for this train, so there is nothing to reset.
    SignalNotEnabled {
        /// The signal concerned.
        signal: SignalId,
    },
    /// The command requires the train to be stationary.
    NotAtStandstill,
    /// The train is not under OutOfControl.
    NotOutOfControl,
    /// The command is not valid in the train's current control mode.
    InvalidInMode,
    /// The ingress queue is at capacity.
    QueueFull,
}

impl fmt::Display for CommandRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTrain => write!(f, "unknown train"),
            Self::RearOffPath => {
                write!(f, "rear of train is not on its path; cannot switch mode")
            }
            Self::DirectionMismatch => {
                write!(f, "train direction does not match path direction while moving")
            }
            Self::NoPathToResume => write!(f, "train has no path to resume"),
            Self::NotInManualControl => write!(f, "train is not under manual control"),
            Self::NoSwitchFound => write!(f, "no switch found"),
            Self::SwitchOccupied { section } => write!(f, "switch {section} is occupied"),
            Self::SwitchReserved { section, by } => {
                write!(f, "switch {section} is reserved by train {by}")
            }
            Self::NoSignalFound => write!(f, "no signal found"),
            Self::SignalEnabledForOtherTrain { signal, train } => {
                write!(f, "signal {signal} is enabled for train {train}")
            }
            Self::SignalNotEnabled { signal } => {
                write!(f, "signal {signal} is not cleared for this train")
            }
            Self::NotAtStandstill => write!(f, "train must be stopped"),
            Self::NotOutOfControl => write!(f, "train is not out of control"),
            Self::InvalidInMode => write!(f, "command not valid in current control mode"),
            Self::QueueFull => write!(f, "command queue full"),
        }
    }
}

impl Error for CommandRejection {}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_CAUSES: [OutOfControlCause; 7] = [
        OutOfControlCause::PassedAtDanger,
        OutOfControlCause::RearPassedAtDanger,
        OutOfControlCause::MisalignedSwitch,
        OutOfControlCause::OutOfAuthority,
        OutOfControlCause::OutOfPath,
        OutOfControlCause::SlippedIntoPath,
        OutOfControlCause::SlippedToEndOfTrack,
    ];

    #[test]
    fn only_three_causes_are_recoverable() {
        let recoverable: Vec<_> = ALL_CAUSES
            .iter()
            .copied()
            .filter(|c| c.is_recoverable())
            .collect();
        assert_eq!(
            recoverable,
            vec![
                OutOfControlCause::PassedAtDanger,
                OutOfControlCause::RearPassedAtDanger,
                OutOfControlCause::MisalignedSwitch,
            ]
        );
    }

    #[test]
    fn cause_tags_round_trip() {
        for cause in ALL_CAUSES {
            assert_eq!(OutOfControlCause::from_tag(cause.tag()), Some(cause));
        }
        assert_eq!(OutOfControlCause::from_tag(200), None);
    }

    #[test]
    fn rejection_display_names_the_holder() {
        let r = CommandRejection::SwitchReserved {
            section: SectionId(4),
            by: TrainId(9),
        };
        assert_eq!(r.to_string(), "switch 4 is reserved by train 9");
    }
}
