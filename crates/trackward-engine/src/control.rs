//! Control modes and the transition table.
//!
//! A train is always in exactly one [`ControlState`]. Mode changes go
//! through [`transition`], which is the only place the allowed moves are
//! written down; callers apply the returned [`ControlMode`] by tearing down
//! the old reservations and building the new mode's state.

use std::fmt;

use trackward_core::{CommandRejection, Direction, OutOfControlCause};
use trackward_route::Route;

use crate::authority::EndAuthority;

// ── Mode payloads ──────────────────────────────────────────────────

/// State of a train under automatic control.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AutoControl {
    /// Active route, a copy of the current subpath.
    pub route: Route,
    /// Index of the farthest reserved element.
    pub last_reserved: usize,
    /// Current end of authority.
    pub authority: EndAuthority,
}

/// State of a train under manual or explorer control.
///
/// Index 0 runs ahead of the front, index 1 back from the rear.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ManualControl {
    /// Directional routes.
    pub routes: [Route; 2],
    /// Farthest reserved element per route.
    pub last_reserved: [usize; 2],
    /// Authority per direction.
    pub authority: [EndAuthority; 2],
}

impl ManualControl {
    /// The route for travel in `direction` relative to the train.
    pub fn route(&self, direction: Direction) -> &Route {
        &self.routes[direction.index()]
    }
}

// ── ControlState ───────────────────────────────────────────────────

/// Modes a train can return to after OutOfControl or a turntable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResumableMode {
    /// Automatic signal control.
    AutoSignal,
    /// Automatic node control.
    AutoNode,
    /// Manual control.
    Manual,
    /// Explorer control.
    Explorer,
}

impl ResumableMode {
    /// The mode this resumes into.
    pub fn mode(self) -> ControlMode {
        match self {
            Self::AutoSignal => ControlMode::AutoSignal,
            Self::AutoNode => ControlMode::AutoNode,
            Self::Manual => ControlMode::Manual,
            Self::Explorer => ControlMode::Explorer,
        }
    }

    /// Stable numeric tag, shared with [`ControlMode::tag`].
    pub fn tag(self) -> u8 {
        self.mode().tag()
    }

    /// Inverse of [`tag`](Self::tag).
    pub fn from_tag(tag: u8) -> Option<Self> {
        match ControlMode::from_tag(tag)? {
            ControlMode::AutoSignal => Some(Self::AutoSignal),
            ControlMode::AutoNode => Some(Self::AutoNode),
            ControlMode::Manual => Some(Self::Manual),
            ControlMode::Explorer => Some(Self::Explorer),
            _ => None,
        }
    }
}

/// The control state of one train.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ControlState {
    /// Following the path, authority negotiated with signals.
    AutoSignal(AutoControl),
    /// Following the path, authority limited to reserved track.
    AutoNode(AutoControl),
    /// Driver-controlled, signals respected.
    Manual(ManualControl),
    /// Driver-controlled, signals ignored.
    Explorer(ManualControl),
    /// Stopped after an authority violation.
    OutOfControl {
        /// What went wrong.
        cause: OutOfControlCause,
        /// Mode to return to on recovery.
        previous: ResumableMode,
    },
    /// Handed to a turntable.
    TurnTable {
        /// Mode to return to when released.
        previous: ResumableMode,
    },
    /// Not yet activated.
    #[default]
    Undefined,
}

/// Discriminant of [`ControlState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlMode {
    /// See [`ControlState::AutoSignal`].
    AutoSignal,
    /// See [`ControlState::AutoNode`].
    AutoNode,
    /// See [`ControlState::Manual`].
    Manual,
    /// See [`ControlState::Explorer`].
    Explorer,
    /// See [`ControlState::OutOfControl`].
    OutOfControl,
    /// See [`ControlState::TurnTable`].
    TurnTable,
    /// See [`ControlState::Undefined`].
    Undefined,
}

impl ControlMode {
    /// Stable numeric tag used by the persistence codec.
    pub fn tag(self) -> u8 {
        match self {
            Self::AutoSignal => 0,
            Self::AutoNode => 1,
            Self::Manual => 2,
            Self::Explorer => 3,
            Self::OutOfControl => 4,
            Self::TurnTable => 5,
            Self::Undefined => 6,
        }
    }

    /// Inverse of [`tag`](Self::tag).
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => Self::AutoSignal,
            1 => Self::AutoNode,
            2 => Self::Manual,
            3 => Self::Explorer,
            4 => Self::OutOfControl,
            5 => Self::TurnTable,
            6 => Self::Undefined,
            _ => return None,
        })
    }

    /// Whether this is one of the automatic modes.
    pub fn is_auto(self) -> bool {
        matches!(self, Self::AutoSignal | Self::AutoNode)
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AutoSignal => "auto-signal",
            Self::AutoNode => "auto-node",
            Self::Manual => "manual",
            Self::Explorer => "explorer",
            Self::OutOfControl => "out-of-control",
            Self::TurnTable => "turntable",
            Self::Undefined => "undefined",
        };
        f.write_str(s)
    }
}

impl ControlState {
    /// The current mode.
    pub fn mode(&self) -> ControlMode {
        match self {
            Self::AutoSignal(_) => ControlMode::AutoSignal,
            Self::AutoNode(_) => ControlMode::AutoNode,
            Self::Manual(_) => ControlMode::Manual,
            Self::Explorer(_) => ControlMode::Explorer,
            Self::OutOfControl { .. } => ControlMode::OutOfControl,
            Self::TurnTable { .. } => ControlMode::TurnTable,
            Self::Undefined => ControlMode::Undefined,
        }
    }

    /// The automatic-control payload, if in an automatic mode.
    pub fn auto(&self) -> Option<&AutoControl> {
        match self {
            Self::AutoSignal(a) | Self::AutoNode(a) => Some(a),
            _ => None,
        }
    }

    /// Mutable form of [`auto`](Self::auto).
    pub fn auto_mut(&mut self) -> Option<&mut AutoControl> {
        match self {
            Self::AutoSignal(a) | Self::AutoNode(a) => Some(a),
            _ => None,
        }
    }

    /// The manual-control payload, if in Manual or Explorer.
    pub fn manual(&self) -> Option<&ManualControl> {
        match self {
            Self::Manual(m) | Self::Explorer(m) => Some(m),
            _ => None,
        }
    }

    /// Mutable form of [`manual`](Self::manual).
    pub fn manual_mut(&mut self) -> Option<&mut ManualControl> {
        match self {
            Self::Manual(m) | Self::Explorer(m) => Some(m),
            _ => None,
        }
    }

    /// The mode a fault or turntable would later resume into.
    pub fn resumable(&self) -> Option<ResumableMode> {
        match self {
            Self::AutoSignal(_) => Some(ResumableMode::AutoSignal),
            Self::AutoNode(_) => Some(ResumableMode::AutoNode),
            Self::Manual(_) => Some(ResumableMode::Manual),
            Self::Explorer(_) => Some(ResumableMode::Explorer),
            _ => None,
        }
    }

    /// Every route this state holds reservations along.
    pub fn routes(&self) -> Vec<&Route> {
        match self {
            Self::AutoSignal(a) | Self::AutoNode(a) => vec![&a.route],
            Self::Manual(m) | Self::Explorer(m) => m.routes.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Switch between the two automatic modes, keeping the payload.
    ///
    /// Does nothing outside automatic control.
    pub fn set_auto_mode(&mut self, signal: bool) {
        let taken = std::mem::take(self);
        *self = match taken {
            Self::AutoSignal(a) | Self::AutoNode(a) => {
                if signal {
                    Self::AutoSignal(a)
                } else {
                    Self::AutoNode(a)
                }
            }
            other => other,
        };
    }
}

// ── Transitions ────────────────────────────────────────────────────

/// Something that may move a train to another mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlEvent {
    /// First update after the train was added.
    Activate {
        /// The train has a path to follow.
        has_path: bool,
    },
    /// A signal ahead is fully cleared for the train.
    SignalCleared,
    /// Signal control cannot continue.
    SignalUnavailable,
    /// An authority violation.
    Violation(OutOfControlCause),
    /// The driver asked to toggle manual control.
    ToggleManual {
        /// The train has a path to return to.
        has_path: bool,
        /// The rear (and front) lie on the path.
        rear_on_path: bool,
        /// The train faces the path direction.
        direction_matches: bool,
        /// The train is stopped.
        standstill: bool,
    },
    /// The driver asked to leave OutOfControl.
    ResetOutOfControl {
        /// The train is stopped.
        standstill: bool,
    },
    /// A turntable took the train.
    TurntableEngaged,
    /// The turntable released the train.
    TurntableReleased,
}

/// Why [`transition`] refused an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionRejected {
    /// A driver command was refused; the reason goes back in the receipt.
    Command(CommandRejection),
    /// The event has no meaning in the current mode.
    NotApplicable,
}

impl fmt::Display for TransitionRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(r) => write!(f, "{r}"),
            Self::NotApplicable => write!(f, "event not applicable in current mode"),
        }
    }
}

impl std::error::Error for TransitionRejected {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Command(r) => Some(r),
            Self::NotApplicable => None,
        }
    }
}

/// The mode `state` moves to on `event`.
pub fn transition(state: &ControlState, event: ControlEvent) -> Result<ControlMode, TransitionRejected> {
    use ControlEvent as E;
    use ControlMode as M;
    use TransitionRejected::{Command, NotApplicable};

    let mode = state.mode();
    match (mode, event) {
        (M::Undefined, E::Activate { has_path: true }) => Ok(M::AutoNode),
        (M::Undefined, E::Activate { has_path: false }) => Ok(M::Explorer),
        (_, E::Activate { .. }) => Err(NotApplicable),

        (M::AutoSignal | M::AutoNode, E::SignalCleared) => Ok(M::AutoSignal),
        (M::AutoSignal | M::AutoNode, E::SignalUnavailable) => Ok(M::AutoNode),
        (_, E::SignalCleared | E::SignalUnavailable) => Err(NotApplicable),

        (M::AutoSignal | M::AutoNode | M::Manual | M::Explorer, E::Violation(_)) => {
            Ok(M::OutOfControl)
        }
        (_, E::Violation(_)) => Err(NotApplicable),

        (M::AutoSignal | M::AutoNode, E::ToggleManual { rear_on_path, .. }) => {
            if rear_on_path {
                Ok(M::Manual)
            } else {
                Err(Command(CommandRejection::RearOffPath))
            }
        }
        (
            M::Manual | M::Explorer,
            E::ToggleManual {
                has_path,
                rear_on_path,
                direction_matches,
                standstill,
            },
        ) => {
            if !has_path {
                Err(Command(CommandRejection::NoPathToResume))
            } else if !rear_on_path {
                Err(Command(CommandRejection::RearOffPath))
            } else if !direction_matches && !standstill {
                Err(Command(CommandRejection::DirectionMismatch))
            } else {
                Ok(M::AutoNode)
            }
        }
        (_, E::ToggleManual { .. }) => Err(Command(CommandRejection::InvalidInMode)),

        (M::OutOfControl, E::ResetOutOfControl { standstill }) => {
            let ControlState::OutOfControl { cause, previous } = state else {
                return Err(NotApplicable);
            };
            if !standstill {
                Err(Command(CommandRejection::NotAtStandstill))
            } else if cause.is_recoverable() {
                Ok(previous.mode())
            } else {
                Ok(M::Manual)
            }
        }
        (_, E::ResetOutOfControl { .. }) => Err(Command(CommandRejection::NotOutOfControl)),

        (M::AutoSignal | M::AutoNode | M::Manual | M::Explorer, E::TurntableEngaged) => {
            Ok(M::TurnTable)
        }
        (_, E::TurntableEngaged) => Err(Command(CommandRejection::InvalidInMode)),

        (M::TurnTable, E::TurntableReleased) => match state {
            ControlState::TurnTable { previous } => Ok(previous.mode()),
            _ => Err(NotApplicable),
        },
        (_, E::TurntableReleased) => Err(Command(CommandRejection::InvalidInMode)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auto_node() -> ControlState {
        ControlState::AutoNode(AutoControl::default())
    }

    fn ooc(cause: OutOfControlCause) -> ControlState {
        ControlState::OutOfControl {
            cause,
            previous: ResumableMode::AutoSignal,
        }
    }

    fn toggle(rear_on_path: bool, direction_matches: bool, standstill: bool) -> ControlEvent {
        ControlEvent::ToggleManual {
            has_path: true,
            rear_on_path,
            direction_matches,
            standstill,
        }
    }

    #[test]
    fn activation_depends_on_path() {
        let s = ControlState::Undefined;
        assert_eq!(transition(&s, ControlEvent::Activate { has_path: true }), Ok(ControlMode::AutoNode));
        assert_eq!(transition(&s, ControlEvent::Activate { has_path: false }), Ok(ControlMode::Explorer));
    }

    #[test]
    fn node_and_signal_swap() {
        assert_eq!(transition(&auto_node(), ControlEvent::SignalCleared), Ok(ControlMode::AutoSignal));
        let s = ControlState::AutoSignal(AutoControl::default());
        assert_eq!(transition(&s, ControlEvent::SignalUnavailable), Ok(ControlMode::AutoNode));
    }

    #[test]
    fn manual_needs_rear_on_path() {
        assert_eq!(
            transition(&auto_node(), toggle(false, true, true)),
            Err(TransitionRejected::Command(CommandRejection::RearOffPath))
        );
        assert_eq!(transition(&auto_node(), toggle(true, true, false)), Ok(ControlMode::Manual));
    }

    #[test]
    fn back_to_auto_checks_direction_at_speed() {
        let s = ControlState::Manual(ManualControl::default());
        assert_eq!(
            transition(&s, toggle(true, false, false)),
            Err(TransitionRejected::Command(CommandRejection::DirectionMismatch))
        );
        assert_eq!(transition(&s, toggle(true, false, true)), Ok(ControlMode::AutoNode));
        let no_path = ControlEvent::ToggleManual {
            has_path: false,
            rear_on_path: true,
            direction_matches: true,
            standstill: true,
        };
        assert_eq!(
            transition(&s, no_path),
            Err(TransitionRejected::Command(CommandRejection::NoPathToResume))
        );
    }

    #[test]
    fn recoverable_causes_resume_previous_mode() {
        let s = ooc(OutOfControlCause::PassedAtDanger);
        assert_eq!(
            transition(&s, ControlEvent::ResetOutOfControl { standstill: true }),
            Ok(ControlMode::AutoSignal)
        );
        assert_eq!(
            transition(&s, ControlEvent::ResetOutOfControl { standstill: false }),
            Err(TransitionRejected::Command(CommandRejection::NotAtStandstill))
        );
    }

    #[test]
    fn other_causes_recover_into_manual() {
        let s = ooc(OutOfControlCause::SlippedIntoPath);
        assert_eq!(
            transition(&s, ControlEvent::ResetOutOfControl { standstill: true }),
            Ok(ControlMode::Manual)
        );
    }

    #[test]
    fn reset_outside_fault_is_rejected() {
        assert_eq!(
            transition(&auto_node(), ControlEvent::ResetOutOfControl { standstill: true }),
            Err(TransitionRejected::Command(CommandRejection::NotOutOfControl))
        );
    }

    #[test]
    fn violation_in_fault_is_ignored() {
        let s = ooc(OutOfControlCause::OutOfPath);
        assert_eq!(
            transition(&s, ControlEvent::Violation(OutOfControlCause::PassedAtDanger)),
            Err(TransitionRejected::NotApplicable)
        );
    }

    #[test]
    fn turntable_restores_previous() {
        assert_eq!(transition(&auto_node(), ControlEvent::TurntableEngaged), Ok(ControlMode::TurnTable));
        let s = ControlState::TurnTable {
            previous: ResumableMode::Manual,
        };
        assert_eq!(transition(&s, ControlEvent::TurntableReleased), Ok(ControlMode::Manual));
    }

    #[test]
    fn auto_mode_flip_keeps_payload() {
        let mut s = ControlState::AutoNode(AutoControl {
            last_reserved: 4,
            ..AutoControl::default()
        });
        s.set_auto_mode(true);
        assert_eq!(s.mode(), ControlMode::AutoSignal);
        assert_eq!(s.auto().map(|a| a.last_reserved), Some(4));
    }

    #[test]
    fn mode_tags_round_trip() {
        for tag in 0..7 {
            let mode = ControlMode::from_tag(tag).expect("tag in range");
            assert_eq!(mode.tag(), tag);
        }
        assert_eq!(ResumableMode::from_tag(4), None);
        assert_eq!(ResumableMode::from_tag(3), Some(ResumableMode::Explorer));
    }
}
