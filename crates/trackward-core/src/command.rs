//! Interactive commands and their receipts.

use crate::direction::Direction;
use crate::error::CommandRejection;
use crate::id::{TickId, TrainId};

/// An interactive command addressed to one train.
///
/// Commands are ordered by `priority_class` (lower = higher priority), then
/// by train id, then by `arrival_seq` as a final tiebreaker.
///
/// # Examples
///
/// ```
/// use trackward_core::{Command, CommandPayload, Direction, TrainId};
///
/// let cmd = Command {
///     train: TrainId(1),
///     payload: CommandPayload::RequestSignalPermission {
///         direction: Direction::Ahead,
///     },
///     priority_class: 1,
///     arrival_seq: 0,
/// };
/// assert_eq!(cmd.train, TrainId(1));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    /// The train the command is addressed to.
    pub train: TrainId,
    /// The operation to perform.
    pub payload: CommandPayload,
    /// Priority class. Lower values = higher priority.
    /// 0 = dispatcher, 1 = driver default.
    pub priority_class: u8,
    /// Monotonic arrival sequence number, set by the ingress queue.
    pub arrival_seq: u64,
}

impl Command {
    /// A driver-priority command for `train`.
    pub fn driver(train: TrainId, payload: CommandPayload) -> Self {
        Self {
            train,
            payload,
            priority_class: 1,
            arrival_seq: 0,
        }
    }
}

/// All interactive command payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandPayload {
    /// Switch between automatic and manual control.
    ToggleManual,
    /// Throw the first switch ahead of the train in `direction`.
    SetSwitch {
        /// Search direction relative to the train.
        direction: Direction,
    },
    /// Ask for permission to pass the next signal at stop.
    RequestSignalPermission {
        /// Search direction relative to the train.
        direction: Direction,
    },
    /// Return the next signal cleared for this train to stop.
    ResetSignal {
        /// Search direction relative to the train.
        direction: Direction,
    },
    /// Leave OutOfControl once the train is stopped.
    ResetOutOfControl,
    /// The turntable controller engages (`true`) or releases (`false`) the train.
    Turntable {
        /// Whether the train is now on the turntable.
        engage: bool,
    },
}

/// Receipt returned for each command in a submitted batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// Whether the command was accepted.
    pub accepted: bool,
    /// The tick at which the command was applied, if applicable.
    pub applied_tick_id: Option<TickId>,
    /// The user-facing reason the command was rejected, if applicable.
    pub rejection: Option<CommandRejection>,
    /// Index of this command within the submitted batch.
    pub command_index: usize,
}

impl Receipt {
    /// Receipt for a command rejected before it was applied.
    pub fn rejected(command_index: usize, reason: CommandRejection) -> Self {
        Self {
            accepted: false,
            applied_tick_id: None,
            rejection: Some(reason),
            command_index,
        }
    }
}
