//! What crosses the boundary to the physics layer each tick.

use trackward_core::TrainId;

use crate::authority::{EndAuthority, EndAuthorityType};
use crate::config::ControlConfig;
use crate::control::{ControlMode, ControlState};
use crate::train::Train;

/// Movement reported by the physics layer for one train since the last
/// step. Negative distances move the train backward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainMotion {
    /// The train.
    pub train: TrainId,
    /// Signed distance travelled by the front.
    pub distance_m: f64,
    /// Current speed, unsigned.
    pub speed_mps: f64,
}

/// Speed and authority handed back for one train.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainOutput {
    /// The train.
    pub train: TrainId,
    /// Control mode after the step.
    pub mode: ControlMode,
    /// Speed the train may run at.
    pub allowed_speed_mps: f64,
    /// Distance the train may still travel in its direction of motion.
    pub distance_to_stop_m: f64,
    /// Authority ahead of the front.
    pub end_authority: EndAuthority,
    /// Authority behind the rear, for driver-controlled trains.
    pub rear_authority: Option<EndAuthority>,
}

impl TrainOutput {
    /// The same output with speed and authority zeroed.
    pub fn stopped(self) -> Self {
        Self {
            allowed_speed_mps: 0.0,
            distance_to_stop_m: 0.0,
            end_authority: EndAuthority::none(),
            rear_authority: self.rear_authority.map(|_| EndAuthority::none()),
            ..self
        }
    }
}

pub(crate) fn output_for(train: &Train, config: &ControlConfig) -> TrainOutput {
    let allowed = || {
        train
            .speed
            .allowed(config.speed_policy, train.class, train.max_speed_mps)
    };
    let (speed, end, rear) = match &train.control {
        ControlState::OutOfControl { .. } => (0.0, EndAuthority::none(), None),
        ControlState::Undefined => (
            0.0,
            EndAuthority::new(EndAuthorityType::NoPathReserved, 0.0),
            None,
        ),
        ControlState::TurnTable { .. } => (
            config.turntable_speed_mps.min(train.max_speed_mps),
            EndAuthority::new(EndAuthorityType::NoPathReserved, 0.0),
            None,
        ),
        ControlState::AutoSignal(auto) | ControlState::AutoNode(auto) => {
            (allowed(), auto.authority, None)
        }
        ControlState::Manual(m) | ControlState::Explorer(m) => {
            (allowed(), m.authority[0], Some(m.authority[1]))
        }
    };
    TrainOutput {
        train: train.id,
        mode: train.control.mode(),
        allowed_speed_mps: speed,
        distance_to_stop_m: end.distance_m,
        end_authority: end,
        rear_authority: rear,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_output_has_no_authority() {
        let out = TrainOutput {
            train: TrainId(3),
            mode: ControlMode::Manual,
            allowed_speed_mps: 12.0,
            distance_to_stop_m: 400.0,
            end_authority: EndAuthority::new(EndAuthorityType::MaxDistance, 400.0),
            rear_authority: Some(EndAuthority::new(EndAuthorityType::EndOfTrack, 20.0)),
        };
        let stopped = out.stopped();
        assert_eq!(stopped.allowed_speed_mps, 0.0);
        assert_eq!(stopped.end_authority, EndAuthority::none());
        assert_eq!(stopped.rear_authority, Some(EndAuthority::none()));
        assert_eq!(stopped.mode, ControlMode::Manual);
    }
}
