//! Emergency brake signalling.

use trackward_core::{OutOfControlCause, TrainId};

/// A change in a train's emergency brake demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrakeEvent {
    /// The train entered OutOfControl. Emitted once per entry.
    EmergencyRequested {
        /// The train.
        train: TrainId,
        /// Why it lost authority.
        cause: OutOfControlCause,
    },
    /// The train recovered from OutOfControl.
    Released {
        /// The train.
        train: TrainId,
    },
}

impl BrakeEvent {
    /// The train the event concerns.
    pub fn train(&self) -> TrainId {
        match *self {
            Self::EmergencyRequested { train, .. } | Self::Released { train } => train,
        }
    }
}

/// Host-side sink for brake demands.
///
/// The dispatcher calls the sink after each tick, in event order, in
/// addition to returning the events in the step result.
pub trait BrakeController {
    /// Apply the emergency brake on `train`.
    fn emergency(&mut self, train: TrainId, cause: OutOfControlCause);

    /// Release the emergency brake on `train`.
    fn release(&mut self, train: TrainId);
}

/// Forward `events` to `controller`.
pub fn dispatch(controller: &mut dyn BrakeController, events: &[BrakeEvent]) {
    for event in events {
        match *event {
            BrakeEvent::EmergencyRequested { train, cause } => controller.emergency(train, cause),
            BrakeEvent::Released { train } => controller.release(train),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log(Vec<String>);

    impl BrakeController for Log {
        fn emergency(&mut self, train: TrainId, cause: OutOfControlCause) {
            self.0.push(format!("on {train} {cause}"));
        }

        fn release(&mut self, train: TrainId) {
            self.0.push(format!("off {train}"));
        }
    }

    #[test]
    fn events_reach_controller_in_order() {
        let mut log = Log::default();
        dispatch(
            &mut log,
            &[
                BrakeEvent::EmergencyRequested {
                    train: TrainId(3),
                    cause: OutOfControlCause::PassedAtDanger,
                },
                BrakeEvent::Released { train: TrainId(3) },
            ],
        );
        assert_eq!(log.0, vec!["on 3 signal passed at danger", "off 3"]);
    }
}
