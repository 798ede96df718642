//! Lockstep dispatcher.
//!
//! [`Dispatcher`] is the host-facing API. Each call to
//! [`step()`](Dispatcher::step) submits commands, runs one control tick
//! against the motions the physics layer reported, forwards brake events
//! to the registered [`BrakeController`], and returns the outputs.
//!
//! `Dispatcher` is [`Send`] but not shared: every mutating method takes
//! `&mut self`, and nothing runs in the background.

use trackward_core::{Command, Receipt, SectionId, SignalId, TickId, TrainId};
use trackward_network::{NetworkError, SignalHold, TrackNetwork};
use trackward_snapshot::WorldRecord;

use crate::brake::{self, BrakeController, BrakeEvent};
use crate::config::{ConfigError, DispatcherConfig};
use crate::metrics::StepMetrics;
use crate::output::{TrainMotion, TrainOutput};
use crate::persist::{self, RestoreError};
use crate::tick::{TickEngine, TickError};
use crate::train::{AddTrainError, Train, TrainSpec};

// Fails to compile if any field is !Send.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<Dispatcher>();
    }
};

// ── StepResult ──────────────────────────────────────────────────

/// Result of a successful [`Dispatcher::step()`] call.
#[derive(Debug)]
pub struct StepResult {
    /// One output per train, in insertion order.
    pub outputs: Vec<TrainOutput>,
    /// Receipts for all commands: submission rejections first, then the
    /// receipts of commands applied this tick.
    pub receipts: Vec<Receipt>,
    /// Brake events raised this tick, already forwarded to the
    /// controller if one is registered.
    pub brake_events: Vec<BrakeEvent>,
    /// Timings and counters for this tick.
    pub metrics: StepMetrics,
}

// ── Dispatcher ──────────────────────────────────────────────────

/// Movement authority and train control over one network.
///
/// # Example
///
/// ```ignore
/// let mut dispatcher = Dispatcher::new(network, DispatcherConfig::default())?;
/// dispatcher.add_train(spec)?;
/// loop {
///     let result = dispatcher.step(&motions, commands)?;
///     for out in &result.outputs {
///         physics.limit(out.train, out.allowed_speed_mps, out.distance_to_stop_m);
///     }
/// }
/// ```
pub struct Dispatcher {
    engine: TickEngine,
    config: DispatcherConfig,
    brakes: Option<Box<dyn BrakeController + Send>>,
}

impl Dispatcher {
    /// Create a dispatcher over `network`.
    pub fn new(network: TrackNetwork, config: DispatcherConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            engine: TickEngine::new(network, config.clone())?,
            config,
            brakes: None,
        })
    }

    /// Execute one tick.
    ///
    /// # Errors
    ///
    /// Returns [`TickError`] if a motion is malformed or names an unknown
    /// train. Nothing is changed in that case and accepted commands stay
    /// queued for the next call.
    pub fn step(
        &mut self,
        motions: &[TrainMotion],
        commands: Vec<Command>,
    ) -> Result<StepResult, TickError> {
        let submit_receipts = self.engine.submit_commands(commands);

        // Accepted commands get their final receipts from execute_tick.
        let rejected: Vec<Receipt> = submit_receipts
            .into_iter()
            .filter(|r| !r.accepted)
            .collect();

        let tick_result = self.engine.execute_tick(motions)?;
        if let Some(controller) = self.brakes.as_deref_mut() {
            brake::dispatch(controller, &tick_result.brake_events);
        }
        let mut receipts = rejected;
        receipts.extend(tick_result.receipts);
        Ok(StepResult {
            outputs: tick_result.outputs,
            receipts,
            brake_events: tick_result.brake_events,
            metrics: tick_result.metrics,
        })
    }

    /// Register the host's emergency brake interface.
    pub fn set_brake_controller(&mut self, controller: Box<dyn BrakeController + Send>) {
        self.brakes = Some(controller);
    }

    /// Put a train on the network.
    pub fn add_train(&mut self, spec: TrainSpec) -> Result<(), AddTrainError> {
        self.engine.add_train(spec)
    }

    /// Take a train off the network.
    pub fn remove_train(&mut self, id: TrainId) -> Option<Train> {
        self.engine.remove_train(id)
    }

    /// Hold a signal at stop, or lift the hold.
    pub fn set_signal_hold(&mut self, signal: SignalId, hold: SignalHold) -> Result<(), NetworkError> {
        self.engine.network_mut().set_signal_hold(signal, hold)
    }

    /// Throw a switch from the host side.
    pub fn set_alignment(&mut self, section: SectionId, leg: u8) -> Result<(), NetworkError> {
        self.engine.network_mut().set_alignment(section, leg)
    }

    /// The network and its dynamic state.
    pub fn network(&self) -> &TrackNetwork {
        self.engine.network()
    }

    /// A train by id.
    pub fn train(&self, id: TrainId) -> Option<&Train> {
        self.engine.train(id)
    }

    /// All trains, in insertion order.
    pub fn trains(&self) -> impl Iterator<Item = &Train> + '_ {
        self.engine.trains()
    }

    /// Last completed tick.
    pub fn current_tick(&self) -> TickId {
        self.engine.current_tick()
    }

    /// Metrics from the most recent tick.
    pub fn last_metrics(&self) -> &StepMetrics {
        self.engine.last_metrics()
    }

    /// Capture the dynamic state.
    pub fn save(&self) -> WorldRecord {
        persist::save(&self.engine)
    }

    /// Rebuild a dispatcher from a saved state over the same network.
    ///
    /// The brake controller is not part of the state and must be
    /// registered again.
    pub fn restore(
        network: TrackNetwork,
        config: DispatcherConfig,
        record: &WorldRecord,
    ) -> Result<Self, RestoreError> {
        Ok(Self {
            engine: persist::restore(network, config.clone(), record)?,
            config,
            brakes: None,
        })
    }

    /// The configuration the dispatcher was built with.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("current_tick", &self.engine.current_tick())
            .field("trains", &self.engine.trains().count())
            .field("brake_controller", &self.brakes.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use trackward_core::{CommandPayload, CommandRejection, Direction, TrainClass};
    use trackward_test_utils::straight_line;

    use crate::position::TrainPosition;

    struct Recorder(Arc<Mutex<Vec<BrakeEvent>>>);

    impl BrakeController for Recorder {
        fn emergency(&mut self, train: TrainId, cause: trackward_core::OutOfControlCause) {
            self.0
                .lock()
                .unwrap()
                .push(BrakeEvent::EmergencyRequested { train, cause });
        }
        fn release(&mut self, train: TrainId) {
            self.0.lock().unwrap().push(BrakeEvent::Released { train });
        }
    }

    fn dispatcher() -> (Dispatcher, Vec<trackward_core::SectionId>) {
        let (net, ids) = straight_line(&[300.0, 300.0]);
        let mut d = Dispatcher::new(net, DispatcherConfig::default()).unwrap();
        d.add_train(TrainSpec {
            id: TrainId(1),
            class: TrainClass::Passenger,
            length_m: 80.0,
            max_speed_mps: 25.0,
            path: None,
            front: TrainPosition::new(ids[0], 150.0, Direction::Ahead),
        })
        .unwrap();
        (d, ids)
    }

    #[test]
    fn queue_full_receipts_come_first() {
        let (net, _) = straight_line(&[100.0]);
        let config = DispatcherConfig {
            max_ingress_queue: 1,
            ..DispatcherConfig::default()
        };
        let mut d = Dispatcher::new(net, config).unwrap();
        let result = d
            .step(
                &[],
                vec![
                    Command::driver(TrainId(1), CommandPayload::ToggleManual),
                    Command::driver(TrainId(1), CommandPayload::ToggleManual),
                ],
            )
            .unwrap();
        assert_eq!(result.receipts.len(), 2);
        assert_eq!(result.receipts[0].rejection, Some(CommandRejection::QueueFull));
        assert_eq!(result.receipts[0].command_index, 1);
        assert_eq!(result.metrics.queue_full_rejections, 1);
    }

    #[test]
    fn brake_events_reach_registered_controller() {
        let (mut d, _) = dispatcher();
        let seen = Arc::new(Mutex::new(Vec::new()));
        d.set_brake_controller(Box::new(Recorder(Arc::clone(&seen))));
        d.step(&[], Vec::new()).unwrap();
        // Explorer trains cannot pass the end of the line.
        let result = d
            .step(
                &[TrainMotion {
                    train: TrainId(1),
                    distance_m: 500.0,
                    speed_mps: 20.0,
                }],
                Vec::new(),
            )
            .unwrap();
        assert_eq!(result.brake_events.len(), 1);
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(
            d.train(TrainId(1)).map(|t| t.mode()),
            Some(crate::ControlMode::OutOfControl)
        );
    }

    #[test]
    fn failed_step_keeps_commands_queued() {
        let (mut d, _) = dispatcher();
        let bad = [TrainMotion {
            train: TrainId(1),
            distance_m: f64::INFINITY,
            speed_mps: 0.0,
        }];
        let err = d
            .step(&bad, vec![Command::driver(TrainId(1), CommandPayload::ToggleManual)])
            .unwrap_err();
        match err {
            TickError::InvalidMotion { train, .. } => assert_eq!(train, TrainId(1)),
            other => panic!("expected InvalidMotion, got {other:?}"),
        }
        let result = d.step(&[], Vec::new()).unwrap();
        assert_eq!(result.receipts.len(), 1);
    }
}
