//! Tick engine: the single-threaded control loop.
//!
//! [`TickEngine`] owns the network, the trains, the ingress queue and the
//! outbox, and runs one control step per [`execute_tick`](TickEngine::execute_tick)
//! in a fixed order:
//!
//! 1. validate the reported motions;
//! 2. apply queued driver commands;
//! 3. activate new trains, then recompute deadlock traps if marked dirty;
//! 4. update every train in insertion order;
//! 5. flush the outbox;
//! 6. recompute traps again if the flush dirtied them;
//! 7. refresh signal aspects;
//! 8. build per-train outputs.

use std::fmt;
use std::time::Instant;

use indexmap::IndexMap;
use tracing::{debug, info, warn};
use trackward_core::{Command, CommandRejection, Receipt, SectionId, TickId, TrainId};
use trackward_network::TrackNetwork;

use crate::brake::BrakeEvent;
use crate::config::{ConfigError, ControlConfig, DispatcherConfig};
use crate::control::ControlMode;
use crate::deadlock;
use crate::ingress::IngressQueue;
use crate::metrics::StepMetrics;
use crate::outbox::{Intent, Outbox};
use crate::output::{output_for, TrainMotion, TrainOutput};
use crate::reservation::ReservationManager;
use crate::signaling::refresh_aspects;
use crate::train::{AddTrainError, TickContext, Train, TrainSpec};

// ── TickResult ───────────────────────────────────────────────────

/// Result of a successful tick.
#[derive(Debug)]
pub struct TickResult {
    /// One output per train, in insertion order.
    pub outputs: Vec<TrainOutput>,
    /// Receipts for commands submitted before this tick.
    pub receipts: Vec<Receipt>,
    /// Emergency brake requests and releases raised during the tick.
    pub brake_events: Vec<BrakeEvent>,
    /// Timings and counters for this tick.
    pub metrics: StepMetrics,
}

// ── TickError ───────────────────────────────────────────────────

/// Error returned from [`TickEngine::execute_tick()`].
///
/// A failed tick changes nothing: motions are validated before any state
/// is touched, and queued commands stay queued.
#[derive(Clone, Debug, PartialEq)]
pub enum TickError {
    /// A motion names a train the engine does not know.
    UnknownTrain {
        /// The id.
        train: TrainId,
    },
    /// A motion carries a non-finite distance or speed.
    InvalidMotion {
        /// The train.
        train: TrainId,
        /// The reported distance.
        distance_m: f64,
    },
    /// Two motions were reported for the same train.
    DuplicateMotion {
        /// The train.
        train: TrainId,
    },
}

impl fmt::Display for TickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTrain { train } => write!(f, "motion for unknown train {train}"),
            Self::InvalidMotion { train, distance_m } => {
                write!(f, "invalid motion for train {train}: {distance_m} m")
            }
            Self::DuplicateMotion { train } => {
                write!(f, "more than one motion for train {train}")
            }
        }
    }
}

impl std::error::Error for TickError {}

// ── TickEngine ───────────────────────────────────────────────────

/// Single-threaded engine that owns all control state.
pub struct TickEngine {
    pub(crate) network: TrackNetwork,
    pub(crate) trains: IndexMap<TrainId, Train>,
    pub(crate) config: ControlConfig,
    ingress: IngressQueue,
    outbox: Outbox,
    pub(crate) current_tick: TickId,
    pub(crate) traps_dirty: bool,
    queue_full_rejections: u64,
    last_metrics: StepMetrics,
}

impl TickEngine {
    /// Construct an engine around `network`.
    pub fn new(network: TrackNetwork, config: DispatcherConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            network,
            trains: IndexMap::new(),
            config: config.control,
            ingress: IngressQueue::new(config.max_ingress_queue),
            outbox: Outbox::new(),
            current_tick: TickId(0),
            traps_dirty: true,
            queue_full_rejections: 0,
            last_metrics: StepMetrics::default(),
        })
    }

    pub(crate) fn from_parts(
        network: TrackNetwork,
        config: DispatcherConfig,
        trains: IndexMap<TrainId, Train>,
        current_tick: TickId,
        traps_dirty: bool,
    ) -> Result<Self, ConfigError> {
        let mut engine = Self::new(network, config)?;
        engine.trains = trains;
        engine.current_tick = current_tick;
        engine.traps_dirty = traps_dirty;
        Ok(engine)
    }

    // ── Trains ─────────────────────────────────────────────────────

    /// Put a train on the network. It is activated on its first tick.
    pub fn add_train(&mut self, spec: TrainSpec) -> Result<(), AddTrainError> {
        if self.trains.contains_key(&spec.id) {
            return Err(AddTrainError::Duplicate { train: spec.id });
        }
        let train = Train::new(spec, &self.network)?;
        for &s in train.occupied() {
            if let Some(by) = self.network.state(s).occupied_by_other(train.id) {
                return Err(AddTrainError::Occupied { section: s, by });
            }
        }
        let mut rm = ReservationManager::new(&mut self.network);
        for &s in train.occupied() {
            rm.set_occupied(s, train.id, train.front.direction);
        }
        info!(train = %train.id, section = %train.front.section, "train added");
        self.trains.insert(train.id, train);
        self.traps_dirty = true;
        Ok(())
    }

    /// Take a train off the network, releasing everything it holds.
    pub fn remove_train(&mut self, id: TrainId) -> Option<Train> {
        let train = self.trains.shift_remove(&id)?;
        ReservationManager::new(&mut self.network).remove_train(id);
        self.traps_dirty = true;
        info!(train = %id, "train removed");
        Some(train)
    }

    /// A train by id.
    pub fn train(&self, id: TrainId) -> Option<&Train> {
        self.trains.get(&id)
    }

    /// All trains, in insertion order.
    pub fn trains(&self) -> impl Iterator<Item = &Train> + '_ {
        self.trains.values()
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// The network and its dynamic state.
    pub fn network(&self) -> &TrackNetwork {
        &self.network
    }

    /// Mutable network access for host-side changes such as signal holds.
    pub fn network_mut(&mut self) -> &mut TrackNetwork {
        &mut self.network
    }

    /// The control settings in force.
    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// The last completed tick.
    pub fn current_tick(&self) -> TickId {
        self.current_tick
    }

    /// Metrics from the most recent tick.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    /// Commands waiting for the next tick.
    pub fn pending_commands(&self) -> usize {
        self.ingress.len()
    }

    // ── Commands ───────────────────────────────────────────────────

    /// Queue commands for the next tick. Returns one receipt per command;
    /// accepted receipts are provisional until the tick applies them.
    pub fn submit_commands(&mut self, commands: Vec<Command>) -> Vec<Receipt> {
        let receipts = self.ingress.submit(commands);
        let full = receipts
            .iter()
            .filter(|r| r.rejection == Some(CommandRejection::QueueFull))
            .count();
        if full > 0 {
            warn!(rejected = full, "ingress queue full");
            self.queue_full_rejections += full as u64;
        }
        receipts
    }

    // ── Tick ───────────────────────────────────────────────────────

    /// Run one control step.
    pub fn execute_tick(&mut self, motions: &[TrainMotion]) -> Result<TickResult, TickError> {
        let tick_start = Instant::now();
        let tick = TickId(self.current_tick.0 + 1);

        // 1. Motions.
        let mut by_train: IndexMap<TrainId, TrainMotion> = IndexMap::with_capacity(motions.len());
        for m in motions {
            if !self.trains.contains_key(&m.train) {
                return Err(TickError::UnknownTrain { train: m.train });
            }
            if !m.distance_m.is_finite() || !m.speed_mps.is_finite() {
                return Err(TickError::InvalidMotion {
                    train: m.train,
                    distance_m: m.distance_m,
                });
            }
            if by_train.insert(m.train, *m).is_some() {
                return Err(TickError::DuplicateMotion { train: m.train });
            }
        }

        let mut brake_events = Vec::new();

        // 2. Commands.
        let cmd_start = Instant::now();
        let mut receipts = Vec::new();
        let mut rejected = 0u32;
        for dc in self.ingress.drain() {
            let train_id = dc.command.train;
            let result = match self.trains.get_mut(&train_id) {
                None => Err(CommandRejection::UnknownTrain),
                Some(train) => {
                    let mut ctx = TickContext {
                        net: &mut self.network,
                        config: &self.config,
                        outbox: &mut self.outbox,
                        brakes: &mut brake_events,
                    };
                    train.apply_command(dc.command.payload, &mut ctx)
                }
            };
            receipts.push(match result {
                Ok(()) => Receipt {
                    accepted: true,
                    applied_tick_id: Some(tick),
                    rejection: None,
                    command_index: dc.command_index,
                },
                Err(reason) => {
                    warn!(train = %train_id, %reason, "command rejected");
                    rejected += 1;
                    Receipt::rejected(dc.command_index, reason)
                }
            });
        }
        let command_processing_us = cmd_start.elapsed().as_micros() as u64;

        // 3. Activate new trains so their routes count for traps.
        for train in self.trains.values_mut() {
            if train.mode() == ControlMode::Undefined {
                let mut ctx = TickContext {
                    net: &mut self.network,
                    config: &self.config,
                    outbox: &mut self.outbox,
                    brakes: &mut brake_events,
                };
                train.activate(&mut ctx);
                self.traps_dirty = true;
            }
        }
        let deadlock_start = Instant::now();
        self.refresh_traps_if_dirty();
        let mut deadlock_us = deadlock_start.elapsed().as_micros() as u64;

        // 4. Trains.
        let train_start = Instant::now();
        for (id, train) in self.trains.iter_mut() {
            let mut ctx = TickContext {
                net: &mut self.network,
                config: &self.config,
                outbox: &mut self.outbox,
                brakes: &mut brake_events,
            };
            train.update(by_train.get(id), &mut ctx);
        }
        let train_update_us = train_start.elapsed().as_micros() as u64;

        // 5-7. Deferred effects, traps, aspects.
        let stopped = self.flush_outbox();
        let deadlock_start = Instant::now();
        self.refresh_traps_if_dirty();
        deadlock_us += deadlock_start.elapsed().as_micros() as u64;
        refresh_aspects(&mut self.network);

        // 8. Outputs.
        let outputs: Vec<TrainOutput> = self
            .trains
            .values()
            .map(|t| {
                let out = output_for(t, &self.config);
                if stopped.contains(&t.id) {
                    out.stopped()
                } else {
                    out
                }
            })
            .collect();

        self.current_tick = tick;
        let metrics = StepMetrics {
            total_us: tick_start.elapsed().as_micros() as u64,
            command_processing_us,
            train_update_us,
            deadlock_us,
            trains: self.trains.len() as u32,
            reserved_sections: self
                .network
                .states()
                .iter()
                .filter(|s| s.reservation().is_some())
                .count() as u32,
            out_of_control: self
                .trains
                .values()
                .filter(|t| t.mode() == ControlMode::OutOfControl)
                .count() as u32,
            commands_rejected: rejected,
            queue_full_rejections: self.queue_full_rejections,
        };
        self.last_metrics = metrics.clone();
        debug!(tick = tick.0, total_us = metrics.total_us, "tick complete");

        Ok(TickResult {
            outputs,
            receipts,
            brake_events,
            metrics,
        })
    }

    fn refresh_traps_if_dirty(&mut self) {
        if self.traps_dirty {
            let n = deadlock::refresh_traps(&mut self.network, &self.trains);
            debug!(traps = n, "deadlock traps refreshed");
            self.traps_dirty = false;
        }
    }

    /// Apply queued intents. Returns the trains to stop this tick.
    fn flush_outbox(&mut self) -> Vec<TrainId> {
        let mut stopped = Vec::new();
        let intents: Vec<Intent> = self.outbox.drain().collect();
        for intent in intents {
            match intent {
                Intent::StopTrain { train } => {
                    if !stopped.contains(&train) {
                        stopped.push(train);
                    }
                }
                Intent::SwitchToNodeControl { train, section } => self.drop_to_node(train, section),
                Intent::RefreshDeadlocks => self.traps_dirty = true,
            }
        }
        stopped
    }

    fn drop_to_node(&mut self, train: TrainId, section: SectionId) {
        if let Some(t) = self.trains.get_mut(&train) {
            t.drop_to_node_control(&mut self.network, section);
        }
    }
}

impl fmt::Debug for TickEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickEngine")
            .field("current_tick", &self.current_tick)
            .field("trains", &self.trains.len())
            .field("pending_commands", &self.ingress.len())
            .field("traps_dirty", &self.traps_dirty)
            .finish()
    }
}
