//! Movement authority and train control for trackward.
//!
//! The [`Dispatcher`] owns a [`TrackNetwork`](trackward_network::TrackNetwork)
//! and a set of trains. Each [`step`](Dispatcher::step) applies queued
//! commands, advances every train by the distance the physics layer
//! reports, re-evaluates reservations and control modes, and returns the
//! speed and authority each train may use next.
//!
//! Everything runs on the calling thread in a fixed order: trains are
//! processed in the order they were added, and cross-train effects are
//! deferred to an [`Outbox`](outbox::Outbox) flushed after the train pass.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod authority;
mod auto;
pub mod brake;
pub mod config;
pub mod control;
pub mod deadlock;
pub mod ingress;
pub mod lookahead;
pub mod manual;
pub mod metrics;
pub mod outbox;
pub mod output;
pub mod persist;
pub mod position;
pub mod reservation;
pub mod signaling;
pub mod speed;
pub mod tick;
pub mod train;
pub mod world;

pub use authority::{EndAuthority, EndAuthorityType};
pub use brake::{BrakeController, BrakeEvent};
pub use config::{ConfigError, ControlConfig, DispatcherConfig, SpeedPolicy};
pub use control::{ControlMode, ControlState, ResumableMode};
pub use metrics::StepMetrics;
pub use output::{TrainMotion, TrainOutput};
pub use persist::RestoreError;
pub use position::TrainPosition;
pub use tick::{TickEngine, TickError, TickResult};
pub use train::{AddTrainError, Train, TrainSpec};
pub use world::{Dispatcher, StepResult};
