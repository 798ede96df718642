//! Trackward: movement authority and train control for railway simulation.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! trackward sub-crates. For most users, adding `trackward` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use trackward::prelude::*;
//!
//! // Two 400 m sections between buffer stops.
//! let mut b = NetworkBuilder::new();
//! let west = b.add_section(SectionKind::EndOfTrack, 400.0);
//! let east = b.add_section(SectionKind::EndOfTrack, 400.0);
//! b.connect(west, Direction::Ahead, east, Direction::Ahead);
//! let network = b.build().unwrap();
//!
//! let route = Route::from_sections(
//!     &network,
//!     [(west, Direction::Ahead), (east, Direction::Ahead)],
//! )
//! .unwrap();
//! let mut dispatcher = Dispatcher::new(network, DispatcherConfig::default()).unwrap();
//! dispatcher
//!     .add_train(TrainSpec {
//!         id: TrainId(1),
//!         class: TrainClass::Passenger,
//!         length_m: 100.0,
//!         max_speed_mps: 25.0,
//!         path: Some(TrainPath::single(route).unwrap()),
//!         front: TrainPosition::new(west, 300.0, Direction::Ahead),
//!     })
//!     .unwrap();
//!
//! let result = dispatcher.step(&[], vec![]).unwrap();
//! let out = result.outputs[0];
//! assert!(out.mode.is_auto());
//! assert_eq!(out.end_authority.kind, EndAuthorityType::EndOfTrack);
//! assert_eq!(out.distance_to_stop_m, 500.0);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `trackward-core` | IDs, directions, commands, receipts, speed limits |
//! | [`network`] | `trackward-network` | Sections, signals, speed posts and dynamic state |
//! | [`route`] | `trackward-route` | Routes, train paths and temporary route scans |
//! | [`engine`] | `trackward-engine` | Control modes, reservation and the dispatcher |
//! | [`snapshot`] | `trackward-snapshot` | Saved state records, codec and hashing |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// IDs, commands and receipts (`trackward-core`).
pub use trackward_core as types;

/// Static track layout and its dynamic state (`trackward-network`).
///
/// Build a [`network::TrackNetwork`] with [`network::NetworkBuilder`].
pub use trackward_network as network;

/// Routes and train paths (`trackward-route`).
pub use trackward_route as route;

/// Train control (`trackward-engine`).
///
/// [`engine::Dispatcher`] is the entry point: add trains, then call
/// [`engine::Dispatcher::step`] once per physics step.
pub use trackward_engine as engine;

/// Save and restore (`trackward-snapshot`).
pub use trackward_snapshot as snapshot;

/// Common imports for typical trackward usage.
///
/// ```rust
/// use trackward::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use trackward_core::{
        Command, CommandPayload, CommandRejection, Direction, OutOfControlCause, Receipt,
        SectionId, SignalId, SpeedLimit, TickId, TrainClass, TrainId,
    };

    // Network
    pub use trackward_network::{
        AspectSpeeds, NetworkBuilder, SectionKind, SignalHold, SignalSpeed, SpeedPostKind,
        TrackNetwork,
    };

    // Routes
    pub use trackward_route::{AlternativeKind, Route, TrainPath};

    // Engine
    pub use trackward_engine::{
        BrakeController, BrakeEvent, ControlMode, Dispatcher, DispatcherConfig, EndAuthorityType,
        StepResult, TrainMotion, TrainOutput, TrainPosition, TrainSpec,
    };

    // Snapshot
    pub use trackward_snapshot::{from_bytes, to_bytes, WorldRecord};
}
