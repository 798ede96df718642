//! Track network for the trackward movement-authority engine.
//!
//! The network is an arena of track circuit sections addressed by
//! [`SectionId`](trackward_core::SectionId). Topology (kind, length, pins,
//! signals, speed posts, platforms) is fixed once [`NetworkBuilder::build`]
//! returns. Each section also carries a [`SectionState`] (occupancy,
//! reservation, claims, deadlock traps, switch alignment) and each signal a
//! [`SignalState`]; those are the only mutable parts of the network and the
//! only state shared between trains.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod builder;
pub mod error;
pub mod network;
pub mod platform;
pub mod section;
pub mod signal;
pub mod speedpost;
pub mod state;

pub use builder::NetworkBuilder;
pub use error::NetworkError;
pub use network::TrackNetwork;
pub use platform::Platform;
pub use section::{Pin, Section, SectionItem, SectionKind, TrackObject};
pub use signal::{Aspect, AspectSpeeds, Signal, SignalHold, SignalSpeed, SignalState};
pub use speedpost::{SpeedPost, SpeedPostKind};
pub use state::{DeadlockTrap, Reservation, SectionState};
