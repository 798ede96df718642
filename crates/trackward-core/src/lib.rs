//! Core types for the trackward movement-authority engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by every other crate in the workspace: strongly-typed
//! identifiers, travel direction, speed limits, the fault taxonomy, and the
//! interactive command/receipt types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod command;
pub mod direction;
pub mod error;
pub mod id;
pub mod speed;

pub use command::{Command, CommandPayload, Receipt};
pub use direction::{Direction, TrainClass};
pub use error::{CommandRejection, OutOfControlCause, RoutingFault};
pub use id::{
    AlternativeId, PlatformId, SectionId, SignalId, SpeedPostId, StationId, TickId, TrainId,
};
pub use speed::SpeedLimit;
