//! Persistence for the trackward dispatcher.
//!
//! The engine flattens its state into a [`WorldRecord`]; this crate
//! encodes records to a compact binary form and hashes them for
//! determinism checks. Restoring a record and replaying the same inputs
//! must reproduce the same hashes tick for tick.
//!
//! # Format
//!
//! ```text
//! [MAGIC "TWRD"] [VERSION u8] [tick u64] [flags u8]
//! [trains u32 + TrainRecord*] [sections u32 + SectionRecord*]
//! [signals u32 + SignalRecord*]
//! ```
//!
//! All integers and floats are little-endian. Optional values carry a
//! one-byte presence flag. Sequences are prefixed with a `u32` count.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod hash;
pub mod types;

pub use codec::{decode_world, encode_world, from_bytes, to_bytes};
pub use error::SnapshotError;
pub use hash::{fnv1a, world_hash};
pub use types::*;

/// Magic bytes at the start of every encoded world.
pub const MAGIC: [u8; 4] = *b"TWRD";

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 1;
