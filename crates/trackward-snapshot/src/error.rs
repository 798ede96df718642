//! Error types for snapshot encoding and decoding.

use std::fmt;
use std::io;

/// Errors that can occur while encoding or decoding a world record.
#[derive(Debug)]
pub enum SnapshotError {
    /// An I/O error occurred, including truncated input.
    Io(io::Error),
    /// The input does not start with `b"TWRD"`.
    InvalidMagic,
    /// The format version is not supported by this build.
    UnsupportedVersion {
        /// The version found in the input.
        found: u8,
    },
    /// A tagged field holds a value this build does not know.
    InvalidTag {
        /// Which field was being decoded.
        field: &'static str,
        /// The unrecognised tag.
        tag: u8,
    },
    /// A sequence length is larger than the remaining input could hold.
    LengthOverflow {
        /// Which sequence was being decoded.
        field: &'static str,
        /// The declared length.
        len: u32,
    },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"TWRD\")"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported format version {found}")
            }
            Self::InvalidTag { field, tag } => write!(f, "invalid tag {tag} for {field}"),
            Self::LengthOverflow { field, len } => {
                write!(f, "length {len} for {field} exceeds the input")
            }
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SnapshotError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
