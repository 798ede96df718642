//! Error types for network construction and topology queries.

use std::fmt;

use trackward_core::{Direction, SectionId, SignalId, SpeedPostId};

/// Errors arising from [`NetworkBuilder::build`](crate::NetworkBuilder::build)
/// or from host-side mutation of the built network.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// The builder holds no sections.
    EmptyNetwork,
    /// A section length is not finite and strictly positive.
    InvalidLength {
        /// The offending section.
        section: SectionId,
        /// The rejected length in metres.
        length_m: f64,
    },
    /// A section id does not belong to this network.
    UnknownSection {
        /// The unknown id.
        section: SectionId,
    },
    /// A signal id does not belong to this network.
    UnknownSignal {
        /// The unknown id.
        signal: SignalId,
    },
    /// More than two pins were attached to one end of a section.
    TooManyPins {
        /// The overloaded section.
        section: SectionId,
        /// Travel direction whose exit end is overloaded.
        direction: Direction,
    },
    /// Two pins were attached to an end of a section that cannot switch.
    SwitchableEndOnPlainSection {
        /// The plain section.
        section: SectionId,
        /// Travel direction whose exit end has two pins.
        direction: Direction,
    },
    /// A section was linked to itself.
    SelfLink {
        /// The section concerned.
        section: SectionId,
    },
    /// A signal or speed post lies outside its section.
    ItemOutOfRange {
        /// The section the item was placed on.
        section: SectionId,
        /// The rejected offset in metres.
        offset_m: f64,
    },
    /// A speed post carries a non-positive or non-finite limit.
    InvalidSpeedLimit {
        /// The offending post.
        post: SpeedPostId,
    },
    /// An end-of-track section is linked at both ends.
    EndOfTrackLinkedBothEnds {
        /// The section concerned.
        section: SectionId,
    },
    /// A switch alignment was set on a section that cannot switch, or to a
    /// leg that does not exist.
    InvalidAlignment {
        /// The section concerned.
        section: SectionId,
        /// The rejected leg.
        leg: u8,
    },
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyNetwork => write!(f, "network must have at least one section"),
            Self::InvalidLength { section, length_m } => {
                write!(f, "section {section} has invalid length {length_m}")
            }
            Self::UnknownSection { section } => write!(f, "unknown section {section}"),
            Self::UnknownSignal { signal } => write!(f, "unknown signal {signal}"),
            Self::TooManyPins { section, direction } => {
                write!(f, "section {section} has more than two pins leaving {direction}")
            }
            Self::SwitchableEndOnPlainSection { section, direction } => write!(
                f,
                "section {section} has two pins leaving {direction} but is not a junction or crossover"
            ),
            Self::SelfLink { section } => write!(f, "section {section} is linked to itself"),
            Self::ItemOutOfRange { section, offset_m } => {
                write!(f, "offset {offset_m} is outside section {section}")
            }
            Self::InvalidSpeedLimit { post } => {
                write!(f, "speed post {post} has an invalid limit")
            }
            Self::EndOfTrackLinkedBothEnds { section } => {
                write!(f, "end-of-track section {section} is linked at both ends")
            }
            Self::InvalidAlignment { section, leg } => {
                write!(f, "leg {leg} is not a valid alignment for section {section}")
            }
        }
    }
}

impl std::error::Error for NetworkError {}
