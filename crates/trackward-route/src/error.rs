//! Error types for route construction.

use std::fmt;

use trackward_core::{Direction, SectionId};

/// Errors arising from building or editing routes and paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Two consecutive elements are not linked by a pin.
    Discontiguous {
        /// Position of the second element.
        index: usize,
        /// Section left.
        from: SectionId,
        /// Section entered.
        to: SectionId,
        /// Travel direction expected inside `to`.
        direction: Direction,
    },
    /// A route or path needs at least one element.
    EmptyRoute,
    /// A section id does not belong to the network.
    UnknownSection {
        /// The unknown id.
        section: SectionId,
    },
    /// A subpath index is past the end of the path.
    SubpathOutOfRange {
        /// Requested index.
        subpath: usize,
        /// Number of subpaths.
        count: usize,
    },
    /// A replacement route does not start and end where the replaced
    /// stretch does.
    SpliceMismatch {
        /// Section the replacement should start on.
        start: SectionId,
        /// Section the replacement should end on.
        end: SectionId,
    },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discontiguous {
                index,
                from,
                to,
                direction,
            } => write!(
                f,
                "route element {index}: section {to} ({direction}) is not linked from section {from}"
            ),
            Self::EmptyRoute => write!(f, "route must have at least one element"),
            Self::UnknownSection { section } => write!(f, "unknown section {section}"),
            Self::SubpathOutOfRange { subpath, count } => {
                write!(f, "subpath {subpath} out of range (path has {count})")
            }
            Self::SpliceMismatch { start, end } => write!(
                f,
                "replacement route must run from section {start} to section {end}"
            ),
        }
    }
}

impl std::error::Error for RouteError {}
