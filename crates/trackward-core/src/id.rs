//! Strongly-typed identifiers.
//!
//! Every object in the track network lives in an arena and is addressed by
//! a stable integer index. Wrapping those indices in distinct newtypes keeps
//! a `SignalId` from ever being used to index the section arena.

use std::fmt;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// Position of this object in its arena.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(v: u32) -> Self {
                Self(v)
            }
        }
    };
}

arena_id! {
    /// Identifies a track circuit section.
    ///
    /// `SectionId(n)` is the n-th section added to the network builder.
    SectionId
}

arena_id! {
    /// Identifies a train registered with the dispatcher.
    ///
    /// Train ids are chosen by the host and need not be dense.
    TrainId
}

arena_id! {
    /// Identifies a signal in the network.
    SignalId
}

arena_id! {
    /// Identifies a speed post (permanent or temporary limit board).
    SpeedPostId
}

arena_id! {
    /// Identifies a platform (a stopping place within one section).
    PlatformId
}

arena_id! {
    /// Identifies a station; several platforms may share a station.
    StationId
}

arena_id! {
    /// Identifies an alternative path attached to a train path.
    AlternativeId
}

/// Monotonically increasing tick counter.
///
/// Incremented each time the dispatcher advances one step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickId(pub u64);

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TickId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_matches_raw_value() {
        assert_eq!(SectionId(7).index(), 7);
        assert_eq!(SignalId::from(3).index(), 3);
    }

    #[test]
    fn display_is_bare_number() {
        assert_eq!(TrainId(42).to_string(), "42");
        assert_eq!(TickId(9).to_string(), "9");
    }

    #[test]
    fn ids_order_by_value() {
        let mut ids = vec![TrainId(3), TrainId(1), TrainId(2)];
        ids.sort();
        assert_eq!(ids, vec![TrainId(1), TrainId(2), TrainId(3)]);
    }
}
