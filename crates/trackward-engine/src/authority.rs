//! End of movement authority.

use std::fmt;

/// What limits a train's authority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EndAuthorityType {
    /// Nothing has been reserved yet.
    #[default]
    NoPathReserved,
    /// A signal at stop.
    Signal,
    /// The track ends.
    EndOfTrack,
    /// The route ends; the train reverses or finishes here.
    EndOfPath,
    /// Another train holds the next section.
    TrainAhead,
    /// The lookahead distance is covered.
    MaxDistance,
    /// The route runs back onto itself.
    Loop,
    /// The train has no authority at all.
    EndOfAuthority,
}

impl EndAuthorityType {
    /// Stable numeric tag used by the persistence codec.
    pub fn tag(self) -> u8 {
        match self {
            Self::NoPathReserved => 0,
            Self::Signal => 1,
            Self::EndOfTrack => 2,
            Self::EndOfPath => 3,
            Self::TrainAhead => 4,
            Self::MaxDistance => 5,
            Self::Loop => 6,
            Self::EndOfAuthority => 7,
        }
    }

    /// Inverse of [`tag`](Self::tag).
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => Self::NoPathReserved,
            1 => Self::Signal,
            2 => Self::EndOfTrack,
            3 => Self::EndOfPath,
            4 => Self::TrainAhead,
            5 => Self::MaxDistance,
            6 => Self::Loop,
            7 => Self::EndOfAuthority,
            _ => return None,
        })
    }
}

impl fmt::Display for EndAuthorityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoPathReserved => "no path reserved",
            Self::Signal => "signal",
            Self::EndOfTrack => "end of track",
            Self::EndOfPath => "end of path",
            Self::TrainAhead => "train ahead",
            Self::MaxDistance => "max distance",
            Self::Loop => "loop",
            Self::EndOfAuthority => "end of authority",
        };
        f.write_str(s)
    }
}

/// How far a train may go and why it may go no further.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EndAuthority {
    /// The limiting feature.
    pub kind: EndAuthorityType,
    /// Distance from the train end, never negative.
    pub distance_m: f64,
}

impl EndAuthority {
    /// Authority of `kind` at `distance_m`, clamped at zero.
    pub fn new(kind: EndAuthorityType, distance_m: f64) -> Self {
        Self {
            kind,
            distance_m: distance_m.max(0.0),
        }
    }

    /// No authority.
    pub fn none() -> Self {
        Self::new(EndAuthorityType::EndOfAuthority, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_never_negative() {
        let a = EndAuthority::new(EndAuthorityType::TrainAhead, -12.5);
        assert_eq!(a.distance_m, 0.0);
    }

    #[test]
    fn tags_round_trip() {
        for tag in 0..8 {
            let kind = EndAuthorityType::from_tag(tag).expect("tag in range");
            assert_eq!(kind.tag(), tag);
        }
        assert_eq!(EndAuthorityType::from_tag(8), None);
    }
}
