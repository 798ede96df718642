//! Travel direction and train class.

use std::fmt;

/// Direction of travel through a section.
///
/// Every section has two ends. Travelling [`Ahead`](Direction::Ahead) means
/// entering at the section's origin end and leaving at its far end;
/// [`Reverse`](Direction::Reverse) is the opposite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// Origin end to far end.
    Ahead,
    /// Far end to origin end.
    Reverse,
}

impl Direction {
    /// Both directions, in index order.
    pub const ALL: [Direction; 2] = [Direction::Ahead, Direction::Reverse];

    /// The opposite direction.
    #[inline]
    pub fn reverse(self) -> Self {
        match self {
            Self::Ahead => Self::Reverse,
            Self::Reverse => Self::Ahead,
        }
    }

    /// Array index for per-direction tables (`Ahead` = 0, `Reverse` = 1).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::Ahead => 0,
            Self::Reverse => 1,
        }
    }

    /// Inverse of [`index`](Self::index). Any non-zero value maps to `Reverse`.
    pub fn from_index(i: usize) -> Self {
        if i == 0 {
            Self::Ahead
        } else {
            Self::Reverse
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ahead => write!(f, "ahead"),
            Self::Reverse => write!(f, "reverse"),
        }
    }
}

/// Service class of a train; selects which value of a
/// [`SpeedLimit`](crate::SpeedLimit) applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrainClass {
    /// Passenger service.
    Passenger,
    /// Freight service.
    Freight,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_is_involution() {
        for d in Direction::ALL {
            assert_eq!(d.reverse().reverse(), d);
            assert_ne!(d.reverse(), d);
        }
    }

    #[test]
    fn index_round_trips() {
        for d in Direction::ALL {
            assert_eq!(Direction::from_index(d.index()), d);
        }
    }
}
