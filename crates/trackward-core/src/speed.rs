//! Class-dependent speed limits.

use crate::direction::TrainClass;

/// A speed limit with separate passenger and freight values, in m/s.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedLimit {
    /// Limit applied to passenger trains.
    pub passenger_mps: f64,
    /// Limit applied to freight trains.
    pub freight_mps: f64,
}

impl SpeedLimit {
    /// A limit that applies the same value to both classes.
    pub fn uniform(mps: f64) -> Self {
        Self {
            passenger_mps: mps,
            freight_mps: mps,
        }
    }

    /// The value that applies to a train of `class`.
    #[inline]
    pub fn for_class(&self, class: TrainClass) -> f64 {
        match class {
            TrainClass::Passenger => self.passenger_mps,
            TrainClass::Freight => self.freight_mps,
        }
    }

    /// The lower of each class value.
    pub fn min(self, other: Self) -> Self {
        Self {
            passenger_mps: self.passenger_mps.min(other.passenger_mps),
            freight_mps: self.freight_mps.min(other.freight_mps),
        }
    }

    /// Whether both values are finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.passenger_mps.is_finite()
            && self.passenger_mps > 0.0
            && self.freight_mps.is_finite()
            && self.freight_mps > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_selects_value() {
        let l = SpeedLimit {
            passenger_mps: 30.0,
            freight_mps: 20.0,
        };
        assert_eq!(l.for_class(TrainClass::Passenger), 30.0);
        assert_eq!(l.for_class(TrainClass::Freight), 20.0);
    }

    #[test]
    fn min_is_per_class() {
        let a = SpeedLimit {
            passenger_mps: 30.0,
            freight_mps: 10.0,
        };
        let b = SpeedLimit::uniform(20.0);
        assert_eq!(
            a.min(b),
            SpeedLimit {
                passenger_mps: 20.0,
                freight_mps: 10.0,
            }
        );
    }

    #[test]
    fn validity_rejects_nan_and_zero() {
        assert!(SpeedLimit::uniform(10.0).is_valid());
        assert!(!SpeedLimit::uniform(0.0).is_valid());
        assert!(!SpeedLimit::uniform(f64::NAN).is_valid());
    }
}
