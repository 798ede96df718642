//! Control and dispatcher configuration, validation, and error types.
//!
//! [`DispatcherConfig`] is the constructor input for a
//! [`Dispatcher`](crate::Dispatcher). [`validate()`](DispatcherConfig::validate)
//! checks every threshold once at startup so the tick loop never has to.

use std::error::Error;
use std::fmt;

// ── SpeedPolicy ────────────────────────────────────────────────────

/// How signal and standing limits combine into the allowed speed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpeedPolicy {
    /// The strict minimum of every limit in force.
    #[default]
    Timetable,
    /// The most recently passed of the signal and standing limits
    /// supersedes the other; the result is then capped by the temporary
    /// limit and the train's maximum speed.
    Interactive,
}

// ── ControlConfig ──────────────────────────────────────────────────

/// Distances, thresholds and timers used by per-train control.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlConfig {
    /// Track reserved ahead of the front under node control. Default: 1500 m.
    pub node_lookahead_m: f64,
    /// How far ahead signals and speed posts are tracked. Default: 2000 m.
    pub signal_lookahead_m: f64,
    /// A signal closer than this is asked to clear. Default: 1000 m.
    pub signal_request_m: f64,
    /// Rearward route length under manual control. Default: 250 m.
    pub manual_min_lookahead_m: f64,
    /// Forward route length under manual control. Default: 1500 m.
    pub manual_max_route_m: f64,
    /// Speeds at or below this count as stationary. Default: 0.1 m/s.
    pub standstill_speed_mps: f64,
    /// A train this close to the end of its route has reached it. Default: 5 m.
    pub authority_tolerance_m: f64,
    /// Time blocked before claiming the blocking section. Default: 10 s.
    pub wait_before_claim_s: f64,
    /// Time waiting at a deadlock trap before claiming it. Default: 30 s.
    pub deadlock_wait_s: f64,
    /// Simulated seconds per tick. Default: 0.1 s.
    pub tick_seconds: f64,
    /// Speed limit combination rule.
    pub speed_policy: SpeedPolicy,
    /// Speed allowed while a turntable controls the train. Default: 1 m/s.
    pub turntable_speed_mps: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            node_lookahead_m: 1500.0,
            signal_lookahead_m: 2000.0,
            signal_request_m: 1000.0,
            manual_min_lookahead_m: 250.0,
            manual_max_route_m: 1500.0,
            standstill_speed_mps: 0.1,
            authority_tolerance_m: 5.0,
            wait_before_claim_s: 10.0,
            deadlock_wait_s: 30.0,
            tick_seconds: 0.1,
            speed_policy: SpeedPolicy::default(),
            turntable_speed_mps: 1.0,
        }
    }
}

impl ControlConfig {
    /// Check that every distance, speed and timer is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("node_lookahead_m", self.node_lookahead_m),
            ("signal_lookahead_m", self.signal_lookahead_m),
            ("signal_request_m", self.signal_request_m),
            ("manual_min_lookahead_m", self.manual_min_lookahead_m),
            ("manual_max_route_m", self.manual_max_route_m),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidDistance { field, value });
            }
        }
        if !self.authority_tolerance_m.is_finite() || self.authority_tolerance_m < 0.0 {
            return Err(ConfigError::InvalidDistance {
                field: "authority_tolerance_m",
                value: self.authority_tolerance_m,
            });
        }
        if self.manual_min_lookahead_m > self.manual_max_route_m {
            return Err(ConfigError::ManualBandInverted {
                min: self.manual_min_lookahead_m,
                max: self.manual_max_route_m,
            });
        }
        for (field, value) in [
            ("wait_before_claim_s", self.wait_before_claim_s),
            ("deadlock_wait_s", self.deadlock_wait_s),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidDuration { field, value });
            }
        }
        if !self.tick_seconds.is_finite() || self.tick_seconds <= 0.0 {
            return Err(ConfigError::InvalidDuration {
                field: "tick_seconds",
                value: self.tick_seconds,
            });
        }
        if !self.standstill_speed_mps.is_finite() || self.standstill_speed_mps < 0.0 {
            return Err(ConfigError::InvalidSpeed {
                field: "standstill_speed_mps",
                value: self.standstill_speed_mps,
            });
        }
        if !self.turntable_speed_mps.is_finite() || self.turntable_speed_mps <= 0.0 {
            return Err(ConfigError::InvalidSpeed {
                field: "turntable_speed_mps",
                value: self.turntable_speed_mps,
            });
        }
        Ok(())
    }
}

// ── DispatcherConfig ───────────────────────────────────────────────

/// Everything needed to construct a [`Dispatcher`](crate::Dispatcher)
/// besides the network itself.
#[derive(Clone, Debug, PartialEq)]
pub struct DispatcherConfig {
    /// Per-train control settings.
    pub control: ControlConfig,
    /// Maximum number of queued commands. Default: 1024.
    pub max_ingress_queue: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            control: ControlConfig::default(),
            max_ingress_queue: 1024,
        }
    }
}

impl DispatcherConfig {
    /// Validate the control settings and the queue capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_ingress_queue == 0 {
            return Err(ConfigError::IngressQueueZero);
        }
        self.control.validate()
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected by [`DispatcherConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// A distance is NaN, infinite, or out of range.
    InvalidDistance {
        /// The offending field.
        field: &'static str,
        /// Its value.
        value: f64,
    },
    /// The manual route band has `min > max`.
    ManualBandInverted {
        /// Configured minimum.
        min: f64,
        /// Configured maximum.
        max: f64,
    },
    /// A timer threshold or the tick length is invalid.
    InvalidDuration {
        /// The offending field.
        field: &'static str,
        /// Its value.
        value: f64,
    },
    /// A speed is NaN, infinite, or out of range.
    InvalidSpeed {
        /// The offending field.
        field: &'static str,
        /// Its value.
        value: f64,
    },
    /// Ingress queue capacity is zero.
    IngressQueueZero,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDistance { field, value } => {
                write!(f, "{field} must be a finite positive distance, got {value}")
            }
            Self::ManualBandInverted { min, max } => {
                write!(f, "manual_min_lookahead_m {min} exceeds manual_max_route_m {max}")
            }
            Self::InvalidDuration { field, value } => {
                write!(f, "{field} must be a finite non-negative duration, got {value}")
            }
            Self::InvalidSpeed { field, value } => {
                write!(f, "{field} must be a finite speed, got {value}")
            }
            Self::IngressQueueZero => write!(f, "max_ingress_queue must be at least 1"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(DispatcherConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_queue_rejected() {
        let cfg = DispatcherConfig {
            max_ingress_queue: 0,
            ..DispatcherConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::IngressQueueZero));
    }

    #[test]
    fn nan_lookahead_rejected() {
        let cfg = ControlConfig {
            node_lookahead_m: f64::NAN,
            ..ControlConfig::default()
        };
        match cfg.validate() {
            Err(ConfigError::InvalidDistance { field, .. }) => {
                assert_eq!(field, "node_lookahead_m")
            }
            other => panic!("expected InvalidDistance, got {other:?}"),
        }
    }

    #[test]
    fn inverted_manual_band_rejected() {
        let cfg = ControlConfig {
            manual_min_lookahead_m: 2000.0,
            manual_max_route_m: 100.0,
            ..ControlConfig::default()
        };
        match cfg.validate() {
            Err(ConfigError::ManualBandInverted { min, max }) => {
                assert_eq!((min, max), (2000.0, 100.0))
            }
            other => panic!("expected ManualBandInverted, got {other:?}"),
        }
    }

    #[test]
    fn zero_tick_rejected() {
        let cfg = ControlConfig {
            tick_seconds: 0.0,
            ..ControlConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidDuration {
                field: "tick_seconds",
                ..
            })
        ));
    }

    #[test]
    fn negative_claim_wait_rejected() {
        let cfg = ControlConfig {
            wait_before_claim_s: -1.0,
            ..ControlConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
