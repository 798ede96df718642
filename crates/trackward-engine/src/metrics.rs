//! Per-tick metrics for the dispatcher.
//!
//! [`StepMetrics`] captures timing and occupancy counts for a single tick.

/// Timing and state counts collected during a single tick.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default)]
pub struct StepMetrics {
    /// Wall-clock time for the entire tick, in microseconds.
    pub total_us: u64,
    /// Time spent applying queued commands, in microseconds.
    pub command_processing_us: u64,
    /// Time spent moving trains and extending authority, in microseconds.
    pub train_update_us: u64,
    /// Time spent recomputing deadlock traps, in microseconds.
    pub deadlock_us: u64,
    /// Number of trains.
    pub trains: u32,
    /// Number of sections holding a reservation after the tick.
    pub reserved_sections: u32,
    /// Number of trains in OutOfControl after the tick.
    pub out_of_control: u32,
    /// Number of commands rejected while being applied this tick.
    pub commands_rejected: u32,
    /// Cumulative number of ingress rejections due to a full queue.
    pub queue_full_rejections: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = StepMetrics::default();
        assert_eq!(m.total_us, 0);
        assert_eq!(m.train_update_us, 0);
        assert_eq!(m.reserved_sections, 0);
        assert_eq!(m.queue_full_rejections, 0);
    }
}
