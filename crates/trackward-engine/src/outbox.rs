//! Deferred cross-train effects.
//!
//! While one train is updated it may need to act on another: stop it,
//! drop it back to node control, or ask for deadlock traps to be
//! recomputed. Those actions are queued here as [`Intent`]s and applied
//! after every train has had its primary update, so no train observes a
//! half-updated neighbour.

use trackward_core::{SectionId, TrainId};

/// An effect on another train or on shared state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    /// Command `train` to zero speed this tick.
    StopTrain {
        /// The train to stop.
        train: TrainId,
    },
    /// Drop `train` from signal to node control because another train
    /// entered `section` on its route.
    SwitchToNodeControl {
        /// The train to downgrade.
        train: TrainId,
        /// The section that was intruded on.
        section: SectionId,
    },
    /// Recompute deadlock traps before the next reservation pass.
    RefreshDeadlocks,
}

/// Per-tick queue of intents, flushed in insertion order.
#[derive(Clone, Debug, Default)]
pub struct Outbox {
    intents: Vec<Intent>,
}

impl Outbox {
    /// An empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an intent. Duplicates are dropped.
    pub fn push(&mut self, intent: Intent) {
        if !self.intents.contains(&intent) {
            self.intents.push(intent);
        }
    }

    /// Number of queued intents.
    pub fn len(&self) -> usize {
        self.intents.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Take every queued intent, leaving the outbox empty.
    pub fn drain(&mut self) -> impl Iterator<Item = Intent> + '_ {
        self.intents.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_collapse_and_order_is_kept() {
        let mut o = Outbox::new();
        o.push(Intent::StopTrain { train: TrainId(2) });
        o.push(Intent::RefreshDeadlocks);
        o.push(Intent::StopTrain { train: TrainId(2) });
        assert_eq!(o.len(), 2);
        let drained: Vec<_> = o.drain().collect();
        assert_eq!(drained[0], Intent::StopTrain { train: TrainId(2) });
        assert!(o.is_empty());
    }
}
