//! Speed limit bookkeeping.
//!
//! A train carries three independent limits: the one conveyed by the last
//! signal, the standing (permanent) line limit and a temporary limit.
//! Lowering a limit takes effect as soon as the front passes the item.
//! Raising a limit, or resetting one, waits until the whole train has
//! cleared the item; such changes sit in a pending queue measured in
//! metres still to travel.

use std::collections::VecDeque;

use trackward_core::{SpeedLimit, TrainClass};

use crate::config::SpeedPolicy;
use crate::lookahead::ItemSpeed;

/// Which limit an item acts on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LimitTarget {
    /// The signal limit.
    Signal,
    /// The standing line limit.
    Standing,
    /// The temporary limit.
    Temporary,
}

impl LimitTarget {
    /// Stable numeric tag used by the persistence codec.
    pub fn tag(self) -> u8 {
        match self {
            Self::Signal => 0,
            Self::Standing => 1,
            Self::Temporary => 2,
        }
    }

    /// Inverse of [`tag`](Self::tag).
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Signal),
            1 => Some(Self::Standing),
            2 => Some(Self::Temporary),
            _ => None,
        }
    }
}

/// Which of signal and standing limit was passed most recently.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LastPassed {
    /// Neither yet.
    #[default]
    None,
    /// A signal.
    Signal,
    /// A standing speed post.
    Standing,
}

impl LastPassed {
    /// Stable numeric tag used by the persistence codec.
    pub fn tag(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Signal => 1,
            Self::Standing => 2,
        }
    }

    /// Inverse of [`tag`](Self::tag).
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::None),
            1 => Some(Self::Signal),
            2 => Some(Self::Standing),
            _ => None,
        }
    }
}

/// A limit change waiting for the train to clear its item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingActivation {
    /// Limit the change applies to.
    pub target: LimitTarget,
    /// Revert to the previous limit instead of applying `limit`.
    pub reset: bool,
    /// New limit; ignored when `reset` is set.
    pub limit: SpeedLimit,
    /// Distance still to travel before the change applies.
    pub remaining_m: f64,
}

/// Current limits of one train.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpeedState {
    pub(crate) signal: Option<SpeedLimit>,
    pub(crate) standing: Option<SpeedLimit>,
    pub(crate) previous_standing: Option<SpeedLimit>,
    pub(crate) temporary: Option<SpeedLimit>,
    pub(crate) previous_temporary: Option<SpeedLimit>,
    pub(crate) last_passed: LastPassed,
    pub(crate) pending: VecDeque<PendingActivation>,
}

fn value(limit: Option<SpeedLimit>, class: TrainClass) -> f64 {
    limit.map_or(f64::INFINITY, |l| l.for_class(class))
}

impl SpeedState {
    /// No limits in force.
    pub fn new() -> Self {
        Self::default()
    }

    /// Changes not yet in force, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &PendingActivation> + '_ {
        self.pending.iter()
    }

    /// Record that the front passed an item `past_m` metres ago.
    ///
    /// `length_m` is the train length; an increase applies once the train
    /// has travelled that far beyond the item.
    pub fn pass(
        &mut self,
        class: TrainClass,
        target: LimitTarget,
        effect: ItemSpeed,
        past_m: f64,
        length_m: f64,
    ) {
        match target {
            LimitTarget::Signal => self.last_passed = LastPassed::Signal,
            LimitTarget::Standing => self.last_passed = LastPassed::Standing,
            LimitTarget::Temporary => {}
        }
        let (reset, limit) = match effect {
            ItemSpeed::NoLimit => return,
            ItemSpeed::Reset => (true, SpeedLimit::uniform(f64::INFINITY)),
            ItemSpeed::Limit(l) => (false, l),
        };
        let current = value(self.current(target), class);
        let proposed = if reset {
            value(self.previous(target), class)
        } else {
            limit.for_class(class)
        };
        let remaining_m = length_m - past_m.max(0.0);
        if proposed < current || remaining_m <= 0.0 {
            // Older changes on this limit are superseded; fold them in first
            // so the reset chain stays intact.
            self.fold_pending(target);
            self.apply(target, reset, limit);
        } else {
            if !reset {
                self.cap_pending(target, limit);
            }
            self.pending.push_back(PendingActivation {
                target,
                reset,
                limit,
                remaining_m,
            });
        }
    }

    fn fold_pending(&mut self, target: LimitTarget) {
        let (due, keep): (VecDeque<_>, VecDeque<_>) =
            self.pending.drain(..).partition(|p| p.target == target);
        self.pending = keep;
        for p in due {
            self.apply(p.target, p.reset, p.limit);
        }
    }

    /// Lower every waiting change on `target` to at most `ceiling`.
    ///
    /// The front is already under `ceiling`, so nothing that takes effect
    /// while the train straddles the earlier items may exceed it. Waiting
    /// resets are resolved to the value they would restore.
    fn cap_pending(&mut self, target: LimitTarget, ceiling: SpeedLimit) {
        let mut current = self.current(target);
        let mut previous = self.previous(target);
        for p in self.pending.iter_mut().filter(|p| p.target == target) {
            if p.reset {
                let restored = previous.unwrap_or(SpeedLimit::uniform(f64::INFINITY));
                current = previous;
                previous = None;
                p.reset = false;
                p.limit = restored.min(ceiling);
            } else {
                previous = current;
                current = Some(p.limit);
                p.limit = p.limit.min(ceiling);
            }
        }
    }

    /// Count down pending changes by `distance_m` and apply those due.
    pub fn travel(&mut self, distance_m: f64) {
        let d = distance_m.abs();
        for p in self.pending.iter_mut() {
            p.remaining_m -= d;
        }
        while self.pending.front().is_some_and(|p| p.remaining_m <= 0.0) {
            if let Some(p) = self.pending.pop_front() {
                self.apply(p.target, p.reset, p.limit);
            }
        }
    }

    /// Drop every limit. Used when a train is re-synchronised.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// The speed a train of `class` with maximum `max_mps` may run at.
    pub fn allowed(&self, policy: SpeedPolicy, class: TrainClass, max_mps: f64) -> f64 {
        let signal = value(self.signal, class);
        let standing = value(self.standing, class);
        let line = match policy {
            SpeedPolicy::Timetable => signal.min(standing),
            SpeedPolicy::Interactive => match self.last_passed {
                LastPassed::Signal if self.signal.is_some() => signal,
                LastPassed::Standing if self.standing.is_some() => standing,
                _ => signal.min(standing),
            },
        };
        line.min(value(self.temporary, class)).min(max_mps)
    }

    fn current(&self, target: LimitTarget) -> Option<SpeedLimit> {
        match target {
            LimitTarget::Signal => self.signal,
            LimitTarget::Standing => self.standing,
            LimitTarget::Temporary => self.temporary,
        }
    }

    fn previous(&self, target: LimitTarget) -> Option<SpeedLimit> {
        match target {
            LimitTarget::Signal => None,
            LimitTarget::Standing => self.previous_standing,
            LimitTarget::Temporary => self.previous_temporary,
        }
    }

    fn apply(&mut self, target: LimitTarget, reset: bool, limit: SpeedLimit) {
        match (target, reset) {
            (LimitTarget::Signal, true) => self.signal = None,
            (LimitTarget::Signal, false) => self.signal = Some(limit),
            (LimitTarget::Standing, true) => {
                self.standing = self.previous_standing.take();
            }
            (LimitTarget::Standing, false) => {
                self.previous_standing = self.standing;
                self.standing = Some(limit);
            }
            (LimitTarget::Temporary, true) => {
                self.temporary = self.previous_temporary.take();
            }
            (LimitTarget::Temporary, false) => {
                self.previous_temporary = self.temporary;
                self.temporary = Some(limit);
            }
        }
    }
}
