//! Signals and speed posts ahead of a train.
//!
//! [`Lookahead`] is a deque ordered by distance from the train front:
//!
//! - the front item is the nearest one not yet passed;
//! - distances never decrease along the deque;
//! - the deque stops growing once it covers the lookahead distance or
//!   its last item is a signal at stop.
//!
//! Distances are recomputed each tick from the first item: `d[0]` is
//! measured along the route, and each later item keeps the gap to its
//! predecessor captured when it was appended.

use std::collections::VecDeque;

use trackward_core::{SignalId, SpeedLimit, SpeedPostId};
use trackward_network::{Aspect, SignalSpeed, TrackNetwork, TrackObject};
use trackward_route::Route;

/// What a lookahead item refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// A signal.
    Signal(SignalId),
    /// A speed post or reset board.
    SpeedPost(SpeedPostId),
}

/// The speed effect of passing an item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ItemSpeed {
    /// No effect.
    NoLimit,
    /// Impose a limit.
    Limit(SpeedLimit),
    /// Revert to the previous limit.
    Reset,
}

/// One signal or speed post ahead of the front.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LookaheadItem {
    /// The object.
    pub kind: ItemKind,
    /// Route index of its section.
    pub route_index: usize,
    /// Offset within the section.
    pub offset_m: f64,
    /// Distance from the train front.
    pub distance_m: f64,
    /// Distance from the previous item, or from the front for the first
    /// item appended.
    pub gap_m: f64,
    /// Last observed aspect. Always [`Aspect::Stop`] for speed posts.
    pub aspect: Aspect,
}

impl LookaheadItem {
    /// Whether this is a signal showing stop.
    pub fn is_stop_signal(&self) -> bool {
        matches!(self.kind, ItemKind::Signal(_)) && self.aspect == Aspect::Stop
    }

    /// The speed effect of passing this item at its current aspect.
    pub fn speed(&self, net: &TrackNetwork) -> ItemSpeed {
        match self.kind {
            ItemKind::Signal(id) => match net.signal(id).speeds.for_aspect(self.aspect) {
                SignalSpeed::Unchanged => ItemSpeed::NoLimit,
                SignalSpeed::Limit(l) => ItemSpeed::Limit(l),
                SignalSpeed::Reset => ItemSpeed::Reset,
            },
            ItemKind::SpeedPost(id) => {
                let post = net.speed_post(id);
                if post.reset {
                    ItemSpeed::Reset
                } else {
                    ItemSpeed::Limit(post.limit)
                }
            }
        }
    }
}

/// Deque of items ahead of the train front.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Lookahead {
    items: VecDeque<LookaheadItem>,
    scanned: Option<(usize, f64)>,
}

impl Lookahead {
    /// An empty lookahead.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored parts.
    pub fn from_parts(items: impl IntoIterator<Item = LookaheadItem>, scanned: Option<(usize, f64)>) -> Self {
        Self {
            items: items.into_iter().collect(),
            scanned,
        }
    }

    /// Items, nearest first.
    pub fn items(&self) -> impl Iterator<Item = &LookaheadItem> + '_ {
        self.items.iter()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the deque is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Route position the scan has covered, exclusive.
    pub fn scanned(&self) -> Option<(usize, f64)> {
        self.scanned
    }

    /// The nearest signal ahead, if any is tracked.
    pub fn next_signal(&self) -> Option<&LookaheadItem> {
        self.items
            .iter()
            .find(|i| matches!(i.kind, ItemKind::Signal(_)))
    }

    /// Forget everything. Called whenever the route changes.
    pub fn clear(&mut self) {
        self.items.clear();
        self.scanned = None;
    }

    /// Recompute distances from `front` and pick up current aspects.
    ///
    /// Items already passed keep the aspect they were passed at.
    pub fn refresh(&mut self, net: &TrackNetwork, route: &Route, front: (usize, f64)) {
        let mut prev: Option<f64> = None;
        for item in self.items.iter_mut() {
            item.distance_m = match prev {
                None => route.distance(net, front, (item.route_index, item.offset_m)),
                Some(d) => d + item.gap_m,
            };
            prev = Some(item.distance_m);
            if let ItemKind::Signal(id) = item.kind {
                if item.distance_m >= 0.0 {
                    item.aspect = net.signal_state(id).aspect;
                }
            }
        }
    }

    /// Remove and return the items the front has passed.
    pub fn pop_passed(&mut self) -> Vec<LookaheadItem> {
        let mut passed = Vec::new();
        while self.items.front().is_some_and(|i| i.distance_m < 0.0) {
            if let Some(item) = self.items.pop_front() {
                passed.push(item);
            }
        }
        passed
    }

    /// Append items along `route` until `limit_m` is covered, the route
    /// ends, or a stop signal is reached.
    pub fn fill(&mut self, net: &TrackNetwork, route: &Route, front: (usize, f64), limit_m: f64) {
        if route.is_empty() {
            return;
        }
        let (start_index, start_offset, inclusive) = match self.scanned {
            Some((i, o)) => (i, o, false),
            None => (front.0, front.1, true),
        };
        for index in start_index..route.len() {
            if self.is_complete(limit_m) {
                return;
            }
            let Some(e) = route.get(index) else { return };
            for item in net.section(e.section).items(e.direction) {
                if index == start_index {
                    let ahead = if inclusive {
                        item.offset_m >= start_offset
                    } else {
                        item.offset_m > start_offset
                    };
                    if !ahead {
                        continue;
                    }
                }
                let kind = match item.object {
                    TrackObject::Signal(s) => ItemKind::Signal(s),
                    TrackObject::SpeedPost(p) => ItemKind::SpeedPost(p),
                };
                let aspect = match kind {
                    ItemKind::Signal(s) => net.signal_state(s).aspect,
                    ItemKind::SpeedPost(_) => Aspect::Stop,
                };
                let distance_m = route.distance(net, front, (index, item.offset_m));
                let gap_m = match self.items.back() {
                    Some(prev) => distance_m - prev.distance_m,
                    None => distance_m,
                };
                self.items.push_back(LookaheadItem {
                    kind,
                    route_index: index,
                    offset_m: item.offset_m,
                    distance_m,
                    gap_m,
                    aspect,
                });
                self.scanned = Some((index, item.offset_m));
                if self.is_complete(limit_m) {
                    return;
                }
            }
            self.scanned = Some((index, net.length_m(e.section)));
        }
    }

    /// Refresh, pop passed items and fill in one go.
    pub fn update(
        &mut self,
        net: &TrackNetwork,
        route: &Route,
        front: (usize, f64),
        limit_m: f64,
    ) -> Vec<LookaheadItem> {
        self.refresh(net, route, front);
        let passed = self.pop_passed();
        self.fill(net, route, front, limit_m);
        passed
    }

    /// Re-index items after the route was rebuilt from `old` to `new`.
    ///
    /// Items whose section is no longer on the route are dropped, together
    /// with everything after them.
    pub fn rebase(&mut self, old: &Route, new: &Route) {
        let map = |index: usize| -> Option<usize> {
            let e = old.get(index)?;
            let hint = index.min(new.len().saturating_sub(1));
            new.index_of(e.section, hint)
                .filter(|&i| new.get(i).is_some_and(|n| n.direction == e.direction))
        };
        let mut kept = 0;
        for item in self.items.iter_mut() {
            match map(item.route_index) {
                Some(i) => {
                    item.route_index = i;
                    kept += 1;
                }
                None => break,
            }
        }
        let complete = kept == self.items.len();
        self.items.truncate(kept);
        self.scanned = if complete {
            self.scanned
                .and_then(|(i, o)| map(i).map(|n| (n, o)))
                .or_else(|| self.items.back().map(|b| (b.route_index, b.offset_m)))
        } else {
            self.items.back().map(|b| (b.route_index, b.offset_m))
        };
    }

    fn is_complete(&self, limit_m: f64) -> bool {
        self.items
            .back()
            .is_some_and(|b| b.distance_m >= limit_m || b.is_stop_signal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackward_core::Direction;
    use trackward_test_utils::{route, signalled_line};

    #[test]
    fn fill_stops_at_stop_signal() {
        let f = signalled_line();
        let r = route(&f.net, &f.sections, Direction::Ahead);
        let mut la = Lookahead::new();
        la.fill(&f.net, &r, (0, 50.0), 5000.0);
        // The speed post on s1 lies beyond the first signal at stop.
        assert_eq!(la.len(), 1);
        assert_eq!(la.next_signal().map(|i| i.kind), Some(ItemKind::Signal(f.signals[0])));
        assert_eq!(la.items().next().map(|i| i.distance_m), Some(150.0));
    }

    #[test]
    fn distances_follow_the_front() {
        let mut f = signalled_line();
        let r = route(&f.net, &f.sections, Direction::Ahead);
        f.net.signal_state_mut(f.signals[0]).aspect = Aspect::Clear;
        f.net.signal_state_mut(f.signals[0]).enabled_for = Some(trackward_core::TrainId(1));
        let mut la = Lookahead::new();
        la.fill(&f.net, &r, (0, 0.0), 5000.0);
        assert!(la.len() >= 2);
        la.refresh(&f.net, &r, (0, 120.0));
        let d: Vec<f64> = la.items().map(|i| i.distance_m).collect();
        assert_eq!(d[0], 80.0);
        assert!(d.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn passed_items_are_popped() {
        let mut f = signalled_line();
        let r = route(&f.net, &f.sections, Direction::Ahead);
        f.net.signal_state_mut(f.signals[0]).aspect = Aspect::Clear;
        let mut la = Lookahead::new();
        la.fill(&f.net, &r, (0, 0.0), 5000.0);
        let before = la.len();
        let passed = la.update(&f.net, &r, (1, 10.0), 5000.0);
        assert_eq!(passed.len(), 1);
        assert_eq!(passed[0].kind, ItemKind::Signal(f.signals[0]));
        assert!(passed[0].distance_m < 0.0);
        assert!(la.len() >= before - 1);
    }

    #[test]
    fn rebase_shifts_indices() {
        let mut f = signalled_line();
        f.net.signal_state_mut(f.signals[0]).aspect = Aspect::Clear;
        let old = route(&f.net, &f.sections, Direction::Ahead);
        let new = route(&f.net, &f.sections[1..], Direction::Ahead);
        let mut la = Lookahead::new();
        la.fill(&f.net, &old, (1, 0.0), 5000.0);
        let first = la.items().next().copied().expect("item on s1");
        la.rebase(&old, &new);
        let moved = la.items().next().copied().expect("still present");
        assert_eq!(moved.route_index, first.route_index - 1);
    }
}
