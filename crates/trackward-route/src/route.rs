//! Contiguous directed routes.

use std::ops::Range;

use trackward_core::{Direction, SectionId};
use trackward_network::TrackNetwork;

use crate::element::RouteElement;
use crate::error::RouteError;

/// An ordered run of sections, each linked to the previous by a pin.
///
/// Positions along a route are `(index, offset_m)` pairs, the offset
/// measured from the entry end of the element's section in its travel
/// direction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Route {
    elements: Vec<RouteElement>,
}

impl Route {
    /// An empty route.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a route from `(section, direction)` pairs, checking contiguity
    /// and computing switch legs.
    pub fn from_sections(
        network: &TrackNetwork,
        sections: impl IntoIterator<Item = (SectionId, Direction)>,
    ) -> Result<Self, RouteError> {
        let mut route = Self::new();
        for (section, direction) in sections {
            route.push(network, section, direction)?;
        }
        if route.is_empty() {
            return Err(RouteError::EmptyRoute);
        }
        Ok(route)
    }

    /// Rebuild a route from stored elements. Linkage is recomputed from
    /// the network, so stale legs in the input are ignored.
    pub fn from_elements(
        network: &TrackNetwork,
        elements: &[RouteElement],
    ) -> Result<Self, RouteError> {
        Self::from_sections(network, elements.iter().map(|e| (e.section, e.direction)))
    }

    /// Append a section, checking it is linked from the current last one.
    pub fn push(
        &mut self,
        network: &TrackNetwork,
        section: SectionId,
        direction: Direction,
    ) -> Result<(), RouteError> {
        if !network.contains(section) {
            return Err(RouteError::UnknownSection { section });
        }
        let prev = self.elements.last().copied();
        if let Some(prev) = prev {
            let linked = network
                .section(prev.section)
                .pins(prev.direction)
                .iter()
                .any(|p| p.section == section && p.direction == direction);
            if !linked {
                return Err(RouteError::Discontiguous {
                    index: self.elements.len(),
                    from: prev.section,
                    to: section,
                    direction,
                });
            }
            let leg = network.required_leg(prev.section, prev.direction, prev.from, Some(section));
            if let Some(last) = self.elements.last_mut() {
                last.leg = leg;
            }
        }
        let from = prev.map(|e| e.section);
        self.elements.push(RouteElement {
            section,
            direction,
            leg: network.required_leg(section, direction, from, None),
            from,
        });
        Ok(())
    }

    // ── Access ─────────────────────────────────────────────────────

    /// The elements in travel order.
    pub fn elements(&self) -> &[RouteElement] {
        &self.elements
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the route has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&RouteElement> {
        self.elements.get(index)
    }

    /// First element.
    pub fn first(&self) -> Option<&RouteElement> {
        self.elements.first()
    }

    /// Last element.
    pub fn last(&self) -> Option<&RouteElement> {
        self.elements.last()
    }

    /// Iterate over elements in travel order.
    pub fn iter(&self) -> std::slice::Iter<'_, RouteElement> {
        self.elements.iter()
    }

    /// Whether `section` appears anywhere on the route.
    pub fn contains(&self, section: SectionId) -> bool {
        self.elements.iter().any(|e| e.section == section)
    }

    /// Locate `section`, searching outward from `hint`.
    ///
    /// When a train moves monotonically the hint is its current index and
    /// the answer is usually at `hint` or `hint + 1`. If the section occurs
    /// twice, the occurrence nearer the hint wins, later index on a tie.
    pub fn index_of(&self, section: SectionId, hint: usize) -> Option<usize> {
        let n = self.elements.len();
        if n == 0 {
            return None;
        }
        let hint = hint.min(n - 1);
        for k in 0..n {
            let up = hint + k;
            if up < n && self.elements[up].section == section {
                return Some(up);
            }
            if k > 0 && k <= hint && self.elements[hint - k].section == section {
                return Some(hint - k);
            }
            if up >= n && k >= hint {
                break;
            }
        }
        None
    }

    // ── Distances ──────────────────────────────────────────────────

    /// Sum of section lengths over `range`.
    pub fn length_of(&self, network: &TrackNetwork, range: Range<usize>) -> f64 {
        self.elements[range]
            .iter()
            .map(|e| network.length_m(e.section))
            .sum()
    }

    /// Length of the whole route.
    pub fn total_length(&self, network: &TrackNetwork) -> f64 {
        self.length_of(network, 0..self.elements.len())
    }

    /// Distance from `(index, offset_m)` to the far end of the last element.
    pub fn remaining_length(&self, network: &TrackNetwork, index: usize, offset_m: f64) -> f64 {
        if index >= self.elements.len() {
            return 0.0;
        }
        self.length_of(network, index..self.elements.len()) - offset_m
    }

    /// Distance from `(index, offset_m)` to the far end of element `to`.
    ///
    /// Negative when `to` lies behind `index`.
    pub fn distance_to_end_of(
        &self,
        network: &TrackNetwork,
        index: usize,
        offset_m: f64,
        to: usize,
    ) -> f64 {
        let end = network.length_m(self.elements[to].section);
        self.distance(network, (index, offset_m), (to, end))
    }

    /// Signed distance along the route between two positions.
    pub fn distance(&self, network: &TrackNetwork, from: (usize, f64), to: (usize, f64)) -> f64 {
        if from.0 <= to.0 {
            self.length_of(network, from.0..to.0) - from.1 + to.1
        } else {
            -self.distance(network, to, from)
        }
    }

    // ── Editing ────────────────────────────────────────────────────

    /// Keep the first `len` elements and return the rest, nearest first.
    ///
    /// The new last element keeps the leg it needed for the dropped
    /// successor.
    pub fn truncate(&mut self, len: usize) -> Vec<RouteElement> {
        if len >= self.elements.len() {
            return Vec::new();
        }
        self.elements.split_off(len)
    }

    /// Drop everything before `index`, returning the dropped elements.
    pub fn drain_before(&mut self, index: usize) -> Vec<RouteElement> {
        let index = index.min(self.elements.len());
        let dropped: Vec<_> = self.elements.drain(..index).collect();
        if let Some(first) = self.elements.first_mut() {
            first.from = None;
        }
        dropped
    }

    /// The same sections traversed the other way.
    pub fn reversed(&self, network: &TrackNetwork) -> Result<Self, RouteError> {
        Self::from_sections(
            network,
            self.elements
                .iter()
                .rev()
                .map(|e| (e.section, e.direction.reverse())),
        )
    }

    /// Replace elements `start..=end` with `replacement`, which must begin
    /// on the section at `start` and finish on the section at `end`.
    ///
    /// Returns the replaced elements that the new route no longer uses.
    /// On error the route is unchanged.
    pub fn splice(
        &mut self,
        network: &TrackNetwork,
        start: usize,
        end: usize,
        replacement: &Route,
    ) -> Result<Vec<RouteElement>, RouteError> {
        let (Some(s), Some(e)) = (self.elements.get(start), self.elements.get(end)) else {
            return Err(RouteError::EmptyRoute);
        };
        let matches = replacement.first().map(|f| f.section) == Some(s.section)
            && replacement.last().map(|l| l.section) == Some(e.section)
            && start <= end;
        if !matches {
            return Err(RouteError::SpliceMismatch {
                start: s.section,
                end: e.section,
            });
        }
        let sections = self.elements[..start]
            .iter()
            .chain(replacement.iter())
            .chain(self.elements[end + 1..].iter())
            .map(|e| (e.section, e.direction));
        let rebuilt = Self::from_sections(network, sections)?;
        let removed = self.elements[start..=end]
            .iter()
            .filter(|old| !replacement.contains(old.section))
            .copied()
            .collect();
        *self = rebuilt;
        Ok(removed)
    }
}

impl<'a> IntoIterator for &'a Route {
    type Item = &'a RouteElement;
    type IntoIter = std::slice::Iter<'a, RouteElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}
