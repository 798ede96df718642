//! Train end positions and movement along the network.
//!
//! Movement always follows the current switch alignment. A backward move
//! is a forward move of the reversed position, so the end that leads the
//! movement is the one whose segments are checked.

use smallvec::{smallvec, SmallVec};
use trackward_core::{Direction, SectionId};
use trackward_network::TrackNetwork;

/// Longest chain of sections a single train may cover.
const MAX_TRAIN_SECTIONS: usize = 64;

/// One end of a train.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainPosition {
    /// Section the end is on.
    pub section: SectionId,
    /// Distance from the entry end of `section` in `direction`.
    pub offset_m: f64,
    /// Travel direction.
    pub direction: Direction,
    /// Index of `section` in the active route.
    pub route_index: usize,
}

/// The part of one section swept by a move.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    /// The section.
    pub section: SectionId,
    /// Moving direction through it.
    pub direction: Direction,
    /// Offset at the start of the sweep.
    pub from_m: f64,
    /// Offset at the end of the sweep.
    pub to_m: f64,
    /// The move left the section through its far end.
    pub exited: bool,
}

impl Segment {
    /// Whether an item at `offset_m` was passed during this sweep.
    ///
    /// An item is passed once the end is strictly beyond it; an item at
    /// the far end is passed when the section is left.
    pub fn passes(&self, offset_m: f64) -> bool {
        self.from_m <= offset_m && (offset_m < self.to_m || self.exited)
    }
}

/// Result of moving one end.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Movement {
    /// Sections swept, in order. The first is the starting section.
    pub segments: SmallVec<[Segment; 4]>,
    /// The move was cut short by the end of the track.
    pub blocked: bool,
}

impl Movement {
    /// Sections entered during the move, with the section they were
    /// entered from.
    pub fn entered(&self) -> impl Iterator<Item = (SectionId, &Segment)> + '_ {
        self.segments
            .windows(2)
            .map(|w| (w[0].section, &w[1]))
    }

    /// Distance actually covered, which is short of the request when
    /// the move was blocked.
    pub fn distance_m(&self) -> f64 {
        self.segments.iter().map(|s| s.to_m - s.from_m).sum()
    }
}

impl TrainPosition {
    /// A position at route index 0.
    pub fn new(section: SectionId, offset_m: f64, direction: Direction) -> Self {
        Self {
            section,
            offset_m,
            direction,
            route_index: 0,
        }
    }

    /// The same point seen travelling the other way.
    pub fn reversed(&self, network: &TrackNetwork) -> Self {
        Self {
            section: self.section,
            offset_m: (network.length_m(self.section) - self.offset_m).max(0.0),
            direction: self.direction.reverse(),
            route_index: 0,
        }
    }

    /// Move `distance_m` forward. Negative distances are treated as zero.
    pub fn advance(&mut self, network: &TrackNetwork, distance_m: f64) -> Movement {
        let mut movement = Movement::default();
        let mut remaining = distance_m.max(0.0);
        loop {
            let len = network.length_m(self.section);
            let room = (len - self.offset_m).max(0.0);
            if remaining <= room {
                let to = self.offset_m + remaining;
                movement.segments.push(self.segment(to, false));
                self.offset_m = to;
                return movement;
            }
            match network.next_pin(self.section, self.direction) {
                Some(pin) => {
                    movement.segments.push(self.segment(len, true));
                    remaining -= room;
                    self.section = pin.section;
                    self.direction = pin.direction;
                    self.offset_m = 0.0;
                }
                None => {
                    movement.segments.push(self.segment(len, false));
                    self.offset_m = len;
                    movement.blocked = true;
                    return movement;
                }
            }
        }
    }

    /// Move `distance_m` backward, keeping the travel direction.
    ///
    /// The returned segments are in the backward moving direction.
    pub fn retreat(&mut self, network: &TrackNetwork, distance_m: f64) -> Movement {
        let mut back = self.reversed(network);
        let movement = back.advance(network, distance_m);
        let index = self.route_index;
        *self = back.reversed(network);
        self.route_index = index;
        movement
    }

    fn segment(&self, to_m: f64, exited: bool) -> Segment {
        Segment {
            section: self.section,
            direction: self.direction,
            from_m: self.offset_m,
            to_m,
            exited,
        }
    }
}

/// Sections covered by a train from `rear` to `front`, rear first.
///
/// Walks the current alignment from the rear. If the front cannot be
/// reached the two end sections are returned.
pub fn occupied_sections(
    network: &TrackNetwork,
    rear: &TrainPosition,
    front: &TrainPosition,
) -> SmallVec<[SectionId; 4]> {
    let mut out: SmallVec<[SectionId; 4]> = smallvec![rear.section];
    let (mut at, mut dir) = (rear.section, rear.direction);
    while at != front.section {
        if out.len() >= MAX_TRAIN_SECTIONS {
            break;
        }
        match network.next_pin(at, dir) {
            Some(pin) => {
                at = pin.section;
                dir = pin.direction;
                out.push(at);
            }
            None => break,
        }
    }
    if at == front.section {
        return out;
    }
    if rear.section == front.section {
        smallvec![rear.section]
    } else {
        smallvec![rear.section, front.section]
    }
}

/// Place a rear end `length_m` behind `front`, or `None` if the track
/// behind the front ends sooner.
pub fn rear_from_front(
    network: &TrackNetwork,
    front: &TrainPosition,
    length_m: f64,
) -> Option<TrainPosition> {
    let mut rear = *front;
    let movement = rear.retreat(network, length_m);
    (!movement.blocked).then_some(rear)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackward_test_utils::straight_line;

    #[test]
    fn advance_within_section() {
        let (net, ids) = straight_line(&[100.0, 100.0]);
        let mut p = TrainPosition::new(ids[0], 10.0, Direction::Ahead);
        let m = p.advance(&net, 20.0);
        assert_eq!(p.offset_m, 30.0);
        assert_eq!(m.segments.len(), 1);
        assert!(!m.blocked);
    }

    #[test]
    fn advance_crosses_into_next_section() {
        let (net, ids) = straight_line(&[100.0, 100.0]);
        let mut p = TrainPosition::new(ids[0], 90.0, Direction::Ahead);
        let m = p.advance(&net, 25.0);
        assert_eq!(p.section, ids[1]);
        assert!((p.offset_m - 15.0).abs() < 1e-9);
        assert!(m.segments[0].exited);
        assert_eq!(m.entered().count(), 1);
    }

    #[test]
    fn advance_stops_at_end_of_track() {
        let (net, ids) = straight_line(&[100.0, 100.0]);
        let mut p = TrainPosition::new(ids[1], 50.0, Direction::Ahead);
        let m = p.advance(&net, 80.0);
        assert!(m.blocked);
        assert_eq!(p.offset_m, 100.0);
    }

    #[test]
    fn retreat_keeps_direction() {
        let (net, ids) = straight_line(&[100.0, 100.0]);
        let mut p = TrainPosition::new(ids[1], 10.0, Direction::Ahead);
        let m = p.retreat(&net, 30.0);
        assert_eq!(p.section, ids[0]);
        assert_eq!(p.direction, Direction::Ahead);
        assert!((p.offset_m - 80.0).abs() < 1e-9);
        assert_eq!(m.segments[0].direction, Direction::Reverse);
    }

    #[test]
    fn far_end_item_passes_on_exit_only() {
        let stay = Segment {
            section: SectionId(0),
            direction: Direction::Ahead,
            from_m: 90.0,
            to_m: 100.0,
            exited: false,
        };
        assert!(!stay.passes(100.0));
        let leave = Segment { exited: true, ..stay };
        assert!(leave.passes(100.0));
        assert!(stay.passes(95.0));
        assert!(!stay.passes(80.0));
    }

    #[test]
    fn occupied_walks_from_rear_to_front() {
        let (net, ids) = straight_line(&[100.0, 50.0, 100.0]);
        let front = TrainPosition::new(ids[2], 20.0, Direction::Ahead);
        let rear = rear_from_front(&net, &front, 120.0).unwrap();
        assert_eq!(rear.section, ids[0]);
        assert!((rear.offset_m - 50.0).abs() < 1e-9);
        let occ = occupied_sections(&net, &rear, &front);
        assert_eq!(occ.as_slice(), &ids[..]);
    }

    #[test]
    fn rear_that_runs_off_the_track_is_refused() {
        let (net, ids) = straight_line(&[100.0, 100.0]);
        let front = TrainPosition::new(ids[1], 10.0, Direction::Ahead);
        assert!(rear_from_front(&net, &front, 110.0).is_some());
        assert_eq!(rear_from_front(&net, &front, 150.0), None);
    }

    #[test]
    fn blocked_move_reports_covered_distance() {
        let (net, ids) = straight_line(&[100.0, 100.0]);
        let mut front = TrainPosition::new(ids[1], 10.0, Direction::Ahead);
        let movement = front.advance(&net, 200.0);
        assert!(movement.blocked);
        assert!((movement.distance_m() - 90.0).abs() < 1e-9);
        let mut back = TrainPosition::new(ids[0], 30.0, Direction::Ahead);
        let movement = back.retreat(&net, 50.0);
        assert!(movement.blocked);
        assert!((movement.distance_m() - 30.0).abs() < 1e-9);
    }
}
