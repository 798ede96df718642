//! Test networks for trackward development.
//!
//! Small, fixed layouts with known ids so tests can state expectations
//! in metres and section indices:
//!
//! - [`straight_line`]: a chain of plain sections between two buffers.
//! - [`passing_loop`]: single track with one loop, the standard
//!   deadlock scenario.
//! - [`signalled_line`]: five sections with two block signals and a
//!   speed post.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use trackward_core::{Direction, SectionId, SignalId, SpeedLimit, SpeedPostId};
use trackward_network::{
    AspectSpeeds, NetworkBuilder, SectionKind, SignalSpeed, SpeedPostKind, TrackNetwork,
};
use trackward_route::Route;

/// Sections linked end to end in `Ahead` direction. The outer two are
/// buffers; a single section is a buffer at both ends.
pub fn straight_line(lengths: &[f64]) -> (TrackNetwork, Vec<SectionId>) {
    let mut b = NetworkBuilder::new();
    let ids = line(&mut b, lengths);
    (b.build().expect("straight line builds"), ids)
}

fn line(b: &mut NetworkBuilder, lengths: &[f64]) -> Vec<SectionId> {
    let last = lengths.len().saturating_sub(1);
    let ids: Vec<SectionId> = lengths
        .iter()
        .enumerate()
        .map(|(i, &len)| {
            let kind = if i == 0 || i == last {
                SectionKind::EndOfTrack
            } else {
                SectionKind::Normal
            };
            b.add_section(kind, len)
        })
        .collect();
    for pair in ids.windows(2) {
        b.connect(pair[0], Direction::Ahead, pair[1], Direction::Ahead);
    }
    ids
}

/// A route over `sections`, all travelled in `direction`.
///
/// For `Reverse`, pass the sections in travel order.
pub fn route(net: &TrackNetwork, sections: &[SectionId], direction: Direction) -> Route {
    Route::from_sections(net, sections.iter().map(|&s| (s, direction)))
        .expect("sections form a contiguous route")
}

/// Single track with a passing loop.
///
/// ```text
///                 ┌── m1 (400) ──┐
/// w0 (500) ── j1 ─┤              ├─ j2 ── e0 (500)
///                 └── l1 (450) ──┘
/// ```
///
/// `j1` and `j2` are 50 m junctions. Leg 0 at both leads to `m1`, the
/// initial alignment.
pub struct PassingLoop {
    pub net: TrackNetwork,
    pub w0: SectionId,
    pub j1: SectionId,
    pub m1: SectionId,
    pub l1: SectionId,
    pub j2: SectionId,
    pub e0: SectionId,
}

pub fn passing_loop() -> PassingLoop {
    let mut b = NetworkBuilder::new();
    let w0 = b.add_section(SectionKind::EndOfTrack, 500.0);
    let j1 = b.add_section(SectionKind::Junction, 50.0);
    let m1 = b.add_section(SectionKind::Normal, 400.0);
    let l1 = b.add_section(SectionKind::Normal, 450.0);
    let j2 = b.add_section(SectionKind::Junction, 50.0);
    let e0 = b.add_section(SectionKind::EndOfTrack, 500.0);
    b.connect(w0, Direction::Ahead, j1, Direction::Ahead)
        .connect(j1, Direction::Ahead, m1, Direction::Ahead)
        .connect(j1, Direction::Ahead, l1, Direction::Ahead)
        .connect(m1, Direction::Ahead, j2, Direction::Ahead)
        .connect(l1, Direction::Ahead, j2, Direction::Ahead)
        .connect(j2, Direction::Ahead, e0, Direction::Ahead);
    PassingLoop {
        net: b.build().expect("passing loop builds"),
        w0,
        j1,
        m1,
        l1,
        j2,
        e0,
    }
}

/// Five 200 m sections.
///
/// `signals[0]` stands at the far end of `sections[0]` and `signals[1]`
/// at the far end of `sections[2]`, both facing `Ahead`. A permanent
/// 15 m/s post sits 100 m into `sections[1]`. Clear aspects lift the
/// signal limit; approach imposes 20 m/s.
pub struct SignalledLine {
    pub net: TrackNetwork,
    pub sections: Vec<SectionId>,
    pub signals: Vec<SignalId>,
    pub speed_post: SpeedPostId,
}

pub fn signalled_line() -> SignalledLine {
    let mut b = NetworkBuilder::new();
    let sections = line(&mut b, &[200.0; 5]);
    let speeds = AspectSpeeds {
        restricting: SignalSpeed::Limit(SpeedLimit::uniform(8.0)),
        approach: SignalSpeed::Limit(SpeedLimit::uniform(20.0)),
        clear: SignalSpeed::Reset,
    };
    let signals = vec![
        b.add_end_signal(sections[0], Direction::Ahead, speeds),
        b.add_end_signal(sections[2], Direction::Ahead, speeds),
    ];
    let speed_post = b.add_speed_post(
        sections[1],
        Direction::Ahead,
        100.0,
        SpeedPostKind::Permanent,
        SpeedLimit::uniform(15.0),
    );
    SignalledLine {
        net: b.build().expect("signalled line builds"),
        sections,
        signals,
        speed_post,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_legs_are_in_link_order() {
        let f = passing_loop();
        let r = route(&f.net, &[f.w0, f.j1, f.m1, f.j2, f.e0], Direction::Ahead);
        assert_eq!(r.get(1).and_then(|e| e.leg), Some(0));
        let r = route(&f.net, &[f.w0, f.j1, f.l1, f.j2, f.e0], Direction::Ahead);
        assert_eq!(r.get(1).and_then(|e| e.leg), Some(1));
    }

    #[test]
    fn signals_sit_at_section_ends() {
        let f = signalled_line();
        assert_eq!(f.net.section(f.sections[0]).end_signal(Direction::Ahead), Some(f.signals[0]));
        assert_eq!(f.net.section(f.sections[2]).end_signal(Direction::Ahead), Some(f.signals[1]));
        assert_eq!(f.net.section(f.sections[1]).end_signal(Direction::Ahead), None);
    }
}
