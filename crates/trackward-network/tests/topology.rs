//! Property tests over randomly generated line networks.

use proptest::prelude::*;
use trackward_core::Direction;
use trackward_network::{NetworkBuilder, SectionKind, TrackNetwork};

fn line(lengths: &[f64], flips: &[bool]) -> TrackNetwork {
    let mut b = NetworkBuilder::new();
    let ids: Vec<_> = lengths
        .iter()
        .map(|len| b.add_section(SectionKind::Normal, *len))
        .collect();
    // Orientation of each section relative to the line.
    let dir = |i: usize| {
        if flips[i] {
            Direction::Reverse
        } else {
            Direction::Ahead
        }
    };
    for i in 1..ids.len() {
        b.connect(ids[i - 1], dir(i - 1), ids[i], dir(i));
    }
    b.build().expect("line is valid")
}

proptest! {
    #[test]
    fn every_pin_has_a_reciprocal(
        spec in prop::collection::vec((1.0f64..500.0, any::<bool>()), 1..20)
    ) {
        let (lengths, flips): (Vec<_>, Vec<_>) = spec.into_iter().unzip();
        let net = line(&lengths, &flips);
        for s in net.sections() {
            for d in Direction::ALL {
                for pin in s.pins(d) {
                    let back = net.next_pin(pin.section, pin.direction.reverse());
                    prop_assert_eq!(back.map(|p| p.section), Some(s.id()));
                    prop_assert_eq!(back.map(|p| p.direction), Some(d.reverse()));
                }
            }
        }
    }

    #[test]
    fn walking_the_line_visits_every_section_once(
        spec in prop::collection::vec((1.0f64..500.0, any::<bool>()), 1..20)
    ) {
        let (lengths, flips): (Vec<_>, Vec<_>) = spec.into_iter().unzip();
        let n = lengths.len();
        let net = line(&lengths, &flips);
        let mut at = net.sections()[0].id();
        let mut dir = if flips[0] { Direction::Reverse } else { Direction::Ahead };
        let mut seen = vec![at];
        while let Some(pin) = net.next_pin(at, dir) {
            at = pin.section;
            dir = pin.direction;
            seen.push(at);
            prop_assert!(seen.len() <= n);
        }
        prop_assert_eq!(seen.len(), n);
    }
}
