//! Property tests for route index lookup.

use proptest::prelude::*;
use trackward_core::{Direction, SectionId};
use trackward_network::{NetworkBuilder, SectionKind, TrackNetwork};
use trackward_route::Route;

fn straight(n: usize) -> (TrackNetwork, Route) {
    let mut b = NetworkBuilder::new();
    let ids: Vec<_> = (0..n).map(|_| b.add_section(SectionKind::Normal, 50.0)).collect();
    for w in ids.windows(2) {
        b.connect(w[0], Direction::Ahead, w[1], Direction::Ahead);
    }
    let net = b.build().expect("valid");
    let route = Route::from_sections(&net, ids.iter().map(|s| (*s, Direction::Ahead)))
        .expect("contiguous");
    (net, route)
}

proptest! {
    #[test]
    fn index_of_agrees_with_linear_search(n in 1usize..40, target in 0u32..50, hint in 0usize..60) {
        let (_net, route) = straight(n);
        let expected = route.iter().position(|e| e.section == SectionId(target));
        prop_assert_eq!(route.index_of(SectionId(target), hint), expected);
    }

    #[test]
    fn distance_is_antisymmetric(
        n in 2usize..20,
        a in 0usize..20,
        b in 0usize..20,
        oa in 0.0f64..50.0,
        ob in 0.0f64..50.0,
    ) {
        let (net, route) = straight(n);
        let (a, b) = (a % n, b % n);
        let ab = route.distance(&net, (a, oa), (b, ob));
        let ba = route.distance(&net, (b, ob), (a, oa));
        prop_assert!((ab + ba).abs() < 1e-9);
    }
}
