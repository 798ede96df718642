//! Route elements.

use trackward_core::{Direction, SectionId};

/// One section of a route and how it is traversed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RouteElement {
    /// The section.
    pub section: SectionId,
    /// Travel direction through it.
    pub direction: Direction,
    /// Switch leg required, when the section is switchable and the
    /// traversal uses a two-legged end.
    pub leg: Option<u8>,
    /// The preceding section on the route.
    pub from: Option<SectionId>,
}

impl RouteElement {
    /// An element with no linkage information yet.
    pub fn new(section: SectionId, direction: Direction) -> Self {
        Self {
            section,
            direction,
            leg: None,
            from: None,
        }
    }
}
