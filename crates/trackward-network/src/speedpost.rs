//! Speed posts.

use trackward_core::{Direction, SectionId, SpeedLimit, SpeedPostId};

/// Whether a post sets the standing or the temporary limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpeedPostKind {
    /// Line speed.
    Permanent,
    /// Temporary restriction.
    Temporary,
}

/// A speed post or limit-reset board.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeedPost {
    /// This post's id.
    pub id: SpeedPostId,
    /// Section the post stands on.
    pub section: SectionId,
    /// Travel direction the post faces.
    pub direction: Direction,
    /// Distance from the entry end of `section` in `direction`.
    pub offset_m: f64,
    /// Which limit the post governs.
    pub kind: SpeedPostKind,
    /// The imposed limit. Ignored when `reset` is set.
    pub limit: SpeedLimit,
    /// The post reverts to the previous limit instead of imposing one.
    pub reset: bool,
}
