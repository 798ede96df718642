//! Platforms.

use trackward_core::{PlatformId, SectionId, StationId};

/// A stopping place on one section. Platforms of the same station are
/// interchangeable for station-stop relocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Platform {
    /// This platform's id.
    pub id: PlatformId,
    /// The station the platform belongs to.
    pub station: StationId,
    /// Display name.
    pub name: String,
    /// Section the platform lies on.
    pub section: SectionId,
}
