//! Train paths: the long-lived plan followed under automatic control.

use trackward_core::{AlternativeId, PlatformId, SectionId, StationId};
use trackward_network::TrackNetwork;

use crate::error::RouteError;
use crate::route::Route;

/// A scheduled stop at a platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StationStop {
    /// Subpath the stop belongs to.
    pub subpath: usize,
    /// The station.
    pub station: StationId,
    /// The platform currently planned.
    pub platform: PlatformId,
    /// Section of that platform.
    pub section: SectionId,
}

/// How an alternative is matched against a train's route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlternativeKind {
    /// Branches from the route of a specific subpath at its start section.
    PathBased {
        /// The subpath it belongs to.
        subpath: usize,
    },
    /// Offered to any train whose contested stretch includes this section.
    LocationBased {
        /// The section the alternative avoids.
        contested: SectionId,
    },
}

/// A precomputed detour that rejoins the main route.
#[derive(Clone, Debug, PartialEq)]
pub struct AlternativePath {
    /// This alternative's id.
    pub id: AlternativeId,
    /// How the alternative is selected.
    pub kind: AlternativeKind,
    /// Route of the detour, from the split section to the rejoin section
    /// inclusive.
    pub route: Route,
}

impl AlternativePath {
    /// Section where the detour leaves the main route.
    pub fn start(&self) -> Option<SectionId> {
        self.route.first().map(|e| e.section)
    }

    /// Section where the detour rejoins the main route.
    pub fn end(&self) -> Option<SectionId> {
        self.route.last().map(|e| e.section)
    }
}

/// Subpaths, alternatives and station stops assigned to one train.
///
/// Consecutive subpaths run in opposite directions; the end of one is a
/// reversal point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainPath {
    subpaths: Vec<Route>,
    alternatives: Vec<AlternativePath>,
    stops: Vec<StationStop>,
}

impl TrainPath {
    /// A path made of `subpaths`. At least one is required.
    pub fn new(subpaths: Vec<Route>) -> Result<Self, RouteError> {
        if subpaths.is_empty() || subpaths.iter().any(Route::is_empty) {
            return Err(RouteError::EmptyRoute);
        }
        Ok(Self {
            subpaths,
            alternatives: Vec::new(),
            stops: Vec::new(),
        })
    }

    /// A path with a single subpath.
    pub fn single(route: Route) -> Result<Self, RouteError> {
        Self::new(vec![route])
    }

    /// Register an alternative. Returns its id.
    pub fn add_alternative(&mut self, kind: AlternativeKind, route: Route) -> Result<AlternativeId, RouteError> {
        if route.len() < 2 {
            return Err(RouteError::EmptyRoute);
        }
        if let AlternativeKind::PathBased { subpath } = kind {
            self.subpath(subpath)?;
        }
        let id = AlternativeId(self.alternatives.len() as u32);
        self.alternatives.push(AlternativePath { id, kind, route });
        Ok(id)
    }

    /// Schedule a stop at `platform` on subpath `subpath`.
    pub fn add_stop(
        &mut self,
        network: &TrackNetwork,
        subpath: usize,
        platform: PlatformId,
    ) -> Result<(), RouteError> {
        self.subpath(subpath)?;
        let p = network.platform(platform);
        self.stops.push(StationStop {
            subpath,
            station: p.station,
            platform,
            section: p.section,
        });
        Ok(())
    }

    /// Number of subpaths.
    pub fn subpath_count(&self) -> usize {
        self.subpaths.len()
    }

    /// Subpath `index`.
    pub fn subpath(&self, index: usize) -> Result<&Route, RouteError> {
        self.subpaths.get(index).ok_or(RouteError::SubpathOutOfRange {
            subpath: index,
            count: self.subpaths.len(),
        })
    }

    /// Mutable subpath `index`.
    pub fn subpath_mut(&mut self, index: usize) -> Result<&mut Route, RouteError> {
        let count = self.subpaths.len();
        self.subpaths
            .get_mut(index)
            .ok_or(RouteError::SubpathOutOfRange {
                subpath: index,
                count,
            })
    }

    /// All subpaths.
    pub fn subpaths(&self) -> &[Route] {
        &self.subpaths
    }

    /// All registered alternatives.
    pub fn alternatives(&self) -> &[AlternativePath] {
        &self.alternatives
    }

    /// All station stops, in schedule order.
    pub fn stops(&self) -> &[StationStop] {
        &self.stops
    }

    /// Mutable station stops.
    pub fn stops_mut(&mut self) -> &mut Vec<StationStop> {
        &mut self.stops
    }

    /// Alternatives that could replace a stretch of subpath `subpath`
    /// touching any of `contested`.
    ///
    /// Path-based alternatives of that subpath come first, then
    /// location-based ones, each in registration order.
    pub fn candidates<'a>(
        &'a self,
        subpath: usize,
        contested: &'a [SectionId],
    ) -> impl Iterator<Item = &'a AlternativePath> + 'a {
        let path_based = self
            .alternatives
            .iter()
            .filter(move |a| a.kind == AlternativeKind::PathBased { subpath });
        let location_based = self.alternatives.iter().filter(move |a| {
            matches!(a.kind, AlternativeKind::LocationBased { contested: c } if contested.contains(&c))
        });
        path_based.chain(location_based)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackward_core::Direction;
    use trackward_network::{NetworkBuilder, SectionKind};

    fn two_sections() -> (TrackNetwork, SectionId, SectionId, PlatformId) {
        let mut b = NetworkBuilder::new();
        let a = b.add_section(SectionKind::Normal, 100.0);
        let c = b.add_section(SectionKind::Normal, 100.0);
        b.connect(a, Direction::Ahead, c, Direction::Ahead);
        let p = b.add_platform(StationId(7), "Low Fell 1", c);
        (b.build().expect("valid"), a, c, p)
    }

    #[test]
    fn empty_path_is_rejected() {
        match TrainPath::new(Vec::new()) {
            Err(RouteError::EmptyRoute) => {}
            other => panic!("expected EmptyRoute, got {other:?}"),
        }
    }

    #[test]
    fn stop_copies_station_and_section() {
        let (net, a, c, p) = two_sections();
        let route = Route::from_sections(&net, [(a, Direction::Ahead), (c, Direction::Ahead)])
            .expect("valid");
        let mut path = TrainPath::single(route).expect("non-empty");
        path.add_stop(&net, 0, p).expect("subpath 0 exists");
        assert_eq!(path.stops()[0].station, StationId(7));
        assert_eq!(path.stops()[0].section, c);
        match path.add_stop(&net, 3, p) {
            Err(RouteError::SubpathOutOfRange { subpath: 3, count: 1 }) => {}
            other => panic!("expected SubpathOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn candidates_list_path_based_first() {
        let (net, a, c, _) = two_sections();
        let route = Route::from_sections(&net, [(a, Direction::Ahead), (c, Direction::Ahead)])
            .expect("valid");
        let mut path = TrainPath::single(route.clone()).expect("non-empty");
        let loc = path
            .add_alternative(AlternativeKind::LocationBased { contested: c }, route.clone())
            .expect("valid");
        let based = path
            .add_alternative(AlternativeKind::PathBased { subpath: 0 }, route)
            .expect("valid");
        let ids: Vec<_> = path.candidates(0, &[c]).map(|a| a.id).collect();
        assert_eq!(ids, vec![based, loc]);
        assert_eq!(path.candidates(0, &[a]).count(), 1);
    }
}
