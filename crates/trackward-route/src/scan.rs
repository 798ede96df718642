//! Forward network scans.

use trackward_core::{Direction, SectionId, SignalId};
use trackward_network::TrackNetwork;

use crate::error::RouteError;
use crate::route::Route;

/// Bounds on a [`build_temp_route`] scan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanLimits {
    /// Stop once this much track ahead of the start offset is covered.
    pub min_length_m: f64,
    /// Stop after the first section with an end signal in the scan direction.
    pub stop_at_signals: bool,
    /// Hard cap on the number of sections, start included.
    pub max_sections: usize,
}

impl ScanLimits {
    /// Scan for `min_length_m`, ignoring signals.
    pub fn length(min_length_m: f64) -> Self {
        Self {
            min_length_m,
            stop_at_signals: false,
            max_sections: 256,
        }
    }
}

/// Why a scan stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanEnd {
    /// The requested length was covered.
    LengthReached,
    /// The last section has no onward pin.
    EndOfTrack,
    /// The last section ends at this signal.
    Signal(SignalId),
    /// The next section was refused by the availability predicate.
    Unavailable(SectionId),
    /// The next section is already on the route.
    Loop(SectionId),
    /// The section cap was hit.
    MaxSections,
}

/// Result of a scan. The route may be shorter than requested.
#[derive(Clone, Debug, PartialEq)]
pub struct TempRoute {
    /// Sections found, start first.
    pub route: Route,
    /// Track covered from the start offset to the end of the last section.
    pub length_m: f64,
    /// Why the scan stopped.
    pub end: ScanEnd,
}

/// Scan forward from `offset_m` into `start`, travelling `direction` and
/// following the current switch alignment.
///
/// The start section is always included. Every further section is offered
/// to `available` before it is added; a refusal ends the scan with
/// [`ScanEnd::Unavailable`].
pub fn build_temp_route(
    network: &TrackNetwork,
    start: SectionId,
    offset_m: f64,
    direction: Direction,
    limits: ScanLimits,
    mut available: impl FnMut(SectionId, Direction) -> bool,
) -> Result<TempRoute, RouteError> {
    let mut route = Route::new();
    route.push(network, start, direction)?;
    let mut length_m = (network.length_m(start) - offset_m).max(0.0);
    let mut at = start;
    let mut dir = direction;

    let end = loop {
        if length_m >= limits.min_length_m {
            break ScanEnd::LengthReached;
        }
        if limits.stop_at_signals {
            if let Some(signal) = network.section(at).end_signal(dir) {
                break ScanEnd::Signal(signal);
            }
        }
        if route.len() >= limits.max_sections {
            break ScanEnd::MaxSections;
        }
        let Some(pin) = network.next_pin(at, dir) else {
            break ScanEnd::EndOfTrack;
        };
        if route.contains(pin.section) {
            break ScanEnd::Loop(pin.section);
        }
        if !available(pin.section, pin.direction) {
            break ScanEnd::Unavailable(pin.section);
        }
        route.push(network, pin.section, pin.direction)?;
        length_m += network.length_m(pin.section);
        at = pin.section;
        dir = pin.direction;
    };

    Ok(TempRoute {
        route,
        length_m,
        end,
    })
}
