//! Route and path representation for the trackward engine.
//!
//! A [`Route`] is a contiguous, directed run of sections. Contiguity is
//! checked whenever elements are added, so every route a train holds can
//! be walked pin by pin. [`build_temp_route`] scans the network to produce
//! routes on demand; [`TrainPath`] is the long-lived plan a train follows
//! under automatic control.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod element;
pub mod error;
pub mod path;
pub mod route;
pub mod scan;

pub use element::RouteElement;
pub use error::RouteError;
pub use path::{AlternativeKind, AlternativePath, StationStop, TrainPath};
pub use route::Route;
pub use scan::{build_temp_route, ScanEnd, ScanLimits, TempRoute};
