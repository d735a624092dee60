//! Rentscout Transit - station graph and commute estimation.
//!
//! This crate is the leaf of the workspace. It knows about transit stations,
//! their coordinates, and how long it takes to get from a listing to the
//! configured reference location.
//!
//! # Estimation rules
//!
//! - Reference is a station and the listing's nearest station is known:
//!   walk to the station, ride station-to-station, then the fixed walk from
//!   the reference station.
//! - Reference is a coordinate pair: straight-line bike/walk time.
//! - Missing station or coordinate data yields `None`, never a zero-minute
//!   commute.
//!
//! # Example
//!
//! ```rust
//! use rentscout_transit::{ListingLocation, ReferenceLocation, StationGraph, TransitSettings};
//!
//! let graph = StationGraph::taipei(TransitSettings::default());
//! let location = ListingLocation {
//!     station: Some("市政府"),
//!     station_distance_m: Some(240),
//!     coords: None,
//! };
//! let reference = ReferenceLocation::Station("台北車站".to_string());
//! let estimate = graph.estimate_commute(&location, &reference);
//! assert!(estimate.is_some());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod geo;
pub mod graph;
pub mod stations;

pub use error::{Result, TransitError};
pub use geo::Coordinates;
pub use graph::{
    parse_station_text, CommuteEstimate, ListingLocation, ReferenceLocation, Station,
    StationGraph, TransitSettings, TransportMode,
};
