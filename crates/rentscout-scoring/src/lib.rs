//! Rentscout Scoring - weighted 0-100 ranking of listings.
//!
//! Five factors (commute, lease, price, size, amenities) are scored on
//! piecewise-linear curves and combined into a weighted average. Weights are
//! relative and normalised by their sum.
//!
//! # Example
//!
//! ```rust
//! use rentscout_core::{ListingFields, ScoringConfig};
//! use rentscout_scoring::score;
//!
//! let mut fields = ListingFields::default();
//! fields.base_rent = Some(32_500);
//!
//! let result = score(&fields, &ScoringConfig::default(), None);
//! assert!((result.composite - 50.0).abs() < 1e-9);
//! assert!(!result.complete);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod curve;
pub mod engine;

pub use curve::interpolate;
pub use engine::score;
