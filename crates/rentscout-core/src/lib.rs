//! Rentscout Core - shared foundation for the rentscout workspace.
//!
//! This crate provides the listing data model, configuration, error types,
//! the cost model and the [`ListingSource`] capability that the pipeline
//! stages are written against.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - `ListingId` and `Stage`
//! - [`listing`] - Partial listing fields and records
//! - [`cost`] - Monthly and upfront cost estimation
//! - [`district`] - Taipei district table
//! - [`source`] - The fetch/parse capability and its typed failures
//!
//! # Example
//!
//! ```rust
//! use rentscout_core::{AppConfig, ListingFields, ListingId};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let graph = config.station_graph()?;
//! config.validate(&graph)?;
//!
//! let id = ListingId::new("16051234")?;
//! let mut fields = ListingFields::default();
//! fields.base_rent = Some(20_000);
//! rentscout_core::cost::apply_cost_model(&mut fields, &config.costs);
//! assert_eq!(fields.upfront_cost, Some(40_000));
//! # let _ = id;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod cost;
pub mod district;
pub mod error;
pub mod listing;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use config::{
    Anchor, AmenityPoints, AppConfig, CostConfig, ExportConfig, GeneralConfig, LeaseScores,
    MissingDataPolicy, PipelineConfig, ReferenceConfig, ScoreWeights, ScoringConfig,
    SearchConfig, SourceConfig,
};
pub use district::{find_district, District, TAIPEI_DISTRICTS};
pub use error::{ConfigError, ConfigResult, RentscoutError, Result};
pub use listing::{
    Amenities, Amenity, Annotations, Commute, Factor, FactorScore, LeaseTerm, ListingFields,
    ListingRecord, ListingScore, ListingStatus,
};
pub use source::{FetchError, ListingSource};
pub use types::{ListingId, Stage};
