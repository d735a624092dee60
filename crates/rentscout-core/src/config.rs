//! Configuration management for rentscout.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. Every section is `#[serde(default)]`, so
//! a partial file only overrides what it names.

use crate::district::find_district;
use crate::error::{ConfigError, ConfigResult};
use crate::listing::{Amenity, Factor, LeaseTerm};
use directories::ProjectDirs;
use rentscout_transit::{Coordinates, ReferenceLocation, StationGraph, TransitSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the SQLite database inside the data directory.
pub const DATABASE_FILE: &str = "rentscout.db";

/// Main application configuration.
///
/// This is loaded from `~/.config/rentscout/config.toml` (or platform
/// equivalent) unless an explicit path is given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General application settings
    pub general: GeneralConfig,
    /// Where commutes end
    pub reference: ReferenceConfig,
    /// Search filters for identifier collection
    pub search: SearchConfig,
    /// Scoring weights, anchors and policies
    pub scoring: ScoringConfig,
    /// Commute estimator settings
    pub transit: TransitSettings,
    /// Cost model constants
    pub costs: CostConfig,
    /// Stage runner policy
    pub pipeline: PipelineConfig,
    /// Export formats and destination
    pub export: ExportConfig,
    /// HTTP source settings
    pub source: SourceConfig,
}

impl AppConfig {
    /// Load configuration from the default location, falling back to
    /// defaults if the file does not exist.
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file, which must exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }
        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration (explicit path or default location) and apply
    /// environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `RENTSCOUT_DATA_DIR`: Override the data directory
    /// - `RENTSCOUT_REQUEST_DELAY_SECS`: Override the delay between units
    /// - `RENTSCOUT_MAX_RETRIES`: Override the per-unit retry budget
    pub fn load_with_env(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup. Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("RENTSCOUT_DATA_DIR") {
            tracing::debug!("Override general.data_dir from env: {}", val);
            self.general.data_dir = Some(PathBuf::from(val));
        }

        if let Some(val) = lookup("RENTSCOUT_REQUEST_DELAY_SECS") {
            if let Ok(secs) = val.parse() {
                self.pipeline.request_delay_secs = secs;
                tracing::debug!("Override pipeline.request_delay_secs from env: {}", secs);
            }
        }

        if let Some(val) = lookup("RENTSCOUT_MAX_RETRIES") {
            if let Ok(retries) = val.parse() {
                self.pipeline.max_retries = retries;
                tracing::debug!("Override pipeline.max_retries from env: {}", retries);
            }
        }
    }

    /// Save configuration to a file, creating its directory.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        tracing::debug!("Saving config to {}", path.display());
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/rentscout/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Directory holding the database: `general.data_dir`, or
    /// `~/.local/share/rentscout`.
    pub fn data_dir(&self) -> ConfigResult<PathBuf> {
        match &self.general.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs()?.data_dir().to_path_buf()),
        }
    }

    /// Path of the SQLite database file.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        Ok(self.data_dir()?.join(DATABASE_FILE))
    }

    /// Directory exports are written to.
    pub fn output_dir(&self) -> ConfigResult<PathBuf> {
        match &self.export.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.data_dir()?.join("output")),
        }
    }

    /// Build the station graph described by `[transit]`.
    pub fn station_graph(&self) -> ConfigResult<StationGraph> {
        StationGraph::from_settings(self.transit.clone()).map_err(ConfigError::from)
    }

    /// Check every value that could make a stage misbehave. Runs before any
    /// stage so a bad config never leaves partial work behind.
    pub fn validate(&self, graph: &StationGraph) -> ConfigResult<()> {
        self.transit.validate()?;
        self.scoring.validate()?;
        self.search.validate()?;
        self.costs.validate()?;
        self.pipeline.validate()?;

        let reference = self.reference.location()?;
        if let ReferenceLocation::Station(name) = &reference {
            if graph.check_reference(&reference).is_err() {
                return Err(ConfigError::invalid(
                    "reference.station",
                    format!("'{name}' is not a known station"),
                ));
            }
        }
        Ok(())
    }
}

fn project_dirs() -> ConfigResult<ProjectDirs> {
    ProjectDirs::from("com", "rentscout", "rentscout").ok_or(ConfigError::NoConfigDir)
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory; platform default when unset
    pub data_dir: Option<PathBuf>,
}

/// Commute destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// Display name
    pub name: String,
    /// Station name; takes precedence over `coords`. Set to `""` to use
    /// the coordinates instead of the default station.
    pub station: Option<String>,
    /// `[lat, lon]`
    pub coords: Option<[f64; 2]>,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            name: "Taipei Main Station".to_string(),
            station: Some("台北車站".to_string()),
            coords: Some([25.0478, 121.5170]),
        }
    }
}

impl ReferenceConfig {
    /// Resolve to a station or coordinate reference.
    pub fn location(&self) -> ConfigResult<ReferenceLocation> {
        if let Some(station) = self.station.as_deref().filter(|s| !s.trim().is_empty()) {
            return Ok(ReferenceLocation::Station(station.trim().to_string()));
        }
        match self.coords {
            Some(coords) => {
                let point = Coordinates::from(coords);
                if point.is_valid() {
                    Ok(ReferenceLocation::Point(point))
                } else {
                    Err(ConfigError::invalid(
                        "reference.coords",
                        format!("{coords:?} is not a valid latitude/longitude"),
                    ))
                }
            }
            None => Err(ConfigError::invalid(
                "reference",
                "either station or coords must be set",
            )),
        }
    }
}

/// Search filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Source region code (1 = Taipei City)
    pub region: u32,
    /// Romanised district names
    pub districts: Vec<String>,
    /// Minimum monthly rent
    pub price_min: u32,
    /// Maximum monthly rent
    pub price_max: u32,
    /// Minimum area in ping
    pub area_min: u32,
    /// Page limit per district
    pub max_pages: u32,
    /// Delay between search pages in milliseconds
    pub page_delay_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            region: 1,
            districts: vec!["Da'an".to_string()],
            price_min: 15_000,
            price_max: 50_000,
            area_min: 10,
            max_pages: 100,
            page_delay_ms: 2000,
        }
    }
}

impl SearchConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.districts.is_empty() {
            return Err(ConfigError::invalid(
                "search.districts",
                "at least one district is required",
            ));
        }
        for district in &self.districts {
            if find_district(district).is_none() {
                return Err(ConfigError::invalid(
                    "search.districts",
                    format!("unknown district '{district}'"),
                ));
            }
        }
        if self.price_min > self.price_max {
            return Err(ConfigError::invalid(
                "search.price_min",
                "must not exceed search.price_max",
            ));
        }
        Ok(())
    }
}

/// How a factor with missing data enters the composite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDataPolicy {
    /// Drop the factor's weight from the denominator
    #[default]
    Exclude,
    /// Count the factor as zero
    Zero,
}

/// One point of a piecewise-linear curve: `[input, score]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor(pub f64, pub f64);

impl Anchor {
    /// Input value.
    #[must_use]
    pub fn x(self) -> f64 {
        self.0
    }

    /// Score at the input value.
    #[must_use]
    pub fn score(self) -> f64 {
        self.1
    }
}

/// Relative factor weights; normalised by their sum at scoring time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Commute weight
    pub commute: f64,
    /// Lease weight
    pub lease: f64,
    /// Price weight
    pub price: f64,
    /// Size weight
    pub size: f64,
    /// Amenities weight
    pub amenities: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            commute: 3.0,
            lease: 2.0,
            price: 1.0,
            size: 1.0,
            amenities: 1.0,
        }
    }
}

impl ScoreWeights {
    /// Weight of one factor.
    #[must_use]
    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Commute => self.commute,
            Factor::Lease => self.lease,
            Factor::Price => self.price,
            Factor::Size => self.size,
            Factor::Amenities => self.amenities,
        }
    }
}

/// Sub-score per lease category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaseScores {
    /// Month-to-month
    pub month_to_month: f64,
    /// Six months
    pub six_months: f64,
    /// One year
    pub one_year: f64,
    /// Anything longer
    pub other: f64,
}

impl Default for LeaseScores {
    fn default() -> Self {
        Self {
            month_to_month: 100.0,
            six_months: 70.0,
            one_year: 40.0,
            other: 0.0,
        }
    }
}

impl LeaseScores {
    /// Score of one category.
    #[must_use]
    pub fn get(&self, lease: LeaseTerm) -> f64 {
        match lease {
            LeaseTerm::MonthToMonth => self.month_to_month,
            LeaseTerm::SixMonths => self.six_months,
            LeaseTerm::OneYear => self.one_year,
            LeaseTerm::Other => self.other,
        }
    }
}

/// Points awarded per present amenity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct AmenityPoints {
    pub washing_machine: f64,
    pub ac: f64,
    pub balcony: f64,
    pub parking: f64,
    pub pets_allowed: f64,
}

impl Default for AmenityPoints {
    fn default() -> Self {
        Self {
            washing_machine: 1.0,
            ac: 1.0,
            balcony: 1.0,
            parking: 1.0,
            pets_allowed: 1.0,
        }
    }
}

impl AmenityPoints {
    /// Points of one amenity.
    #[must_use]
    pub fn get(&self, amenity: Amenity) -> f64 {
        match amenity {
            Amenity::WashingMachine => self.washing_machine,
            Amenity::Ac => self.ac,
            Amenity::Balcony => self.balcony,
            Amenity::Parking => self.parking,
            Amenity::PetsAllowed => self.pets_allowed,
        }
    }

    /// Maximum achievable points.
    #[must_use]
    pub fn total(&self) -> f64 {
        Amenity::ALL.iter().map(|a| self.get(*a)).sum()
    }
}

/// Scoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Factor weights
    pub weights: ScoreWeights,
    /// Commute minutes to score
    pub commute_anchors: Vec<Anchor>,
    /// Monthly rent to score
    pub price_anchors: Vec<Anchor>,
    /// Square metres to score
    pub size_anchors: Vec<Anchor>,
    /// Lease category scores
    pub lease_scores: LeaseScores,
    /// Amenity point table
    pub amenity_points: AmenityPoints,
    /// Missing-data policy
    pub missing_data: MissingDataPolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            commute_anchors: vec![
                Anchor(10.0, 100.0),
                Anchor(20.0, 70.0),
                Anchor(30.0, 50.0),
                Anchor(60.0, 0.0),
            ],
            price_anchors: vec![Anchor(15_000.0, 100.0), Anchor(50_000.0, 0.0)],
            size_anchors: vec![Anchor(10.0, 10.0), Anchor(100.0, 100.0)],
            lease_scores: LeaseScores::default(),
            amenity_points: AmenityPoints::default(),
            missing_data: MissingDataPolicy::default(),
        }
    }
}

impl ScoringConfig {
    /// Reject weights, anchors and point tables the engine cannot use.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut total = 0.0;
        for factor in Factor::ALL {
            let weight = self.weights.get(factor);
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::invalid(
                    format!("scoring.weights.{factor}"),
                    format!("must be a non-negative number, got {weight}"),
                ));
            }
            total += weight;
        }
        if total <= 0.0 {
            return Err(ConfigError::invalid("scoring.weights", "all weights are zero"));
        }

        validate_anchors("scoring.commute_anchors", &self.commute_anchors)?;
        validate_anchors("scoring.price_anchors", &self.price_anchors)?;
        validate_anchors("scoring.size_anchors", &self.size_anchors)?;

        let lease = &self.lease_scores;
        for (name, value) in [
            ("month_to_month", lease.month_to_month),
            ("six_months", lease.six_months),
            ("one_year", lease.one_year),
            ("other", lease.other),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::invalid(
                    format!("scoring.lease_scores.{name}"),
                    "must be within 0-100",
                ));
            }
        }

        for amenity in Amenity::ALL {
            let points = self.amenity_points.get(amenity);
            if !points.is_finite() || points < 0.0 {
                return Err(ConfigError::invalid(
                    format!("scoring.amenity_points.{}", amenity.as_str()),
                    "must be a non-negative number",
                ));
            }
        }
        if self.amenity_points.total() <= 0.0 {
            return Err(ConfigError::invalid(
                "scoring.amenity_points",
                "at least one amenity must be worth points",
            ));
        }
        Ok(())
    }
}

fn validate_anchors(field: &str, anchors: &[Anchor]) -> ConfigResult<()> {
    if anchors.is_empty() {
        return Err(ConfigError::invalid(field, "at least one anchor is required"));
    }
    for anchor in anchors {
        if !anchor.x().is_finite() || !(0.0..=100.0).contains(&anchor.score()) {
            return Err(ConfigError::invalid(
                field,
                format!("anchor {anchor:?} must have a finite input and a score within 0-100"),
            ));
        }
    }
    if anchors.windows(2).any(|w| w[0].x() >= w[1].x()) {
        return Err(ConfigError::invalid(field, "anchor inputs must be strictly increasing"));
    }
    Ok(())
}

/// Cost model constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// EUR per NT$
    pub nt_to_eur: f64,
    /// Water, internet and gas per month
    pub utilities_base: u32,
    /// Electricity per square metre with AC
    pub electricity_per_sqm_ac: f64,
    /// Electricity per square metre without AC
    pub electricity_per_sqm: f64,
    /// Deposit months assumed when the listing does not say
    pub default_deposit_months: u32,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            nt_to_eur: 0.027,
            utilities_base: 2000,
            electricity_per_sqm_ac: 70.0,
            electricity_per_sqm: 30.0,
            default_deposit_months: 2,
        }
    }
}

impl CostConfig {
    fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("costs.nt_to_eur", self.nt_to_eur),
            ("costs.electricity_per_sqm_ac", self.electricity_per_sqm_ac),
            ("costs.electricity_per_sqm", self.electricity_per_sqm),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(field, "must be a non-negative number"));
            }
        }
        Ok(())
    }
}

/// Stage runner policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Delay between units in seconds
    pub request_delay_secs: f64,
    /// Retries per unit for transient failures
    pub max_retries: u32,
    /// Base retry delay; attempt `n` waits `n` times this
    pub retry_delay_ms: u64,
    /// Failed runs after which a unit is reported as a persistent failure
    pub persistent_failure_threshold: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            request_delay_secs: 2.0,
            max_retries: 3,
            retry_delay_ms: 2000,
            persistent_failure_threshold: 3,
        }
    }
}

impl PipelineConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !self.request_delay_secs.is_finite() || self.request_delay_secs < 0.0 {
            return Err(ConfigError::invalid(
                "pipeline.request_delay_secs",
                "must be zero or positive",
            ));
        }
        if self.persistent_failure_threshold == 0 {
            return Err(ConfigError::invalid(
                "pipeline.persistent_failure_threshold",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Export formats and destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Output directory; `<data_dir>/output` when unset
    pub output_dir: Option<PathBuf>,
    /// Write `listings.json`
    pub json: bool,
    /// Write `listings.csv`
    pub csv: bool,
    /// Write `listings.xlsx`
    pub xlsx: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            json: true,
            csv: false,
            xlsx: false,
        }
    }
}

/// HTTP source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Site root
    pub base_url: String,
    /// User agent string
    pub user_agent: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://rent.591.com.tw".to_string(),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            timeout_secs: 30,
        }
    }
}
