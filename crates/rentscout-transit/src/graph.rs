//! Station graph and commute estimation.
//!
//! The graph is immutable once built. Station-to-station ride time is derived
//! from straight-line distance at an average rail speed, which keeps every
//! lookup O(1) over the small station set.

use crate::error::{Result, TransitError};
use crate::geo::Coordinates;
use crate::stations::TAIPEI_MRT;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Prefixes listing pages put in front of a station name ("距", "近", ...).
const STATION_PREFIXES: &[&str] = &["本房屋近", "捷運", "距", "近"];

/// Suffixes stripped from station names, longest first.
const STATION_SUFFIXES: &[&str] = &["火車站", "捷運站", "站"];

/// Speeds and fixed walking legs used by the estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitSettings {
    /// Walking pace in metres per minute
    pub walk_m_per_min: f64,
    /// Average urban cycling speed in km/h
    pub bike_kmh: f64,
    /// Street distance divided by straight-line distance
    pub street_factor: f64,
    /// Average rail speed including stops, in km/h
    pub rail_kmh: f64,
    /// Walk from the reference station to the reference point, in minutes
    pub walk_from_reference_station_min: f64,
    /// Optional TOML station list replacing the built-in table
    pub stations_file: Option<PathBuf>,
}

impl Default for TransitSettings {
    fn default() -> Self {
        Self {
            walk_m_per_min: 80.0,
            bike_kmh: 15.0,
            street_factor: 1.3,
            rail_kmh: 25.0,
            walk_from_reference_station_min: 4.0,
            stations_file: None,
        }
    }
}

impl TransitSettings {
    /// Reject zero, negative, or non-finite speeds.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("walk_m_per_min", self.walk_m_per_min),
            ("bike_kmh", self.bike_kmh),
            ("street_factor", self.street_factor),
            ("rail_kmh", self.rail_kmh),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(TransitError::InvalidSetting {
                    field: field.to_string(),
                    reason: format!("must be a positive number, got {value}"),
                });
            }
        }
        if !self.walk_from_reference_station_min.is_finite()
            || self.walk_from_reference_station_min < 0.0
        {
            return Err(TransitError::InvalidSetting {
                field: "walk_from_reference_station_min".to_string(),
                reason: "must be zero or positive".to_string(),
            });
        }
        Ok(())
    }
}

/// A named transit station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Station name without the "站" suffix
    pub name: String,
    /// Line the station is listed under
    #[serde(default)]
    pub line: Option<String>,
    /// Station position
    #[serde(flatten)]
    pub coords: Coordinates,
}

#[derive(Debug, Deserialize)]
struct StationFile {
    stations: Vec<Station>,
}

/// Where the commute ends.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceLocation {
    /// A station in the graph
    Station(String),
    /// A raw coordinate pair
    Point(Coordinates),
}

/// What is known about a listing's position.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingLocation<'a> {
    /// Nearest station as written on the listing
    pub station: Option<&'a str>,
    /// Walking distance to that station in metres
    pub station_distance_m: Option<u32>,
    /// Listing coordinates, when the source provides them
    pub coords: Option<Coordinates>,
}

/// How the estimated commute is travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// Walk + rail + walk
    Transit,
    /// Bike over street distance
    Bike,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transit => write!(f, "transit"),
            Self::Bike => write!(f, "bike"),
        }
    }
}

/// Result of a successful commute estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommuteEstimate {
    /// Door-to-door minutes
    pub minutes: f64,
    /// Travel mode used
    pub mode: TransportMode,
    /// Boarding station for transit commutes
    pub via: Option<String>,
}

/// Immutable station set with the estimator settings it was built with.
#[derive(Debug, Clone)]
pub struct StationGraph {
    stations: Vec<Station>,
    index: HashMap<String, usize>,
    settings: TransitSettings,
}

impl StationGraph {
    /// Build a graph from an explicit station list.
    pub fn from_stations(stations: Vec<Station>, settings: TransitSettings) -> Result<Self> {
        settings.validate()?;
        if stations.is_empty() {
            return Err(TransitError::EmptyGraph);
        }

        let mut index = HashMap::with_capacity(stations.len());
        for (i, station) in stations.iter().enumerate() {
            let key = normalize_station_name(&station.name);
            if index.insert(key.clone(), i).is_some() {
                return Err(TransitError::DuplicateStation(key));
            }
        }

        Ok(Self {
            stations,
            index,
            settings,
        })
    }

    /// The built-in Taipei Metro graph.
    #[must_use]
    pub fn taipei(settings: TransitSettings) -> Self {
        let stations: Vec<Station> = TAIPEI_MRT
            .iter()
            .map(|(name, line, lat, lon)| Station {
                name: (*name).to_string(),
                line: Some((*line).to_string()),
                coords: Coordinates::new(*lat, *lon),
            })
            .collect();
        let index = stations
            .iter()
            .enumerate()
            .map(|(i, s)| (normalize_station_name(&s.name), i))
            .collect();
        Self {
            stations,
            index,
            settings,
        }
    }

    /// Load a station list from a TOML file with `[[stations]]` tables.
    pub fn load_toml(path: impl AsRef<Path>, settings: TransitSettings) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let file: StationFile = toml::from_str(&contents)?;
        tracing::info!(
            count = file.stations.len(),
            path = %path.display(),
            "loaded station file"
        );
        Self::from_stations(file.stations, settings)
    }

    /// Build the graph described by `settings`: the station file when set,
    /// the built-in table otherwise.
    pub fn from_settings(settings: TransitSettings) -> Result<Self> {
        settings.validate()?;
        match settings.stations_file.clone() {
            Some(path) => Self::load_toml(path, settings),
            None => Ok(Self::taipei(settings)),
        }
    }

    /// Number of stations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// Whether the graph has no stations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Estimator settings.
    #[must_use]
    pub fn settings(&self) -> &TransitSettings {
        &self.settings
    }

    /// Look up a station, tolerating prefixes and "站"-style suffixes.
    #[must_use]
    pub fn station(&self, name: &str) -> Option<&Station> {
        let key = normalize_station_name(name);
        self.index.get(&key).map(|&i| &self.stations[i])
    }

    /// Fail with `UnknownStation` unless `reference` resolves in this graph.
    pub fn check_reference(&self, reference: &ReferenceLocation) -> Result<()> {
        match reference {
            ReferenceLocation::Station(name) if self.station(name).is_none() => {
                Err(TransitError::UnknownStation(name.clone()))
            }
            _ => Ok(()),
        }
    }

    /// Ride minutes between two stations.
    #[must_use]
    pub fn ride_minutes(&self, from: &Station, to: &Station) -> f64 {
        if from.name == to.name {
            return 0.0;
        }
        from.coords.haversine_km(&to.coords) / self.settings.rail_kmh * 60.0
    }

    /// Bike minutes between two points over estimated street distance.
    #[must_use]
    pub fn bike_minutes(&self, from: &Coordinates, to: &Coordinates) -> f64 {
        let street_km = from.haversine_km(to) * self.settings.street_factor;
        street_km / self.settings.bike_kmh * 60.0
    }

    /// Estimate the commute from a listing to the reference location.
    ///
    /// With a station reference, the transit route and the bike route are
    /// both estimated where the data allows and the faster one is returned.
    ///
    /// Returns `None` when the data needed for either estimate is missing;
    /// callers must treat that as "unknown", not as a zero-minute commute.
    #[must_use]
    pub fn estimate_commute(
        &self,
        location: &ListingLocation<'_>,
        reference: &ReferenceLocation,
    ) -> Option<CommuteEstimate> {
        let listing_station = location.station.and_then(|s| self.station(s));

        match reference {
            ReferenceLocation::Station(name) => {
                let target = self.station(name)?;
                let transit = listing_station.map(|boarding| {
                    let walk = location
                        .station_distance_m
                        .map_or(0.0, |m| f64::from(m) / self.settings.walk_m_per_min);
                    CommuteEstimate {
                        minutes: walk
                            + self.ride_minutes(boarding, target)
                            + self.settings.walk_from_reference_station_min,
                        mode: TransportMode::Transit,
                        via: Some(boarding.name.clone()),
                    }
                });
                let bike = location
                    .coords
                    .filter(Coordinates::is_valid)
                    .map(|origin| CommuteEstimate {
                        minutes: self.bike_minutes(&origin, &target.coords),
                        mode: TransportMode::Bike,
                        via: None,
                    });

                // Faster option wins; transit on a tie
                match (transit, bike) {
                    (Some(transit), Some(bike)) if bike.minutes < transit.minutes => Some(bike),
                    (Some(transit), _) => Some(transit),
                    (None, bike) => bike,
                }
            }
            ReferenceLocation::Point(point) => {
                let origin = location
                    .coords
                    .filter(Coordinates::is_valid)
                    .or_else(|| listing_station.map(|s| s.coords))?;
                Some(CommuteEstimate {
                    minutes: self.bike_minutes(&origin, point),
                    mode: TransportMode::Bike,
                    via: None,
                })
            }
        }
    }
}

/// Strip listing prefixes and station suffixes from a name.
fn normalize_station_name(raw: &str) -> String {
    let mut name = raw.trim();
    for prefix in STATION_PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            name = rest.trim_start();
            break;
        }
    }
    for suffix in STATION_SUFFIXES {
        if let Some(rest) = name.strip_suffix(suffix) {
            if !rest.is_empty() {
                name = rest;
            }
            break;
        }
    }
    name.trim().to_string()
}

/// Parse free-form station text such as `"距後山埤站 (266m)"`.
///
/// Returns the station name (suffix stripped) and the distance in metres,
/// either of which may be absent.
#[must_use]
pub fn parse_station_text(text: &str) -> (Option<String>, Option<u32>) {
    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    static DISTANCE_REGEX: OnceLock<Regex> = OnceLock::new();

    let text = text.trim();
    if text.is_empty() {
        return (None, None);
    }

    let name_regex = NAME_REGEX.get_or_init(|| Regex::new(r"[\p{Han}]+").expect("valid regex"));
    let distance_regex = DISTANCE_REGEX
        .get_or_init(|| Regex::new(r"(\d+)\s*(?:m|公尺)").expect("valid regex"));

    let mut cleaned = text;
    for prefix in STATION_PREFIXES {
        if let Some(rest) = cleaned.strip_prefix(prefix) {
            cleaned = rest;
            break;
        }
    }

    let name = name_regex
        .find(cleaned)
        .map(|m| normalize_station_name(m.as_str()))
        .filter(|n| !n.is_empty());

    let distance = distance_regex
        .captures(cleaned)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());

    (name, distance)
}
