//! Listing records and their partial-field representation.
//!
//! A record grows across stages by field-level merges. Every field of
//! [`ListingFields`] is optional and absent fields are skipped when
//! serialized, so a serialized partial is exactly the set of fields it
//! sets. The store relies on this to merge patches without clobbering
//! data written by other stages.

use crate::types::ListingId;
use rentscout_transit::{CommuteEstimate, Coordinates, TransportMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

macro_rules! merge_options {
    ($target:ident, $patch:ident; $($field:ident),+ $(,)?) => {
        $(
            if $patch.$field.is_some() {
                $target.$field = $patch.$field;
            }
        )+
    };
}

/// Minimum tenancy category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeaseTerm {
    /// One month or less
    #[serde(rename = "month-to-month")]
    MonthToMonth,
    /// Up to six months
    #[serde(rename = "6mo")]
    SixMonths,
    /// Up to a year
    #[serde(rename = "1yr")]
    OneYear,
    /// Longer than a year
    #[serde(rename = "other")]
    Other,
}

impl LeaseTerm {
    /// Categorise a minimum tenancy expressed in months.
    #[must_use]
    pub fn from_months(months: u32) -> Self {
        match months {
            0..=1 => Self::MonthToMonth,
            2..=6 => Self::SixMonths,
            7..=12 => Self::OneYear,
            _ => Self::Other,
        }
    }

    /// Categorical string used in exports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MonthToMonth => "month-to-month",
            Self::SixMonths => "6mo",
            Self::OneYear => "1yr",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for LeaseTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Amenity flags. `None` means the page did not say.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amenities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub washing_machine: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ac: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balcony: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parking: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pets_allowed: Option<bool>,
}

/// Name of a single amenity, used as a key for point tables.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Amenity {
    WashingMachine,
    Ac,
    Balcony,
    Parking,
    PetsAllowed,
}

impl Amenity {
    /// Every amenity, in export column order.
    pub const ALL: [Amenity; 5] = [
        Amenity::WashingMachine,
        Amenity::Ac,
        Amenity::Balcony,
        Amenity::Parking,
        Amenity::PetsAllowed,
    ];

    /// Snake-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WashingMachine => "washing_machine",
            Self::Ac => "ac",
            Self::Balcony => "balcony",
            Self::Parking => "parking",
            Self::PetsAllowed => "pets_allowed",
        }
    }
}

impl Amenities {
    /// Flag for one amenity.
    #[must_use]
    pub fn get(&self, amenity: Amenity) -> Option<bool> {
        match amenity {
            Amenity::WashingMachine => self.washing_machine,
            Amenity::Ac => self.ac,
            Amenity::Balcony => self.balcony,
            Amenity::Parking => self.parking,
            Amenity::PetsAllowed => self.pets_allowed,
        }
    }

    /// True when no flag is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Amenity::ALL.iter().all(|a| self.get(*a).is_none())
    }

    fn merge(&mut self, patch: Amenities) {
        merge_options!(self, patch; washing_machine, ac, balcony, parking, pets_allowed);
    }
}

/// Manually or externally produced notes about a listing.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_modern: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_elevator: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_flat: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Annotations {
    /// True when nothing is annotated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn merge(&mut self, patch: Annotations) {
        merge_options!(self, patch; is_modern, has_elevator, is_flat, location_note, notes);
    }
}

/// Availability state set by the extraction stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    /// Page fetched and parsed
    Active,
    /// Source reports the listing gone
    Removed,
    /// Page fetched but could not be parsed
    Malformed,
}

impl ListingStatus {
    /// Snake-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Removed => "removed",
            Self::Malformed => "malformed",
        }
    }
}

/// Commute to the reference location as of the last score run.
///
/// Always written as a whole, so the three parts never come from different
/// runs. An empty value records that the last run could not estimate it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Commute {
    /// Door-to-door minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes: Option<f64>,
    /// Travel mode of the estimate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<TransportMode>,
    /// Boarding station for transit commutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
}

impl Commute {
    /// No estimate was possible.
    #[must_use]
    pub fn unknown() -> Self {
        Self::default()
    }
}

impl From<&CommuteEstimate> for Commute {
    fn from(estimate: &CommuteEstimate) -> Self {
        Self {
            minutes: Some(estimate.minutes),
            mode: Some(estimate.mode),
            via: estimate.via.clone(),
        }
    }
}

/// A scored factor.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Commute,
    Lease,
    Price,
    Size,
    Amenities,
}

impl Factor {
    /// Every factor, in breakdown order.
    pub const ALL: [Factor; 5] = [
        Factor::Commute,
        Factor::Lease,
        Factor::Price,
        Factor::Size,
        Factor::Amenities,
    ];

    /// Snake-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Commute => "commute",
            Self::Lease => "lease",
            Self::Price => "price",
            Self::Size => "size",
            Self::Amenities => "amenities",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-score of one factor.
///
/// `Unknown` records that the input was missing, which is distinct from a
/// measured score of zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum FactorScore {
    /// Measured sub-score in [0, 100]
    Scored(f64),
    /// Input data absent
    Unknown,
}

impl FactorScore {
    /// Numeric value, if measured.
    #[must_use]
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Scored(v) => Some(v),
            Self::Unknown => None,
        }
    }

    /// Whether the input was missing.
    #[must_use]
    pub fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }
}

/// Composite score and per-factor breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingScore {
    /// Weighted average in [0, 100]
    pub composite: f64,
    /// Sub-score of every factor, including unknown ones
    pub breakdown: BTreeMap<Factor, FactorScore>,
    /// False when any weighted factor was unknown
    pub complete: bool,
}

/// Partial listing data. Every field is optional; see the module docs.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingFields {
    // identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    // size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_ping: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_sqm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,

    // cost, NT$ unless suffixed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_rent: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_fee: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utilities_estimate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_monthly: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_monthly_eur: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upfront_cost: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upfront_cost_eur: Option<f64>,

    // lease
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_tenancy_months: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease: Option<LeaseTerm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_months: Option<u32>,

    #[serde(default, skip_serializing_if = "Amenities::is_empty")]
    pub amenities: Amenities,

    // location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest_station: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_distance_m: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coords: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commute: Option<Commute>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ListingStatus>,

    #[serde(default, skip_serializing_if = "Annotations::is_empty")]
    pub annotations: Annotations,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<ListingScore>,
}

impl ListingFields {
    /// Fields that only carry a status change.
    #[must_use]
    pub fn with_status(status: ListingStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Field-level union: every field set in `patch` overwrites the same
    /// field here, everything else is kept.
    pub fn merge(&mut self, patch: ListingFields) {
        merge_options!(
            self, patch;
            url, title, district, address,
            size_ping, size_sqm, rooms, bathrooms, layout, floor,
            base_rent, management_fee, utilities_estimate, total_monthly,
            total_monthly_eur, upfront_cost, upfront_cost_eur,
            min_tenancy_months, lease, deposit_months,
            nearest_station, station_distance_m, coords,
            commute,
            status, score,
        );
        self.amenities.merge(patch.amenities);
        self.annotations.merge(patch.annotations);
    }

    /// Last estimated commute minutes, if any.
    #[must_use]
    pub fn commute_minutes(&self) -> Option<f64> {
        self.commute.as_ref().and_then(|c| c.minutes)
    }

    /// Lease category, derived from the tenancy months when not set.
    #[must_use]
    pub fn lease_term(&self) -> Option<LeaseTerm> {
        self.lease
            .or_else(|| self.min_tenancy_months.map(LeaseTerm::from_months))
    }

    /// True when nothing is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A listing and everything known about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    /// Primary key
    pub id: ListingId,
    /// Accumulated fields
    #[serde(flatten)]
    pub fields: ListingFields,
}

impl ListingRecord {
    /// Composite score, if scored.
    #[must_use]
    pub fn composite(&self) -> Option<f64> {
        self.fields.score.as_ref().map(|s| s.composite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_from_months() {
        assert_eq!(LeaseTerm::from_months(1), LeaseTerm::MonthToMonth);
        assert_eq!(LeaseTerm::from_months(3), LeaseTerm::SixMonths);
        assert_eq!(LeaseTerm::from_months(6), LeaseTerm::SixMonths);
        assert_eq!(LeaseTerm::from_months(12), LeaseTerm::OneYear);
        assert_eq!(LeaseTerm::from_months(24), LeaseTerm::Other);
    }

    #[test]
    fn test_lease_serde_names() {
        let json = serde_json::to_string(&LeaseTerm::SixMonths).expect("serialize");
        assert_eq!(json, "\"6mo\"");
        let lease: LeaseTerm = serde_json::from_str("\"month-to-month\"").expect("parse");
        assert_eq!(lease, LeaseTerm::MonthToMonth);
    }

    #[test]
    fn test_partial_serializes_only_set_fields() {
        let fields = ListingFields {
            base_rent: Some(20_000),
            amenities: Amenities {
                ac: Some(true),
                ..Amenities::default()
            },
            ..ListingFields::default()
        };
        let value = serde_json::to_value(&fields).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({ "base_rent": 20000, "amenities": { "ac": true } })
        );
    }

    #[test]
    fn test_commute_is_replaced_as_a_whole() {
        let mut fields = ListingFields {
            commute: Some(Commute {
                minutes: Some(8.5),
                mode: Some(TransportMode::Transit),
                via: Some("善導寺".to_string()),
            }),
            ..ListingFields::default()
        };

        fields.merge(ListingFields {
            commute: Some(Commute {
                minutes: Some(12.0),
                mode: Some(TransportMode::Bike),
                via: None,
            }),
            ..ListingFields::default()
        });
        let commute = fields.commute.clone().expect("commute");
        assert_eq!(commute.mode, Some(TransportMode::Bike));
        assert!(commute.via.is_none());

        fields.merge(ListingFields {
            commute: Some(Commute::unknown()),
            ..ListingFields::default()
        });
        assert_eq!(fields.commute, Some(Commute::unknown()));
        assert!(fields.commute_minutes().is_none());

        // A patch without a commute leaves it alone
        fields.merge(ListingFields::default());
        assert_eq!(fields.commute, Some(Commute::unknown()));
    }

    #[test]
    fn test_merge_is_non_destructive() {
        let mut fields = ListingFields {
            base_rent: Some(20_000),
            amenities: Amenities {
                washing_machine: Some(true),
                ..Amenities::default()
            },
            ..ListingFields::default()
        };
        fields.merge(ListingFields {
            size_sqm: Some(55.0),
            amenities: Amenities {
                ac: Some(false),
                ..Amenities::default()
            },
            ..ListingFields::default()
        });

        assert_eq!(fields.base_rent, Some(20_000));
        assert_eq!(fields.size_sqm, Some(55.0));
        assert_eq!(fields.amenities.washing_machine, Some(true));
        assert_eq!(fields.amenities.ac, Some(false));
    }

    #[test]
    fn test_merge_twice_is_idempotent() {
        let patch = ListingFields {
            title: Some("Sunny flat".to_string()),
            deposit_months: Some(2),
            ..ListingFields::default()
        };
        let mut once = ListingFields::default();
        once.merge(patch.clone());
        let mut twice = once.clone();
        twice.merge(patch);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_factor_score_serde() {
        let scored = serde_json::to_value(FactorScore::Scored(70.0)).expect("serialize");
        assert_eq!(scored, serde_json::json!({ "status": "scored", "value": 70.0 }));
        let unknown = serde_json::to_value(FactorScore::Unknown).expect("serialize");
        assert_eq!(unknown, serde_json::json!({ "status": "unknown" }));
    }

    #[test]
    fn test_record_flattens_fields() {
        let record = ListingRecord {
            id: ListingId::new("12345").expect("id"),
            fields: ListingFields {
                district: Some("Xinyi".to_string()),
                ..ListingFields::default()
            },
        };
        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value, serde_json::json!({ "id": "12345", "district": "Xinyi" }));
        let back: ListingRecord = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, record);
    }

    #[test]
    fn test_lease_term_falls_back_to_months() {
        let fields = ListingFields {
            min_tenancy_months: Some(12),
            ..ListingFields::default()
        };
        assert_eq!(fields.lease_term(), Some(LeaseTerm::OneYear));
        assert_eq!(ListingFields::default().lease_term(), None);
    }
}
