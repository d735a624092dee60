//! The flat row shape shared by every export format.

use rentscout_core::cost::to_eur;
use rentscout_core::{CostConfig, Factor, ListingRecord};
use serde::Serialize;

/// One cell of a tabular export.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Unknown or not applicable
    Empty,
    /// Free text
    Text(String),
    /// Numeric value
    Number(f64),
    /// Yes/no flag
    Bool(bool),
}

impl Cell {
    fn text(value: Option<&str>) -> Self {
        value.map_or(Self::Empty, |v| Self::Text(v.to_string()))
    }

    fn number<T: Into<f64>>(value: Option<T>) -> Self {
        value.map_or(Self::Empty, |v| Self::Number(v.into()))
    }

    fn flag(value: Option<bool>) -> Self {
        value.map_or(Self::Empty, Self::Bool)
    }
}

/// A scored listing flattened for export.
///
/// Amenities and annotations are flags, the lease is its category name and
/// every score factor is its own numeric column; an absent value means the
/// factor or field is unknown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[allow(missing_docs)]
pub struct ExportRow {
    pub rank: u32,
    pub id: String,
    pub url: Option<String>,
    pub title: Option<String>,
    pub district: Option<String>,
    pub address: Option<String>,
    pub size_ping: Option<f64>,
    pub size_sqm: Option<f64>,
    pub layout: Option<String>,
    pub floor: Option<String>,
    pub lease: Option<String>,
    pub min_tenancy_months: Option<u32>,
    pub deposit_months: Option<u32>,
    pub base_rent: Option<u32>,
    pub base_rent_eur: Option<f64>,
    pub management_fee: Option<u32>,
    pub utilities_estimate: Option<u32>,
    pub total_monthly: Option<u32>,
    pub total_monthly_eur: Option<f64>,
    pub upfront_cost: Option<u32>,
    pub upfront_cost_eur: Option<f64>,
    pub washing_machine: Option<bool>,
    pub ac: Option<bool>,
    pub balcony: Option<bool>,
    pub parking: Option<bool>,
    pub pets_allowed: Option<bool>,
    pub nearest_station: Option<String>,
    pub station_distance_m: Option<u32>,
    pub commute_minutes: Option<f64>,
    pub transport_mode: Option<String>,
    pub commute_via: Option<String>,
    pub score: Option<f64>,
    pub score_complete: Option<bool>,
    pub score_commute: Option<f64>,
    pub score_lease: Option<f64>,
    pub score_price: Option<f64>,
    pub score_size: Option<f64>,
    pub score_amenities: Option<f64>,
    pub is_modern: Option<bool>,
    pub has_elevator: Option<bool>,
    pub is_flat: Option<bool>,
    pub location_note: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

impl ExportRow {
    /// Column names, in the order of [`ExportRow::cells`].
    pub const COLUMNS: &'static [&'static str] = &[
        "rank",
        "id",
        "url",
        "title",
        "district",
        "address",
        "size_ping",
        "size_sqm",
        "layout",
        "floor",
        "lease",
        "min_tenancy_months",
        "deposit_months",
        "base_rent",
        "base_rent_eur",
        "management_fee",
        "utilities_estimate",
        "total_monthly",
        "total_monthly_eur",
        "upfront_cost",
        "upfront_cost_eur",
        "washing_machine",
        "ac",
        "balcony",
        "parking",
        "pets_allowed",
        "nearest_station",
        "station_distance_m",
        "commute_minutes",
        "transport_mode",
        "commute_via",
        "score",
        "score_complete",
        "score_commute",
        "score_lease",
        "score_price",
        "score_size",
        "score_amenities",
        "is_modern",
        "has_elevator",
        "is_flat",
        "location_note",
        "notes",
        "status",
    ];

    /// Flatten `record`, placed at 1-based `rank`.
    #[must_use]
    pub fn from_record(rank: u32, record: &ListingRecord, costs: &CostConfig) -> Self {
        let f = &record.fields;
        let factor = |factor: Factor| {
            f.score
                .as_ref()
                .and_then(|s| s.breakdown.get(&factor))
                .and_then(|s| s.value())
        };

        Self {
            rank,
            id: record.id.to_string(),
            url: f.url.clone(),
            title: f.title.clone(),
            district: f.district.clone(),
            address: f.address.clone(),
            size_ping: f.size_ping,
            size_sqm: f.size_sqm,
            layout: f.layout.clone(),
            floor: f.floor.clone(),
            lease: f.lease_term().map(|l| l.as_str().to_string()),
            min_tenancy_months: f.min_tenancy_months,
            deposit_months: f.deposit_months,
            base_rent: f.base_rent,
            base_rent_eur: f.base_rent.map(|r| to_eur(r, costs)),
            management_fee: f.management_fee,
            utilities_estimate: f.utilities_estimate,
            total_monthly: f.total_monthly,
            total_monthly_eur: f.total_monthly_eur,
            upfront_cost: f.upfront_cost,
            upfront_cost_eur: f.upfront_cost_eur,
            washing_machine: f.amenities.washing_machine,
            ac: f.amenities.ac,
            balcony: f.amenities.balcony,
            parking: f.amenities.parking,
            pets_allowed: f.amenities.pets_allowed,
            nearest_station: f.nearest_station.clone(),
            station_distance_m: f.station_distance_m,
            commute_minutes: f.commute_minutes(),
            transport_mode: f
                .commute
                .as_ref()
                .and_then(|c| c.mode)
                .map(|m| m.to_string()),
            commute_via: f.commute.as_ref().and_then(|c| c.via.clone()),
            score: record.composite(),
            score_complete: f.score.as_ref().map(|s| s.complete),
            score_commute: factor(Factor::Commute),
            score_lease: factor(Factor::Lease),
            score_price: factor(Factor::Price),
            score_size: factor(Factor::Size),
            score_amenities: factor(Factor::Amenities),
            is_modern: f.annotations.is_modern,
            has_elevator: f.annotations.has_elevator,
            is_flat: f.annotations.is_flat,
            location_note: f.annotations.location_note.clone(),
            notes: f.annotations.notes.clone(),
            status: f.status.map(|s| s.as_str().to_string()),
        }
    }

    /// Rows for ranked records, numbered from 1.
    #[must_use]
    pub fn from_ranked(records: &[ListingRecord], costs: &CostConfig) -> Vec<Self> {
        records
            .iter()
            .zip(1u32..)
            .map(|(record, rank)| Self::from_record(rank, record, costs))
            .collect()
    }

    /// Cell values in [`ExportRow::COLUMNS`] order.
    #[must_use]
    pub fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Number(f64::from(self.rank)),
            Cell::Text(self.id.clone()),
            Cell::text(self.url.as_deref()),
            Cell::text(self.title.as_deref()),
            Cell::text(self.district.as_deref()),
            Cell::text(self.address.as_deref()),
            Cell::number(self.size_ping),
            Cell::number(self.size_sqm),
            Cell::text(self.layout.as_deref()),
            Cell::text(self.floor.as_deref()),
            Cell::text(self.lease.as_deref()),
            Cell::number(self.min_tenancy_months),
            Cell::number(self.deposit_months),
            Cell::number(self.base_rent),
            Cell::number(self.base_rent_eur),
            Cell::number(self.management_fee),
            Cell::number(self.utilities_estimate),
            Cell::number(self.total_monthly),
            Cell::number(self.total_monthly_eur),
            Cell::number(self.upfront_cost),
            Cell::number(self.upfront_cost_eur),
            Cell::flag(self.washing_machine),
            Cell::flag(self.ac),
            Cell::flag(self.balcony),
            Cell::flag(self.parking),
            Cell::flag(self.pets_allowed),
            Cell::text(self.nearest_station.as_deref()),
            Cell::number(self.station_distance_m),
            Cell::number(self.commute_minutes),
            Cell::text(self.transport_mode.as_deref()),
            Cell::text(self.commute_via.as_deref()),
            Cell::number(self.score),
            Cell::flag(self.score_complete),
            Cell::number(self.score_commute),
            Cell::number(self.score_lease),
            Cell::number(self.score_price),
            Cell::number(self.score_size),
            Cell::number(self.score_amenities),
            Cell::flag(self.is_modern),
            Cell::flag(self.has_elevator),
            Cell::flag(self.is_flat),
            Cell::text(self.location_note.as_deref()),
            Cell::text(self.notes.as_deref()),
            Cell::text(self.status.as_deref()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rentscout_core::{
        Amenities, Commute, FactorScore, LeaseTerm, ListingFields, ListingId, ListingScore,
        ListingStatus,
    };
    use rentscout_transit::TransportMode;
    use std::collections::BTreeMap;

    fn record() -> ListingRecord {
        let mut breakdown = BTreeMap::new();
        breakdown.insert(Factor::Commute, FactorScore::Scored(76.0));
        breakdown.insert(Factor::Amenities, FactorScore::Unknown);
        ListingRecord {
            id: ListingId::new("16543210").unwrap(),
            fields: ListingFields {
                base_rent: Some(20_000),
                lease: Some(LeaseTerm::SixMonths),
                status: Some(ListingStatus::Active),
                commute: Some(Commute {
                    minutes: Some(14.5),
                    mode: Some(TransportMode::Transit),
                    via: Some("善導寺".to_string()),
                }),
                amenities: Amenities {
                    washing_machine: Some(true),
                    ..Amenities::default()
                },
                score: Some(ListingScore {
                    composite: 64.5,
                    breakdown,
                    complete: false,
                }),
                ..ListingFields::default()
            },
        }
    }

    #[test]
    fn test_columns_match_cells() {
        let row = ExportRow::from_record(1, &record(), &CostConfig::default());
        assert_eq!(row.cells().len(), ExportRow::COLUMNS.len());
    }

    #[test]
    fn test_from_record_flattens_fields() {
        let row = ExportRow::from_record(3, &record(), &CostConfig::default());
        assert_eq!(row.rank, 3);
        assert_eq!(row.lease.as_deref(), Some("6mo"));
        assert_eq!(row.base_rent_eur, Some(540.0));
        assert_eq!(row.washing_machine, Some(true));
        assert_eq!(row.ac, None);
        assert_eq!(row.score, Some(64.5));
        assert_eq!(row.score_complete, Some(false));
        assert_eq!(row.score_commute, Some(76.0));
        assert_eq!(row.score_amenities, None);
        assert_eq!(row.commute_minutes, Some(14.5));
        assert_eq!(row.transport_mode.as_deref(), Some("transit"));
        assert_eq!(row.commute_via.as_deref(), Some("善導寺"));
        assert_eq!(row.status.as_deref(), Some("active"));
    }

    #[test]
    fn test_cells_mark_unknown_as_empty() {
        let row = ExportRow::from_record(1, &record(), &CostConfig::default());
        let cells = row.cells();
        let ac = ExportRow::COLUMNS.iter().position(|c| *c == "ac").unwrap();
        assert_eq!(cells[ac], Cell::Empty);
        let wm = ExportRow::COLUMNS
            .iter()
            .position(|c| *c == "washing_machine")
            .unwrap();
        assert_eq!(cells[wm], Cell::Bool(true));
    }
}
