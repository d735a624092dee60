//! Composite scoring.
//!
//! [`score`] is a pure function: identical inputs always produce identical
//! output. Missing inputs never raise; they turn into
//! [`FactorScore::Unknown`] and the configured [`MissingDataPolicy`] decides
//! how that factor's weight enters the composite.

use crate::curve::interpolate;
use rentscout_core::{
    Amenity, Factor, FactorScore, ListingFields, ListingScore, MissingDataPolicy, ScoringConfig,
};
use rentscout_transit::CommuteEstimate;
use std::collections::BTreeMap;

/// Score a listing.
///
/// `commute` is the estimate for this run; when it is `None` the commute
/// stored on `fields`, if any, is used. Callers re-scoring a stored record
/// should overwrite `fields.commute` with the current estimate first.
#[must_use]
pub fn score(
    fields: &ListingFields,
    config: &ScoringConfig,
    commute: Option<&CommuteEstimate>,
) -> ListingScore {
    let commute_minutes = commute.map(|c| c.minutes).or_else(|| fields.commute_minutes());

    let mut breakdown = BTreeMap::new();
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    let mut complete = true;

    for factor in Factor::ALL {
        let sub = factor_score(factor, fields, config, commute_minutes);
        breakdown.insert(factor, sub);

        let weight = config.weights.get(factor);
        if weight <= 0.0 {
            continue;
        }
        match sub {
            FactorScore::Scored(value) => {
                weighted_sum += weight * value;
                weight_total += weight;
            }
            FactorScore::Unknown => {
                complete = false;
                if config.missing_data == MissingDataPolicy::Zero {
                    weight_total += weight;
                }
            }
        }
    }

    let composite = if weight_total > 0.0 {
        (weighted_sum / weight_total).clamp(0.0, 100.0)
    } else {
        complete = false;
        0.0
    };

    ListingScore {
        composite,
        breakdown,
        complete,
    }
}

fn factor_score(
    factor: Factor,
    fields: &ListingFields,
    config: &ScoringConfig,
    commute_minutes: Option<f64>,
) -> FactorScore {
    let value = match factor {
        Factor::Commute => commute_minutes
            .filter(|m| m.is_finite() && *m >= 0.0)
            .map(|m| interpolate(&config.commute_anchors, m)),
        Factor::Lease => fields
            .lease_term()
            .map(|lease| config.lease_scores.get(lease).clamp(0.0, 100.0)),
        Factor::Price => fields
            .base_rent
            .filter(|rent| *rent > 0)
            .map(|rent| interpolate(&config.price_anchors, f64::from(rent))),
        Factor::Size => size_sqm(fields).map(|sqm| interpolate(&config.size_anchors, sqm)),
        Factor::Amenities => amenity_score(fields, config),
    };
    value.map_or(FactorScore::Unknown, FactorScore::Scored)
}

fn size_sqm(fields: &ListingFields) -> Option<f64> {
    fields
        .size_sqm
        .or_else(|| fields.size_ping.map(rentscout_core::cost::ping_to_sqm))
        .filter(|sqm| sqm.is_finite() && *sqm > 0.0)
}

/// Share of the point table earned by present amenities. Unknown when the
/// listing says nothing about any amenity.
fn amenity_score(fields: &ListingFields, config: &ScoringConfig) -> Option<f64> {
    if fields.amenities.is_empty() {
        return None;
    }
    let total = config.amenity_points.total();
    if total <= 0.0 {
        return None;
    }
    let earned: f64 = Amenity::ALL
        .iter()
        .filter(|a| fields.amenities.get(**a) == Some(true))
        .map(|a| config.amenity_points.get(*a))
        .sum();
    Some((earned / total * 100.0).clamp(0.0, 100.0))
}
