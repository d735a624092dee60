//! Monthly and upfront cost estimation.
//!
//! Amounts are whole NT$; EUR figures are rounded to cents.

use crate::config::CostConfig;
use crate::listing::ListingFields;

/// Square metres per ping.
pub const PING_TO_SQM: f64 = 3.3;

/// Convert ping to square metres, rounded to one decimal.
#[must_use]
pub fn ping_to_sqm(ping: f64) -> f64 {
    (ping * PING_TO_SQM * 10.0).round() / 10.0
}

/// Convert NT$ to EUR, rounded to cents.
#[must_use]
pub fn to_eur(amount_nt: u32, config: &CostConfig) -> f64 {
    (f64::from(amount_nt) * config.nt_to_eur * 100.0).round() / 100.0
}

/// Estimated monthly utilities: a fixed base plus electricity by floor area.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn estimate_utilities(size_sqm: f64, has_ac: bool, config: &CostConfig) -> u32 {
    let per_sqm = if has_ac {
        config.electricity_per_sqm_ac
    } else {
        config.electricity_per_sqm
    };
    let electricity = (size_sqm.max(0.0) * per_sqm).trunc();
    config.utilities_base.saturating_add(electricity as u32)
}

/// Monthly cost breakdown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyCost {
    /// Rent
    pub base_rent: u32,
    /// Management fee, zero when unknown
    pub management_fee: u32,
    /// Utilities, zero when they cannot be estimated
    pub utilities: u32,
    /// Sum of the above
    pub total: u32,
    /// Total in EUR
    pub total_eur: f64,
}

/// Combine rent, fee and utilities into a monthly total.
#[must_use]
pub fn monthly_cost(
    base_rent: u32,
    management_fee: Option<u32>,
    utilities: Option<u32>,
    config: &CostConfig,
) -> MonthlyCost {
    let management_fee = management_fee.unwrap_or(0);
    let utilities = utilities.unwrap_or(0);
    let total = base_rent
        .saturating_add(management_fee)
        .saturating_add(utilities);
    MonthlyCost {
        base_rent,
        management_fee,
        utilities,
        total,
        total_eur: to_eur(total, config),
    }
}

/// Move-in cost: rent times deposit months.
#[must_use]
pub fn upfront_cost(base_rent: u32, deposit_months: Option<u32>, config: &CostConfig) -> u32 {
    base_rent.saturating_mul(deposit_months.unwrap_or(config.default_deposit_months))
}

/// Fill in the derived size and cost fields of a freshly extracted listing.
///
/// Fields the source already provided are left alone. Nothing cost-related
/// is derived without a base rent.
pub fn apply_cost_model(fields: &mut ListingFields, config: &CostConfig) {
    if fields.size_sqm.is_none() {
        fields.size_sqm = fields.size_ping.filter(|p| *p > 0.0).map(ping_to_sqm);
    }

    let Some(base_rent) = fields.base_rent.filter(|r| *r > 0) else {
        return;
    };

    if fields.utilities_estimate.is_none() {
        let has_ac = fields.amenities.ac.unwrap_or(true);
        fields.utilities_estimate = fields
            .size_sqm
            .filter(|s| *s > 0.0)
            .map(|sqm| estimate_utilities(sqm, has_ac, config));
    }

    let monthly = monthly_cost(
        base_rent,
        fields.management_fee,
        fields.utilities_estimate,
        config,
    );
    fields.total_monthly = Some(monthly.total);
    fields.total_monthly_eur = Some(monthly.total_eur);

    let upfront = upfront_cost(base_rent, fields.deposit_months, config);
    fields.upfront_cost = Some(upfront);
    fields.upfront_cost_eur = Some(to_eur(upfront, config));
}
