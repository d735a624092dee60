//! Ordering of scored listings for export and summaries.

use crate::error::Result;
use rentscout_core::{ListingRecord, ListingStatus};
use rentscout_db::{listings, Database};

/// Scored records sorted by composite score, highest first. Listings the
/// extract stage skipped as removed or malformed are left out even if an
/// earlier run scored them.
///
/// `records` must be in discovery order; the sort is stable so equal scores
/// keep that order.
#[must_use]
pub fn rank(records: Vec<ListingRecord>) -> Vec<ListingRecord> {
    let mut scored: Vec<ListingRecord> = records
        .into_iter()
        .filter(|r| {
            r.fields.score.is_some()
                && !matches!(
                    r.fields.status,
                    Some(ListingStatus::Removed | ListingStatus::Malformed)
                )
        })
        .collect();
    scored.sort_by(|a, b| {
        let a = a.composite().unwrap_or(0.0);
        let b = b.composite().unwrap_or(0.0);
        b.total_cmp(&a)
    });
    scored
}

/// Every ranked listing in the store.
pub async fn ranked(db: &Database) -> Result<Vec<ListingRecord>> {
    let records = listings::get_all(db.pool()).await?;
    Ok(rank(records))
}

/// The `n` best listings in the store.
pub async fn top(db: &Database, n: usize) -> Result<Vec<ListingRecord>> {
    let mut ranked = ranked(db).await?;
    ranked.truncate(n);
    Ok(ranked)
}
