use super::parse_unit_id;
use crate::error::Result;
use crate::worker::{StageWorker, UnitOutput};
use async_trait::async_trait;
use rentscout_core::cost::apply_cost_model;
use rentscout_core::{
    find_district, CostConfig, FetchError, ListingFields, ListingId, ListingSource,
    ListingStatus, Stage,
};
use rentscout_db::{listings, Database};
use std::sync::Arc;

/// Every collected listing, in discovery order.
pub async fn extract_units(db: &Database) -> Result<Vec<String>> {
    let ids = listings::ids(db.pool()).await?;
    Ok(ids.into_iter().map(String::from).collect())
}

/// Fetches listing details and derives their costs.
pub struct ExtractWorker {
    source: Arc<dyn ListingSource>,
    costs: CostConfig,
}

impl ExtractWorker {
    /// Worker fetching from `source`.
    #[must_use]
    pub fn new(source: Arc<dyn ListingSource>, costs: CostConfig) -> Self {
        Self { source, costs }
    }
}

#[async_trait]
impl StageWorker for ExtractWorker {
    fn stage(&self) -> Stage {
        Stage::Extract
    }

    async fn process(&self, unit: &str) -> std::result::Result<UnitOutput, FetchError> {
        let id = parse_unit_id(unit)?;
        let mut fields = self.source.fetch(&id).await?;

        apply_cost_model(&mut fields, &self.costs);
        if fields.url.is_none() {
            fields.url = Some(self.source.listing_url(&id));
        }
        // Keep the district spelling the collect stage uses
        if let Some(district) = fields.district.as_deref().and_then(find_district) {
            fields.district = Some(district.name.to_string());
        }
        fields.status = Some(ListingStatus::Active);

        Ok(UnitOutput::single(id, fields))
    }

    fn skip_patch(&self, unit: &str, error: &FetchError) -> Option<(ListingId, ListingFields)> {
        let status = match error {
            FetchError::NotFound(_) => ListingStatus::Removed,
            FetchError::Parse(_) => ListingStatus::Malformed,
            FetchError::Transient(_) => return None,
        };
        let id = ListingId::new(unit).ok()?;
        Some((id, ListingFields::with_status(status)))
    }
}
