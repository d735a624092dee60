use crate::worker::{StageWorker, UnitOutput};
use async_trait::async_trait;
use rentscout_core::{
    find_district, FetchError, ListingFields, ListingSource, SearchConfig, Stage,
};
use std::sync::Arc;

/// Discovers listing IDs district by district.
pub struct CollectWorker {
    source: Arc<dyn ListingSource>,
    search: SearchConfig,
}

impl CollectWorker {
    /// Worker searching `source` with the configured filters.
    #[must_use]
    pub fn new(source: Arc<dyn ListingSource>, search: SearchConfig) -> Self {
        Self { source, search }
    }

    /// Configured districts, in order.
    #[must_use]
    pub fn units(&self) -> Vec<String> {
        self.search.districts.clone()
    }
}

#[async_trait]
impl StageWorker for CollectWorker {
    fn stage(&self) -> Stage {
        Stage::Collect
    }

    async fn process(&self, unit: &str) -> Result<UnitOutput, FetchError> {
        let district = find_district(unit)
            .ok_or_else(|| FetchError::Parse(format!("unknown district '{unit}'")))?;
        let ids = self.source.search(district, &self.search).await?;
        tracing::info!(district = district.name, found = ids.len(), "Collected listing IDs");

        let records = ids
            .into_iter()
            .map(|id| {
                let fields = ListingFields {
                    url: Some(self.source.listing_url(&id)),
                    district: Some(district.name.to_string()),
                    ..ListingFields::default()
                };
                (id, fields)
            })
            .collect();
        Ok(UnitOutput { records })
    }
}
