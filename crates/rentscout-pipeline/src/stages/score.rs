use super::parse_unit_id;
use crate::error::Result;
use crate::worker::{StageWorker, UnitOutput};
use async_trait::async_trait;
use rentscout_core::{Commute, FetchError, ListingFields, ListingStatus, ScoringConfig, Stage};
use rentscout_db::{checkpoints, listings, Database};
use rentscout_transit::{ListingLocation, ReferenceLocation, StationGraph};
use std::sync::Arc;

/// Listings the extract stage has finished with, done or skipped.
pub async fn score_units(db: &Database) -> Result<Vec<String>> {
    let mut units = Vec::new();
    for id in listings::ids(db.pool()).await? {
        if checkpoints::is_done(db.pool(), Stage::Extract, id.as_str()).await? {
            units.push(String::from(id));
        }
    }
    Ok(units)
}

/// Estimates commutes and scores stored listings.
pub struct ScoreWorker {
    db: Database,
    graph: Arc<StationGraph>,
    reference: ReferenceLocation,
    scoring: ScoringConfig,
}

impl ScoreWorker {
    /// Worker scoring against `reference`.
    #[must_use]
    pub fn new(
        db: Database,
        graph: Arc<StationGraph>,
        reference: ReferenceLocation,
        scoring: ScoringConfig,
    ) -> Self {
        Self {
            db,
            graph,
            reference,
            scoring,
        }
    }
}

#[async_trait]
impl StageWorker for ScoreWorker {
    fn stage(&self) -> Stage {
        Stage::Score
    }

    async fn process(&self, unit: &str) -> std::result::Result<UnitOutput, FetchError> {
        let id = parse_unit_id(unit)?;
        let record = listings::get(self.db.pool(), &id)
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?
            .ok_or_else(|| FetchError::NotFound(format!("no record for {id}")))?;

        match record.fields.status {
            Some(ListingStatus::Removed) => {
                return Err(FetchError::NotFound("listing removed from source".to_string()));
            }
            Some(ListingStatus::Malformed) => {
                return Err(FetchError::Parse("listing page could not be parsed".to_string()));
            }
            _ => {}
        }

        let location = ListingLocation {
            station: record.fields.nearest_station.as_deref(),
            station_distance_m: record.fields.station_distance_m,
            coords: record.fields.coords,
        };
        let estimate = self.graph.estimate_commute(&location, &self.reference);
        // A commute stored by an earlier run never stands in for this one
        let commute = estimate.as_ref().map_or_else(Commute::unknown, Commute::from);

        let mut fields = record.fields;
        fields.commute = Some(commute.clone());
        let score = rentscout_scoring::score(&fields, &self.scoring, estimate.as_ref());

        tracing::debug!(
            listing = %id,
            composite = score.composite,
            complete = score.complete,
            commute = ?commute.minutes,
            "Scored listing"
        );

        let patch = ListingFields {
            commute: Some(commute),
            score: Some(score),
            ..ListingFields::default()
        };
        Ok(UnitOutput::single(id, patch))
    }
}
