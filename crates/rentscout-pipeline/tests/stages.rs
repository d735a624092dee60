//! Collect, extract and score against an in-memory listing source

use async_trait::async_trait;
use rentscout_core::{
    Amenities, Commute, CostConfig, District, Factor, FactorScore, FetchError, ListingFields,
    ListingId, ListingSource, ListingStatus, ScoringConfig, SearchConfig, Stage,
};
use rentscout_db::{checkpoints, listings, Database, Outcome};
use rentscout_pipeline::{
    extract_units, ranked, score_units, top, CollectWorker, ExtractWorker, RunPolicy,
    ScoreWorker, StageRunner,
};
use rentscout_transit::{
    Coordinates, ReferenceLocation, Station, StationGraph, TransitSettings, TransportMode,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct FakeSource;

#[async_trait]
impl ListingSource for FakeSource {
    async fn search(
        &self,
        district: &District,
        _filters: &SearchConfig,
    ) -> Result<Vec<ListingId>, FetchError> {
        if district.name == "Da'an" {
            Ok(["1001", "1002", "1003", "1004"]
                .into_iter()
                .map(|id| ListingId::new(id).unwrap())
                .collect())
        } else {
            Ok(Vec::new())
        }
    }

    async fn fetch(&self, id: &ListingId) -> Result<ListingFields, FetchError> {
        match id.as_str() {
            "1001" => Ok(ListingFields {
                title: Some("Quiet studio by Shandao Temple".to_string()),
                district: Some("大安區".to_string()),
                size_ping: Some(12.0),
                base_rent: Some(20_000),
                management_fee: Some(1_000),
                min_tenancy_months: Some(6),
                nearest_station: Some("善導寺".to_string()),
                station_distance_m: Some(160),
                amenities: Amenities {
                    washing_machine: Some(true),
                    ac: Some(true),
                    ..Amenities::default()
                },
                ..ListingFields::default()
            }),
            "1002" => Ok(ListingFields {
                title: Some("Riverside flat in Tamsui".to_string()),
                size_ping: Some(30.0),
                base_rent: Some(45_000),
                min_tenancy_months: Some(12),
                nearest_station: Some("淡水".to_string()),
                station_distance_m: Some(900),
                ..ListingFields::default()
            }),
            "1004" => Err(FetchError::Parse("no rent found".to_string())),
            _ => Err(FetchError::NotFound("HTTP 404".to_string())),
        }
    }

    fn listing_url(&self, id: &ListingId) -> String {
        format!("https://rent.example.test/{id}")
    }
}

fn runner(db: &Database) -> StageRunner {
    StageRunner::with_policy(
        db.clone(),
        RunPolicy {
            request_delay: Duration::ZERO,
            max_retries: 0,
            retry_delay: Duration::ZERO,
            persistent_failure_threshold: 3,
        },
    )
}

async fn run_all(db: &Database) {
    let source: Arc<dyn ListingSource> = Arc::new(FakeSource);
    let runner = runner(db);
    let cancel = CancellationToken::new();

    let collect = CollectWorker::new(source.clone(), SearchConfig::default());
    runner.run(&collect, collect.units(), &cancel).await.unwrap();

    let extract = ExtractWorker::new(source, CostConfig::default());
    runner
        .run(&extract, extract_units(db).await.unwrap(), &cancel)
        .await
        .unwrap();

    score_with(
        db,
        StationGraph::taipei(TransitSettings::default()),
        ReferenceLocation::Station("台北車站".to_string()),
    )
    .await;
}

async fn score_with(db: &Database, graph: StationGraph, reference: ReferenceLocation) {
    let score = ScoreWorker::new(db.clone(), Arc::new(graph), reference, ScoringConfig::default());
    runner(db)
        .run(&score, score_units(db).await.unwrap(), &CancellationToken::new())
        .await
        .unwrap();
}

async fn fields(db: &Database, id: &str) -> ListingFields {
    listings::require(db.pool(), &ListingId::new(id).unwrap())
        .await
        .unwrap()
        .fields
}

#[tokio::test]
async fn test_three_stages_produce_ranked_listings() {
    let db = Database::open(":memory:").await.unwrap();
    run_all(&db).await;

    let ranked = ranked(&db).await.unwrap();
    let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1001", "1002"]);

    let best = &ranked[0].fields;
    assert_eq!(best.district.as_deref(), Some("Da'an"));
    assert_eq!(best.url.as_deref(), Some("https://rent.example.test/1001"));
    assert_eq!(best.status, Some(ListingStatus::Active));
    assert_eq!(best.size_sqm, Some(39.6));
    assert!(best.total_monthly.is_some());
    let commute = best.commute.as_ref().unwrap();
    assert_eq!(commute.mode, Some(TransportMode::Transit));
    assert_eq!(commute.via.as_deref(), Some("善導寺"));
    let score = best.score.as_ref().unwrap();
    assert!(score.complete);
    assert!(score.composite > ranked[1].composite().unwrap());

    assert_eq!(top(&db, 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_removed_listing_is_flagged_and_not_scored() {
    let db = Database::open(":memory:").await.unwrap();
    run_all(&db).await;

    let id = ListingId::new("1003").unwrap();
    let record = listings::require(db.pool(), &id).await.unwrap();
    assert_eq!(record.fields.status, Some(ListingStatus::Removed));
    assert!(record.fields.score.is_none());

    let extract = checkpoints::get(db.pool(), Stage::Extract, "1003")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(extract.outcome, Outcome::Skipped);
    let score = checkpoints::get(db.pool(), Stage::Score, "1003")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(score.outcome, Outcome::Skipped);
}

#[tokio::test]
async fn test_rerunning_collect_keeps_later_stage_fields() {
    let db = Database::open(":memory:").await.unwrap();
    run_all(&db).await;

    checkpoints::reset(db.pool(), Stage::Collect).await.unwrap();
    let collect = CollectWorker::new(Arc::new(FakeSource), SearchConfig::default());
    let summary = runner(&db)
        .run(&collect, collect.units(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.done, 1);

    let record = listings::require(db.pool(), &ListingId::new("1001").unwrap())
        .await
        .unwrap();
    assert_eq!(record.fields.base_rent, Some(20_000));
    assert!(record.fields.score.is_some());
    assert_eq!(listings::count(db.pool()).await.unwrap(), 4);
}

#[tokio::test]
async fn test_score_units_wait_for_extract() {
    let db = Database::open(":memory:").await.unwrap();
    let collect = CollectWorker::new(Arc::new(FakeSource), SearchConfig::default());
    runner(&db)
        .run(&collect, collect.units(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(extract_units(&db).await.unwrap().len(), 4);
    assert!(score_units(&db).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_listing_is_skipped_through_every_stage() {
    let db = Database::open(":memory:").await.unwrap();
    run_all(&db).await;

    let record = fields(&db, "1004").await;
    assert_eq!(record.status, Some(ListingStatus::Malformed));
    assert!(record.score.is_none());

    for stage in [Stage::Extract, Stage::Score] {
        let checkpoint = checkpoints::get(db.pool(), stage, "1004")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(checkpoint.outcome, Outcome::Skipped, "{stage}");
        assert!(checkpoint.note.unwrap().starts_with("malformed"), "{stage}");
    }

    let ranked = ranked(&db).await.unwrap();
    assert!(ranked.iter().all(|r| r.id.as_str() != "1004"));
}

#[tokio::test]
async fn test_rescore_without_estimate_marks_commute_unknown() {
    let db = Database::open(":memory:").await.unwrap();
    run_all(&db).await;
    let first = fields(&db, "1001").await;
    assert!(first.commute_minutes().is_some());
    assert!(first.score.unwrap().complete);

    // The new station set no longer knows the listing's station
    let taipei = StationGraph::taipei(TransitSettings::default());
    let keep = |name: &str| Station {
        name: name.to_string(),
        line: None,
        coords: taipei.station(name).unwrap().coords,
    };
    let graph =
        StationGraph::from_stations(vec![keep("台北車站"), keep("淡水")], TransitSettings::default())
            .unwrap();

    checkpoints::reset(db.pool(), Stage::Score).await.unwrap();
    score_with(&db, graph, ReferenceLocation::Station("台北車站".to_string())).await;

    let rescored = fields(&db, "1001").await;
    assert_eq!(rescored.commute, Some(Commute::unknown()));
    let score = rescored.score.unwrap();
    assert_eq!(score.breakdown[&Factor::Commute], FactorScore::Unknown);
    assert!(!score.complete);

    let other = fields(&db, "1002").await;
    assert_eq!(other.commute.unwrap().via.as_deref(), Some("淡水"));
}

#[tokio::test]
async fn test_rescore_with_point_reference_replaces_transit_commute() {
    let db = Database::open(":memory:").await.unwrap();
    run_all(&db).await;

    checkpoints::reset(db.pool(), Stage::Score).await.unwrap();
    score_with(
        &db,
        StationGraph::taipei(TransitSettings::default()),
        ReferenceLocation::Point(Coordinates::new(25.0330, 121.5654)),
    )
    .await;

    let commute = fields(&db, "1001").await.commute.unwrap();
    assert_eq!(commute.mode, Some(TransportMode::Bike));
    assert!(commute.via.is_none());
    assert!(commute.minutes.unwrap() > 0.0);
}
