//! Stage runner behaviour with scripted workers: resume, crash safety,
//! retries, skips and cancellation

use async_trait::async_trait;
use rentscout_core::{FetchError, ListingFields, ListingId, Stage};
use rentscout_db::{checkpoints, failures, listings, Database, Outcome};
use rentscout_pipeline::{RunPolicy, StageRunner, StageWorker, UnitOutput};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Succeeds with `base_rent = 20000` unless a queued failure is pending for
/// the unit.
#[derive(Default)]
struct ScriptedWorker {
    failures: Mutex<HashMap<String, Vec<FetchError>>>,
    always_fail: Option<FetchError>,
    cancel_on: Option<(String, CancellationToken)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedWorker {
    fn fail_first(self, unit: &str, errors: Vec<FetchError>) -> Self {
        self.failures.lock().unwrap().insert(unit.to_string(), errors);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_for(&self, unit: &str) -> usize {
        self.calls().iter().filter(|c| *c == unit).count()
    }
}

#[async_trait]
impl StageWorker for ScriptedWorker {
    fn stage(&self) -> Stage {
        Stage::Extract
    }

    async fn process(&self, unit: &str) -> Result<UnitOutput, FetchError> {
        self.calls.lock().unwrap().push(unit.to_string());
        if let Some((target, token)) = &self.cancel_on {
            if target == unit {
                token.cancel();
            }
        }
        if let Some(err) = &self.always_fail {
            return Err(err.clone());
        }
        if let Some(queue) = self.failures.lock().unwrap().get_mut(unit) {
            if !queue.is_empty() {
                return Err(queue.remove(0));
            }
        }
        let id = ListingId::new(unit).unwrap();
        Ok(UnitOutput::single(
            id,
            ListingFields {
                base_rent: Some(20_000),
                ..ListingFields::default()
            },
        ))
    }
}

fn policy() -> RunPolicy {
    RunPolicy {
        request_delay: Duration::ZERO,
        max_retries: 3,
        retry_delay: Duration::ZERO,
        persistent_failure_threshold: 3,
    }
}

fn units(ids: &[&str]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}

async fn memory_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

#[tokio::test]
async fn test_processes_all_units_and_checkpoints() {
    let db = memory_db().await;
    let runner = StageRunner::with_policy(db.clone(), policy());
    let worker = ScriptedWorker::default();

    let summary = runner
        .run(&worker, units(&["1", "2", "3"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.done, 3);
    assert_eq!(summary.remaining(), 0);
    assert!(!summary.interrupted);
    assert_eq!(worker.calls(), units(&["1", "2", "3"]));
    assert_eq!(listings::count(db.pool()).await.unwrap(), 3);
    for id in ["1", "2", "3"] {
        assert!(checkpoints::is_done(db.pool(), Stage::Extract, id).await.unwrap());
    }
}

#[tokio::test]
async fn test_resume_skips_checkpointed_units() {
    let db = memory_db().await;
    db.checkpoints(Stage::Extract)
        .mark_done("1", Outcome::Done, None)
        .await
        .unwrap();
    let runner = StageRunner::with_policy(db.clone(), policy());
    let worker = ScriptedWorker::default();

    let summary = runner
        .run(&worker, units(&["1", "2", "3"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.pending, 2);
    assert_eq!(worker.calls(), units(&["2", "3"]));

    // A second run has nothing left to do
    let again = ScriptedWorker::default();
    let summary = runner
        .run(&again, units(&["1", "2", "3"]), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.pending, 0);
    assert!(again.calls().is_empty());
}

#[tokio::test]
async fn test_crash_between_record_write_and_checkpoint() {
    let db = memory_db().await;
    let id = ListingId::new("12345").unwrap();

    // Previous run wrote the record, then died before checkpointing it
    listings::upsert(
        db.pool(),
        &id,
        &ListingFields {
            title: Some("Sunny two-room".to_string()),
            base_rent: Some(18_000),
            ..ListingFields::default()
        },
    )
    .await
    .unwrap();
    assert!(!checkpoints::is_done(db.pool(), Stage::Extract, "12345").await.unwrap());

    let runner = StageRunner::with_policy(db.clone(), policy());
    let worker = ScriptedWorker::default();
    runner
        .run(&worker, units(&["12345"]), &CancellationToken::new())
        .await
        .unwrap();
    runner
        .run(&worker, units(&["12345"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(worker.calls_for("12345"), 1);
    let record = listings::require(db.pool(), &id).await.unwrap();
    assert_eq!(record.fields.base_rent, Some(20_000));
    assert_eq!(record.fields.title.as_deref(), Some("Sunny two-room"));
    assert_eq!(listings::count(db.pool()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_transient_failures_are_retried_within_a_run() {
    let db = memory_db().await;
    let runner = StageRunner::with_policy(db.clone(), policy());
    let worker = ScriptedWorker::default().fail_first(
        "42",
        vec![
            FetchError::Transient("timeout".into()),
            FetchError::Transient("503".into()),
        ],
    );

    let summary = runner
        .run(&worker, units(&["42"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.done, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(worker.calls_for("42"), 3);
    assert_eq!(
        failures::attempts(db.pool(), Stage::Extract, "42").await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_exhausted_retries_leave_unit_pending_and_escalate() {
    let db = memory_db().await;
    let runner = StageRunner::with_policy(
        db.clone(),
        RunPolicy {
            max_retries: 1,
            persistent_failure_threshold: 2,
            ..policy()
        },
    );
    let worker = ScriptedWorker {
        always_fail: Some(FetchError::Transient("connection reset".into())),
        ..ScriptedWorker::default()
    };

    let first = runner
        .run(&worker, units(&["7", "8"]), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(first.failed, 2);
    assert_eq!(first.remaining(), 2);
    assert!(first.persistent_failures.is_empty());
    assert_eq!(worker.calls_for("7"), 2);
    assert!(!checkpoints::is_done(db.pool(), Stage::Extract, "7").await.unwrap());

    let second = runner
        .run(&worker, units(&["7", "8"]), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(second.pending, 2);
    assert_eq!(second.persistent_failures, units(&["7", "8"]));

    let persistent = failures::persistent(db.pool(), Stage::Extract, 2).await.unwrap();
    assert_eq!(persistent.len(), 2);
    assert_eq!(persistent[0].last_error, "transient error: connection reset");
}

#[tokio::test]
async fn test_success_clears_failure_history() {
    let db = memory_db().await;
    failures::record_failure(db.pool(), Stage::Extract, "5", "timeout")
        .await
        .unwrap();
    let runner = StageRunner::with_policy(db.clone(), policy());

    runner
        .run(&ScriptedWorker::default(), units(&["5"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        failures::attempts(db.pool(), Stage::Extract, "5").await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_permanent_absence_is_skipped_and_checkpointed() {
    let db = memory_db().await;
    let runner = StageRunner::with_policy(db.clone(), policy());
    let worker = ScriptedWorker::default()
        .fail_first("404", vec![FetchError::NotFound("HTTP 404".into())])
        .fail_first("500", vec![FetchError::Parse("no price".into())]);

    let summary = runner
        .run(&worker, units(&["404", "500", "600"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.done, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(worker.calls_for("404"), 1);

    let checkpoint = checkpoints::get(db.pool(), Stage::Extract, "404")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(checkpoint.outcome, Outcome::Skipped);
    assert_eq!(checkpoint.note.as_deref(), Some("removed: HTTP 404"));

    let checkpoint = checkpoints::get(db.pool(), Stage::Extract, "500")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(checkpoint.note.as_deref(), Some("malformed: no price"));
}

#[tokio::test]
async fn test_cancelled_before_start_processes_nothing() {
    let db = memory_db().await;
    let runner = StageRunner::with_policy(db.clone(), policy());
    let worker = ScriptedWorker::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = runner.run(&worker, units(&["1", "2"]), &cancel).await.unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.done, 0);
    assert!(worker.calls().is_empty());
}

#[tokio::test]
async fn test_cancellation_lets_in_flight_unit_finish() {
    let db = memory_db().await;
    let runner = StageRunner::with_policy(db.clone(), policy());
    let cancel = CancellationToken::new();
    let worker = ScriptedWorker {
        cancel_on: Some(("2".to_string(), cancel.clone())),
        ..ScriptedWorker::default()
    };

    let summary = runner
        .run(&worker, units(&["1", "2", "3"]), &cancel)
        .await
        .unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.done, 2);
    assert_eq!(worker.calls(), units(&["1", "2"]));
    assert!(checkpoints::is_done(db.pool(), Stage::Extract, "2").await.unwrap());
    assert!(!checkpoints::is_done(db.pool(), Stage::Extract, "3").await.unwrap());

    // The next run picks up where this one stopped
    let resumed = ScriptedWorker::default();
    runner
        .run(&resumed, units(&["1", "2", "3"]), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(resumed.calls(), units(&["3"]));
}

#[tokio::test]
async fn test_duplicate_units_run_once() {
    let db = memory_db().await;
    let runner = StageRunner::with_policy(db.clone(), policy());
    let worker = ScriptedWorker::default();

    let summary = runner
        .run(&worker, units(&["9", "9", "10"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(worker.calls(), units(&["9", "10"]));
}
