//! Checkpoint tracker.
//!
//! A checkpoint marks one unit of one stage as finished. Marking is
//! idempotent (`INSERT OR IGNORE`): the first outcome recorded for a unit
//! wins until the stage is explicitly reset.

use crate::error::{DatabaseError, Result};
use rentscout_core::Stage;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// How a unit finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Processed and persisted
    Done,
    /// Permanently without data; finished but not processed
    Skipped,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "done" => Ok(Self::Done),
            "skipped" => Ok(Self::Skipped),
            other => Err(DatabaseError::Decode(format!("unknown checkpoint outcome '{other}'"))),
        }
    }
}

/// A stored checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checkpoint {
    /// Unit key (listing ID or district name)
    pub unit: String,
    /// How the unit finished
    pub outcome: Outcome,
    /// Why it was skipped, if it was
    pub note: Option<String>,
    /// SQLite `datetime('now')` of completion
    pub completed_at: String,
}

/// Checkpoint counts of one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckpointCounts {
    /// Units finished as done
    pub done: i64,
    /// Units finished as skipped
    pub skipped: i64,
}

/// Whether `unit` has a checkpoint for `stage`.
pub async fn is_done(pool: &Pool<Sqlite>, stage: Stage, unit: &str) -> Result<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM checkpoints WHERE stage = ? AND unit_key = ?")
            .bind(stage.as_str())
            .bind(unit)
            .fetch_optional(pool)
            .await?;
    Ok(found.is_some())
}

/// Mark `unit` finished. Marking an already-finished unit is a no-op.
///
/// Returns once the write is committed.
pub async fn mark_done(
    pool: &Pool<Sqlite>,
    stage: Stage,
    unit: &str,
    outcome: Outcome,
    note: Option<&str>,
) -> Result<()> {
    let result = sqlx::query(
        r"
        INSERT OR IGNORE INTO checkpoints (stage, unit_key, outcome, note, completed_at)
        VALUES (?, ?, ?, ?, datetime('now'))
        ",
    )
    .bind(stage.as_str())
    .bind(unit)
    .bind(outcome.as_str())
    .bind(note)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        tracing::debug!(stage = %stage, unit, "checkpoint already present");
    }
    Ok(())
}

/// Fetch the checkpoint of one unit.
pub async fn get(pool: &Pool<Sqlite>, stage: Stage, unit: &str) -> Result<Option<Checkpoint>> {
    let row: Option<(String, String, Option<String>, String)> = sqlx::query_as(
        r"
        SELECT unit_key, outcome, note, completed_at
        FROM checkpoints
        WHERE stage = ? AND unit_key = ?
        ",
    )
    .bind(stage.as_str())
    .bind(unit)
    .fetch_optional(pool)
    .await?;

    row.map(|(unit, outcome, note, completed_at)| {
        Ok(Checkpoint {
            unit,
            outcome: outcome.parse()?,
            note,
            completed_at,
        })
    })
    .transpose()
}

/// Filter `units` down to those without a checkpoint, keeping their order.
pub async fn pending<T>(pool: &Pool<Sqlite>, stage: Stage, units: &[T]) -> Result<Vec<T>>
where
    T: AsRef<str> + Clone,
{
    let done: HashSet<String> =
        sqlx::query_scalar::<_, String>("SELECT unit_key FROM checkpoints WHERE stage = ?")
            .bind(stage.as_str())
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect();

    Ok(units
        .iter()
        .filter(|unit| !done.contains(unit.as_ref()))
        .cloned()
        .collect())
}

/// Remove every checkpoint of `stage`. Returns the number removed.
pub async fn reset(pool: &Pool<Sqlite>, stage: Stage) -> Result<u64> {
    let result = sqlx::query("DELETE FROM checkpoints WHERE stage = ?")
        .bind(stage.as_str())
        .execute(pool)
        .await?;
    tracing::info!(stage = %stage, removed = result.rows_affected(), "checkpoints reset");
    Ok(result.rows_affected())
}

/// Done/skipped counts of `stage`.
pub async fn count(pool: &Pool<Sqlite>, stage: Stage) -> Result<CheckpointCounts> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT outcome, COUNT(*) FROM checkpoints WHERE stage = ? GROUP BY outcome",
    )
    .bind(stage.as_str())
    .fetch_all(pool)
    .await?;

    let mut counts = CheckpointCounts::default();
    for (outcome, n) in rows {
        match outcome.parse()? {
            Outcome::Done => counts.done = n,
            Outcome::Skipped => counts.skipped = n,
        }
    }
    Ok(counts)
}

/// Checkpoints of one stage, bound to a pool.
///
/// Handed to the stage runner instead of a global "already processed" set,
/// so independent runs and tests never share state.
#[derive(Debug, Clone)]
pub struct CheckpointSet {
    pool: Pool<Sqlite>,
    stage: Stage,
}

impl CheckpointSet {
    /// Bind `stage` to `pool`.
    #[must_use]
    pub fn new(pool: Pool<Sqlite>, stage: Stage) -> Self {
        Self { pool, stage }
    }

    /// Stage these checkpoints belong to.
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// See [`is_done`].
    pub async fn is_done(&self, unit: &str) -> Result<bool> {
        is_done(&self.pool, self.stage, unit).await
    }

    /// See [`mark_done`].
    pub async fn mark_done(&self, unit: &str, outcome: Outcome, note: Option<&str>) -> Result<()> {
        mark_done(&self.pool, self.stage, unit, outcome, note).await
    }

    /// See [`pending`].
    pub async fn pending<T>(&self, units: &[T]) -> Result<Vec<T>>
    where
        T: AsRef<str> + Clone,
    {
        pending(&self.pool, self.stage, units).await
    }

    /// See [`get`].
    pub async fn get(&self, unit: &str) -> Result<Option<Checkpoint>> {
        get(&self.pool, self.stage, unit).await
    }

    /// See [`count`].
    pub async fn count(&self) -> Result<CheckpointCounts> {
        count(&self.pool, self.stage).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn create_test_db() -> Database {
        let db = Database::new(":memory:").await.expect("create test database");
        db.run_migrations().await.expect("run migrations");
        db
    }

    #[tokio::test]
    async fn test_mark_and_check() {
        let db = create_test_db().await;
        let pool = db.pool();

        assert!(!is_done(pool, Stage::Extract, "123").await.expect("check"));
        mark_done(pool, Stage::Extract, "123", Outcome::Done, None)
            .await
            .expect("mark");
        assert!(is_done(pool, Stage::Extract, "123").await.expect("check"));
        // stages are independent
        assert!(!is_done(pool, Stage::Score, "123").await.expect("check"));
    }

    #[tokio::test]
    async fn test_mark_is_idempotent_first_outcome_wins() {
        let db = create_test_db().await;
        let pool = db.pool();

        mark_done(pool, Stage::Extract, "9", Outcome::Skipped, Some("removed"))
            .await
            .expect("mark");
        mark_done(pool, Stage::Extract, "9", Outcome::Done, None)
            .await
            .expect("mark again");

        let checkpoint = get(pool, Stage::Extract, "9")
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(checkpoint.outcome, Outcome::Skipped);
        assert_eq!(checkpoint.note.as_deref(), Some("removed"));
        assert_eq!(
            count(pool, Stage::Extract).await.expect("count"),
            CheckpointCounts {
                done: 0,
                skipped: 1
            }
        );
    }

    #[tokio::test]
    async fn test_pending_excludes_done_and_keeps_order() {
        let db = create_test_db().await;
        let set = db.checkpoints(Stage::Extract);

        set.mark_done("2", Outcome::Done, None).await.expect("mark");
        let units = vec!["3".to_string(), "2".to_string(), "1".to_string()];
        let pending = set.pending(&units).await.expect("pending");
        assert_eq!(pending, vec!["3".to_string(), "1".to_string()]);
    }

    #[tokio::test]
    async fn test_reset_clears_only_one_stage() {
        let db = create_test_db().await;
        let pool = db.pool();

        mark_done(pool, Stage::Extract, "1", Outcome::Done, None)
            .await
            .expect("mark");
        mark_done(pool, Stage::Score, "1", Outcome::Done, None)
            .await
            .expect("mark");

        assert_eq!(reset(pool, Stage::Score).await.expect("reset"), 1);
        assert!(is_done(pool, Stage::Extract, "1").await.expect("check"));
        assert!(!is_done(pool, Stage::Score, "1").await.expect("check"));
    }
}
