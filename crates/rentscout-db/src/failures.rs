//! Failure ledger for units whose retries ran out.
//!
//! A failed unit stays pending and is retried on the next run; the ledger
//! counts how many runs failed it so persistent failures can be surfaced.

use crate::error::Result;
use rentscout_core::Stage;
use serde::Serialize;
use sqlx::{Pool, Sqlite};

/// A unit with at least one failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    /// Unit key
    pub unit: String,
    /// Failed runs so far
    pub attempts: u32,
    /// Message of the most recent failure
    pub last_error: String,
    /// SQLite `datetime('now')` of the most recent failure
    pub updated_at: String,
}

/// Record one more failed run of `unit`. Returns the new attempt count.
pub async fn record_failure(
    pool: &Pool<Sqlite>,
    stage: Stage,
    unit: &str,
    error: &str,
) -> Result<u32> {
    let attempts: i64 = sqlx::query_scalar(
        r"
        INSERT INTO unit_failures (stage, unit_key, attempts, last_error, updated_at)
        VALUES (?, ?, 1, ?, datetime('now'))
        ON CONFLICT(stage, unit_key) DO UPDATE SET
            attempts = unit_failures.attempts + 1,
            last_error = excluded.last_error,
            updated_at = datetime('now')
        RETURNING attempts
        ",
    )
    .bind(stage.as_str())
    .bind(unit)
    .bind(error)
    .fetch_one(pool)
    .await?;

    Ok(u32::try_from(attempts).unwrap_or(u32::MAX))
}

/// Failed runs recorded for `unit`, 0 if none.
pub async fn attempts(pool: &Pool<Sqlite>, stage: Stage, unit: &str) -> Result<u32> {
    let attempts: Option<i64> =
        sqlx::query_scalar("SELECT attempts FROM unit_failures WHERE stage = ? AND unit_key = ?")
            .bind(stage.as_str())
            .bind(unit)
            .fetch_optional(pool)
            .await?;
    Ok(attempts.map_or(0, |a| u32::try_from(a).unwrap_or(u32::MAX)))
}

/// Units of `stage` that failed at least `threshold` runs.
pub async fn persistent(
    pool: &Pool<Sqlite>,
    stage: Stage,
    threshold: u32,
) -> Result<Vec<FailureRecord>> {
    list(pool, stage, threshold).await
}

/// Every unit of `stage` with a recorded failure.
pub async fn all(pool: &Pool<Sqlite>, stage: Stage) -> Result<Vec<FailureRecord>> {
    list(pool, stage, 1).await
}

async fn list(pool: &Pool<Sqlite>, stage: Stage, min_attempts: u32) -> Result<Vec<FailureRecord>> {
    let rows: Vec<(String, i64, String, String)> = sqlx::query_as(
        r"
        SELECT unit_key, attempts, last_error, updated_at
        FROM unit_failures
        WHERE stage = ? AND attempts >= ?
        ORDER BY attempts DESC, unit_key ASC
        ",
    )
    .bind(stage.as_str())
    .bind(i64::from(min_attempts))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(unit, attempts, last_error, updated_at)| FailureRecord {
            unit,
            attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
            last_error,
            updated_at,
        })
        .collect())
}

/// Forget the failures of `unit`, after it finally succeeded.
pub async fn clear(pool: &Pool<Sqlite>, stage: Stage, unit: &str) -> Result<()> {
    sqlx::query("DELETE FROM unit_failures WHERE stage = ? AND unit_key = ?")
        .bind(stage.as_str())
        .bind(unit)
        .execute(pool)
        .await?;
    Ok(())
}

/// Forget every failure of `stage`. Returns the number removed.
pub async fn clear_stage(pool: &Pool<Sqlite>, stage: Stage) -> Result<u64> {
    let result = sqlx::query("DELETE FROM unit_failures WHERE stage = ?")
        .bind(stage.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
