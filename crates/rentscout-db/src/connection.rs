//! Connection pool setup.
//!
//! File databases run in WAL mode with `synchronous = FULL`, so a committed
//! write survives a crash or power loss before the next unit starts.

use crate::error::{DatabaseError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const MEMORY_PATH: &str = ":memory:";

/// Open a pool on `path` (or `:memory:`), creating the file if missing.
pub async fn connect(path: impl AsRef<Path>) -> Result<Pool<Sqlite>> {
    let path_str = path
        .as_ref()
        .to_str()
        .ok_or_else(|| DatabaseError::Open("invalid database path: not valid UTF-8".to_string()))?;

    let mut connect_options = SqliteConnectOptions::from_str(path_str)
        .map_err(|e| DatabaseError::Open(format!("invalid connection string: {e}")))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    if path_str != MEMORY_PATH {
        connect_options = connect_options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full);
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await
        .map_err(|e| DatabaseError::Open(format!("failed to open {path_str}: {e}")))?;

    tracing::info!("Database pool created at {}", path_str);
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_pool() {
        let pool = connect(":memory:").await.expect("open pool");
        let one: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&pool)
            .await
            .expect("query");
        assert_eq!(one, 1);
    }

    #[tokio::test]
    async fn test_file_pool_uses_wal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = connect(dir.path().join("test.db")).await.expect("open pool");
        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .expect("query");
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
