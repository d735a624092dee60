//! Rentscout Database Layer
//!
//! `SQLite` persistence for the pipeline: the listing record store, the
//! per-stage checkpoint tracker and the failure ledger. All three survive
//! process restarts; every write is committed before the call returns.
//!
//! # Example
//!
//! ```ignore
//! use rentscout_db::{Database, listings};
//!
//! let db = Database::new("rentscout.db").await?;
//! db.run_migrations().await?;
//! listings::upsert(db.pool(), &id, &fields).await?;
//! ```
//!
//! # Tables
//!
//! - `listings` - one JSON field set per listing ID, in discovery order
//! - `checkpoints` - finished units per stage, with done/skipped outcome
//! - `unit_failures` - failed runs per unit, for persistent-failure reports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod checkpoints;
pub mod connection;
pub mod error;
pub mod failures;
pub mod listings;
pub mod migrations;

// Re-export commonly used types
pub use checkpoints::{Checkpoint, CheckpointCounts, CheckpointSet, Outcome};
pub use error::{DatabaseError, Result};
pub use failures::FailureRecord;

use rentscout_core::Stage;
use sqlx::{Pool, Sqlite};
use std::path::Path;

/// High-level database handle.
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open the database at `path` (or `:memory:` for in-memory).
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let pool = connection::connect(path).await?;
        Ok(Self { pool })
    }

    /// Open the database and bring its schema up to date.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Self::new(path).await?;
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run all pending database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Get the current schema version.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(&self.pool).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Checkpoints of one stage.
    #[must_use]
    pub fn checkpoints(&self, stage: Stage) -> CheckpointSet {
        CheckpointSet::new(self.pool.clone(), stage)
    }

    /// Close the database connection gracefully.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::debug!("Database pool closed");
    }
}
