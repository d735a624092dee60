//! Pipeline error types.
//!
//! Per-unit fetch failures are not errors at this level; the runner
//! classifies them and keeps going. A `PipelineError` means the batch itself
//! cannot continue, typically because storage failed.

use thiserror::Error;

/// Errors that abort a stage run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Record store or checkpoint write failed
    #[error("database error: {0}")]
    Database(#[from] rentscout_db::DatabaseError),

    /// Configuration rejected before the stage started
    #[error("configuration error: {0}")]
    Config(#[from] rentscout_core::ConfigError),

    /// Core validation error
    #[error(transparent)]
    Core(#[from] rentscout_core::RentscoutError),

    /// I/O error reading annotation files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
