//! Source setup errors.

use thiserror::Error;

/// Errors setting up the listing source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Result type alias for source setup.
pub type Result<T> = std::result::Result<T, SourceError>;
