//! Transit error types.

use thiserror::Error;

/// Errors raised while loading or validating the station graph.
#[derive(Debug, Error)]
pub enum TransitError {
    /// Station file could not be read.
    #[error("I/O error reading station file: {0}")]
    Io(#[from] std::io::Error),

    /// Station file is not valid TOML.
    #[error("failed to parse station file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The graph has no stations.
    #[error("station graph is empty")]
    EmptyGraph,

    /// Two stations normalise to the same name.
    #[error("duplicate station: {0}")]
    DuplicateStation(String),

    /// A referenced station is not part of the graph.
    #[error("unknown station: {0}")]
    UnknownStation(String),

    /// A speed or distance setting is unusable.
    #[error("invalid transit setting {field}: {reason}")]
    InvalidSetting {
        /// Setting name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias for transit operations.
pub type Result<T> = std::result::Result<T, TransitError>;
