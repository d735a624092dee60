//! Core error types for rentscout.
//!
//! `RentscoutError` is the crate-level error; `ConfigError` covers loading and
//! validating configuration, which must fail before any stage starts.

use thiserror::Error;

/// Central error type for core operations.
#[derive(Error, Debug)]
pub enum RentscoutError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors (invalid identifiers, malformed input)
    #[error("validation error: {0}")]
    Validation(String),

    /// Transit graph errors
    #[error("transit error: {0}")]
    Transit(#[from] rentscout_transit::TransitError),

    /// JSON (de)serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Explicitly requested config file does not exist
    #[error("config file not found at {path}")]
    NotFound {
        /// Path where config was expected
        path: String,
    },

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transit settings or station file rejected
    #[error("transit configuration error: {0}")]
    Transit(#[from] rentscout_transit::TransitError),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias using `RentscoutError`.
pub type Result<T> = std::result::Result<T, RentscoutError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RentscoutError::Validation("bad id".to_string());
        assert_eq!(err.to_string(), "validation error: bad id");

        let err = ConfigError::invalid("scoring.weights", "all weights are zero");
        assert_eq!(
            err.to_string(),
            "invalid config value for scoring.weights: all weights are zero"
        );
    }

    #[test]
    fn test_error_from_config() {
        let err: RentscoutError = ConfigError::NoConfigDir.into();
        assert!(matches!(err, RentscoutError::Config(_)));
    }
}
