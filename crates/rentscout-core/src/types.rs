//! Identifier newtypes and the pipeline stage enum.

use crate::error::RentscoutError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Stable identifier of a listing on the source site.
///
/// IDs are opaque: ASCII alphanumerics, `_` or `-`, 1-64 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ListingId(String);

impl ListingId {
    /// Create a new `ListingId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID contains characters outside the allowed set.
    pub fn new(id: impl Into<String>) -> Result<Self, RentscoutError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), RentscoutError> {
        static ID_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex =
            ID_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid regex"));

        if regex.is_match(id) {
            Ok(())
        } else {
            Err(RentscoutError::Validation(format!(
                "invalid listing ID: expected 1-64 alphanumeric characters, got '{id}'"
            )))
        }
    }
}

impl TryFrom<String> for ListingId {
    type Error = RentscoutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ListingId> for String {
    fn from(id: ListingId) -> Self {
        id.0
    }
}

impl FromStr for ListingId {
    type Err = RentscoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One phase of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Identifier collection from search pages
    Collect,
    /// Detail extraction per listing
    Extract,
    /// Commute estimation and scoring
    Score,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 3] = [Stage::Collect, Stage::Extract, Stage::Score];

    /// Stable name used in persisted checkpoints.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Collect => "collect",
            Self::Extract => "extract",
            Self::Score => "score",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = RentscoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "collect" => Ok(Self::Collect),
            "extract" => Ok(Self::Extract),
            "score" => Ok(Self::Score),
            other => Err(RentscoutError::Validation(format!(
                "unknown stage '{other}', expected collect, extract or score"
            ))),
        }
    }
}
