//! The listing-source capability.
//!
//! Fetching and parsing pages lives outside the core. Pipeline stages only
//! see this trait, so tests can swap in a deterministic fake.

use crate::config::SearchConfig;
use crate::district::District;
use crate::listing::ListingFields;
use crate::types::ListingId;
use async_trait::async_trait;
use thiserror::Error;

/// Typed failure of a fetch or parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The listing no longer exists on the source
    #[error("not found: {0}")]
    NotFound(String),

    /// Network, timeout or rate-limit class failure; worth retrying
    #[error("transient error: {0}")]
    Transient(String),

    /// Page fetched but its content could not be understood
    #[error("parse error: {0}")]
    Parse(String),
}

impl FetchError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// A site listings are collected from.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Collect every listing ID in one district, following pagination.
    ///
    /// # Errors
    /// Returns `FetchError::Transient` if a search page cannot be loaded.
    async fn search(
        &self,
        district: &District,
        filters: &SearchConfig,
    ) -> Result<Vec<ListingId>, FetchError>;

    /// Fetch and parse one listing into partial fields.
    ///
    /// # Errors
    /// Returns the classified failure of the fetch or parse.
    async fn fetch(&self, id: &ListingId) -> Result<ListingFields, FetchError>;

    /// Canonical page URL of a listing.
    fn listing_url(&self, id: &ListingId) -> String;
}
