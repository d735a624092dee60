//! The stage-specific work a runner drives.

use async_trait::async_trait;
use rentscout_core::{FetchError, ListingFields, ListingId, Stage};

/// Records produced by one successfully processed unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitOutput {
    /// Partial fields to merge, per listing
    pub records: Vec<(ListingId, ListingFields)>,
}

impl UnitOutput {
    /// Output touching a single listing.
    #[must_use]
    pub fn single(id: ListingId, fields: ListingFields) -> Self {
        Self {
            records: vec![(id, fields)],
        }
    }
}

/// One stage's processing of a single unit.
///
/// `process` is the only step that talks to the outside world. It must not
/// write to the record store itself; the runner persists the returned output
/// before checkpointing the unit.
#[async_trait]
pub trait StageWorker: Send + Sync {
    /// Stage this worker implements.
    fn stage(&self) -> Stage;

    /// Process one unit.
    ///
    /// # Errors
    /// Returns the classified failure; `Transient` is retried, `NotFound` and
    /// `Parse` finish the unit as skipped.
    async fn process(&self, unit: &str) -> Result<UnitOutput, FetchError>;

    /// Fields recorded when `unit` is skipped, so later stages can tell a
    /// skipped listing from a processed one.
    fn skip_patch(&self, _unit: &str, _error: &FetchError) -> Option<(ListingId, ListingFields)> {
        None
    }
}
