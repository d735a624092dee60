//! The three batch stages.
//!
//! - [`CollectWorker`]: one unit per district, discovers listing IDs
//! - [`ExtractWorker`]: one unit per listing, fetches details and costs
//! - [`ScoreWorker`]: one unit per extracted listing, commute and score

mod collect;
mod extract;
mod score;

pub use collect::CollectWorker;
pub use extract::{extract_units, ExtractWorker};
pub use score::{score_units, ScoreWorker};

use rentscout_core::{FetchError, ListingId};

fn parse_unit_id(unit: &str) -> Result<ListingId, FetchError> {
    ListingId::new(unit).map_err(|e| FetchError::Parse(e.to_string()))
}
