//! Rentscout Source
//!
//! [`ListingSource`](rentscout_core::ListingSource) implementation for
//! rent.591.com.tw. Search pages are walked page by page until one yields no
//! new IDs; listing pages are parsed into partial fields with HTML selectors
//! and text patterns. No JavaScript is executed.
//!
//! HTTP outcomes map onto [`FetchError`](rentscout_core::FetchError):
//! 404 and 410 are `NotFound`, other failures and timeouts are `Transient`,
//! and a page without listing data is `Parse`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod client;
pub mod error;
pub mod extract;
pub mod search;

pub use client::Rent591Source;
pub use error::{Result, SourceError};
pub use extract::extract_listing;
pub use search::{discover_ids, search_url};
