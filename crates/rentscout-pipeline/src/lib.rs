//! Rentscout Pipeline
//!
//! The resumable three-stage batch: collect listing IDs per district,
//! extract listing details, then estimate commutes and score. Stages run as
//! independent invocations and communicate only through the record store
//! and checkpoint tracker in `rentscout-db`.
//!
//! # Example
//!
//! ```ignore
//! use rentscout_pipeline::{ExtractWorker, StageRunner, extract_units};
//!
//! let runner = StageRunner::new(db.clone(), &config.pipeline);
//! let worker = ExtractWorker::new(source, config.costs.clone());
//! let summary = runner.run(&worker, extract_units(&db).await?, &cancel).await?;
//! println!("{summary}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod annotations;
pub mod error;
pub mod pacing;
pub mod ranking;
pub mod runner;
pub mod stages;
pub mod worker;

pub use annotations::{import_annotations, ImportSummary};
pub use error::{PipelineError, Result};
pub use ranking::{rank, ranked, top};
pub use runner::{RunPolicy, StageRunner, StageSummary};
pub use stages::{extract_units, score_units, CollectWorker, ExtractWorker, ScoreWorker};
pub use worker::{StageWorker, UnitOutput};
