//! Checkpointed, bounded-retry work loop shared by every stage.
//!
//! Per unit the runner moves through PENDING, IN_PROGRESS and then one of
//! DONE, SKIPPED or FAILED:
//!
//! - DONE: records are upserted, then the checkpoint is written.
//! - SKIPPED: the source reports no data; the unit is checkpointed with a
//!   note and never retried.
//! - FAILED: transient failures exhausted the retry budget; no checkpoint is
//!   written, so the unit stays pending for the next run.
//!
//! Records are always written before the checkpoint. A crash between the two
//! re-processes the unit on the next run, which the idempotent upsert absorbs.

use crate::error::Result;
use crate::pacing::{sleep_or_cancel, Pacer};
use crate::worker::{StageWorker, UnitOutput};
use rentscout_core::{FetchError, PipelineConfig, Stage};
use rentscout_db::{failures, listings, Database, Outcome};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Retry and pacing policy of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPolicy {
    /// Minimum spacing between units
    pub request_delay: Duration,
    /// Retries after the first transient failure of a unit
    pub max_retries: u32,
    /// Base retry delay; retry `n` waits `n` times this
    pub retry_delay: Duration,
    /// Failed runs after which a unit is reported as persistent
    pub persistent_failure_threshold: u32,
}

impl From<&PipelineConfig> for RunPolicy {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            request_delay: Duration::from_secs_f64(config.request_delay_secs.max(0.0)),
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            persistent_failure_threshold: config.persistent_failure_threshold,
        }
    }
}

/// Counts reported at the end of a stage run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageSummary {
    /// Stage that ran
    pub stage: Stage,
    /// Units handed to the runner
    pub total: usize,
    /// Units not yet checkpointed when the run started
    pub pending: usize,
    /// Units finished with records written
    pub done: usize,
    /// Units finished without data
    pub skipped: usize,
    /// Units left pending after exhausting retries
    pub failed: usize,
    /// Units that have failed at least the persistent threshold of runs
    pub persistent_failures: Vec<String>,
    /// The run stopped early on cancellation
    pub interrupted: bool,
}

impl StageSummary {
    fn new(stage: Stage, total: usize, pending: usize) -> Self {
        Self {
            stage,
            total,
            pending,
            done: 0,
            skipped: 0,
            failed: 0,
            persistent_failures: Vec::new(),
            interrupted: false,
        }
    }

    /// Units still pending after this run.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending - self.done - self.skipped
    }
}

impl fmt::Display for StageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} done, {} skipped, {} failed, {} remaining ({} already complete)",
            self.stage,
            self.done,
            self.skipped,
            self.failed,
            self.remaining(),
            self.total - self.pending,
        )?;
        if self.interrupted {
            write!(f, " [interrupted]")?;
        }
        Ok(())
    }
}

enum Attempt {
    Output(UnitOutput),
    Permanent(FetchError),
    Exhausted(FetchError),
    Interrupted(FetchError),
}

/// Drives a [`StageWorker`] over its pending units.
#[derive(Debug, Clone)]
pub struct StageRunner {
    db: Database,
    policy: RunPolicy,
}

impl StageRunner {
    /// Runner using the configured pipeline policy.
    #[must_use]
    pub fn new(db: Database, config: &PipelineConfig) -> Self {
        Self::with_policy(db, RunPolicy::from(config))
    }

    /// Runner with an explicit policy.
    #[must_use]
    pub fn with_policy(db: Database, policy: RunPolicy) -> Self {
        Self { db, policy }
    }

    /// Policy in effect.
    #[must_use]
    pub fn policy(&self) -> RunPolicy {
        self.policy
    }

    /// Process every unit of `units` that the worker's stage has not yet
    /// checkpointed, one at a time and in order.
    ///
    /// Cancellation is observed between units and during waits; an in-flight
    /// unit always finishes its writes first.
    ///
    /// # Errors
    /// Only storage failures abort the run. Per-unit failures are counted in
    /// the returned summary.
    pub async fn run(
        &self,
        worker: &dyn StageWorker,
        units: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<StageSummary> {
        let stage = worker.stage();
        let checkpoints = self.db.checkpoints(stage);

        let mut seen = HashSet::new();
        let units: Vec<String> = units.into_iter().filter(|u| seen.insert(u.clone())).collect();
        let pending = checkpoints.pending(&units).await?;
        let mut summary = StageSummary::new(stage, units.len(), pending.len());

        info!(
            stage = %stage,
            total = units.len(),
            pending = pending.len(),
            "Starting stage"
        );

        let mut pacer = Pacer::new(self.policy.request_delay);
        for unit in &pending {
            if cancel.is_cancelled() || !pacer.wait(cancel).await {
                summary.interrupted = true;
                break;
            }

            debug!(stage = %stage, unit = %unit, "Processing unit");
            match self.process_with_retry(worker, unit, cancel).await {
                Attempt::Output(output) => {
                    listings::upsert_many(self.db.pool(), &output.records).await?;
                    checkpoints.mark_done(unit, Outcome::Done, None).await?;
                    failures::clear(self.db.pool(), stage, unit).await?;
                    summary.done += 1;
                    debug!(
                        stage = %stage,
                        unit = %unit,
                        records = output.records.len(),
                        "Unit done"
                    );
                }
                Attempt::Permanent(e) => {
                    if let Some((id, patch)) = worker.skip_patch(unit, &e) {
                        listings::upsert(self.db.pool(), &id, &patch).await?;
                    }
                    let note = skip_note(&e);
                    checkpoints
                        .mark_done(unit, Outcome::Skipped, Some(&note))
                        .await?;
                    failures::clear(self.db.pool(), stage, unit).await?;
                    summary.skipped += 1;
                    debug!(stage = %stage, unit = %unit, note = %note, "Unit skipped");
                }
                Attempt::Exhausted(e) => {
                    self.record_failure(stage, unit, &e, &mut summary).await?;
                }
                Attempt::Interrupted(e) => {
                    self.record_failure(stage, unit, &e, &mut summary).await?;
                    summary.interrupted = true;
                    break;
                }
            }
        }

        if summary.interrupted {
            warn!(stage = %stage, "Stage interrupted; remaining units stay pending");
        }
        info!(
            stage = %stage,
            done = summary.done,
            skipped = summary.skipped,
            failed = summary.failed,
            remaining = summary.remaining(),
            persistent = summary.persistent_failures.len(),
            "Stage finished"
        );
        Ok(summary)
    }

    async fn process_with_retry(
        &self,
        worker: &dyn StageWorker,
        unit: &str,
        cancel: &CancellationToken,
    ) -> Attempt {
        let attempts = self.policy.max_retries + 1;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match worker.process(unit).await {
                Ok(output) => return Attempt::Output(output),
                Err(e) if !e.is_retryable() => return Attempt::Permanent(e),
                Err(e) if attempt >= attempts => return Attempt::Exhausted(e),
                Err(e) => {
                    let delay = self.policy.retry_delay * attempt;
                    warn!(
                        stage = %worker.stage(),
                        unit = %unit,
                        error = %e,
                        "Unit failed (attempt {}/{}), retrying in {:?}...",
                        attempt,
                        attempts,
                        delay
                    );
                    if !sleep_or_cancel(delay, cancel).await {
                        return Attempt::Interrupted(e);
                    }
                }
            }
        }
    }

    async fn record_failure(
        &self,
        stage: Stage,
        unit: &str,
        error: &FetchError,
        summary: &mut StageSummary,
    ) -> Result<()> {
        let runs =
            failures::record_failure(self.db.pool(), stage, unit, &error.to_string()).await?;
        summary.failed += 1;
        if runs >= self.policy.persistent_failure_threshold {
            error!(
                stage = %stage,
                unit = %unit,
                runs,
                error = %error,
                "Unit is failing persistently"
            );
            summary.persistent_failures.push(unit.to_string());
        } else {
            warn!(stage = %stage, unit = %unit, runs, error = %error, "Unit failed; left pending");
        }
        Ok(())
    }
}

fn skip_note(error: &FetchError) -> String {
    match error {
        FetchError::NotFound(msg) => format!("removed: {msg}"),
        FetchError::Parse(msg) => format!("malformed: {msg}"),
        FetchError::Transient(msg) => format!("transient: {msg}"),
    }
}
