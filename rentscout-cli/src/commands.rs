//! Command implementations.

use anyhow::{bail, Context, Result};
use rentscout_core::{AppConfig, ListingSource, Stage};
use rentscout_db::{checkpoints, failures, listings, Database};
use rentscout_export::{export_configured, ExportRow};
use rentscout_pipeline::{
    extract_units, import_annotations, ranked, score_units, top, CollectWorker, ExtractWorker,
    ScoreWorker, StageRunner, StageSummary,
};
use rentscout_source::Rent591Source;
use rentscout_transit::StationGraph;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Write the default configuration unless one already exists.
pub fn init_config(path: Option<&Path>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => AppConfig::config_path()?,
    };
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    AppConfig::default()
        .save_to(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

/// Loaded configuration plus an open database.
pub struct App {
    config_path: Option<PathBuf>,
    config: AppConfig,
    graph: Arc<StationGraph>,
    db: Database,
    cancel: CancellationToken,
}

impl App {
    /// Load and validate the configuration, then open the database.
    ///
    /// Validation happens before any stage can run.
    pub async fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = AppConfig::load_with_env(config_path).context("Failed to load configuration")?;
        let graph = config.station_graph().context("Failed to build station graph")?;
        config.validate(&graph).context("Invalid configuration")?;

        let data_dir = config.data_dir()?;
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        let db_path = config.database_path()?;
        let db = Database::open(&db_path)
            .await
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;
        info!(path = %db_path.display(), stations = graph.len(), "Database ready");

        Ok(Self {
            config_path: config_path.map(Path::to_path_buf),
            config,
            graph: Arc::new(graph),
            db,
            cancel: interrupt_token(),
        })
    }

    /// Explicit config path given on the command line.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    fn runner(&self) -> StageRunner {
        StageRunner::new(self.db.clone(), &self.config.pipeline)
    }

    fn source(&self) -> Result<Arc<dyn ListingSource>> {
        let source = Rent591Source::new(&self.config.source).context("Failed to build HTTP client")?;
        Ok(Arc::new(source))
    }

    /// Stage 1: discover listing IDs.
    pub async fn collect(&self) -> Result<StageSummary> {
        let worker = CollectWorker::new(self.source()?, self.config.search.clone());
        let units = worker.units();
        let summary = self.runner().run(&worker, units, &self.cancel).await?;
        report(&summary);
        Ok(summary)
    }

    /// Stage 2: fetch listing details.
    pub async fn extract(&self) -> Result<StageSummary> {
        let worker = ExtractWorker::new(self.source()?, self.config.costs.clone());
        let units = extract_units(&self.db).await?;
        let summary = self.runner().run(&worker, units, &self.cancel).await?;
        report(&summary);
        Ok(summary)
    }

    /// Stage 3: commute estimate and score.
    pub async fn score(&self) -> Result<StageSummary> {
        let worker = ScoreWorker::new(
            self.db.clone(),
            Arc::clone(&self.graph),
            self.config.reference.location()?,
            self.config.scoring.clone(),
        );
        let units = score_units(&self.db).await?;
        let summary = self.runner().run(&worker, units, &self.cancel).await?;
        report(&summary);
        Ok(summary)
    }

    /// All three stages in order, then export. Stops after an interrupted
    /// stage so the next invocation resumes where this one left off.
    pub async fn run_all(&self) -> Result<()> {
        if stopped(&self.collect().await?)
            || stopped(&self.extract().await?)
            || stopped(&self.score().await?)
        {
            return Ok(());
        }
        self.export().await
    }

    /// Write ranked listings in every enabled format.
    pub async fn export(&self) -> Result<()> {
        let records = ranked(&self.db).await?;
        let rows = ExportRow::from_ranked(&records, &self.config.costs);
        let dir = self.config.output_dir()?;
        let written = export_configured(&self.config.export, &dir, &rows)
            .with_context(|| format!("Failed to export to {}", dir.display()))?;
        for path in written {
            println!("Wrote {} listings to {}", rows.len(), path.display());
        }
        Ok(())
    }

    /// Print the `n` best listings.
    pub async fn top(&self, n: usize) -> Result<()> {
        let records = top(&self.db, n).await?;
        if records.is_empty() {
            println!("No scored listings yet. Run `rentscout score` first.");
            return Ok(());
        }

        println!(
            "{:>4}  {:>9}  {:>6}  {:>8}  {:>7}  {:<10}  title",
            "rank", "id", "score", "commute", "rent", "district"
        );
        for (rank, record) in records.iter().enumerate() {
            let f = &record.fields;
            println!(
                "{:>4}  {:>9}  {:>6}  {:>8}  {:>7}  {:<10}  {}",
                rank + 1,
                record.id.to_string(),
                record.composite().map_or_else(|| "-".to_string(), |s| format!("{s:.1}")),
                f.commute_minutes()
                    .map_or_else(|| "?".to_string(), |m| format!("{m:.0} min")),
                f.base_rent.map_or_else(|| "?".to_string(), |r| r.to_string()),
                f.district.as_deref().unwrap_or("?"),
                f.title.as_deref().unwrap_or(""),
            );
        }
        Ok(())
    }

    /// Print counts for every stage.
    pub async fn status(&self) -> Result<()> {
        let pool = self.db.pool();
        println!("listings: {}", listings::count(pool).await?);

        let threshold = self.config.pipeline.persistent_failure_threshold;
        for stage in Stage::ALL {
            let counts = checkpoints::count(pool, stage).await?;
            let failed = failures::all(pool, stage).await?;
            let persistent = failures::persistent(pool, stage, threshold).await?;
            println!(
                "{:<8} {} done, {} skipped, {} failing ({} persistent)",
                stage.as_str(),
                counts.done,
                counts.skipped,
                failed.len(),
                persistent.len()
            );
            for record in persistent {
                println!(
                    "  {} failed {} runs: {}",
                    record.unit, record.attempts, record.last_error
                );
            }
        }
        Ok(())
    }

    /// Forget one stage's checkpoints so its units run again.
    pub async fn reset(&self, stage: Stage) -> Result<()> {
        let pool = self.db.pool();
        let cleared = checkpoints::reset(pool, stage).await?;
        failures::clear_stage(pool, stage).await?;
        info!(stage = %stage, cleared, "Reset stage");
        println!("Cleared {cleared} {stage} checkpoints");
        Ok(())
    }

    /// Merge annotation files from `dir`.
    pub async fn import_annotations(&self, dir: &Path) -> Result<()> {
        let summary = import_annotations(&self.db, dir)
            .await
            .with_context(|| format!("Failed to import annotations from {}", dir.display()))?;
        println!(
            "Imported {} annotation files ({} unknown listings, {} invalid)",
            summary.imported, summary.unknown, summary.invalid
        );
        Ok(())
    }

    /// Close the database.
    pub async fn close(self) {
        self.db.close().await;
    }
}

fn stopped(summary: &StageSummary) -> bool {
    if summary.interrupted {
        warn!(stage = %summary.stage, "Interrupted; rerun to resume");
    }
    summary.interrupted
}

fn report(summary: &StageSummary) {
    println!("{summary}");
    if !summary.persistent_failures.is_empty() {
        println!(
            "Persistent failures ({}): {}",
            summary.persistent_failures.len(),
            summary.persistent_failures.join(", ")
        );
    }
}

/// Token cancelled on Ctrl-C. The unit in flight finishes its writes first.
fn interrupt_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing the current unit");
            token.cancel();
        }
    });
    cancel
}
