//! `rentscout` command line.
//!
//! Usage:
//!   rentscout run                      # collect, extract, score, export
//!   rentscout collect | extract | score
//!   rentscout top --n 10
//!   rentscout reset score              # re-score after changing weights

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rentscout_core::Stage;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "rentscout")]
#[command(about = "Collect, score and rank rental listings", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.config/rentscout/config.toml)
    #[arg(long, global = true, env = "RENTSCOUT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover listing IDs for every configured district
    Collect,
    /// Fetch details for discovered listings
    Extract,
    /// Estimate commutes and score extracted listings
    Score,
    /// Run all three stages, then export
    Run,
    /// Export ranked listings in the configured formats
    Export,
    /// Print the best listings by composite score
    Top {
        /// Number of listings to show
        #[arg(short, long, default_value_t = 10)]
        n: usize,
    },
    /// Show record, checkpoint and failure counts
    Status,
    /// Clear one stage's checkpoints and failure history
    Reset {
        /// Stage to reset (collect, extract or score)
        stage: Stage,
    },
    /// Merge `<id>.json` annotation files into stored listings
    ImportAnnotations {
        /// Directory containing the annotation files
        dir: PathBuf,
    },
    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,rentscout=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

async fn dispatch(app: &commands::App, command: Commands) -> Result<()> {
    match command {
        Commands::Collect => app.collect().await.map(drop),
        Commands::Extract => app.extract().await.map(drop),
        Commands::Score => app.score().await.map(drop),
        Commands::Run => app.run_all().await,
        Commands::Export => app.export().await,
        Commands::Top { n } => app.top(n).await,
        Commands::Status => app.status().await,
        Commands::Reset { stage } => app.reset(stage).await,
        Commands::ImportAnnotations { dir } => app.import_annotations(&dir).await,
        Commands::InitConfig { force } => commands::init_config(app.config_path(), force),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if let Commands::InitConfig { force } = cli.command {
        return commands::init_config(cli.config.as_deref(), force);
    }

    let app = commands::App::load(cli.config.as_deref()).await?;
    let result = dispatch(&app, cli.command).await;
    app.close().await;
    result
}
