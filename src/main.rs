use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info, warn};

use nutrition_etl::config::Config;
use nutrition_etl::logging;
use nutrition_etl::observability;
use nutrition_etl::pipeline::orchestrator::Pipeline;

#[derive(Parser)]
#[command(name = "nutrition_etl")]
#[command(about = "Restaurant nutrition ingest, translation and classification pipeline")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $NUTRITION_ETL_CONFIG, then config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write a Prometheus text snapshot of the run's metrics here on exit
    #[arg(long, global = true)]
    metrics_out: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the nutrition source into storage
    Ingest {
        /// Source file to read instead of the configured one
        #[arg(long)]
        source: Option<PathBuf>,
        /// Ingest even if this exact file was ingested before
        #[arg(long)]
        force: bool,
    },
    /// Add translated item names to every stored record
    Enrich,
    /// Cluster stored records and write a category per row
    Classify,
    /// Write item, translation and category to CSV
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Per-restaurant calorie and carbohydrate summary
    Stats,
    /// Ingest, enrich, classify and export in one go
    Run {
        /// Keep stored records instead of starting from empty storage
        #[arg(long)]
        keep_existing: bool,
    },
    /// Remove every stored record and the ingest history
    Reset,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn execute(pipeline: &Pipeline, command: Commands) -> Result<()> {
    match command {
        Commands::Ingest { source, force } => {
            let report = pipeline.ingest(source.as_deref(), force).await?;
            if report.skipped {
                eprintln!("⏭️  {} was already ingested, use --force to load it again", report.source_name);
            }
            print_json(&report)
        }
        Commands::Enrich => print_json(&pipeline.enrich().await?),
        Commands::Classify => print_json(&pipeline.classify().await?),
        Commands::Export { output } => print_json(&pipeline.export(output.as_deref()).await?),
        Commands::Stats => print_json(&pipeline.stats().await?),
        Commands::Run { keep_existing } => {
            let report = pipeline.run(keep_existing).await?;
            eprintln!("\n📊 Pipeline run {}:", report.run_id);
            eprintln!("   Ingested: {} kept, {} dropped", report.ingest.rows_kept, report.ingest.rows_dropped);
            eprintln!(
                "   Translated: {} ({} from the dictionary)",
                report.enrich.rows_translated, report.enrich.dictionary_hits
            );
            eprintln!(
                "   Classified: {} ({} excluded)",
                report.classify.rows_classified, report.classify.rows_excluded
            );
            eprintln!("   Output file: {}", report.export.path.display());
            print_json(&report)
        }
        Commands::Reset => {
            pipeline.reset().await?;
            eprintln!("🗑️  Storage cleared");
            Ok(())
        }
    }
}

fn write_metrics(path: &Path) -> Result<()> {
    match observability::render() {
        Some(snapshot) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, snapshot).with_context(|| format!("writing metrics to {}", path.display()))?;
            info!("Metrics snapshot written to {}", path.display());
        }
        None => warn!("Metrics recorder not installed, no snapshot written"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env may point NUTRITION_ETL_CONFIG somewhere else
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("loading configuration")?;

    let _guard = logging::init_logging(&config.logging.directory);

    if cli.metrics_out.is_some() {
        if let Err(e) = observability::init() {
            warn!("Metrics disabled: {}", e);
        }
    }

    let pipeline = Pipeline::from_config(config).context("setting up pipeline")?;
    let outcome = execute(&pipeline, cli.command).await;

    if let Some(path) = &cli.metrics_out {
        write_metrics(path)?;
    }

    if let Err(e) = &outcome {
        error!("{:#}", e);
    }
    outcome
}
