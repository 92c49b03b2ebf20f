//! Catalog Fanout CLI
//!
//! Local execution entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use catalog_fanout::{
    config::load_config,
    error::Result,
    models::Catalog,
    pipeline,
    services::{ChangeFeed, LineFeed},
    storage::LocalStorage,
    utils::log::parse_level,
};
use clap::{Parser, Subcommand};

/// Catalog Fanout - course catalog change notifier
#[derive(Parser, Debug)]
#[command(
    name = "catalog-fanout",
    version,
    about = "Diff course catalog snapshots and push one notification per changed section"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the changed subtrees between two snapshots
    Diff {
        /// Previous snapshot (JSON)
        #[arg(long)]
        old: PathBuf,

        /// Current snapshot (JSON)
        #[arg(long)]
        new: PathBuf,

        /// Print one change event per line instead of the pruned catalog
        #[arg(long)]
        events: bool,
    },

    /// Diff a snapshot against the stored one and store it
    Ingest {
        /// Freshly scraped snapshot (JSON)
        #[arg(long)]
        snapshot: PathBuf,

        /// Directory holding stored snapshots
        #[arg(long, default_value = "storage")]
        storage_dir: PathBuf,
    },

    /// Deliver change events read as JSON lines
    Dispatch {
        /// Input file, or `-` for stdin
        #[arg(long, default_value = "-")]
        input: String,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
#[cfg(not(feature = "json-logs"))]
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Initialize JSON logging; `log` records are bridged into `tracing`.
#[cfg(feature = "json-logs")]
fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_fatal() => {
            log::error!("Fatal: {}", e);
            ExitCode::from(2)
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Diff { old, new, events } => {
            let old = load_snapshot(&old)?;
            let new = load_snapshot(&new)?;
            let filtered = pipeline::diff(&old, &new);
            let summary = pipeline::DiffSummary::of(&filtered);
            log::info!(
                "{} subjects, {} courses, {} sections changed",
                summary.subjects,
                summary.courses,
                summary.sections
            );

            if events {
                for event in pipeline::events_from_diff(&filtered) {
                    println!("{}", serde_json::to_string(&event)?);
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&filtered)?);
            }
        }

        Command::Ingest {
            snapshot,
            storage_dir,
        } => {
            let storage = LocalStorage::new(&storage_dir);
            let snapshot = Catalog::load(&snapshot)?;
            let report = pipeline::run_ingest(&storage, snapshot).await?;
            for event in &report.events {
                println!("{}", serde_json::to_string(event)?);
            }
        }

        Command::Dispatch { input } => {
            let config = load_config(&cli.config)?;
            apply_level(&config.logging.level, cli.verbose);

            let mut feed: Box<dyn ChangeFeed> = if input == "-" {
                Box::new(LineFeed::stdin())
            } else {
                Box::new(LineFeed::open(&input).await?)
            };
            pipeline::run_dispatch(&config, feed.as_mut()).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            let config = load_config(&cli.config)?;
            log::info!(
                "✓ Config OK (pool size {}, {} attempts, dry run: {})",
                config.dispatch.pool_size,
                config.notifier.max_attempts,
                config.notifier.dry_run
            );
        }
    }

    Ok(())
}

fn load_snapshot(path: &Path) -> Result<Catalog> {
    let mut catalog = Catalog::load(path)?;
    catalog.normalize();
    Ok(catalog)
}

/// Apply the configured level unless `--verbose` asked for more.
fn apply_level(level: &str, verbose: bool) {
    if !verbose {
        log::set_max_level(parse_level(level).min(log::max_level()));
    }
}
