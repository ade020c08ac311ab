use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use agentpulse::config::Config;

mod cli;

#[derive(Parser)]
#[command(name = "agentpulse")]
#[command(about = "Track agent runs and materialize per-version metrics for a dashboard")]
#[command(version)]
struct Cli {
    /// Path to the metrics database (defaults to ~/.agentpulse/metrics.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one aggregation pass over all agent versions
    Aggregate {
        /// Worker pool size (overrides config)
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Print the four dashboard stat cards as JSON
    Dashboard,

    /// Print the materialized per-version metrics as JSON
    Fleet,

    /// Print the most recent runs as JSON
    Activity {
        /// Number of entries to show
        #[arg(long, short = 'n', default_value_t = 10)]
        limit: usize,
    },

    /// Insert deterministic demo agents, versions, and runs
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config = Config::load()?;
    let db_path = cli.db.unwrap_or_else(|| config.db_path());

    match cli.command {
        Commands::Aggregate { workers } => {
            let workers = workers.unwrap_or(config.worker_count);
            cli::aggregate::aggregate_command(&db_path, workers).await?;
        }
        Commands::Dashboard => {
            cli::dashboard::dashboard_command(&db_path).await?;
        }
        Commands::Fleet => {
            cli::fleet::fleet_command(&db_path).await?;
        }
        Commands::Activity { limit } => {
            cli::activity::activity_command(&db_path, limit).await?;
        }
        Commands::Seed => {
            cli::seed::seed_command(&db_path).await?;
        }
    }

    Ok(())
}
