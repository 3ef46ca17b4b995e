use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use povar::cache::DedupCache;
use povar::config::Config;
use povar::fetcher::{HttpFetcher, PageFetcher};
use povar::metrics::Metrics;
use povar::scheduler::{Task, TaskController};
use povar::storage::{Sink, SqliteStore};

#[derive(Parser)]
#[command(
    name = "povar",
    version,
    about = "Concurrent recipe-site crawler with a bounded worker pool",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the crawl scheduler until interrupted
    Run {
        /// Path to the TOML configuration file
        #[arg(short, long, default_value = "config/povar.toml")]
        config: PathBuf,
    },

    /// Create the database schema
    InitDb {
        /// Path to the TOML configuration file
        #[arg(short, long, default_value = "config/povar.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    match cli.command {
        Commands::Run { config } => {
            tracing::info!(config = %config.display(), "Starting run command");
            run(&config).await?;
        }

        Commands::InitDb { config } => {
            tracing::info!(config = %config.display(), "Starting init-db command");
            init_db(&config).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("povar=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("povar=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

/// Load configuration from the given file, falling back to the environment
/// when the file does not exist
fn load_config(path: &PathBuf) -> Result<Config> {
    let config = if path.exists() {
        Config::from_file(path)?
    } else {
        tracing::warn!(
            config = %path.display(),
            "Config file not found, using environment and defaults"
        );
        Config::from_env()?
    };

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn run(config_path: &PathBuf) -> Result<()> {
    let config = load_config(config_path)?;

    let metrics = Arc::new(Metrics::new().context("Failed to register metrics")?);

    let fetcher: Arc<dyn PageFetcher> = Arc::new(
        HttpFetcher::with_base_url(&config.source.base_url, config.task_timeout())
            .context("Failed to create page fetcher")?,
    );

    let store = Arc::new(
        SqliteStore::open(&config.database.path).context("Failed to open SQLite store")?,
    );
    store
        .create_tables()
        .await
        .context("Failed to prepare database schema")?;
    let sink: Arc<dyn Sink> = Arc::clone(&store) as Arc<dyn Sink>;

    let mut controller = TaskController::new(
        fetcher,
        sink,
        Arc::new(DedupCache::new()),
        Arc::clone(&metrics),
        config.worker.count,
        config.retry_interval(),
        config.worker.max_retries,
    );

    controller.start(
        config.worker.max_items_per_task,
        config.worker.requests_per_second,
        config.task_timeout(),
    )?;

    controller.enqueue(Task::category_listing()).await?;
    tracing::info!("Crawl started, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    controller.stop().await;

    let stats = controller.stats();
    tracing::info!(
        tasks_submitted = stats.tasks_submitted,
        tasks_completed = stats.tasks_completed,
        tasks_retried = stats.tasks_retried,
        tasks_failed = stats.tasks_failed,
        items_discovered = stats.items_discovered,
        categories_stored = store.category_count().await.unwrap_or(0),
        recipes_stored = store.recipe_count().await.unwrap_or(0),
        "Crawl finished"
    );

    if let Ok(exposition) = metrics.gather() {
        tracing::debug!(metrics = %exposition, "Final metrics");
    }

    Ok(())
}

async fn init_db(config_path: &PathBuf) -> Result<()> {
    let config = load_config(config_path)?;

    let store =
        SqliteStore::open(&config.database.path).context("Failed to open SQLite store")?;
    store
        .create_tables()
        .await
        .context("Failed to create tables")?;

    tracing::info!(path = %config.database.path.display(), "Tables created");
    Ok(())
}
