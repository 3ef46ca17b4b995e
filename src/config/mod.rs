//! Configuration management for the povar crawler
//!
//! Configuration is loaded from a TOML file or from `POVAR_*` environment
//! variables, then validated before any component is constructed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Crawl source configuration
    pub source: SourceConfig,

    /// Worker pool and scheduling configuration
    pub worker: WorkerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Crawl source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Root URL all listing hrefs are joined against
    pub base_url: String,
}

/// Worker pool and scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of parallel workers in the pool
    pub count: usize,

    /// Items kept per task before the rest of the batch is dropped
    pub max_items_per_task: usize,

    /// Outbound request-rate ceiling (token-bucket rate and burst)
    pub requests_per_second: u32,

    /// Per-task fetch deadline in seconds
    pub task_timeout_secs: u64,

    /// Fixed delay between a failure and its retry, in seconds
    pub retry_interval_secs: u64,

    /// Retry budget per task; a task is attempted at most `max_retries + 1`
    /// times
    pub max_retries: u32,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let base = Self::default();

        let base_url = std::env::var("POVAR_BASE_URL").unwrap_or(base.source.base_url);

        let count = std::env::var("POVAR_WORKER_COUNT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(base.worker.count);

        let max_items_per_task = std::env::var("POVAR_MAX_ITEMS_PER_TASK")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(base.worker.max_items_per_task);

        let requests_per_second = std::env::var("POVAR_REQUESTS_PER_SECOND")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(base.worker.requests_per_second);

        let task_timeout_secs = std::env::var("POVAR_TASK_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(base.worker.task_timeout_secs);

        let retry_interval_secs = std::env::var("POVAR_RETRY_INTERVAL")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(base.worker.retry_interval_secs);

        let max_retries = std::env::var("POVAR_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(base.worker.max_retries);

        let database_path = std::env::var("POVAR_SQLITE_PATH")
            .map(PathBuf::from)
            .unwrap_or(base.database.path);

        let level = std::env::var("POVAR_LOG_LEVEL").unwrap_or(base.logging.level);
        let format = std::env::var("POVAR_LOG_FORMAT").unwrap_or(base.logging.format);

        Ok(Self {
            source: SourceConfig { base_url },
            worker: WorkerConfig {
                count,
                max_items_per_task,
                requests_per_second,
                task_timeout_secs,
                retry_interval_secs,
                max_retries,
            },
            database: DatabaseConfig {
                path: database_path,
            },
            logging: LoggingConfig { level, format },
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.source.base_url.is_empty() {
            anyhow::bail!("base_url must not be empty");
        }

        if self.worker.count == 0 {
            anyhow::bail!("worker count must be greater than 0");
        }

        if self.worker.max_items_per_task == 0 {
            anyhow::bail!("max_items_per_task must be greater than 0");
        }

        if self.worker.requests_per_second == 0 {
            anyhow::bail!("requests_per_second must be greater than 0");
        }

        if self.worker.task_timeout_secs == 0 {
            anyhow::bail!("task_timeout_secs must be greater than 0");
        }

        Ok(())
    }

    /// Get the per-task fetch deadline as a Duration
    #[must_use]
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.worker.task_timeout_secs)
    }

    /// Get the retry delay as a Duration
    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.worker.retry_interval_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                base_url: String::from("https://eda.ru"),
            },
            worker: WorkerConfig {
                count: 5,
                max_items_per_task: 10,
                requests_per_second: 5,
                task_timeout_secs: 10,
                retry_interval_secs: 2,
                max_retries: 3,
            },
            database: DatabaseConfig {
                path: PathBuf::from("data/povar.db"),
            },
            logging: LoggingConfig {
                level: String::from("info"),
                format: String::from("text"),
            },
        }
    }
}
