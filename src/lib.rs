//! povar - Concurrent recipe-site crawler
//!
//! A crawl-task scheduler that discovers recipe categories, fans each one out
//! into a fetch task, distributes the tasks across a bounded worker pool with
//! an outbound request-rate ceiling, deduplicates discovered items, retries
//! transient failures with a bounded budget and hands finished batches to a
//! durable sink.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`scheduler`] - Task controller, worker pool, rate limiter and retry
//!   handling
//! - [`fetcher`] - Listing-page fetching (the `PageFetcher` capability)
//! - [`cache`] - In-memory deduplication cache
//! - [`storage`] - Persistence sink and the asynchronous sink writer
//! - [`models`] - Core data structures and validation
//! - [`metrics`] - Prometheus counters
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use povar::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     config.validate()?;
//!
//!     let fetcher: Arc<dyn PageFetcher> =
//!         Arc::new(HttpFetcher::new(config.task_timeout())?);
//!     let store = Arc::new(SqliteStore::open(&config.database.path)?);
//!     store.create_tables().await?;
//!     let sink: Arc<dyn Sink> = store;
//!
//!     let mut controller = TaskController::new(
//!         fetcher,
//!         sink,
//!         Arc::new(DedupCache::new()),
//!         Arc::new(Metrics::new()?),
//!         config.worker.count,
//!         config.retry_interval(),
//!         config.worker.max_retries,
//!     );
//!
//!     controller.start(
//!         config.worker.max_items_per_task,
//!         config.worker.requests_per_second,
//!         config.task_timeout(),
//!     )?;
//!     controller.enqueue(Task::category_listing()).await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     controller.stop().await;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod models;
pub mod scheduler;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::DedupCache;
    pub use crate::config::Config;
    pub use crate::error::{Error, FetchError, Result, SchedulerError, StoreError, ValidationError};
    pub use crate::fetcher::{HttpFetcher, PageFetcher};
    pub use crate::metrics::Metrics;
    pub use crate::models::{Category, RawItem, Recipe};
    pub use crate::scheduler::{
        RateLimiter, StatsSnapshot, Task, TaskController, TaskKind, TaskOutput, TaskResult,
    };
    pub use crate::storage::{Sink, SinkWriter, SqliteStore};
}

// Direct re-exports for convenience
pub use models::{Category, Recipe};
pub use scheduler::TaskController;
