//! Fixed-size worker pool executing crawl tasks
//!
//! All workers read from one shared task channel (each task is delivered to
//! exactly one worker) and write to one shared result channel. A worker
//! never exits because a single task failed: failures are signalled to the
//! controller's retry handler and the worker moves on. Workers run until the
//! task channel is closed and drained.
//!
//! Per-task algorithm:
//! 1. Recipe tasks acquire a rate-limiter token before touching the fetcher,
//!    bounding the outbound request rate regardless of pool size.
//! 2. The fetch is bounded by the configured per-task timeout.
//! 3. Raw items are normalized, validated (invalid ones dropped and logged),
//!    deduplicated against the shared cache and capped at the per-task item
//!    limit.
//! 4. One result is emitted per successful task, even when empty.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::cache::{dedup_key, DedupCache};
use crate::error::FetchError;
use crate::fetcher::PageFetcher;
use crate::metrics::Metrics;
use crate::models::{Category, RawItem, Recipe};
use crate::scheduler::limiter::RateLimiter;
use crate::scheduler::task::{Status, Task, TaskKind, TaskOutput, TaskResult};

/// Shared dependencies and limits handed to every worker
#[derive(Clone)]
pub struct WorkerContext {
    pub fetcher: Arc<dyn PageFetcher>,
    pub limiter: Arc<RateLimiter>,
    pub cache: Arc<DedupCache>,
    pub metrics: Arc<Metrics>,

    /// Items kept per task before the rest of the batch is dropped
    pub max_items_per_task: usize,

    /// Deadline for one fetcher invocation
    pub task_timeout: Duration,
}

/// Fixed-size collection of workers sharing one input and one output channel
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `count` workers over the given channels
    ///
    /// The pool takes ownership of the task receiver; workers exit when the
    /// task channel is closed and drained. `failures` carries failed tasks
    /// back to the controller for retry scheduling.
    pub fn spawn(
        count: usize,
        context: WorkerContext,
        input: mpsc::Receiver<Task>,
        results: mpsc::Sender<TaskResult>,
        failures: mpsc::Sender<Task>,
    ) -> Self {
        let input = Arc::new(Mutex::new(input));
        let mut handles = Vec::with_capacity(count);

        for worker_id in 0..count {
            let input = Arc::clone(&input);
            let results = results.clone();
            let failures = failures.clone();
            let context = context.clone();

            handles.push(tokio::spawn(async move {
                process_tasks(worker_id, context, input, results, failures).await;
            }));
        }

        tracing::info!(workers_count = count, "Worker pool initialized");

        Self { handles }
    }

    /// Number of workers in the pool
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the pool holds no workers
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to finish
    pub async fn join(self) {
        join_all(self.handles).await;
    }
}

/// Worker loop: pull tasks until the input channel closes
async fn process_tasks(
    worker_id: usize,
    context: WorkerContext,
    input: Arc<Mutex<mpsc::Receiver<Task>>>,
    results: mpsc::Sender<TaskResult>,
    failures: mpsc::Sender<Task>,
) {
    loop {
        let task = {
            let mut rx = input.lock().await;
            rx.recv().await
        };

        let Some(task) = task else {
            break;
        };

        tracing::debug!(
            worker_id,
            task_id = %task.id,
            kind = %task.kind,
            worker_status = %Status::Busy,
            task_status = %Status::InProgress,
            "Task picked up"
        );

        match execute(&context, &task).await {
            Ok(items) => {
                context.metrics.record_fetch(task.kind.as_str());
                tracing::info!(
                    worker_id,
                    task_id = %task.id,
                    count = items.len(),
                    status = %Status::Completed,
                    "Task completed"
                );

                let result = TaskResult {
                    task_id: task.id.clone(),
                    items,
                };
                if results.send(result).await.is_err() {
                    tracing::warn!(
                        worker_id,
                        task_id = %task.id,
                        "Result queue closed, discarding result"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    worker_id,
                    task_id = %task.id,
                    retry_count = task.retry_count,
                    error = %e,
                    "Task failed"
                );
                if failures.send(task).await.is_err() {
                    tracing::warn!(worker_id, "Retry queue closed, dropping failed task");
                }
            }
        }
    }

    tracing::debug!(worker_id, status = %Status::Idle, "Worker shutting down");
}

/// Run one task against the page fetcher
async fn execute(context: &WorkerContext, task: &Task) -> Result<TaskOutput, FetchError> {
    match &task.kind {
        TaskKind::Category => {
            let raw = fetch_bounded(context.task_timeout, context.fetcher.fetch_categories()).await?;
            Ok(TaskOutput::Categories(collect_categories(context, raw)))
        }
        TaskKind::Recipe(category) => {
            // Only outbound recipe fetches consume rate-limiter tokens; the
            // single category-listing fetch is not worth throttling.
            context.limiter.acquire().await;
            let raw =
                fetch_bounded(context.task_timeout, context.fetcher.fetch_recipes(&category.href))
                    .await?;
            Ok(TaskOutput::Recipes(collect_recipes(context, raw)))
        }
    }
}

/// Apply the per-task timeout to one fetcher invocation
async fn fetch_bounded<F>(deadline: Duration, fetch: F) -> Result<Vec<RawItem>, FetchError>
where
    F: std::future::Future<Output = Result<Vec<RawItem>, FetchError>>,
{
    match tokio::time::timeout(deadline, fetch).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout),
    }
}

/// Normalize, validate, dedup and cap a raw category batch
fn collect_categories(context: &WorkerContext, raw: Vec<RawItem>) -> Vec<Category> {
    let mut kept = Vec::new();

    for item in raw {
        let category = match Category::from_raw(&item) {
            Ok(category) => category,
            Err(e) => {
                context.metrics.record_drop("category", "invalid");
                tracing::warn!(name = %item.name, href = %item.href, error = %e, "Invalid category dropped");
                continue;
            }
        };

        if !context.cache.insert(&dedup_key("category", &category.name)) {
            context.metrics.record_drop("category", "duplicate");
            tracing::debug!(name = %category.name, "Duplicate category skipped");
            continue;
        }

        if kept.len() >= context.max_items_per_task {
            context.metrics.record_drop("category", "over_cap");
            tracing::debug!(name = %category.name, cap = context.max_items_per_task, "Category over per-task cap, dropped");
            continue;
        }

        kept.push(category);
    }

    kept
}

/// Normalize, validate, dedup and cap a raw recipe batch
fn collect_recipes(context: &WorkerContext, raw: Vec<RawItem>) -> Vec<Recipe> {
    let mut kept = Vec::new();

    for item in raw {
        let recipe = match Recipe::from_raw(&item) {
            Ok(recipe) => recipe,
            Err(e) => {
                context.metrics.record_drop("recipe", "invalid");
                tracing::warn!(name = %item.name, href = %item.href, error = %e, "Invalid recipe dropped");
                continue;
            }
        };

        if !context.cache.insert(&dedup_key("recipe", &recipe.name)) {
            context.metrics.record_drop("recipe", "duplicate");
            tracing::debug!(name = %recipe.name, "Duplicate recipe skipped");
            continue;
        }

        if kept.len() >= context.max_items_per_task {
            context.metrics.record_drop("recipe", "over_cap");
            tracing::debug!(name = %recipe.name, cap = context.max_items_per_task, "Recipe over per-task cap, dropped");
            continue;
        }

        kept.push(recipe);
    }

    kept
}
