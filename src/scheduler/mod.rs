//! Task scheduling across the worker pool
//!
//! The [`TaskController`] owns the bounded task and result queues, starts
//! the worker pool, fans discovered categories out into recipe tasks (one
//! task per category), schedules bounded retries for failed tasks and
//! forwards completed results to the persistence sink.
//!
//! # Lifecycle
//!
//! The controller is a single-use object: [`TaskController::start`] wires
//! the channels and spawns the pool, result processor and retry handler;
//! [`TaskController::stop`] closes the task queue, lets in-flight and
//! already-queued tasks drain, abandons pending retry delays and waits for
//! every spawned task to finish. `start` after `start`, or `enqueue` after
//! `stop`, fail with a [`SchedulerError`] instead of panicking.
//!
//! # Ordering
//!
//! No ordering is guaranteed across tasks: results complete and persist in
//! any order relative to submission. The only guarantee is causal and
//! per-task: a task's result (or its retry) is never produced before the
//! attempt that caused it has finished.

pub mod limiter;
pub mod pool;
mod retry;
pub mod task;

pub use limiter::RateLimiter;
pub use pool::{WorkerContext, WorkerPool};
pub use task::{
    CrawlStats, StatsSnapshot, Status, Task, TaskKind, TaskOutput, TaskResult, CATEGORY_TASK_ID,
};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::cache::DedupCache;
use crate::error::{Result, SchedulerError};
use crate::fetcher::PageFetcher;
use crate::metrics::Metrics;
use crate::models::{Category, Recipe};
use crate::storage::{Sink, SinkWriter};
use retry::RetryHandler;

/// Capacity of the task queue; producers block when it is full
const TASK_QUEUE_CAPACITY: usize = 100;

/// Capacity of the result queue
const RESULT_QUEUE_CAPACITY: usize = 100;

/// Capacity of the worker-to-retry failure queue
const FAILURE_QUEUE_CAPACITY: usize = 100;

/// Handles owned by a started controller
struct RunningState {
    pool: WorkerPool,
    result_handle: JoinHandle<()>,
    retry_handle: JoinHandle<()>,
    sink_writer: SinkWriter,
    limiter: Arc<RateLimiter>,
}

/// The crawl scheduler
pub struct TaskController {
    fetcher: Arc<dyn PageFetcher>,
    sink: Arc<dyn Sink>,
    cache: Arc<DedupCache>,
    metrics: Arc<Metrics>,

    workers_count: usize,
    retry_interval: Duration,
    max_retries: u32,

    stats: Arc<CrawlStats>,

    task_tx: Option<mpsc::Sender<Task>>,
    task_rx: Option<mpsc::Receiver<Task>>,
    result_tx: Option<mpsc::Sender<TaskResult>>,
    result_rx: Option<mpsc::Receiver<TaskResult>>,

    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,

    running: Option<RunningState>,
}

impl TaskController {
    /// Create a controller over the given collaborators
    ///
    /// The queues exist from construction, so [`TaskController::enqueue`]
    /// applies backpressure even before `start` is called.
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        sink: Arc<dyn Sink>,
        cache: Arc<DedupCache>,
        metrics: Arc<Metrics>,
        workers_count: usize,
        retry_interval: Duration,
        max_retries: u32,
    ) -> Self {
        let (task_tx, task_rx) = mpsc::channel(TASK_QUEUE_CAPACITY);
        let (result_tx, result_rx) = mpsc::channel(RESULT_QUEUE_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            fetcher,
            sink,
            cache,
            metrics,
            workers_count,
            retry_interval,
            max_retries,
            stats: CrawlStats::new(),
            task_tx: Some(task_tx),
            task_rx: Some(task_rx),
            result_tx: Some(result_tx),
            result_rx: Some(result_rx),
            shutdown_tx,
            shutdown_rx,
            running: None,
        }
    }

    /// Start the worker pool, result processor and retry handler
    ///
    /// Single-use: a second call fails with
    /// [`SchedulerError::AlreadyStarted`].
    pub fn start(
        &mut self,
        max_items_per_task: usize,
        requests_per_second: u32,
        task_timeout: Duration,
    ) -> Result<()> {
        let (Some(task_rx), Some(result_tx), Some(result_rx), Some(task_tx)) = (
            self.task_rx.take(),
            self.result_tx.take(),
            self.result_rx.take(),
            self.task_tx.clone(),
        ) else {
            return Err(SchedulerError::AlreadyStarted.into());
        };

        let limiter = Arc::new(RateLimiter::new(requests_per_second));
        let (failure_tx, failure_rx) = mpsc::channel(FAILURE_QUEUE_CAPACITY);

        let context = WorkerContext {
            fetcher: Arc::clone(&self.fetcher),
            limiter: Arc::clone(&limiter),
            cache: Arc::clone(&self.cache),
            metrics: Arc::clone(&self.metrics),
            max_items_per_task,
            task_timeout,
        };

        let pool = WorkerPool::spawn(self.workers_count, context, task_rx, result_tx, failure_tx);

        let sink_writer = SinkWriter::spawn(Arc::clone(&self.sink), Arc::clone(&self.metrics));

        let result_handle = tokio::spawn(process_results(
            result_rx,
            sink_writer.category_sender(),
            sink_writer.recipe_sender(),
            Some(task_tx.clone()),
            self.shutdown_rx.clone(),
            Arc::clone(&self.stats),
        ));

        let retry_handle = RetryHandler::spawn(
            failure_rx,
            task_tx,
            self.shutdown_rx.clone(),
            self.retry_interval,
            self.max_retries,
            Arc::clone(&self.stats),
            Arc::clone(&self.metrics),
        );

        self.running = Some(RunningState {
            pool,
            result_handle,
            retry_handle,
            sink_writer,
            limiter,
        });

        tracing::info!(
            workers_count = self.workers_count,
            max_items_per_task,
            requests_per_second,
            timeout = ?task_timeout,
            "Task controller started"
        );

        Ok(())
    }

    /// Submit a task to the queue, blocking while the queue is full
    ///
    /// Fails with [`SchedulerError::QueueClosed`] after [`stop`] has been
    /// called.
    ///
    /// [`stop`]: TaskController::stop
    pub async fn enqueue(&self, task: Task) -> Result<()> {
        let Some(task_tx) = &self.task_tx else {
            return Err(SchedulerError::QueueClosed.into());
        };

        let task_id = task.id.clone();
        task_tx
            .send(task)
            .await
            .map_err(|_| SchedulerError::QueueClosed)?;
        self.stats.record_submitted();
        tracing::debug!(task_id = %task_id, status = %Status::Pending, "Task enqueued");
        Ok(())
    }

    /// Snapshot of the crawl counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop the controller: close the queues and drain everything
    ///
    /// No new tasks are accepted afterwards; tasks already queued or in
    /// flight run to completion, pending retry delays are abandoned, and the
    /// call returns only once the pool, the result processor and the sink
    /// drains have all finished. Calling `stop` on a never-started or
    /// already-stopped controller is a no-op.
    pub async fn stop(&mut self) {
        // Broadcast shutdown and stop accepting new tasks. The retry handler
        // and the result processor drop their queue senders in response;
        // once the pending retry delays are gone the task queue closes and
        // the workers drain whatever is still buffered.
        let _ = self.shutdown_tx.send(true);
        self.task_tx = None;

        let Some(running) = self.running.take() else {
            return;
        };

        let _ = running.retry_handle.await;
        running.pool.join().await;
        let _ = running.result_handle.await;
        running.sink_writer.close().await;
        running.limiter.close();

        let stats = self.stats.snapshot();
        tracing::info!(
            tasks_submitted = stats.tasks_submitted,
            tasks_completed = stats.tasks_completed,
            tasks_retried = stats.tasks_retried,
            tasks_failed = stats.tasks_failed,
            items_discovered = stats.items_discovered,
            "Task controller stopped"
        );
    }
}

/// Consume results: forward batches to the sink and fan categories out into
/// recipe tasks
async fn process_results(
    mut result_rx: mpsc::Receiver<TaskResult>,
    category_tx: mpsc::Sender<Vec<Category>>,
    recipe_tx: mpsc::Sender<Vec<Recipe>>,
    mut task_tx: Option<mpsc::Sender<Task>>,
    mut shutdown: watch::Receiver<bool>,
    stats: Arc<CrawlStats>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed(), if task_tx.is_some() => {
                // No more fan-out; dropping the sender lets the task queue
                // close while results keep draining below.
                task_tx = None;
            }
            result = result_rx.recv() => {
                let Some(result) = result else { break };
                handle_result(result, &category_tx, &recipe_tx, task_tx.as_ref(), &stats).await;
            }
        }
    }

    tracing::debug!("Result processor shutting down");
}

async fn handle_result(
    result: TaskResult,
    category_tx: &mpsc::Sender<Vec<Category>>,
    recipe_tx: &mpsc::Sender<Vec<Recipe>>,
    task_tx: Option<&mpsc::Sender<Task>>,
    stats: &CrawlStats,
) {
    stats.record_completed();
    stats.record_items(result.items.len());

    tracing::info!(
        task_id = %result.task_id,
        count = result.items.len(),
        "Result received"
    );

    match result.items {
        TaskOutput::Categories(categories) => {
            if category_tx.send(categories.clone()).await.is_err() {
                tracing::warn!(task_id = %result.task_id, "Category sink closed, dropping batch");
            }

            // One recipe task per discovered category; each task owns its
            // own copy of the category.
            match task_tx {
                Some(task_tx) => {
                    for category in categories {
                        let task = Task::recipe_listing(category);
                        let task_id = task.id.clone();
                        if task_tx.send(task).await.is_err() {
                            tracing::warn!(
                                task_id = %task_id,
                                "Task queue closed, dropping fan-out task"
                            );
                            break;
                        }
                        stats.record_submitted();
                        tracing::debug!(
                            task_id = %task_id,
                            status = %Status::Pending,
                            "Recipe task enqueued"
                        );
                    }
                }
                None => {
                    tracing::warn!(
                        task_id = %result.task_id,
                        "Shutdown in progress, skipping fan-out"
                    );
                }
            }
        }
        TaskOutput::Recipes(recipes) => {
            if recipe_tx.send(recipes).await.is_err() {
                tracing::warn!(task_id = %result.task_id, "Recipe sink closed, dropping batch");
            }
        }
    }
}
