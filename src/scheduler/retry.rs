//! Bounded retry handling for failed tasks
//!
//! A single controller-owned handler consumes failure signals from the
//! worker pool. A failed task whose retry budget is not exhausted is
//! re-submitted after a fixed delay; once `retry_count` reaches the maximum
//! the task goes terminal and is only remembered by its log trail.
//!
//! Every pending delay lives in one [`JoinSet`] owned by the handler, so a
//! shutdown can abandon all of them at once. A bare spawned sleep-then-send
//! would not be cancellable and could leak past `stop()`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};

use crate::metrics::Metrics;
use crate::scheduler::task::{CrawlStats, Status, Task};

/// Consumes worker failure signals and schedules bounded retries
pub(crate) struct RetryHandler {
    failures: mpsc::Receiver<Task>,
    task_tx: mpsc::Sender<Task>,
    shutdown: watch::Receiver<bool>,
    retry_interval: Duration,
    max_retries: u32,
    stats: Arc<CrawlStats>,
    metrics: Arc<Metrics>,
}

impl RetryHandler {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn spawn(
        failures: mpsc::Receiver<Task>,
        task_tx: mpsc::Sender<Task>,
        shutdown: watch::Receiver<bool>,
        retry_interval: Duration,
        max_retries: u32,
        stats: Arc<CrawlStats>,
        metrics: Arc<Metrics>,
    ) -> JoinHandle<()> {
        let handler = Self {
            failures,
            task_tx,
            shutdown,
            retry_interval,
            max_retries,
            stats,
            metrics,
        };
        tokio::spawn(handler.run())
    }

    async fn run(mut self) {
        let mut pending: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => break,
                failed = self.failures.recv() => {
                    let Some(task) = failed else { break };
                    self.handle_failure(task, &mut pending);
                }
                // Reap finished delay tasks so the set does not grow for the
                // lifetime of the crawl.
                Some(_) = pending.join_next(), if !pending.is_empty() => {}
            }
        }

        // Abandon pending delayed retries; the task queue is closing and a
        // leaked timer would keep it open.
        pending.shutdown().await;
        tracing::debug!("Retry handler shutting down");
    }

    fn handle_failure(&self, mut task: Task, pending: &mut JoinSet<()>) {
        if task.retry_count >= self.max_retries {
            self.stats.record_failed();
            self.metrics.record_exhausted();
            tracing::error!(
                task_id = %task.id,
                attempts = task.retry_count + 1,
                status = %Status::Error,
                "Retries exhausted, dropping task"
            );
            return;
        }

        task.retry_count += 1;
        self.stats.record_retried();
        self.metrics.record_retry();
        tracing::info!(
            task_id = %task.id,
            retry_count = task.retry_count,
            delay = ?self.retry_interval,
            "Scheduling retry"
        );

        let task_tx = self.task_tx.clone();
        let delay = self.retry_interval;
        let stats = Arc::clone(&self.stats);

        pending.spawn(async move {
            tokio::time::sleep(delay).await;

            let task_id = task.id.clone();
            if task_tx.send(task).await.is_err() {
                tracing::warn!(task_id = %task_id, "Task queue closed, dropping retried task");
            } else {
                stats.record_submitted();
                tracing::debug!(task_id = %task_id, status = %Status::Pending, "Retried task re-enqueued");
            }
        });
    }
}
