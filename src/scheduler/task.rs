//! Task and result types for the crawl scheduler

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::models::{Category, Recipe};

/// Fixed identifier of the initial category-listing task
pub const CATEGORY_TASK_ID: &str = "categories";

/// Kind of schedulable crawl work
///
/// A closed enum with exhaustive dispatch: a recipe task always carries the
/// parent category whose page yields its items, so an unrecognized tag or a
/// recipe task without a category is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    /// Fetch the source-wide category listing
    Category,
    /// Fetch the recipe listing of one category
    Recipe(Category),
}

impl TaskKind {
    /// Short label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Recipe(_) => "recipe",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Schedulable unit of crawl work
#[derive(Debug, Clone)]
pub struct Task {
    /// Stable identifier, derived from the source category name
    pub id: String,

    /// What this task fetches
    pub kind: TaskKind,

    /// Number of times the task has been re-submitted after a failure
    pub retry_count: u32,
}

impl Task {
    /// The initial task: fetch the category listing from the source root
    pub fn category_listing() -> Self {
        Self {
            id: CATEGORY_TASK_ID.to_string(),
            kind: TaskKind::Category,
            retry_count: 0,
        }
    }

    /// A fan-out task: fetch the recipe listing of one discovered category
    ///
    /// Takes ownership of the category so every task holds its own copy.
    pub fn recipe_listing(category: Category) -> Self {
        Self {
            id: category.name.clone(),
            kind: TaskKind::Recipe(category),
            retry_count: 0,
        }
    }
}

/// Items produced by one completed task
#[derive(Debug, Clone)]
pub enum TaskOutput {
    Categories(Vec<Category>),
    Recipes(Vec<Recipe>),
}

impl TaskOutput {
    /// Number of items in the batch
    pub fn len(&self) -> usize {
        match self {
            Self::Categories(items) => items.len(),
            Self::Recipes(items) => items.len(),
        }
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Output batch of one successfully processed task
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Matches the `id` of the originating [`Task`]
    pub task_id: String,

    /// Kept items, may be empty
    pub items: TaskOutput,
}

/// Transient task/worker status, surfaced only in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Busy,
    Error,
    Pending,
    InProgress,
    Completed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Error => "error",
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Crawl counters shared across the controller, pool and retry handler
#[derive(Debug, Default)]
pub struct CrawlStats {
    /// Tasks accepted into the task queue (initial, fan-out and retries count
    /// each submission once)
    pub tasks_submitted: AtomicU64,

    /// Tasks whose result reached the result processor
    pub tasks_completed: AtomicU64,

    /// Failed attempts that were re-submitted
    pub tasks_retried: AtomicU64,

    /// Tasks that exhausted their retry budget and went terminal
    pub tasks_failed: AtomicU64,

    /// Items carried by accepted results
    pub items_discovered: AtomicU64,
}

impl CrawlStats {
    /// Create a new shared counter set
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_submitted(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retried(&self) {
        self.tasks_retried.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_items(&self, count: usize) {
        self.items_discovered.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Get a consistent-enough snapshot of the current counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_retried: self.tasks_retried.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            items_discovered: self.items_discovered.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of crawl statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub tasks_submitted: u64,
    pub tasks_completed: u64,
    pub tasks_retried: u64,
    pub tasks_failed: u64,
    pub items_discovered: u64,
}

impl StatsSnapshot {
    /// Tasks that reached a terminal state
    pub fn tasks_finished(&self) -> u64 {
        self.tasks_completed + self.tasks_failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_listing_task() {
        let task = Task::category_listing();
        assert_eq!(task.id, CATEGORY_TASK_ID);
        assert_eq!(task.kind, TaskKind::Category);
        assert_eq!(task.retry_count, 0);
    }

    #[test]
    fn test_recipe_task_id_derives_from_category_name() {
        let category = Category {
            name: "завтраки".to_string(),
            href: "/recepty/zavtraki".to_string(),
        };
        let task = Task::recipe_listing(category.clone());
        assert_eq!(task.id, "завтраки");
        assert_eq!(task.kind, TaskKind::Recipe(category));
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(TaskKind::Category.as_str(), "category");
        let category = Category {
            name: "супы".to_string(),
            href: "/recepty/supy".to_string(),
        };
        assert_eq!(TaskKind::Recipe(category).to_string(), "recipe");
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(Status::Pending.to_string(), "pending");
        assert_eq!(Status::InProgress.as_str(), "in_progress");
        assert_eq!(Status::Completed.as_str(), "completed");
    }

    #[test]
    fn test_output_len() {
        let output = TaskOutput::Recipes(vec![]);
        assert!(output.is_empty());

        let output = TaskOutput::Categories(vec![Category {
            name: "супы".to_string(),
            href: "/recepty/supy".to_string(),
        }]);
        assert_eq!(output.len(), 1);
    }

    #[test]
    fn test_stats_snapshot() {
        let stats = CrawlStats::new();
        stats.record_submitted();
        stats.record_submitted();
        stats.record_completed();
        stats.record_failed();
        stats.record_items(5);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.tasks_submitted, 2);
        assert_eq!(snapshot.tasks_completed, 1);
        assert_eq!(snapshot.tasks_failed, 1);
        assert_eq!(snapshot.items_discovered, 5);
        assert_eq!(snapshot.tasks_finished(), 2);
    }
}
