//! Durable persistence for discovered entities
//!
//! [`Sink`] is the capability boundary to durable storage; the scheduler
//! never calls it directly. [`SinkWriter`] enforces the single-writer
//! discipline: one bounded channel and one dedicated drain task per entity
//! kind, so the sink client is never invoked concurrently with itself no
//! matter how many workers produce results. A failed save is logged and the
//! batch is dropped; delivery is at-least-once on success and nothing
//! stronger on failure.

pub mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::StoreError;
use crate::metrics::Metrics;
use crate::models::{Category, Recipe};

/// Capacity of each per-kind save channel
const SAVE_QUEUE_CAPACITY: usize = 10;

/// Capability consumed by the scheduler to persist accepted batches
#[async_trait]
pub trait Sink: Send + Sync {
    /// Persist a batch of categories
    async fn save_categories(&self, categories: &[Category]) -> Result<(), StoreError>;

    /// Persist a batch of recipes
    async fn save_recipes(&self, recipes: &[Recipe]) -> Result<(), StoreError>;
}

/// Asynchronous sink writer with one bounded queue per entity kind
pub struct SinkWriter {
    category_tx: mpsc::Sender<Vec<Category>>,
    recipe_tx: mpsc::Sender<Vec<Recipe>>,
    handles: Vec<JoinHandle<()>>,
}

impl SinkWriter {
    /// Spawn the per-kind drain tasks
    pub fn spawn(sink: Arc<dyn Sink>, metrics: Arc<Metrics>) -> Self {
        let (category_tx, mut category_rx) = mpsc::channel::<Vec<Category>>(SAVE_QUEUE_CAPACITY);
        let (recipe_tx, mut recipe_rx) = mpsc::channel::<Vec<Recipe>>(SAVE_QUEUE_CAPACITY);

        let category_sink = Arc::clone(&sink);
        let category_metrics = Arc::clone(&metrics);
        let category_handle = tokio::spawn(async move {
            while let Some(batch) = category_rx.recv().await {
                match category_sink.save_categories(&batch).await {
                    Ok(()) => {
                        category_metrics.record_sink_batch("category", "saved");
                        tracing::info!(count = batch.len(), "Categories saved");
                    }
                    Err(e) => {
                        category_metrics.record_sink_batch("category", "failed");
                        tracing::error!(
                            error = %e,
                            count = batch.len(),
                            "Failed to save categories, dropping batch"
                        );
                    }
                }
            }
            tracing::debug!("Category sink drain shutting down");
        });

        let recipe_handle = tokio::spawn(async move {
            while let Some(batch) = recipe_rx.recv().await {
                match sink.save_recipes(&batch).await {
                    Ok(()) => {
                        metrics.record_sink_batch("recipe", "saved");
                        tracing::info!(count = batch.len(), "Recipes saved");
                    }
                    Err(e) => {
                        metrics.record_sink_batch("recipe", "failed");
                        tracing::error!(
                            error = %e,
                            count = batch.len(),
                            "Failed to save recipes, dropping batch"
                        );
                    }
                }
            }
            tracing::debug!("Recipe sink drain shutting down");
        });

        Self {
            category_tx,
            recipe_tx,
            handles: vec![category_handle, recipe_handle],
        }
    }

    /// Sender side of the category save queue
    pub fn category_sender(&self) -> mpsc::Sender<Vec<Category>> {
        self.category_tx.clone()
    }

    /// Sender side of the recipe save queue
    pub fn recipe_sender(&self) -> mpsc::Sender<Vec<Recipe>> {
        self.recipe_tx.clone()
    }

    /// Close both queues and wait for the drain tasks to finish
    ///
    /// All sender clones handed out must already be dropped, or the drains
    /// keep waiting for more batches.
    pub async fn close(self) {
        let Self {
            category_tx,
            recipe_tx,
            handles,
        } = self;
        drop(category_tx);
        drop(recipe_tx);

        for handle in handles {
            let _ = handle.await;
        }
    }
}
