//! SQLite store and sink-writer tests

mod common;

use std::sync::Arc;

use common::MemorySink;
use povar::metrics::Metrics;
use povar::models::{Category, Recipe};
use povar::storage::{Sink, SinkWriter, SqliteStore};

fn category(name: &str, href: &str) -> Category {
    Category {
        name: name.to_string(),
        href: href.to_string(),
    }
}

fn recipe(name: &str, href: &str) -> Recipe {
    Recipe {
        name: name.to_string(),
        href: href.to_string(),
    }
}

#[tokio::test]
async fn sqlite_round_trip_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("povar.db")).unwrap();
    store.create_tables().await.unwrap();

    store
        .save_categories(&[
            category("завтраки", "/recepty/zavtraki"),
            category("супы", "/recepty/supy"),
        ])
        .await
        .unwrap();
    store
        .save_recipes(&[recipe("борщ", "/recepty/supy/borshch-1")])
        .await
        .unwrap();

    assert_eq!(store.category_count().await.unwrap(), 2);
    assert_eq!(store.recipe_count().await.unwrap(), 1);

    // Delivery is at-least-once; a repeated save appends.
    store
        .save_recipes(&[recipe("борщ", "/recepty/supy/borshch-1")])
        .await
        .unwrap();
    assert_eq!(store.recipe_count().await.unwrap(), 2);
}

#[tokio::test]
async fn store_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("data").join("nested").join("povar.db");

    let store = SqliteStore::open(&nested).unwrap();
    store.create_tables().await.unwrap();
    assert_eq!(store.category_count().await.unwrap(), 0);
}

#[tokio::test]
async fn sink_writer_drains_batches_per_kind() {
    let sink = Arc::new(MemorySink::new());
    let metrics = Arc::new(Metrics::new().unwrap());
    let writer = SinkWriter::spawn(Arc::clone(&sink) as Arc<dyn Sink>, metrics);

    writer
        .category_sender()
        .send(vec![category("завтраки", "/recepty/zavtraki")])
        .await
        .unwrap();
    writer
        .recipe_sender()
        .send(vec![
            recipe("драники", "/recepty/zavtraki/draniki-187448"),
            recipe("сырники", "/recepty/zavtraki/syrniki-1"),
        ])
        .await
        .unwrap();
    writer.recipe_sender().send(Vec::new()).await.unwrap();

    // close() waits for both drains, so every batch has been handed to the
    // sink once it returns.
    writer.close().await;

    assert_eq!(sink.category_batches().len(), 1);
    assert_eq!(sink.recipe_batches().len(), 2);
    assert_eq!(sink.total_recipes(), 2);
}

#[tokio::test]
async fn sink_writer_logs_and_drops_failed_batches() {
    let sink = Arc::new(MemorySink::failing());
    let metrics = Arc::new(Metrics::new().unwrap());
    let writer = SinkWriter::spawn(Arc::clone(&sink) as Arc<dyn Sink>, Arc::clone(&metrics));

    writer
        .recipe_sender()
        .send(vec![recipe("борщ", "/recepty/supy/borshch-1")])
        .await
        .unwrap();
    writer.close().await;

    // The batch was attempted exactly once and not re-queued.
    assert_eq!(sink.recipe_batches().len(), 1);
    let exposition = metrics.gather().unwrap();
    assert!(exposition.contains("povar_sink_batches_total"));
}
