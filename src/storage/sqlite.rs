//! SQLite-backed persistence sink

use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::models::{Category, Recipe};
use crate::storage::Sink;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    href TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS recipes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    href TEXT NOT NULL
);
";

/// SQLite store for discovered categories and recipes
///
/// The connection lives behind an async mutex; combined with the per-kind
/// drain tasks of `SinkWriter` this keeps all writes single-file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "Opened SQLite store");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database, useful for tests
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    /// Create the schema; safe to call more than once
    pub async fn create_tables(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Number of stored categories
    pub async fn category_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Number of stored recipes
    pub async fn recipe_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[async_trait]
impl Sink for SqliteStore {
    async fn save_categories(&self, categories: &[Category]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("INSERT INTO categories (name, href) VALUES (?1, ?2)")?;
            for category in categories {
                stmt.execute(params![category.name, category.href])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    async fn save_recipes(&self, recipes: &[Recipe]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("INSERT INTO recipes (name, href) VALUES (?1, ?2)")?;
            for recipe in recipes {
                stmt.execute(params![recipe.name, recipe.href])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
