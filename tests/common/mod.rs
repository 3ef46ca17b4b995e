//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use povar::error::{FetchError, StoreError};
use povar::fetcher::PageFetcher;
use povar::models::{Category, RawItem, Recipe};
use povar::storage::Sink;

/// Scripted page fetcher with call counting and failure injection
pub struct MockFetcher {
    categories: Vec<RawItem>,
    recipes: Vec<RawItem>,
    fail_recipes: bool,
    category_calls: AtomicU32,
    recipe_calls: AtomicU32,
}

impl MockFetcher {
    /// Serve the given category listing; each recipe fetch serves `recipes`
    /// with names prefixed by the category href, so different categories
    /// yield distinct recipes
    pub fn new(categories: Vec<RawItem>, recipes: Vec<RawItem>) -> Self {
        Self {
            categories,
            recipes,
            fail_recipes: false,
            category_calls: AtomicU32::new(0),
            recipe_calls: AtomicU32::new(0),
        }
    }

    /// Serve the category listing but fail every recipe fetch
    pub fn failing_recipes(categories: Vec<RawItem>) -> Self {
        Self {
            categories,
            recipes: Vec::new(),
            fail_recipes: true,
            category_calls: AtomicU32::new(0),
            recipe_calls: AtomicU32::new(0),
        }
    }

    pub fn category_calls(&self) -> u32 {
        self.category_calls.load(Ordering::SeqCst)
    }

    pub fn recipe_calls(&self) -> u32 {
        self.recipe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch_categories(&self) -> Result<Vec<RawItem>, FetchError> {
        self.category_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.categories.clone())
    }

    async fn fetch_recipes(&self, category_href: &str) -> Result<Vec<RawItem>, FetchError> {
        self.recipe_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_recipes {
            return Err(FetchError::ServerError(503));
        }

        Ok(self
            .recipes
            .iter()
            .map(|r| RawItem::new(format!("{category_href} {}", r.name), r.href.clone()))
            .collect())
    }
}

/// In-memory sink recording every batch it receives
pub struct MemorySink {
    categories: Mutex<Vec<Vec<Category>>>,
    recipes: Mutex<Vec<Vec<Recipe>>>,
    fail: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            categories: Mutex::new(Vec::new()),
            recipes: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A sink that records each attempted batch but rejects it
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn category_batches(&self) -> Vec<Vec<Category>> {
        self.categories.lock().unwrap().clone()
    }

    pub fn recipe_batches(&self) -> Vec<Vec<Recipe>> {
        self.recipes.lock().unwrap().clone()
    }

    pub fn total_categories(&self) -> usize {
        self.categories.lock().unwrap().iter().map(Vec::len).sum()
    }

    pub fn total_recipes(&self) -> usize {
        self.recipes.lock().unwrap().iter().map(Vec::len).sum()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn save_categories(&self, categories: &[Category]) -> Result<(), StoreError> {
        self.categories.lock().unwrap().push(categories.to_vec());
        if self.fail {
            return Err(StoreError::Unavailable("sink is down".to_string()));
        }
        Ok(())
    }

    async fn save_recipes(&self, recipes: &[Recipe]) -> Result<(), StoreError> {
        self.recipes.lock().unwrap().push(recipes.to_vec());
        if self.fail {
            return Err(StoreError::Unavailable("sink is down".to_string()));
        }
        Ok(())
    }
}

/// Generate `count` distinct raw category entries
pub fn category_listing(count: usize) -> Vec<RawItem> {
    (0..count)
        .map(|i| RawItem::new(format!("Category {i}"), format!("/recepty/category-{i}")))
        .collect()
}

/// Generate `count` distinct raw recipe entries
pub fn recipe_listing(count: usize) -> Vec<RawItem> {
    (0..count)
        .map(|i| RawItem::new(format!("Recipe {i}"), format!("/recepty/recipe-{i}")))
        .collect()
}

/// Poll `cond` until it holds or `deadline` elapses
///
/// Uses tokio's clock, so paused-time tests advance instantly.
pub async fn wait_until(deadline: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
