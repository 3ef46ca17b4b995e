//! Listing-page fetching for the recipe source
//!
//! [`PageFetcher`] is the capability boundary between the scheduler and the
//! document world: the worker pool only ever sees sequences of raw
//! (name, href) pairs. [`HttpFetcher`] is the production implementation for
//! eda.ru, built on reqwest and scraper with:
//! - User-Agent rotation
//! - CSS-selector extraction of category and recipe cards
//! - A base-URL override for tests against a mock server

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

use crate::error::FetchError;
use crate::models::RawItem;

/// Production source root
const DEFAULT_BASE_URL: &str = "https://eda.ru";

/// Selector for one category card on the source root page
const CATEGORY_ITEM_SELECTOR: &str = ".emotion-c3fqwx";
const CATEGORY_NAME_SELECTOR: &str = "a h3";
const CATEGORY_LINK_SELECTOR: &str = "a";

/// Selector for one recipe card on a category page
const RECIPE_ITEM_SELECTOR: &str = ".emotion-1j5xcrd";
const RECIPE_NAME_SELECTOR: &str = "a span";
const RECIPE_LINK_SELECTOR: &str = "a";

/// Pool of realistic User-Agent strings for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// Capability consumed by the worker pool to turn a task target into raw
/// listing entries
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the category listing from the source root
    async fn fetch_categories(&self) -> Result<Vec<RawItem>, FetchError>;

    /// Fetch the recipe listing of one category page
    async fn fetch_recipes(&self, category_href: &str) -> Result<Vec<RawItem>, FetchError>;
}

/// HTTP-backed page fetcher for the recipe source
pub struct HttpFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Root all hrefs are joined against
    base_url: Url,

    category_item: Selector,
    category_name: Selector,
    category_link: Selector,
    recipe_item: Selector,
    recipe_name: Selector,
    recipe_link: Selector,
}

impl HttpFetcher {
    /// Create a fetcher against the production source
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    /// Create a fetcher against a custom base URL, e.g. a mock server
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .cookie_store(true)
            .build()?;

        let base_url = Url::parse(base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{base_url}: {e}")))?;

        Ok(Self {
            client,
            base_url,
            category_item: parse_selector(CATEGORY_ITEM_SELECTOR)?,
            category_name: parse_selector(CATEGORY_NAME_SELECTOR)?,
            category_link: parse_selector(CATEGORY_LINK_SELECTOR)?,
            recipe_item: parse_selector(RECIPE_ITEM_SELECTOR)?,
            recipe_name: parse_selector(RECIPE_NAME_SELECTOR)?,
            recipe_link: parse_selector(RECIPE_LINK_SELECTOR)?,
        })
    }

    /// Fetch a page relative to the base URL and return its body
    async fn fetch_html(&self, path: &str) -> Result<String, FetchError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| FetchError::InvalidUrl(format!("{path}: {e}")))?;

        tracing::debug!(url = %url, "Fetching listing page");

        let response = match self
            .client
            .get(url)
            .header(USER_AGENT, self.random_user_agent())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Err(FetchError::Timeout),
            Err(e) => return Err(FetchError::Http(e)),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ServerError(status.as_u16()));
        }

        match response.text().await {
            Ok(body) => Ok(body),
            Err(e) if e.is_timeout() => Err(FetchError::Timeout),
            Err(e) => Err(FetchError::Http(e)),
        }
    }

    /// Get a random user agent from the pool
    fn random_user_agent(&self) -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS.choose(&mut rng).unwrap_or(&USER_AGENTS[0])
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_categories(&self) -> Result<Vec<RawItem>, FetchError> {
        let html = self.fetch_html("/").await?;
        Ok(parse_listing(
            &html,
            &self.category_item,
            &self.category_name,
            &self.category_link,
        ))
    }

    async fn fetch_recipes(&self, category_href: &str) -> Result<Vec<RawItem>, FetchError> {
        let html = self.fetch_html(category_href).await?;
        Ok(parse_listing(
            &html,
            &self.recipe_item,
            &self.recipe_name,
            &self.recipe_link,
        ))
    }
}

fn parse_selector(selector: &str) -> Result<Selector, FetchError> {
    Selector::parse(selector).map_err(|e| FetchError::Selector(format!("{selector}: {e}")))
}

/// Extract raw (name, href) pairs from a listing page
///
/// Extraction only; normalization and validation happen in the worker, so
/// entries with empty fields are returned as-is.
fn parse_listing(html: &str, item: &Selector, name: &Selector, link: &Selector) -> Vec<RawItem> {
    let document = Html::parse_document(html);
    let mut items = Vec::new();

    for element in document.select(item) {
        let name = element
            .select(name)
            .next()
            .map(|n| n.text().collect::<String>())
            .unwrap_or_default();

        let href = element
            .select(link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .unwrap_or_default()
            .to_string();

        items.push(RawItem { name, href });
    }

    items
}
