//! Wiremock-backed tests for the HTTP page fetcher

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use povar::error::FetchError;
use povar::fetcher::{HttpFetcher, PageFetcher};
use povar::models::RawItem;

const CATEGORY_PAGE: &str = r#"
<html><body>
    <div class="emotion-c3fqwx"><a href="/recepty/zavtraki"><h3>Завтраки</h3></a></div>
    <div class="emotion-c3fqwx"><a href="/recepty/supy"><h3>Супы</h3></a></div>
    <div class="unrelated"><a href="/nope"><h3>Не категория</h3></a></div>
</body></html>
"#;

const RECIPE_PAGE: &str = r#"
<html><body>
    <div class="emotion-1j5xcrd"><a href="/recepty/zavtraki/draniki-187448"><span>Драники из батата</span></a></div>
    <div class="emotion-1j5xcrd"><a href="/recepty/zavtraki/grechnevij-22397"><span>Гречневый завтрак</span></a></div>
</body></html>
"#;

#[tokio::test]
async fn fetch_categories_parses_listing_markup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CATEGORY_PAGE))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::with_base_url(&server.uri(), Duration::from_secs(5)).unwrap();
    let items = fetcher.fetch_categories().await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0], RawItem::new("Завтраки", "/recepty/zavtraki"));
    assert_eq!(items[1], RawItem::new("Супы", "/recepty/supy"));
}

#[tokio::test]
async fn fetch_recipes_parses_category_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/recepty/zavtraki"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RECIPE_PAGE))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::with_base_url(&server.uri(), Duration::from_secs(5)).unwrap();
    let items = fetcher.fetch_recipes("/recepty/zavtraki").await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(
        items[0],
        RawItem::new("Драники из батата", "/recepty/zavtraki/draniki-187448")
    );
    assert_eq!(
        items[1],
        RawItem::new("Гречневый завтрак", "/recepty/zavtraki/grechnevij-22397")
    );
}

#[tokio::test]
async fn empty_listing_yields_empty_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::with_base_url(&server.uri(), Duration::from_secs(5)).unwrap();
    let items = fetcher.fetch_categories().await.unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn server_error_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/recepty/supy"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::with_base_url(&server.uri(), Duration::from_secs(5)).unwrap();
    let err = fetcher.fetch_recipes("/recepty/supy").await.unwrap_err();
    assert!(matches!(err, FetchError::ServerError(503)));
}

#[tokio::test]
async fn not_found_is_surfaced() {
    let server = MockServer::start().await;

    let fetcher = HttpFetcher::with_base_url(&server.uri(), Duration::from_secs(5)).unwrap();
    let err = fetcher.fetch_recipes("/recepty/missing").await.unwrap_err();
    assert!(matches!(err, FetchError::ServerError(404)));
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(CATEGORY_PAGE)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::with_base_url(&server.uri(), Duration::from_millis(200)).unwrap();
    let err = fetcher.fetch_categories().await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout));
}
