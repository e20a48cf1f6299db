//! # Founders Stage Tests
//!
//! Feeds polished CSV fixtures through the founders stage with a mock page
//! source, plus one run against a mock server with the HTTP page fetcher.

mod common;

use anyhow::Result;
use common::{read_rows, setup_tracing, MockPageSource};
use postharvest::pipeline::MAKERS_COLUMN;
use postharvest::{
    run_founders, HttpConfig, HttpPageFetcher, ManualClock, PageSource, PipelineError, SiteClient,
    StoreError,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const POLISHED: &str = concat!(
    "\"ph_id\",\"name\",\"tagline\",\"createdAt\",\"url\"\n",
    "\"1\",\"Foo\",\"Foo tagline\",\"2024-01-01\",\"https://foo.example.com\"\n",
    "\"2\",\"Bar\",\"Bar tagline\",\"2024-01-02\",\"https://bar.example.com\"\n",
);

fn product_page(makers: &str) -> String {
    format!(
        "<html><script>window.__APOLLO__ = {{\"product\":{{\"id\":1,\"makers\": {makers}}}}};</script></html>"
    )
}

fn write_polished(path: &Path) {
    fs::write(path, POLISHED).expect("Failed to write polished fixture");
}

#[tokio::test]
async fn test_appends_compact_makers_object_to_each_row() -> Result<()> {
    // --- 1. Arrange ---
    setup_tracing();
    let dir = tempdir()?;
    let input = dir.path().join("posts.csv");
    let output = dir.path().join("posts-with-founders.csv");
    write_polished(&input);
    let pages = MockPageSource::new()
        .with(
            "/products/1",
            &product_page(r#"{ "edges": [ {"node": {"name": "Zoë", "username": "zoe"}} ] }"#),
        )
        .with("/products/2", &product_page(r#"{"edges":[]}"#));

    // --- 2. Act ---
    let tally = run_founders(&input, &output, &pages).await?;

    // --- 3. Assert ---
    let rows = read_rows(&output);
    assert_eq!(
        rows[0],
        vec!["ph_id", "name", "tagline", "createdAt", "url", MAKERS_COLUMN]
    );
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows[1],
        vec![
            "1",
            "Foo",
            "Foo tagline",
            "2024-01-01",
            "https://foo.example.com",
            r#"{"edges":[{"node":{"name":"Zoë","username":"zoe"}}]}"#
        ]
    );
    assert_eq!(rows[2][5], r#"{"edges":[]}"#);
    assert_eq!(tally.processed, 2);
    assert_eq!(tally.resolved, 2);
    assert_eq!(
        pages.calls(),
        vec!["/products/1".to_string(), "/products/2".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn test_page_without_makers_gets_an_empty_cell() -> Result<()> {
    // --- 1. Arrange ---
    setup_tracing();
    let dir = tempdir()?;
    let input = dir.path().join("posts.csv");
    let output = dir.path().join("posts-with-founders.csv");
    write_polished(&input);
    let pages = MockPageSource::new()
        .with("/products/1", "<html><body>No data here</body></html>")
        .with("/products/2", &product_page(r#"{"edges":[]}"#));

    // --- 2. Act ---
    let tally = run_founders(&input, &output, &pages).await?;

    // --- 3. Assert ---
    let rows = read_rows(&output);
    assert_eq!(rows[1][0], "1");
    assert_eq!(rows[1][5], "");
    assert_eq!(tally.processed, 2);
    assert_eq!(tally.resolved, 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_fetch_is_left_for_the_next_run() -> Result<()> {
    // --- 1. Arrange ---
    setup_tracing();
    let dir = tempdir()?;
    let input = dir.path().join("posts.csv");
    let output = dir.path().join("posts-with-founders.csv");
    write_polished(&input);
    let offline = MockPageSource::new().with("/products/2", &product_page(r#"{"edges":[]}"#));

    // --- 2. Act ---
    let first = run_founders(&input, &output, &offline).await?;
    let online = MockPageSource::new()
        .with("/products/1", &product_page(r#"{"edges":[1]}"#))
        .with("/products/2", &product_page(r#"{"edges":[2]}"#));
    let second = run_founders(&input, &output, &online).await?;

    // --- 3. Assert ---
    assert_eq!(first.skipped_failed, 1);
    assert_eq!(first.processed, 1);
    assert_eq!(second.processed, 1);
    assert_eq!(second.skipped_duplicate, 1);
    assert_eq!(online.calls(), vec!["/products/1".to_string()]);

    let rows = read_rows(&output);
    let ids: Vec<&str> = rows[1..].iter().map(|r| r[0].as_str()).collect();
    assert_eq!(ids, vec!["2", "1"]);
    assert_eq!(rows[2][5], r#"{"edges":[1]}"#);
    Ok(())
}

#[tokio::test]
async fn test_input_without_id_column_is_rejected() -> Result<()> {
    // --- 1. Arrange ---
    setup_tracing();
    let dir = tempdir()?;
    let input = dir.path().join("posts.csv");
    let output = dir.path().join("posts-with-founders.csv");
    fs::write(&input, "id,name\n1,Foo\n")?;

    // --- 2. Act ---
    let result = run_founders(&input, &output, &MockPageSource::new()).await;

    // --- 3. Assert ---
    assert!(matches!(
        result,
        Err(PipelineError::Store(StoreError::MissingColumn { .. }))
    ));
    assert!(!output.exists());
    Ok(())
}

#[tokio::test]
async fn test_rows_with_wrong_field_count_are_counted_as_malformed() -> Result<()> {
    // --- 1. Arrange ---
    setup_tracing();
    let dir = tempdir()?;
    let input = dir.path().join("posts.csv");
    let output = dir.path().join("posts-with-founders.csv");
    fs::write(
        &input,
        "ph_id,name\n1,Foo\n2,Bar,extra\n,Nameless\n3,Baz\n",
    )?;
    let pages = MockPageSource::new()
        .with("/products/1", &product_page("{}"))
        .with("/products/3", &product_page("{}"));

    // --- 2. Act ---
    let tally = run_founders(&input, &output, &pages).await?;

    // --- 3. Assert ---
    assert_eq!(tally.total, 4);
    assert_eq!(tally.malformed, 1);
    assert_eq!(tally.skipped_incomplete, 1);
    assert_eq!(tally.processed, 2);
    assert_eq!(read_rows(&output).len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_http_page_fetcher_reads_product_pages() -> Result<()> {
    // --- 1. Arrange ---
    setup_tracing();
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page("{\"n\":1}")))
        .expect(1)
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/products/2"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&site)
        .await;
    let config = HttpConfig {
        base_url: site.uri(),
        requests_per_second: 1,
        ..Default::default()
    };
    let clock = Arc::new(ManualClock::new());
    let fetcher = HttpPageFetcher::new(SiteClient::with_clock(&config, clock.clone())?);

    // --- 2. Act ---
    let found = fetcher.fetch_page("/products/1").await;
    let missing = fetcher.fetch_page("/products/2").await;

    // --- 3. Assert ---
    assert!(found.is_some_and(|html| html.contains("\"makers\"")));
    assert_eq!(missing, None);
    // The second request waited for the one-per-second limit.
    assert_eq!(clock.sleeps().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_end_to_end_with_http_page_fetcher() -> Result<()> {
    // --- 1. Arrange ---
    setup_tracing();
    let dir = tempdir()?;
    let input = dir.path().join("posts.csv");
    let output = dir.path().join("posts-with-founders.csv");
    write_polished(&input);

    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page("{\"edges\":[\"a\"]}")))
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/products/2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&site)
        .await;
    let config = HttpConfig {
        base_url: site.uri(),
        ..Default::default()
    };
    let fetcher = HttpPageFetcher::new(SiteClient::with_clock(
        &config,
        Arc::new(ManualClock::new()),
    )?);

    // --- 2. Act ---
    let tally = run_founders(&input, &output, &fetcher).await?;

    // --- 3. Assert ---
    let rows = read_rows(&output);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][5], r#"{"edges":["a"]}"#);
    assert_eq!(tally.skipped_failed, 1);
    Ok(())
}
