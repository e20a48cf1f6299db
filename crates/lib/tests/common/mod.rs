#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Mock resolvers and page sources, store fixtures and tracing setup shared
//! by the integration tests.

use async_trait::async_trait;
use postharvest::{PageSource, UrlResolver};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

/// Initializes tracing for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

// --- Mock URL Resolver ---

/// Resolves only the paths it has been given answers for.
#[derive(Clone, Debug, Default)]
pub struct MockResolver {
    answers: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, path: &str, url: &str) -> Self {
        self.answers
            .lock()
            .unwrap()
            .insert(path.to_string(), url.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UrlResolver for MockResolver {
    async fn resolve(&self, path: &str) -> Option<String> {
        self.calls.lock().unwrap().push(path.to_string());
        self.answers.lock().unwrap().get(path).cloned()
    }
}

// --- Mock Page Source ---

#[derive(Clone, Debug, Default)]
pub struct MockPageSource {
    pages: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockPageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, path: &str, html: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(path.to_string(), html.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for MockPageSource {
    async fn fetch_page(&self, path: &str) -> Option<String> {
        self.calls.lock().unwrap().push(path.to_string());
        self.pages.lock().unwrap().get(path).cloned()
    }
}

// --- Fixtures ---

/// A post record carrying every required field.
pub fn post(id: u64, name: &str, short: &str) -> Value {
    json!({
        "__typename": "Post",
        "id": id,
        "name": name,
        "tagline": format!("{name} tagline"),
        "createdAt": "2024-01-01T08:00:00Z",
        "shortenedUrl": short,
    })
}

/// Writes `lines` to `path`, one per line.
pub fn write_lines(path: &Path, lines: &[String]) {
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(path, content).expect("Failed to write fixture file");
}

/// Reads a CSV file into rows of strings, header included.
pub fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .expect("Failed to open CSV output");
    reader
        .records()
        .map(|r| {
            r.expect("Failed to read CSV row")
                .iter()
                .map(str::to_string)
                .collect()
        })
        .collect()
}
