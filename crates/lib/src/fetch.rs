//! # Product Page Fetcher
//!
//! Fetches product pages for the founders stage through the same rate-limited
//! site client the resolver uses.

use crate::http::SiteClient;
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

/// Retrieves the HTML of a site page.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Returns the page body, or `None` when the page is missing or the
    /// request failed.
    async fn fetch_page(&self, path: &str) -> Option<String>;
}

/// The path of a product page for a post id.
pub fn product_page_path(ph_id: &str) -> String {
    format!("/products/{ph_id}")
}

pub struct HttpPageFetcher {
    site: SiteClient,
}

impl HttpPageFetcher {
    pub fn new(site: SiteClient) -> Self {
        Self { site }
    }
}

#[async_trait]
impl PageSource for HttpPageFetcher {
    async fn fetch_page(&self, path: &str) -> Option<String> {
        let url = self.site.url_for(path)?;
        self.site.admit().await;

        let response = match self.site.client().get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to fetch {path}: {e}");
                return None;
            }
        };

        match response.status() {
            StatusCode::OK => match response.text().await {
                Ok(body) => Some(body),
                Err(e) => {
                    warn!("Failed to read body of {path}: {e}");
                    None
                }
            },
            status => {
                debug!("{path} answered {status}");
                None
            }
        }
    }
}
