//! # Site Client
//!
//! A `reqwest` client bound to the single host this tool talks to, gated by a
//! shared [`RateLimiter`]. Both the URL resolver and the product page fetcher
//! are built on top of it.

use crate::clock::{Clock, SystemClock};
use crate::constants::{
    CONNECT_TIMEOUT, DEFAULT_BASE_URL, DEFAULT_POLISH_RATE_LIMIT, DEFAULT_USER_AGENT,
    REQUEST_TIMEOUT,
};
use crate::errors::HttpError;
use crate::rate_limit::RateLimiter;
use reqwest::{Client, Url};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Connection settings for the target site.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub base_url: String,
    pub user_agent: String,
    pub requests_per_second: usize,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            requests_per_second: DEFAULT_POLISH_RATE_LIMIT,
            connect_timeout: CONNECT_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

/// The HTTP client, base URL, rate limiter and clock shared by every request
/// against the site.
#[derive(Clone)]
pub struct SiteClient {
    client: Client,
    base: Url,
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
}

impl SiteClient {
    pub fn new(config: &HttpConfig) -> Result<Self, HttpError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Builds a client whose rate limiting and retry delays run on `clock`.
    pub fn with_clock(config: &HttpConfig, clock: Arc<dyn Clock>) -> Result<Self, HttpError> {
        if config.requests_per_second == 0 {
            return Err(HttpError::ZeroRateLimit);
        }
        let base = Url::parse(&config.base_url).map_err(|e| HttpError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base.host_str().is_none() {
            return Err(HttpError::InvalidBaseUrl {
                url: config.base_url.clone(),
                reason: "URL has no host".to_string(),
            });
        }

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        info!(
            "Site client ready for {} at {} requests/second",
            base, config.requests_per_second
        );

        Ok(Self {
            client,
            base,
            limiter: Arc::new(RateLimiter::with_clock(
                config.requests_per_second,
                clock.clone(),
            )),
            clock,
        })
    }

    /// Resolves a site-relative path against the base URL.
    pub fn url_for(&self, path: &str) -> Option<Url> {
        self.base.join(path).ok()
    }

    /// `true` when `url` points at the same scheme, host and port as the site.
    pub fn is_same_site(&self, url: &Url) -> bool {
        url.origin() == self.base.origin()
    }

    /// Waits for the rate limiter. Call before every request.
    pub async fn admit(&self) {
        self.limiter.admit().await;
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
