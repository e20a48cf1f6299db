//! # Redirect Resolver
//!
//! Turns a site-relative redirect path (for example `/r/abc`) into the
//! external URL it lands on. A cheap `HEAD` probe is tried first; when it
//! lands back on the site itself the request is repeated as a full `GET`.
//! Throttling is retried with exponential backoff, other transport errors
//! with a short fixed delay, and DNS failures are given up on at once.

use crate::constants::{DEFAULT_MAX_ATTEMPTS, THROTTLE_BACKOFF_BASE, TRANSIENT_RETRY_DELAY};
use crate::http::SiteClient;
use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use std::error::Error as StdError;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Resolves a redirect path to its final destination.
#[async_trait]
pub trait UrlResolver: Send + Sync {
    /// Returns the resolved absolute URL, or `None` when resolution failed or
    /// was declined.
    async fn resolve(&self, path: &str) -> Option<String>;
}

/// Attempt ceiling and delays for [`HttpResolver`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: THROTTLE_BACKOFF_BASE,
            retry_delay: TRANSIENT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Wait after the `attempt`-th (zero-based) throttled response:
    /// `backoff_base × 2^attempt`.
    pub fn throttle_backoff(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// How a single probe response is classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeVerdict {
    /// Landed off-site with a 200.
    Resolved(String),
    /// A 200 that never left the site.
    SameSite,
    /// HTTP 429.
    Throttled,
    /// Any other status.
    Unexpected(StatusCode),
}

/// Classifies a response by its status and the URL it ended on after
/// following redirects.
pub fn classify_response(site: &SiteClient, status: StatusCode, final_url: &Url) -> ProbeVerdict {
    match status {
        StatusCode::OK if site.is_same_site(final_url) => ProbeVerdict::SameSite,
        StatusCode::OK => ProbeVerdict::Resolved(final_url.to_string()),
        StatusCode::TOO_MANY_REQUESTS => ProbeVerdict::Throttled,
        other => ProbeVerdict::Unexpected(other),
    }
}

const NAME_RESOLUTION_HINTS: [&str; 5] = [
    "dns error",
    "name resolution",
    "name or service not known",
    "nodename nor servname",
    "failed to lookup address",
];

/// `true` when an error, or anything in its source chain, reports that the
/// host name could not be resolved.
pub fn is_name_resolution_failure(error: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        let message = err.to_string().to_lowercase();
        if NAME_RESOLUTION_HINTS
            .iter()
            .any(|hint| message.contains(hint))
        {
            return true;
        }
        current = err.source();
    }
    false
}

/// Resolves redirect paths against the site with live HTTP requests.
pub struct HttpResolver {
    site: SiteClient,
    policy: RetryPolicy,
}

impl HttpResolver {
    pub fn new(site: SiteClient, policy: RetryPolicy) -> Self {
        Self { site, policy }
    }

    async fn probe(&self, method: Method, url: &Url) -> Result<ProbeVerdict, reqwest::Error> {
        self.site.admit().await;
        let response = self
            .site
            .client()
            .request(method, url.clone())
            .send()
            .await?;
        Ok(classify_response(
            &self.site,
            response.status(),
            response.url(),
        ))
    }

    /// One attempt: a `HEAD` probe, upgraded to a `GET` when the probe never
    /// leaves the site.
    async fn attempt(&self, url: &Url) -> Result<ProbeVerdict, reqwest::Error> {
        match self.probe(Method::HEAD, url).await? {
            ProbeVerdict::SameSite => {
                debug!("HEAD for {url} stayed on site, retrying with GET");
                self.probe(Method::GET, url).await
            }
            verdict => Ok(verdict),
        }
    }
}

#[async_trait]
impl UrlResolver for HttpResolver {
    async fn resolve(&self, path: &str) -> Option<String> {
        let Some(url) = self.site.url_for(path) else {
            warn!("Cannot build a request URL from redirect path '{path}'");
            return None;
        };
        let clock = self.site.clock();

        for attempt in 0..self.policy.max_attempts {
            let is_last = attempt + 1 == self.policy.max_attempts;
            match self.attempt(&url).await {
                Ok(ProbeVerdict::Resolved(resolved)) => {
                    debug!("Resolved {path} -> {resolved}");
                    return Some(resolved);
                }
                Ok(ProbeVerdict::Throttled) => {
                    if is_last {
                        break;
                    }
                    let wait = self.policy.throttle_backoff(attempt);
                    info!("Rate limited on {path}, waiting {}s...", wait.as_secs_f64());
                    clock.sleep(wait).await;
                }
                Ok(ProbeVerdict::SameSite) => {
                    debug!("{path} did not leave the site on attempt {}", attempt + 1);
                }
                Ok(ProbeVerdict::Unexpected(status)) => {
                    debug!("{path} answered {status} on attempt {}", attempt + 1);
                }
                Err(e) if is_name_resolution_failure(&e) => {
                    warn!("DNS error for {path}: {e}");
                    return None;
                }
                Err(e) => {
                    if is_last {
                        warn!("Error resolving {path}: {e}");
                        return None;
                    }
                    debug!("Transient error for {path}: {e}");
                    clock.sleep(self.policy.retry_delay).await;
                }
            }
        }

        warn!(
            "Failed to resolve URL after {} attempts: {path}",
            self.policy.max_attempts
        );
        None
    }
}
