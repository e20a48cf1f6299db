//! # postharvest
//!
//! Pulls embedded post records out of archived HTML snapshots and enriches
//! them with live lookups against the site they came from.
//!
//! The work is split into stages that each read one store and write another:
//!
//! 1. **extract** ([`history`]): snapshots → posts NDJSON, using the
//!    brace-depth [`extractor`].
//! 2. **polish** ([`pipeline::polish`]): posts NDJSON → posts CSV, resolving
//!    each shortened URL through the [`resolver`].
//! 3. **founders** ([`pipeline::founders`]): posts CSV → posts-with-founders
//!    CSV, pulling the makers object from each product page.
//!
//! The network stages share one rate-limited [`http::SiteClient`] and are
//! resumable: rows are appended and flushed one at a time, and a re-run skips
//! every id already in its output.

pub mod clock;
pub mod constants;
pub mod errors;
pub mod extractor;
pub mod fetch;
pub mod history;
pub mod http;
pub mod pipeline;
pub mod rate_limit;
pub mod resolver;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{HistoryError, HttpError, PipelineError, StoreError};
pub use extractor::{extract_makers, extract_objects, extract_posts, EmbeddedRecord};
pub use fetch::{HttpPageFetcher, PageSource};
pub use history::{run_extraction, snapshot_paths, ExtractionSummary};
pub use http::{HttpConfig, SiteClient};
pub use pipeline::{run_founders, run_polish, RecordOutcome, Tally};
pub use rate_limit::RateLimiter;
pub use resolver::{HttpResolver, RetryPolicy, UrlResolver};
pub use store::OutputStore;
