//! # Shared Constants
//!
//! Defaults and markers shared by the library stages and the CLI.

use std::time::Duration;

/// The site every redirect path and product page is resolved against.
pub const DEFAULT_BASE_URL: &str = "https://producthunt.com";

/// Sent with every request so the site operator can identify the client.
pub const DEFAULT_USER_AGENT: &str = "postharvest/0.1 (archived post enrichment)";

/// Anchors a post object inside an archived page.
pub const POST_MARKER: &str = r#"{"__typename":"Post""#;

/// The `__typename` value a post object must carry.
pub const POST_TYPENAME: &str = "Post";

/// Anchors the makers object inside a product page.
pub const MAKERS_MARKER: &str = r#""makers":"#;

/// Requests per second for the polish stage.
pub const DEFAULT_POLISH_RATE_LIMIT: usize = 15;

/// Requests per second for the founders stage.
pub const DEFAULT_FOUNDERS_RATE_LIMIT: usize = 8;

/// Attempts per redirect path before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Base of the exponential backoff applied to HTTP 429 responses.
pub const THROTTLE_BACKOFF_BASE: Duration = Duration::from_secs(5);

/// Fixed delay between attempts after a transient transport error.
pub const TRANSIENT_RETRY_DELAY: Duration = Duration::from_millis(500);

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Trailing window the rate limiter counts admissions over.
pub const RATE_WINDOW: Duration = Duration::from_secs(1);

/// How many input records pass between progress log lines.
pub const PROGRESS_INTERVAL: usize = 100;

pub const DEFAULT_POSTS_NDJSON: &str = "posts.ndjson";
pub const DEFAULT_POSTS_CSV: &str = "posts.csv";
pub const DEFAULT_FOUNDERS_CSV: &str = "posts-with-founders.csv";
