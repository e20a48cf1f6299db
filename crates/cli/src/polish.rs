use anyhow::{Context, Result};
use clap::Parser;
use postharvest::constants::{
    DEFAULT_BASE_URL, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLISH_RATE_LIMIT, DEFAULT_POSTS_CSV,
    DEFAULT_POSTS_NDJSON,
};
use postharvest::{run_polish, HttpConfig, HttpResolver, RetryPolicy, SiteClient};
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct PolishArgs {
    /// The NDJSON file of extracted posts
    #[arg(long, default_value = DEFAULT_POSTS_NDJSON)]
    input: PathBuf,
    /// The CSV file to append polished rows to
    #[arg(long, default_value = DEFAULT_POSTS_CSV)]
    output: PathBuf,
    /// Maximum requests per second against the site
    #[arg(long, env = "POSTHARVEST_RATE_LIMIT", default_value_t = DEFAULT_POLISH_RATE_LIMIT)]
    rate_limit: usize,
    /// Attempts per short link before it is left for the next run
    #[arg(long, env = "POSTHARVEST_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,
    /// The site short links are resolved against
    #[arg(long, env = "POSTHARVEST_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
}

pub async fn handle_polish(args: &PolishArgs) -> Result<()> {
    println!(
        "🔗 Resolving short links from '{}' at {} requests/second...",
        args.input.display(),
        args.rate_limit
    );

    let config = HttpConfig {
        base_url: args.base_url.clone(),
        requests_per_second: args.rate_limit,
        ..Default::default()
    };
    let site = SiteClient::new(&config).context("Failed to set up the site client")?;
    let resolver = HttpResolver::new(
        site,
        RetryPolicy {
            max_attempts: args.max_attempts,
            ..Default::default()
        },
    );

    let tally = run_polish(&args.input, &args.output, &resolver).await?;

    println!(
        "✅ Polished {} of {} posts into '{}'.",
        tally.processed,
        tally.total,
        args.output.display()
    );
    println!(
        "   Skipped: {} incomplete, {} already present, {} unresolved, {} malformed.",
        tally.skipped_incomplete, tally.skipped_duplicate, tally.skipped_failed, tally.malformed
    );
    Ok(())
}
