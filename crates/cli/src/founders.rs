use anyhow::{Context, Result};
use clap::Parser;
use postharvest::constants::{
    DEFAULT_BASE_URL, DEFAULT_FOUNDERS_CSV, DEFAULT_FOUNDERS_RATE_LIMIT, DEFAULT_POSTS_CSV,
};
use postharvest::{run_founders, HttpConfig, HttpPageFetcher, SiteClient};
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct FoundersArgs {
    /// The polished CSV produced by `polish`
    #[arg(long, default_value = DEFAULT_POSTS_CSV)]
    input: PathBuf,
    /// The CSV file to append rows with makers to
    #[arg(long, default_value = DEFAULT_FOUNDERS_CSV)]
    output: PathBuf,
    /// Maximum requests per second against the site
    #[arg(long, env = "POSTHARVEST_RATE_LIMIT", default_value_t = DEFAULT_FOUNDERS_RATE_LIMIT)]
    rate_limit: usize,
    /// The site product pages are fetched from
    #[arg(long, env = "POSTHARVEST_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
}

pub async fn handle_founders(args: &FoundersArgs) -> Result<()> {
    println!(
        "👥 Fetching makers for posts in '{}' at {} requests/second...",
        args.input.display(),
        args.rate_limit
    );

    let config = HttpConfig {
        base_url: args.base_url.clone(),
        requests_per_second: args.rate_limit,
        ..Default::default()
    };
    let site = SiteClient::new(&config).context("Failed to set up the site client")?;
    let fetcher = HttpPageFetcher::new(site);

    let tally = run_founders(&args.input, &args.output, &fetcher).await?;

    println!(
        "✅ Wrote {} rows into '{}' ({} with makers).",
        tally.processed,
        args.output.display(),
        tally.resolved
    );
    println!(
        "   Skipped: {} without id, {} already present, {} unfetched, {} malformed.",
        tally.skipped_incomplete, tally.skipped_duplicate, tally.skipped_failed, tally.malformed
    );
    Ok(())
}
