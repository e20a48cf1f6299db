use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use postharvest::constants::DEFAULT_POSTS_NDJSON;
use postharvest::{run_extraction, snapshot_paths};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// First snapshot day to read, as YYYY-MM-DD
    #[arg(long)]
    start_date: NaiveDate,
    /// Last snapshot day to read (inclusive), as YYYY-MM-DD
    #[arg(long)]
    end_date: NaiveDate,
    /// Directory containing the `history/YYYY/MM/DD` snapshot tree
    #[arg(long, env = "POSTHARVEST_BASE_PATH", default_value = ".")]
    base_path: PathBuf,
    /// The NDJSON file to write extracted posts to (overwritten)
    #[arg(long, default_value = DEFAULT_POSTS_NDJSON)]
    output: PathBuf,
}

pub fn handle_extract(args: &ExtractArgs) -> Result<()> {
    let files = snapshot_paths(&args.base_path, args.start_date, args.end_date)?;
    info!(
        "Found {} snapshots between {} and {}",
        files.len(),
        args.start_date,
        args.end_date
    );
    println!(
        "📂 Extracting posts from {} snapshots under '{}'...",
        files.len(),
        args.base_path.display()
    );

    let summary = run_extraction(&files, &args.output)?;

    println!(
        "✅ Extracted {} posts from {} files into '{}'.",
        summary.posts,
        summary.files,
        args.output.display()
    );
    Ok(())
}
