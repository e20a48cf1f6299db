//! # postharvest: archived post enrichment
//!
//! This is the main entry point for the `postharvest` command-line interface.
//! Each subcommand runs one library stage; this binary only parses arguments,
//! installs logging and prints the summary.

mod extract;
mod founders;
mod polish;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

// --- CLI Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract embedded posts from dated history snapshots into NDJSON
    Extract(extract::ExtractArgs),
    /// Resolve each post's short link and write the polished CSV
    Polish(polish::PolishArgs),
    /// Fetch each post's product page and append its makers
    Founders(founders::FoundersArgs),
}

// --- Main Application Entry ---

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries only the summary.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt::Subscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match &cli.command {
        Commands::Extract(args) => report("Extract", extract::handle_extract(args)),
        Commands::Polish(args) => report("Polish", polish::handle_polish(args).await),
        Commands::Founders(args) => report("Founders", founders::handle_founders(args).await),
    }

    Ok(())
}

fn report(command: &str, result: Result<()>) {
    if let Err(e) = result {
        eprintln!("{command} failed: {e:#}");
        std::process::exit(1);
    }
}
