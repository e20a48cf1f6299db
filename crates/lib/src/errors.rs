use std::path::PathBuf;
use thiserror::Error;

/// Failures reading or writing the line-delimited and tabular stores.
///
/// Every variant is fatal for a stage: a store that cannot be read or written
/// aborts the run instead of silently producing incomplete output.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("CSV error in '{path}': {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("Failed to encode record as JSON: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("'{path}' has header {found:?}, expected {expected:?}")]
    HeaderMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("'{path}' has no '{column}' column")]
    MissingColumn { path: PathBuf, column: String },
}

/// Failures setting up the shared HTTP client.
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Failed to build Reqwest client: {0}")]
    ClientBuild(#[from] reqwest::Error),
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("Rate limit must allow at least one request per second")]
    ZeroRateLimit,
}

/// Failures enumerating archived snapshots.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Start date {start} is after end date {end}")]
    InvertedRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Setup failures that terminate a pipeline stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Http(#[from] HttpError),
}
