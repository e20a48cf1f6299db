//! # Archived Snapshots
//!
//! Snapshots live at `<base>/history/YYYY/MM/DD`, one page per day. The
//! extract stage walks a date range of them, pulls every embedded post out of
//! each page and streams the posts to an NDJSON file.

use crate::errors::{HistoryError, StoreError};
use crate::extractor::{extract_posts, EmbeddedRecord};
use crate::store::NdjsonWriter;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// The snapshot path for a single day.
pub fn snapshot_path(base: &Path, day: NaiveDate) -> PathBuf {
    base.join("history")
        .join(day.format("%Y").to_string())
        .join(day.format("%m").to_string())
        .join(day.format("%d").to_string())
}

/// Every existing snapshot between `start` and `end`, inclusive, in date
/// order.
pub fn snapshot_paths(
    base: &Path,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<PathBuf>, HistoryError> {
    if start > end {
        return Err(HistoryError::InvertedRange { start, end });
    }
    Ok(start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| snapshot_path(base, day))
        .filter(|path| path.is_file())
        .collect())
}

/// Extracts the posts from one snapshot. An unreadable file is logged and
/// yields no posts.
pub fn extract_posts_from_file(path: &Path) -> Vec<EmbeddedRecord> {
    match fs::read_to_string(path) {
        Ok(content) => extract_posts(&content),
        Err(e) => {
            warn!("Error processing {}: {e}", path.display());
            Vec::new()
        }
    }
}

/// Totals from one extract run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub files: usize,
    pub posts: usize,
}

/// Extracts the posts of every file in `files` into a fresh NDJSON file at
/// `output`, one file's posts at a time.
#[instrument(skip_all, fields(files = files.len(), output = %output.display()))]
pub fn run_extraction(files: &[PathBuf], output: &Path) -> Result<ExtractionSummary, StoreError> {
    let mut writer = NdjsonWriter::create(output)?;
    let mut summary = ExtractionSummary::default();

    for path in files {
        let posts = extract_posts_from_file(path);
        for post in &posts {
            writer.write_record(post)?;
        }
        summary.files += 1;
        info!(
            "{}: {} posts ({} total)",
            path.display(),
            posts.len(),
            writer.written()
        );
    }

    summary.posts = writer.finish()?;
    Ok(summary)
}
