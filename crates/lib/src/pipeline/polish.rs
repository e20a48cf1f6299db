//! # Polish Stage
//!
//! Reads extracted posts from NDJSON, resolves each post's shortened URL and
//! appends `ph_id,name,tagline,createdAt,url` rows to a CSV store.

use super::{field_text, is_truthy, RecordOutcome, Tally};
use crate::errors::PipelineError;
use crate::resolver::UrlResolver;
use crate::store::{count_records, InputLine, NdjsonReader, OutputStore};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Output columns of the polish stage, in order.
pub const POLISHED_COLUMNS: [&str; 5] = ["ph_id", "name", "tagline", "createdAt", "url"];

/// Input fields a post needs before its URL is worth resolving.
pub const REQUIRED_FIELDS: [&str; 5] = ["id", "name", "tagline", "createdAt", "shortenedUrl"];

/// A post with every required field present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCandidate {
    pub id: String,
    pub name: String,
    pub tagline: String,
    pub created_at: String,
    pub shortened_url: String,
}

impl PostCandidate {
    /// Returns `None` unless every field in [`REQUIRED_FIELDS`] is present and
    /// truthy.
    pub fn from_record(record: &Value) -> Option<Self> {
        let field = |key: &str| record.get(key).filter(|v| is_truthy(v)).map(field_text);
        Some(Self {
            id: field("id")?,
            name: field("name")?,
            tagline: field("tagline")?,
            created_at: field("createdAt")?,
            shortened_url: field("shortenedUrl")?,
        })
    }
}

/// Drives records through resolution into the output store.
pub struct PolishPipeline<'a> {
    resolver: &'a dyn UrlResolver,
    store: OutputStore,
    seen_ids: HashSet<String>,
    tally: Tally,
}

impl<'a> PolishPipeline<'a> {
    /// Opens the output store and loads the ids it already holds.
    pub fn open(output: &Path, resolver: &'a dyn UrlResolver) -> Result<Self, PipelineError> {
        let header: Vec<String> = POLISHED_COLUMNS.iter().map(|c| c.to_string()).collect();
        let (store, seen_ids) = OutputStore::open(output, &header, POLISHED_COLUMNS[0])?;
        Ok(Self {
            resolver,
            store,
            seen_ids,
            tally: Tally::default(),
        })
    }

    pub fn set_total(&mut self, total: usize) {
        self.tally.total = total;
    }

    /// Processes one parsed input record.
    ///
    /// Only storage failures are returned as errors; every other failure is
    /// an outcome.
    pub async fn process_record(&mut self, record: &Value) -> Result<RecordOutcome, PipelineError> {
        let outcome = self.classify_and_enrich(record).await?;
        self.tally.record(&outcome);
        Ok(outcome)
    }

    /// Processes one input line as read from the NDJSON store.
    pub async fn process_line(&mut self, line: InputLine) -> Result<RecordOutcome, PipelineError> {
        match line {
            InputLine::Record(record) => self.process_record(&record).await,
            InputLine::Malformed(reason) => {
                debug!("Skipping malformed input line: {reason}");
                self.tally.record(&RecordOutcome::Malformed);
                Ok(RecordOutcome::Malformed)
            }
        }
    }

    async fn classify_and_enrich(&mut self, record: &Value) -> Result<RecordOutcome, PipelineError> {
        let Some(post) = PostCandidate::from_record(record) else {
            return Ok(RecordOutcome::Incomplete);
        };
        if self.seen_ids.contains(&post.id) {
            return Ok(RecordOutcome::Duplicate { id: post.id });
        }

        let Some(url) = self.resolver.resolve(&post.shortened_url).await else {
            return Ok(RecordOutcome::ResolutionFailed { id: post.id });
        };

        self.store.append([
            post.id.as_str(),
            post.name.as_str(),
            post.tagline.as_str(),
            post.created_at.as_str(),
            url.as_str(),
        ])?;
        self.seen_ids.insert(post.id.clone());
        Ok(RecordOutcome::Enriched {
            id: post.id,
            resolved: true,
        })
    }

    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    pub fn finish(self) -> Tally {
        self.tally
    }
}

/// Runs the polish stage from an NDJSON input to a CSV output.
#[instrument(skip_all, fields(input = %input.display(), output = %output.display()))]
pub async fn run_polish(
    input: &Path,
    output: &Path,
    resolver: &dyn UrlResolver,
) -> Result<Tally, PipelineError> {
    let total = count_records(input)?;
    let mut pipeline = PolishPipeline::open(output, resolver)?;
    pipeline.set_total(total);
    info!("Processing {total} posts");

    for line in NdjsonReader::open(input)? {
        pipeline.process_line(line?).await?;
    }

    let tally = pipeline.finish();
    info!("Polish stage complete: {tally}");
    Ok(tally)
}
