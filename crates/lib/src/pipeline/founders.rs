//! # Founders Stage
//!
//! Reads the polished CSV, fetches each post's product page and appends the
//! row with its `makers` object (compact JSON) as an extra column.

use super::{RecordOutcome, Tally};
use crate::errors::{PipelineError, StoreError};
use crate::extractor::extract_makers;
use crate::fetch::{product_page_path, PageSource};
use crate::store::OutputStore;
use csv::StringRecord;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, instrument};

/// The column posts are identified by, in both input and output.
pub const FOUNDERS_ID_COLUMN: &str = "ph_id";

/// The column appended to every input row.
pub const MAKERS_COLUMN: &str = "makers_object";

/// Drives polished rows through page fetching into the output store.
pub struct FoundersPipeline<'a> {
    pages: &'a dyn PageSource,
    store: OutputStore,
    seen_ids: HashSet<String>,
    id_index: usize,
    tally: Tally,
}

impl<'a> FoundersPipeline<'a> {
    /// Opens the output store for rows shaped like `input_header`.
    pub fn open(
        output: &Path,
        input_header: &[String],
        pages: &'a dyn PageSource,
    ) -> Result<Self, PipelineError> {
        let mut header = input_header.to_vec();
        header.push(MAKERS_COLUMN.to_string());
        let (store, seen_ids) = OutputStore::open(output, &header, FOUNDERS_ID_COLUMN)?;
        let id_index = input_header
            .iter()
            .position(|column| column == FOUNDERS_ID_COLUMN)
            .ok_or_else(|| StoreError::MissingColumn {
                path: output.to_path_buf(),
                column: FOUNDERS_ID_COLUMN.to_string(),
            })?;
        Ok(Self {
            pages,
            store,
            seen_ids,
            id_index,
            tally: Tally::default(),
        })
    }

    pub fn set_total(&mut self, total: usize) {
        self.tally.total = total;
    }

    /// Processes one input row. Only storage failures are errors.
    pub async fn process_row(&mut self, row: &StringRecord) -> Result<RecordOutcome, PipelineError> {
        let outcome = self.fetch_and_enrich(row).await?;
        self.tally.record(&outcome);
        Ok(outcome)
    }

    /// Counts an input row that could not be read.
    pub fn record_malformed(&mut self) -> RecordOutcome {
        self.tally.record(&RecordOutcome::Malformed);
        RecordOutcome::Malformed
    }

    async fn fetch_and_enrich(&mut self, row: &StringRecord) -> Result<RecordOutcome, PipelineError> {
        let id = row.get(self.id_index).unwrap_or_default().to_string();
        if id.is_empty() {
            return Ok(RecordOutcome::Incomplete);
        }
        if self.seen_ids.contains(&id) {
            return Ok(RecordOutcome::Duplicate { id });
        }

        let Some(html) = self.pages.fetch_page(&product_page_path(&id)).await else {
            return Ok(RecordOutcome::ResolutionFailed { id });
        };
        let makers = extract_makers(&html);
        if makers.is_none() {
            debug!("No makers object on the product page of {id}");
        }

        let makers_cell = makers.as_deref().unwrap_or_default();
        self.store.append(row.iter().chain([makers_cell]))?;
        self.seen_ids.insert(id.clone());
        Ok(RecordOutcome::Enriched {
            id,
            resolved: makers.is_some(),
        })
    }

    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    pub fn finish(self) -> Tally {
        self.tally
    }
}

fn open_input(input: &Path) -> Result<csv::Reader<std::fs::File>, StoreError> {
    csv::Reader::from_path(input).map_err(|source| StoreError::Csv {
        path: input.to_path_buf(),
        source,
    })
}

/// Runs the founders stage from a polished CSV to an enriched CSV.
#[instrument(skip_all, fields(input = %input.display(), output = %output.display()))]
pub async fn run_founders(
    input: &Path,
    output: &Path,
    pages: &dyn PageSource,
) -> Result<Tally, PipelineError> {
    let total = open_input(input)?.records().count();

    let mut reader = open_input(input)?;
    let header: Vec<String> = reader
        .headers()
        .map_err(|source| StoreError::Csv {
            path: input.to_path_buf(),
            source,
        })?
        .iter()
        .map(str::to_string)
        .collect();
    if !header.iter().any(|column| column == FOUNDERS_ID_COLUMN) {
        return Err(StoreError::MissingColumn {
            path: input.to_path_buf(),
            column: FOUNDERS_ID_COLUMN.to_string(),
        }
        .into());
    }

    let mut pipeline = FoundersPipeline::open(output, &header, pages)?;
    pipeline.set_total(total);
    info!("Processing {total} posts");

    for row in reader.records() {
        match row {
            Ok(row) => {
                pipeline.process_row(&row).await?;
            }
            Err(source) if source.is_io_error() => {
                return Err(StoreError::Csv {
                    path: input.to_path_buf(),
                    source,
                }
                .into());
            }
            Err(e) => {
                debug!("Skipping unreadable row: {e}");
                pipeline.record_malformed();
            }
        }
    }

    let tally = pipeline.finish();
    info!("Founders stage complete: {tally}");
    Ok(tally)
}
