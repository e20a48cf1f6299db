//! # Resumable Record Pipeline
//!
//! Both enrichment stages share the same shape: load the ids already in the
//! output store, walk the input in order, and for each record either skip it
//! with a classification or enrich it and append it to the output at once.
//! Re-running a stage after an interruption picks up where it stopped.

pub mod founders;
pub mod polish;

pub use founders::{run_founders, FoundersPipeline, FOUNDERS_ID_COLUMN, MAKERS_COLUMN};
pub use polish::{run_polish, PolishPipeline, PostCandidate, POLISHED_COLUMNS};

use crate::constants::PROGRESS_INTERVAL;
use serde_json::Value;
use std::fmt;
use tracing::info;

/// The terminal state of one input record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Written to the output store. `resolved` is `false` when the record was
    /// written without the enrichment it was looking for.
    Enriched { id: String, resolved: bool },
    /// A required field was missing or empty.
    Incomplete,
    /// The id was already in the output store.
    Duplicate { id: String },
    /// The network lookup gave up; nothing was written.
    ResolutionFailed { id: String },
    /// The input line or row could not be parsed.
    Malformed,
}

/// Running counts of record outcomes for one stage run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    /// Input records counted up front, for progress reporting.
    pub total: usize,
    /// Records that reached a terminal state.
    pub seen: usize,
    /// Rows written to the output store.
    pub processed: usize,
    /// Written rows that carry their enrichment.
    pub resolved: usize,
    pub skipped_incomplete: usize,
    pub skipped_duplicate: usize,
    pub skipped_failed: usize,
    pub malformed: usize,
}

impl Tally {
    pub fn with_total(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: &RecordOutcome) {
        self.seen += 1;
        match outcome {
            RecordOutcome::Enriched { resolved, .. } => {
                self.processed += 1;
                if *resolved {
                    self.resolved += 1;
                }
            }
            RecordOutcome::Incomplete => self.skipped_incomplete += 1,
            RecordOutcome::Duplicate { .. } => self.skipped_duplicate += 1,
            RecordOutcome::ResolutionFailed { .. } => self.skipped_failed += 1,
            RecordOutcome::Malformed => self.malformed += 1,
        }
        if self.seen % PROGRESS_INTERVAL == 0 {
            info!("Progress {}/{}: {self}", self.seen, self.total);
        }
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} resolved={} skipped_incomplete={} skipped_duplicate={} skipped_failed={} malformed={}",
            self.processed,
            self.resolved,
            self.skipped_incomplete,
            self.skipped_duplicate,
            self.skipped_failed,
            self.malformed
        )
    }
}

/// Whether a JSON value counts as present: `null`, `false`, zero, the empty
/// string and empty containers do not.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Renders a field for output: strings verbatim, anything else as JSON, so
/// that `1` and `"1"` both become `1`.
pub fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_matches_missing_field_rules() {
        for falsy in [json!(null), json!(false), json!(0), json!(""), json!([]), json!({})] {
            assert!(!is_truthy(&falsy), "{falsy} should be falsy");
        }
        for truthy in [json!(true), json!(7), json!("x"), json!([0]), json!({"a": 1})] {
            assert!(is_truthy(&truthy), "{truthy} should be truthy");
        }
    }

    #[test]
    fn numeric_and_string_ids_normalise_alike() {
        assert_eq!(field_text(&json!(1)), "1");
        assert_eq!(field_text(&json!("1")), "1");
    }

    #[test]
    fn tally_counts_each_outcome() {
        let mut tally = Tally::with_total(6);
        for outcome in [
            RecordOutcome::Enriched { id: "1".into(), resolved: true },
            RecordOutcome::Enriched { id: "2".into(), resolved: false },
            RecordOutcome::Incomplete,
            RecordOutcome::Duplicate { id: "1".into() },
            RecordOutcome::ResolutionFailed { id: "3".into() },
            RecordOutcome::Malformed,
        ] {
            tally.record(&outcome);
        }
        assert_eq!(
            tally,
            Tally {
                total: 6,
                seen: 6,
                processed: 2,
                resolved: 1,
                skipped_incomplete: 1,
                skipped_duplicate: 1,
                skipped_failed: 1,
                malformed: 1,
            }
        );
    }
}
