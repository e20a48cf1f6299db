//! # Record Stores
//!
//! The line-delimited JSON store that extraction writes and the polish stage
//! reads, and the append-only CSV store both enrichment stages write to.

pub mod ndjson;
pub mod table;

pub use ndjson::{count_records, InputLine, NdjsonReader, NdjsonWriter};
pub use table::OutputStore;
