//! # Append-Only CSV Output Store
//!
//! Every enriched record is appended and flushed on its own, so a run that is
//! killed leaves at most one half-written row at the end of the file. Opening
//! the store trims such a row before appending again.

use crate::errors::StoreError;
use csv::{ByteRecord, QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What an existing output file holds, as far as resuming is concerned.
#[derive(Debug, Default)]
struct ExistingTable {
    header: Option<Vec<String>>,
    ids: HashSet<String>,
    /// Byte length of the file up to the end of its last complete record.
    complete_len: u64,
    file_len: u64,
}

fn scan_existing(path: &Path, id_column: &str) -> Result<ExistingTable, StoreError> {
    let bytes = fs::read(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut table = ExistingTable {
        file_len: bytes.len() as u64,
        ..Default::default()
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes.as_slice());
    let mut record = ByteRecord::new();
    let mut id_index = None;
    let mut start = 0usize;

    loop {
        let more = reader
            .read_byte_record(&mut record)
            .map_err(|source| StoreError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
        if !more {
            break;
        }
        let end = reader.position().byte() as usize;
        let raw = &bytes[start..end];
        start = end;
        // An odd quote count means the file ended inside a quoted field.
        let terminated = matches!(raw.last(), Some(b'\n' | b'\r'))
            && raw.iter().filter(|&&b| b == b'"').count() % 2 == 0;

        match &table.header {
            None => {
                if !terminated {
                    break;
                }
                let header: Vec<String> = record
                    .iter()
                    .map(|field| String::from_utf8_lossy(field).into_owned())
                    .collect();
                id_index = header.iter().position(|column| column == id_column);
                table.header = Some(header);
            }
            Some(header) => {
                if !terminated || record.len() != header.len() {
                    if end == bytes.len() {
                        break;
                    }
                    warn!(
                        "Ignoring malformed row ending at byte {end} in '{}'",
                        path.display()
                    );
                    table.complete_len = end as u64;
                    continue;
                }
                if let Some(id) = id_index.and_then(|i| record.get(i)) {
                    table.ids.insert(String::from_utf8_lossy(id).into_owned());
                }
            }
        }
        table.complete_len = end as u64;
    }

    // Terminator bytes left over after the last record are not a partial row.
    let tail = &bytes[table.complete_len as usize..];
    if table.header.is_some() && tail.iter().all(|b| matches!(b, b'\n' | b'\r')) {
        table.complete_len = table.file_len;
    }

    Ok(table)
}

/// A CSV file that rows are appended to, one flushed write per row.
pub struct OutputStore {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows_written: usize,
}

impl OutputStore {
    /// Opens (or creates) the store at `path` and returns it together with the
    /// ids already recorded under `id_column`.
    ///
    /// A new or empty file gets `header` written first. An existing file must
    /// carry exactly `header`; a trailing partial row is truncated away.
    pub fn open(
        path: &Path,
        header: &[String],
        id_column: &str,
    ) -> Result<(Self, HashSet<String>), StoreError> {
        if !header.iter().any(|column| column == id_column) {
            return Err(StoreError::MissingColumn {
                path: path.to_path_buf(),
                column: id_column.to_string(),
            });
        }

        let existing = if path.exists() {
            scan_existing(path, id_column)?
        } else {
            ExistingTable::default()
        };

        if let Some(found) = &existing.header {
            if found.as_slice() != header {
                return Err(StoreError::HeaderMismatch {
                    path: path.to_path_buf(),
                    expected: header.to_vec(),
                    found: found.clone(),
                });
            }
        }

        if existing.complete_len < existing.file_len {
            warn!(
                "Discarding {} bytes of partial row at the end of '{}'",
                existing.file_len - existing.complete_len,
                path.display()
            );
            let file = OpenOptions::new()
                .write(true)
                .open(path)
                .map_err(|source| StoreError::Write {
                    path: path.to_path_buf(),
                    source,
                })?;
            file.set_len(existing.complete_len)
                .map_err(|source| StoreError::Write {
                    path: path.to_path_buf(),
                    source,
                })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| StoreError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        let writer = WriterBuilder::new()
            .has_headers(false)
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(file);

        let mut store = Self {
            path: path.to_path_buf(),
            writer,
            rows_written: 0,
        };
        if existing.header.is_none() {
            store.write_and_flush(header)?;
        } else {
            info!(
                "Found {} existing entries in '{}'",
                existing.ids.len(),
                path.display()
            );
        }
        Ok((store, existing.ids))
    }

    /// Appends one row and flushes it to the file before returning.
    pub fn append<I, T>(&mut self, row: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.write_and_flush(row)?;
        self.rows_written += 1;
        Ok(())
    }

    fn write_and_flush<I, T>(&mut self, row: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .write_record(row)
            .map_err(|source| StoreError::Csv {
                path: self.path.clone(),
                source,
            })?;
        self.writer.flush().map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Rows appended by this handle, excluding the header.
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
