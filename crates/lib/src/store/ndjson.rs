//! Line-delimited JSON: one independently parseable object per line.

use crate::errors::StoreError;
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Split, Write};
use std::path::{Path, PathBuf};

/// One non-blank line of an NDJSON store.
#[derive(Debug)]
pub enum InputLine {
    Record(Value),
    /// The line was not valid JSON. Carries the parse error message.
    Malformed(String),
}

/// Iterates the non-blank lines of an NDJSON file.
///
/// Lines are read as bytes so that a line with invalid UTF-8 is reported as
/// [`InputLine::Malformed`] rather than aborting the read.
pub struct NdjsonReader {
    path: PathBuf,
    lines: Split<BufReader<File>>,
}

impl NdjsonReader {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let file = File::open(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).split(b'\n'),
        })
    }
}

impl Iterator for NdjsonReader {
    type Item = Result<InputLine, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(source) => {
                    return Some(Err(StoreError::Read {
                        path: self.path.clone(),
                        source,
                    }))
                }
            };
            let trimmed = line.trim_ascii();
            if trimmed.is_empty() {
                continue;
            }
            return Some(Ok(match serde_json::from_slice(trimmed) {
                Ok(value) => InputLine::Record(value),
                Err(e) => InputLine::Malformed(e.to_string()),
            }));
        }
    }
}

/// Counts the non-blank lines of an NDJSON file.
pub fn count_records(path: &Path) -> Result<usize, StoreError> {
    let file = File::open(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut count = 0;
    for line in BufReader::new(file).split(b'\n') {
        let line = line.map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if !line.trim_ascii().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}

/// Writes one compact JSON object per line to a freshly truncated file.
pub struct NdjsonWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    written: usize,
}

impl NdjsonWriter {
    pub fn create(path: &Path) -> Result<Self, StoreError> {
        let file = File::create(path).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn write_record<T: Serialize>(&mut self, record: &T) -> Result<(), StoreError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer
            .write_all(b"\n")
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Flushes buffered lines and returns how many records were written.
    pub fn finish(mut self) -> Result<usize, StoreError> {
        self.writer.flush().map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        Ok(self.written)
    }
}
