//! # Embedded-Object Extractor
//!
//! Archived pages are HTML with JSON payloads scattered through inline
//! scripts. Rather than parsing the page, this module anchors on a marker
//! substring and walks forward with a brace-depth scan to find where each
//! embedded object closes, then hands only that span to `serde_json`.
//!
//! The scan works on bytes. Every delimiter it cares about (`{`, `}`, `"`,
//! `\`) is ASCII, and UTF-8 continuation bytes never collide with ASCII, so
//! every span boundary it reports is also a `char` boundary.

use crate::constants::{MAKERS_MARKER, POST_MARKER, POST_TYPENAME};
use serde_json::{Map, Value};
use tracing::debug;

/// A JSON object decoded from an embedded span.
pub type EmbeddedRecord = Map<String, Value>;

/// Lexical state of the brace-depth scan.
#[derive(Debug, Default)]
struct ScanState {
    depth: usize,
    in_string: bool,
    escape_next: bool,
}

impl ScanState {
    /// Feeds one byte. Returns `true` when it closes the outermost object.
    fn step(&mut self, byte: u8) -> bool {
        if self.escape_next {
            self.escape_next = false;
            return false;
        }
        match byte {
            b'\\' => self.escape_next = true,
            b'"' => self.in_string = !self.in_string,
            b'{' if !self.in_string => self.depth += 1,
            b'}' if !self.in_string && self.depth > 0 => {
                self.depth -= 1;
                return self.depth == 0;
            }
            _ => {}
        }
        false
    }
}

/// Finds the first `{` at or after `from` that is neither escaped nor inside
/// a string literal.
pub fn find_object_start(text: &str, from: usize) -> Option<usize> {
    let mut state = ScanState::default();
    for (offset, &byte) in text.as_bytes().get(from..)?.iter().enumerate() {
        if byte == b'{' && !state.in_string && !state.escape_next {
            return Some(from + offset);
        }
        state.step(byte);
    }
    None
}

/// Given the index of an opening `{`, returns the exclusive end of the
/// balanced object, or `None` if the text ends before depth returns to zero.
pub fn find_object_end(text: &str, open: usize) -> Option<usize> {
    let mut state = ScanState::default();
    for (offset, &byte) in text.as_bytes().get(open..)?.iter().enumerate() {
        if state.step(byte) {
            return Some(open + offset + 1);
        }
    }
    None
}

/// A balanced object span located by [`ObjectSpans`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    /// Byte offset of the marker occurrence this span was anchored on.
    pub marker_at: usize,
    /// Byte offset of the opening brace.
    pub start: usize,
    /// Exclusive byte offset just past the closing brace.
    pub end: usize,
    pub text: &'a str,
}

/// Iterates over the balanced object spans that follow each marker
/// occurrence in a document.
///
/// Occurrences whose object never closes are skipped and the search resumes
/// just past that marker. When the caller accepts a span it should call
/// [`ObjectSpans::consume`] so the search jumps past the whole object instead
/// of re-scanning inside it.
pub struct ObjectSpans<'a> {
    text: &'a str,
    marker: &'a str,
    cursor: usize,
}

impl<'a> ObjectSpans<'a> {
    pub fn new(text: &'a str, marker: &'a str) -> Self {
        Self {
            text,
            marker,
            cursor: 0,
        }
    }

    /// Moves the search cursor past an accepted span.
    pub fn consume(&mut self, span: &Span<'_>) {
        self.cursor = self.cursor.max(span.end);
    }
}

impl<'a> Iterator for ObjectSpans<'a> {
    type Item = Span<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.marker.is_empty() {
            return None;
        }
        loop {
            let marker_at = self.cursor + self.text.get(self.cursor..)?.find(self.marker)?;
            self.cursor = marker_at + self.marker.len();

            let Some(start) = find_object_start(self.text, marker_at) else {
                debug!("No opening brace after marker at byte {marker_at}");
                continue;
            };
            match find_object_end(self.text, start) {
                Some(end) => {
                    return Some(Span {
                        marker_at,
                        start,
                        end,
                        text: &self.text[start..end],
                    })
                }
                None => debug!("Unterminated object after marker at byte {marker_at}"),
            }
        }
    }
}

/// Extracts every object anchored on `marker` that parses as a JSON object
/// and satisfies `accept`.
pub fn extract_objects<F>(text: &str, marker: &str, accept: F) -> Vec<EmbeddedRecord>
where
    F: Fn(&EmbeddedRecord) -> bool,
{
    let mut spans = ObjectSpans::new(text, marker);
    let mut records = Vec::new();
    while let Some(span) = spans.next() {
        match serde_json::from_str::<Value>(span.text) {
            Ok(Value::Object(record)) if accept(&record) => {
                spans.consume(&span);
                records.push(record);
            }
            Ok(_) => debug!(
                "Object at byte {} does not match the expected discriminator",
                span.start
            ),
            Err(e) => debug!("Dropping unparseable object at byte {}: {e}", span.start),
        }
    }
    records
}

/// Extracts every post object from an archived page.
pub fn extract_posts(text: &str) -> Vec<EmbeddedRecord> {
    extract_objects(text, POST_MARKER, |record| {
        record.get("__typename").and_then(Value::as_str) == Some(POST_TYPENAME)
    })
}

/// Extracts the first makers object from a product page, re-encoded as
/// compact JSON with non-ASCII characters kept verbatim.
pub fn extract_makers(html: &str) -> Option<String> {
    extract_objects(html, MAKERS_MARKER, |_| true)
        .into_iter()
        .next()
        .and_then(|makers| serde_json::to_string(&makers).ok())
}
