//! MAF header parsing
//!
//! A MAF file opens with `#key value` comment lines followed by one
//! tab-separated column header line:
//!
//! ```text
//! #version 2.4.1
//! #source pipeline-x
//! Hugo_Symbol	Entrez_Gene_Id	...	Matched_Norm_Sample_UUID	extra_column
//! ```
//!
//! Columns past the fixed schema width are optional, file-specific headers.

use crate::core::{MafError, Result};
use crate::core::io::LineIterator;
use crate::core::schema::ColumnSchema;
use crate::formats::record::split_fields;
use memchr::memchr_iter;
use std::collections::HashMap;
use std::io::BufRead;

/// Marker that starts every metadata line
pub const COMMENT_MARKER: char = '#';

/// Metadata and column names read from the top of a MAF file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MafHeader {
    metadata: HashMap<String, String>,
    columns: Vec<String>,
    optional_headers: Vec<String>,
}

impl MafHeader {
    /// All `#key value` pairs
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Value of the `#version` line, if present
    pub fn version(&self) -> Option<&str> {
        self.get("version")
    }

    /// Every name on the column header line
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Column names beyond the fixed schema width, in file order
    pub fn optional_headers(&self) -> &[String] {
        &self.optional_headers
    }
}

/// Split a `#key value` line into its key and value
///
/// The body must hold exactly one space.
pub fn parse_metadata_line(line: &str, line_number: usize) -> Result<(String, String)> {
    let malformed = || MafError::MalformedHeader {
        line: line_number,
        content: line.chars().take(100).collect(),
    };

    let body = line.strip_prefix(COMMENT_MARKER).ok_or_else(malformed)?;
    if memchr_iter(b' ', body.as_bytes()).count() != 1 {
        return Err(malformed());
    }
    match body.split_once(' ') {
        Some((key, value)) => Ok((key.to_string(), value.to_string())),
        None => Err(malformed()),
    }
}

/// Consume the metadata lines and the column header line
///
/// `lines` must be positioned at the start of the file. On return it sits on
/// the first data row.
pub fn parse_header<R: BufRead>(
    lines: &mut LineIterator<R>,
    schema: &ColumnSchema,
) -> Result<MafHeader> {
    let mut header = MafHeader::default();

    loop {
        let line_number = lines.line_number() + 1;
        let line = match lines.next_line() {
            Some(line) => line?,
            None => break,
        };
        if line.starts_with(COMMENT_MARKER) {
            let (key, value) = parse_metadata_line(line, line_number)?;
            header.metadata.insert(key, value);
            continue;
        }

        header.columns = split_fields(line).into_iter().map(str::to_string).collect();
        header.optional_headers = header
            .columns
            .iter()
            .skip(schema.width())
            .cloned()
            .collect();

        log::debug!(
            "Parsed MAF header: {} metadata entries, {} columns ({} optional)",
            header.metadata.len(),
            header.columns.len(),
            header.optional_headers.len()
        );
        return Ok(header);
    }

    Err(MafError::MissingColumnHeader)
}
