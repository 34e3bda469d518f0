//! MAF data records
//!
//! Each data row becomes a [`MafRecord`]: field values keyed by column name,
//! with the genomic coordinates coerced to integers.

use crate::core::{MafError, Result};
use crate::core::schema::ColumnSchema;
use memchr::memchr_iter;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Column holding the 1-based start coordinate
pub const START_POSITION: &str = "Start_Position";

/// Column holding the 1-based end coordinate
pub const END_POSITION: &str = "End_Position";

/// Split a line on tabs
pub fn split_fields(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut fields = Vec::with_capacity(48);
    let mut start = 0;
    for tab in memchr_iter(b'\t', bytes) {
        fields.push(&line[start..tab]);
        start = tab + 1;
    }
    fields.push(&line[start..]);
    fields
}

/// Value of one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(u64),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<u64> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(n) => write!(f, "{}", n),
        }
    }
}

/// Column names of every record produced from one header
///
/// Fixed schema columns come first, then the file's optional columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    names: Vec<String>,
    index: HashMap<String, usize>,
    fixed: usize,
    start_position: Option<usize>,
    end_position: Option<usize>,
}

impl RecordLayout {
    pub fn new(schema: &ColumnSchema, optional_headers: &[String]) -> Self {
        let names: Vec<String> = schema
            .headers()
            .map(str::to_string)
            .chain(optional_headers.iter().cloned())
            .collect();

        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            // a repeated optional name never shadows a fixed column
            index.entry(name.clone()).or_insert(i);
        }

        Self {
            start_position: schema.index_of(START_POSITION),
            end_position: schema.index_of(END_POSITION),
            fixed: schema.width(),
            names,
            index,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of fixed schema columns
    pub fn fixed_width(&self) -> usize {
        self.fixed
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

/// One parsed data row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MafRecord {
    layout: Arc<RecordLayout>,
    values: Vec<FieldValue>,
    line: usize,
}

impl MafRecord {
    /// Parse a data row
    ///
    /// Rows narrower than the fixed schema are rejected. Missing trailing
    /// optional values are read as empty text.
    pub fn parse(line: &str, line_number: usize, layout: &Arc<RecordLayout>) -> Result<Self> {
        let fields = split_fields(line);
        if fields.len() < layout.fixed {
            return Err(MafError::TooFewFields {
                line: line_number,
                expected: layout.fixed,
                found: fields.len(),
            });
        }

        let mut values = Vec::with_capacity(layout.names.len());
        for i in 0..layout.names.len() {
            let raw = fields.get(i).copied().unwrap_or("");
            let value = if Some(i) == layout.start_position {
                FieldValue::Integer(parse_coordinate(raw, START_POSITION, line_number)?)
            } else if Some(i) == layout.end_position {
                FieldValue::Integer(parse_coordinate(raw, END_POSITION, line_number)?)
            } else {
                FieldValue::Text(raw.to_string())
            };
            values.push(value);
        }

        Ok(Self {
            layout: Arc::clone(layout),
            values,
            line: line_number,
        })
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.layout.index_of(name).map(|i| &self.values[i])
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    pub fn integer(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(FieldValue::as_integer)
    }

    /// Get start position (1-based)
    pub fn start_position(&self) -> Option<u64> {
        self.integer(START_POSITION)
    }

    /// Get end position (1-based)
    pub fn end_position(&self) -> Option<u64> {
        self.integer(END_POSITION)
    }

    pub fn hugo_symbol(&self) -> Option<&str> {
        self.text("Hugo_Symbol")
    }

    pub fn chromosome(&self) -> Option<&str> {
        self.text("Chromosome")
    }

    /// Fields in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.layout
            .names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Values of the optional columns, keyed by their header names
    pub fn optional_fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.iter().skip(self.layout.fixed)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 1-based line of the source file this record came from
    pub fn line(&self) -> usize {
        self.line
    }

    /// Take ownership of the values as a name-to-value map
    pub fn into_map(self) -> HashMap<String, FieldValue> {
        let layout = self.layout;
        let mut map = HashMap::with_capacity(self.values.len());
        for (name, value) in layout.names.iter().zip(self.values) {
            map.entry(name.clone()).or_insert(value);
        }
        map
    }
}

fn parse_coordinate(raw: &str, field: &'static str, line: usize) -> Result<u64> {
    raw.parse().map_err(|_| MafError::FieldCoercion {
        line,
        field,
        value: raw.to_string(),
    })
}
