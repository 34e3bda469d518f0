//! MAF format handling
//!
//! Header parsing, record mapping, validation, and the reader tying them together.

pub mod header;
pub mod reader;
pub mod record;
pub mod validate;

pub use header::{parse_header, parse_metadata_line, MafHeader, COMMENT_MARKER};
pub use reader::{InvalidMaf, MafReader, OpenError, OpenResult, ReaderOptions, ReaderState};
pub use record::{split_fields, FieldValue, MafRecord, RecordLayout, END_POSITION, START_POSITION};
pub use validate::{
    is_protected_name, HeaderMismatch, SomaticColumns, ValidationIssue, ValidationOutcome,
    ValidationWarning, Validator, PROTECTED_MARKER, SOMATIC_VARIANT_CLASSIFICATIONS, STRAND_COLUMN,
};
