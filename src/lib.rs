//! FastMAF - Mutation Annotation Format reader
//!
//! Reads MAF files (tab-delimited somatic variant calls with a commented
//! metadata header) as a stream of records, and optionally validates them
//! against a versioned column schema.
//!
//! # Features
//!
//! - Schema-driven column mapping with integer genomic coordinates
//! - Full-file validation that reports every issue in one pass
//! - Transparent gzip/bzip2 input
//! - Schemas cached per version in an injectable registry
//!
//! # Example
//!
//! ```ignore
//! use fast_maf::{MafReader, OpenError, ReaderOptions};
//!
//! let reader = match MafReader::open("cohort.maf", ReaderOptions::new().validate(true)) {
//!     Ok(reader) => reader,
//!     Err(OpenError::Invalid(invalid)) => {
//!         eprintln!("{}", invalid.warning());
//!         invalid.into_reader()
//!     }
//!     Err(OpenError::Maf(e)) => return Err(e.into()),
//! };
//!
//! for record in reader {
//!     let record = record?;
//!     println!("{:?}:{:?}", record.chromosome(), record.start_position());
//! }
//! ```

pub mod core;
pub mod formats;

// Re-export commonly used types
pub use core::{
    ColumnSchema, Enumerated, FieldSpec, MafError, Result, SchemaRegistry, SchemaSource,
    DEFAULT_VERSION,
};
pub use formats::{
    FieldValue, InvalidMaf, MafHeader, MafReader, MafRecord, OpenError, ReaderOptions,
    ReaderState, ValidationIssue, ValidationOutcome, ValidationWarning,
};
