//! Error types for FastMAF
//!
//! Defines all error types used throughout the library.

use thiserror::Error;

/// Main error type for MAF reading operations
#[derive(Debug, Error)]
pub enum MafError {
    /// No schema resource exists for the requested version
    #[error("No column schema found for MAF version {version}")]
    SchemaNotFound { version: String },

    /// Schema resource exists but cannot be used
    #[error("Malformed column schema for MAF version {version}: {message}")]
    MalformedSchema { version: String, message: String },

    /// A `#` comment line is not of the form `#key value`
    #[error("Malformed header at line {line}: '{content}'")]
    MalformedHeader { line: usize, content: String },

    /// The source ended before a column header line was seen
    #[error("Missing column header line")]
    MissingColumnHeader,

    /// Start_Position or End_Position is not an integer
    #[error("Failed to parse {field} value '{value}' as an integer at line {line}")]
    FieldCoercion {
        line: usize,
        field: &'static str,
        value: String,
    },

    /// Data row is narrower than the column schema
    #[error("Too few fields at line {line}: expected at least {expected}, found {found}")]
    TooFewFields {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for MAF operations
pub type Result<T> = std::result::Result<T, MafError>;
