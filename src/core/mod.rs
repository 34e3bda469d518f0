//! Core reading infrastructure
//!
//! Error types, the seekable line source, and versioned column schemas.

mod error;
pub mod io;
pub mod schema;

pub use error::{MafError, Result};
pub use io::{
    detect_compression, CompressionFormat, LineIterator, MappedReader, SmartReader,
    DEFAULT_BUFFER_SIZE, MMAP_THRESHOLD,
};
pub use schema::{
    schema_file_name, ColumnSchema, Enumerated, FieldSpec, SchemaRegistry, SchemaSource,
    DEFAULT_VERSION, NUCLEOTIDES,
};
