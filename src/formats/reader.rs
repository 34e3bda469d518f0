//! MAF file reader
//!
//! [`MafReader`] owns one seekable source. The source cursor moves through
//! an explicit state machine:
//!
//! ```text
//! Unopened --parse_header--> Streaming --EOF/error--> Exhausted
//!                               ^
//! HeaderPending --parse_header--'
//! ```
//!
//! `Unopened` lasts only until the constructor parses the header; a reader
//! handed to a caller is never in that state.
//!
//! `validate()` rewinds the source, scans it to the end, then rewinds again
//! and leaves the reader in `HeaderPending`, whatever state it was in. The
//! next record request re-reads the header and streams from the first data
//! row again.
//!
//! # Example
//!
//! ```ignore
//! use fast_maf::{MafReader, ReaderOptions};
//!
//! let reader = MafReader::open("TCGA.BRCA.somatic.maf", ReaderOptions::default())?;
//! for record in reader {
//!     let record = record?;
//!     println!("{:?} {:?}", record.hugo_symbol(), record.start_position());
//! }
//! ```

use crate::core::{MafError, Result};
use crate::core::io::{LineIterator, SmartReader};
use crate::core::schema::{ColumnSchema, SchemaRegistry, DEFAULT_VERSION};
use crate::formats::header::{parse_header, MafHeader};
use crate::formats::record::{MafRecord, RecordLayout};
use crate::formats::validate::{is_protected_name, ValidationOutcome, ValidationWarning, Validator};
use std::collections::HashMap;
use std::fmt;
use std::io::{BufRead, Seek};
use std::path::Path;
use std::sync::Arc;

/// Options for opening a MAF file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Schema version used for column names and validation
    pub version: String,
    /// Run a validation pass before reading
    pub validate: bool,
    /// Force the protected flag; `None` infers it from the file name
    pub protected: Option<bool>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            validate: false,
            protected: None,
        }
    }
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn protected(mut self, protected: bool) -> Self {
        self.protected = Some(protected);
        self
    }
}

/// Position of the reader's cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Source attached, nothing read yet
    ///
    /// Only seen inside construction: every constructor parses the header
    /// before returning, so callers observe `Streaming` or an error.
    Unopened,
    /// Rewound to the start; the header must be read before records
    HeaderPending,
    /// Positioned on a data row
    Streaming,
    /// Source exhausted or a fatal record error was returned
    Exhausted,
}

/// Streaming MAF reader
#[derive(Debug)]
pub struct MafReader<R: BufRead> {
    lines: LineIterator<R>,
    schema: Arc<ColumnSchema>,
    header: MafHeader,
    layout: Arc<RecordLayout>,
    protected: bool,
    state: ReaderState,
    validation: ValidationOutcome,
}

/// Reader whose construction-time validation failed
///
/// The reader is fully usable; the warning lists every issue found.
#[derive(Debug)]
pub struct InvalidMaf<R: BufRead> {
    warning: ValidationWarning,
    reader: MafReader<R>,
}

impl<R: BufRead> InvalidMaf<R> {
    pub fn warning(&self) -> &ValidationWarning {
        &self.warning
    }

    /// Keep reading despite the failed validation
    pub fn into_reader(self) -> MafReader<R> {
        self.reader
    }

    pub fn into_parts(self) -> (ValidationWarning, MafReader<R>) {
        (self.warning, self.reader)
    }
}

/// Error returned when opening a MAF file
#[derive(Debug)]
pub enum OpenError<R: BufRead> {
    /// The file could not be opened or its header could not be read
    Maf(MafError),
    /// Validation was requested and found issues
    Invalid(Box<InvalidMaf<R>>),
}

impl<R: BufRead> fmt::Display for OpenError<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenError::Maf(e) => write!(f, "{}", e),
            OpenError::Invalid(invalid) => write!(f, "{}", invalid.warning),
        }
    }
}

impl<R: BufRead + fmt::Debug> std::error::Error for OpenError<R> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OpenError::Maf(e) => Some(e),
            OpenError::Invalid(invalid) => Some(&invalid.warning),
        }
    }
}

impl<R: BufRead> From<MafError> for OpenError<R> {
    fn from(err: MafError) -> Self {
        OpenError::Maf(err)
    }
}

impl<R: BufRead> From<std::io::Error> for OpenError<R> {
    fn from(err: std::io::Error) -> Self {
        OpenError::Maf(MafError::Io(err))
    }
}

/// Result of opening a MAF file
pub type OpenResult<T, R> = std::result::Result<T, OpenError<R>>;

impl MafReader<SmartReader> {
    /// Open a MAF file using the process-wide schema registry
    ///
    /// Gzip and bzip2 files are decompressed transparently. A path containing
    /// `.protected.maf` marks the file protected unless `options` says
    /// otherwise.
    pub fn open<P: AsRef<Path>>(path: P, options: ReaderOptions) -> OpenResult<Self, SmartReader> {
        Self::open_with_registry(path, options, SchemaRegistry::global())
    }

    pub fn open_with_registry<P: AsRef<Path>>(
        path: P,
        options: ReaderOptions,
        registry: &SchemaRegistry,
    ) -> OpenResult<Self, SmartReader> {
        let path = path.as_ref();
        let protected = options
            .protected
            .unwrap_or_else(|| is_protected_name(&path.to_string_lossy()));
        let source = SmartReader::open(path)?;
        log::debug!("Opened MAF file {:?} (protected: {})", path, protected);
        Self::build(source, &options, registry, protected)
    }
}

impl<R: BufRead + Seek> MafReader<R> {
    /// Read MAF data from any seekable source, using the process-wide registry
    ///
    /// Streams have no name, so they are only protected when `options` says so.
    pub fn from_reader(reader: R, options: ReaderOptions) -> OpenResult<Self, R> {
        Self::from_reader_with_registry(reader, options, SchemaRegistry::global())
    }

    pub fn from_reader_with_registry(
        reader: R,
        options: ReaderOptions,
        registry: &SchemaRegistry,
    ) -> OpenResult<Self, R> {
        let protected = options.protected.unwrap_or(false);
        Self::build(reader, &options, registry, protected)
    }

    fn build(
        source: R,
        options: &ReaderOptions,
        registry: &SchemaRegistry,
        protected: bool,
    ) -> OpenResult<Self, R> {
        let schema = registry.load(&options.version)?;
        let layout = Arc::new(RecordLayout::new(&schema, &[]));
        let mut reader = Self {
            lines: LineIterator::new(source),
            schema,
            header: MafHeader::default(),
            layout,
            protected,
            state: ReaderState::Unopened,
            validation: ValidationOutcome::NotRun,
        };

        if options.validate {
            reader.validate()?;
        }
        if let Err(e) = reader.parse_header() {
            for issue in reader.validation.issues() {
                log::warn!("Validation issue before header error: {}", issue);
            }
            return Err(e.into());
        }

        match reader.validation.clone().into_result() {
            Ok(()) => Ok(reader),
            Err(warning) => {
                log::warn!(
                    "MAF file did not pass validation ({} issues)",
                    warning.issues().len()
                );
                Err(OpenError::Invalid(Box::new(InvalidMaf { warning, reader })))
            }
        }
    }

    /// Read the metadata and column header from the start of the source
    ///
    /// Runs at construction. Calling it again rewinds the reader and
    /// restarts record iteration from the first data row.
    pub fn parse_header(&mut self) -> Result<()> {
        self.rewind()?;
        let header = match parse_header(&mut self.lines, &self.schema) {
            Ok(header) => header,
            Err(e) => {
                self.state = ReaderState::Exhausted;
                return Err(e);
            }
        };
        self.layout = Arc::new(RecordLayout::new(&self.schema, header.optional_headers()));
        self.header = header;
        self.state = ReaderState::Streaming;
        Ok(())
    }

    /// Validate the whole file against the schema
    ///
    /// Leaves the reader in `HeaderPending`: the next record request
    /// re-reads the header and restarts from the first data row.
    pub fn validate(&mut self) -> Result<ValidationOutcome> {
        self.lines.rewind()?;
        let outcome = Validator::new(&self.schema, self.protected).validate_lines(&mut self.lines)?;
        self.rewind()?;
        self.validation = outcome.clone();
        Ok(outcome)
    }

    fn rewind(&mut self) -> Result<()> {
        self.lines.rewind()?;
        self.state = ReaderState::HeaderPending;
        Ok(())
    }

    fn next_record(&mut self) -> Option<Result<MafRecord>> {
        loop {
            let line_number = self.lines.line_number() + 1;
            let line = match self.lines.next_line() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.state = ReaderState::Exhausted;
                    return Some(Err(e.into()));
                }
                None => {
                    self.state = ReaderState::Exhausted;
                    return None;
                }
            };
            if line.is_empty() {
                continue;
            }

            let record = MafRecord::parse(line, line_number, &self.layout);
            if record.is_err() {
                self.state = ReaderState::Exhausted;
            }
            return Some(record);
        }
    }
}

impl<R: BufRead> MafReader<R> {
    pub fn header(&self) -> &MafHeader {
        &self.header
    }

    /// `#key value` pairs from the file header
    pub fn metadata(&self) -> &HashMap<String, String> {
        self.header.metadata()
    }

    /// Columns past the fixed schema width, in file order
    pub fn optional_headers(&self) -> &[String] {
        self.header.optional_headers()
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    /// Schema version this reader was opened with
    pub fn version(&self) -> &str {
        self.schema.version()
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Outcome of the last validation pass
    pub fn validation(&self) -> &ValidationOutcome {
        &self.validation
    }
}

impl<R: BufRead + Seek> Iterator for MafReader<R> {
    type Item = Result<MafRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            ReaderState::Exhausted => return None,
            ReaderState::Unopened | ReaderState::HeaderPending => {
                if let Err(e) = self.parse_header() {
                    return Some(Err(e));
                }
            }
            ReaderState::Streaming => {}
        }
        self.next_record()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn column_line() -> String {
        let schema = SchemaRegistry::embedded().load("2.4.1").unwrap();
        schema.headers().collect::<Vec<_>>().join("\t")
    }

    fn data_line(gene: &str, start: u64, strand: &str) -> String {
        format!(
            "{gene}\t7157\tBCM\tGRCh37\t17\t{start}\t{start}\t{strand}\tMissense_Mutation\tSNP\tG\tG\tA\t\t\tTCGA-01\tTCGA-10\t\t\t\t\t\t\tVerified\tValid\tSomatic\t\tWXS\t\t\t\tIllumina HiSeq\t\t"
        )
    }

    fn source(text: String) -> Cursor<Vec<u8>> {
        Cursor::new(text.into_bytes())
    }

    #[test]
    fn test_state_transitions() {
        let text = format!(
            "#version 2.4.1\n{}\n{}\n",
            column_line(),
            data_line("TP53", 100, "+")
        );
        let registry = SchemaRegistry::embedded();
        let mut reader =
            MafReader::from_reader_with_registry(source(text), ReaderOptions::default(), &registry)
                .unwrap();
        assert_eq!(reader.state(), ReaderState::Streaming);
        assert_eq!(reader.validation(), &ValidationOutcome::NotRun);

        let record = reader.next().unwrap().unwrap();
        assert_eq!(record.start_position(), Some(100));
        assert!(reader.next().is_none());
        assert_eq!(reader.state(), ReaderState::Exhausted);
        assert!(reader.next().is_none());

        let outcome = reader.validate().unwrap();
        assert!(outcome.is_passed());
        assert_eq!(reader.state(), ReaderState::HeaderPending);

        // streaming restarts from the first data row
        let record = reader.next().unwrap().unwrap();
        assert_eq!(record.hugo_symbol(), Some("TP53"));
        assert_eq!(reader.state(), ReaderState::Streaming);
    }

    #[test]
    fn test_constructors_never_return_unopened() {
        let text = format!(
            "#version 2.4.1\n{}\n{}\n",
            column_line(),
            data_line("TP53", 100, "+")
        );
        let reader = MafReader::from_reader(source(text.clone()), ReaderOptions::default()).unwrap();
        assert_eq!(reader.state(), ReaderState::Streaming);

        let reader = MafReader::from_reader(source(text), ReaderOptions::new().validate(true)).unwrap();
        assert_eq!(reader.state(), ReaderState::Streaming);
        assert!(reader.validation().is_passed());

        let failing = format!(
            "#version 2.4.1\n{}\n{}\n",
            column_line(),
            data_line("TP53", 100, "-")
        );
        match MafReader::from_reader(source(failing), ReaderOptions::new().validate(true)) {
            Err(OpenError::Invalid(invalid)) => {
                assert_eq!(invalid.into_reader().state(), ReaderState::Streaming);
            }
            other => panic!("expected a validation warning, got {:?}", other.map(|r| r.state())),
        }
    }

    #[test]
    fn test_header_error_wins_over_validation_warning() {
        // row 0 breaks the strand rule, and line 2 is not a valid metadata line
        let text = format!(
            "#version 2.4.1\n#source BCM pipeline v2\n{}\n{}\n",
            column_line(),
            data_line("TP53", 100, "-")
        );
        let err = MafReader::from_reader(source(text), ReaderOptions::new().validate(true))
            .unwrap_err();
        assert!(matches!(err, OpenError::Maf(MafError::MalformedHeader { line: 2, .. })));
    }

    #[test]
    fn test_metadata_and_version() {
        let text = format!("#version 2.4.1\n#center BCM\n{}\n", column_line());
        let reader = MafReader::from_reader(source(text), ReaderOptions::default()).unwrap();
        assert_eq!(reader.version(), "2.4.1");
        assert_eq!(reader.header().version(), Some("2.4.1"));
        assert_eq!(reader.metadata().get("center").map(String::as_str), Some("BCM"));
        assert!(!reader.is_protected());
    }

    #[test]
    fn test_malformed_header_fails_construction() {
        let text = format!("#version\n{}\n", column_line());
        let err = MafReader::from_reader(source(text), ReaderOptions::default()).unwrap_err();
        assert!(matches!(err, OpenError::Maf(MafError::MalformedHeader { line: 1, .. })));
    }

    #[test]
    fn test_unknown_version_fails_construction() {
        let text = format!("#version 2.4.1\n{}\n", column_line());
        let err = MafReader::from_reader(source(text), ReaderOptions::new().version("0.0.1"))
            .unwrap_err();
        assert!(matches!(err, OpenError::Maf(MafError::SchemaNotFound { .. })));
    }

    #[test]
    fn test_coercion_error_stops_iteration() {
        let text = format!(
            "#version 2.4.1\n{}\n{}\n{}\n",
            column_line(),
            data_line("TP53", 100, "+").replace("\t100\t100\t", "\tabc\t100\t"),
            data_line("KRAS", 200, "+")
        );
        let mut reader = MafReader::from_reader(source(text), ReaderOptions::default()).unwrap();

        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(
            err,
            MafError::FieldCoercion { line: 3, field: "Start_Position", .. }
        ));
        assert_eq!(reader.state(), ReaderState::Exhausted);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_validation_failure_keeps_reader_usable() {
        let text = format!(
            "#version 2.4.1\n{}\n{}\n{}\n",
            column_line(),
            data_line("TP53", 100, "+"),
            data_line("KRAS", 200, "-")
        );
        let err = MafReader::from_reader(source(text), ReaderOptions::new().validate(true))
            .unwrap_err();

        let invalid = match err {
            OpenError::Invalid(invalid) => invalid,
            OpenError::Maf(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(invalid.warning().issues().len(), 1);
        assert!(invalid.warning().to_string().contains("Incorrect Strand on line: 1"));

        let reader = invalid.into_reader();
        assert!(reader.validation().is_failed());
        let records: Vec<MafRecord> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].hugo_symbol(), Some("KRAS"));
    }

    #[test]
    fn test_validation_success_at_construction() {
        let text = format!(
            "#version 2.4.1\n{}\n{}\n",
            column_line(),
            data_line("TP53", 100, "+")
        );
        let reader = MafReader::from_reader(source(text), ReaderOptions::new().validate(true))
            .unwrap();
        assert!(reader.validation().is_passed());
        assert_eq!(reader.count(), 1);
    }

    #[test]
    fn test_protected_option_on_streams() {
        let text = format!(
            "#version 2.4.1\n{}\n{}\n",
            column_line(),
            data_line("TP53", 100, "+").replace("\tSomatic\t", "\tGermline\t")
        );
        let options = ReaderOptions::new().validate(true);

        assert!(MafReader::from_reader(source(text.clone()), options.clone()).is_err());
        let reader = MafReader::from_reader(source(text), options.protected(true)).unwrap();
        assert!(reader.is_protected());
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let text = format!(
            "#version 2.4.1\n{}\n\n{}\n\n",
            column_line(),
            data_line("TP53", 100, "+")
        );
        let reader = MafReader::from_reader(source(text), ReaderOptions::default()).unwrap();
        let records: Vec<_> = reader.collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].line(), 4);
    }
}
