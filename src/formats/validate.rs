//! MAF validation
//!
//! A validation pass scans a whole file and collects every rule violation
//! instead of stopping at the first one. Rules:
//!
//! - the first line is exactly `#version <expected>\n`
//! - the column header matches the schema position by position
//! - somatic calls are backed by validation, verification or a coding
//!   variant class (not applied to protected files)
//! - the strand column is `+`
//! - constrained columns hold allowed values
//!
//! Issues cite data rows by 0-based index, counting from the first row after
//! the column header.

use crate::core::io::LineIterator;
use crate::core::schema::{ColumnSchema, Enumerated};
use crate::formats::header::COMMENT_MARKER;
use crate::formats::record::split_fields;
use std::fmt;
use std::io::{self, BufRead};
use thiserror::Error;

/// 0-based index of the Strand column
pub const STRAND_COLUMN: usize = 7;

/// Substring of a file name that marks protected (identifiable) data
pub const PROTECTED_MARKER: &str = ".protected.maf";

/// Variant classes that back a somatic call on their own
pub const SOMATIC_VARIANT_CLASSIFICATIONS: [&str; 12] = [
    "Frame_Shift_Del",
    "Frame_Shift_Ins",
    "In_Frame_Del",
    "In_Frame_Ins",
    "Missense_Mutation",
    "Nonsense_Mutation",
    "Silent",
    "Splice_Site",
    "Translation_Start_Site",
    "Nonstop_Mutation",
    "RNA",
    "Targeted_Region",
];

/// Whether a file name marks protected data
pub fn is_protected_name(name: &str) -> bool {
    name.contains(PROTECTED_MARKER)
}

/// A column header that differs from the schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMismatch {
    /// 1-based column position
    pub position: usize,
    pub expected: String,
    /// `None` when the header line is too short to have this column
    pub actual: Option<String>,
}

/// One rule violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    VersionMismatch {
        expected: String,
        found: Option<String>,
    },
    HeaderMismatch(Vec<HeaderMismatch>),
    MissingColumnHeader,
    Somatic {
        line: usize,
    },
    Strand {
        line: usize,
        found: String,
    },
    Sequence {
        field: String,
        line: usize,
        value: String,
    },
    Enumerated {
        field: String,
        line: usize,
        value: String,
    },
    TooFewFields {
        line: usize,
        expected: usize,
        found: usize,
    },
}

impl ValidationIssue {
    /// Data row the issue refers to, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            ValidationIssue::Somatic { line }
            | ValidationIssue::Strand { line, .. }
            | ValidationIssue::Sequence { line, .. }
            | ValidationIssue::Enumerated { line, .. }
            | ValidationIssue::TooFewFields { line, .. } => Some(*line),
            _ => None,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::VersionMismatch { expected, found } => match found {
                Some(found) => write!(
                    f,
                    "Version header incorrect; expected version {}, got {:?}",
                    expected, found
                ),
                None => write!(f, "Version header missing; expected version {}", expected),
            },
            ValidationIssue::HeaderMismatch(mismatches) => {
                write!(f, "Incorrect column header ({} mismatched):", mismatches.len())?;
                for m in mismatches {
                    match &m.actual {
                        Some(actual) => write!(
                            f,
                            " [{}] expected '{}' got '{}';",
                            m.position, m.expected, actual
                        )?,
                        None => write!(f, " [{}] expected '{}' got nothing;", m.position, m.expected)?,
                    }
                }
                Ok(())
            }
            ValidationIssue::MissingColumnHeader => write!(f, "Missing column header line"),
            ValidationIssue::Somatic { line } => write!(
                f,
                "Incorrect somatic specification on line: {}. See the MAF specification for details.",
                line
            ),
            ValidationIssue::Strand { line, found } => {
                write!(f, "Incorrect Strand on line: {} (got '{}')", line, found)
            }
            ValidationIssue::Sequence { field, line, value } => write!(
                f,
                "Incorrect sequence value in field {} on line {}: '{}'",
                field, line, value
            ),
            ValidationIssue::Enumerated { field, line, value } => write!(
                f,
                "Incorrect value in field {} on line {}: '{}'",
                field, line, value
            ),
            ValidationIssue::TooFewFields { line, expected, found } => write!(
                f,
                "Too few fields on line {}: expected {}, found {}",
                line, expected, found
            ),
        }
    }
}

/// Result of a validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// No validation has been performed
    #[default]
    NotRun,
    Passed,
    Failed(Vec<ValidationIssue>),
}

impl ValidationOutcome {
    fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        if issues.is_empty() {
            ValidationOutcome::Passed
        } else {
            ValidationOutcome::Failed(issues)
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, ValidationOutcome::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ValidationOutcome::Failed(_))
    }

    /// Issues found; empty unless failed
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            ValidationOutcome::Failed(issues) => issues,
            _ => &[],
        }
    }

    /// `Err` only for a failed pass; `NotRun` counts as `Ok`
    pub fn into_result(self) -> Result<(), ValidationWarning> {
        match self {
            ValidationOutcome::Failed(issues) => Err(ValidationWarning { issues }),
            _ => Ok(()),
        }
    }
}

/// Non-fatal report of a failed validation pass
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("MAF file did not pass validation. You can still use it, but beware. Errors:\n\t{}", join_issues(.issues))]
pub struct ValidationWarning {
    issues: Vec<ValidationIssue>,
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n\t")
}

impl ValidationWarning {
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<ValidationIssue> {
        self.issues
    }
}

/// Columns the somatic rule reads, as 0-based indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SomaticColumns {
    pub mutation_status: usize,
    pub validation_status: usize,
    pub verification_status: usize,
    pub variant_classification: usize,
}

impl SomaticColumns {
    pub fn from_schema(schema: &ColumnSchema) -> Option<Self> {
        Some(Self {
            mutation_status: schema.index_of("Mutation_Status")?,
            validation_status: schema.index_of("Validation_Status")?,
            verification_status: schema.index_of("Verification_Status")?,
            variant_classification: schema.index_of("Variant_Classification")?,
        })
    }

    /// Somatic calls need one of validation, verification or a coding
    /// variant class; non-calls must be invalidated
    pub fn accepts(&self, fields: &[&str]) -> bool {
        let field = |i: usize| fields.get(i).copied().unwrap_or("");
        let mutation_status = field(self.mutation_status);
        let validation_status = field(self.validation_status);

        let supported = validation_status == "Valid"
            || field(self.verification_status) == "Verified"
            || SOMATIC_VARIANT_CLASSIFICATIONS.contains(&field(self.variant_classification));

        (mutation_status == "Somatic" && supported)
            || (mutation_status == "None" && validation_status == "Invalid")
    }
}

/// Rule checker bound to one schema
#[derive(Debug, Clone)]
pub struct Validator<'a> {
    schema: &'a ColumnSchema,
    protected: bool,
    somatic: Option<SomaticColumns>,
}

impl<'a> Validator<'a> {
    pub fn new(schema: &'a ColumnSchema, protected: bool) -> Self {
        let somatic = SomaticColumns::from_schema(schema);
        if somatic.is_none() && !protected {
            log::warn!(
                "Schema {} lacks a somatic status column; somatic rule disabled",
                schema.version()
            );
        }
        Self {
            schema,
            protected,
            somatic,
        }
    }

    /// The line every validated file must start with, terminator included
    pub fn expected_version_line(&self) -> String {
        format!("{}version {}\n", COMMENT_MARKER, self.schema.version())
    }

    /// Compare the raw first line, terminator included, with the expected one
    pub fn check_version_line(&self, raw_line: &str) -> Option<ValidationIssue> {
        if raw_line == self.expected_version_line() {
            None
        } else {
            Some(ValidationIssue::VersionMismatch {
                expected: self.schema.version().to_string(),
                found: Some(raw_line.to_string()),
            })
        }
    }

    /// Compare header names with the schema, position by position
    pub fn check_header(&self, fields: &[&str]) -> Option<ValidationIssue> {
        let mismatches: Vec<HeaderMismatch> = self
            .schema
            .fields()
            .iter()
            .enumerate()
            .filter_map(|(i, spec)| {
                let actual = fields.get(i).copied();
                if actual == Some(spec.header.as_str()) {
                    None
                } else {
                    Some(HeaderMismatch {
                        position: spec.position,
                        expected: spec.header.clone(),
                        actual: actual.map(str::to_string),
                    })
                }
            })
            .collect();

        if mismatches.is_empty() {
            None
        } else {
            Some(ValidationIssue::HeaderMismatch(mismatches))
        }
    }

    /// Apply the per-row rules to one data row
    pub fn check_row(&self, fields: &[&str], line: usize, issues: &mut Vec<ValidationIssue>) {
        if fields.len() < self.schema.width() {
            issues.push(ValidationIssue::TooFewFields {
                line,
                expected: self.schema.width(),
                found: fields.len(),
            });
            return;
        }

        if !self.protected {
            if let Some(somatic) = &self.somatic {
                if !somatic.accepts(fields) {
                    issues.push(ValidationIssue::Somatic { line });
                }
            }
        }

        match fields.get(STRAND_COLUMN) {
            Some(&"+") => {}
            other => issues.push(ValidationIssue::Strand {
                line,
                found: other.copied().unwrap_or("").to_string(),
            }),
        }

        for (spec, value) in self.schema.fields().iter().zip(fields) {
            if !spec.enumerated.is_constrained() || (spec.nullable && value.is_empty()) {
                continue;
            }
            if spec.enumerated.accepts(value) {
                continue;
            }
            let field = spec.header.clone();
            let value = value.to_string();
            issues.push(match spec.enumerated {
                Enumerated::Nucleotides => ValidationIssue::Sequence { field, line, value },
                _ => ValidationIssue::Enumerated { field, line, value },
            });
        }
    }

    /// Validate a whole file
    ///
    /// `lines` must be positioned at the start of the file; it is left at
    /// EOF. Only I/O failures are returned as errors.
    pub fn validate_lines<R: BufRead>(&self, lines: &mut LineIterator<R>) -> io::Result<ValidationOutcome> {
        let mut issues = Vec::new();

        let first = match lines.next_line() {
            Some(line) => line?.to_string(),
            None => {
                issues.push(ValidationIssue::VersionMismatch {
                    expected: self.schema.version().to_string(),
                    found: None,
                });
                issues.push(ValidationIssue::MissingColumnHeader);
                return Ok(ValidationOutcome::from_issues(issues));
            }
        };
        let raw_first = format!("{}{}", first, lines.line_ending());
        issues.extend(self.check_version_line(&raw_first));

        // a file without metadata starts directly with its column header
        let mut header = if first.starts_with(COMMENT_MARKER) {
            None
        } else {
            Some(first)
        };
        while header.is_none() {
            match lines.next_line() {
                Some(line) => {
                    let line = line?;
                    if !line.starts_with(COMMENT_MARKER) {
                        header = Some(line.to_string());
                    }
                }
                None => break,
            }
        }

        let Some(header) = header else {
            issues.push(ValidationIssue::MissingColumnHeader);
            return Ok(ValidationOutcome::from_issues(issues));
        };
        issues.extend(self.check_header(&split_fields(&header)));

        let mut row = 0;
        while let Some(line) = lines.next_line() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            self.check_row(&split_fields(line), row, &mut issues);
            row += 1;
        }

        log::info!(
            "Validated {} data rows against MAF {}: {} issue(s)",
            row,
            self.schema.version(),
            issues.len()
        );
        Ok(ValidationOutcome::from_issues(issues))
    }
}
