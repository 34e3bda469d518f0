//! Versioned MAF column schemas
//!
//! A schema maps each fixed column position to its header name, whether the
//! column may be empty, and which values it may hold. Schemas are stored as
//! JSON keyed by 1-based position:
//!
//! ```text
//! {
//!   "1": { "header": "Hugo_Symbol", "null": false, "enumerated": "Set" },
//!   "10": { "header": "Variant_Type", "null": false, "enumerated": ["SNP", "DNP", ...] },
//!   ...
//! }
//! ```
//!
//! `enumerated` is either a list of allowed values or one of the sentinels
//! `"Set"`, `"No"` and `""`, all of which mean "not checked". The list
//! `["A","C","T","G","-"]` is special: it describes a free-form sequence
//! over that alphabet rather than a set of whole values.

use crate::core::error::{MafError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

/// Version used when the caller does not ask for one
pub const DEFAULT_VERSION: &str = "2.4.1";

/// Alphabet of sequence-valued columns (alleles)
pub const NUCLEOTIDES: [&str; 5] = ["A", "C", "T", "G", "-"];

/// Schemas compiled into the binary, keyed by version
const EMBEDDED_SCHEMAS: &[(&str, &str)] = &[(
    "2.4.1",
    include_str!("../../data/column_headers_2_4_1.json"),
)];

/// Value constraint of a single column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enumerated {
    /// Any value is accepted
    Unconstrained,
    /// Every character must be one of A, C, T, G or `-`
    Nucleotides,
    /// The whole value must be one of these
    Values(BTreeSet<String>),
}

impl Enumerated {
    /// Check a value against this constraint
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Enumerated::Unconstrained => true,
            Enumerated::Nucleotides => value.chars().all(is_nucleotide),
            Enumerated::Values(values) => values.contains(value),
        }
    }

    pub fn is_constrained(&self) -> bool {
        !matches!(self, Enumerated::Unconstrained)
    }
}

#[inline]
fn is_nucleotide(c: char) -> bool {
    matches!(c, 'A' | 'C' | 'T' | 'G' | '-')
}

/// Description of one fixed column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// 1-based column position
    pub position: usize,
    pub header: String,
    pub nullable: bool,
    pub enumerated: Enumerated,
}

/// Fixed columns of one MAF version, ordered by position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    version: String,
    fields: Vec<FieldSpec>,
}

#[derive(Deserialize)]
struct RawFieldSpec {
    header: String,
    #[serde(rename = "null")]
    nullable: bool,
    enumerated: RawEnumerated,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEnumerated {
    List(Vec<String>),
    Sentinel(String),
}

impl RawEnumerated {
    fn resolve(self) -> std::result::Result<Enumerated, String> {
        match self {
            RawEnumerated::Sentinel(s) => match s.as_str() {
                "Set" | "No" | "" => Ok(Enumerated::Unconstrained),
                other => Err(format!("unknown enumerated sentinel '{}'", other)),
            },
            RawEnumerated::List(values) => {
                if values.iter().any(|v| v == "Set" || v == "No") {
                    Ok(Enumerated::Unconstrained)
                } else if values.iter().map(String::as_str).eq(NUCLEOTIDES) {
                    Ok(Enumerated::Nucleotides)
                } else {
                    Ok(Enumerated::Values(values.into_iter().collect()))
                }
            }
        }
    }
}

impl ColumnSchema {
    /// Build a schema from its fields; positions must run 1..=n in order
    pub fn new(version: impl Into<String>, fields: Vec<FieldSpec>) -> Result<Self> {
        let version = version.into();
        for (index, field) in fields.iter().enumerate() {
            if field.position != index + 1 {
                return Err(MafError::MalformedSchema {
                    version,
                    message: format!(
                        "column positions must be contiguous from 1; expected {} but found {}",
                        index + 1,
                        field.position
                    ),
                });
            }
        }
        if fields.is_empty() {
            return Err(MafError::MalformedSchema {
                version,
                message: "schema defines no columns".to_string(),
            });
        }
        Ok(Self { version, fields })
    }

    /// Parse a schema from its JSON resource
    pub fn from_json(version: &str, json: &str) -> Result<Self> {
        let malformed = |message: String| MafError::MalformedSchema {
            version: version.to_string(),
            message,
        };

        let raw: BTreeMap<String, RawFieldSpec> =
            serde_json::from_str(json).map_err(|e| malformed(format!("invalid JSON: {}", e)))?;

        let mut fields = Vec::with_capacity(raw.len());
        for (key, spec) in raw {
            let position: usize = key
                .parse()
                .map_err(|_| malformed(format!("column key '{}' is not a position", key)))?;
            let enumerated = spec
                .enumerated
                .resolve()
                .map_err(|e| malformed(format!("column {}: {}", key, e)))?;
            fields.push(FieldSpec {
                position,
                header: spec.header,
                nullable: spec.nullable,
                enumerated,
            });
        }
        // BTreeMap orders keys as strings ("10" < "2"), so sort numerically
        fields.sort_by_key(|f| f.position);

        Self::new(version, fields)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Number of fixed columns
    pub fn width(&self) -> usize {
        self.fields.len()
    }

    /// 0-based column index of a header name
    pub fn index_of(&self, header: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.header == header)
    }

    /// Header names in column order
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.header.as_str())
    }
}

/// File name of the schema resource for a version: dots become underscores
pub fn schema_file_name(version: &str) -> String {
    format!("column_headers_{}.json", version.replace('.', "_"))
}

/// Where a registry finds schema resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    /// Resources compiled into the crate
    Embedded,
    /// `column_headers_<version>.json` files in a directory
    Directory(PathBuf),
}

impl SchemaSource {
    fn read(&self, version: &str) -> Result<String> {
        match self {
            SchemaSource::Embedded => EMBEDDED_SCHEMAS
                .iter()
                .find(|(v, _)| *v == version)
                .map(|(_, json)| (*json).to_string())
                .ok_or_else(|| MafError::SchemaNotFound {
                    version: version.to_string(),
                }),
            SchemaSource::Directory(dir) => {
                let path = dir.join(schema_file_name(version));
                std::fs::read_to_string(&path).map_err(|e| match e.kind() {
                    io::ErrorKind::NotFound => MafError::SchemaNotFound {
                        version: version.to_string(),
                    },
                    _ => MafError::Io(e),
                })
            }
        }
    }
}

/// Memoizing schema loader
///
/// Each version is loaded at most once per registry and never evicted.
/// Readers share the loaded schema through an `Arc`.
#[derive(Debug)]
pub struct SchemaRegistry {
    source: SchemaSource,
    cache: Mutex<HashMap<String, Arc<ColumnSchema>>>,
}

impl SchemaRegistry {
    pub fn new(source: SchemaSource) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Registry over the schemas compiled into the crate
    pub fn embedded() -> Self {
        Self::new(SchemaSource::Embedded)
    }

    /// Registry reading schema files from a directory
    pub fn from_directory<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(SchemaSource::Directory(dir.as_ref().to_path_buf()))
    }

    /// Process-wide registry over the embedded schemas
    pub fn global() -> &'static SchemaRegistry {
        static GLOBAL: OnceLock<SchemaRegistry> = OnceLock::new();
        GLOBAL.get_or_init(SchemaRegistry::embedded)
    }

    pub fn source(&self) -> &SchemaSource {
        &self.source
    }

    /// Load the schema for a version, reading it on first use
    pub fn load(&self, version: &str) -> Result<Arc<ColumnSchema>> {
        // A poisoned lock still guards a consistent map: inserts are atomic
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(schema) = cache.get(version) {
            log::debug!("Schema {} served from cache", version);
            return Ok(Arc::clone(schema));
        }

        let json = self.source.read(version)?;
        let schema = Arc::new(ColumnSchema::from_json(version, &json)?);
        log::debug!("Loaded schema {} ({} columns)", version, schema.width());
        cache.insert(version.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Insert a schema built in code, replacing any cached schema of that version
    pub fn register(&self, schema: ColumnSchema) -> Arc<ColumnSchema> {
        let schema = Arc::new(schema);
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.insert(schema.version().to_string(), Arc::clone(&schema));
        schema
    }

    pub fn is_cached(&self, version: &str) -> bool {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.contains_key(version)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::embedded()
    }
}
