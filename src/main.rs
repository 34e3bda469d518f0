//! FastMAF CLI entry point
//!
//! Validates a MAF file. Prints nothing and exits 0 when the file passes;
//! otherwise reports every issue and exits non-zero.

use anyhow::Context;
use clap::Parser;
use fast_maf::{MafReader, OpenError, ReaderOptions, SchemaRegistry, DEFAULT_VERSION};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "fast-maf")]
#[command(about = "Validate a Mutation Annotation Format (MAF) file")]
#[command(version)]
#[command(author = "FastMAF Contributors")]
struct Cli {
    /// MAF file to validate (plain, .gz or .bz2)
    input: PathBuf,

    /// MAF schema version to validate against
    #[arg(short = 's', long = "schema-version", default_value = DEFAULT_VERSION)]
    schema_version: String,

    /// Directory of column_headers_<version>.json files (default: built-in schemas)
    #[arg(long = "schema-dir")]
    schema_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let start = Instant::now();

    let registry = match &cli.schema_dir {
        Some(dir) => SchemaRegistry::from_directory(dir),
        None => SchemaRegistry::embedded(),
    };
    let options = ReaderOptions::new()
        .version(cli.schema_version.as_str())
        .validate(true);

    match MafReader::open_with_registry(&cli.input, options, &registry) {
        Ok(_) => {
            log::info!(
                "{:?} passed validation in {:.2}s",
                cli.input,
                start.elapsed().as_secs_f64()
            );
            Ok(())
        }
        Err(OpenError::Invalid(invalid)) => Err(anyhow::anyhow!("{}", invalid.warning()))
            .with_context(|| format!("Validation failed for {:?}", cli.input)),
        Err(OpenError::Maf(e)) => {
            Err(e).with_context(|| format!("Failed to read MAF file {:?}", cli.input))
        }
    }
}
