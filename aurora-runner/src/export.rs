//! Export: one file per table plus a `manifest.json`.
//!
//! Layout of an export directory:
//! - `weather.{csv,parquet}`
//! - `solar_features.{csv,parquet}` (daily runs only)
//! - `geomagnetic_features.{csv,parquet}`
//! - `manifest.json`: run kind and dates, row counts, BLAKE3 per file
//!
//! Every file is written to `{name}.tmp` and renamed into place, so a reader
//! never sees a half-written table. The manifest is written last.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use polars::prelude::ParquetWriter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use aurora_core::table::FeatureTable;

use crate::config::OutputFormat;
use crate::pipeline::{PipelineOutput, RunKind};

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    pub name: String,
    pub file: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub blake3: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub kind: RunKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub format: OutputFormat,
    pub tables: Vec<TableEntry>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl Manifest {
    pub fn table(&self, name: &str) -> Option<&TableEntry> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// Render a table as CSV. Missing values are empty cells.
pub fn table_to_csv(table: &dyn FeatureTable) -> Result<Vec<u8>> {
    let columns = table.columns();
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(columns.iter().map(|c| c.name.as_str()))?;
    for i in 0..table.height() {
        wtr.write_record(columns.iter().map(|c| c.values.cell(i)))?;
    }
    wtr.into_inner().context("failed to flush CSV writer")
}

pub fn table_to_parquet(table: &dyn FeatureTable) -> Result<Vec<u8>> {
    let mut df = table
        .to_dataframe()
        .with_context(|| format!("failed to build {} dataframe", table.name()))?;
    let mut buf = Vec::new();
    ParquetWriter::new(&mut buf)
        .finish(&mut df)
        .with_context(|| format!("failed to write {} parquet", table.name()))?;
    Ok(buf)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).with_context(|| format!("failed to write {}", tmp.display()))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("failed to move {} into place", path.display()));
    }
    Ok(())
}

/// Write every table of `output` under `dir` and return the manifest.
pub fn export(output: &PipelineOutput, dir: &Path, format: OutputFormat) -> Result<Manifest> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir: {}", dir.display()))?;

    let mut tables = Vec::new();
    for table in output.tables() {
        let bytes = match format {
            OutputFormat::Csv => table_to_csv(table)?,
            OutputFormat::Parquet => table_to_parquet(table)?,
        };
        let file = format!("{}.{}", table.name(), format.extension());
        write_atomic(&dir.join(&file), &bytes)?;
        debug!(file = %file, rows = table.height(), bytes = bytes.len(), "wrote table");

        tables.push(TableEntry {
            name: table.name().to_string(),
            file,
            rows: table.height(),
            columns: table.column_names(),
            blake3: blake3::hash(&bytes).to_hex().to_string(),
        });
    }

    let manifest = Manifest {
        schema_version: SCHEMA_VERSION,
        kind: output.kind,
        start_date: output.start,
        end_date: output.end,
        created_at: Utc::now(),
        format,
        tables,
    };
    let json =
        serde_json::to_string_pretty(&manifest).context("failed to serialize manifest to JSON")?;
    write_atomic(&dir.join(MANIFEST_FILE), json.as_bytes())?;

    info!(dir = %dir.display(), tables = manifest.tables.len(), "export complete");
    Ok(manifest)
}

/// Load a manifest, rejecting unknown schema versions.
pub fn read_manifest(dir: &Path) -> Result<Manifest> {
    let path = dir.join(MANIFEST_FILE);
    let json = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let manifest: Manifest =
        serde_json::from_str(&json).context("failed to deserialize manifest from JSON")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

/// Re-hash every file listed in the manifest.
pub fn verify(dir: &Path, manifest: &Manifest) -> Result<()> {
    for entry in &manifest.tables {
        let path = dir.join(&entry.file);
        let bytes = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let actual = blake3::hash(&bytes).to_hex().to_string();
        if actual != entry.blake3 {
            bail!("{} does not match its manifest hash", entry.file);
        }
    }
    Ok(())
}
