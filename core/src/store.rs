//! Flat-file persistence layer.
//!
//! RULE: Only store.rs touches the data files.
//! Tasks hand records to a RecordStore; they never open files directly.
//!
//! Rows are append-only and flushed one at a time, so an aborted run
//! keeps everything it wrote up to the abort.

use crate::{
    error::TaskResult,
    session::SessionManifest,
};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A value that serializes to exactly one CSV line.
pub trait CsvRecord {
    /// Column names, in field order.
    fn header() -> &'static [&'static str];

    fn fields(&self) -> Vec<String>;
}

pub struct RecordStore {
    path:   PathBuf,
    writer: BufWriter<File>,
    rows:   u64,
}

impl RecordStore {
    /// Create (or truncate) the data file at `path` and write the header.
    pub fn create(path: &Path, header: &[&str]) -> TaskResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "{}", header.join(","))?;
        writer.flush()?;
        log::debug!("Opened data file {}", path.display());
        Ok(Self { path: path.to_path_buf(), writer, rows: 0 })
    }

    /// Append one row and flush it to disk.
    pub fn append<R: CsvRecord>(&mut self, record: &R) -> TaskResult<()> {
        let line = record
            .fields()
            .iter()
            .map(|f| escape_field(f))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Data rows written so far, header excluded.
    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Write the session manifest as pretty JSON, replacing any earlier copy.
pub fn write_manifest(path: &Path, manifest: &SessionManifest<'_>) -> TaskResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(manifest)?;
    fs::write(path, json)?;
    Ok(())
}

/// Quote fields that would otherwise break the column layout.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Fixed-precision formatting shared by every record type.
pub fn fmt_points(value: f64) -> String {
    format!("{value:.2}")
}

pub fn fmt_time(value: f64) -> String {
    format!("{value:.4}")
}
