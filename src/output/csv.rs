//! Delimited text export
//!
//! Writes the merged rows as a delimited file: a header built from the first
//! row's keys, then one line per row in page order.

use crate::error::{Error, Result};
use crate::pagination::ResultSet;
use crate::query::{QueryTemplate, DATE_FROM_KEY, DATE_TO_KEY, FREQUENCY_KEY};
use crate::types::{JsonObject, Row};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default field delimiter
pub const DEFAULT_DELIMITER: char = '|';

/// CSV export settings of a run profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvConfig {
    /// Export after every run
    #[serde(default)]
    pub enabled: bool,
    /// Target directory (defaults to the working directory)
    #[serde(default)]
    pub dir: Option<String>,
    /// Field delimiter
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_delimiter() -> char {
    DEFAULT_DELIMITER
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: None,
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

/// Build the export file name: `{YYYY-MM-DD}_{profile}_{ini}_{fin}_{freq}.csv`
///
/// Filters the query does not carry are left out of the name.
pub fn csv_file_name(date: NaiveDate, profile: &str, query: &QueryTemplate) -> String {
    let date = date.format("%Y-%m-%d").to_string();
    let mut parts = vec![date.as_str(), profile];
    for key in [DATE_FROM_KEY, DATE_TO_KEY, FREQUENCY_KEY] {
        if let Some(value) = query.get_str(key).filter(|v| !v.is_empty()) {
            parts.push(value);
        }
    }
    format!("{}.csv", parts.join("_"))
}

/// Writes result sets to delimited files in one directory
#[derive(Debug, Clone)]
pub struct CsvWriter {
    dir: PathBuf,
    delimiter: char,
}

impl CsvWriter {
    /// Create a writer for the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            delimiter: DEFAULT_DELIMITER,
        }
    }

    /// Set the delimiter
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Write every row of `result` to `file_name`
    ///
    /// Returns `None` without creating a file when there are no rows.
    pub fn write(&self, result: &ResultSet, file_name: &str) -> Result<Option<PathBuf>> {
        if result.is_empty() {
            warn!("No rows to export, skipping {}", file_name);
            return Ok(None);
        }

        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        let count = write_rows(&path, result.rows(), self.delimiter)?;

        info!("Exported {} rows to {}", count, path.display());
        Ok(Some(path))
    }
}

/// Write rows to `path`; the header comes from the first row
///
/// A later row may leave header fields out (written as empty cells) but may
/// not carry a field the header lacks. That is checked before the file is
/// created, so a rejected export leaves nothing behind.
pub fn write_rows<'a>(
    path: &Path,
    rows: impl IntoIterator<Item = &'a Row>,
    delimiter: char,
) -> Result<usize> {
    let rows = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| as_object(row, index))
        .collect::<Result<Vec<_>>>()?;
    let Some(first) = rows.first() else {
        return Ok(0);
    };
    let header: Vec<&str> = first.keys().map(String::as_str).collect();

    for (index, row) in rows.iter().enumerate().skip(1) {
        if let Some(key) = row.keys().find(|key| !first.contains_key(*key)) {
            return Err(Error::output(format!(
                "row {index} has field '{key}' that is not in the header"
            )));
        }
    }

    let file = File::create(path)?;
    let mut out = BufWriter::new(file);

    write_line(&mut out, header.iter().map(|h| escape_field(h, delimiter)), delimiter)?;
    for row in &rows {
        write_record(&mut out, &header, row, delimiter)?;
    }

    out.flush()?;
    Ok(rows.len())
}

fn as_object(row: &Row, index: usize) -> Result<&JsonObject> {
    row.as_object()
        .ok_or_else(|| Error::output(format!("row {index} is not a JSON object")))
}

fn write_record(
    out: &mut impl Write,
    header: &[&str],
    row: &JsonObject,
    delimiter: char,
) -> Result<()> {
    let fields = header.iter().map(|key| {
        let text = row.get(*key).map(format_value).unwrap_or_default();
        escape_field(&text, delimiter)
    });
    write_line(out, fields, delimiter)
}

fn write_line(
    out: &mut impl Write,
    fields: impl Iterator<Item = String>,
    delimiter: char,
) -> Result<()> {
    let line = fields.collect::<Vec<_>>().join(&delimiter.to_string());
    writeln!(out, "{line}")?;
    Ok(())
}

/// Render a JSON value as a CSV cell
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Quote a cell when it contains the delimiter, a quote or a line break
pub fn escape_field(field: &str, delimiter: char) -> String {
    if field.contains(delimiter) || field.contains(['"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
