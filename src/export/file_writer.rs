use crate::error::{ExportError, Result};
use crate::export::history::HistoryKind;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_FILENAME_PREFIX: &str = "linkedin";

/// Writes CSV exports into one output directory.
pub struct ExportWriter {
    output_directory: PathBuf,
    prefix: String,
}

impl ExportWriter {
    pub fn new<P: Into<PathBuf>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.into(),
            prefix: DEFAULT_FILENAME_PREFIX.to_string(),
        }
    }

    pub fn with_prefix<S: AsRef<str>>(mut self, prefix: S) -> Self {
        self.prefix = sanitize_prefix(prefix.as_ref());
        self
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn file_name(&self, kind: HistoryKind, date: NaiveDate) -> String {
        let stem = match kind {
            HistoryKind::Profile => "export",
            HistoryKind::SearchResults => "search_results",
        };
        format!("{}_{}_{}.csv", self.prefix, stem, date.format("%Y-%m-%d"))
    }

    /// Writes `csv` and returns the path of the file; an existing file for
    /// the same day is replaced.
    pub fn write(&self, kind: HistoryKind, csv: &str, date: NaiveDate) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_directory).map_err(|e| ExportError::Config {
            message: format!(
                "Cannot create output directory {}: {}",
                self.output_directory.display(),
                e
            ),
        })?;

        let path = self.output_directory.join(self.file_name(kind, date));
        fs::write(&path, csv)?;
        Ok(path)
    }
}

fn sanitize_prefix(prefix: &str) -> String {
    let sanitized: String = prefix
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let sanitized = sanitized.trim_matches('_');
    if sanitized.is_empty() {
        DEFAULT_FILENAME_PREFIX.to_string()
    } else {
        sanitized.to_string()
    }
}
