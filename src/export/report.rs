use crate::export::HistoryKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// What a file export produced, for the CLI to print.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub kind: HistoryKind,
    pub message: String,
    pub records: usize,
    pub file: PathBuf,
    /// `None` for PRO users.
    pub remaining_exports: Option<u32>,
    pub exported_at: DateTime<Utc>,
}
