use crate::mapping::{ExportData, MappedRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    Profile,
    SearchResults,
}

impl HistoryKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            HistoryKind::Profile => "Profile",
            HistoryKind::SearchResults => "Search Results",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Export time in epoch milliseconds.
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    pub data: ExportData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub exported_at: String,
}

impl HistoryEntry {
    pub fn profile(record: MappedRecord, at: DateTime<Utc>) -> Self {
        Self {
            id: at.timestamp_millis(),
            kind: HistoryKind::Profile,
            data: ExportData::Single(record),
            count: None,
            exported_at: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn search_results(records: Vec<MappedRecord>, at: DateTime<Utc>) -> Self {
        Self {
            id: at.timestamp_millis(),
            kind: HistoryKind::SearchResults,
            count: Some(records.len()),
            data: ExportData::Batch(records),
            exported_at: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn record_count(&self) -> usize {
        self.count.unwrap_or_else(|| self.data.record_count())
    }
}

/// Most-recent-first list of past exports, bounded by `capacity`.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
    capacity: usize,
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    pub fn from_entries(mut entries: Vec<HistoryEntry>, capacity: usize) -> Self {
        entries.truncate(capacity);
        Self { entries, capacity }
    }

    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(self.capacity);
    }

    pub fn list(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
