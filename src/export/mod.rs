pub mod csv_writer;
pub mod file_writer;
pub mod history;
pub mod quota;
pub mod report;

pub use csv_writer::serialize;
pub use file_writer::ExportWriter;
pub use history::{HistoryEntry, HistoryKind, HistoryLog, DEFAULT_HISTORY_CAPACITY};
pub use quota::{QuotaState, DEFAULT_MONTHLY_LIMIT, UNLIMITED};
pub use report::ExportReport;
