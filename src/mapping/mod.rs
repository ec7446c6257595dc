pub mod mapper;
pub mod migration;
pub mod schema;

pub use mapper::{
    map_record, map_records, ExportData, ExtractionFailure, ExtractionOutcome, MappedRecord,
    RawRecord, RawValue,
};
pub use migration::{migrate, MigrationOutcome};
pub use schema::{FieldMapping, FieldSet, FieldSpec, RecordKind, DEFAULT_ORDER, SCHEMA_VERSION};
