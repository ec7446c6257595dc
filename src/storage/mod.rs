pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::{ExportError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

pub const EXPORT_HISTORY: &str = "exportHistory";
pub const EXPORT_COUNT: &str = "exportCount";
pub const LAST_EXPORT_MONTH: &str = "lastExportMonth";
pub const IS_PRO_USER: &str = "isProUser";
pub const FIELD_MAPPING: &str = "fieldMapping";
pub const SCHEMA_VERSION: &str = "schemaVersion";

/// Key/value view of the store; absent keys are simply missing.
pub type Snapshot = Map<String, Value>;

/// Asynchronous key/value persistence.
///
/// `set` merges the patch into what is stored; keys not in the patch are
/// left untouched.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, keys: &[&str]) -> Result<Snapshot>;
    async fn set(&self, patch: Snapshot) -> Result<()>;
}

pub fn read_key<T: DeserializeOwned>(snapshot: &Snapshot, key: &str) -> Result<Option<T>> {
    match snapshot.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| ExportError::Storage {
                message: format!("stored value for '{}' is malformed: {}", key, e),
            }),
    }
}

pub fn put_key<T: Serialize>(patch: &mut Snapshot, key: &str, value: &T) -> Result<()> {
    patch.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(())
}

fn select(all: &Snapshot, keys: &[&str]) -> Snapshot {
    keys.iter()
        .filter_map(|key| all.get(*key).map(|value| (key.to_string(), value.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_key_treats_null_as_missing() {
        let mut snapshot = Snapshot::new();
        snapshot.insert(EXPORT_COUNT.to_string(), Value::Null);

        let count: Option<u32> = read_key(&snapshot, EXPORT_COUNT).unwrap();
        assert!(count.is_none());
    }

    #[test]
    fn test_read_key_reports_malformed_values() {
        let mut snapshot = Snapshot::new();
        snapshot.insert(EXPORT_COUNT.to_string(), json!("twenty"));

        let result: Result<Option<u32>> = read_key(&snapshot, EXPORT_COUNT);
        assert!(matches!(result, Err(ExportError::Storage { .. })));
    }

    #[test]
    fn test_select_skips_absent_keys() {
        let mut all = Snapshot::new();
        all.insert(EXPORT_COUNT.to_string(), json!(3));
        all.insert(IS_PRO_USER.to_string(), json!(false));

        let picked = select(&all, &[EXPORT_COUNT, FIELD_MAPPING]);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[EXPORT_COUNT], json!(3));
    }
}
