use crate::error::{ExportError, Result};
use crate::export::history::HistoryEntry;
use crate::mapping::schema::{FieldMapping, FieldSet, SCHEMA_VERSION};
use crate::storage::{self, put_key, read_key, Snapshot, Store};
use tracing::{info, warn};

/// Version assumed for stores written before versions were recorded.
const LEGACY_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Empty store, seeded with defaults.
    Installed,
    /// Stored mapping merged with the current defaults.
    Upgraded { from: u32 },
    Current,
}

/// Brings the store up to the current schema. Run once at startup.
pub async fn migrate<S: Store>(store: &S, current_month: u32) -> Result<MigrationOutcome> {
    let snapshot = store
        .get(&[storage::SCHEMA_VERSION, storage::FIELD_MAPPING])
        .await?;
    let version: Option<u32> = read_key(&snapshot, storage::SCHEMA_VERSION)?;

    match version {
        Some(v) if v == SCHEMA_VERSION => Ok(MigrationOutcome::Current),
        Some(v) if v > SCHEMA_VERSION => Err(ExportError::Storage {
            message: format!(
                "store uses schema version {} but this build only understands up to {}",
                v, SCHEMA_VERSION
            ),
        }),
        Some(v) => upgrade(store, &snapshot, v).await,
        None if !snapshot.contains_key(storage::FIELD_MAPPING) => {
            install(store, current_month).await
        }
        None => upgrade(store, &snapshot, LEGACY_VERSION).await,
    }
}

async fn install<S: Store>(store: &S, current_month: u32) -> Result<MigrationOutcome> {
    let mut patch = Snapshot::new();
    put_key(&mut patch, storage::EXPORT_HISTORY, &Vec::<HistoryEntry>::new())?;
    put_key(&mut patch, storage::EXPORT_COUNT, &0u32)?;
    put_key(&mut patch, storage::LAST_EXPORT_MONTH, &current_month)?;
    put_key(&mut patch, storage::IS_PRO_USER, &false)?;
    put_key(&mut patch, storage::FIELD_MAPPING, &FieldMapping::default())?;
    put_key(&mut patch, storage::SCHEMA_VERSION, &SCHEMA_VERSION)?;
    store.set(patch).await?;

    info!("Initialized export store with default field mapping");
    Ok(MigrationOutcome::Installed)
}

async fn upgrade<S: Store>(store: &S, snapshot: &Snapshot, from: u32) -> Result<MigrationOutcome> {
    let stored = match read_key::<FieldMapping>(snapshot, storage::FIELD_MAPPING) {
        Ok(mapping) => mapping.unwrap_or_default(),
        Err(e) => {
            warn!("Discarding unreadable field mapping during migration: {}", e);
            FieldMapping::default()
        }
    };

    let mut patch = Snapshot::new();
    put_key(&mut patch, storage::FIELD_MAPPING, &merge_with_defaults(stored))?;
    put_key(&mut patch, storage::SCHEMA_VERSION, &SCHEMA_VERSION)?;
    store.set(patch).await?;

    info!("Migrated field mapping from schema version {} to {}", from, SCHEMA_VERSION);
    Ok(MigrationOutcome::Upgraded { from })
}

/// Keeps every stored field as the user left it, fills in orders the stored
/// fields lack and appends default fields the stored mapping does not have.
pub fn merge_with_defaults(stored: FieldMapping) -> FieldMapping {
    let defaults = FieldMapping::default();
    let mut merged = stored;
    merge_section(&mut merged.profile, &defaults.profile);
    merge_section(&mut merged.search_result, &defaults.search_result);
    merged
}

fn merge_section(stored: &mut FieldSet, defaults: &FieldSet) {
    let names: Vec<String> = stored.iter().map(|(name, _)| name.to_string()).collect();
    for name in names {
        let default_order = defaults.get(&name).and_then(|spec| spec.order);
        if let Some(spec) = stored.get_mut(&name) {
            if spec.order.is_none() {
                spec.order = default_order;
            }
        }
    }

    for (name, spec) in defaults.iter() {
        if !stored.contains(name) {
            stored.insert(name, spec.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::schema::FieldSpec;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn legacy_store() -> MemoryStore {
        let mut data = Snapshot::new();
        data.insert(
            storage::FIELD_MAPPING.to_string(),
            json!({
                "profile": {
                    "name": { "label": "Full Name", "enabled": true },
                    "links": { "label": "Links", "enabled": true },
                    "email": { "label": "Email", "enabled": false }
                },
                "searchResult": {
                    "name": { "label": "Name", "enabled": true }
                }
            }),
        );
        data.insert(storage::EXPORT_COUNT.to_string(), json!(4));
        MemoryStore::with_data(data)
    }

    #[tokio::test]
    async fn test_fresh_store_is_installed() {
        let store = MemoryStore::new();
        let outcome = migrate(&store, 6).await.unwrap();
        assert_eq!(outcome, MigrationOutcome::Installed);

        let data = store.dump().await;
        assert_eq!(data[storage::EXPORT_COUNT], json!(0));
        assert_eq!(data[storage::LAST_EXPORT_MONTH], json!(6));
        assert_eq!(data[storage::IS_PRO_USER], json!(false));
        assert_eq!(data[storage::EXPORT_HISTORY], json!([]));
        assert_eq!(data[storage::SCHEMA_VERSION], json!(SCHEMA_VERSION));

        let mapping: FieldMapping = read_key(&data, storage::FIELD_MAPPING).unwrap().unwrap();
        assert_eq!(mapping, FieldMapping::default());
    }

    #[tokio::test]
    async fn test_legacy_mapping_is_merged() {
        let store = legacy_store();
        let outcome = migrate(&store, 6).await.unwrap();
        assert_eq!(outcome, MigrationOutcome::Upgraded { from: 1 });

        let data = store.dump().await;
        let mapping: FieldMapping = read_key(&data, storage::FIELD_MAPPING).unwrap().unwrap();

        let name = mapping.profile.get("name").unwrap();
        assert_eq!(name.label, "Full Name");
        assert_eq!(name.order, Some(1));

        let links = mapping.profile.get("links").unwrap();
        assert_eq!(links.order, None);
        assert!(!mapping.profile.get("email").unwrap().enabled);
        assert!(mapping.profile.contains("skills"));
        assert_eq!(mapping.search_result.len(), 7);

        // quota keys are left alone
        assert_eq!(data[storage::EXPORT_COUNT], json!(4));
    }

    #[tokio::test]
    async fn test_current_store_is_untouched() {
        let store = MemoryStore::new();
        migrate(&store, 2).await.unwrap();

        let mut patch = Snapshot::new();
        let custom = FieldMapping {
            profile: FieldSet::new().with_field("name", FieldSpec::new("N", true, 1)),
            search_result: FieldSet::new(),
        };
        put_key(&mut patch, storage::FIELD_MAPPING, &custom).unwrap();
        store.set(patch).await.unwrap();

        assert_eq!(migrate(&store, 3).await.unwrap(), MigrationOutcome::Current);
        let data = store.dump().await;
        let mapping: FieldMapping = read_key(&data, storage::FIELD_MAPPING).unwrap().unwrap();
        assert_eq!(mapping, custom);
    }

    #[tokio::test]
    async fn test_newer_schema_is_rejected() {
        let mut data = Snapshot::new();
        data.insert(storage::SCHEMA_VERSION.to_string(), json!(SCHEMA_VERSION + 1));
        let store = MemoryStore::with_data(data);

        assert!(matches!(
            migrate(&store, 0).await,
            Err(ExportError::Storage { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreadable_legacy_mapping_falls_back_to_defaults() {
        let mut data = Snapshot::new();
        data.insert(
            storage::FIELD_MAPPING.to_string(),
            json!({ "profile": { "name": "Name" }, "searchResult": {} }),
        );
        let store = MemoryStore::with_data(data);

        migrate(&store, 0).await.unwrap();
        let data = store.dump().await;
        let mapping: FieldMapping = read_key(&data, storage::FIELD_MAPPING).unwrap().unwrap();
        assert_eq!(mapping, FieldMapping::default());
    }
}
