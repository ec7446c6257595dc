// tests/message_flow.rs
use chrono::{Local, TimeZone};
use serde_json::{json, Value};

use export_assistant::service::FixedClock;
use export_assistant::storage::Snapshot;
use export_assistant::{ExportService, JsonFileStore, MemoryStore, Response};

fn clock(month: u32) -> FixedClock {
    FixedClock(Local.with_ymd_and_hms(2026, month, 10, 14, 0, 0).unwrap())
}

fn to_value(response: &Response) -> Value {
    serde_json::to_value(response).unwrap()
}

#[tokio::test]
async fn free_user_runs_out_of_exports_then_upgrades() {
    let service = ExportService::with_clock(MemoryStore::new(), clock(4));
    service.migrate().await.unwrap();

    for n in 0..20 {
        let request = json!({"type": "EXPORT_PROFILE", "payload": {"name": format!("User {}", n)}});
        let response = service.handle_json(&request.to_string()).await;
        assert!(response.is_success(), "export {} should pass", n);
    }

    let refused = to_value(
        &service
            .handle_json(r#"{"type":"EXPORT_PROFILE","payload":{"name":"One Too Many"}}"#)
            .await,
    );
    assert_eq!(refused["success"], false);
    assert_eq!(
        refused["message"],
        "Export limit reached (20/20). Upgrade to PRO for unlimited exports."
    );

    let status = to_value(&service.handle_json(r#"{"type":"GET_STATUS"}"#).await);
    assert_eq!(status["exportCount"], 20);
    assert_eq!(status["exportLimit"], 20);
    assert_eq!(status["exportHistory"][0]["data"]["Name"], "User 19");

    let upgraded = service
        .handle_json(r#"{"type":"SET_PRO_STATUS","payload":true}"#)
        .await;
    assert!(upgraded.is_success());

    let after = to_value(
        &service
            .handle_json(r#"{"type":"EXPORT_SEARCH_RESULTS","payload":[{"name":"A","connectionDegree":"2nd"},{"name":"B"}]}"#)
            .await,
    );
    assert_eq!(after["success"], true);
    assert_eq!(after["data"][0], json!({"Name": "A", "Title": "", "Company": "", "Location": "", "Profile URL": ""}));

    let status = to_value(&service.handle_json(r#"{"type":"GET_STATUS"}"#).await);
    assert_eq!(status["exportCount"], 21);
    assert_eq!(status["exportLimit"], -1);
    assert_eq!(status["exportHistory"][0]["type"], "search_results");
    assert_eq!(status["exportHistory"][0]["count"], 2);
}

#[tokio::test]
async fn counter_resets_when_month_changes() {
    let mut seeded = Snapshot::new();
    seeded.insert("exportCount".to_string(), json!(20));
    seeded.insert("lastExportMonth".to_string(), json!(3));
    let store = MemoryStore::with_data(seeded);

    // May is zero-based month 4
    let service = ExportService::with_clock(store, clock(5));
    let response = to_value(
        &service
            .handle_json(r#"{"type":"EXPORT_PROFILE","payload":{"name":"New Month"}}"#)
            .await,
    );
    assert_eq!(response["success"], true);

    let status = service.status().await.unwrap();
    assert_eq!(status.export_count, 1);
}

#[tokio::test]
async fn custom_mapping_reorders_and_relabels_columns() {
    let service = ExportService::with_clock(MemoryStore::new(), clock(4));
    service.migrate().await.unwrap();

    let mapping = json!({
        "type": "UPDATE_FIELD_MAPPING",
        "payload": {
            "profile": {
                "company": {"label": "Employer", "enabled": true, "order": 1},
                "name": {"label": "Full Name", "enabled": true, "order": 2},
                "email": {"label": "Email", "enabled": false, "order": 3}
            },
            "searchResult": {}
        }
    });
    let ack = to_value(&service.handle_json(&mapping.to_string()).await);
    assert_eq!(ack, json!({"success": true, "message": "Field mapping updated."}));

    let exported = to_value(
        &service
            .handle_json(r#"{"type":"EXPORT_PROFILE","payload":{"name":"Ann","company":"Acme","email":"a@b.c"}}"#)
            .await,
    );
    let columns: Vec<&str> = exported["data"]
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(columns, vec!["Employer", "Full Name"]);

    let csv = export_assistant::serialize(
        &serde_json::from_value(exported["data"].clone()).unwrap(),
    )
    .unwrap();
    assert_eq!(csv, "Employer,Full Name\n\"Acme\",\"Ann\"\n");
}

#[tokio::test]
async fn file_store_survives_restart() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("state").join("store.json");

    {
        let service = ExportService::with_clock(JsonFileStore::new(&path), clock(4));
        service.migrate().await.unwrap();
        let response = service
            .handle_json(r#"{"type":"EXPORT_PROFILE","payload":{"name":"Persisted"}}"#)
            .await;
        assert!(response.is_success());
    }

    let service = ExportService::with_clock(JsonFileStore::new(&path), clock(4));
    let status = service.status().await.unwrap();
    assert_eq!(status.export_count, 1);
    assert_eq!(status.export_history.len(), 1);
    assert_eq!(
        status.export_history[0].data.records()[0].get("Name"),
        Some("Persisted")
    );
}
