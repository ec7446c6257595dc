use crate::error::{ExportError, Result};
use crate::mapping::schema::FieldSet;
use serde::de::{self, DeserializeOwned, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Name value the extraction layer uses to simulate a broken record.
const INVALID_SENTINEL: &str = "Invalid";

/// One scraped value as the extraction layer hands it over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
    List(Vec<RawValue>),
}

impl RawValue {
    pub fn render(&self) -> String {
        match self {
            RawValue::Null => String::new(),
            RawValue::Text(text) => text.clone(),
            RawValue::Number(number) => number.to_string(),
            RawValue::Flag(flag) => flag.to_string(),
            RawValue::List(items) => items
                .iter()
                .map(RawValue::render)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl From<&str> for RawValue {
    fn from(text: &str) -> Self {
        RawValue::Text(text.to_string())
    }
}

impl From<Vec<&str>> for RawValue {
    fn from(items: Vec<&str>) -> Self {
        RawValue::List(items.into_iter().map(RawValue::from).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    fields: HashMap<String, RawValue>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<K: Into<String>, V: Into<RawValue>>(mut self, field: K, value: V) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&RawValue> {
        self.fields.get(field)
    }

    pub fn name(&self) -> Option<&str> {
        match self.fields.get("name") {
            Some(RawValue::Text(name)) => Some(name),
            _ => None,
        }
    }
}

/// Failure shape the extraction layer emits instead of a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionFailure {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    pub error_details: Vec<String>,
}

impl ExtractionFailure {
    /// Reads a failure object. Returns `None` unless `error` is present and
    /// not null; the other keys are taken as far as they are usable.
    pub fn from_object(object: &serde_json::Map<String, Value>) -> Option<Self> {
        let error = match object.get("error") {
            None | Some(Value::Null) => return None,
            Some(value) => render_json(value),
        };

        let error_type = object
            .get("errorType")
            .and_then(Value::as_str)
            .map(str::to_string);

        let error_details = match object.get("errorDetails") {
            Some(Value::Array(items)) => items.iter().map(render_json).collect(),
            Some(Value::String(detail)) => vec![detail.clone()],
            _ => Vec::new(),
        };

        Some(Self {
            error,
            error_type,
            error_details,
        })
    }
}

fn render_json(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error.trim_end_matches('.'))?;
        if !self.error_details.is_empty() {
            write!(f, ". Details: {}", self.error_details.join(", "))?;
        }
        Ok(())
    }
}

/// Whatever the extraction layer produced: the data, or why it could not.
///
/// Any object with a non-null `error` key is a failure, whatever shape the
/// rest of it has.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtractionOutcome<T> {
    Failed(ExtractionFailure),
    Extracted(T),
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for ExtractionOutcome<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if let Value::Object(object) = &value {
            if let Some(failure) = ExtractionFailure::from_object(object) {
                return Ok(ExtractionOutcome::Failed(failure));
            }
        }
        serde_json::from_value(value)
            .map(ExtractionOutcome::Extracted)
            .map_err(de::Error::custom)
    }
}

impl<T> ExtractionOutcome<T> {
    pub fn into_result(self) -> Result<T> {
        match self {
            ExtractionOutcome::Extracted(data) => Ok(data),
            ExtractionOutcome::Failed(failure) => Err(ExportError::ExtractionFailed {
                message: failure.to_string(),
            }),
        }
    }
}

/// Output label to rendered value, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedRecord {
    entries: Vec<(String, String)>,
}

impl MappedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repeated label overwrites the value but keeps its first position.
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, label: K, value: V) {
        let label = label.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == label) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((label, value)),
        }
    }

    pub fn with<K: Into<String>, V: Into<String>>(mut self, label: K, value: V) -> Self {
        self.insert(label, value);
        self
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == label)
            .map(|(_, value)| value.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for MappedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MappedRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct MappedRecordVisitor;

        impl<'de> Visitor<'de> for MappedRecordVisitor {
            type Value = MappedRecord;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of labels to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<MappedRecord, A::Error> {
                let mut record = MappedRecord::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    record.insert(key, value);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(MappedRecordVisitor)
    }
}

/// Result of one export: a single profile or a batch of search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExportData {
    Single(MappedRecord),
    Batch(Vec<MappedRecord>),
}

impl ExportData {
    pub fn records(&self) -> &[MappedRecord] {
        match self {
            ExportData::Single(record) => std::slice::from_ref(record),
            ExportData::Batch(records) => records,
        }
    }

    pub fn record_count(&self) -> usize {
        self.records().len()
    }
}

/// Applies `fields` to one raw record.
///
/// Every enabled field produces a column, even when the record lacks it.
pub fn map_record(raw: &RawRecord, fields: &FieldSet) -> Result<MappedRecord> {
    if raw.name() == Some(INVALID_SENTINEL) {
        return Err(ExportError::InvalidData {
            message: "record flagged as invalid by the extraction layer".to_string(),
        });
    }

    let mut mapped = MappedRecord::new();
    for (field, spec) in fields.enabled_in_order() {
        let value = raw.get(field).map(RawValue::render).unwrap_or_default();
        mapped.insert(spec.label.as_str(), value);
    }

    Ok(mapped)
}

pub fn map_records(raws: &[RawRecord], fields: &FieldSet) -> Result<Vec<MappedRecord>> {
    raws.iter().map(|raw| map_record(raw, fields)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::schema::{default_profile_fields, FieldSpec};

    fn sample_profile() -> RawRecord {
        RawRecord::new()
            .with("name", "John Doe")
            .with("title", "Software Engineer at Example Corp")
            .with("company", "Example Corp")
            .with("email", "john.doe@example.com")
            .with("connections", "500+ connections")
            .with("skills", vec!["Rust", "SQL", "Go"])
    }

    #[test]
    fn test_map_follows_order_not_declaration() {
        let fields = FieldSet::new()
            .with_field("name", FieldSpec::new("Full Name", true, 1))
            .with_field("company", FieldSpec::new("Current Employer", true, 3))
            .with_field("title", FieldSpec::new("Job Title", true, 2))
            .with_field("email", FieldSpec::new("Email Address", true, 4))
            .with_field("connections", FieldSpec::new("Connections Count", true, 5))
            .with_field("nonExistentField", FieldSpec::new("Should Not Appear", true, 6));

        let mapped = map_record(&sample_profile(), &fields).unwrap();

        assert_eq!(
            mapped.keys().collect::<Vec<_>>(),
            vec![
                "Full Name",
                "Job Title",
                "Current Employer",
                "Email Address",
                "Connections Count",
                "Should Not Appear"
            ]
        );
        assert_eq!(mapped.get("Current Employer"), Some("Example Corp"));
        assert_eq!(mapped.get("Should Not Appear"), Some(""));
    }

    #[test]
    fn test_disabled_fields_are_dropped() {
        let fields = FieldSet::new()
            .with_field("name", FieldSpec::new("Name", true, 1))
            .with_field("title", FieldSpec::new("Title", false, 2))
            .with_field("company", FieldSpec::new("Company", true, 3));

        let mapped = map_record(&sample_profile(), &fields).unwrap();
        assert_eq!(mapped.keys().collect::<Vec<_>>(), vec!["Name", "Company"]);
    }

    #[test]
    fn test_arrays_and_nulls() {
        let raw = sample_profile().with("about", RawValue::Null);
        let mapped = map_record(&raw, &default_profile_fields()).unwrap();

        assert_eq!(mapped.get("Skills"), Some("Rust, SQL, Go"));
        assert_eq!(mapped.get("About"), Some(""));
        assert_eq!(mapped.get("Phone"), Some(""));
    }

    #[test]
    fn test_numbers_and_flags_are_stringified() {
        let raw: RawRecord =
            serde_json::from_str(r#"{"name":"Ann","title":42,"company":true}"#).unwrap();
        let mapped = map_record(&raw, &default_profile_fields()).unwrap();

        assert_eq!(mapped.get("Title"), Some("42"));
        assert_eq!(mapped.get("Company"), Some("true"));
    }

    #[test]
    fn test_invalid_sentinel_always_fails() {
        let raw = RawRecord::new().with("name", "Invalid");
        assert!(matches!(
            map_record(&raw, &default_profile_fields()),
            Err(ExportError::InvalidData { .. })
        ));
        assert!(map_record(&raw, &FieldSet::new()).is_err());
    }

    #[test]
    fn test_extraction_failure_is_detected() {
        let outcome: ExtractionOutcome<RawRecord> = serde_json::from_str(
            r#"{"error":"Failed to extract critical profile data.","errorType":"parsing_error","errorDetails":["name","title"]}"#,
        )
        .unwrap();

        match outcome.into_result() {
            Err(ExportError::ExtractionFailed { message }) => assert_eq!(
                message,
                "Failed to extract critical profile data. Details: name, title"
            ),
            other => panic!("expected extraction failure, got {:?}", other),
        }
    }

    #[test]
    fn test_extraction_failure_with_single_detail_string() {
        let outcome: ExtractionOutcome<RawRecord> =
            serde_json::from_str(r#"{"error":"Failed","errorDetails":"name"}"#).unwrap();

        match outcome.into_result() {
            Err(ExportError::ExtractionFailed { message }) => {
                assert_eq!(message, "Failed. Details: name")
            }
            other => panic!("expected extraction failure, got {:?}", other),
        }
    }

    #[test]
    fn test_extraction_failure_with_structured_details() {
        let outcome: ExtractionOutcome<Vec<RawRecord>> = serde_json::from_str(
            r#"{"error":"No results.","errorType":7,"errorDetails":[{"field":"name"},"title"]}"#,
        )
        .unwrap();

        match outcome {
            ExtractionOutcome::Failed(failure) => {
                assert_eq!(failure.error_type, None);
                assert_eq!(
                    failure.to_string(),
                    r#"No results. Details: {"field":"name"}, title"#
                );
            }
            other => panic!("expected extraction failure, got {:?}", other),
        }
    }

    #[test]
    fn test_null_error_key_is_not_a_failure() {
        let outcome: ExtractionOutcome<RawRecord> =
            serde_json::from_str(r#"{"error":null,"name":"Ann"}"#).unwrap();
        assert_eq!(outcome.into_result().unwrap().name(), Some("Ann"));
    }

    #[test]
    fn test_batches_parse_as_extracted() {
        let outcome: ExtractionOutcome<Vec<RawRecord>> =
            serde_json::from_str(r#"[{"name":"User 1"},{"name":"User 2"}]"#).unwrap();
        assert_eq!(outcome.into_result().unwrap().len(), 2);

        let empty: ExtractionOutcome<Vec<RawRecord>> = serde_json::from_str("[]").unwrap();
        assert!(empty.into_result().unwrap().is_empty());
    }

    #[test]
    fn test_mapped_record_json_keeps_order() {
        let record = MappedRecord::new().with("Zeta", "1").with("Alpha", "2");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"Zeta":"1","Alpha":"2"}"#);

        let back: MappedRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
