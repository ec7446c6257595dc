use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Sort position used for fields that carry no explicit `order`.
pub const DEFAULT_ORDER: i64 = 999;

/// Current version of the persisted field mapping layout.
pub const SCHEMA_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub label: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl FieldSpec {
    pub fn new<S: Into<String>>(label: S, enabled: bool, order: i64) -> Self {
        Self {
            label: label.into(),
            enabled,
            order: Some(order),
        }
    }

    pub fn sort_key(&self) -> i64 {
        self.order.unwrap_or(DEFAULT_ORDER)
    }
}

/// Raw field name to [`FieldSpec`], in the order the entries were declared.
///
/// Declaration order breaks ties between equal `order` values, so it
/// survives serialization in both directions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    entries: Vec<(String, FieldSpec)>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field<S: Into<String>>(mut self, field: S, spec: FieldSpec) -> Self {
        self.insert(field, spec);
        self
    }

    /// Replaces an existing entry in place, otherwise appends.
    pub fn insert<S: Into<String>>(&mut self, field: S, spec: FieldSpec) {
        let field = field.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = spec,
            None => self.entries.push((field, spec)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldSpec> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, spec)| spec)
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut FieldSpec> {
        self.entries
            .iter_mut()
            .find(|(name, _)| name == field)
            .map(|(_, spec)| spec)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.entries.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Enabled entries in ascending `order`; equal orders keep declaration order.
    pub fn enabled_in_order(&self) -> Vec<(&str, &FieldSpec)> {
        let mut enabled: Vec<(&str, &FieldSpec)> =
            self.iter().filter(|(_, spec)| spec.enabled).collect();
        enabled.sort_by_key(|(_, spec)| spec.sort_key());
        enabled
    }

    pub fn enabled_labels(&self) -> Vec<&str> {
        self.enabled_in_order()
            .into_iter()
            .map(|(_, spec)| spec.label.as_str())
            .collect()
    }
}

impl Serialize for FieldSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, spec) in &self.entries {
            map.serialize_entry(name, spec)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct FieldSetVisitor;

        impl<'de> Visitor<'de> for FieldSetVisitor {
            type Value = FieldSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field names to field specs")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<FieldSet, A::Error> {
                let mut set = FieldSet::new();
                while let Some((name, spec)) = access.next_entry::<String, FieldSpec>()? {
                    set.insert(name, spec);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(FieldSetVisitor)
    }
}

/// Field mappings for the two record shapes the extraction layer produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    #[serde(default)]
    pub profile: FieldSet,
    #[serde(default)]
    pub search_result: FieldSet,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            profile: default_profile_fields(),
            search_result: default_search_result_fields(),
        }
    }
}

impl FieldMapping {
    pub fn section(&self, kind: RecordKind) -> &FieldSet {
        match kind {
            RecordKind::Profile => &self.profile,
            RecordKind::SearchResult => &self.search_result,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Profile,
    SearchResult,
}

pub fn default_profile_fields() -> FieldSet {
    FieldSet::new()
        .with_field("name", FieldSpec::new("Name", true, 1))
        .with_field("title", FieldSpec::new("Title", true, 2))
        .with_field("company", FieldSpec::new("Company", true, 3))
        .with_field("location", FieldSpec::new("Location", true, 4))
        .with_field("email", FieldSpec::new("Email", true, 5))
        .with_field("phone", FieldSpec::new("Phone", true, 6))
        .with_field("profileUrl", FieldSpec::new("Profile URL", true, 7))
        .with_field("about", FieldSpec::new("About", true, 8))
        .with_field("education", FieldSpec::new("Education", true, 9))
        .with_field("skills", FieldSpec::new("Skills", true, 10))
        .with_field("connections", FieldSpec::new("Connections", false, 11))
        .with_field("publicProfileUrl", FieldSpec::new("Public Profile URL", false, 12))
        .with_field("socialLinks", FieldSpec::new("Social Links", false, 13))
        .with_field("industry", FieldSpec::new("Industry", false, 14))
}

pub fn default_search_result_fields() -> FieldSet {
    FieldSet::new()
        .with_field("name", FieldSpec::new("Name", true, 1))
        .with_field("title", FieldSpec::new("Title", true, 2))
        .with_field("company", FieldSpec::new("Company", true, 3))
        .with_field("location", FieldSpec::new("Location", true, 4))
        .with_field("profileUrl", FieldSpec::new("Profile URL", true, 5))
        .with_field("connectionDegree", FieldSpec::new("Connection Degree", false, 6))
        .with_field("mutualConnections", FieldSpec::new("Mutual Connections", false, 7))
}
