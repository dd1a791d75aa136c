use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use common::{AppEntry, count_from_value, normalize_category};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

pub const EXPORT_FORMAT: &str = "app-gallery";
pub const EXPORT_VERSION: u32 = 2;

/// Versioned export envelope. Its `apps` field keeps it importable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub format: String,
    pub version: u32,
    pub exported_at: String,
    pub apps: Vec<AppEntry>,
}

impl ExportDocument {
    pub fn new(apps: Vec<AppEntry>, now: DateTime<Utc>) -> Self {
        Self {
            format: EXPORT_FORMAT.to_string(),
            version: EXPORT_VERSION,
            exported_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            apps,
        }
    }

    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("app-gallery-backup-{}.json", date.format("%Y-%m-%d"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFormatError(pub String);

impl fmt::Display for ImportFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid import file: {}", self.0)
    }
}

impl std::error::Error for ImportFormatError {}

/// Accepts a bare array of entries or an object whose `apps` field is an array.
pub fn parse_import(text: &str) -> Result<Vec<Value>, ImportFormatError> {
    let document: Value = serde_json::from_str(text)
        .map_err(|err| ImportFormatError(format!("not valid JSON: {err}")))?;

    match document {
        Value::Array(entries) => Ok(entries),
        Value::Object(mut object) => match object.remove("apps") {
            Some(Value::Array(entries)) => Ok(entries),
            Some(_) => Err(ImportFormatError("`apps` must be an array".to_string())),
            None => Err(ImportFormatError(
                "object has no `apps` array".to_string(),
            )),
        },
        _ => Err(ImportFormatError(
            "expected an array of apps or an object with an `apps` array".to_string(),
        )),
    }
}

/// Rewrites a stored entry into the current field layout. Non-objects are dropped.
pub fn repair_entry(entry: &Value, now: &str) -> Option<Value> {
    let object = entry.as_object()?;
    let text = |key: &str| text_field(object, key);

    let app_store_link = [text("appStoreLink"), text("link")]
        .into_iter()
        .find(|link| !link.is_empty())
        .unwrap_or_default();
    let launch_count = object
        .get("launchCount")
        .and_then(count_from_value)
        .unwrap_or(0);
    let last_modified = match text("lastModified") {
        "" => now,
        value => value,
    };

    let mut repaired = Map::new();
    if let Some(id) = object.get("id") {
        repaired.insert("id".to_string(), id.clone());
    }
    repaired.insert("name".to_string(), json!(text("name")));
    repaired.insert(
        "category".to_string(),
        json!(normalize_category(text("category"))),
    );
    repaired.insert(
        "iconUrl".to_string(),
        object.get("iconUrl").cloned().unwrap_or(Value::Null),
    );
    repaired.insert("appStoreLink".to_string(), json!(app_store_link));
    repaired.insert("launchCount".to_string(), json!(launch_count));
    repaired.insert("lastModified".to_string(), json!(last_modified));
    repaired.insert(
        "lastLaunched".to_string(),
        object
            .get("lastLaunched")
            .filter(|value| !value.is_null())
            .cloned()
            .unwrap_or(Value::Null),
    );
    Some(Value::Object(repaired))
}

fn text_field<'a>(object: &'a Map<String, Value>, key: &str) -> &'a str {
    object.get(key).and_then(Value::as_str).unwrap_or_default()
}

pub fn repair_entries(entries: &[Value], now: &str) -> Vec<Value> {
    entries
        .iter()
        .filter_map(|entry| repair_entry(entry, now))
        .collect()
}
