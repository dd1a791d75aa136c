use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_CATEGORY: &str = "uncategorized";
pub const DEFAULT_ICON_SIZE_PX: u32 = 60;
pub const DEFAULT_SHORTCUT_URL: &str = "shortcuts://run-shortcut?name=open_iOS_Apps";

pub type AppId = String;

/// One shortcut record as the gallery API returns it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppEntry {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: AppId,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default = "default_category", deserialize_with = "normalized_category")]
    pub category: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub icon_url: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub app_store_link: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub launch_count: u64,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub last_launched: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub last_modified: Option<String>,
}

impl AppEntry {
    /// Decodes one stored entry. Only a non-object entry is an error.
    pub fn from_value(entry: Value) -> serde_json::Result<Self> {
        serde_json::from_value(entry)
    }
}

/// Payload of the add/edit form. It never carries a launch count.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AppId>,
    pub name: String,
    pub category: String,
    pub icon_url: String,
    pub app_store_link: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    Create,
    Update,
}

impl AppDraft {
    /// Create vs update depends only on a non-empty identifier.
    pub fn mode(&self) -> SaveMode {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => SaveMode::Update,
            _ => SaveMode::Create,
        }
    }

    /// Trims fields, lowercases the category and drops a blank id.
    pub fn normalized(mut self) -> Self {
        self.id = self
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        self.name = self.name.trim().to_string();
        self.category = normalize_category(&self.category);
        self.icon_url = self.icon_url.trim().to_string();
        self.app_store_link = self.app_store_link.trim().to_string();
        self
    }
}

impl From<&AppEntry> for AppDraft {
    fn from(app: &AppEntry) -> Self {
        Self {
            id: Some(app.id.clone()),
            name: app.name.clone(),
            category: app.category.clone(),
            icon_url: app.icon_url.clone().unwrap_or_default(),
            app_store_link: app.app_store_link.clone().unwrap_or_default(),
        }
    }
}

/// Settings record. Also used as the partial body of `PUT /api/settings`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_icon_size"
    )]
    pub icon_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut_url: Option<String>,
}

impl Settings {
    pub fn icon_size(px: u32) -> Self {
        Self {
            icon_size: Some(px),
            shortcut_url: None,
        }
    }

    pub fn shortcut_url(url: impl Into<String>) -> Self {
        Self {
            icon_size: None,
            shortcut_url: Some(url.into()),
        }
    }
}

/// `GET`/`PUT /api/settings` answer either bare or wrapped in `settings`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SettingsEnvelope {
    Wrapped { settings: Settings },
    Bare(Settings),
}

impl SettingsEnvelope {
    pub fn into_settings(self) -> Settings {
        match self {
            Self::Wrapped { settings } => settings,
            Self::Bare(settings) => settings,
        }
    }
}

/// `GET /api/apps` answers `{apps: [...]}` or a bare array.
///
/// Entries stay raw so one malformed record cannot reject the whole list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AppsEnvelope {
    Wrapped { apps: Vec<Value> },
    Bare(Vec<Value>),
}

impl AppsEnvelope {
    pub fn into_entries(self) -> Vec<Value> {
        match self {
            Self::Wrapped { apps } => apps,
            Self::Bare(apps) => apps,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub app: Option<AppEntry>,
}

impl StatusResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchResponse {
    #[serde(default, deserialize_with = "lenient_optional_count")]
    pub launch_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportRequest {
    pub apps: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub status: String,
    #[serde(default)]
    pub imported: u64,
    #[serde(default)]
    pub updated: u64,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryResponse {
    pub status: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CategoryList {
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub fn normalize_category(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_CATEGORY.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Text from a loosely typed JSON field. Numbers and booleans are rendered.
pub fn text_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(text_from_value).unwrap_or_default())
}

fn normalized_category<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = lenient_text(deserializer)?;
    Ok(normalize_category(&raw))
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = lenient_text(deserializer)?;
    Ok(Some(raw).filter(|value| !value.trim().is_empty()))
}

/// Launch counts and icon sizes as stored by older clients: numbers, floats
/// or numeric strings. Anything else has no count.
pub fn count_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(count_from_value).unwrap_or(0))
}

fn lenient_optional_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(count_from_value))
}

fn lenient_icon_size<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(count_from_value)
        .and_then(|px| u32::try_from(px).ok()))
}
