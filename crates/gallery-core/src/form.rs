use chrono::{DateTime, NaiveDateTime};
use common::{AppDraft, AppEntry, SaveMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditForm {
    pub draft: AppDraft,
    pub launch_summary: Option<String>,
}

impl EditForm {
    pub fn blank() -> Self {
        Self {
            draft: AppDraft::default(),
            launch_summary: None,
        }
    }

    pub fn for_app(app: &AppEntry) -> Self {
        Self {
            draft: AppDraft::from(app),
            launch_summary: Some(launch_summary(app)),
        }
    }

    pub fn mode(&self) -> SaveMode {
        self.draft.mode()
    }

    pub fn title(&self) -> &'static str {
        match self.mode() {
            SaveMode::Create => "Add App",
            SaveMode::Update => "Edit App",
        }
    }
}

pub fn launch_summary(app: &AppEntry) -> String {
    let last = app
        .last_launched
        .as_deref()
        .map(display_date)
        .unwrap_or_else(|| "Never".to_string());
    format!("Launched {} times • Last: {last}", app.launch_count)
}

/// Renders a server timestamp as a calendar date, or echoes it when unparseable.
pub fn display_date(raw: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.date_naive().to_string();
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return parsed.date().to_string();
    }
    raw.to_string()
}
