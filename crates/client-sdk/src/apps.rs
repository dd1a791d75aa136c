use common::{
    AppDraft, AppEntry, AppsEnvelope, LaunchResponse, SaveMode, StatusResponse, normalize_category,
};
use gallery_core::launch::encode_component;
use gallery_core::{CategoryPanel, launch_url};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{GalleryClient, GalleryError, Result};

/// Asks the user before a destructive call.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub mode: SaveMode,
    pub app: Option<AppEntry>,
}

/// Where to navigate after a launch, and the counter if the server reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutcome {
    pub url: String,
    pub launch_count: Option<u64>,
}

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this app?";

impl GalleryClient {
    /// Decodes every stored entry. Entries that are not records are skipped.
    pub async fn list_apps(&self) -> Result<Vec<AppEntry>> {
        let entries = self.list_apps_raw().await?;
        Ok(decode_entries(entries))
    }

    /// The collection as stored, without normalizing any field.
    pub async fn list_apps_raw(&self) -> Result<Vec<Value>> {
        let envelope: AppsEnvelope = self
            .execute_json(self.http.get(self.url("/api/apps")), "load apps")
            .await?;
        Ok(envelope.into_entries())
    }

    pub async fn get_app(&self, app_id: &str) -> Result<AppEntry> {
        self.execute_json(
            self.http.get(self.url(&format!("/api/apps/{}", encode_component(app_id)))),
            "load app",
        )
        .await
    }

    /// POST for a new app, PUT when the draft carries an id.
    pub async fn save_app(&self, draft: AppDraft) -> Result<SaveOutcome> {
        let draft = draft.normalized();
        if draft.name.is_empty() {
            return Err(GalleryError::Validation("App name is required".to_string()));
        }

        let mode = draft.mode();
        let request = match mode {
            SaveMode::Create => self.http.post(self.url("/api/apps")),
            SaveMode::Update => self.http.put(self.url("/api/apps")),
        };
        debug!(?mode, name = %draft.name, "submitting app");

        let response: StatusResponse = self.execute_json(request.json(&draft), "save app").await?;
        if !response.is_success() {
            return Err(GalleryError::Rejected {
                action: "save app",
                status: response.status,
                message: response.error,
            });
        }

        info!(?mode, name = %draft.name, "saved app");
        Ok(SaveOutcome {
            mode,
            app: response.app,
        })
    }

    /// Saves the form, ensuring a newly typed category exists first.
    ///
    /// A failure while adding the category aborts before the app is saved.
    pub async fn submit_app_form(
        &self,
        mut draft: AppDraft,
        new_category: Option<&str>,
        panel: &mut CategoryPanel,
    ) -> Result<SaveOutcome> {
        if let Some(name) = new_category.map(str::trim).filter(|name| !name.is_empty()) {
            let outcome = self.add_category(name).await?;
            draft.category = panel.apply(name, &outcome);
        } else {
            draft.category = normalize_category(&draft.category);
        }
        self.save_app(draft).await
    }

    pub async fn delete_app(&self, app_id: &str) -> Result<()> {
        self.execute(
            self.http.delete(self.url(&format!("/api/apps/{}", encode_component(app_id)))),
            "delete app",
        )
        .await?;
        info!(app_id = %app_id, "deleted app");
        Ok(())
    }

    /// Issues the delete only when `confirm` agrees.
    pub async fn delete_app_confirmed(
        &self,
        app_id: &str,
        confirm: &mut impl Confirm,
    ) -> Result<DeleteOutcome> {
        if !confirm.confirm(DELETE_PROMPT) {
            debug!(app_id = %app_id, "delete cancelled");
            return Ok(DeleteOutcome::Cancelled);
        }
        self.delete_app(app_id).await?;
        Ok(DeleteOutcome::Deleted)
    }

    pub async fn record_launch(&self, app_id: &str) -> Result<Option<u64>> {
        let response: LaunchResponse = self
            .execute_json(
                self.http
                    .post(self.url(&format!("/api/apps/{}/launch", encode_component(app_id)))),
                "record launch",
            )
            .await?;
        Ok(response.launch_count)
    }

    /// Best-effort counter update followed by the launch URL. Never fails.
    pub async fn launch(&self, app_id: &str, app_name: &str, template: &str) -> LaunchOutcome {
        let url = launch_url(template, app_name);
        let launch_count = match self.record_launch(app_id).await {
            Ok(count) => count,
            Err(err) => {
                warn!(error = %err, app_id = %app_id, "failed to record launch");
                None
            }
        };
        LaunchOutcome { url, launch_count }
    }
}

fn decode_entries(entries: Vec<Value>) -> Vec<AppEntry> {
    let total = entries.len();
    let apps = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match AppEntry::from_value(entry) {
            Ok(app) => Some(app),
            Err(err) => {
                warn!(index, error = %err, "skipping undecodable app entry");
                None
            }
        })
        .collect::<Vec<_>>();
    if apps.len() < total {
        warn!(
            skipped = total - apps.len(),
            total, "some stored apps could not be decoded; run repair"
        );
    }
    apps
}
