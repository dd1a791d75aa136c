use std::sync::Arc;

use common::{Settings, SettingsEnvelope};
use gallery_core::{IconSize, SettingsView};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::{Debouncer, GalleryClient, GalleryError, Result};

impl GalleryClient {
    pub async fn fetch_settings(&self) -> Result<Settings> {
        let envelope: SettingsEnvelope = self
            .execute_json(self.http.get(self.url("/api/settings")), "load settings")
            .await?;
        Ok(envelope.into_settings())
    }

    pub async fn update_settings(&self, patch: &Settings) -> Result<Settings> {
        let envelope: SettingsEnvelope = self
            .execute_json(
                self.http.put(self.url("/api/settings")).json(patch),
                "save settings",
            )
            .await?;
        Ok(envelope.into_settings())
    }

    pub async fn reset_settings(&self) -> Result<Settings> {
        let envelope: SettingsEnvelope = self
            .execute_json(
                self.http.post(self.url("/api/settings/reset")),
                "reset settings",
            )
            .await?;
        Ok(envelope.into_settings())
    }
}

/// Owns the settings panel view state and keeps it in step with the server.
///
/// Every write is optimistic: the view changes first and stays changed when
/// persisting fails. A field whose write failed or is still pending is not
/// overwritten by a later [`SettingsSync::load`]. Shortcut URL writes go
/// through a [`Debouncer`].
pub struct SettingsSync {
    client: GalleryClient,
    state: Arc<RwLock<LocalSettings>>,
    shortcut_writes: Debouncer,
}

#[derive(Debug, Clone)]
struct LocalSettings {
    view: SettingsView,
    icon_size_unsaved: bool,
    shortcut_url_unsaved: bool,
}

impl LocalSettings {
    fn apply_server(&mut self, settings: &Settings) {
        let mut incoming = settings.clone();
        if self.icon_size_unsaved {
            incoming.icon_size = None;
        }
        if self.shortcut_url_unsaved {
            incoming.shortcut_url = None;
        }
        self.view.apply(&incoming);
    }
}

impl SettingsSync {
    pub fn new(client: GalleryClient) -> Self {
        let view = SettingsView {
            shortcut_url: client.config().shortcut_url.clone(),
            ..SettingsView::default()
        };
        let shortcut_writes = Debouncer::new(client.config().debounce);
        Self {
            client,
            state: Arc::new(RwLock::new(LocalSettings {
                view,
                icon_size_unsaved: false,
                shortcut_url_unsaved: false,
            })),
            shortcut_writes,
        }
    }

    pub fn client(&self) -> &GalleryClient {
        &self.client
    }

    pub async fn view(&self) -> SettingsView {
        self.state.read().await.view.clone()
    }

    /// Never fails: a missing or broken payload falls back to the 60px layout.
    pub async fn load(&self) -> SettingsView {
        let fetched = self.client.fetch_settings().await;
        let mut state = self.state.write().await;
        match fetched {
            Ok(settings) if settings.icon_size.is_some() => {
                state.apply_server(&settings);
                debug!(icon_size = state.view.icon_size.px(), "applied server settings");
            }
            Ok(settings) => {
                warn!(?settings, "settings payload has no iconSize; using default layout");
                if !state.icon_size_unsaved {
                    state.view.icon_size = IconSize::default();
                }
                state.apply_server(&settings);
            }
            Err(err) => {
                warn!(error = %err, "failed to load settings; using default layout");
                if !state.icon_size_unsaved {
                    state.view.icon_size = IconSize::default();
                }
            }
        }
        state.view.clone()
    }

    /// Applies the size locally, then persists it. Failures are only logged.
    pub async fn change_icon_size(&self, px: u32) -> SettingsView {
        {
            let mut state = self.state.write().await;
            state.view.icon_size = IconSize::from_px(px);
            state.icon_size_unsaved = true;
        }

        match self.client.update_settings(&Settings::icon_size(px)).await {
            Ok(saved) => {
                let mut state = self.state.write().await;
                state.icon_size_unsaved = false;
                state.apply_server(&saved);
                info!(icon_size = px, "saved icon size");
            }
            Err(err) => {
                error!(error = %err, icon_size = px, "failed to save icon size; keeping local value");
            }
        }
        self.view().await
    }

    /// Applies the template locally and schedules a debounced save.
    ///
    /// A blank template is neither applied nor saved.
    pub async fn change_shortcut_url(&self, url: impl Into<String>) -> SettingsView {
        let url = url.into().trim().to_string();
        if url.is_empty() {
            debug!("ignoring blank shortcut url");
            return self.view().await;
        }

        {
            let mut state = self.state.write().await;
            state.view.apply(&Settings::shortcut_url(url.clone()));
            state.shortcut_url_unsaved = true;
        }

        let client = self.client.clone();
        let shared = Arc::clone(&self.state);
        self.shortcut_writes
            .schedule(async move {
                match client.update_settings(&Settings::shortcut_url(url.clone())).await {
                    Ok(_) => {
                        let mut state = shared.write().await;
                        if state.view.shortcut_url == url {
                            state.shortcut_url_unsaved = false;
                        }
                        info!("saved shortcut url");
                    }
                    Err(err) => error!(error = %err, "failed to save shortcut url"),
                }
            })
            .await;
        self.view().await
    }

    /// Waits for a pending shortcut URL save to finish.
    pub async fn flush(&self) {
        self.shortcut_writes.flush().await;
    }

    /// User-initiated reset: errors are returned to the caller.
    pub async fn reset(&self) -> Result<SettingsView> {
        self.shortcut_writes.cancel().await;
        let settings = self.client.reset_settings().await?;
        if settings.icon_size.is_none() {
            return Err(GalleryError::Malformed {
                action: "reset settings",
                detail: "response has no iconSize".to_string(),
            });
        }

        let mut state = self.state.write().await;
        *state = LocalSettings {
            view: SettingsView {
                shortcut_url: self.client.config().shortcut_url.clone(),
                ..SettingsView::default()
            },
            icon_size_unsaved: false,
            shortcut_url_unsaved: false,
        };
        state.view.apply(&settings);
        Ok(state.view.clone())
    }
}
