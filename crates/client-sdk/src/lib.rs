use std::time::Duration;

use common::{DEFAULT_SHORTCUT_URL, ErrorBody};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

pub mod apps;
pub mod categories;
pub mod debounce;
mod error;
pub mod settings;
pub mod transfer;

pub use apps::{Confirm, DeleteOutcome, LaunchOutcome, SaveOutcome};
pub use debounce::Debouncer;
pub use error::{GalleryError, Result};
pub use settings::SettingsSync;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    /// Launch template used until the server provides one.
    pub shortcut_url: String,
    /// Quiescence window for the shortcut URL auto-save.
    pub debounce: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            shortcut_url: DEFAULT_SHORTCUT_URL.to_string(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_url: std::env::var("APP_GALLERY_SERVER_URL").unwrap_or(defaults.server_url),
            shortcut_url: std::env::var("APP_GALLERY_SHORTCUT_URL")
                .unwrap_or(defaults.shortcut_url),
            debounce: std::env::var("APP_GALLERY_DEBOUNCE_MS")
                .ok()
                .and_then(|raw| raw.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.debounce),
        }
    }
}

/// Typed client for the gallery REST API.
#[derive(Clone)]
pub struct GalleryClient {
    http: Client,
    server_base_url: String,
    config: ClientConfig,
}

impl GalleryClient {
    pub fn new(server_base_url: impl Into<String>) -> Self {
        Self::with_config(ClientConfig {
            server_url: server_base_url.into(),
            ..ClientConfig::default()
        })
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            http: Client::new(),
            server_base_url: config.server_url.trim_end_matches('/').to_string(),
            config,
        }
    }

    pub fn server_base_url(&self) -> &str {
        &self.server_base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server_base_url, path)
    }

    /// Sends the request and turns non-2xx answers into [`GalleryError::Status`].
    async fn execute(&self, request: RequestBuilder, action: &'static str) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|source| GalleryError::Transport { action, source })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .map(|body| body.error);
        Err(GalleryError::Status {
            action,
            status,
            message,
        })
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        action: &'static str,
    ) -> Result<T> {
        let response = self.execute(request, action).await?;
        decode(response, action).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response, action: &'static str) -> Result<T> {
    let body = response
        .text()
        .await
        .map_err(|source| GalleryError::Transport { action, source })?;

    serde_json::from_str(&body).map_err(|err| GalleryError::Malformed {
        action,
        detail: err.to_string(),
    })
}
