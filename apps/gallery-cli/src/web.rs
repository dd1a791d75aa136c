use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::Utc;
use client_sdk::{DeleteOutcome, GalleryClient, GalleryError, SettingsSync};
use common::{AppDraft, AppEntry};
use gallery_core::launch::encode_component;
use gallery_core::{CategoryFilter, CategoryOutcome, CategoryPanel, EditForm, SortKey};
use serde::Deserialize;
use tracing::{error, info, warn};
use web_ui::{GalleryPage, SERVICE_WORKER_JS};

#[derive(Clone)]
struct WebState {
    client: GalleryClient,
    settings: Arc<SettingsSync>,
}

pub async fn serve(client: GalleryClient, bind_addr: SocketAddr) -> Result<()> {
    let settings = Arc::new(SettingsSync::new(client.clone()));
    settings.load().await;

    let state = WebState {
        client,
        settings: settings.clone(),
    };

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(%bind_addr, server = %state.client.server_base_url(), "gallery web ui listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    settings.flush().await;
    Ok(())
}

fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(gallery))
        .route("/api/ping", get(ping))
        .route("/sw.js", get(service_worker))
        .route("/launch/{id}", get(launch))
        .route("/apps", post(save_app))
        .route("/apps/new", get(new_app))
        .route("/apps/{id}/edit", get(edit_app))
        .route("/apps/{id}/delete", get(confirm_delete).post(delete_app))
        .route("/categories", post(add_category))
        .route("/settings", get(settings_page))
        .route("/settings/icon-size", post(change_icon_size))
        .route("/settings/reset", post(reset_settings))
        .route("/api/settings/shortcut-url", post(change_shortcut_url))
        .route("/export", get(export))
        .route("/import", post(import))
        .route("/repair", post(repair))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true, "service": "app-gallery-web" }))
}

async fn service_worker() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        SERVICE_WORKER_JS,
    )
}

#[derive(Debug, Default, Deserialize)]
struct GalleryQuery {
    sort: Option<String>,
    category: Option<String>,
    edit: Option<String>,
    notice: Option<String>,
}

async fn gallery(
    State(state): State<WebState>,
    Query(query): Query<GalleryQuery>,
) -> Html<String> {
    let settings = state.settings.load().await;

    let (apps, load_error) = match state.client.list_apps().await {
        Ok(apps) => (apps, None),
        Err(err) => {
            error!(error = %err, "failed to load apps");
            (Vec::new(), Some(err.user_message()))
        }
    };
    let listed = list_categories(&state.client).await;

    let sort = query
        .sort
        .as_deref()
        .filter(|raw| !raw.is_empty())
        .and_then(|raw| raw.parse::<SortKey>().ok());
    let filter = CategoryFilter::new(query.category.as_deref());
    let visible = gallery_core::arrange(&apps, &filter, sort);
    let categories = CategoryPanel::seeded(&listed, &apps);
    let notice = load_error.or(query.notice);

    Html(web_ui::render_gallery(&GalleryPage {
        apps: &visible,
        settings: &settings,
        categories: &categories,
        filter: &filter,
        sort,
        edit_mode: matches!(query.edit.as_deref(), Some("1" | "true")),
        notice: notice.as_deref(),
    }))
}

#[derive(Debug, Deserialize)]
struct LaunchQuery {
    name: Option<String>,
}

async fn launch(
    State(state): State<WebState>,
    Path(id): Path<String>,
    Query(query): Query<LaunchQuery>,
) -> Response {
    let name = match query.name.filter(|name| !name.trim().is_empty()) {
        Some(name) => name,
        None => match state.client.get_app(&id).await {
            Ok(app) => app.name,
            Err(err) => return alert(&state, &err, "/").await,
        },
    };

    let template = state.settings.view().await.shortcut_url;
    let outcome = state.client.launch(&id, &name, &template).await;
    Redirect::to(&outcome.url).into_response()
}

async fn new_app(State(state): State<WebState>) -> Html<String> {
    let panel = category_panel(&state.client).await;
    let layout = state.settings.view().await.layout();
    Html(web_ui::render_edit_form(&EditForm::blank(), &panel, layout))
}

async fn edit_app(State(state): State<WebState>, Path(id): Path<String>) -> Response {
    let app = match state.client.get_app(&id).await {
        Ok(app) => app,
        Err(err) => return alert(&state, &err, "/").await,
    };
    let panel = category_panel(&state.client).await;
    let layout = state.settings.view().await.layout();
    Html(web_ui::render_edit_form(&EditForm::for_app(&app), &panel, layout)).into_response()
}

#[derive(Debug, Default, Deserialize)]
struct AppForm {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    new_category: String,
    #[serde(default)]
    icon_url: String,
    #[serde(default)]
    app_store_link: String,
}

impl AppForm {
    fn into_draft(self) -> (AppDraft, String) {
        let id = Some(self.id).filter(|id| !id.trim().is_empty());
        let draft = AppDraft {
            id,
            name: self.name,
            category: self.category,
            icon_url: self.icon_url,
            app_store_link: self.app_store_link,
        };
        (draft, self.new_category)
    }
}

async fn save_app(State(state): State<WebState>, Form(form): Form<AppForm>) -> Response {
    let (draft, new_category) = form.into_draft();
    let back = match draft.id.as_deref() {
        Some(id) => format!("/apps/{}/edit", encode_component(id)),
        None => "/apps/new".to_string(),
    };

    let mut panel = CategoryPanel::default();
    match state
        .client
        .submit_app_form(draft, Some(new_category.as_str()), &mut panel)
        .await
    {
        Ok(_) => Redirect::to("/").into_response(),
        Err(err) => alert(&state, &err, &back).await,
    }
}

async fn confirm_delete(State(state): State<WebState>, Path(id): Path<String>) -> Response {
    match state.client.get_app(&id).await {
        Ok(app) => {
            let layout = state.settings.view().await.layout();
            Html(web_ui::render_confirm_delete(&app, layout)).into_response()
        }
        Err(err) => alert(&state, &err, "/").await,
    }
}

#[derive(Debug, Default, Deserialize)]
struct DeleteForm {
    confirm: Option<String>,
}

async fn delete_app(
    State(state): State<WebState>,
    Path(id): Path<String>,
    Form(form): Form<DeleteForm>,
) -> Response {
    let confirmed = form.confirm.as_deref() == Some("yes");
    let mut confirm = |_: &str| confirmed;
    match state.client.delete_app_confirmed(&id, &mut confirm).await {
        Ok(DeleteOutcome::Deleted) => Redirect::to("/").into_response(),
        Ok(DeleteOutcome::Cancelled) => {
            Redirect::to(&format!("/apps/{}/edit", encode_component(&id))).into_response()
        }
        Err(err) => alert(&state, &err, "/").await,
    }
}

#[derive(Debug, Deserialize)]
struct CategoryForm {
    #[serde(default)]
    name: String,
}

async fn add_category(State(state): State<WebState>, Form(form): Form<CategoryForm>) -> Response {
    match state.client.add_category(&form.name).await {
        Ok(CategoryOutcome::Exists(category)) => {
            notice_redirect(&format!("Category {category} already exists"))
        }
        Ok(CategoryOutcome::Created(category)) => {
            notice_redirect(&format!("Added category {category}"))
        }
        Err(err) => alert(&state, &err, "/").await,
    }
}

async fn settings_page(State(state): State<WebState>) -> Html<String> {
    let view = state.settings.load().await;
    Html(web_ui::render_settings(&view))
}

#[derive(Debug, Deserialize)]
struct IconSizeForm {
    icon_size: u32,
}

async fn change_icon_size(
    State(state): State<WebState>,
    Form(form): Form<IconSizeForm>,
) -> Redirect {
    state.settings.change_icon_size(form.icon_size).await;
    Redirect::to("/settings")
}

async fn reset_settings(State(state): State<WebState>) -> Response {
    match state.settings.reset().await {
        Ok(_) => Redirect::to("/settings").into_response(),
        Err(err) => alert(&state, &err, "/settings").await,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShortcutUrlUpdate {
    shortcut_url: String,
}

async fn change_shortcut_url(
    State(state): State<WebState>,
    Json(update): Json<ShortcutUrlUpdate>,
) -> StatusCode {
    state.settings.change_shortcut_url(update.shortcut_url).await;
    StatusCode::ACCEPTED
}

async fn export(State(state): State<WebState>) -> Response {
    let now = Utc::now();
    let document = match state.client.export(now).await {
        Ok(document) => document,
        Err(err) => return alert(&state, &err, "/settings").await,
    };
    let body = match document.to_pretty_json() {
        Ok(body) => body,
        Err(err) => {
            error!(error = %err, "failed to encode export");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let disposition = format!(
        "attachment; filename=\"{}\"",
        gallery_core::export_file_name(now.date_naive())
    );
    (
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

async fn import(State(state): State<WebState>, mut multipart: Multipart) -> Response {
    let text = match read_import_upload(&mut multipart).await {
        Ok(text) => text,
        Err(err) => {
            let message = format!("{err:#}");
            return alert_page(&state, StatusCode::BAD_REQUEST, &message, "/settings").await;
        }
    };

    match state.client.import_text(&text).await {
        Ok(summary) => notice_redirect(&format!(
            "Successfully imported {} apps and updated {} apps.",
            summary.imported, summary.updated
        )),
        Err(err) => alert(&state, &err, "/settings").await,
    }
}

/// The uploaded `file` part, or the pasted `payload` when no file was chosen.
async fn read_import_upload(multipart: &mut Multipart) -> Result<String> {
    let mut pasted = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .context("invalid import upload")?
    {
        let name = field.name().unwrap_or_default().to_string();
        let text = field
            .text()
            .await
            .with_context(|| format!("failed to read upload field {name}"))?;
        match name.as_str() {
            "file" if !text.trim().is_empty() => return Ok(text),
            "payload" => pasted = Some(text),
            _ => {}
        }
    }

    match pasted.filter(|text| !text.trim().is_empty()) {
        Some(text) => Ok(text),
        None => bail!("Please choose a JSON file to import"),
    }
}

async fn repair(State(state): State<WebState>) -> Response {
    match state.client.repair(Utc::now()).await {
        Ok(summary) => notice_redirect(&format!(
            "JSON structure fixed: {} apps updated.",
            summary.imported + summary.updated
        )),
        Err(err) => alert(&state, &err, "/settings").await,
    }
}

async fn list_categories(client: &GalleryClient) -> Vec<String> {
    match client.list_categories().await {
        Ok(categories) => categories,
        Err(err) => {
            warn!(error = %err, "failed to load categories; using categories in use");
            Vec::new()
        }
    }
}

async fn category_panel(client: &GalleryClient) -> CategoryPanel {
    let apps: Vec<AppEntry> = match client.list_apps().await {
        Ok(apps) => apps,
        Err(err) => {
            warn!(error = %err, "failed to load apps for category list");
            Vec::new()
        }
    };
    CategoryPanel::seeded(&list_categories(client).await, &apps)
}

fn notice_redirect(message: &str) -> Response {
    Redirect::to(&format!("/?notice={}", encode_component(message))).into_response()
}

async fn alert(state: &WebState, err: &GalleryError, back_href: &str) -> Response {
    let status = match err {
        GalleryError::Validation(_) | GalleryError::Format(_) => StatusCode::BAD_REQUEST,
        GalleryError::Status { status, .. } if *status == StatusCode::NOT_FOUND => {
            StatusCode::NOT_FOUND
        }
        _ => StatusCode::BAD_GATEWAY,
    };
    warn!(error = %err, %status, "showing alert");
    alert_page(state, status, &err.user_message(), back_href).await
}

async fn alert_page(
    state: &WebState,
    status: StatusCode,
    message: &str,
    back_href: &str,
) -> Response {
    let layout = state.settings.view().await.layout();
    (
        status,
        Html(web_ui::render_alert(message, back_href, layout)),
    )
        .into_response()
}
