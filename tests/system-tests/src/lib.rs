#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::path::PathBuf;
    use std::process::Stdio;
    use std::sync::{Arc, Mutex, OnceLock};
    use std::time::Duration;

    use anyhow::{Context, Result, bail};
    use axum::extract::{Path, State};
    use axum::http::{Method, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use chrono::{TimeZone, Utc};
    use client_sdk::{ClientConfig, DeleteOutcome, GalleryClient, GalleryError, SettingsSync};
    use common::{AppDraft, DEFAULT_SHORTCUT_URL, SaveMode};
    use gallery_core::{CategoryOutcome, CategoryPanel, IconSize, launch_url};
    use serde_json::{Value, json};
    use tokio::io::AsyncWriteExt;
    use tokio::process::{Child, Command};
    use tokio::task::JoinHandle;
    use tokio::time::sleep;

    #[derive(Debug, Clone)]
    struct Recorded {
        method: Method,
        path: String,
        body: Option<Value>,
    }

    #[derive(Debug, Default)]
    struct Backend {
        apps: Vec<Value>,
        categories: Vec<String>,
        settings: Value,
        requests: Vec<Recorded>,
        fail_launch: bool,
        fail_settings_put: bool,
        fail_save: bool,
    }

    type Shared = Arc<Mutex<Backend>>;

    struct MockBackend {
        base_url: String,
        state: Shared,
        handle: JoinHandle<()>,
    }

    impl MockBackend {
        async fn start() -> Result<Self> {
            let state: Shared = Arc::new(Mutex::new(Backend {
                settings: default_settings(),
                ..Backend::default()
            }));

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
            let addr = listener.local_addr()?;
            let app = mock_router(state.clone());
            let handle = tokio::spawn(async move {
                let _ = axum::serve(listener, app).await;
            });

            Ok(Self {
                base_url: format!("http://{addr}"),
                state,
                handle,
            })
        }

        fn client(&self) -> GalleryClient {
            GalleryClient::new(&self.base_url)
        }

        fn with<T>(&self, f: impl FnOnce(&mut Backend) -> T) -> T {
            let mut backend = self.state.lock().unwrap();
            f(&mut backend)
        }

        fn seed(&self, apps: Vec<Value>) {
            self.with(|backend| backend.apps = apps);
        }

        fn requests(&self, method: Method, path: &str) -> Vec<Recorded> {
            self.with(|backend| {
                backend
                    .requests
                    .iter()
                    .filter(|request| request.method == method && request.path == path)
                    .cloned()
                    .collect()
            })
        }

        fn count(&self, method: Method, path: &str) -> usize {
            self.requests(method, path).len()
        }
    }

    impl Drop for MockBackend {
        fn drop(&mut self) {
            self.handle.abort();
        }
    }

    fn default_settings() -> Value {
        json!({ "iconSize": 60, "shortcutUrl": DEFAULT_SHORTCUT_URL })
    }

    fn mock_router(state: Shared) -> Router {
        Router::new()
            .route("/api/apps", get(list_apps).post(create_app).put(update_app))
            .route("/api/apps/import", post(import_apps))
            .route("/api/apps/{id}", get(get_app).delete(delete_app))
            .route("/api/apps/{id}/launch", post(launch_app))
            .route("/api/settings", get(get_settings).put(put_settings))
            .route("/api/settings/reset", post(reset_settings))
            .route("/api/categories", get(list_categories).post(add_category))
            .with_state(state)
    }

    fn record(state: &Shared, method: Method, path: String, body: Option<Value>) {
        state.lock().unwrap().requests.push(Recorded { method, path, body });
    }

    async fn list_apps(State(state): State<Shared>) -> Json<Value> {
        record(&state, Method::GET, "/api/apps".to_string(), None);
        Json(Value::Array(state.lock().unwrap().apps.clone()))
    }

    async fn create_app(
        State(state): State<Shared>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        record(&state, Method::POST, "/api/apps".to_string(), Some(body.clone()));
        let mut backend = state.lock().unwrap();
        if backend.fail_save {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "database is locked" })),
            );
        }
        let mut app = body;
        app["id"] = json!(uuid::Uuid::new_v4().to_string());
        app["launchCount"] = json!(0);
        backend.apps.push(app.clone());
        (StatusCode::OK, Json(json!({ "status": "success", "app": app })))
    }

    async fn update_app(
        State(state): State<Shared>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        record(&state, Method::PUT, "/api/apps".to_string(), Some(body.clone()));
        let mut backend = state.lock().unwrap();
        let existing = backend
            .apps
            .iter_mut()
            .find(|app| app["id"] == body["id"]);
        match existing {
            Some(app) => {
                for key in ["name", "category", "iconUrl", "appStoreLink"] {
                    app[key] = body[key].clone();
                }
                let app = app.clone();
                (StatusCode::OK, Json(json!({ "status": "success", "app": app })))
            }
            None => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "App not found" })),
            ),
        }
    }

    async fn get_app(
        State(state): State<Shared>,
        Path(id): Path<String>,
    ) -> (StatusCode, Json<Value>) {
        record(&state, Method::GET, format!("/api/apps/{id}"), None);
        let backend = state.lock().unwrap();
        match backend.apps.iter().find(|app| app["id"] == json!(id)) {
            Some(app) => (StatusCode::OK, Json(app.clone())),
            None => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "App not found" })),
            ),
        }
    }

    async fn delete_app(State(state): State<Shared>, Path(id): Path<String>) -> Json<Value> {
        record(&state, Method::DELETE, format!("/api/apps/{id}"), None);
        state
            .lock()
            .unwrap()
            .apps
            .retain(|app| app["id"] != json!(id));
        Json(json!({ "status": "success" }))
    }

    async fn launch_app(
        State(state): State<Shared>,
        Path(id): Path<String>,
    ) -> (StatusCode, Json<Value>) {
        record(&state, Method::POST, format!("/api/apps/{id}/launch"), None);
        let mut backend = state.lock().unwrap();
        if backend.fail_launch {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "launch store offline" })),
            );
        }
        match backend.apps.iter_mut().find(|app| app["id"] == json!(id)) {
            Some(app) => {
                let count = app["launchCount"].as_u64().unwrap_or(0) + 1;
                app["launchCount"] = json!(count);
                (
                    StatusCode::OK,
                    Json(json!({ "status": "success", "launchCount": count })),
                )
            }
            None => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "App not found" })),
            ),
        }
    }

    async fn import_apps(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
        record(&state, Method::POST, "/api/apps/import".to_string(), Some(body.clone()));
        let entries = body["apps"].as_array().cloned().unwrap_or_default();
        let mut backend = state.lock().unwrap();
        let (mut imported, mut updated) = (0, 0);
        for mut entry in entries {
            let position = backend
                .apps
                .iter()
                .position(|app| !entry["id"].is_null() && app["id"] == entry["id"]);
            match position {
                Some(index) => {
                    backend.apps[index] = entry;
                    updated += 1;
                }
                None => {
                    if entry["id"].is_null() {
                        entry["id"] = json!(uuid::Uuid::new_v4().to_string());
                    }
                    backend.apps.push(entry);
                    imported += 1;
                }
            }
        }
        let total = backend.apps.len();
        Json(json!({
            "status": "success",
            "imported": imported,
            "updated": updated,
            "total": total
        }))
    }

    async fn get_settings(State(state): State<Shared>) -> Json<Value> {
        record(&state, Method::GET, "/api/settings".to_string(), None);
        Json(state.lock().unwrap().settings.clone())
    }

    async fn put_settings(
        State(state): State<Shared>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        record(&state, Method::PUT, "/api/settings".to_string(), Some(body.clone()));
        let mut backend = state.lock().unwrap();
        if backend.fail_settings_put {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "disk full" })),
            );
        }
        if let (Some(settings), Some(patch)) = (backend.settings.as_object_mut(), body.as_object())
        {
            for (key, value) in patch {
                settings.insert(key.clone(), value.clone());
            }
        }
        (
            StatusCode::OK,
            Json(json!({ "status": "success", "settings": backend.settings })),
        )
    }

    async fn reset_settings(State(state): State<Shared>) -> Json<Value> {
        record(&state, Method::POST, "/api/settings/reset".to_string(), None);
        let mut backend = state.lock().unwrap();
        backend.settings = default_settings();
        Json(json!({ "status": "success", "settings": backend.settings }))
    }

    async fn list_categories(State(state): State<Shared>) -> Json<Value> {
        record(&state, Method::GET, "/api/categories".to_string(), None);
        Json(json!({ "categories": state.lock().unwrap().categories }))
    }

    async fn add_category(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
        record(&state, Method::POST, "/api/categories".to_string(), Some(body.clone()));
        let name = body["name"].as_str().unwrap_or_default().trim().to_lowercase();
        let mut backend = state.lock().unwrap();
        if backend.categories.contains(&name) {
            return Json(json!({ "status": "exists", "category": name }));
        }
        backend.categories.push(name.clone());
        Json(json!({ "status": "success", "category": name }))
    }

    fn sample_apps() -> Vec<Value> {
        vec![
            json!({ "id": "a1", "name": "Maps", "category": "travel", "launchCount": 5 }),
            json!({ "id": "a2", "name": "chess", "category": "games", "launchCount": "x" }),
            json!({ "id": "a3", "name": "Notes", "launchCount": 0, "link": "https://apps.apple.com/notes" }),
            json!({ "id": "a4", "name": "Banking", "category": "finance", "launchCount": null }),
        ]
    }

    #[tokio::test]
    async fn save_app_posts_new_and_puts_existing() -> Result<()> {
        let backend = MockBackend::start().await?;
        let client = backend.client();

        let created = client
            .save_app(AppDraft {
                name: "  Weather ".to_string(),
                category: "Utilities".to_string(),
                ..AppDraft::default()
            })
            .await?;
        assert_eq!(created.mode, SaveMode::Create);
        let app = created.app.context("created app missing from response")?;
        assert_eq!(app.name, "Weather");

        let posted = backend.requests(Method::POST, "/api/apps");
        assert_eq!(posted.len(), 1);
        let body = posted[0].body.clone().context("missing POST body")?;
        assert!(body.get("id").is_none());
        assert!(body.get("launchCount").is_none());
        assert_eq!(body["category"], "utilities");

        let mut draft = AppDraft::from(&app);
        draft.name = "Weather Pro".to_string();
        let updated = client.save_app(draft).await?;
        assert_eq!(updated.mode, SaveMode::Update);
        assert_eq!(backend.count(Method::PUT, "/api/apps"), 1);
        assert_eq!(backend.count(Method::POST, "/api/apps"), 1);

        let stored = client.get_app(&app.id).await?;
        assert_eq!(stored.name, "Weather Pro");
        Ok(())
    }

    #[tokio::test]
    async fn save_app_without_name_sends_nothing() -> Result<()> {
        let backend = MockBackend::start().await?;

        let err = backend
            .client()
            .save_app(AppDraft {
                name: "   ".to_string(),
                ..AppDraft::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::Validation(_)));
        assert_eq!(backend.count(Method::POST, "/api/apps"), 0);
        Ok(())
    }

    #[tokio::test]
    async fn list_apps_tolerates_loose_fields() -> Result<()> {
        let backend = MockBackend::start().await?;
        backend.seed(sample_apps());

        let apps = backend.client().list_apps().await?;
        assert_eq!(apps.len(), 4);
        let counts = apps.iter().map(|app| app.launch_count).collect::<Vec<_>>();
        assert_eq!(counts, vec![5, 0, 0, 0]);
        assert_eq!(apps[2].category, "uncategorized");
        Ok(())
    }

    #[tokio::test]
    async fn one_legacy_entry_does_not_hide_the_collection() -> Result<()> {
        let backend = MockBackend::start().await?;
        let mut apps = sample_apps();
        apps.push(json!({ "id": "legacy", "name": null }));
        apps.push(json!("stray string"));
        backend.seed(apps);
        let client = backend.client();

        let listed = client.list_apps().await?;
        assert_eq!(listed.len(), 5);
        let legacy = listed
            .iter()
            .find(|app| app.id == "legacy")
            .context("legacy entry missing")?;
        assert_eq!(legacy.name, "");

        let document = client.export(Utc::now()).await?;
        assert_eq!(document.apps.len(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn declined_delete_sends_no_request() -> Result<()> {
        let backend = MockBackend::start().await?;
        backend.seed(sample_apps());
        let client = backend.client();

        let mut prompts = Vec::new();
        let mut decline = |prompt: &str| {
            prompts.push(prompt.to_string());
            false
        };
        let outcome = client.delete_app_confirmed("a1", &mut decline).await?;
        assert_eq!(outcome, DeleteOutcome::Cancelled);
        assert_eq!(prompts, vec![client_sdk::apps::DELETE_PROMPT.to_string()]);
        assert_eq!(backend.count(Method::DELETE, "/api/apps/a1"), 0);

        let outcome = client
            .delete_app_confirmed("a1", &mut |_: &str| true)
            .await?;
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert_eq!(backend.count(Method::DELETE, "/api/apps/a1"), 1);
        assert_eq!(client.list_apps().await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn launch_returns_url_even_when_counter_fails() -> Result<()> {
        let backend = MockBackend::start().await?;
        backend.seed(sample_apps());
        let client = backend.client();
        let template = "shortcuts://run-shortcut?name=open";

        let outcome = client.launch("a1", "Maps", template).await;
        assert_eq!(outcome.url, "shortcuts://run-shortcut?name=open&input=Maps");
        assert_eq!(outcome.launch_count, Some(6));

        backend.with(|backend| backend.fail_launch = true);
        let outcome = client.launch("a1", "Maps & More", template).await;
        assert_eq!(outcome.url, launch_url(template, "Maps & More"));
        assert!(outcome.url.ends_with("&input=Maps%20%26%20More"));
        assert_eq!(outcome.launch_count, None);
        assert_eq!(backend.count(Method::POST, "/api/apps/a1/launch"), 2);
        Ok(())
    }

    #[tokio::test]
    async fn adding_a_category_twice_reports_exists() -> Result<()> {
        let backend = MockBackend::start().await?;
        let client = backend.client();
        let mut panel = CategoryPanel::default();

        let first = client.add_category("Games").await?;
        assert_eq!(first, CategoryOutcome::Created("games".to_string()));
        assert_eq!(panel.apply("Games", &first), "games");

        let second = client.add_category(" games ").await?;
        assert_eq!(second, CategoryOutcome::Exists("games".to_string()));
        panel.apply("games", &second);

        assert_eq!(panel.edit.options().len(), 1);
        assert_eq!(panel.filter.options().len(), 1);
        assert_eq!(panel.edit.selected(), Some("games"));
        assert_eq!(client.list_categories().await?, vec!["games".to_string()]);

        let err = client.add_category("  ").await.unwrap_err();
        assert_eq!(err.user_message(), "Please enter a category name");
        assert_eq!(backend.count(Method::POST, "/api/categories"), 2);
        Ok(())
    }

    #[tokio::test]
    async fn new_category_is_created_before_the_app_is_saved() -> Result<()> {
        let backend = MockBackend::start().await?;
        let client = backend.client();
        let mut panel = CategoryPanel::default();

        let outcome = client
            .submit_app_form(
                AppDraft {
                    name: "Chess".to_string(),
                    category: "travel".to_string(),
                    ..AppDraft::default()
                },
                Some("Board Games"),
                &mut panel,
            )
            .await?;
        assert_eq!(outcome.mode, SaveMode::Create);

        let order = backend.with(|backend| {
            backend
                .requests
                .iter()
                .map(|request| format!("{} {}", request.method, request.path))
                .collect::<Vec<_>>()
        });
        assert_eq!(order, vec!["POST /api/categories", "POST /api/apps"]);

        let saved = backend.requests(Method::POST, "/api/apps");
        let body = saved[0].body.clone().context("missing POST body")?;
        assert_eq!(body["category"], "board games");
        assert_eq!(panel.edit.selected(), Some("board games"));
        Ok(())
    }

    #[tokio::test]
    async fn shortcut_url_edits_are_coalesced_into_one_save() -> Result<()> {
        let backend = MockBackend::start().await?;
        let client = GalleryClient::with_config(ClientConfig {
            server_url: backend.base_url.clone(),
            debounce: Duration::from_millis(80),
            ..ClientConfig::default()
        });
        let sync = SettingsSync::new(client);
        sync.load().await;

        sync.change_shortcut_url("shortcuts://a").await;
        sync.change_shortcut_url("shortcuts://ab").await;
        let view = sync.change_shortcut_url(" shortcuts://abc ").await;
        assert_eq!(view.shortcut_url, "shortcuts://abc");
        assert_eq!(backend.count(Method::PUT, "/api/settings"), 0);

        sleep(Duration::from_millis(300)).await;
        let puts = backend.requests(Method::PUT, "/api/settings");
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].body, Some(json!({ "shortcutUrl": "shortcuts://abc" })));
        Ok(())
    }

    #[tokio::test]
    async fn icon_size_change_survives_a_failed_save() -> Result<()> {
        let backend = MockBackend::start().await?;
        backend.with(|backend| backend.fail_settings_put = true);
        let sync = SettingsSync::new(backend.client());
        sync.load().await;

        let view = sync.change_icon_size(48).await;
        assert_eq!(view.icon_size, IconSize::Small);
        assert_eq!(view.layout().columns(), 6);
        assert_eq!(sync.view().await.icon_size, IconSize::Small);

        let reloaded = sync.load().await;
        assert_eq!(reloaded.icon_size, IconSize::Small);

        let puts = backend.requests(Method::PUT, "/api/settings");
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].body, Some(json!({ "iconSize": 48 })));
        Ok(())
    }

    #[tokio::test]
    async fn reload_keeps_a_shortcut_url_that_is_still_being_saved() -> Result<()> {
        let backend = MockBackend::start().await?;
        let client = GalleryClient::with_config(ClientConfig {
            server_url: backend.base_url.clone(),
            debounce: Duration::from_millis(150),
            ..ClientConfig::default()
        });
        let sync = SettingsSync::new(client);
        sync.load().await;

        sync.change_shortcut_url("shortcuts://pending").await;
        let reloaded = sync.load().await;
        assert_eq!(reloaded.shortcut_url, "shortcuts://pending");

        sync.flush().await;
        backend.with(|backend| {
            backend.settings["shortcutUrl"] = json!("shortcuts://from-elsewhere");
        });
        let reloaded = sync.load().await;
        assert_eq!(reloaded.shortcut_url, "shortcuts://from-elsewhere");
        Ok(())
    }

    #[tokio::test]
    async fn blank_shortcut_url_is_neither_applied_nor_saved() -> Result<()> {
        let backend = MockBackend::start().await?;
        let client = GalleryClient::with_config(ClientConfig {
            server_url: backend.base_url.clone(),
            debounce: Duration::from_millis(20),
            ..ClientConfig::default()
        });
        let sync = SettingsSync::new(client);
        sync.load().await;

        let view = sync.change_shortcut_url("   ").await;
        sync.flush().await;
        sleep(Duration::from_millis(60)).await;

        assert_eq!(view.shortcut_url, DEFAULT_SHORTCUT_URL);
        assert_eq!(backend.count(Method::PUT, "/api/settings"), 0);
        Ok(())
    }

    #[tokio::test]
    async fn settings_without_icon_size_fall_back_to_default_layout() -> Result<()> {
        let backend = MockBackend::start().await?;
        backend.with(|backend| {
            backend.settings = json!({ "shortcutUrl": "shortcuts://custom" });
        });
        let sync = SettingsSync::new(backend.client());

        let view = sync.load().await;
        assert_eq!(view.icon_size, IconSize::Large);
        assert_eq!(view.layout().inline_style(), "--icon-size: 60px; --grid-columns: 4;");
        assert_eq!(view.shortcut_url, "shortcuts://custom");
        Ok(())
    }

    #[tokio::test]
    async fn settings_load_survives_unreachable_server() -> Result<()> {
        let sync = SettingsSync::new(GalleryClient::new("http://127.0.0.1:9"));
        let view = sync.load().await;
        assert_eq!(view.icon_size, IconSize::Large);
        assert_eq!(view.shortcut_url, DEFAULT_SHORTCUT_URL);
        Ok(())
    }

    #[tokio::test]
    async fn reset_restores_server_defaults() -> Result<()> {
        let backend = MockBackend::start().await?;
        let sync = SettingsSync::new(backend.client());
        sync.change_icon_size(54).await;
        assert_eq!(sync.view().await.icon_size, IconSize::Medium);

        let view = sync.reset().await?;
        assert_eq!(view.icon_size, IconSize::Large);
        assert_eq!(view.shortcut_url, DEFAULT_SHORTCUT_URL);
        assert_eq!(backend.count(Method::POST, "/api/settings/reset"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_import_is_rejected_before_any_request() -> Result<()> {
        let backend = MockBackend::start().await?;
        let client = backend.client();

        for text in ["not json", r#"{"apps": 3}"#, r#"{"items": []}"#, "42"] {
            let err = client.import_text(text).await.unwrap_err();
            assert!(matches!(err, GalleryError::Format(_)), "{text}: {err}");
        }
        assert_eq!(backend.count(Method::POST, "/api/apps/import"), 0);
        Ok(())
    }

    #[tokio::test]
    async fn export_document_can_be_imported_again() -> Result<()> {
        let backend = MockBackend::start().await?;
        backend.seed(sample_apps());
        let client = backend.client();
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();

        let document = client.export(now).await?;
        assert_eq!(document.apps.len(), 4);
        assert_eq!(
            gallery_core::export_file_name(now.date_naive()),
            "app-gallery-backup-2026-03-04.json"
        );

        let text = document.to_pretty_json()?;
        let summary = client.import_text(&text).await?;
        assert_eq!(summary.imported, 0);
        assert_eq!(summary.updated, 4);

        let bare = r#"[{"name": "Podcasts", "category": "audio"}]"#;
        let summary = client.import_text(bare).await?;
        assert_eq!(summary.imported, 1);
        assert_eq!(client.list_apps().await?.len(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn repair_rewrites_legacy_entries() -> Result<()> {
        let backend = MockBackend::start().await?;
        backend.seed(sample_apps());
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();

        backend.client().repair(now).await?;

        let imports = backend.requests(Method::POST, "/api/apps/import");
        assert_eq!(imports.len(), 1);
        let body = imports[0].body.clone().context("missing import body")?;
        let notes = body["apps"]
            .as_array()
            .and_then(|apps| apps.iter().find(|app| app["id"] == "a3"))
            .context("repaired notes entry missing")?;
        assert_eq!(notes["appStoreLink"], "https://apps.apple.com/notes");
        assert!(notes.get("link").is_none());
        assert_eq!(notes["category"], "uncategorized");
        assert_eq!(notes["lastModified"], "2026-01-02T03:04:05Z");
        Ok(())
    }

    #[tokio::test]
    async fn server_errors_carry_the_response_message() -> Result<()> {
        let backend = MockBackend::start().await?;
        let err = backend.client().get_app("missing").await.unwrap_err();
        match &err {
            GalleryError::Status { status, .. } => assert_eq!(*status, StatusCode::NOT_FOUND),
            other => bail!("unexpected error: {other}"),
        }
        assert_eq!(err.user_message(), "App not found");
        Ok(())
    }

    #[tokio::test]
    async fn cli_list_sorts_by_launch_count() -> Result<()> {
        let backend = MockBackend::start().await?;
        backend.seed(sample_apps());

        let output = run_cli(&[
            "--server-url",
            &backend.base_url,
            "list",
            "--sort",
            "launchCount",
        ])
        .await?;
        let names = output
            .lines()
            .filter_map(|line| line.split('\t').nth(1))
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Maps", "chess", "Notes", "Banking"]);
        Ok(())
    }

    #[tokio::test]
    async fn cli_delete_declined_at_prompt_keeps_app() -> Result<()> {
        let backend = MockBackend::start().await?;
        backend.seed(sample_apps());

        let output =
            run_cli_with_input(&["--server-url", &backend.base_url, "delete", "a2"], "n\n")
                .await?;
        assert!(output.contains("delete cancelled"));
        assert_eq!(backend.count(Method::DELETE, "/api/apps/a2"), 0);

        run_cli(&["--server-url", &backend.base_url, "delete", "a2", "--yes"]).await?;
        assert_eq!(backend.count(Method::DELETE, "/api/apps/a2"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn cli_launch_prints_shortcut_url() -> Result<()> {
        let backend = MockBackend::start().await?;
        backend.seed(sample_apps());

        let output = run_cli(&["--server-url", &backend.base_url, "launch", "a1"]).await?;
        assert_eq!(
            output.trim(),
            "shortcuts://run-shortcut?name=open_iOS_Apps&input=Maps"
        );
        assert_eq!(backend.count(Method::POST, "/api/apps/a1/launch"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn cli_web_interface_ping() -> Result<()> {
        let backend = MockBackend::start().await?;
        let bind = "127.0.0.1:19182";
        let mut cli_web = start_cli_web(bind, &backend.base_url).await?;

        let result = async {
            let body = reqwest::get(format!("http://{bind}/api/ping"))
                .await
                .context("failed to call web ping endpoint")?
                .error_for_status()?
                .text()
                .await?;
            assert!(body.contains("\"ok\":true"));
            assert!(body.contains("app-gallery-web"));
            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_server(&mut cli_web).await;
        result
    }

    #[tokio::test]
    async fn web_launch_redirects_to_shortcut_and_records_launch() -> Result<()> {
        let backend = MockBackend::start().await?;
        backend.seed(sample_apps());
        let bind = "127.0.0.1:19183";
        let mut cli_web = start_cli_web(bind, &backend.base_url).await?;

        let result = async {
            let http = reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()?;

            let response = http
                .get(format!("http://{bind}/launch/a1?name=Maps%20X"))
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|value| value.to_str().ok())
                .context("launch response has no location")?;
            assert_eq!(
                location,
                "shortcuts://run-shortcut?name=open_iOS_Apps&input=Maps%20X"
            );
            assert_eq!(backend.count(Method::POST, "/api/apps/a1/launch"), 1);

            let page = http
                .get(format!("http://{bind}/?sort=name"))
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            let banking = page.find("Banking").context("Banking tile missing")?;
            let notes = page.find(">Notes<").context("Notes tile missing")?;
            assert!(banking < notes);
            assert!(page.contains("--grid-columns: 4;"));
            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_server(&mut cli_web).await;
        result
    }

    #[tokio::test]
    async fn web_icon_size_stays_selected_when_the_save_fails() -> Result<()> {
        let backend = MockBackend::start().await?;
        backend.seed(sample_apps());
        backend.with(|backend| backend.fail_settings_put = true);
        let bind = "127.0.0.1:19184";
        let mut cli_web = start_cli_web(bind, &backend.base_url).await?;

        let result = async {
            let http = no_redirect_client()?;
            let response = http
                .post(format!("http://{bind}/settings/icon-size"))
                .form(&[("icon_size", "48")])
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&response)?, "/settings");
            assert_eq!(backend.count(Method::PUT, "/api/settings"), 1);

            let settings = http
                .get(format!("http://{bind}/settings"))
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            assert!(settings.contains("value=\"48\" checked"));
            assert!(!settings.contains("value=\"60\" checked"));

            let gallery = http
                .get(format!("http://{bind}/"))
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            assert!(gallery.contains("--grid-columns: 6;"));
            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_server(&mut cli_web).await;
        result
    }

    #[tokio::test]
    async fn web_settings_round_trip_through_the_backend() -> Result<()> {
        let backend = MockBackend::start().await?;
        let bind = "127.0.0.1:19185";
        let mut cli_web = start_cli_web(bind, &backend.base_url).await?;

        let result = async {
            let http = no_redirect_client()?;
            let response = http
                .post(format!("http://{bind}/settings/icon-size"))
                .form(&[("icon_size", "54")])
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(backend.with(|backend| backend.settings["iconSize"].clone()), json!(54));

            let settings = http
                .get(format!("http://{bind}/settings"))
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            assert!(settings.contains("value=\"54\" checked"));

            let response = http
                .post(format!("http://{bind}/settings/reset"))
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            let settings = http
                .get(format!("http://{bind}/settings"))
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            assert!(settings.contains("value=\"60\" checked"));
            assert_eq!(backend.count(Method::POST, "/api/settings/reset"), 1);
            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_server(&mut cli_web).await;
        result
    }

    #[tokio::test]
    async fn web_save_failures_map_to_alert_statuses() -> Result<()> {
        let backend = MockBackend::start().await?;
        backend.seed(sample_apps());
        let bind = "127.0.0.1:19186";
        let mut cli_web = start_cli_web(bind, &backend.base_url).await?;

        let result = async {
            let http = no_redirect_client()?;
            let save = |form: Vec<(&'static str, &'static str)>| {
                http.post(format!("http://{bind}/apps")).form(&form).send()
            };

            let blank = save(vec![("name", "  ")]).await?;
            assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
            assert_eq!(backend.count(Method::POST, "/api/apps"), 0);

            let missing = save(vec![("id", "missing"), ("name", "Ghost")]).await?;
            assert_eq!(missing.status(), StatusCode::NOT_FOUND);
            let page = missing.text().await?;
            assert!(page.contains("App not found"));
            assert!(page.contains("/apps/missing/edit"));

            backend.with(|backend| backend.fail_save = true);
            let failed = save(vec![("name", "Weather")]).await?;
            assert_eq!(failed.status(), StatusCode::BAD_GATEWAY);
            assert!(failed.text().await?.contains("database is locked"));

            backend.with(|backend| backend.fail_save = false);
            let saved = save(vec![("name", "Weather")]).await?;
            assert_eq!(saved.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&saved)?, "/");
            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_server(&mut cli_web).await;
        result
    }

    #[tokio::test]
    async fn web_delete_requires_explicit_confirmation() -> Result<()> {
        let backend = MockBackend::start().await?;
        backend.seed(sample_apps());
        let bind = "127.0.0.1:19187";
        let mut cli_web = start_cli_web(bind, &backend.base_url).await?;

        let result = async {
            let http = no_redirect_client()?;
            let declined = http
                .post(format!("http://{bind}/apps/a1/delete"))
                .form(&[("confirm", "no")])
                .send()
                .await?;
            assert_eq!(declined.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&declined)?, "/apps/a1/edit");
            assert_eq!(backend.count(Method::DELETE, "/api/apps/a1"), 0);

            let confirmed = http
                .post(format!("http://{bind}/apps/a1/delete"))
                .form(&[("confirm", "yes")])
                .send()
                .await?;
            assert_eq!(confirmed.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&confirmed)?, "/");
            assert_eq!(backend.count(Method::DELETE, "/api/apps/a1"), 1);
            assert_eq!(backend.with(|backend| backend.apps.len()), 3);
            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_server(&mut cli_web).await;
        result
    }

    #[tokio::test]
    async fn web_import_accepts_an_uploaded_file() -> Result<()> {
        let backend = MockBackend::start().await?;
        backend.seed(sample_apps());
        let bind = "127.0.0.1:19188";
        let mut cli_web = start_cli_web(bind, &backend.base_url).await?;

        let result = async {
            let http = no_redirect_client()?;
            let rejected = upload_import(&http, bind, "{\"format\": \"app-gallery\"}").await?;
            assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
            assert_eq!(backend.count(Method::POST, "/api/apps/import"), 0);

            let imported = upload_import(
                &http,
                bind,
                r#"{"format": "app-gallery", "apps": [
                    {"id": "a1", "name": "Maps", "category": "travel", "launchCount": 6},
                    {"name": "Podcasts", "category": "audio"}
                ]}"#,
            )
            .await?;
            assert_eq!(imported.status(), StatusCode::SEE_OTHER);
            assert_eq!(
                location(&imported)?,
                "/?notice=Successfully%20imported%201%20apps%20and%20updated%201%20apps."
            );
            assert_eq!(backend.count(Method::POST, "/api/apps/import"), 1);
            assert_eq!(backend.with(|backend| backend.apps.len()), 5);
            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_server(&mut cli_web).await;
        result
    }

    #[tokio::test]
    async fn web_export_is_served_as_a_dated_attachment() -> Result<()> {
        let backend = MockBackend::start().await?;
        backend.seed(sample_apps());
        let bind = "127.0.0.1:19189";
        let mut cli_web = start_cli_web(bind, &backend.base_url).await?;

        let result = async {
            let response = no_redirect_client()?
                .get(format!("http://{bind}/export"))
                .send()
                .await?
                .error_for_status()?;
            let disposition = response
                .headers()
                .get(reqwest::header::CONTENT_DISPOSITION)
                .and_then(|value| value.to_str().ok())
                .context("export has no content disposition")?
                .to_string();
            let expected = format!(
                "attachment; filename=\"app-gallery-backup-{}.json\"",
                Utc::now().format("%Y-%m-%d")
            );
            assert_eq!(disposition, expected);

            let document: Value = serde_json::from_str(&response.text().await?)?;
            assert_eq!(document["format"], json!("app-gallery"));
            assert_eq!(document["apps"].as_array().map(Vec::len), Some(4));
            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_server(&mut cli_web).await;
        result
    }

    async fn upload_import(
        http: &reqwest::Client,
        bind: &str,
        text: &'static str,
    ) -> Result<reqwest::Response> {
        let part = reqwest::multipart::Part::text(text)
            .file_name("backup.json")
            .mime_str("application/json")?;
        let form = reqwest::multipart::Form::new().part("file", part);
        Ok(http
            .post(format!("http://{bind}/import"))
            .multipart(form)
            .send()
            .await?)
    }

    fn no_redirect_client() -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?)
    }

    fn location(response: &reqwest::Response) -> Result<String> {
        response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .context("response has no location")
    }

    async fn run_cli(args: &[&str]) -> Result<String> {
        run_cli_with_input(args, "").await
    }

    async fn run_cli_with_input(args: &[&str], input: &str) -> Result<String> {
        let cli_bin = binary_path("app-gallery")?;
        let mut child = Command::new(cli_bin)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("failed to execute app-gallery")?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes()).await?;
        }
        let output = child.wait_with_output().await?;

        if !output.status.success() {
            bail!(
                "app-gallery failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn start_cli_web(bind: &str, server_url: &str) -> Result<Child> {
        let cli_bin = binary_path("app-gallery")?;

        let child = Command::new(cli_bin)
            .arg("--server-url")
            .arg(server_url)
            .arg("serve-web")
            .arg("--bind")
            .arg(bind)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .context("failed to spawn app-gallery serve-web")?;

        wait_for_url_status(&format!("http://{bind}/api/ping"), StatusCode::OK, 40).await?;
        Ok(child)
    }

    async fn wait_for_url_status(url: &str, expected: StatusCode, retries: usize) -> Result<()> {
        let http = reqwest::Client::new();

        for _ in 0..retries {
            if let Ok(resp) = http.get(url).send().await {
                if resp.status() == expected {
                    return Ok(());
                }
            }
            sleep(Duration::from_millis(100)).await;
        }

        bail!("service did not return {expected} at {url}");
    }

    async fn stop_server(child: &mut Child) {
        let _ = child.kill().await;
        let _ = child.wait().await;
    }

    fn binary_path(name: &str) -> Result<PathBuf> {
        let workspace_root = workspace_root()?;
        ensure_binaries_built(&workspace_root)?;
        let mut path = workspace_root.join("target").join("debug").join(name);

        if let Some(suffix) = std::env::consts::EXE_SUFFIX.strip_prefix('.') {
            let mut filename = OsString::from(name);
            filename.push(".");
            filename.push(suffix);
            path = workspace_root.join("target").join("debug").join(filename);
        }

        if !path.exists() {
            bail!("expected binary does not exist: {}", path.display());
        }

        Ok(path)
    }

    fn workspace_root() -> Result<PathBuf> {
        let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        crate_dir
            .parent()
            .and_then(|p| p.parent())
            .map(PathBuf::from)
            .context("failed to resolve workspace root")
    }

    fn ensure_binaries_built(workspace_root: &PathBuf) -> Result<()> {
        static BUILD_RESULT: OnceLock<std::result::Result<(), String>> = OnceLock::new();

        let result = BUILD_RESULT.get_or_init(|| {
            let status = std::process::Command::new("cargo")
                .arg("build")
                .arg("-p")
                .arg("gallery-cli")
                .current_dir(workspace_root)
                .status()
                .map_err(|err| format!("failed to run cargo build: {err}"))?;
            if status.success() {
                Ok(())
            } else {
                Err("cargo build for gallery-cli failed".to_string())
            }
        });

        if let Err(message) = result {
            bail!("failed to build required binaries: {message}");
        }

        Ok(())
    }
}
