use common::{AppEntry, SaveMode};
use gallery_core::launch::encode_component;
use gallery_core::{CategoryFilter, CategoryPanel, EditForm, GridLayout, IconSize, SettingsView, SortKey};

const STYLE: &str = r#"
        body { font-family: system-ui, sans-serif; margin: 0; background: #111; color: #f2f2f2; }
        header { display: flex; gap: 0.5rem; flex-wrap: wrap; align-items: center; padding: 0.8rem 1rem; background: #1b1b1b; }
        header h1 { font-size: 1.1rem; margin: 0 auto 0 0; }
        a, button { color: inherit; }
        .button, button { padding: 0.4rem 0.7rem; border: 1px solid #555; border-radius: 6px; background: #222; text-decoration: none; cursor: pointer; font: inherit; }
        .button.active { background: #3a5; }
        main { padding: 1rem; max-width: 960px; margin: 0 auto; }
        .app-grid { display: grid; grid-template-columns: repeat(var(--grid-columns), 1fr); gap: 1rem; }
        .app-card { display: flex; flex-direction: column; align-items: center; gap: 0.3rem; text-decoration: none; font-size: 0.75rem; }
        .app-card img, .app-card .placeholder { width: var(--icon-size); height: var(--icon-size); border-radius: 22%; background: #333; }
        .overlay { max-width: 520px; margin: 2rem auto; background: #1b1b1b; border: 1px solid #333; border-radius: 10px; padding: 1rem 1.2rem; }
        label { display: block; margin: 0.6rem 0 0.2rem; font-weight: 600; }
        input, select, textarea { width: 100%; padding: 0.45rem; border-radius: 6px; border: 1px solid #444; background: #0d0d0d; color: inherit; box-sizing: border-box; font: inherit; }
        textarea { min-height: 140px; }
        .actions { margin-top: 0.8rem; display: flex; gap: 0.5rem; flex-wrap: wrap; }
        .muted { color: #999; font-size: 0.9rem; }
        .notice { background: #243; border: 1px solid #3a5; border-radius: 6px; padding: 0.5rem 0.8rem; margin-bottom: 1rem; }
        .alert { background: #422; border: 1px solid #a44; border-radius: 6px; padding: 0.6rem 0.8rem; }
"#;

const SERVICE_WORKER_REGISTRATION: &str = r#"
    <script>
        if ('serviceWorker' in navigator) {
            navigator.serviceWorker.register('/sw.js')
                .then(() => console.log('service worker registered'))
                .catch(err => console.log('service worker registration failed:', err));
        }
    </script>"#;

/// Cache-first worker for the gallery shell.
pub const SERVICE_WORKER_JS: &str = r#"const CACHE = 'app-gallery-v1';
self.addEventListener('install', event => {
    event.waitUntil(caches.open(CACHE).then(cache => cache.addAll(['/'])));
});
self.addEventListener('fetch', event => {
    if (event.request.method !== 'GET') return;
    event.respondWith(
        fetch(event.request)
            .then(response => {
                const copy = response.clone();
                caches.open(CACHE).then(cache => cache.put(event.request, copy));
                return response;
            })
            .catch(() => caches.match(event.request))
    );
});
"#;

pub fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn page(title: &str, layout: GridLayout, body: &str) -> String {
    format!(
        "<!doctype html>
<html lang=\"en\" style=\"{style_vars}\">
<head>
    <meta charset=\"utf-8\" />
    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />
    <title>{title}</title>
    <style>{STYLE}</style>
</head>
<body>
{body}
{SERVICE_WORKER_REGISTRATION}
</body>
</html>
",
        style_vars = layout.inline_style(),
        title = escape(title),
    )
}

/// Link to the gallery with the given view options.
pub fn gallery_href(sort: Option<SortKey>, category: Option<&str>, edit_mode: bool) -> String {
    let mut params = Vec::new();
    if let Some(sort) = sort {
        params.push(format!("sort={}", sort.as_str()));
    }
    if let Some(category) = category {
        params.push(format!("category={}", encode_component(category)));
    }
    if edit_mode {
        params.push("edit=1".to_string());
    }
    if params.is_empty() {
        "/".to_string()
    } else {
        format!("/?{}", params.join("&"))
    }
}

pub struct GalleryPage<'a> {
    /// Already filtered and sorted.
    pub apps: &'a [AppEntry],
    pub settings: &'a SettingsView,
    pub categories: &'a CategoryPanel,
    pub filter: &'a CategoryFilter,
    pub sort: Option<SortKey>,
    pub edit_mode: bool,
    pub notice: Option<&'a str>,
}

pub fn render_gallery(view: &GalleryPage<'_>) -> String {
    let selected = view.filter.selected();

    let sort_links = SortKey::ALL
        .iter()
        .map(|key| {
            let class = if view.sort == Some(*key) { "button active" } else { "button" };
            format!(
                "<a class=\"{class}\" href=\"{}\">{}</a>",
                escape(&gallery_href(Some(*key), selected, view.edit_mode)),
                key.label()
            )
        })
        .collect::<Vec<_>>()
        .join("\n            ");

    let filter_options = view
        .categories
        .filter
        .options()
        .iter()
        .map(|option| {
            let chosen = if selected == Some(option.value.as_str()) { " selected" } else { "" };
            format!(
                "<option value=\"{}\"{chosen}>{}</option>",
                escape(&option.value),
                escape(&option.label)
            )
        })
        .collect::<String>();

    let tiles = view
        .apps
        .iter()
        .map(|app| render_tile(app, view.edit_mode))
        .collect::<Vec<_>>()
        .join("\n");

    let empty = if view.apps.is_empty() {
        "<p class=\"muted\">No apps to show.</p>"
    } else {
        ""
    };

    let notice = view
        .notice
        .map(|notice| format!("<div class=\"notice\">{}</div>", escape(notice)))
        .unwrap_or_default();

    let edit_class = if view.edit_mode { "button active" } else { "button" };
    let body = format!(
        "    <header>
        <h1>App Gallery</h1>
        <a class=\"button\" href=\"/settings\">Settings</a>
        <a class=\"button\" href=\"/apps/new\">Add App</a>
        <a class=\"{edit_class}\" href=\"{edit_href}\">Edit Mode</a>
            {sort_links}
        <form method=\"get\" action=\"/\">
            <input type=\"hidden\" name=\"sort\" value=\"{sort_value}\" />
            <select name=\"category\" id=\"categoryFilter\" onchange=\"this.form.submit()\">
                <option value=\"\">All categories</option>{filter_options}
            </select>
        </form>
    </header>
    <main>
        {notice}
        <div class=\"app-grid\">
{tiles}
        </div>
        {empty}
    </main>",
        edit_href = escape(&gallery_href(view.sort, selected, !view.edit_mode)),
        sort_value = view.sort.map(SortKey::as_str).unwrap_or_default(),
    );

    page("App Gallery", view.settings.layout(), &body)
}

fn render_tile(app: &AppEntry, edit_mode: bool) -> String {
    let href = if edit_mode {
        format!("/apps/{}/edit", encode_component(&app.id))
    } else {
        format!(
            "/launch/{}?name={}",
            encode_component(&app.id),
            encode_component(&app.name)
        )
    };
    let icon = match app.icon_url.as_deref() {
        Some(url) => format!("<img src=\"{}\" alt=\"\" loading=\"lazy\" />", escape(url)),
        None => "<span class=\"placeholder\"></span>".to_string(),
    };
    format!(
        "            <a class=\"app-card\" href=\"{href}\" data-app-id=\"{id}\" data-app-name=\"{name}\" data-category=\"{category}\" data-launch-count=\"{count}\">{icon}<span>{name}</span></a>",
        href = escape(&href),
        id = escape(&app.id),
        name = escape(&app.name),
        category = escape(&app.category),
        count = app.launch_count,
    )
}

pub fn render_edit_form(form: &EditForm, categories: &CategoryPanel, layout: GridLayout) -> String {
    let draft = &form.draft;
    let selected = if draft.category.is_empty() {
        categories.edit.selected().unwrap_or_default().to_string()
    } else {
        draft.category.clone()
    };

    let options = categories
        .edit
        .options()
        .iter()
        .map(|option| {
            let chosen = if option.value == selected { " selected" } else { "" };
            format!(
                "<option value=\"{}\"{chosen}>{}</option>",
                escape(&option.value),
                escape(&option.label)
            )
        })
        .collect::<String>();

    let summary = form
        .launch_summary
        .as_deref()
        .map(|summary| format!("<p class=\"muted\" id=\"launchCountDisplay\">{}</p>", escape(summary)))
        .unwrap_or_default();

    let delete = match (form.mode(), draft.id.as_deref()) {
        (SaveMode::Update, Some(id)) => format!(
            "<a class=\"button\" href=\"/apps/{}/delete\">Delete</a>",
            escape(&encode_component(id))
        ),
        _ => String::new(),
    };

    let search = gallery_core::app_store_search_url(&draft.name)
        .map(|url| {
            format!(
                "<a class=\"button\" href=\"{}\" target=\"_blank\" rel=\"noopener\">Search App Store</a>",
                escape(&url)
            )
        })
        .unwrap_or_default();

    let body = format!(
        "    <section class=\"overlay\" id=\"editOverlay\">
        <h2 id=\"editOverlayTitle\">{title}</h2>
        {summary}
        <form method=\"post\" action=\"/apps\" id=\"editAppForm\">
            <input type=\"hidden\" name=\"id\" value=\"{id}\" />
            <label for=\"editAppName\">Name</label>
            <input id=\"editAppName\" name=\"name\" value=\"{name}\" required />
            <label for=\"editAppCategory\">Category</label>
            <select id=\"editAppCategory\" name=\"category\">
                <option value=\"\">uncategorized</option>{options}
            </select>
            <label for=\"newCategory\">Or add a new category</label>
            <input id=\"newCategory\" name=\"new_category\" placeholder=\"e.g. Games\" />
            <label for=\"editIconUrl\">Icon URL</label>
            <input id=\"editIconUrl\" name=\"icon_url\" value=\"{icon_url}\" />
            <label for=\"editAppStoreLink\">App Store link</label>
            <input id=\"editAppStoreLink\" name=\"app_store_link\" value=\"{app_store_link}\" />
            <div class=\"actions\">
                <button type=\"submit\">Save</button>
                <a class=\"button\" href=\"/\">Cancel</a>
                {search}
                {delete}
            </div>
        </form>
    </section>",
        title = form.title(),
        id = escape(draft.id.as_deref().unwrap_or_default()),
        name = escape(&draft.name),
        icon_url = escape(&draft.icon_url),
        app_store_link = escape(&draft.app_store_link),
    );

    page(form.title(), layout, &body)
}

pub fn render_settings(view: &SettingsView) -> String {
    let sizes = IconSize::ALL
        .iter()
        .map(|size| {
            let checked = if *size == view.icon_size { " checked" } else { "" };
            format!(
                "<label><input type=\"radio\" name=\"icon_size\" value=\"{px}\"{checked} onchange=\"this.form.submit()\" /> {px}px ({columns} columns)</label>",
                px = size.px(),
                columns = size.columns(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n            ");

    let body = format!(
        "    <section class=\"overlay\" id=\"settingsOverlay\">
        <h2>Settings</h2>
        <form method=\"post\" action=\"/settings/icon-size\">
            {sizes}
            <noscript><button type=\"submit\">Apply</button></noscript>
        </form>
        <label for=\"shortcutUrl\">Shortcut URL</label>
        <input id=\"shortcutUrl\" value=\"{shortcut_url}\" />
        <p class=\"muted\">Launching appends <code>&amp;input=&lt;app name&gt;</code>. Changes save automatically.</p>
        <h3>Categories</h3>
        <form method=\"post\" action=\"/categories\" class=\"actions\">
            <input id=\"categoryName\" name=\"name\" placeholder=\"New category\" />
            <button type=\"submit\">Add category</button>
        </form>
        <h3>Data</h3>
        <div class=\"actions\">
            <a class=\"button\" href=\"/export\">Export JSON</a>
            <form method=\"post\" action=\"/repair\"><button type=\"submit\">Fix JSON structure</button></form>
            <form method=\"post\" action=\"/settings/reset\"><button type=\"submit\">Reset settings</button></form>
        </div>
        <form method=\"post\" action=\"/import\" enctype=\"multipart/form-data\">
            <label for=\"importFile\">Import JSON file</label>
            <input type=\"file\" id=\"importFile\" name=\"file\" accept=\".json,application/json\" />
            <label for=\"importPayload\">Or paste JSON</label>
            <textarea id=\"importPayload\" name=\"payload\" placeholder=\"[{{&quot;name&quot;: &quot;...&quot;}}] or {{&quot;apps&quot;: [...]}}\"></textarea>
            <div class=\"actions\"><button type=\"submit\">Import</button><a class=\"button\" href=\"/\">Close</a></div>
        </form>
    </section>
    <script>
        document.getElementById('shortcutUrl').addEventListener('input', event => {{
            fetch('/api/settings/shortcut-url', {{
                method: 'POST',
                headers: {{ 'content-type': 'application/json' }},
                body: JSON.stringify({{ shortcutUrl: event.target.value }})
            }}).catch(err => console.error('failed to queue shortcut url:', err));
        }});
    </script>",
        shortcut_url = escape(&view.shortcut_url),
    );

    page("Settings", view.layout(), &body)
}

pub fn render_confirm_delete(app: &AppEntry, layout: GridLayout) -> String {
    let body = format!(
        "    <section class=\"overlay\">
        <h2>Delete {name}?</h2>
        <p>Are you sure you want to delete this app?</p>
        <form method=\"post\" action=\"/apps/{id}/delete\">
            <input type=\"hidden\" name=\"confirm\" value=\"yes\" />
            <div class=\"actions\">
                <button type=\"submit\">Delete</button>
                <a class=\"button\" href=\"/apps/{id}/edit\">Cancel</a>
            </div>
        </form>
    </section>",
        name = escape(&app.name),
        id = escape(&encode_component(&app.id)),
    );

    page("Delete app", layout, &body)
}

/// Blocking message shown after a user-initiated action failed.
pub fn render_alert(message: &str, back_href: &str, layout: GridLayout) -> String {
    let body = format!(
        "    <section class=\"overlay\">
        <div class=\"alert\" role=\"alert\">{message}</div>
        <div class=\"actions\"><a class=\"button\" href=\"{back}\">Back</a></div>
    </section>",
        message = escape(message),
        back = escape(back_href),
    );

    page("Error", layout, &body)
}
