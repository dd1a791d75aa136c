use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters a URI component may carry unescaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_component(raw: &str) -> String {
    utf8_percent_encode(raw, COMPONENT).to_string()
}

/// Appends `&input=<app name>` to the shortcut template.
pub fn launch_url(template: &str, app_name: &str) -> String {
    format!("{}&input={}", template.trim(), encode_component(app_name))
}

/// Web search that usually surfaces the App Store page for an app.
pub fn app_store_search_url(app_name: &str) -> Option<String> {
    let name = app_name.trim();
    if name.is_empty() {
        return None;
    }
    Some(format!(
        "https://duckduckgo.com/?q={}",
        encode_component(&format!("{name} app store ios"))
    ))
}
