//! Dashboard page shells.
//!
//! Pages only render a placeholder naming the requested screen and the
//! signed-in operator; the actual screens are drawn client-side.

use axum::extract::State;
use axum::http::Uri;
use axum::response::Html;

use crate::session::UserProfile;
use crate::state::AppState;

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub(crate) fn display_name(user: &UserProfile) -> String {
    let full = [user.first_name.as_deref(), user.last_name.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if !full.is_empty() {
        return full;
    }
    user.email.clone().unwrap_or_else(|| "operator".to_owned())
}

fn shell(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{title} · opsdesk</title></head>\
         <body><main data-page=\"{title}\">{body}</main></body></html>",
        title = escape(title),
    ))
}

/// `GET /signin`
pub async fn signin() -> Html<String> {
    shell("signin", "<form data-endpoint=\"/api/auth/login\"></form>")
}

/// Every other path: the dashboard shell for that screen.
pub async fn dashboard(State(state): State<AppState>, uri: Uri) -> Html<String> {
    let store = state.session.read().await;
    let snapshot = store.snapshot();
    // Cookie present but store empty: render the shell anyway and let the
    // client fall back to sign-in once its API calls are rejected.
    let operator = snapshot.user.as_ref().map(display_name).unwrap_or_default();
    let body = format!(
        "<header data-initialized=\"{}\">{}</header>",
        snapshot.initialized,
        escape(&operator)
    );
    shell(uri.path(), &body)
}

#[cfg(test)]
#[path = "pages_test.rs"]
mod tests;
