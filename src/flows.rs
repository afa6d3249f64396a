//! Login / logout flows.
//!
//! Each flow updates both layers together: the credential marker cookie the
//! route guard reads, and the session store the rest of the app reads.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use time::Duration;

use crate::config::CookieSettings;
use crate::session::{SessionStore, UserProfile};

/// Backend response to a successful credential exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(alias = "token")]
    pub access: String,
    #[serde(alias = "refresh_token")]
    pub refresh: String,
    pub user: UserProfile,
}

fn marker_cookie(settings: &CookieSettings, value: String, max_age: Duration) -> Cookie<'static> {
    Cookie::build((settings.name.clone(), value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.secure)
        .max_age(max_age)
        .build()
}

/// Populate the store and set the credential marker.
pub fn login(store: &mut SessionStore, jar: CookieJar, response: LoginResponse, settings: &CookieSettings) -> CookieJar {
    let cookie = marker_cookie(settings, response.access.clone(), Duration::days(settings.max_age_days));
    tracing::info!(user_id = ?response.user.id, role = ?response.user.role, "session established");
    store.set_auth(response.access, response.refresh, response.user);
    jar.add(cookie)
}

/// Clear the store and expire the credential marker.
pub fn logout(store: &mut SessionStore, jar: CookieJar, settings: &CookieSettings) -> CookieJar {
    store.clear();
    jar.add(marker_cookie(settings, String::new(), Duration::ZERO))
}

/// Point the credential marker at a freshly exchanged access token.
pub fn refresh_marker(jar: CookieJar, token: String, settings: &CookieSettings) -> CookieJar {
    jar.add(marker_cookie(settings, token, Duration::days(settings.max_age_days)))
}

/// The backend rejected the stored credentials: log out and hand back the
/// sign-in path the caller should send the user to.
pub fn credentials_rejected<'a>(
    store: &mut SessionStore,
    jar: CookieJar,
    settings: &CookieSettings,
    signin_path: &'a str,
) -> (CookieJar, &'a str) {
    tracing::warn!("backend rejected credentials, clearing session");
    (logout(store, jar, settings), signin_path)
}

#[cfg(test)]
#[path = "flows_test.rs"]
mod tests;
