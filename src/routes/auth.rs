//! Auth routes — login, logout, token refresh, profile edits, session view.
//!
//! Handlers call the backend through `ApiClient` and push the results into
//! the session store via the flows in `crate::flows`, so the credential
//! cookie and the store always move together.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::{ApiClient, ApiError};
use crate::flows::{self, LoginResponse};
use crate::session::{Session, UserProfile};
use crate::state::AppState;

const LOGIN_PATH: &str = "auth/login/";
const REFRESH_PATH: &str = "auth/token/refresh/";
const PROFILE_PATH: &str = "users/me/";

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

/// What the dashboard sees of the session. Tokens are never echoed.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub user: Option<UserProfile>,
    #[serde(rename = "isAuthenticated")]
    pub is_authenticated: bool,
    pub initialized: bool,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self { user: session.user.clone(), is_authenticated: session.is_authenticated, initialized: session.initialized }
    }
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

pub(crate) fn api_error_to_status(err: &ApiError) -> StatusCode {
    match err {
        ApiError::Unauthorized | ApiError::NoRefreshToken => StatusCode::UNAUTHORIZED,
        ApiError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        ApiError::Status(status, _) if status.is_client_error() => *status,
        ApiError::Status(..) | ApiError::Transport(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Turn an API failure into a response. Credential failures also log the
/// user out and tell the client where to go next.
async fn api_failure(state: &AppState, jar: CookieJar, err: ApiError) -> Response {
    let status = api_error_to_status(&err);
    if status != StatusCode::UNAUTHORIZED {
        return (status, err.to_string()).into_response();
    }

    let mut store = state.session.write().await;
    let (jar, target) = flows::credentials_rejected(&mut store, jar, &state.cookie, state.guard.signin_path());
    (status, jar, Json(serde_json::json!({ "error": err.to_string(), "redirect": target }))).into_response()
}

fn backend(state: &AppState) -> Result<&ApiClient, ApiError> {
    state.api.as_ref().ok_or(ApiError::NotConfigured)
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/auth/login` — exchange credentials, set cookie, populate store.
pub async fn login(State(state): State<AppState>, jar: CookieJar, Json(body): Json<LoginRequest>) -> Response {
    let result = match backend(&state) {
        Ok(api) => api.post_anonymous::<_, LoginResponse>(LOGIN_PATH, &body).await,
        Err(e) => Err(e),
    };
    let response = match result {
        Ok(r) => r,
        Err(e) => {
            tracing::info!(error = %e, "login failed");
            let status = api_error_to_status(&e);
            return (status, e.to_string()).into_response();
        }
    };

    let mut store = state.session.write().await;
    let jar = flows::login(&mut store, jar, response, &state.cookie);
    (jar, Json(SessionView::from(store.snapshot()))).into_response()
}

/// `POST /api/auth/logout` — clear store and cookie.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let mut store = state.session.write().await;
    let jar = flows::logout(&mut store, jar, &state.cookie);
    tracing::info!("session cleared by logout");
    (jar, StatusCode::NO_CONTENT)
}

/// `POST /api/auth/refresh` — trade the refresh token for a new access token.
pub async fn refresh(State(state): State<AppState>, jar: CookieJar) -> Response {
    let api = match backend(&state) {
        Ok(api) => api,
        Err(e) => return api_failure(&state, jar, e).await,
    };
    let held = state.session.read().await.refresh_token().map(str::to_owned);
    let Some(refresh) = held else {
        return api_failure(&state, jar, ApiError::NoRefreshToken).await;
    };

    let response: RefreshResponse = match api.post(REFRESH_PATH, &serde_json::json!({ "refresh": refresh })).await {
        Ok(r) => r,
        Err(e) => return api_failure(&state, jar, e).await,
    };

    let mut store = state.session.write().await;
    // A logout or re-login may have landed while the exchange was in flight.
    if store.refresh_token() != Some(refresh.as_str()) {
        tracing::info!("session changed during token refresh, discarding new token");
        let body = Json(serde_json::json!({ "error": "session changed", "redirect": state.guard.signin_path() }));
        return (StatusCode::UNAUTHORIZED, body).into_response();
    }
    store.update_token(response.access.clone());
    let jar = flows::refresh_marker(jar, response.access, &state.cookie);
    (jar, Json(SessionView::from(store.snapshot()))).into_response()
}

/// `PATCH /api/auth/profile` — forward the edit, merge what the backend returns.
pub async fn update_profile(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(partial): Json<Map<String, Value>>,
) -> Response {
    let api = match backend(&state) {
        Ok(api) => api,
        Err(e) => return api_failure(&state, jar, e).await,
    };
    let updated: Map<String, Value> = match api.patch(PROFILE_PATH, &partial).await {
        Ok(u) => u,
        Err(e) => return api_failure(&state, jar, e).await,
    };

    let mut store = state.session.write().await;
    store.update_user_profile(&updated);
    Json(SessionView::from(store.snapshot())).into_response()
}

/// `GET /api/auth/session` — current session view.
pub async fn session(State(state): State<AppState>) -> Json<SessionView> {
    Json(SessionView::from(state.session.read().await.snapshot()))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
