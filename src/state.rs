//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! carries the single session store created at startup, the backend client
//! bound to that store, and the cookie/guard settings the auth flows need.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::{AppConfig, ConfigError, CookieSettings};
use crate::guard::RouteGuard;
use crate::session::SharedSession;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum — all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub session: SharedSession,
    /// `None` when `BACKEND_URL` is not configured.
    pub api: Option<ApiClient>,
    pub guard: Arc<RouteGuard>,
    pub cookie: CookieSettings,
}

impl AppState {
    /// Build state around an already restored session store.
    ///
    /// # Errors
    ///
    /// Returns an error if the guard exclusion pattern is invalid or a
    /// sign-in / landing path is not absolute.
    pub fn new(config: &AppConfig, session: SharedSession) -> Result<Self, ConfigError> {
        let api = config.backend_url.as_ref().map(|url| ApiClient::new(url.clone(), session.clone()));
        Ok(Self { session, api, guard: Arc::new(config.route_guard()?), cookie: config.cookie.clone() })
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
