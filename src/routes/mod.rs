//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Session endpoints live under `/api/auth`, which the route guard's
//! exclusion pattern lets through untouched. Every other path is a
//! dashboard page and goes through the guard first.

pub mod auth;
pub mod pages;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch, post};
use tower_http::trace::TraceLayer;

use crate::guard::route_guard;
use crate::state::AppState;

/// Full application router: API + pages behind the route guard.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/profile", patch(auth::update_profile))
        .route("/api/auth/session", get(auth::session))
        .route(state.guard.signin_path(), get(pages::signin))
        .fallback(pages::dashboard)
        .layer(from_fn_with_state(state.guard.clone(), route_guard))
        // Registered after the guard layer so health checks never need a cookie.
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
