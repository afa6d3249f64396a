//! Route guard — per-navigation sign-in redirect middleware.
//!
//! SYSTEM CONTEXT
//! ==============
//! The guard runs before any page handler and looks only at the credential
//! marker cookie. It never touches the session store: the cookie is a fast
//! presence signal, while the store stays the authoritative record of token
//! and user. A stale or revoked token with a live cookie passes the guard
//! and is caught later, when the backend rejects it and the API client
//! clears the session.
//!
//! | cookie | path is sign-in | decision              |
//! |--------|-----------------|-----------------------|
//! | no     | no              | redirect to sign-in   |
//! | no     | yes             | continue              |
//! | yes    | yes             | redirect to landing   |
//! | yes    | no              | continue              |
//!
//! Paths matching the exclusion pattern skip the table entirely.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use regex::Regex;

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Continue,
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    cookie_name: String,
    signin_path: String,
    landing_path: String,
    exclude: Regex,
}

impl RouteGuard {
    #[must_use]
    pub fn new(
        cookie_name: impl Into<String>,
        signin_path: impl Into<String>,
        landing_path: impl Into<String>,
        exclude: Regex,
    ) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            signin_path: signin_path.into(),
            landing_path: landing_path.into(),
            exclude,
        }
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    #[must_use]
    pub fn signin_path(&self) -> &str {
        &self.signin_path
    }

    #[must_use]
    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    #[must_use]
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude.is_match(path)
    }

    /// An empty cookie value counts as absent.
    #[must_use]
    pub fn has_marker(&self, jar: &CookieJar) -> bool {
        jar.get(&self.cookie_name)
            .map(Cookie::value)
            .is_some_and(|value| !value.is_empty())
    }

    #[must_use]
    pub fn decide(&self, path: &str, jar: &CookieJar) -> GuardDecision {
        if self.is_excluded(path) {
            return GuardDecision::Continue;
        }

        let on_signin = path == self.signin_path;
        match (self.has_marker(jar), on_signin) {
            (false, false) => GuardDecision::Redirect(self.signin_path.clone()),
            (true, true) => GuardDecision::Redirect(self.landing_path.clone()),
            (false, true) | (true, false) => GuardDecision::Continue,
        }
    }
}

/// Axum middleware applying [`RouteGuard::decide`] to every request.
pub async fn route_guard(State(guard): State<Arc<RouteGuard>>, jar: CookieJar, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    match guard.decide(&path, &jar) {
        GuardDecision::Continue => next.run(request).await,
        GuardDecision::Redirect(target) => {
            tracing::debug!(%path, %target, "route guard redirect");
            Redirect::temporary(&target).into_response()
        }
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
