//! Runtime configuration loaded from environment variables.
//!
//! Every setting has a default so the binary starts with no environment at
//! all; only an invalid guard exclusion pattern or a relative sign-in /
//! landing path is fatal.

use std::path::PathBuf;

use regex::Regex;

use crate::guard::RouteGuard;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_COOKIE_NAME: &str = "token";
pub const DEFAULT_COOKIE_MAX_AGE_DAYS: i64 = 7;
pub const DEFAULT_SIGNIN_PATH: &str = "/signin";
pub const DEFAULT_LANDING_PATH: &str = "/";

/// Paths that bypass the route guard: API routes, bundled static and image
/// assets, the favicon.
pub const DEFAULT_EXCLUDE_PATTERN: &str = r"^/(?:api|_next/static|_next/image|assets|favicon\.ico)";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid GUARD_EXCLUDE_PATTERN: {0}")]
    ExcludePattern(#[from] regex::Error),
    #[error("{var} must start with '/': {path:?}")]
    RoutePath { var: &'static str, path: String },
}

fn route_path(var: &'static str, path: &str) -> Result<String, ConfigError> {
    if path.starts_with('/') {
        Ok(path.to_owned())
    } else {
        Err(ConfigError::RoutePath { var, path: path.to_owned() })
    }
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_owned())
}

// =============================================================================
// COOKIE SETTINGS
// =============================================================================

/// How the credential marker cookie is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
    pub max_age_days: i64,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self { name: DEFAULT_COOKIE_NAME.to_owned(), secure: false, max_age_days: DEFAULT_COOKIE_MAX_AGE_DAYS }
    }
}

// =============================================================================
// APP CONFIG
// =============================================================================

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Base URL of the operations REST backend. API routes answer 503 without it.
    pub backend_url: Option<String>,
    /// Directory for the persisted session; in-memory when unset.
    pub storage_dir: Option<PathBuf>,
    pub cookie: CookieSettings,
    pub signin_path: String,
    pub landing_path: String,
    pub exclude_pattern: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            backend_url: None,
            storage_dir: None,
            cookie: CookieSettings::default(),
            signin_path: DEFAULT_SIGNIN_PATH.to_owned(),
            landing_path: DEFAULT_LANDING_PATH.to_owned(),
            exclude_pattern: DEFAULT_EXCLUDE_PATTERN.to_owned(),
        }
    }
}

impl AppConfig {
    /// Load from `PORT`, `BACKEND_URL`, `SESSION_STORAGE_DIR`,
    /// `AUTH_COOKIE_NAME`, `AUTH_COOKIE_MAX_AGE_DAYS`, `COOKIE_SECURE`,
    /// `SIGNIN_PATH`, `LANDING_PATH`, `GUARD_EXCLUDE_PATTERN`.
    #[must_use]
    pub fn from_env() -> Self {
        let backend_url = std::env::var("BACKEND_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_owned())
            .filter(|v| !v.is_empty());

        // Secure cookies by default whenever the backend is reached over TLS.
        let secure = env_bool("COOKIE_SECURE")
            .unwrap_or_else(|| backend_url.as_deref().is_some_and(|url| url.starts_with("https://")));

        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            storage_dir: std::env::var_os("SESSION_STORAGE_DIR").map(PathBuf::from),
            cookie: CookieSettings {
                name: env_string("AUTH_COOKIE_NAME", DEFAULT_COOKIE_NAME),
                secure,
                max_age_days: env_parse("AUTH_COOKIE_MAX_AGE_DAYS", DEFAULT_COOKIE_MAX_AGE_DAYS),
            },
            signin_path: env_string("SIGNIN_PATH", DEFAULT_SIGNIN_PATH),
            landing_path: env_string("LANDING_PATH", DEFAULT_LANDING_PATH),
            exclude_pattern: env_string("GUARD_EXCLUDE_PATTERN", DEFAULT_EXCLUDE_PATTERN),
            backend_url,
        }
    }

    /// Build the route guard described by this config.
    ///
    /// # Errors
    ///
    /// Returns an error if the exclusion pattern is not a valid regex or a
    /// sign-in / landing path is not absolute.
    pub fn route_guard(&self) -> Result<RouteGuard, ConfigError> {
        Ok(RouteGuard::new(
            self.cookie.name.clone(),
            route_path("SIGNIN_PATH", &self.signin_path)?,
            route_path("LANDING_PATH", &self.landing_path)?,
            Regex::new(&self.exclude_pattern)?,
        ))
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
