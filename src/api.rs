//! Backend API client — bearer auth and credential-rejection handling.
//!
//! DESIGN
//! ======
//! Every authenticated call reads the current token from the session store,
//! attaches it as a bearer header, and on `401 Unauthorized` clears the
//! session before returning `ApiError::Unauthorized`. Callers only decide
//! where to send the user next.
//!
//! The store lock is never held across a network await.

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::session::SharedSession;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("backend rejected credentials")]
    Unauthorized,
    #[error("backend returned {0}: {1}")]
    Status(StatusCode, String),
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend not configured")]
    NotConfigured,
    #[error("no refresh token held")]
    NoRefreshToken,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Auth {
    Bearer,
    Anonymous,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SharedSession,
}

impl ApiClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, session: SharedSession) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { http: reqwest::Client::new(), base_url, session }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET` with the bearer token attached.
    ///
    /// # Errors
    ///
    /// See [`ApiError`]. A `401` also clears the session.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send::<(), T>(Method::GET, path, None, Auth::Bearer).await
    }

    /// `POST` a JSON body with the bearer token attached.
    ///
    /// # Errors
    ///
    /// See [`ApiError`]. A `401` also clears the session.
    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.send(Method::POST, path, Some(body), Auth::Bearer).await
    }

    /// `PATCH` a JSON body with the bearer token attached.
    ///
    /// # Errors
    ///
    /// See [`ApiError`]. A `401` also clears the session.
    pub async fn patch<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.send(Method::PATCH, path, Some(body), Auth::Bearer).await
    }

    /// `POST` without credentials. A `401` here means the submitted
    /// credentials were wrong and leaves the session alone.
    ///
    /// # Errors
    ///
    /// See [`ApiError`]; a `401` is reported as `ApiError::Status`.
    pub async fn post_anonymous<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.send(Method::POST, path, Some(body), Auth::Anonymous).await
    }

    async fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        auth: Auth,
    ) -> Result<T, ApiError> {
        let mut request = self.http.request(method.clone(), self.url(path));
        if auth == Auth::Bearer {
            let token = self.session.read().await.token().map(str::to_owned);
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await?;
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED && auth == Auth::Bearer {
            tracing::warn!(%method, %path, "backend returned 401, clearing session");
            self.session.write().await.clear();
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(%method, %path, %status, "backend request failed");
            return Err(ApiError::Status(status, body));
        }

        Ok(resp.json::<T>().await?)
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
