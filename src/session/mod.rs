//! Session store — the authoritative client-held auth state.
//!
//! DESIGN
//! ======
//! `SessionStore` owns the current `Session` plus an injected persistence
//! adapter. Every mutation writes the full snapshot through the adapter
//! before returning, so the in-memory copy and the persisted copy never
//! diverge under normal operation.
//!
//! The store is created once at startup and shared as `SharedSession`
//! through `AppState`; nothing reaches it through a global.
//!
//! LIMITATIONS
//! ===========
//! Two processes pointed at the same storage each keep their own
//! in-memory copy. The last writer wins on disk and the other process
//! keeps stale state until it restarts.

pub mod persistence;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

pub use persistence::{FilePersistence, MemoryPersistence, PersistError, SessionPersistence, STORAGE_KEY};

/// Store handle shared by handlers and the API client.
pub type SharedSession = Arc<RwLock<SessionStore>>;

/// Version written into the persisted envelope. Entries with any other
/// version are ignored on restore.
pub const STORAGE_VERSION: u32 = 0;

// =============================================================================
// USER PROFILE
// =============================================================================

/// Identity record of the signed-in operator.
///
/// All fields are optional. Keys the backend returns that are not modelled
/// here land in `extra` so profile merges never drop data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_superuser: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Shallow-merge `partial` over `base`. Top-level keys in `partial` win;
    /// a `null` value clears the field. A known key whose value has the
    /// wrong JSON type is ignored and the base value kept, so the merged
    /// profile always decodes again from storage.
    #[must_use]
    pub fn merged(base: Option<&Self>, partial: &Map<String, Value>) -> Self {
        let mut fields = match base.map(serde_json::to_value) {
            Some(Ok(Value::Object(map))) => map,
            _ => Map::new(),
        };
        for (key, value) in partial {
            if value.is_null() {
                fields.remove(key);
            } else if Self::accepts(key, value) {
                fields.insert(key.clone(), value.clone());
            } else {
                tracing::warn!(%key, "ignoring mistyped profile field");
            }
        }

        serde_json::from_value(Value::Object(fields)).unwrap_or_else(|_| base.cloned().unwrap_or_default())
    }

    /// Unknown keys always fit into `extra`; known keys must decode.
    fn accepts(key: &str, value: &Value) -> bool {
        let single = Value::Object(Map::from_iter([(key.to_owned(), value.clone())]));
        serde_json::from_value::<Self>(single).is_ok()
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Snapshot of the session. This is both the in-memory state and the
/// persisted shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default, rename = "isAuthenticated")]
    pub is_authenticated: bool,
    #[serde(default)]
    pub initialized: bool,
}

impl Session {
    /// `is_authenticated` must never be set without a token and a user.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        !self.is_authenticated || (self.token.is_some() && self.user.is_some())
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    state: &'a Session,
    version: u32,
}

#[derive(Deserialize)]
struct Envelope {
    state: Session,
    #[serde(default)]
    version: u32,
}

/// Encode a session into the persisted envelope.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_snapshot(session: &Session) -> Result<String, PersistError> {
    Ok(serde_json::to_string(&EnvelopeRef { state: session, version: STORAGE_VERSION })?)
}

/// Decode a persisted envelope. Anything unusable yields `None`.
#[must_use]
pub fn decode_snapshot(raw: &str) -> Option<Session> {
    let envelope: Envelope = serde_json::from_str(raw).ok()?;
    if envelope.version != STORAGE_VERSION || !envelope.state.is_consistent() {
        return None;
    }
    Some(envelope.state)
}

// =============================================================================
// STORE
// =============================================================================

/// Session state plus its write-through persistence adapter.
pub struct SessionStore {
    session: Session,
    persistence: Box<dyn SessionPersistence>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("is_authenticated", &self.session.is_authenticated)
            .field("initialized", &self.session.initialized)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Empty store. Nothing is read from `persistence`.
    #[must_use]
    pub fn new(persistence: impl SessionPersistence + 'static) -> Self {
        Self { session: Session::default(), persistence: Box::new(persistence) }
    }

    /// Rehydrate from `persistence`, then mark the store initialized.
    /// Missing or invalid persisted data restores as an empty session.
    #[must_use]
    pub fn restore(persistence: impl SessionPersistence + 'static) -> Self {
        let session = match persistence.load() {
            Ok(Some(raw)) => decode_snapshot(&raw).unwrap_or_else(|| {
                tracing::warn!(key = STORAGE_KEY, "discarding unreadable persisted session");
                Session::default()
            }),
            Ok(None) => Session::default(),
            Err(e) => {
                tracing::warn!(error = %e, key = STORAGE_KEY, "session restore failed");
                Session::default()
            }
        };

        let mut store = Self { session, persistence: Box::new(persistence) };
        store.set_initialized(true);
        tracing::debug!(authenticated = store.session.is_authenticated, "session restored");
        store
    }

    /// Wrap into the shared handle injected through `AppState`.
    #[must_use]
    pub fn shared(self) -> SharedSession {
        Arc::new(RwLock::new(self))
    }

    #[must_use]
    pub fn snapshot(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.session.token.as_deref()
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.session.refresh.as_deref()
    }

    /// Replace the user record wholesale.
    pub fn set_user(&mut self, user: UserProfile) {
        self.session.user = Some(user);
        self.persist();
    }

    /// Establish a full session after a successful login.
    pub fn set_auth(&mut self, token: impl Into<String>, refresh: impl Into<String>, user: UserProfile) {
        self.session.token = Some(token.into());
        self.session.refresh = Some(refresh.into());
        self.session.user = Some(user);
        self.session.is_authenticated = true;
        self.session.initialized = true;
        self.persist();
    }

    /// Replace only the bearer token, e.g. after a refresh exchange.
    pub fn update_token(&mut self, token: impl Into<String>) {
        self.session.token = Some(token.into());
        self.persist();
    }

    /// Drop credentials and identity. `initialized` is left as is.
    pub fn clear(&mut self) {
        self.session.token = None;
        self.session.refresh = None;
        self.session.user = None;
        self.session.is_authenticated = false;
        self.persist();
    }

    /// Alias of [`SessionStore::clear`].
    pub fn clear_auth(&mut self) {
        self.clear();
    }

    /// Alias of [`SessionStore::clear`].
    pub fn logout(&mut self) {
        self.clear();
    }

    pub fn set_initialized(&mut self, initialized: bool) {
        self.session.initialized = initialized;
        self.persist();
    }

    /// Shallow-merge `partial` into the user, creating it when absent.
    pub fn update_user_profile(&mut self, partial: &Map<String, Value>) {
        self.session.user = Some(UserProfile::merged(self.session.user.as_ref(), partial));
        self.persist();
    }

    /// Soft check: true iff both a token and a user are held.
    #[must_use]
    pub fn restore_session(&self) -> bool {
        self.session.token.is_some() && self.session.user.is_some()
    }

    fn persist(&self) {
        let result = encode_snapshot(&self.session).and_then(|raw| self.persistence.save(&raw));
        if let Err(e) = result {
            tracing::warn!(error = %e, key = STORAGE_KEY, "session write-through failed");
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
