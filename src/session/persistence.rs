//! Persistence adapters for the session store.
//!
//! The store hands every adapter the full encoded snapshot; adapters only
//! move text in and out of storage under `STORAGE_KEY`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Fixed name of the persisted session entry.
pub const STORAGE_KEY: &str = "auth-storage";

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("session storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Key-value storage capability injected into `SessionStore`.
pub trait SessionPersistence: Send + Sync {
    /// Read the raw entry, `None` when nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn load(&self) -> Result<Option<String>, PersistError>;

    /// Replace the raw entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save(&self, raw: &str) -> Result<(), PersistError>;
}

// =============================================================================
// MEMORY
// =============================================================================

/// In-memory adapter. Clones share the same cell, so a test can keep one
/// clone to inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    cell: Arc<Mutex<Option<String>>>,
}

impl MemoryPersistence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter pre-seeded with a raw entry.
    #[must_use]
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self { cell: Arc::new(Mutex::new(Some(raw.into()))) }
    }

    /// Current raw entry.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl SessionPersistence for MemoryPersistence {
    fn load(&self) -> Result<Option<String>, PersistError> {
        Ok(self.raw())
    }

    fn save(&self, raw: &str) -> Result<(), PersistError> {
        *self.cell.lock().unwrap_or_else(PoisonError::into_inner) = Some(raw.to_owned());
        Ok(())
    }
}

// =============================================================================
// FILE
// =============================================================================

/// One JSON file per storage directory: `<dir>/auth-storage.json`.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { path: dir.as_ref().join(format!("{STORAGE_KEY}.json")) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionPersistence for FilePersistence {
    fn load(&self) -> Result<Option<String>, PersistError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, raw: &str) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write a sibling then rename so readers never observe a partial file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
