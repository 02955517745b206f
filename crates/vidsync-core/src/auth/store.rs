use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Hydration;

/// Token file name in the state directory
pub const TOKEN_FILE: &str = "vidsync.auth.json";

/// Persistence for the single session token.
///
/// `get` serves an in-memory mirror and never touches the backing medium;
/// `set` and `remove` write through. Callers must wait on [`hydration`]
/// before trusting `get`.
///
/// [`hydration`]: TokenStore::hydration
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, token: &str) -> Result<()>;
    fn remove(&self) -> Result<()>;
    fn hydration(&self) -> &Hydration;
}

/// Everything that is persisted. The profile is deliberately absent.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedToken {
    token: Option<String>,
}

// ============================================================================
// File-backed store
// ============================================================================

/// Stores `{"token": ...}` as JSON in the state directory.
pub struct FileTokenStore {
    path: PathBuf,
    token: Mutex<Option<String>>,
    hydration: Hydration,
}

impl FileTokenStore {
    /// Create an unhydrated store. Call [`FileTokenStore::hydrate`] to load it.
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(TOKEN_FILE),
            token: Mutex::new(None),
            hydration: Hydration::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the token from disk and fire the hydration signal.
    ///
    /// An unreadable or corrupt file is treated as "no token"; hydration still
    /// completes so the session can resolve to unauthenticated.
    pub fn hydrate(&self) {
        let loaded = match self.read_file() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, path = ?self.path, "Failed to load persisted token");
                None
            }
        };
        debug!(has_token = loaded.is_some(), "Token store hydrated");
        *self.lock() = loaded;
        self.hydration.complete();
    }

    fn read_file(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read token file")?;
        let persisted: PersistedToken = serde_json::from_str(&contents)
            .context("Failed to parse token file")?;
        Ok(persisted.token.filter(|t| !t.is_empty()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        // A poisoned mirror still holds a plain Option; keep using it
        self.token.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        self.lock().clone()
    }

    fn set(&self, token: &str) -> Result<()> {
        *self.lock() = Some(token.to_string());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create state directory")?;
        }
        let contents = serde_json::to_string_pretty(&PersistedToken {
            token: Some(token.to_string()),
        })?;
        std::fs::write(&self.path, contents).context("Failed to write token file")?;
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        *self.lock() = None;
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove token file")?;
        }
        Ok(())
    }

    fn hydration(&self) -> &Hydration {
        &self.hydration
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store, hydrated from construction. Used by tests and by
/// callers that do not want anything written to disk.
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
    hydration: Hydration,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self {
            token: Mutex::new(None),
            hydration: Hydration::completed(),
        }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        *store.lock() = Some(token.into());
        store
    }

    /// A store whose hydration signal has not fired yet.
    pub fn pending() -> Self {
        Self {
            token: Mutex::new(None),
            hydration: Hydration::new(),
        }
    }

    /// Finish loading, optionally with a previously stored token.
    pub fn finish_hydration(&self, token: Option<String>) {
        *self.lock() = token;
        self.hydration.complete();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.lock().clone()
    }

    fn set(&self, token: &str) -> Result<()> {
        *self.lock() = Some(token.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        *self.lock() = None;
        Ok(())
    }

    fn hydration(&self) -> &Hydration {
        &self.hydration
    }
}
