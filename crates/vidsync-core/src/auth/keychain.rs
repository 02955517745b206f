use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::{debug, warn};

use super::{Hydration, TokenStore};

const SERVICE_NAME: &str = "vidsync";

/// Keychain account under which the session token is kept
const TOKEN_ACCOUNT: &str = "vidsync.auth.token";

/// Keeps the session token in the OS keychain.
pub struct KeyringTokenStore {
    entry: Entry,
    token: Mutex<Option<String>>,
    hydration: Hydration,
}

impl KeyringTokenStore {
    pub fn new() -> Result<Self> {
        let entry = Entry::new(SERVICE_NAME, TOKEN_ACCOUNT)
            .context("Failed to create keyring entry")?;
        Ok(Self {
            entry,
            token: Mutex::new(None),
            hydration: Hydration::new(),
        })
    }

    /// Read the token from the keychain and fire the hydration signal.
    pub fn hydrate(&self) {
        let loaded = match self.entry.get_password() {
            Ok(token) if !token.is_empty() => Some(token),
            Ok(_) | Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read token from keychain");
                None
            }
        };
        debug!(has_token = loaded.is_some(), "Keychain token store hydrated");
        *self.lock() = loaded;
        self.hydration.complete();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self) -> Option<String> {
        self.lock().clone()
    }

    fn set(&self, token: &str) -> Result<()> {
        *self.lock() = Some(token.to_string());
        self.entry
            .set_password(token)
            .context("Failed to store token in keychain")
    }

    fn remove(&self) -> Result<()> {
        *self.lock() = None;
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }

    fn hydration(&self) -> &Hydration {
        &self.hydration
    }
}
