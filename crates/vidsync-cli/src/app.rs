//! Application wiring for the CLI.
//!
//! Builds the API client, token store and session manager from the config,
//! and starts session restoration as soon as the store finishes loading.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use vidsync_core::api::ApiClient;
use vidsync_core::auth::{FileTokenStore, KeyringTokenStore, SessionManager, TokenStore};
use vidsync_core::config::{Config, TokenBackend};

/// Blocking load of a token store, run off the async runtime
type Hydrate = Box<dyn FnOnce() + Send>;

pub struct App {
    pub config: Config,
    pub session: SessionManager,
    bootstrap: Option<JoinHandle<()>>,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let base_url = config.api_base_url();
        debug!(%base_url, backend = ?config.token_backend, "Config loaded");
        let api = Arc::new(ApiClient::new(base_url)?);

        let (store, hydrate) = match config.token_backend {
            TokenBackend::File => {
                let state_dir = config
                    .state_dir()
                    .unwrap_or_else(|_| PathBuf::from("./.vidsync"));
                debug!(?state_dir, "State directory configured");
                let store = Arc::new(FileTokenStore::new(&state_dir));
                let loader = store.clone();
                let hydrate: Hydrate = Box::new(move || loader.hydrate());
                (store as Arc<dyn TokenStore>, hydrate)
            }
            TokenBackend::Keyring => {
                let store = Arc::new(KeyringTokenStore::new()?);
                let loader = store.clone();
                let hydrate: Hydrate = Box::new(move || loader.hydrate());
                (store as Arc<dyn TokenStore>, hydrate)
            }
        };

        let session = SessionManager::new(api, store);

        // Subscribe first, then load; restoration fires once loading completes
        let bootstrap = session.initialize_when_ready();
        tokio::task::spawn_blocking(hydrate);

        Ok(Self {
            config,
            session,
            bootstrap: Some(bootstrap),
        })
    }

    /// Wait until session restoration has resolved.
    pub async fn wait_for_session(&mut self) {
        if let Some(handle) = self.bootstrap.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Session bootstrap task failed");
            }
        }
    }

    pub fn remember_email(&mut self, email: &str) {
        self.config.last_email = Some(email.to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }
}
