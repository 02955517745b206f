use std::sync::{Arc, MutexGuard};

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::AuthApi;
use crate::models::{AccessToken, Credentials, UserProfile};

use super::{SessionError, TokenStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    /// Bootstrap or a sign-in is in flight. Not the same as unauthenticated.
    Checking,
    Authenticated,
    Unauthenticated,
}

/// Snapshot of the client's session.
///
/// Built only through the constructors below, which uphold:
/// `Authenticated` iff both `token` and `user` are set, and
/// `Unauthenticated` implies neither is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub status: AuthStatus,
    pub token: Option<String>,
    pub user: Option<UserProfile>,
    pub has_initialized: bool,
}

impl SessionState {
    fn initial() -> Self {
        Self::checking(None, false)
    }

    fn checking(token: Option<String>, has_initialized: bool) -> Self {
        Self {
            status: AuthStatus::Checking,
            token,
            user: None,
            has_initialized,
        }
    }

    fn authenticated(token: String, user: UserProfile, has_initialized: bool) -> Self {
        Self {
            status: AuthStatus::Authenticated,
            token: Some(token),
            user: Some(user),
            has_initialized,
        }
    }

    fn unauthenticated(has_initialized: bool) -> Self {
        Self {
            status: AuthStatus::Unauthenticated,
            token: None,
            user: None,
            has_initialized,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == AuthStatus::Authenticated
    }

    pub fn is_checking(&self) -> bool {
        self.status == AuthStatus::Checking
    }
}

#[derive(Debug, Clone, Copy)]
enum SignInKind {
    SignIn,
    SignUp,
}

impl SignInKind {
    fn action(self) -> &'static str {
        match self {
            SignInKind::SignIn => "login",
            SignInKind::SignUp => "registration",
        }
    }
}

struct Inner {
    api: Arc<dyn AuthApi>,
    store: Arc<dyn TokenStore>,
    state: watch::Sender<SessionState>,
    // Held for the whole of each async transition
    transition: Mutex<()>,
    // Bumped by every logout. Transitions commit only if it is unchanged
    // since they started, and logout holds it while it clears the session.
    generation: std::sync::Mutex<u64>,
}

/// Owns the session state and every transition on it.
///
/// Cloning is cheap and every clone drives the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<dyn TokenStore>) -> Self {
        let (state, _rx) = watch::channel(SessionState::initial());
        Self {
            inner: Arc::new(Inner {
                api,
                store,
                state,
                transition: Mutex::new(()),
                generation: std::sync::Mutex::new(0),
            }),
        }
    }

    // ===== Observation =====

    /// Receiver that yields every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn status(&self) -> AuthStatus {
        self.inner.state.borrow().status
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    pub fn has_initialized(&self) -> bool {
        self.inner.state.borrow().has_initialized
    }

    pub fn token(&self) -> Option<String> {
        self.inner.state.borrow().token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.inner.state.borrow().user.clone()
    }

    fn publish(&self, state: SessionState) {
        debug!(status = ?state.status, has_initialized = state.has_initialized, "Session transition");
        self.inner.state.send_replace(state);
    }

    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.inner.generation.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn generation(&self) -> u64 {
        *self.lock_generation()
    }

    /// Run `commit` unless a logout happened after `generation` was read.
    ///
    /// Store writes and publishes made inside `commit` cannot interleave with
    /// a logout.
    fn commit_if_current(&self, generation: u64, commit: impl FnOnce()) -> bool {
        let current = self.lock_generation();
        if *current != generation {
            debug!("Session ended while a transition was in flight; dropping its result");
            return false;
        }
        commit();
        true
    }

    fn clear_persisted_token(&self) {
        if let Err(e) = self.inner.store.remove() {
            warn!(error = %e, "Failed to clear persisted token");
        }
    }

    // ===== Transitions =====

    /// Restore a previous session from the token store.
    ///
    /// Waits for the store's hydration signal first. Runs at most once; later
    /// calls return without doing anything. Failures are never surfaced: the
    /// session just resolves to unauthenticated.
    pub async fn initialize(&self) {
        self.inner.store.hydration().wait().await;

        let _guard = self.inner.transition.lock().await;
        if self.has_initialized() {
            debug!("Session already initialized");
            return;
        }

        let generation = self.generation();
        let Some(token) = self.inner.store.get() else {
            debug!("No persisted token");
            self.commit_if_current(generation, || {
                self.publish(SessionState::unauthenticated(true));
            });
            return;
        };

        let started = self.commit_if_current(generation, || {
            self.publish(SessionState::checking(Some(token.clone()), false));
        });
        if !started {
            return;
        }

        match self.inner.api.fetch_current_user(&token).await {
            Ok(user) => {
                let user_id = user.id;
                if self.commit_if_current(generation, || {
                    self.publish(SessionState::authenticated(token, user, true));
                }) {
                    info!(user_id, "Session restored");
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to restore user session");
                self.commit_if_current(generation, || {
                    self.clear_persisted_token();
                    self.publish(SessionState::unauthenticated(true));
                });
            }
        }
    }

    /// Run [`initialize`](Self::initialize) in the background as soon as the
    /// token store reports it is hydrated.
    pub fn initialize_when_ready(&self) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move { manager.initialize().await })
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, SessionError> {
        self.sign_in_with(credentials, SignInKind::SignIn).await
    }

    /// Create an account; a successful sign-up leaves the session authenticated.
    pub async fn register(&self, credentials: &Credentials) -> Result<UserProfile, SessionError> {
        self.sign_in_with(credentials, SignInKind::SignUp).await
    }

    async fn sign_in_with(
        &self,
        credentials: &Credentials,
        kind: SignInKind,
    ) -> Result<UserProfile, SessionError> {
        let _guard = self.inner.transition.lock().await;
        let generation = self.generation();
        let has_initialized = self.has_initialized();

        if !self.commit_if_current(generation, || {
            self.publish(SessionState::checking(None, has_initialized));
        }) {
            return Err(SessionError::Superseded);
        }

        match self.issue_and_fetch(credentials, kind, generation).await {
            Ok(Some((token, user))) => {
                // A completed sign-in is a resolved session; a later
                // initialize() must not re-validate it
                let committed = self.commit_if_current(generation, || {
                    self.publish(SessionState::authenticated(
                        token.into_inner(),
                        user.clone(),
                        true,
                    ));
                });
                if !committed {
                    return Err(SessionError::Superseded);
                }
                info!(user_id = user.id, action = kind.action(), "Signed in");
                Ok(user)
            }
            Ok(None) => Err(SessionError::Superseded),
            Err(e) => {
                warn!(error = %e, action = kind.action(), "Sign-in failed");
                self.commit_if_current(generation, || {
                    self.clear_persisted_token();
                    self.publish(SessionState::unauthenticated(has_initialized));
                });
                Err(SessionError::from_failure(e, kind.action()))
            }
        }
    }

    /// Returns `None` when a logout ended the session before the token could
    /// be persisted.
    async fn issue_and_fetch(
        &self,
        credentials: &Credentials,
        kind: SignInKind,
        generation: u64,
    ) -> anyhow::Result<Option<(AccessToken, UserProfile)>> {
        let token = match kind {
            SignInKind::SignIn => self.inner.api.sign_in(credentials).await?,
            SignInKind::SignUp => self.inner.api.sign_up(credentials).await?,
        };

        let persisted = self.commit_if_current(generation, || {
            // The in-memory session stays valid even if the write fails
            if let Err(e) = self.inner.store.set(token.as_str()) {
                warn!(error = %e, "Failed to persist session token");
            }
        });
        if !persisted {
            return Ok(None);
        }

        let user = self.inner.api.fetch_current_user(token.as_str()).await?;
        Ok(Some((token, user)))
    }

    /// End the session. Always succeeds; safe to call repeatedly.
    ///
    /// Any transition still in flight is abandoned and will not write the
    /// store or publish afterwards.
    pub fn logout(&self) {
        let mut generation = self.lock_generation();
        *generation += 1;
        self.clear_persisted_token();
        self.publish(SessionState::unauthenticated(true));
        drop(generation);
        info!("Logged out");
    }

    /// Re-fetch the profile for the current token.
    ///
    /// Only `user` changes; status and token are left alone.
    pub async fn refresh_user(&self) -> Result<UserProfile, SessionError> {
        let _guard = self.inner.transition.lock().await;
        let generation = self.generation();
        let token = self.token().ok_or(SessionError::NoActiveSession)?;

        let user = self
            .inner
            .api
            .fetch_current_user(&token)
            .await
            .map_err(|e| SessionError::from_failure(e, "profile refresh"))?;

        // logout() does not take the transition lock, so the session may have
        // ended while the request was in flight
        self.commit_if_current(generation, || {
            self.inner.state.send_if_modified(|state| {
                if state.is_authenticated() && state.token.as_deref() == Some(token.as_str()) {
                    state.user = Some(user.clone());
                    true
                } else {
                    false
                }
            });
        });

        Ok(user)
    }
}
