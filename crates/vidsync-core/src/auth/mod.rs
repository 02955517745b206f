//! Authentication module for managing the client session.
//!
//! This module provides:
//! - `SessionManager`: the session state machine (initialize, login,
//!   register, logout, refresh) with subscriber notification
//! - `TokenStore`: persistence for the single bearer token, backed by a JSON
//!   file, the OS keychain, or memory
//! - `guard`: the route-guard decision derived from a session snapshot
//!
//! Only the token is ever persisted; the profile is re-fetched on restore.

pub mod error;
pub mod guard;
pub mod hydration;
pub mod keychain;
pub mod session;
pub mod store;

pub use error::SessionError;
pub use guard::{guard, GuardDecision, DEFAULT_LOGIN_ROUTE};
pub use hydration::Hydration;
pub use keychain::KeyringTokenStore;
pub use session::{AuthStatus, SessionManager, SessionState};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_FILE};
