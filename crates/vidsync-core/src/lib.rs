//! Core library for VidSync clients.
//!
//! - `api`: HTTP transport for the VidSync backend
//! - `auth`: session manager, token persistence and route guard
//! - `validation`: sign-in and sign-up form rules
//! - `config`: on-disk configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod validation;

pub use api::{ApiClient, ApiError, AuthApi};
pub use auth::{AuthStatus, SessionError, SessionManager, SessionState};
pub use config::Config;
pub use models::{Credentials, UserProfile};
