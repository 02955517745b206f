//! Data models for the VidSync API.
//!
//! - `UserProfile`: the record returned by `GET /users/me`
//! - `Credentials`, `AccessToken`: sign-in and sign-up payloads

pub mod auth;
pub mod user;

pub use auth::{AccessToken, AuthTokensResponse, Credentials};
pub use user::UserProfile;
