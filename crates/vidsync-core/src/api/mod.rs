//! REST API client module for the VidSync backend.
//!
//! This module provides the `ApiClient` for communicating with the
//! VidSync API, and the `AuthApi` trait the session manager depends on.
//!
//! Authenticated endpoints take a JWT bearer token obtained from
//! `POST /auth/signin` or `POST /auth/signup`.

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthApi, DEFAULT_API_BASE_URL};
pub use error::{ApiError, ApiErrorKind};
