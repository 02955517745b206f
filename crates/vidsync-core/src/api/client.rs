//! API client for communicating with the VidSync REST API.
//!
//! This module provides the `ApiClient` struct for the sign-in, sign-up
//! and current-user endpoints, plus a generic `request` for everything else.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{AccessToken, AuthTokensResponse, Credentials, UserProfile};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL used when nothing is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";

const SIGN_IN_ENDPOINT: &str = "/auth/signin";
const SIGN_UP_ENDPOINT: &str = "/auth/signup";
const CURRENT_USER_ENDPOINT: &str = "/users/me";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) GET requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// The calls the session manager makes against the backend.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/signin`
    async fn sign_in(&self, credentials: &Credentials) -> Result<AccessToken>;

    /// `POST /auth/signup`
    async fn sign_up(&self, credentials: &Credentials) -> Result<AccessToken>;

    /// `GET /users/me` authenticated with `token`
    async fn fetch_current_user(&self, token: &str) -> Result<UserProfile>;
}

/// API client for VidSync.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    initial_backoff_ms: u64,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            token: None,
            initial_backoff_ms: INITIAL_BACKOFF_MS,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Set the default bearer token, used when a call has no token of its own
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Create a new ApiClient with the given default token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
            initial_backoff_ms: self.initial_backoff_ms,
        }
    }

    /// Override the rate-limit backoff (tests use a tiny value)
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX);
        self
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn auth_headers(&self, token: Option<&str>) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = token.or(self.token.as_deref()) {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))
                    .context("Token contains characters not allowed in a header")?,
            );
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(response: reqwest::Response) -> Result<Option<reqwest::Response>> {
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Ok(None)
        } else {
            Self::check_response(response).await.map(Some)
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response, url: &str) -> Result<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::unreachable(&e))?;
        // Empty 2xx bodies decode as JSON null so `()` and `Option<_>` work
        let bytes = if bytes.is_empty() { &b"null"[..] } else { &bytes[..] };
        serde_json::from_slice(bytes)
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    /// Execute one request against the API.
    ///
    /// `token` takes precedence over the default token. Transport failures
    /// surface as [`ApiError`] inside the returned `anyhow::Error`; decode
    /// failures do not.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<T> {
        let url = self.url(path);
        let retry_rate_limit = method == Method::GET;
        let mut retries = 0;
        let mut backoff_ms = self.initial_backoff_ms;

        loop {
            let mut builder = self
                .client
                .request(method.clone(), &url)
                .header(header::ACCEPT, "application/json")
                .headers(self.auth_headers(token)?);
            if let Some(body) = body {
                builder = builder.json(body);
            }

            debug!(method = %method, url = %url, "Sending request");
            let response = builder.send().await.map_err(|e| {
                warn!(url = %url, error = %e, "Request did not reach the server");
                ApiError::unreachable(&e)
            })?;

            if !retry_rate_limit {
                let response = Self::check_response(response).await?;
                return Self::decode(response, &url).await;
            }

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Self::decode(response, &url).await,
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::new(429, "Too Many Requests", None).into());
                    }
                    warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = backoff_ms.saturating_mul(2); // Exponential backoff
                }
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> Result<T> {
        self.request(Method::GET, path, None, token).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<T> {
        let body = serde_json::to_value(body).context("Failed to encode request body")?;
        self.request(Method::POST, path, Some(&body), token).await
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn sign_in(&self, credentials: &Credentials) -> Result<AccessToken> {
        let response: AuthTokensResponse = self.post(SIGN_IN_ENDPOINT, credentials, None).await?;
        Ok(response.into())
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<AccessToken> {
        let response: AuthTokensResponse = self.post(SIGN_UP_ENDPOINT, credentials, None).await?;
        Ok(response.into())
    }

    async fn fetch_current_user(&self, token: &str) -> Result<UserProfile> {
        self.get(CURRENT_USER_ENDPOINT, Some(token)).await
    }
}
