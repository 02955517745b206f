use serde_json::Value;
use thiserror::Error;

/// Message used when the server could not be reached at all.
pub const UNREACHABLE_MESSAGE: &str = "Unable to reach the server. Check your network connection.";

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Failure reported by the transport layer.
///
/// `status` is the HTTP status code, or `0` when no response was received.
/// `message` is the server-provided message when there is one, so callers can
/// show it directly.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} (status {status})")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Network,
    Unauthorized,
    AccessDenied,
    NotFound,
    RateLimited,
    Server,
    Other,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            status,
            message: message.into(),
            details,
        }
    }

    /// The request never produced a response (DNS, refused, timeout, TLS).
    pub fn unreachable(err: &reqwest::Error) -> Self {
        Self::new(0, UNREACHABLE_MESSAGE, Some(Value::String(err.to_string())))
    }

    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Build an error from a non-success response.
    ///
    /// JSON bodies contribute their `message` field (a string, or an array of
    /// strings joined with `", "`). Plain-text bodies are used as the message.
    /// Anything else falls back to the reason phrase.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let fallback = status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        if body.trim().is_empty() {
            return Self::new(status.as_u16(), fallback, None);
        }

        match serde_json::from_str::<Value>(body) {
            Ok(payload) => {
                let message = Self::message_from_payload(&payload).unwrap_or(fallback);
                Self::new(status.as_u16(), message, Some(payload))
            }
            Err(_) => {
                let text = Self::truncate_body(body);
                Self::new(status.as_u16(), text.clone(), Some(Value::String(text)))
            }
        }
    }

    fn message_from_payload(payload: &Value) -> Option<String> {
        match payload {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Object(map) => match map.get("message")? {
                Value::Array(parts) => {
                    let joined = parts
                        .iter()
                        .map(|p| match p {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    Some(joined)
                }
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            },
            _ => None,
        }
    }

    pub fn kind(&self) -> ApiErrorKind {
        match self.status {
            0 => ApiErrorKind::Network,
            401 => ApiErrorKind::Unauthorized,
            403 => ApiErrorKind::AccessDenied,
            404 => ApiErrorKind::NotFound,
            429 => ApiErrorKind::RateLimited,
            500..=599 => ApiErrorKind::Server,
            _ => ApiErrorKind::Other,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind() == ApiErrorKind::Unauthorized
    }

    /// True when `message` came from the server rather than the reason phrase.
    fn has_server_message(&self) -> bool {
        if self.message.is_empty() {
            return false;
        }
        let reason = reqwest::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason());
        reason != Some(self.message.as_str())
    }

    /// Message suitable for showing next to a sign-in form.
    ///
    /// A server-provided message wins for every status; the generic text is
    /// only used when the server sent none.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ApiErrorKind::Network => UNREACHABLE_MESSAGE.to_string(),
            _ if self.has_server_message() => self.message.clone(),
            ApiErrorKind::Unauthorized => "Invalid email or password".to_string(),
            ApiErrorKind::RateLimited => "Too many attempts - please wait before retrying".to_string(),
            ApiErrorKind::Server => "The server ran into a problem. Please try again.".to_string(),
            _ if !self.message.is_empty() => self.message.clone(),
            _ => format!("Request failed with status {}", self.status),
        }
    }
}
