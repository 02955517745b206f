use thiserror::Error;
use tracing::error;

use crate::api::ApiError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// The backend rejected the request or could not be reached.
    #[error(transparent)]
    Transport(#[from] ApiError),

    #[error("No active session - please log in first")]
    NoActiveSession,

    /// A logout ended the session before the sign-in could complete.
    #[error("Signed out before sign-in completed")]
    Superseded,

    /// Anything else. Carries a message safe to show a user; the cause is only logged.
    #[error("{0}")]
    Unexpected(String),
}

impl SessionError {
    /// Split an internal failure into a transport error or a generic one.
    ///
    /// `action` names the operation for the user-facing message, e.g. "login".
    pub fn from_failure(err: anyhow::Error, action: &str) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api) => SessionError::Transport(api),
            Err(other) => {
                error!(error = ?other, action, "Unexpected error");
                SessionError::Unexpected(format!(
                    "Unexpected error during {}. Please try again.",
                    action
                ))
            }
        }
    }

    pub fn as_transport(&self) -> Option<&ApiError> {
        match self {
            SessionError::Transport(api) => Some(api),
            _ => None,
        }
    }

    /// Message suitable for displaying next to a form.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Transport(api) => api.user_message(),
            other => other.to_string(),
        }
    }
}
