use std::fmt;

use serde::{Deserialize, Serialize};

/// Email and password sent to the sign-in and sign-up endpoints.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

// Keep passwords out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Wire shape of a successful sign-in/sign-up response.
#[derive(Debug, Deserialize)]
pub struct AuthTokensResponse {
    pub access_token: String,
}

/// Bearer credential issued by the backend.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(pub String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

impl From<AuthTokensResponse> for AccessToken {
    fn from(response: AuthTokensResponse) -> Self {
        Self(response.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("a@b.com", "secret123");
        let printed = format!("{:?}", creds);
        assert!(printed.contains("a@b.com"));
        assert!(!printed.contains("secret123"));
    }

    #[test]
    fn test_parse_tokens_response() {
        let json = r#"{"access_token":"eyJhbGciOi.abc.def"}"#;
        let resp: AuthTokensResponse = serde_json::from_str(json).unwrap();
        let token = AccessToken::from(resp);
        assert_eq!(token.as_str(), "eyJhbGciOi.abc.def");
        assert_eq!(format!("{:?}", token), "AccessToken(<redacted>)");
    }
}
