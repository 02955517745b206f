use super::{AuthStatus, SessionState};

/// Where unauthenticated users are sent by default
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";

/// What a protected surface should do for the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session is still being resolved; show a loading indicator.
    Loading,
    Render,
    Redirect(String),
}

pub fn guard(state: &SessionState, redirect_to: &str) -> GuardDecision {
    match state.status {
        AuthStatus::Checking => GuardDecision::Loading,
        AuthStatus::Authenticated => GuardDecision::Render,
        AuthStatus::Unauthenticated => GuardDecision::Redirect(redirect_to.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserProfile;

    fn state(status: AuthStatus) -> SessionState {
        let authenticated = status == AuthStatus::Authenticated;
        SessionState {
            status,
            token: authenticated.then(|| "t".to_string()),
            user: authenticated.then(|| UserProfile {
                id: 1,
                email: "a@b.com".to_string(),
                nickname: None,
                created_at: None,
                updated_at: None,
            }),
            has_initialized: status != AuthStatus::Checking,
        }
    }

    #[test]
    fn test_checking_is_loading_not_redirect() {
        assert_eq!(guard(&state(AuthStatus::Checking), DEFAULT_LOGIN_ROUTE), GuardDecision::Loading);
    }

    #[test]
    fn test_authenticated_renders() {
        assert_eq!(guard(&state(AuthStatus::Authenticated), DEFAULT_LOGIN_ROUTE), GuardDecision::Render);
    }

    #[test]
    fn test_unauthenticated_redirects() {
        assert_eq!(
            guard(&state(AuthStatus::Unauthenticated), "/signin"),
            GuardDecision::Redirect("/signin".to_string())
        );
    }
}
