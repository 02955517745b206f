//! Field validation for the sign-in and sign-up forms.
//!
//! Each validator returns `None` when the value is acceptable, or the message
//! to show next to the field.

use crate::models::Credentials;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Shown when a form is submitted with outstanding field errors
pub const SUBMIT_BLOCKED_MESSAGE: &str = "Please resolve the highlighted issues before continuing.";

/// Whitespace as browsers define it for form input: Unicode `White_Space`
/// without U+0085, plus the byte-order mark U+FEFF.
fn is_form_whitespace(c: char) -> bool {
    (c.is_whitespace() && c != '\u{0085}') || c == '\u{FEFF}'
}

fn trim_form(value: &str) -> &str {
    value.trim_matches(is_form_whitespace)
}

pub fn normalize_email(value: &str) -> String {
    trim_form(value).to_string()
}

/// `local@domain.tld` with no whitespace and exactly one `@`; the domain needs
/// a dot with something on both sides.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(is_form_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

pub fn validate_email(value: &str) -> Option<String> {
    let email = normalize_email(value);
    if email.is_empty() {
        return Some("Email is required.".to_string());
    }
    if !is_valid_email(&email) {
        return Some("Email address is invalid.".to_string());
    }
    None
}

pub fn validate_password(value: &str, min_length: usize) -> Option<String> {
    let password = trim_form(value);
    if password.is_empty() {
        return Some("Password is required.".to_string());
    }
    // Counted in UTF-16 units, the way the web form and the backend count
    if password.encode_utf16().count() < min_length {
        return Some(format!("Password must be at least {} characters.", min_length));
    }
    None
}

pub fn validate_password_confirmation(confirmation: &str, password: &str) -> Option<String> {
    if trim_form(confirmation).is_empty() {
        return Some("Confirm your password.".to_string());
    }
    if confirmation != password {
        return Some("Passwords do not match.".to_string());
    }
    None
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

impl FieldErrors {
    pub fn has_errors(&self) -> bool {
        self.email.is_some() || self.password.is_some() || self.confirm_password.is_some()
    }

    /// `(field, message)` pairs in form order
    pub fn messages(&self) -> Vec<(&'static str, &str)> {
        [
            ("email", self.email.as_deref()),
            ("password", self.password.as_deref()),
            ("confirm password", self.confirm_password.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, msg)| msg.map(|m| (field, m)))
        .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    /// Sign-in only checks presence of the password; the server decides the rest.
    pub fn validate(&self) -> FieldErrors {
        FieldErrors {
            email: validate_email(&self.email),
            password: validate_password(&self.password, 1),
            confirm_password: None,
        }
    }

    pub fn submit(&self) -> Result<Credentials, FieldErrors> {
        let errors = self.validate();
        if errors.has_errors() {
            return Err(errors);
        }
        Ok(Credentials::new(normalize_email(&self.email), self.password.clone()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> FieldErrors {
        FieldErrors {
            email: validate_email(&self.email),
            password: validate_password(&self.password, MIN_PASSWORD_LENGTH),
            confirm_password: validate_password_confirmation(&self.confirm_password, &self.password),
        }
    }

    pub fn submit(&self) -> Result<Credentials, FieldErrors> {
        let errors = self.validate();
        if errors.has_errors() {
            return Err(errors);
        }
        Ok(Credentials::new(normalize_email(&self.email), self.password.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email("  a@b.com  "), None);
        assert_eq!(validate_email("first.last@sub.example.org"), None);

        assert_eq!(validate_email("   ").as_deref(), Some("Email is required."));
        for bad in ["plain", "a@b", "@b.com", "a@.com", "a@b.", "a b@c.com", "a@b@c.com"] {
            assert_eq!(
                validate_email(bad).as_deref(),
                Some("Email address is invalid."),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_validate_password() {
        assert_eq!(validate_password("secret123", MIN_PASSWORD_LENGTH), None);
        assert_eq!(validate_password("  ", MIN_PASSWORD_LENGTH).as_deref(), Some("Password is required."));
        assert_eq!(
            validate_password("short", MIN_PASSWORD_LENGTH).as_deref(),
            Some("Password must be at least 8 characters.")
        );
        // Surrounding whitespace does not count toward the length
        assert!(validate_password("  1234567  ", MIN_PASSWORD_LENGTH).is_some());
    }

    #[test]
    fn test_password_length_counts_utf16_units() {
        // Four astral-plane characters are eight UTF-16 units
        assert_eq!(validate_password("😀😀😀😀", MIN_PASSWORD_LENGTH), None);
        assert!(validate_password("ééééééé", MIN_PASSWORD_LENGTH).is_some());
    }

    #[test]
    fn test_byte_order_mark_is_whitespace() {
        assert_eq!(validate_email("\u{FEFF}a@b.com\u{FEFF}"), None);
        assert_eq!(normalize_email("\u{FEFF} a@b.com"), "a@b.com");
        assert_eq!(
            validate_email("a\u{FEFF}b@c.com").as_deref(),
            Some("Email address is invalid.")
        );
        assert_eq!(
            validate_password("\u{FEFF}\u{FEFF}", MIN_PASSWORD_LENGTH).as_deref(),
            Some("Password is required.")
        );
        // U+0085 is not whitespace in form input
        assert_eq!(validate_email("a\u{0085}b@c.com"), None);
    }

    #[test]
    fn test_validate_password_confirmation() {
        assert_eq!(validate_password_confirmation("secret123", "secret123"), None);
        assert_eq!(
            validate_password_confirmation("", "secret123").as_deref(),
            Some("Confirm your password.")
        );
        assert_eq!(
            validate_password_confirmation("secret12", "secret123").as_deref(),
            Some("Passwords do not match.")
        );
    }

    #[test]
    fn test_login_form_submit_normalizes_email() {
        let form = LoginForm {
            email: " a@b.com ".to_string(),
            password: "x".to_string(),
        };
        let creds = form.submit().unwrap();
        assert_eq!(creds.email, "a@b.com");
        assert_eq!(creds.password, "x");
    }

    #[test]
    fn test_register_form_collects_all_errors() {
        let form = RegisterForm {
            email: "nope".to_string(),
            password: "short".to_string(),
            confirm_password: "other".to_string(),
        };
        let errors = form.submit().unwrap_err();
        assert!(errors.has_errors());
        assert_eq!(errors.messages().len(), 3);
        assert_eq!(errors.messages()[2], ("confirm password", "Passwords do not match."));
    }

    #[test]
    fn test_empty_field_errors() {
        assert!(!FieldErrors::default().has_errors());
    }
}
