use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;

/// Practical subset of RFC 5322, compiled once.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("Invalid email regex pattern")
});

/// Maximum email length accepted for stored identities (RFC 5321 path limit).
const MAX_EMAIL_LEN: usize = 254;

/// Validates an email address before it is admitted into the identity store.
///
/// Login submissions are never validated with this: a malformed address simply
/// fails to match any stored identity.
///
/// ```rust
/// use wicket_core::validation::validate_email;
///
/// assert!(validate_email("user@example.com").is_ok());
/// assert!(validate_email("invalid-email").is_err());
/// ```
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingField("email".to_string()));
    }

    if email.len() > MAX_EMAIL_LEN {
        return Err(ValidationError::InvalidEmail(
            "Email is too long".to_string(),
        ));
    }

    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}

/// Canonical key for per-account bookkeeping: trimmed and lowercased.
pub fn normalize_identity_key(identity: &str) -> String {
    identity.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.org").is_ok());
    }

    #[test]
    fn test_invalid_emails() {
        assert!(matches!(
            validate_email(""),
            Err(ValidationError::MissingField(_))
        ));
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("user@nodot").is_err());

        let long = format!("{}@example.com", "a".repeat(250));
        assert!(validate_email(&long).is_err());
    }

    #[test]
    fn test_normalize_identity_key() {
        assert_eq!(
            normalize_identity_key("  Agent@Example.COM "),
            "agent@example.com"
        );
    }
}
