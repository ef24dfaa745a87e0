use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Captcha error: {0}")]
    Captcha(#[from] CaptchaError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),
}

/// Terminal rejections produced by the login gates.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("CAPTCHA verification failed")]
    CaptchaFailed,

    #[error("Too many login attempts")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Account temporarily locked")]
    AccountLocked,

    #[error("Invalid credentials")]
    InvalidCredentials,
}

/// Failures talking to the CAPTCHA verification service.
///
/// None of these ever count as a successful verification.
#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("Verification service unreachable: {0}")]
    Upstream(String),

    #[error("Verification service timed out")]
    Timeout,

    #[error("Malformed verification response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    /// Duplicate identity email or session token collision
    #[error("Constraint violation: {0}")]
    Constraint(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Event handler error: {0}")]
    HandlerError(String),
}

impl Error {
    /// Short machine-readable reason for a gate rejection.
    ///
    /// Returns `None` for errors that are not login rejections (storage and
    /// validation failures), which callers surface as server errors.
    pub fn rejection_reason(&self) -> Option<&'static str> {
        match self {
            Error::Auth(AuthError::CaptchaFailed) | Error::Captcha(_) => Some("captcha"),
            Error::Auth(AuthError::RateLimited { .. }) => Some("rate_limited"),
            Error::Auth(AuthError::AccountLocked) => Some("locked"),
            Error::Auth(AuthError::InvalidCredentials) => Some("bad_credentials"),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::Auth(AuthError::RateLimited { .. }))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    /// How long the caller should wait before retrying, if the gate knows.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::Auth(AuthError::RateLimited { retry_after }) => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let auth_error = Error::Auth(AuthError::InvalidCredentials);
        assert_eq!(
            auth_error.to_string(),
            "Authentication error: Invalid credentials"
        );

        let validation_error =
            Error::Validation(ValidationError::InvalidEmail("test@".to_string()));
        assert_eq!(
            validation_error.to_string(),
            "Validation error: Invalid email format: test@"
        );

        let storage_error = Error::Storage(StorageError::Constraint("duplicate".to_string()));
        assert_eq!(
            storage_error.to_string(),
            "Storage error: Constraint violation: duplicate"
        );
    }

    #[test]
    fn test_rejection_reasons() {
        assert_eq!(
            Error::Auth(AuthError::CaptchaFailed).rejection_reason(),
            Some("captcha")
        );
        assert_eq!(
            Error::Captcha(CaptchaError::Timeout).rejection_reason(),
            Some("captcha")
        );
        assert_eq!(
            Error::Auth(AuthError::RateLimited { retry_after: None }).rejection_reason(),
            Some("rate_limited")
        );
        assert_eq!(
            Error::Auth(AuthError::AccountLocked).rejection_reason(),
            Some("locked")
        );
        assert_eq!(
            Error::Auth(AuthError::InvalidCredentials).rejection_reason(),
            Some("bad_credentials")
        );
        assert_eq!(
            Error::Storage(StorageError::Constraint("duplicate".to_string())).rejection_reason(),
            None
        );
    }

    #[test]
    fn test_retry_after_only_on_rate_limit() {
        let limited = Error::Auth(AuthError::RateLimited {
            retry_after: Some(Duration::from_secs(42)),
        });
        assert!(limited.is_rate_limited());
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(42)));

        let bad = Error::Auth(AuthError::InvalidCredentials);
        assert!(!bad.is_rate_limited());
        assert_eq!(bad.retry_after(), None);
    }

    #[test]
    fn test_error_from_conversions() {
        let error: Error = AuthError::InvalidCredentials.into();
        assert!(matches!(error, Error::Auth(AuthError::InvalidCredentials)));

        let error: Error = StorageError::Constraint("duplicate email".to_string()).into();
        assert!(error.is_storage_error());
        assert!(error.rejection_reason().is_none());
    }
}
