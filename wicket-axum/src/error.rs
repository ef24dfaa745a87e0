use std::time::Duration;

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::views;

pub const LOGIN_PATH: &str = "/auth/login";
pub const LOGIN_FAILED_PATH: &str = "/auth/login?error=1";

#[derive(Debug, Error)]
pub enum AuthError {
    /// CAPTCHA, lockout or credential failure. Deliberately carries no detail.
    #[error("Login rejected")]
    LoginRejected,

    #[error("Too many login attempts")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<wicket::Error> for AuthError {
    fn from(err: wicket::Error) -> Self {
        match err.rejection_reason() {
            Some("rate_limited") => AuthError::RateLimited {
                retry_after: err.retry_after(),
            },
            Some(_) => AuthError::LoginRejected,
            None => AuthError::InternalError(err.to_string()),
        }
    }
}

/// `Retry-After` in whole seconds, rounded up and never zero.
fn retry_after_header(retry_after: Duration) -> HeaderValue {
    let mut secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 || secs == 0 {
        secs += 1;
    }
    HeaderValue::from(secs)
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::LoginRejected => Redirect::to(LOGIN_FAILED_PATH).into_response(),
            AuthError::Unauthorized => Redirect::to(LOGIN_PATH).into_response(),
            AuthError::RateLimited { retry_after } => {
                let mut response = (
                    StatusCode::SERVICE_UNAVAILABLE,
                    views::render_or(
                        &views::RateLimitedTemplate::default(),
                        views::GENERIC_FAILURE_MESSAGE,
                    ),
                )
                    .into_response();
                if let Some(retry_after) = retry_after {
                    response
                        .headers_mut()
                        .insert(header::RETRY_AFTER, retry_after_header(retry_after));
                }
                response
            }
            AuthError::InternalError(message) => {
                tracing::error!(error = %message, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    views::render_or(
                        &views::ErrorTemplate::default(),
                        "Internal server error",
                    ),
                )
                    .into_response()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
