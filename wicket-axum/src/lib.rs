//! # Wicket Axum Integration
//!
//! Axum routes for the wicket login gate: the login form, the logout
//! endpoint, a session-guarded landing page and a health check.
//!
//! | Method     | Path           | Behavior                                                  |
//! | ---------- | -------------- | --------------------------------------------------------- |
//! | GET        | `/auth/login`  | Login form, with a generic error banner on `?error=1`     |
//! | POST       | `/auth/login`  | Runs the pipeline; 303 to `/` with a cookie on success     |
//! | GET / POST | `/auth/logout` | Destroys the session and cookie, 303 to `/auth/login`      |
//! | GET        | `/`            | Signed-in landing page, guarded by [`require_session`]     |
//! | GET        | `/health`      | `{"status": "healthy", "version": ...}`                    |
//!
//! Rate-limited submissions get a 503 page with `Retry-After`. Every other
//! rejection redirects back to the form with the same generic message.
//!
//! The client address comes from [`axum::extract::ConnectInfo`], so serve
//! the router with `into_make_service_with_connect_info::<SocketAddr>()`.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::{net::SocketAddr, sync::Arc};
//! use wicket::{RecaptchaConfig, WicketBuilder};
//! use wicket_axum::{routes, CookieConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let wicket = WicketBuilder::new()
//!         .with_memory_storage(Vec::new())?
//!         .with_recaptcha(RecaptchaConfig::new("site-key", "secret"))?
//!         .build()
//!         .await?;
//!
//!     let app = routes(Arc::new(wicket))
//!         .with_cookie_config(CookieConfig::development())
//!         .with_captcha_site_key("site-key")
//!         .build();
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(
//!         listener,
//!         app.into_make_service_with_connect_info::<SocketAddr>(),
//!     )
//!     .await?;
//!     Ok(())
//! }
//! ```

mod error;
mod extractors;
mod middleware;
mod routes;
mod types;
pub mod views;

pub use error::{AuthError, LOGIN_FAILED_PATH, LOGIN_PATH, Result};
pub use extractors::{CurrentSession, SessionCookie};
pub use middleware::{AuthState, require_session};
pub use routes::create_router;
pub use types::{
    ConnectionInfo, CookieConfig, CookieSameSite, HealthResponse, LoginForm, LoginPageQuery,
};

use axum::Router;
use std::sync::Arc;
use wicket::{RepositoryProvider, Wicket};

/// Create the login routes for a [`Wicket`] instance.
pub fn routes<R>(wicket: Arc<Wicket<R>>) -> AuthRouterBuilder<R>
where
    R: RepositoryProvider + 'static,
{
    AuthRouterBuilder {
        wicket,
        cookie_config: CookieConfig::default(),
        captcha_site_key: None,
    }
}

/// Builder for configuring the login routes
pub struct AuthRouterBuilder<R: RepositoryProvider> {
    wicket: Arc<Wicket<R>>,
    cookie_config: CookieConfig,
    captcha_site_key: Option<String>,
}

impl<R: RepositoryProvider + 'static> AuthRouterBuilder<R> {
    /// Set custom cookie configuration
    pub fn with_cookie_config(mut self, config: CookieConfig) -> Self {
        self.cookie_config = config;
        self
    }

    /// Render the reCAPTCHA widget with this public site key
    pub fn with_captcha_site_key(mut self, site_key: impl Into<String>) -> Self {
        self.captcha_site_key = Some(site_key.into());
        self
    }

    pub fn build(self) -> Router {
        create_router(self.wicket, self.cookie_config, self.captcha_site_key)
    }
}

impl<R: RepositoryProvider + 'static> From<AuthRouterBuilder<R>> for Router {
    fn from(builder: AuthRouterBuilder<R>) -> Self {
        builder.build()
    }
}
