use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use wicket::{RepositoryProvider, Wicket};

use crate::{error::AuthError, extractors::SessionCookie, types::CookieConfig};

pub struct AuthState<R: RepositoryProvider> {
    pub wicket: Arc<Wicket<R>>,
    pub cookie_config: Arc<CookieConfig>,
    pub captcha_site_key: Option<Arc<str>>,
}

impl<R: RepositoryProvider> Clone for AuthState<R> {
    fn clone(&self) -> Self {
        Self {
            wicket: self.wicket.clone(),
            cookie_config: self.cookie_config.clone(),
            captcha_site_key: self.captcha_site_key.clone(),
        }
    }
}

/// Session guard for protected routes.
///
/// Resolves the session cookie, refreshing the idle timer, and makes the
/// [`wicket::SessionRecord`] available to handlers. Anonymous or expired
/// callers are redirected to the login page and any stale cookie is removed.
pub async fn require_session<R>(
    State(state): State<AuthState<R>>,
    SessionCookie(token): SessionCookie,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response
where
    R: RepositoryProvider,
{
    let Some(token) = token else {
        return AuthError::Unauthorized.into_response();
    };

    match state.wicket.resolve_session(&token).await {
        Ok(Some(session)) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Ok(None) => {
            tracing::debug!("Rejected unknown or expired session");
            let jar = jar.remove(state.cookie_config.removal_cookie());
            (jar, AuthError::Unauthorized).into_response()
        }
        Err(e) => AuthError::InternalError(e.to_string()).into_response(),
    }
}
