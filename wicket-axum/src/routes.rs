use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect},
    routing::get,
};
use axum_extra::extract::CookieJar;
use wicket::{LoginAttempt, RepositoryProvider, Wicket};

use crate::{
    error::{AuthError, LOGIN_PATH, Result},
    extractors::{CurrentSession, SessionCookie},
    middleware::{AuthState, require_session},
    types::*,
    views,
};

pub fn create_router<R>(
    wicket: Arc<Wicket<R>>,
    cookie_config: CookieConfig,
    captcha_site_key: Option<String>,
) -> Router
where
    R: RepositoryProvider + 'static,
{
    let state = AuthState {
        wicket,
        cookie_config: Arc::new(cookie_config),
        captcha_site_key: captcha_site_key.map(Arc::from),
    };

    let protected_routes: Router<AuthState<R>> = Router::new()
        .route("/", get(home_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_session::<R>,
        ));

    let public_routes: Router<AuthState<R>> = Router::new()
        .route("/health", get(health_handler))
        .route("/auth/login", get(login_page_handler).post(login_handler))
        .route("/auth/logout", get(logout_handler).post(logout_handler));

    protected_routes.merge(public_routes).with_state(state)
}

async fn health_handler<R>(State(state): State<AuthState<R>>) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state
        .wicket
        .health_check()
        .await
        .map_err(|e| AuthError::InternalError(e.to_string()))?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

async fn login_page_handler<R>(
    State(state): State<AuthState<R>>,
    Query(query): Query<LoginPageQuery>,
) -> Result<Html<String>>
where
    R: RepositoryProvider,
{
    views::render(&views::LoginTemplate::new(
        state.captcha_site_key.as_deref(),
        query.error.is_some(),
    ))
}

async fn login_handler<R>(
    State(state): State<AuthState<R>>,
    connection_info: ConnectionInfo,
    SessionCookie(current_session): SessionCookie,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    tracing::debug!(
        email = %form.email,
        ip = ?connection_info.ip,
        user_agent = ?connection_info.user_agent,
        "Login form submitted"
    );

    let attempt = LoginAttempt {
        email: form.email,
        password: form.password,
        captcha_token: form.captcha_token,
        client_ip: connection_info.ip,
    };

    let session = state
        .wicket
        .login(attempt, current_session.as_ref())
        .await?;

    // Same name and path, so this replaces whatever cookie the browser held.
    let jar = jar.add(state.cookie_config.session_cookie(session.token()));

    Ok((jar, Redirect::to("/")))
}

async fn logout_handler<R>(
    State(state): State<AuthState<R>>,
    SessionCookie(current_session): SessionCookie,
    jar: CookieJar,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state
        .wicket
        .logout(current_session.as_ref())
        .await
        .map_err(|e| AuthError::InternalError(e.to_string()))?;

    let jar = jar.remove(state.cookie_config.removal_cookie());

    Ok((jar, Redirect::to(LOGIN_PATH)))
}

async fn home_handler(CurrentSession(session): CurrentSession) -> Result<Html<String>> {
    views::render(&views::HomeTemplate::from(&session))
}
