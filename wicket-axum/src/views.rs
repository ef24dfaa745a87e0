//! Server-rendered pages.
//!
//! Every rejected sign-in shows [`GENERIC_FAILURE_MESSAGE`], whatever the
//! gate that rejected it, so the page never reveals whether an account exists
//! or an address is being throttled.

use askama::Template;
use axum::response::Html;
use wicket::{Role, SessionRecord};

use crate::error::{AuthError, Result};

pub const GENERIC_FAILURE_MESSAGE: &str =
    "We could not sign you in. Check your details and try again in a minute.";

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate<'a> {
    pub site_key: Option<&'a str>,
    pub show_error: bool,
    pub message: &'a str,
}

impl<'a> LoginTemplate<'a> {
    pub fn new(site_key: Option<&'a str>, show_error: bool) -> Self {
        Self {
            site_key,
            show_error,
            message: GENERIC_FAILURE_MESSAGE,
        }
    }
}

#[derive(Template)]
#[template(path = "rate_limited.html")]
pub struct RateLimitedTemplate<'a> {
    pub message: &'a str,
}

impl Default for RateLimitedTemplate<'_> {
    fn default() -> Self {
        Self {
            message: GENERIC_FAILURE_MESSAGE,
        }
    }
}

#[derive(Template, Default)]
#[template(path = "error.html")]
pub struct ErrorTemplate {}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate<'a> {
    pub email: &'a str,
    pub role: Role,
}

impl<'a> From<&'a SessionRecord> for HomeTemplate<'a> {
    fn from(session: &'a SessionRecord) -> Self {
        Self {
            email: &session.email,
            role: session.role,
        }
    }
}

/// Render a page for a handler, surfacing template failures as a 500.
pub(crate) fn render<T: Template>(template: &T) -> Result<Html<String>> {
    template
        .render()
        .map(Html)
        .map_err(|e| AuthError::InternalError(format!("Failed to render page: {e}")))
}

/// Render an error page, degrading to `fallback` text if the template fails.
pub(crate) fn render_or(template: &impl Template, fallback: &'static str) -> Html<String> {
    match template.render() {
        Ok(html) => Html(html),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render error page");
            Html(fallback.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wicket::Identity;

    #[test]
    fn test_login_page_renders_captcha_and_banner() {
        let page = LoginTemplate::new(Some("site-key-123"), true).render().unwrap();
        assert!(page.contains("data-sitekey=\"site-key-123\""));
        assert!(page.contains(GENERIC_FAILURE_MESSAGE));

        let page = LoginTemplate::new(None, false).render().unwrap();
        assert!(!page.contains("g-recaptcha"));
        assert!(!page.contains(GENERIC_FAILURE_MESSAGE));
    }

    #[test]
    fn test_site_key_is_escaped() {
        let page = LoginTemplate::new(Some("\"><script>"), false).render().unwrap();
        assert!(!page.contains("\"><script>"));
        assert!(page.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_rate_limited_page_uses_generic_message() {
        let page = RateLimitedTemplate::default().render().unwrap();
        assert!(page.contains(GENERIC_FAILURE_MESSAGE));
    }

    #[test]
    fn test_home_page_escapes_email() {
        let identity = Identity::builder()
            .email("<b>agent</b>@example.com")
            .password("pw")
            .role(Role::Admin)
            .build()
            .unwrap();
        let session = SessionRecord::for_identity(&identity);

        let page = HomeTemplate::from(&session).render().unwrap();
        assert!(page.contains("&lt;b&gt;agent&lt;/b&gt;@example.com"));
        assert!(page.contains("(admin)"));
    }

    #[test]
    fn test_render_wraps_html() {
        let Html(page) = render(&ErrorTemplate::default()).unwrap();
        assert!(page.contains("Something went wrong"));
    }
}
