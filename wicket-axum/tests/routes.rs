use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response, StatusCode, header},
};
use tower::ServiceExt;
use wicket::{
    AdmissionConfig, CaptchaError, CaptchaVerifier, Identity, MemoryRepositoryProvider, Role,
    Wicket, WicketBuilder,
};
use wicket_axum::{CookieConfig, LOGIN_FAILED_PATH, routes, views::GENERIC_FAILURE_MESSAGE};

const PASSWORD: &str = "Correct-Horse-1";

/// Accepts exactly the token "valid".
struct StubCaptcha;

#[async_trait]
impl CaptchaVerifier for StubCaptcha {
    async fn verify(&self, token: &str, _ip: Option<IpAddr>) -> Result<bool, CaptchaError> {
        Ok(token == "valid")
    }
}

async fn app(admission: AdmissionConfig) -> (Router, Arc<Wicket<MemoryRepositoryProvider>>) {
    let identities = [
        ("alice@example.com", Role::User),
        ("bob@example.com", Role::Admin),
    ]
    .map(|(email, role)| {
        Identity::builder()
            .email(email)
            .password(PASSWORD)
            .role(role)
            .build()
            .unwrap()
    });

    let wicket = Arc::new(
        WicketBuilder::new()
            .with_memory_storage(identities)
            .unwrap()
            .with_captcha(Arc::new(StubCaptcha))
            .with_admission_config(admission)
            .build()
            .await
            .unwrap(),
    );

    let router = routes(wicket.clone())
        .with_cookie_config(CookieConfig::default())
        .with_captcha_site_key("test-site-key")
        .build();

    (router, wicket)
}

fn with_peer(mut request: Request<Body>, ip: [u8; 4]) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
    request
}

fn login_request(
    email: &str,
    password: &str,
    captcha: &str,
    ip: [u8; 4],
    cookie: Option<&str>,
) -> Request<Body> {
    let body = format!(
        "email={}&password={password}&g-recaptcha-response={captcha}",
        email.replace('@', "%40")
    );
    let mut builder = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    with_peer(builder.body(Body::from(body)).unwrap(), ip)
}

fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    with_peer(builder.body(Body::empty()).unwrap(), [127, 0, 0, 1])
}

fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

fn set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("ticket_session="))
        .map(str::to_string)
}

/// `name=value` part of the session cookie, ready for a `Cookie` header.
fn session_pair(response: &Response<Body>) -> String {
    let cookie = set_cookie(response).expect("session cookie");
    cookie.split(';').next().unwrap().to_string()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn login_page_renders_form() {
    let (app, _) = app(AdmissionConfig::default()).await;

    let response = app.oneshot(get_request("/auth/login", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("name=\"email\""));
    assert!(html.contains("name=\"password\""));
    assert!(html.contains("data-sitekey=\"test-site-key\""));
    assert!(!html.contains(GENERIC_FAILURE_MESSAGE));
}

#[tokio::test]
async fn login_page_shows_generic_error() {
    let (app, _) = app(AdmissionConfig::default()).await;

    let response = app
        .oneshot(get_request(LOGIN_FAILED_PATH, None))
        .await
        .unwrap();
    assert!(body_text(response).await.contains(GENERIC_FAILURE_MESSAGE));
}

#[tokio::test]
async fn successful_login_sets_hardened_cookie() {
    let (app, _) = app(AdmissionConfig::default()).await;

    let response = app
        .clone()
        .oneshot(login_request("alice@example.com", PASSWORD, "valid", [10, 0, 0, 1], None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let cookie = set_cookie(&response).unwrap();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Path=/"));

    let response = app
        .oneshot(get_request("/", Some(&session_pair(&response))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("alice@example.com"));
    assert!(html.contains("user"));
}

#[tokio::test]
async fn protected_page_redirects_anonymous_callers() {
    let (app, _) = app(AdmissionConfig::default()).await;

    let response = app.clone().oneshot(get_request("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");

    let response = app
        .oneshot(get_request("/", Some("ticket_session=forged-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(set_cookie(&response).unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn failed_captcha_and_bad_password_look_the_same() {
    let (app, _) = app(AdmissionConfig::disabled()).await;

    let captcha = app
        .clone()
        .oneshot(login_request("alice@example.com", PASSWORD, "nope", [10, 0, 0, 1], None))
        .await
        .unwrap();
    let password = app
        .clone()
        .oneshot(login_request("alice@example.com", "wrong", "valid", [10, 0, 0, 1], None))
        .await
        .unwrap();
    let unknown = app
        .oneshot(login_request("nobody@example.com", "wrong", "valid", [10, 0, 0, 1], None))
        .await
        .unwrap();

    for response in [&captcha, &password, &unknown] {
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(response), LOGIN_FAILED_PATH);
        assert!(set_cookie(response).is_none());
    }
}

#[tokio::test]
async fn third_attempt_from_same_ip_gets_503() {
    let (app, wicket) = app(AdmissionConfig::default()).await;

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(login_request("alice@example.com", "wrong", "valid", [10, 0, 0, 1], None))
            .await
            .unwrap();
        assert_eq!(location(&response), LOGIN_FAILED_PATH);
    }

    let response = app
        .clone()
        .oneshot(login_request("alice@example.com", PASSWORD, "valid", [10, 0, 0, 1], None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let retry_after: u64 = response.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));
    assert!(body_text(response).await.contains(GENERIC_FAILURE_MESSAGE));

    // The rejected attempt never reached the credential check.
    assert_eq!(wicket.ledger().failure_count("alice@example.com"), 2);

    // A different address still gets through.
    let response = app
        .oneshot(login_request("alice@example.com", PASSWORD, "valid", [10, 0, 0, 2], None))
        .await
        .unwrap();
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn logging_in_again_invalidates_the_previous_cookie() {
    let (app, _) = app(AdmissionConfig::disabled()).await;

    let first = app
        .clone()
        .oneshot(login_request("alice@example.com", PASSWORD, "valid", [10, 0, 0, 1], None))
        .await
        .unwrap();
    let alice = session_pair(&first);

    let second = app
        .clone()
        .oneshot(login_request("bob@example.com", PASSWORD, "valid", [10, 0, 0, 1], Some(&alice)))
        .await
        .unwrap();
    let bob = session_pair(&second);
    assert_ne!(alice, bob);

    let stale = app.clone().oneshot(get_request("/", Some(&alice))).await.unwrap();
    assert_eq!(stale.status(), StatusCode::SEE_OTHER);

    let current = app.oneshot(get_request("/", Some(&bob))).await.unwrap();
    assert_eq!(current.status(), StatusCode::OK);
    let html = body_text(current).await;
    assert!(html.contains("bob@example.com"));
    assert!(!html.contains("alice@example.com"));
}

#[tokio::test]
async fn logout_twice_is_harmless() {
    let (app, wicket) = app(AdmissionConfig::disabled()).await;

    let login = app
        .clone()
        .oneshot(login_request("alice@example.com", PASSWORD, "valid", [10, 0, 0, 1], None))
        .await
        .unwrap();
    let cookie = session_pair(&login);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(get_request("/auth/logout", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/auth/login");
        assert!(set_cookie(&response).unwrap().contains("Max-Age=0"));
    }

    assert!(wicket.repositories().sessions().is_empty());
    let response = app.oneshot(get_request("/", Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn health_reports_version() {
    let (app, _) = app(AdmissionConfig::default()).await;

    let response = app.oneshot(get_request("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}
