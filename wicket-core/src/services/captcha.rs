//! CAPTCHA verification.
//!
//! The login pipeline only consumes a boolean. Anything other than an
//! explicit `success: true` from the verification service is a failure.

use std::{fmt, net::IpAddr, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::CaptchaError;

/// Verifies the CAPTCHA response submitted with a login form.
#[async_trait]
pub trait CaptchaVerifier: Send + Sync + 'static {
    /// Returns `Ok(true)` only when the service positively confirmed `token`.
    async fn verify(&self, token: &str, remote_ip: Option<IpAddr>) -> Result<bool, CaptchaError>;
}

pub const DEFAULT_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

#[derive(Clone)]
pub struct RecaptchaConfig {
    /// Public key rendered into the login form widget
    pub site_key: String,
    pub secret: String,
    pub verify_url: String,
    /// Upper bound on the whole verification request
    pub timeout: Duration,
}

impl RecaptchaConfig {
    pub fn new(site_key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            site_key: site_key.into(),
            secret: secret.into(),
            verify_url: DEFAULT_VERIFY_URL.to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_verify_url(mut self, url: impl Into<String>) -> Self {
        self.verify_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for RecaptchaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecaptchaConfig")
            .field("site_key", &self.site_key)
            .field("secret", &"<redacted>")
            .field("verify_url", &self.verify_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Google reCAPTCHA `siteverify` client.
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    config: RecaptchaConfig,
}

impl RecaptchaVerifier {
    pub fn new(config: RecaptchaConfig) -> Result<Self, CaptchaError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CaptchaError::Upstream(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn site_key(&self) -> &str {
        &self.config.site_key
    }
}

fn classify(error: reqwest::Error) -> CaptchaError {
    if error.is_timeout() {
        CaptchaError::Timeout
    } else if error.is_decode() {
        CaptchaError::MalformedResponse(error.to_string())
    } else {
        CaptchaError::Upstream(error.to_string())
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(&self, token: &str, remote_ip: Option<IpAddr>) -> Result<bool, CaptchaError> {
        if token.trim().is_empty() {
            return Ok(false);
        }

        let remote_ip = remote_ip.map(|ip| ip.to_canonical().to_string());
        let mut form: Vec<(&str, &str)> = vec![
            ("secret", self.config.secret.as_str()),
            ("response", token),
        ];
        if let Some(ip) = remote_ip.as_deref() {
            form.push(("remoteip", ip));
        }

        let response = self
            .client
            .post(&self.config.verify_url)
            .form(&form)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptchaError::Upstream(format!(
                "verification service returned {status}"
            )));
        }

        let body: SiteVerifyResponse = response.json().await.map_err(classify)?;
        if !body.success {
            tracing::debug!(error_codes = ?body.error_codes, "CAPTCHA token rejected");
        }

        Ok(body.success)
    }
}
