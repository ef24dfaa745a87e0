//! # Wicket
//!
//! Wicket is the gate in front of a web application's sign-in form. Every
//! submission passes, in order, through:
//!
//! - a CAPTCHA check
//! - a fixed-window admission limit per client IP (2 attempts per minute)
//! - an account lockout after repeated failures (5 failures, 30 seconds)
//! - credential verification against the identity store
//! - a session hand-off that never reuses a pre-existing session token
//!
//! Rejections at any stage surface as a [`wicket_core::Error`] whose
//! [`rejection_reason`](wicket_core::Error::rejection_reason) names the gate.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wicket::{Identity, LoginAttempt, RecaptchaConfig, Role, WicketBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let admin = Identity::builder()
//!         .email("admin@example.com")
//!         .password("change-me")
//!         .role(Role::Admin)
//!         .build()?;
//!
//!     let wicket = WicketBuilder::new()
//!         .with_memory_storage([admin])?
//!         .with_recaptcha(RecaptchaConfig::new("site-key", "secret"))?
//!         .build()
//!         .await?;
//!
//!     let attempt = LoginAttempt {
//!         email: "admin@example.com".into(),
//!         password: "change-me".into(),
//!         captcha_token: "token-from-the-form".into(),
//!         client_ip: Some("10.0.0.1".parse()?),
//!     };
//!     let session = wicket.login(attempt, None).await?;
//!     println!("signed in as {} ({})", session.email(), session.role());
//!
//!     Ok(())
//! }
//! ```
use std::sync::Arc;

use wicket_core::repositories::{IdentityRepositoryAdapter, SessionRepositoryAdapter};

pub mod builder;
pub mod config;

pub use builder::{NoStorage, WicketBuilder, WicketBuilderError, WithStorage};
pub use config::WicketConfig;

// Re-export core types
pub use wicket_core::{
    AdmissionConfig, AdmissionDecision, AttemptLedger, AuthError, CaptchaError, CaptchaVerifier,
    Error, Event, EventBus, EventHandler, Identity, IdentityId, LockoutConfig, LoginAttempt,
    LoginPipeline, LoginStage, MemoryRepositoryProvider, RecaptchaConfig, RecaptchaVerifier,
    RepositoryProvider, Role, SessionConfig, SessionHandle, SessionRecord, SessionToken,
    StorageError, TracingAuditHandler, WindowedAdmission, partition_key,
};

type Pipeline<R> = LoginPipeline<IdentityRepositoryAdapter<R>, SessionRepositoryAdapter<R>>;

/// The main coordinator of the login gate.
///
/// `Wicket` owns the shared admission windows, the attempt ledger and the
/// session issuer, and wires them to a repository provider.
///
/// Cloning is cheap; clones share all state.
pub struct Wicket<R: RepositoryProvider> {
    repositories: Arc<R>,
    pipeline: Arc<Pipeline<R>>,
    events: EventBus,
    config: WicketConfig,
}

impl<R: RepositoryProvider> Clone for Wicket<R> {
    fn clone(&self) -> Self {
        Self {
            repositories: self.repositories.clone(),
            pipeline: self.pipeline.clone(),
            events: self.events.clone(),
            config: self.config,
        }
    }
}

impl<R: RepositoryProvider> Wicket<R> {
    /// Create a Wicket instance with default configuration and no event handlers.
    pub fn new(repositories: Arc<R>, captcha: Arc<dyn CaptchaVerifier>) -> Self {
        Self::with_config(
            repositories,
            captcha,
            WicketConfig::default(),
            EventBus::default(),
        )
    }

    pub fn with_config(
        repositories: Arc<R>,
        captcha: Arc<dyn CaptchaVerifier>,
        config: WicketConfig,
        events: EventBus,
    ) -> Self {
        let identity_repo = Arc::new(IdentityRepositoryAdapter::new(repositories.clone()));
        let session_repo = Arc::new(SessionRepositoryAdapter::new(repositories.clone()));

        let pipeline = LoginPipeline::new(
            captcha,
            WindowedAdmission::new(config.admission),
            AttemptLedger::new(config.lockout),
            Arc::new(wicket_core::CredentialVerifier::new(identity_repo)),
            Arc::new(wicket_core::SessionIssuer::new(session_repo, config.session)),
            events.clone(),
        );

        Self {
            repositories,
            pipeline: Arc::new(pipeline),
            events,
            config,
        }
    }

    pub fn repositories(&self) -> &Arc<R> {
        &self.repositories
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &WicketConfig {
        &self.config
    }

    pub fn admission(&self) -> &WindowedAdmission {
        self.pipeline.admission()
    }

    pub fn ledger(&self) -> &AttemptLedger {
        self.pipeline.ledger()
    }

    /// Run a login attempt through every gate.
    ///
    /// `current_session` is the session token the caller presented, if any; it
    /// is destroyed before the new session is written.
    pub async fn login(
        &self,
        attempt: LoginAttempt,
        current_session: Option<&SessionToken>,
    ) -> Result<SessionHandle, Error> {
        self.pipeline.login(attempt, current_session).await
    }

    /// Destroy the caller's session. Safe to call repeatedly.
    pub async fn logout(&self, current_session: Option<&SessionToken>) -> Result<(), Error> {
        self.pipeline.logout(current_session).await
    }

    /// Resolve a presented session token, refreshing its idle timer.
    pub async fn resolve_session(&self, token: &SessionToken) -> Result<Option<SessionRecord>, Error> {
        self.pipeline.sessions().resolve(token).await
    }

    pub async fn health_check(&self) -> Result<(), Error> {
        self.repositories.health_check().await
    }

    /// Start the periodic cleanup of admission windows, ledger records and
    /// idle sessions. All tasks stop when `shutdown` changes.
    pub fn start_background_tasks(
        &self,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> Vec<tokio::task::JoinHandle<()>> {
        vec![
            self.pipeline.admission().start_cleanup_task(shutdown.clone()),
            self.pipeline.ledger().start_cleanup_task(shutdown.clone()),
            self.pipeline.sessions().start_cleanup_task(shutdown),
        ]
    }
}
