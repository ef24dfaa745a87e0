//! Builder pattern for constructing Wicket instances
//!
//! This module provides a type-safe builder for creating [`Wicket`] instances.
//! Storage must be configured before `build` is available.
//!
//! # Example
//!
//! ```rust,no_run
//! use wicket::{RecaptchaConfig, WicketBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let wicket = WicketBuilder::new()
//!         .with_memory_storage(Vec::new())?
//!         .with_recaptcha(RecaptchaConfig::new("site-key", "secret"))?
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use wicket_core::{
    CaptchaVerifier, EventBus, EventHandler, Identity, MemoryRepositoryProvider,
    RecaptchaVerifier, RepositoryProvider, TracingAuditHandler,
};

use crate::{
    Wicket,
    config::{AdmissionConfig, LockoutConfig, RecaptchaConfig, SessionConfig, WicketConfig},
};

/// Errors that can occur when building a Wicket instance.
#[derive(Debug, thiserror::Error)]
pub enum WicketBuilderError {
    /// Storage could not be set up or failed its health check
    #[error("Storage setup failed: {0}")]
    Storage(String),

    /// Failed to construct the CAPTCHA client
    #[error("CAPTCHA configuration failed: {0}")]
    Captcha(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Marker type indicating no storage has been configured yet.
pub struct NoStorage;

/// Marker type indicating storage has been configured.
pub struct WithStorage<R: RepositoryProvider> {
    repositories: Arc<R>,
}

/// A type-safe builder for constructing [`Wicket`] instances.
///
/// # Type States
///
/// - [`NoStorage`]: Initial state, storage must be configured
/// - [`WithStorage<R>`]: Storage configured, ready to build
pub struct WicketBuilder<Storage> {
    storage: Storage,
    config: WicketConfig,
    captcha: Option<Arc<dyn CaptchaVerifier>>,
    handlers: Vec<Arc<dyn EventHandler>>,
    audit_logging: bool,
}

impl Default for WicketBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl WicketBuilder<NoStorage> {
    /// Create a new builder with default configuration and audit logging on.
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            config: WicketConfig::default(),
            captcha: None,
            handlers: Vec::new(),
            audit_logging: true,
        }
    }

    /// Use a custom repository provider.
    pub fn with_repositories<R: RepositoryProvider>(
        self,
        repositories: Arc<R>,
    ) -> WicketBuilder<WithStorage<R>> {
        WicketBuilder {
            storage: WithStorage { repositories },
            config: self.config,
            captcha: self.captcha,
            handlers: self.handlers,
            audit_logging: self.audit_logging,
        }
    }

    /// Keep identities and sessions in process memory, seeded with `identities`.
    pub fn with_memory_storage(
        self,
        identities: impl IntoIterator<Item = Identity>,
    ) -> Result<WicketBuilder<WithStorage<MemoryRepositoryProvider>>, WicketBuilderError> {
        let provider = MemoryRepositoryProvider::with_identities(identities)
            .map_err(|e| WicketBuilderError::Storage(e.to_string()))?;
        Ok(self.with_repositories(Arc::new(provider)))
    }
}

impl<Storage> WicketBuilder<Storage> {
    pub fn with_config(mut self, config: WicketConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_admission_config(mut self, config: AdmissionConfig) -> Self {
        self.config.admission = config;
        self
    }

    pub fn with_lockout_config(mut self, config: LockoutConfig) -> Self {
        self.config.lockout = config;
        self
    }

    pub fn with_session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Use a custom CAPTCHA verifier.
    pub fn with_captcha(mut self, captcha: Arc<dyn CaptchaVerifier>) -> Self {
        self.captcha = Some(captcha);
        self
    }

    /// Verify CAPTCHA responses against Google reCAPTCHA.
    pub fn with_recaptcha(self, config: RecaptchaConfig) -> Result<Self, WicketBuilderError> {
        let verifier =
            RecaptchaVerifier::new(config).map_err(|e| WicketBuilderError::Captcha(e.to_string()))?;
        Ok(self.with_captcha(Arc::new(verifier)))
    }

    /// Register an additional audit event handler.
    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Toggle the built-in handler that writes audit events to `tracing`.
    pub fn with_audit_logging(mut self, enabled: bool) -> Self {
        self.audit_logging = enabled;
        self
    }
}

impl<R: RepositoryProvider> WicketBuilder<WithStorage<R>> {
    /// Build the [`Wicket`] instance.
    ///
    /// Fails if no CAPTCHA verifier was configured or storage is unhealthy.
    pub async fn build(self) -> Result<Wicket<R>, WicketBuilderError> {
        let captcha = self.captcha.ok_or_else(|| {
            WicketBuilderError::InvalidConfiguration("no CAPTCHA verifier configured".to_string())
        })?;

        if self.config.lockout.enabled && self.config.lockout.max_failed_attempts == 0 {
            return Err(WicketBuilderError::InvalidConfiguration(
                "max_failed_attempts must be at least 1".to_string(),
            ));
        }

        let repositories = self.storage.repositories;
        repositories
            .health_check()
            .await
            .map_err(|e| WicketBuilderError::Storage(e.to_string()))?;

        let events = EventBus::default();
        if self.audit_logging {
            events.register(Arc::new(TracingAuditHandler)).await;
        }
        for handler in self.handlers {
            events.register(handler).await;
        }

        tracing::debug!(
            permit_limit = self.config.admission.permit_limit,
            window_secs = self.config.admission.window.as_secs(),
            lockout_enabled = self.config.lockout.enabled,
            "Building wicket"
        );

        Ok(Wicket::with_config(repositories, captcha, self.config, events))
    }
}
