use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{IdentityId, Role, error::EventError};

/// Audit events emitted by the login pipeline
///
/// Every admission decision and every terminal login outcome produces exactly
/// one event. Events never carry passwords or session tokens.
#[derive(Debug, Clone)]
pub enum Event {
    /// A request was let through the per-IP admission gate.
    AdmissionGranted {
        partition_key: String,
        /// Permits left in the current window after this one
        remaining: u32,
        timestamp: DateTime<Utc>,
    },

    /// A request was turned away by the per-IP admission gate.
    AdmissionRejected {
        partition_key: String,
        retry_after: Option<Duration>,
        timestamp: DateTime<Utc>,
    },

    /// The CAPTCHA response was missing, invalid or could not be verified.
    CaptchaRejected {
        ip_address: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Credentials did not match a stored identity.
    LoginFailed {
        email: String,
        /// Failures recorded in the ledger for this account, including this one
        failed_attempts: u32,
        ip_address: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A failure pushed the account over the lockout threshold.
    ///
    /// This is a security-critical event that should trigger alerts.
    AccountLocked {
        email: String,
        failed_attempts: u32,
        ip_address: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// An attempt arrived for an account that is currently locked.
    LoginBlocked {
        email: String,
        ip_address: Option<String>,
        timestamp: DateTime<Utc>,
    },

    SessionCreated {
        identity_id: IdentityId,
        email: String,
        role: Role,
        ip_address: Option<String>,
        timestamp: DateTime<Utc>,
    },

    SessionDestroyed {
        identity_id: IdentityId,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// Stable, lowercase name of the event kind for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::AdmissionGranted { .. } => "admission_granted",
            Event::AdmissionRejected { .. } => "admission_rejected",
            Event::CaptchaRejected { .. } => "captcha_rejected",
            Event::LoginFailed { .. } => "login_failed",
            Event::AccountLocked { .. } => "account_locked",
            Event::LoginBlocked { .. } => "login_blocked",
            Event::SessionCreated { .. } => "session_created",
            Event::SessionDestroyed { .. } => "session_destroyed",
        }
    }
}

/// A trait for handling events emitted by the event bus
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle_event(&self, event: &Event) -> Result<(), EventError>;
}

/// Event bus that fans events out to every registered handler
#[derive(Clone)]
pub struct EventBus {
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register an event handler with the event bus
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().await.push(handler);
    }

    /// Emit an event to all registered handlers, stopping at the first error
    pub async fn emit(&self, event: &Event) -> Result<(), EventError> {
        for handler in self.handlers.read().await.iter() {
            handler.handle_event(event).await?;
        }

        Ok(())
    }

    /// Emit an event, logging instead of returning handler failures.
    ///
    /// Auditing must never change the outcome of a login.
    pub async fn publish(&self, event: Event) {
        if let Err(e) = self.emit(&event).await {
            tracing::warn!(error = %e, kind = event.kind(), "Audit event handler failed");
        }
    }
}

/// Writes every event to the `wicket::audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditHandler;

#[async_trait]
impl EventHandler for TracingAuditHandler {
    async fn handle_event(&self, event: &Event) -> Result<(), EventError> {
        match event {
            Event::AdmissionGranted {
                partition_key,
                remaining,
                ..
            } => {
                tracing::info!(target: "wicket::audit", partition_key = %partition_key, remaining, "admission granted");
            }
            Event::AdmissionRejected {
                partition_key,
                retry_after,
                ..
            } => {
                tracing::warn!(
                    target: "wicket::audit",
                    partition_key = %partition_key,
                    retry_after_secs = ?retry_after.map(|d| d.as_secs()),
                    "admission rejected"
                );
            }
            Event::CaptchaRejected { ip_address, .. } => {
                tracing::info!(target: "wicket::audit", ip_address = ?ip_address, "captcha rejected");
            }
            Event::LoginFailed {
                email,
                failed_attempts,
                ip_address,
                ..
            } => {
                tracing::info!(target: "wicket::audit", email = %email, failed_attempts, ip_address = ?ip_address, "login failed");
            }
            Event::AccountLocked {
                email,
                failed_attempts,
                ip_address,
                ..
            } => {
                tracing::warn!(target: "wicket::audit", email = %email, failed_attempts, ip_address = ?ip_address, "account locked");
            }
            Event::LoginBlocked {
                email, ip_address, ..
            } => {
                tracing::warn!(target: "wicket::audit", email = %email, ip_address = ?ip_address, "login attempt on locked account");
            }
            Event::SessionCreated {
                identity_id,
                email,
                role,
                ip_address,
                ..
            } => {
                tracing::info!(
                    target: "wicket::audit",
                    identity_id = %identity_id,
                    email = %email,
                    role = %role,
                    ip_address = ?ip_address,
                    "session created"
                );
            }
            Event::SessionDestroyed { identity_id, .. } => {
                tracing::info!(target: "wicket::audit", identity_id = %identity_id, "session destroyed");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle_event(&self, _event: &Event) -> Result<(), EventError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct ErroringEventHandler;

    #[async_trait]
    impl EventHandler for ErroringEventHandler {
        async fn handle_event(&self, _event: &Event) -> Result<(), EventError> {
            Err(EventError::HandlerError("Test error".into()))
        }
    }

    fn granted() -> Event {
        Event::AdmissionGranted {
            partition_key: "ip:10.0.0.1".to_string(),
            remaining: 1,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_event_bus_empty() {
        let event_bus = EventBus::default();
        event_bus.emit(&granted()).await.unwrap();
    }

    #[tokio::test]
    async fn test_event_bus_multiple_handlers() {
        let event_bus = EventBus::default();
        let count = Arc::new(AtomicUsize::new(0));

        event_bus
            .register(Arc::new(CountingHandler {
                count: count.clone(),
            }))
            .await;
        event_bus
            .register(Arc::new(CountingHandler {
                count: count.clone(),
            }))
            .await;

        event_bus.emit(&granted()).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_event_bus_error_propagation() {
        let event_bus = EventBus::default();
        event_bus.register(Arc::new(ErroringEventHandler)).await;

        let result = event_bus.emit(&granted()).await;
        assert!(matches!(result, Err(EventError::HandlerError(_))));
    }

    #[tokio::test]
    async fn test_publish_swallows_handler_errors() {
        let event_bus = EventBus::default();
        let count = Arc::new(AtomicUsize::new(0));
        event_bus.register(Arc::new(ErroringEventHandler)).await;
        event_bus
            .register(Arc::new(CountingHandler {
                count: count.clone(),
            }))
            .await;

        // The first handler fails, so the bus stops before the counter; no panic, no error.
        event_bus.publish(granted()).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_tracing_handler_accepts_every_kind() {
        let handler = TracingAuditHandler;
        let events = vec![
            granted(),
            Event::AdmissionRejected {
                partition_key: "ip:unknown".to_string(),
                retry_after: Some(Duration::from_secs(30)),
                timestamp: Utc::now(),
            },
            Event::CaptchaRejected {
                ip_address: None,
                timestamp: Utc::now(),
            },
            Event::LoginFailed {
                email: "a@example.com".to_string(),
                failed_attempts: 1,
                ip_address: Some("10.0.0.1".to_string()),
                timestamp: Utc::now(),
            },
            Event::AccountLocked {
                email: "a@example.com".to_string(),
                failed_attempts: 5,
                ip_address: None,
                timestamp: Utc::now(),
            },
            Event::LoginBlocked {
                email: "a@example.com".to_string(),
                ip_address: None,
                timestamp: Utc::now(),
            },
            Event::SessionCreated {
                identity_id: IdentityId::new("idn_test"),
                email: "a@example.com".to_string(),
                role: Role::User,
                ip_address: None,
                timestamp: Utc::now(),
            },
            Event::SessionDestroyed {
                identity_id: IdentityId::new("idn_test"),
                timestamp: Utc::now(),
            },
        ];

        let kinds: Vec<_> = events.iter().map(Event::kind).collect();
        assert_eq!(kinds.len(), 8);

        for event in &events {
            handler.handle_event(event).await.unwrap();
        }
    }
}
