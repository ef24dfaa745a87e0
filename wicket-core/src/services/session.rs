//! Session issuance and teardown.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::{
    Error, Identity, Role,
    identity::IdentityId,
    repositories::SessionRepository,
    session::{SessionRecord, SessionToken},
};

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Sessions idle for this long are gone
    pub idle_timeout: Duration,
    pub cleanup_interval: std::time::Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::minutes(20),
            cleanup_interval: std::time::Duration::from_secs(300),
        }
    }
}

impl SessionConfig {
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: std::time::Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}

/// A freshly issued session, ready to be handed to the client.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    record: SessionRecord,
}

impl SessionHandle {
    pub fn token(&self) -> &SessionToken {
        &self.record.token
    }

    pub fn identity_id(&self) -> &IdentityId {
        &self.record.identity_id
    }

    pub fn email(&self) -> &str {
        &self.record.email
    }

    pub fn role(&self) -> Role {
        self.record.role
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }
}

/// Turns authenticated identities into sessions.
pub struct SessionIssuer<R: SessionRepository> {
    repository: Arc<R>,
    config: SessionConfig,
}

impl<R: SessionRepository> SessionIssuer<R> {
    pub fn new(repository: Arc<R>, config: SessionConfig) -> Self {
        Self { repository, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Issue a session for `identity`.
    ///
    /// Any session referenced by `previous` is deleted before the new record,
    /// with a new random token, is written. A pre-existing token is never
    /// reused for the authenticated session.
    pub async fn issue(
        &self,
        previous: Option<&SessionToken>,
        identity: &Identity,
    ) -> Result<SessionHandle, Error> {
        if let Some(previous) = previous {
            if let Some(old) = self.repository.delete(previous).await? {
                tracing::debug!(
                    identity_id = %old.identity_id,
                    "Invalidated previous session before issuing a new one"
                );
            }
        }

        let record = self
            .repository
            .create(SessionRecord::for_identity(identity))
            .await?;

        tracing::debug!(identity_id = %record.identity_id, role = %record.role, "Session issued");

        Ok(SessionHandle { record })
    }

    /// Delete the session behind `token`. Deleting a missing session is not an error.
    pub async fn invalidate(&self, token: &SessionToken) -> Result<Option<SessionRecord>, Error> {
        self.repository.delete(token).await
    }

    /// Look up a live session and slide its idle window forward.
    pub async fn resolve(&self, token: &SessionToken) -> Result<Option<SessionRecord>, Error> {
        self.repository
            .touch(token, self.config.idle_timeout, Utc::now())
            .await
    }

    pub async fn cleanup_expired(&self) -> Result<u64, Error> {
        self.repository
            .cleanup_expired(self.config.idle_timeout, Utc::now())
            .await
    }

    /// Start the background task pruning idle sessions.
    pub fn start_cleanup_task(
        &self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let idle_timeout = self.config.idle_timeout;
        let period = self.config.cleanup_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        match repository.cleanup_expired(idle_timeout, Utc::now()).await {
                            Ok(count) if count > 0 => {
                                tracing::info!(count, "Cleaned up idle sessions");
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to clean up idle sessions");
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down session cleanup task");
                        break;
                    }
                }
            }
        })
    }
}
