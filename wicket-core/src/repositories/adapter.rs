use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::{
    Error, Identity, SessionRecord,
    repositories::{IdentityRepository, RepositoryProvider, SessionRepository},
    session::SessionToken,
};

/// Adapter that exposes a provider's identity repository as an owned, shareable value
pub struct IdentityRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> IdentityRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> IdentityRepository for IdentityRepositoryAdapter<R> {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, Error> {
        self.provider.identity().find_by_email(email).await
    }
}

pub struct SessionRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> SessionRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> SessionRepository for SessionRepositoryAdapter<R> {
    async fn create(&self, session: SessionRecord) -> Result<SessionRecord, Error> {
        self.provider.session().create(session).await
    }

    async fn touch(
        &self,
        token: &SessionToken,
        idle_timeout: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionRecord>, Error> {
        self.provider.session().touch(token, idle_timeout, now).await
    }

    async fn delete(&self, token: &SessionToken) -> Result<Option<SessionRecord>, Error> {
        self.provider.session().delete(token).await
    }

    async fn cleanup_expired(
        &self,
        idle_timeout: Duration,
        now: DateTime<Utc>,
    ) -> Result<u64, Error> {
        self.provider
            .session()
            .cleanup_expired(idle_timeout, now)
            .await
    }
}
