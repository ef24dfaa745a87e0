use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::{Error, SessionRecord, session::SessionToken};

/// Storage for issued sessions.
///
/// The repository owns idle expiry: a record whose last activity is older
/// than the idle timeout must never be returned by [`SessionRepository::touch`].
#[async_trait]
pub trait SessionRepository: Send + Sync + 'static {
    /// Store a freshly issued session
    async fn create(&self, session: SessionRecord) -> Result<SessionRecord, Error>;

    /// Look up a live session and refresh its last activity to `now`.
    ///
    /// Expired sessions are deleted and reported as `None`.
    async fn touch(
        &self,
        token: &SessionToken,
        idle_timeout: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionRecord>, Error>;

    /// Delete a session by token, returning the removed record if there was one
    async fn delete(&self, token: &SessionToken) -> Result<Option<SessionRecord>, Error>;

    /// Delete every session idle for at least `idle_timeout`, returning how many were removed
    async fn cleanup_expired(
        &self,
        idle_timeout: Duration,
        now: DateTime<Utc>,
    ) -> Result<u64, Error>;
}
