//! In-memory storage backed by concurrent hash maps
//!
//! Suitable for a single-process deployment and for tests. Sessions live only
//! as long as the process, matching a cookie-backed in-process session store.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::{DashMap, mapref::entry::Entry};

use crate::{
    Error, Identity, SessionRecord,
    error::StorageError,
    repositories::{
        IdentityRepository, IdentityRepositoryProvider, RepositoryProvider, SessionRepository,
        SessionRepositoryProvider,
    },
    session::SessionToken,
    validation::validate_email,
};

/// Identities keyed by their exact email.
#[derive(Default)]
pub struct MemoryIdentityRepository {
    identities: DashMap<String, Identity>,
}

impl MemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identity to the store.
    ///
    /// Rejects malformed emails and duplicate emails.
    pub fn insert(&self, identity: Identity) -> Result<(), Error> {
        validate_email(&identity.email)?;

        match self.identities.entry(identity.email.clone()) {
            Entry::Occupied(_) => Err(StorageError::Constraint(format!(
                "Identity already exists for {}",
                identity.email
            ))
            .into()),
            Entry::Vacant(slot) => {
                slot.insert(identity);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl IdentityRepository for MemoryIdentityRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, Error> {
        Ok(self.identities.get(email).map(|i| i.value().clone()))
    }
}

#[derive(Default)]
pub struct MemorySessionRepository {
    sessions: DashMap<SessionToken, SessionRecord>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, live or not yet cleaned up
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn create(&self, session: SessionRecord) -> Result<SessionRecord, Error> {
        match self.sessions.entry(session.token.clone()) {
            Entry::Occupied(_) => Err(StorageError::Constraint(
                "Session token collision".to_string(),
            )
            .into()),
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
                Ok(session)
            }
        }
    }

    async fn touch(
        &self,
        token: &SessionToken,
        idle_timeout: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionRecord>, Error> {
        match self.sessions.get_mut(token) {
            None => return Ok(None),
            Some(mut entry) => {
                if !entry.is_idle_expired(idle_timeout, now) {
                    entry.last_seen_at = now;
                    return Ok(Some(entry.value().clone()));
                }
            }
        }

        // The shard guard is released above; only remove if still expired.
        self.sessions
            .remove_if(token, |_, s| s.is_idle_expired(idle_timeout, now));
        Ok(None)
    }

    async fn delete(&self, token: &SessionToken) -> Result<Option<SessionRecord>, Error> {
        Ok(self.sessions.remove(token).map(|(_, session)| session))
    }

    async fn cleanup_expired(
        &self,
        idle_timeout: Duration,
        now: DateTime<Utc>,
    ) -> Result<u64, Error> {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| !s.is_idle_expired(idle_timeout, now));
        Ok(before.saturating_sub(self.sessions.len()) as u64)
    }
}

/// Repository provider holding everything in process memory.
#[derive(Default)]
pub struct MemoryRepositoryProvider {
    identities: MemoryIdentityRepository,
    sessions: MemorySessionRepository,
}

impl MemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a provider pre-seeded with `identities`.
    pub fn with_identities(identities: impl IntoIterator<Item = Identity>) -> Result<Self, Error> {
        let provider = Self::new();
        for identity in identities {
            provider.identities.insert(identity)?;
        }
        Ok(provider)
    }

    pub fn identities(&self) -> &MemoryIdentityRepository {
        &self.identities
    }

    pub fn sessions(&self) -> &MemorySessionRepository {
        &self.sessions
    }
}

impl IdentityRepositoryProvider for MemoryRepositoryProvider {
    type IdentityRepo = MemoryIdentityRepository;

    fn identity(&self) -> &Self::IdentityRepo {
        &self.identities
    }
}

impl SessionRepositoryProvider for MemoryRepositoryProvider {
    type SessionRepo = MemorySessionRepository;

    fn session(&self) -> &Self::SessionRepo {
        &self.sessions
    }
}

#[async_trait]
impl RepositoryProvider for MemoryRepositoryProvider {
    async fn health_check(&self) -> Result<(), Error> {
        Ok(())
    }
}
