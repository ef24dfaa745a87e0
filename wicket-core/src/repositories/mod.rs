//! Repository traits for the data the login gate reads and writes
//!
//! Services only talk to storage through these traits, so a relational
//! backend can replace [`crate::storage::MemoryRepositoryProvider`] without
//! touching the pipeline.
//!
//! # Trait Hierarchy
//!
//! - Individual `*Repository` traits define the operations for each data domain
//! - Individual `*RepositoryProvider` traits provide access to each repository type
//! - [`RepositoryProvider`] combines them and adds lifecycle methods

pub mod adapter;
pub mod identity;
pub mod session;

pub use adapter::{IdentityRepositoryAdapter, SessionRepositoryAdapter};
pub use identity::IdentityRepository;
pub use session::SessionRepository;

use async_trait::async_trait;

use crate::Error;

/// Provider trait for identity store access.
pub trait IdentityRepositoryProvider: Send + Sync + 'static {
    type IdentityRepo: IdentityRepository;

    fn identity(&self) -> &Self::IdentityRepo;
}

/// Provider trait for session store access.
pub trait SessionRepositoryProvider: Send + Sync + 'static {
    type SessionRepo: SessionRepository;

    fn session(&self) -> &Self::SessionRepo;
}

/// Provider trait that storage implementations must implement to provide all repositories.
///
/// # Example
///
/// ```rust,ignore
/// use wicket_core::repositories::*;
///
/// struct MyStorage { /* ... */ }
///
/// impl IdentityRepositoryProvider for MyStorage {
///     type IdentityRepo = MyIdentityRepository;
///     fn identity(&self) -> &Self::IdentityRepo { &self.identities }
/// }
///
/// // ... implement SessionRepositoryProvider ...
///
/// #[async_trait]
/// impl RepositoryProvider for MyStorage {
///     async fn health_check(&self) -> Result<(), Error> { /* ... */ }
/// }
/// ```
#[async_trait]
pub trait RepositoryProvider: IdentityRepositoryProvider + SessionRepositoryProvider {
    /// Health check for all repositories
    async fn health_check(&self) -> Result<(), Error>;
}
