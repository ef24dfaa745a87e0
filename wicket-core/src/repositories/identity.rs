use async_trait::async_trait;

use crate::{Error, Identity};

/// Read access to the stored identities the login form is checked against.
#[async_trait]
pub trait IdentityRepository: Send + Sync + 'static {
    /// Find the identity whose email matches `email` exactly.
    ///
    /// Case rules are up to the store. Returns at most one record.
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, Error>;
}
