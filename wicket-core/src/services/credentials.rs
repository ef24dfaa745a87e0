use std::sync::Arc;

use crate::{Error, Identity, repositories::IdentityRepository};

/// Checks submitted credentials against the identity store.
///
/// # Security
///
/// Passwords are compared as stored plaintext with `==`: case-sensitive, no
/// hashing and no constant-time comparison. This matches the identity store
/// the gate was built for. A hardened deployment should store salted slow
/// hashes (argon2 or similar) and compare through the hash verifier instead.
pub struct CredentialVerifier<R: IdentityRepository> {
    repository: Arc<R>,
}

impl<R: IdentityRepository> CredentialVerifier<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Return the identity whose email and password both match, if any.
    ///
    /// Email case rules are left to the repository.
    pub async fn verify(&self, email: &str, password: &str) -> Result<Option<Identity>, Error> {
        let Some(identity) = self.repository.find_by_email(email).await? else {
            return Ok(None);
        };

        if identity.password == password {
            Ok(Some(identity))
        } else {
            Ok(None)
        }
    }
}
