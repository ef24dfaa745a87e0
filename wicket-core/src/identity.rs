//! Identity records
//!
//! An identity is the stored account a login attempt is checked against.
//!
//! | Field      | Type         | Description                                  |
//! | ---------- | ------------ | -------------------------------------------- |
//! | `id`       | `IdentityId` | The unique identifier for the identity.      |
//! | `email`    | `String`     | The email used to sign in.                   |
//! | `password` | `String`     | The stored password (plaintext, see below).  |
//! | `role`     | `Role`       | Authorization role carried into the session. |
//!
//! Passwords are stored and compared as plaintext to match the identity store
//! this gate sits in front of. See [`crate::services::CredentialVerifier`].
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    error::ValidationError,
    id::{generate_prefixed_id, validate_prefixed_id},
};

/// A unique, stable identifier for a stored identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct IdentityId(String);

impl IdentityId {
    pub fn new(id: &str) -> Self {
        IdentityId(id.to_string())
    }

    pub fn new_random() -> Self {
        IdentityId(generate_prefixed_id("idn"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate that this ID has the format produced by [`IdentityId::new_random`]
    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, "idn")
    }
}

impl Default for IdentityId {
    fn default() -> Self {
        Self::new_random()
    }
}

impl From<&str> for IdentityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authorization role carried by every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(ValidationError::InvalidField(format!(
                "Unknown role: {other}"
            ))),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub id: IdentityId,
    pub email: String,
    pub password: String,
    pub role: Role,
}

// Keeps the stored password out of logs.
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

impl Identity {
    pub fn builder() -> IdentityBuilder {
        IdentityBuilder::default()
    }
}

#[derive(Default)]
pub struct IdentityBuilder {
    id: Option<IdentityId>,
    email: Option<String>,
    password: Option<String>,
    role: Option<Role>,
}

impl IdentityBuilder {
    pub fn id(mut self, id: IdentityId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn build(self) -> Result<Identity, Error> {
        Ok(Identity {
            id: self.id.unwrap_or_default(),
            email: self
                .email
                .ok_or(ValidationError::MissingField("email".to_string()))?,
            password: self
                .password
                .ok_or(ValidationError::MissingField("password".to_string()))?,
            role: self.role.unwrap_or(Role::User),
        })
    }
}
