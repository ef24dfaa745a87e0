//! Core functionality for the wicket login gate
//!
//! This crate contains the pieces every inbound sign-in attempt passes through:
//!
//! - [`services::WindowedAdmission`]: fixed-window, per-IP admission gate
//! - [`services::AttemptLedger`]: per-account failure counter and lockout
//! - [`services::CredentialVerifier`]: lookup against the identity store
//! - [`services::SessionIssuer`]: fixation-safe session hand-off
//! - [`services::LoginPipeline`]: orchestration of all of the above
//!
//! Storage is abstracted behind the traits in [`repositories`]; an in-memory
//! implementation lives in [`storage`].
pub mod error;
pub mod events;
pub mod id;
pub mod identity;
pub mod repositories;
pub mod services;
pub mod session;
pub mod storage;
pub mod validation;

pub use error::{AuthError, CaptchaError, Error, StorageError, ValidationError};
pub use events::{Event, EventBus, EventHandler, TracingAuditHandler};
pub use identity::{Identity, IdentityId, Role};
pub use repositories::{IdentityRepository, RepositoryProvider, SessionRepository};
pub use services::{
    AdmissionConfig, AdmissionDecision, AttemptLedger, CaptchaVerifier, CredentialVerifier,
    LockoutConfig, LoginAttempt, LoginPipeline, LoginStage, RecaptchaConfig, RecaptchaVerifier,
    SessionConfig, SessionHandle, SessionIssuer, WindowedAdmission, partition_key,
};
pub use session::{SessionRecord, SessionToken};
pub use storage::MemoryRepositoryProvider;
