//! The login pipeline.
//!
//! An attempt moves through the gates in a fixed order and stops at the first
//! one that rejects it:
//!
//! ```text
//! Start -> CaptchaChecked -> AdmissionChecked -> CredentialChecked -> SessionIssued
//!   |            |                 |                    |
//!   +------------+-----------------+--------------------+--> Rejected(reason)
//! ```
//!
//! 1. CAPTCHA: an unverified or unverifiable token is rejected (`captcha`).
//! 2. Admission: the per-IP window must have a permit left (`rate_limited`).
//! 3. Lockout: an account with too many recent failures is rejected without
//!    touching the identity store (`locked`).
//! 4. Credentials: a mismatch is recorded in the ledger (`bad_credentials`).
//! 5. Session: the previous session is destroyed and a fresh one issued.
//!
//! No gate is retried. Storage failures abort the attempt as errors.
use std::{fmt, net::IpAddr, sync::Arc};

use chrono::Utc;

use crate::{
    Error, Event, EventBus,
    error::AuthError,
    repositories::{IdentityRepository, SessionRepository},
    services::{
        AdmissionDecision, AttemptLedger, CaptchaVerifier, CredentialVerifier, SessionHandle,
        SessionIssuer, WindowedAdmission, partition_key,
    },
    session::SessionToken,
};

/// A submitted login form plus what is known about the caller.
#[derive(Clone)]
pub struct LoginAttempt {
    pub email: String,
    pub password: String,
    pub captcha_token: String,
    pub client_ip: Option<IpAddr>,
}

impl fmt::Debug for LoginAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginAttempt")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("client_ip", &self.client_ip)
            .finish_non_exhaustive()
    }
}

/// Last gate an attempt passed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    Start,
    CaptchaChecked,
    AdmissionChecked,
    CredentialChecked,
    SessionIssued,
}

impl LoginStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginStage::Start => "start",
            LoginStage::CaptchaChecked => "captcha_checked",
            LoginStage::AdmissionChecked => "admission_checked",
            LoginStage::CredentialChecked => "credential_checked",
            LoginStage::SessionIssued => "session_issued",
        }
    }
}

impl fmt::Display for LoginStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct LoginPipeline<I: IdentityRepository, S: SessionRepository> {
    captcha: Arc<dyn CaptchaVerifier>,
    admission: WindowedAdmission,
    ledger: AttemptLedger,
    credentials: Arc<CredentialVerifier<I>>,
    sessions: Arc<SessionIssuer<S>>,
    events: EventBus,
}

impl<I: IdentityRepository, S: SessionRepository> LoginPipeline<I, S> {
    pub fn new(
        captcha: Arc<dyn CaptchaVerifier>,
        admission: WindowedAdmission,
        ledger: AttemptLedger,
        credentials: Arc<CredentialVerifier<I>>,
        sessions: Arc<SessionIssuer<S>>,
        events: EventBus,
    ) -> Self {
        Self {
            captcha,
            admission,
            ledger,
            credentials,
            sessions,
            events,
        }
    }

    pub fn admission(&self) -> &WindowedAdmission {
        &self.admission
    }

    pub fn ledger(&self) -> &AttemptLedger {
        &self.ledger
    }

    pub fn sessions(&self) -> &SessionIssuer<S> {
        &self.sessions
    }

    /// Run `attempt` through every gate.
    ///
    /// `current_session` is the token the caller already holds, if any. It is
    /// invalidated before the new session is written.
    pub async fn login(
        &self,
        attempt: LoginAttempt,
        current_session: Option<&SessionToken>,
    ) -> Result<SessionHandle, Error> {
        let ip_address = attempt.client_ip.map(|ip| ip.to_canonical().to_string());
        let mut stage = LoginStage::Start;

        let verified = match self
            .captcha
            .verify(&attempt.captcha_token, attempt.client_ip)
            .await
        {
            Ok(verified) => verified,
            Err(e) => {
                tracing::warn!(error = %e, "CAPTCHA verification unavailable");
                false
            }
        };
        if !verified {
            self.events
                .publish(Event::CaptchaRejected {
                    ip_address,
                    timestamp: Utc::now(),
                })
                .await;
            return Err(reject(stage, AuthError::CaptchaFailed));
        }
        stage = LoginStage::CaptchaChecked;

        let partition_key = partition_key(attempt.client_ip);
        match self.admission.admit(&partition_key) {
            AdmissionDecision::Allowed { remaining } => {
                self.events
                    .publish(Event::AdmissionGranted {
                        partition_key,
                        remaining,
                        timestamp: Utc::now(),
                    })
                    .await;
            }
            AdmissionDecision::Rejected { retry_after } => {
                self.events
                    .publish(Event::AdmissionRejected {
                        partition_key,
                        retry_after,
                        timestamp: Utc::now(),
                    })
                    .await;
                return Err(reject(stage, AuthError::RateLimited { retry_after }));
            }
        }
        stage = LoginStage::AdmissionChecked;

        if self.ledger.is_blocked(&attempt.email) {
            self.events
                .publish(Event::LoginBlocked {
                    email: attempt.email,
                    ip_address,
                    timestamp: Utc::now(),
                })
                .await;
            return Err(reject(stage, AuthError::AccountLocked));
        }

        let Some(identity) = self
            .credentials
            .verify(&attempt.email, &attempt.password)
            .await?
        else {
            let failed_attempts = self.ledger.record_attempt(&attempt.email, false);
            self.events
                .publish(Event::LoginFailed {
                    email: attempt.email.clone(),
                    failed_attempts,
                    ip_address: ip_address.clone(),
                    timestamp: Utc::now(),
                })
                .await;

            if self.ledger.is_enabled()
                && failed_attempts == self.ledger.config().max_failed_attempts
            {
                self.events
                    .publish(Event::AccountLocked {
                        email: attempt.email,
                        failed_attempts,
                        ip_address,
                        timestamp: Utc::now(),
                    })
                    .await;
            }
            return Err(reject(stage, AuthError::InvalidCredentials));
        };
        self.ledger.record_attempt(&attempt.email, true);
        stage = LoginStage::CredentialChecked;

        let handle = self
            .sessions
            .issue(current_session, &identity)
            .await
            .map_err(|e| {
                tracing::error!(stage = %stage, error = %e, "Failed to issue session");
                e
            })?;
        stage = LoginStage::SessionIssued;

        self.events
            .publish(Event::SessionCreated {
                identity_id: handle.identity_id().clone(),
                email: handle.email().to_string(),
                role: handle.role(),
                ip_address,
                timestamp: Utc::now(),
            })
            .await;
        tracing::info!(stage = %stage, role = %handle.role(), "Login succeeded");

        Ok(handle)
    }

    /// Destroy the caller's session, if there is one. Calling it again is a no-op.
    pub async fn logout(&self, current_session: Option<&SessionToken>) -> Result<(), Error> {
        let Some(token) = current_session else {
            return Ok(());
        };

        if let Some(record) = self.sessions.invalidate(token).await? {
            self.events
                .publish(Event::SessionDestroyed {
                    identity_id: record.identity_id,
                    timestamp: Utc::now(),
                })
                .await;
        }

        Ok(())
    }
}

fn reject(stage: LoginStage, error: AuthError) -> Error {
    let error = Error::from(error);
    tracing::info!(
        stage = %stage,
        reason = error.rejection_reason().unwrap_or("unknown"),
        "Login rejected"
    );
    error
}
