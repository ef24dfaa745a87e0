//! Configuration for a [`crate::Wicket`] instance.

pub use wicket_core::services::{AdmissionConfig, LockoutConfig, RecaptchaConfig, SessionConfig};

/// Every tunable of the login pipeline in one place.
///
/// The defaults reproduce the gate as deployed: two attempts per IP per
/// minute, five failures lock an account for thirty seconds, sessions expire
/// after twenty idle minutes.
#[derive(Debug, Clone, Copy, Default)]
pub struct WicketConfig {
    pub admission: AdmissionConfig,
    pub lockout: LockoutConfig,
    pub session: SessionConfig,
}
