pub mod admission;
pub mod attempt_ledger;
pub mod captcha;
pub mod credentials;
pub mod login;
pub mod session;

pub use admission::{
    AdmissionConfig, AdmissionDecision, UNKNOWN_PARTITION, WindowedAdmission, partition_key,
};
pub use attempt_ledger::{AttemptLedger, LockoutConfig};
pub use captcha::{CaptchaVerifier, RecaptchaConfig, RecaptchaVerifier};
pub use credentials::CredentialVerifier;
pub use login::{LoginAttempt, LoginPipeline, LoginStage};
pub use session::{SessionConfig, SessionHandle, SessionIssuer};
